//! Gmail API response normalization
//!
//! Converts Gmail API messages to the domain [`Message`] model. Malformed
//! pieces (undecodable parts, bad dates, missing payloads) degrade to
//! empty or absent fields; normalization never fails a traversal.

use base64::prelude::*;
use chrono::{DateTime, Utc};

use super::api::{GmailMessage, MessagePart, MessagePayload};
use crate::models::{EmailAddress, Message, MessageId};

/// Normalize a Gmail API message to a domain Message
pub fn normalize_message(raw: GmailMessage) -> Message {
    let id = MessageId::new(&raw.id);
    let snippet = decode_html_entities(&raw.snippet);
    let label_ids = raw.label_ids.unwrap_or_default();

    let Some(payload) = &raw.payload else {
        // Metadata may be missing entirely (e.g., minimal format); keep the
        // envelope and leave everything else empty.
        return Message::builder(id, raw.thread_id)
            .snippet(snippet)
            .label_ids(label_ids)
            .build();
    };

    let from = extract_header(payload, "From")
        .map(|s| EmailAddress::parse(&s))
        .unwrap_or_else(|| EmailAddress::new("unknown@unknown.com"));

    let to = extract_header(payload, "To")
        .map(|s| parse_address_list(&s))
        .unwrap_or_default();

    let cc = extract_header(payload, "Cc")
        .map(|s| parse_address_list(&s))
        .unwrap_or_default();

    let subject = extract_header(payload, "Subject").unwrap_or_default();

    let sent_at = extract_header(payload, "Date").and_then(|s| parse_date(&s));

    let body_text = find_body(payload, "text/plain");
    let body_html = find_body(payload, "text/html");

    Message::builder(id, raw.thread_id)
        .from(from)
        .to(to)
        .cc(cc)
        .subject(subject)
        .sent_at(sent_at)
        .snippet(snippet)
        .body_text(body_text)
        .body_html(body_html)
        .label_ids(label_ids)
        .build()
}

/// Extract a header value by name (case-insensitive)
fn extract_header(payload: &MessagePayload, name: &str) -> Option<String> {
    payload.headers.as_ref()?.iter().find_map(|h| {
        if h.name.eq_ignore_ascii_case(name) {
            Some(h.value.clone())
        } else {
            None
        }
    })
}

/// Parse a comma-separated list of email addresses
fn parse_address_list(s: &str) -> Vec<EmailAddress> {
    s.split(',')
        .map(str::trim)
        .filter(|addr| !addr.is_empty())
        .map(EmailAddress::parse)
        .collect()
}

/// Parse an RFC 2822 Date header, discarding anything malformed
fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(s.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Find the first body of the given MIME type in the payload
///
/// The payload itself may be a single-part message; otherwise its part
/// tree is walked depth-first and the first matching part wins. Later
/// parts of the same type are ignored.
fn find_body(payload: &MessagePayload, mime: &str) -> Option<String> {
    if payload
        .mime_type
        .as_ref()
        .is_some_and(|m| m.starts_with(mime))
        && let Some(body) = &payload.body
        && let Some(data) = &body.data
        && let Some(text) = decode_base64_body(data)
    {
        return Some(text);
    }

    payload
        .parts
        .as_ref()
        .and_then(|parts| find_body_in_parts(parts, mime))
}

/// Depth-first search of message parts for the first part of a MIME type
fn find_body_in_parts(parts: &[MessagePart], mime: &str) -> Option<String> {
    for part in parts {
        if part
            .mime_type
            .as_ref()
            .is_some_and(|m| m.starts_with(mime))
            && let Some(body) = &part.body
            && let Some(data) = &body.data
            && let Some(text) = decode_base64_body(data)
        {
            return Some(text);
        }

        if let Some(nested) = &part.parts
            && let Some(text) = find_body_in_parts(nested, mime)
        {
            return Some(text);
        }
    }

    None
}

/// Decode base64-encoded body data
///
/// Gmail uses URL-safe base64 but padding can vary, so we try multiple decoders.
fn decode_base64_body(data: &str) -> Option<String> {
    use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE};

    let decoders: &[&base64::engine::GeneralPurpose] =
        &[&BASE64_URL_SAFE_NO_PAD, &URL_SAFE, &STANDARD, &STANDARD_NO_PAD];

    for decoder in decoders {
        if let Ok(decoded) = decoder.decode(data) {
            if let Ok(s) = String::from_utf8(decoded) {
                return Some(s);
            }
        }
    }

    None
}

/// Decode HTML entities in snippet text
fn decode_html_entities(s: &str) -> String {
    s.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gmail::api::{Header, MessageBody};

    fn encode(text: &str) -> String {
        BASE64_URL_SAFE_NO_PAD.encode(text)
    }

    fn make_part(mime: &str, text: Option<&str>, parts: Option<Vec<MessagePart>>) -> MessagePart {
        MessagePart {
            part_id: None,
            mime_type: Some(mime.to_string()),
            filename: None,
            headers: None,
            body: text.map(|t| MessageBody {
                size: Some(t.len() as u32),
                data: Some(encode(t)),
            }),
            parts,
        }
    }

    fn make_payload(headers: Vec<(&str, &str)>, parts: Option<Vec<MessagePart>>) -> MessagePayload {
        MessagePayload {
            headers: Some(
                headers
                    .into_iter()
                    .map(|(n, v)| Header {
                        name: n.to_string(),
                        value: v.to_string(),
                    })
                    .collect(),
            ),
            body: None,
            parts,
            mime_type: Some("multipart/alternative".to_string()),
        }
    }

    fn make_message(payload: Option<MessagePayload>) -> GmailMessage {
        GmailMessage {
            id: "m1".to_string(),
            thread_id: "t1".to_string(),
            label_ids: Some(vec!["INBOX".to_string()]),
            snippet: "A snippet".to_string(),
            payload,
        }
    }

    #[test]
    fn test_extract_header_case_insensitive() {
        let payload = make_payload(vec![("FROM", "test@example.com")], None);
        assert_eq!(
            extract_header(&payload, "from"),
            Some("test@example.com".to_string())
        );
        assert_eq!(extract_header(&payload, "Cc"), None);
    }

    #[test]
    fn test_parse_address_list() {
        let addrs = parse_address_list("alice@example.com, Bob <bob@example.com>");
        assert_eq!(addrs.len(), 2);
        assert_eq!(addrs[0].email, "alice@example.com");
        assert_eq!(addrs[1].email, "bob@example.com");
        assert_eq!(addrs[1].name, Some("Bob".to_string()));
    }

    #[test]
    fn test_parse_address_list_skips_empty_entries() {
        let addrs = parse_address_list("alice@example.com, ");
        assert_eq!(addrs.len(), 1);
        assert!(parse_address_list("").is_empty());
    }

    #[test]
    fn test_parse_date_valid() {
        let parsed = parse_date("Tue, 1 Jul 2003 10:52:37 +0200").unwrap();
        assert_eq!(parsed.timestamp(), 1057049557);
    }

    #[test]
    fn test_parse_date_malformed_is_discarded() {
        assert!(parse_date("not a date").is_none());
        assert!(parse_date("").is_none());
        assert!(parse_date("2003-07-01").is_none());
    }

    #[test]
    fn test_first_plain_part_wins() {
        let payload = make_payload(
            vec![],
            Some(vec![
                make_part("text/plain", Some("first body"), None),
                make_part("text/plain", Some("second body"), None),
            ]),
        );

        assert_eq!(
            find_body(&payload, "text/plain"),
            Some("first body".to_string())
        );
    }

    #[test]
    fn test_nested_parts_searched_depth_first() {
        let nested = make_part(
            "multipart/alternative",
            None,
            Some(vec![make_part("text/html", Some("<p>inner</p>"), None)]),
        );
        let payload = make_payload(
            vec![],
            Some(vec![
                nested,
                make_part("text/html", Some("<p>outer</p>"), None),
            ]),
        );

        assert_eq!(
            find_body(&payload, "text/html"),
            Some("<p>inner</p>".to_string())
        );
    }

    #[test]
    fn test_single_part_message_body() {
        let payload = MessagePayload {
            headers: None,
            body: Some(MessageBody {
                size: Some(5),
                data: Some(encode("hello")),
            }),
            parts: None,
            mime_type: Some("text/plain".to_string()),
        };

        assert_eq!(find_body(&payload, "text/plain"), Some("hello".to_string()));
        assert_eq!(find_body(&payload, "text/html"), None);
    }

    #[test]
    fn test_normalize_full_message() {
        let payload = make_payload(
            vec![
                ("From", "Alice <alice@example.com>"),
                ("To", "bob@example.com, carol@example.com"),
                ("Cc", "dave@example.com"),
                ("Subject", "Quarterly report"),
                ("Date", "Mon, 6 Jan 2025 09:30:00 -0500"),
            ],
            Some(vec![
                make_part("text/plain", Some("plain body"), None),
                make_part("text/html", Some("<p>html body</p>"), None),
            ]),
        );

        let msg = normalize_message(make_message(Some(payload)));

        assert_eq!(msg.id.as_str(), "m1");
        assert_eq!(msg.thread_id, "t1");
        assert_eq!(msg.from.email, "alice@example.com");
        assert_eq!(msg.to.len(), 2);
        assert_eq!(msg.cc.len(), 1);
        assert_eq!(msg.subject, "Quarterly report");
        assert!(msg.sent_at.is_some());
        assert_eq!(msg.body_text, Some("plain body".to_string()));
        assert_eq!(msg.body_html, Some("<p>html body</p>".to_string()));
        assert_eq!(msg.label_ids, vec!["INBOX".to_string()]);
    }

    #[test]
    fn test_normalize_without_payload_keeps_envelope() {
        let msg = normalize_message(make_message(None));

        assert_eq!(msg.id.as_str(), "m1");
        assert_eq!(msg.snippet, "A snippet");
        assert!(msg.subject.is_empty());
        assert!(msg.sent_at.is_none());
        assert!(msg.body_text.is_none());
    }

    #[test]
    fn test_decode_html_entities() {
        let input = "Hello &amp; welcome &lt;user&gt;";
        assert_eq!(decode_html_entities(input), "Hello & welcome <user>");
    }

    #[test]
    fn test_decode_base64_body() {
        // "Hello, World!" in base64url
        let encoded = "SGVsbG8sIFdvcmxkIQ";
        assert_eq!(
            decode_base64_body(encoded),
            Some("Hello, World!".to_string())
        );
    }
}
