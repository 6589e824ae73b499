//! Message model representing a normalized Gmail message

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for a message (Gmail message ID)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl MessageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for MessageId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for MessageId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// An email address with optional display name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailAddress {
    /// Display name (e.g., "John Doe")
    pub name: Option<String>,
    /// Email address (e.g., "john@example.com")
    pub email: String,
}

impl EmailAddress {
    /// Create a new email address with just the email
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            name: None,
            email: email.into(),
        }
    }

    /// Create a new email address with a display name
    pub fn with_name(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            email: email.into(),
        }
    }

    /// Parse an email address from a string like "John Doe <john@example.com>"
    pub fn parse(s: &str) -> Self {
        let s = s.trim();

        // Try to parse "Name <email>" format
        if let Some(angle_start) = s.rfind('<')
            && let Some(angle_end) = s.rfind('>')
            && angle_start < angle_end
        {
            let name = s[..angle_start].trim();
            let email = s[angle_start + 1..angle_end].trim();
            return Self {
                name: if name.is_empty() {
                    None
                } else {
                    Some(name.to_string())
                },
                email: email.to_string(),
            };
        }

        // Otherwise, treat the whole string as an email
        Self {
            name: None,
            email: s.to_string(),
        }
    }

    /// Format the email address for display
    pub fn display(&self) -> String {
        match &self.name {
            Some(name) => format!("{} <{}>", name, self.email),
            None => self.email.clone(),
        }
    }
}

/// A normalized mail message
///
/// Produced once by the parse step from a raw Gmail payload and not
/// mutated afterwards. Depending on the detail level requested from the
/// API, body fields may be absent (metadata-level fetches carry headers
/// and snippet only).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Gmail message ID
    pub id: MessageId,
    /// ID of the conversation thread this message belongs to
    pub thread_id: String,
    /// Sender's email address
    pub from: EmailAddress,
    /// Recipients (To field), in header order
    pub to: Vec<EmailAddress>,
    /// CC recipients, in header order
    pub cc: Vec<EmailAddress>,
    /// Subject line
    pub subject: String,
    /// When the message was sent, if the Date header parsed
    pub sent_at: Option<DateTime<Utc>>,
    /// Gmail's short preview of the message
    pub snippet: String,
    /// Decoded text/plain body, if present
    pub body_text: Option<String>,
    /// Decoded text/html body, if present
    pub body_html: Option<String>,
    /// Gmail label IDs currently applied to this message
    pub label_ids: Vec<String>,
}

impl Message {
    /// Create a new message builder
    pub fn builder(id: MessageId, thread_id: impl Into<String>) -> MessageBuilder {
        MessageBuilder::new(id, thread_id.into())
    }

    /// Whether any of the given label ids is applied to this message
    pub fn has_any_label(&self, label_ids: &std::collections::HashSet<String>) -> bool {
        self.label_ids.iter().any(|l| label_ids.contains(l))
    }
}

/// Builder for creating Message instances
pub struct MessageBuilder {
    id: MessageId,
    thread_id: String,
    from: Option<EmailAddress>,
    to: Vec<EmailAddress>,
    cc: Vec<EmailAddress>,
    subject: String,
    sent_at: Option<DateTime<Utc>>,
    snippet: String,
    body_text: Option<String>,
    body_html: Option<String>,
    label_ids: Vec<String>,
}

impl MessageBuilder {
    fn new(id: MessageId, thread_id: String) -> Self {
        Self {
            id,
            thread_id,
            from: None,
            to: Vec::new(),
            cc: Vec::new(),
            subject: String::new(),
            sent_at: None,
            snippet: String::new(),
            body_text: None,
            body_html: None,
            label_ids: Vec::new(),
        }
    }

    pub fn from(mut self, from: EmailAddress) -> Self {
        self.from = Some(from);
        self
    }

    pub fn to(mut self, to: Vec<EmailAddress>) -> Self {
        self.to = to;
        self
    }

    pub fn cc(mut self, cc: Vec<EmailAddress>) -> Self {
        self.cc = cc;
        self
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    pub fn sent_at(mut self, sent_at: Option<DateTime<Utc>>) -> Self {
        self.sent_at = sent_at;
        self
    }

    pub fn snippet(mut self, snippet: impl Into<String>) -> Self {
        self.snippet = snippet.into();
        self
    }

    pub fn body_text(mut self, body_text: Option<String>) -> Self {
        self.body_text = body_text;
        self
    }

    pub fn body_html(mut self, body_html: Option<String>) -> Self {
        self.body_html = body_html;
        self
    }

    pub fn label_ids(mut self, label_ids: Vec<String>) -> Self {
        self.label_ids = label_ids;
        self
    }

    pub fn build(self) -> Message {
        Message {
            id: self.id,
            thread_id: self.thread_id,
            from: self
                .from
                .unwrap_or_else(|| EmailAddress::new("unknown@unknown.com")),
            to: self.to,
            cc: self.cc,
            subject: self.subject,
            sent_at: self.sent_at,
            snippet: self.snippet,
            body_text: self.body_text,
            body_html: self.body_html,
            label_ids: self.label_ids,
        }
    }
}
