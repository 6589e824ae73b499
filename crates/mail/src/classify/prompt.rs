//! Classification prompt construction

use crate::models::{Category, EmailAddress, Message};

/// Longest body excerpt included in a prompt
const MAX_BODY_CHARS: usize = 4000;

/// Instruction preamble sent as the system message
pub const CLASSIFICATION_INSTRUCTIONS: &str = "\
You are an email triage assistant. Classify the email below into exactly \
one category label:

- classifications/bulk_content: newsletters, promotions, marketing, \
automated notifications with no action needed
- classifications/read_later: content the user may want to read when they \
have time, with no deadline
- classifications/records: receipts, order confirmations, statements, \
tickets, anything kept for reference
- classifications/requires_action: the user must reply, decide, pay, or do \
something, especially with a deadline
- classifications/unsure: nothing above fits with confidence

Answer with a JSON object of the form {\"label\": \"<category label>\"} and \
nothing else.";

/// Build the user prompt for one message
pub fn build_prompt(message: &Message) -> String {
    let recipients = format_address_list(&message.to);
    let cc = format_address_list(&message.cc);

    let date = message
        .sent_at
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "(unknown)".to_string());

    // Prefer the plain-text body; a metadata-only record still carries the
    // snippet.
    let body = message
        .body_text
        .as_deref()
        .map(str::trim)
        .filter(|b| !b.is_empty())
        .unwrap_or(&message.snippet);
    let body = truncate_body(body);

    let labels: Vec<&str> = Category::ALL.iter().map(|c| c.label_name()).collect();

    format!(
        "---\nEMAIL TO CLASSIFY:\n---\n\
         From: {}\n\
         To: {}\n\
         CC: {}\n\
         Date: {}\n\
         Subject: {}\n\n\
         Body:\n{}\n---\n\n\
         Classify this email into exactly one of: {}",
        message.from.display(),
        recipients,
        cc,
        date,
        message.subject,
        body,
        labels.join(", "),
    )
}

fn format_address_list(addresses: &[EmailAddress]) -> String {
    if addresses.is_empty() {
        return "(none)".to_string();
    }
    addresses
        .iter()
        .map(|a| a.display())
        .collect::<Vec<_>>()
        .join(", ")
}

fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_BODY_CHARS {
        return body.to_string();
    }

    // Cut on a char boundary at or below the limit
    let mut end = MAX_BODY_CHARS;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}\n\n[truncated]", &body[..end])
}
