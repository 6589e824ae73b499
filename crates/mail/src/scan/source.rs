//! Paginated message source abstraction

use crate::gmail::{GmailClient, ListSelector, MessageFormat, TransportError, normalize_message};
use crate::models::{Message, MessageId};

/// One page of a server-paginated message listing
///
/// Ephemeral: the iterator holds one page at a time and discards it once
/// consumed.
#[derive(Debug, Default)]
pub struct MessagePage {
    /// Message ids on this page, newest first
    pub ids: Vec<MessageId>,
    /// Continuation token for the next page, absent on the last page
    pub next_cursor: Option<String>,
}

/// A remote, server-paginated, reverse-chronological message list
///
/// The first page is fetched with `cursor = None`, subsequent pages with
/// the previous page's `next_cursor`. An exhausted source answers with an
/// empty page and no cursor. Transport failures are surfaced, not retried.
pub trait MessageSource {
    /// Fetch one page of message ids
    fn fetch_page(&self, cursor: Option<&str>) -> Result<MessagePage, TransportError>;

    /// Fetch and normalize a single message by id
    fn fetch_message(&self, id: &MessageId) -> Result<Message, TransportError>;
}

/// Gmail-backed [`MessageSource`] with a fixed listing selector and
/// payload detail level
pub struct GmailSource<'a> {
    client: &'a GmailClient,
    selector: ListSelector,
    format: MessageFormat,
}

impl<'a> GmailSource<'a> {
    pub fn new(client: &'a GmailClient, selector: ListSelector, format: MessageFormat) -> Self {
        Self {
            client,
            selector,
            format,
        }
    }
}

impl MessageSource for GmailSource<'_> {
    fn fetch_page(&self, cursor: Option<&str>) -> Result<MessagePage, TransportError> {
        let response = self.client.list_messages(&self.selector, cursor)?;

        Ok(MessagePage {
            ids: response
                .messages
                .unwrap_or_default()
                .into_iter()
                .map(|r| MessageId::new(r.id))
                .collect(),
            next_cursor: response.next_page_token,
        })
    }

    fn fetch_message(&self, id: &MessageId) -> Result<Message, TransportError> {
        let raw = self.client.get_message(id, self.format)?;
        Ok(normalize_message(raw))
    }
}
