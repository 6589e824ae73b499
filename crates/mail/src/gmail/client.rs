//! Gmail API HTTP client
//!
//! Provides methods for listing, fetching and labeling messages.
//! Uses synchronous HTTP (ureq) to be executor-agnostic.

use super::GmailAuth;
use super::api::{
    CreateLabelRequest, GmailLabel, GmailMessage, ListLabelsResponse, ListMessagesResponse,
    ModifyMessageRequest,
};
use crate::models::MessageId;

/// Error raised when talking to the Gmail API fails
///
/// Listing and fetch calls are not retried here; the error surfaces to the
/// caller and aborts the current pull.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Could not obtain a usable access token
    #[error("gmail authentication failed: {0}")]
    Auth(String),
    /// The request could not be sent or the server rejected it
    #[error("gmail request to {endpoint} failed: {detail}")]
    Request {
        endpoint: &'static str,
        detail: String,
    },
    /// The response body did not decode as expected
    #[error("unexpected gmail response from {endpoint}: {detail}")]
    Decode {
        endpoint: &'static str,
        detail: String,
    },
}

/// Which payload detail level to request for a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageFormat {
    /// Headers, body structure and content
    Full,
    /// Headers and snippet only (cheaper; used for scanning)
    Metadata,
}

impl MessageFormat {
    fn as_str(&self) -> &'static str {
        match self {
            MessageFormat::Full => "full",
            MessageFormat::Metadata => "metadata",
        }
    }
}

/// Headers requested for metadata-level fetches
pub const METADATA_HEADERS: [&str; 5] = ["From", "To", "Cc", "Subject", "Date"];

/// What slice of the mailbox a listing call covers
#[derive(Debug, Clone)]
pub struct ListSelector {
    /// Gmail label ids the listing is restricted to
    pub label_ids: Vec<String>,
    /// Optional Gmail search query (e.g., "is:unread")
    pub query: Option<String>,
}

impl Default for ListSelector {
    fn default() -> Self {
        Self {
            label_ids: vec!["INBOX".to_string()],
            query: None,
        }
    }
}

/// Gmail API client
pub struct GmailClient {
    auth: GmailAuth,
}

impl GmailClient {
    /// Gmail API base URL
    const BASE_URL: &'static str = "https://gmail.googleapis.com/gmail/v1";

    /// Maximum message refs requested per listing call
    pub const MAX_RESULTS_PER_PAGE: usize = 100;

    /// Create a new Gmail client
    pub fn new(auth: GmailAuth) -> Self {
        Self { auth }
    }

    fn bearer(&self) -> Result<String, TransportError> {
        let token = self
            .auth
            .get_access_token()
            .map_err(|e| TransportError::Auth(e.to_string()))?;
        Ok(format!("Bearer {}", token))
    }

    fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &'static str,
        url: &str,
    ) -> Result<T, TransportError> {
        let mut response = ureq::get(url)
            .header("Authorization", &self.bearer()?)
            .call()
            .map_err(|e| TransportError::Request {
                endpoint,
                detail: e.to_string(),
            })?;

        response
            .body_mut()
            .read_json()
            .map_err(|e| TransportError::Decode {
                endpoint,
                detail: e.to_string(),
            })
    }

    fn post_json<B: serde::Serialize, T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &'static str,
        url: &str,
        body: &B,
    ) -> Result<T, TransportError> {
        let mut response = ureq::post(url)
            .header("Authorization", &self.bearer()?)
            .send_json(body)
            .map_err(|e| TransportError::Request {
                endpoint,
                detail: e.to_string(),
            })?;

        response
            .body_mut()
            .read_json()
            .map_err(|e| TransportError::Decode {
                endpoint,
                detail: e.to_string(),
            })
    }

    /// List message IDs matching the selector, newest first
    ///
    /// # Arguments
    /// * `selector` - Label/query restriction for the listing
    /// * `page_token` - Continuation token from the previous page, if any
    pub fn list_messages(
        &self,
        selector: &ListSelector,
        page_token: Option<&str>,
    ) -> Result<ListMessagesResponse, TransportError> {
        let mut url = format!(
            "{}/users/me/messages?maxResults={}",
            Self::BASE_URL,
            Self::MAX_RESULTS_PER_PAGE
        );

        for label_id in &selector.label_ids {
            url.push_str(&format!("&labelIds={}", urlencoding::encode(label_id)));
        }

        if let Some(query) = &selector.query {
            url.push_str(&format!("&q={}", urlencoding::encode(query)));
        }

        if let Some(token) = page_token {
            url.push_str(&format!("&pageToken={}", urlencoding::encode(token)));
        }

        self.get_json("messages.list", &url)
    }

    /// Get a message by ID at the requested detail level
    pub fn get_message(
        &self,
        id: &MessageId,
        format: MessageFormat,
    ) -> Result<GmailMessage, TransportError> {
        let mut url = format!(
            "{}/users/me/messages/{}?format={}",
            Self::BASE_URL,
            id.as_str(),
            format.as_str()
        );

        if format == MessageFormat::Metadata {
            for header in METADATA_HEADERS {
                url.push_str(&format!("&metadataHeaders={}", header));
            }
        }

        self.get_json("messages.get", &url)
    }

    /// List all labels in the user's mailbox
    pub fn list_labels(&self) -> Result<Vec<GmailLabel>, TransportError> {
        let url = format!("{}/users/me/labels", Self::BASE_URL);
        let response: ListLabelsResponse = self.get_json("labels.list", &url)?;
        Ok(response.labels.unwrap_or_default())
    }

    /// Create a label, visible in the label list
    ///
    /// Nested labels use `/` in the name (e.g., "classifications/records");
    /// the parent label must already exist.
    pub fn create_label(&self, name: &str) -> Result<GmailLabel, TransportError> {
        let url = format!("{}/users/me/labels", Self::BASE_URL);
        let body = CreateLabelRequest {
            name: name.to_string(),
            label_list_visibility: "labelShow".to_string(),
            message_list_visibility: "show".to_string(),
        };

        self.post_json("labels.create", &url, &body)
    }

    /// Add and/or remove labels on a message
    pub fn modify_message(
        &self,
        id: &MessageId,
        add_label_ids: &[String],
        remove_label_ids: &[String],
    ) -> Result<(), TransportError> {
        if add_label_ids.is_empty() && remove_label_ids.is_empty() {
            return Ok(());
        }

        let url = format!(
            "{}/users/me/messages/{}/modify",
            Self::BASE_URL,
            id.as_str()
        );
        let body = ModifyMessageRequest {
            add_label_ids: add_label_ids.to_vec(),
            remove_label_ids: remove_label_ids.to_vec(),
        };

        let _: GmailMessage = self.post_json("messages.modify", &url, &body)?;
        Ok(())
    }

    /// Check if the client is authenticated
    pub fn is_authenticated(&self) -> bool {
        self.auth.is_authenticated()
    }

    /// Trigger authentication flow
    pub fn authenticate(&self) -> Result<(), TransportError> {
        self.bearer()?;
        Ok(())
    }
}
