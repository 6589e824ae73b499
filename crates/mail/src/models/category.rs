//! Classification categories and their Gmail label names
//!
//! The classifier is only ever allowed to answer with one of these
//! categories; anything else is rejected at the parse boundary.

use serde::{Deserialize, Serialize};

/// Prefix under which all classification labels are nested in Gmail
pub const LABEL_PREFIX: &str = "classifications/";

/// A classification outcome for a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    /// Newsletters, promotions, automated bulk mail
    BulkContent,
    /// Worth reading, no deadline attached
    ReadLater,
    /// Receipts, confirmations, statements
    Records,
    /// Needs a reply or an action from the user
    RequiresAction,
    /// The classifier could not make a confident call
    Unsure,
}

/// Error returned when a label is outside the allowed category set
#[derive(Debug, thiserror::Error)]
#[error("unknown classification label: {0}")]
pub struct UnknownLabelError(pub String);

impl Category {
    /// All categories, in display order
    pub const ALL: [Category; 5] = [
        Category::BulkContent,
        Category::ReadLater,
        Category::Records,
        Category::RequiresAction,
        Category::Unsure,
    ];

    /// Full Gmail label name (e.g., "classifications/bulk_content")
    pub fn label_name(&self) -> &'static str {
        match self {
            Category::BulkContent => "classifications/bulk_content",
            Category::ReadLater => "classifications/read_later",
            Category::Records => "classifications/records",
            Category::RequiresAction => "classifications/requires_action",
            Category::Unsure => "classifications/unsure",
        }
    }

    /// Short name without the prefix, for console output
    pub fn short_name(&self) -> &'static str {
        match self {
            Category::BulkContent => "bulk_content",
            Category::ReadLater => "read_later",
            Category::Records => "records",
            Category::RequiresAction => "requires_action",
            Category::Unsure => "unsure",
        }
    }

    /// Parse a full label name, rejecting anything outside the allowed set
    pub fn from_label_name(name: &str) -> Result<Self, UnknownLabelError> {
        Self::ALL
            .into_iter()
            .find(|c| c.label_name() == name.trim())
            .ok_or_else(|| UnknownLabelError(name.to_string()))
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label_name())
    }
}
