//! LLM-backed message classification
//!
//! This module provides:
//! - The [`Classifier`] trait and its per-item error taxonomy
//! - An OpenAI-compatible classifier with bounded retry
//! - Prompt construction from normalized messages
//! - The batch pipeline: scan, load, classify in parallel, apply labels

mod llm;
mod pipeline;
mod prompt;

pub use llm::OpenAiClassifier;
pub use pipeline::{Outcome, RunOptions, RunSummary, classify_batch};
pub use prompt::build_prompt;

use crate::models::{Category, Message, UnknownLabelError};

/// Error from classifying a single message
///
/// Always scoped to one item: a classification failure is recorded against
/// that message and never aborts the batch or its siblings.
#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    /// The classifier endpoint could not be reached or kept refusing
    #[error("classifier request failed: {0}")]
    Transport(String),
    /// The response did not contain a usable answer
    #[error("classifier response was malformed: {0}")]
    Decode(String),
    /// The answer was outside the allowed category set
    #[error(transparent)]
    InvalidLabel(#[from] UnknownLabelError),
}

/// Something that can place a message into exactly one [`Category`]
///
/// Implementations own their retry policy for transient failures; the
/// pipeline treats every error as final for that item.
pub trait Classifier: Send + Sync {
    fn classify(&self, message: &Message) -> Result<Category, ClassifyError>;
}
