//! Mail crate - Business logic for Gmail triage
//!
//! This crate provides platform-independent mail functionality including:
//! - Domain models (Message, EmailAddress, Category)
//! - Gmail API client and OAuth authentication
//! - Durable seen-id tracking across runs
//! - Incremental scan iterator with stop-at-first-seen semantics
//! - LLM classification pipeline with parallel dispatch
//!
//! This crate has zero UI dependencies; the CLI lives in a separate app
//! crate.

pub mod classify;
pub mod config;
pub mod gmail;
pub mod models;
pub mod scan;
pub mod seen;

pub use classify::{Classifier, ClassifyError, OpenAiClassifier, Outcome, RunOptions, RunSummary, classify_batch};
pub use config::{ClassifierConfig, GmailCredentials};
pub use gmail::{GmailAuth, GmailClient, LabelCatalog, Labeler, ListSelector, MessageFormat, TransportError, normalize_message};
pub use models::{Category, EmailAddress, Message, MessageId};
pub use scan::{GmailSource, MessageIter, MessagePage, MessageSource};
pub use seen::{InMemorySeenStore, SeenStore, SqliteSeenStore};
