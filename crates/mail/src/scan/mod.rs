//! Incremental mailbox scanning
//!
//! This module is the heart of the crate: a lazy, paginated traversal over
//! the remote message list that stops at the first already-seen id and
//! records progress in a durable [`crate::seen::SeenStore`].

mod iter;
mod source;

pub use iter::MessageIter;
pub use source::{GmailSource, MessagePage, MessageSource};
