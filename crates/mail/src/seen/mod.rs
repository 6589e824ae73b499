//! Durable tracking of already-processed message ids
//!
//! The seen store is the only cross-run memory the scanner has: a fresh
//! traversal always restarts pagination from the top of the mailbox, and
//! relies on the store to tell it where previously-delivered messages
//! begin. Entries are only ever added during a traversal; the set shrinks
//! through [`SeenStore::clear`] alone.

mod memory;
mod sqlite;

pub use memory::InMemorySeenStore;
pub use sqlite::SqliteSeenStore;

use crate::models::MessageId;
use anyhow::Result;

/// Trait for seen-id storage backends
///
/// Implementations are accessed from a single traversal thread; they take
/// care of their own interior locking, and the underlying handle is
/// released on drop on every exit path.
pub trait SeenStore: Send + Sync {
    /// True iff the id was marked seen, in this run or a previous one
    fn contains(&self, id: &MessageId) -> Result<bool>;

    /// Record the id as seen. Idempotent: re-marking an id is a no-op.
    ///
    /// The mark must be committed to the backing storage before this
    /// returns, so a crash afterwards cannot lose it.
    fn mark(&self, id: &MessageId) -> Result<()>;

    /// Number of distinct seen ids
    fn count(&self) -> Result<usize>;

    /// Remove all entries, so the next tracked traversal starts from scratch
    fn clear(&self) -> Result<()>;
}
