//! In-memory seen store
//!
//! Used in tests and dry runs where durability is not wanted.

use std::collections::HashSet;
use std::sync::Mutex;

use anyhow::Result;

use super::SeenStore;
use crate::models::MessageId;

/// In-memory implementation of [`SeenStore`]
///
/// Nothing survives the process; use [`super::SqliteSeenStore`] for real
/// traversals.
#[derive(Default)]
pub struct InMemorySeenStore {
    ids: Mutex<HashSet<String>>,
}

impl InMemorySeenStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with the given ids
    pub fn with_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ids: Mutex::new(ids.into_iter().map(Into::into).collect()),
        }
    }
}

impl SeenStore for InMemorySeenStore {
    fn contains(&self, id: &MessageId) -> Result<bool> {
        Ok(self.ids.lock().unwrap().contains(id.as_str()))
    }

    fn mark(&self, id: &MessageId) -> Result<()> {
        self.ids.lock().unwrap().insert(id.as_str().to_string());
        Ok(())
    }

    fn count(&self) -> Result<usize> {
        Ok(self.ids.lock().unwrap().len())
    }

    fn clear(&self) -> Result<()> {
        self.ids.lock().unwrap().clear();
        Ok(())
    }
}
