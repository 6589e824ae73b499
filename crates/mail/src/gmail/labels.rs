//! Per-session label name to id resolution
//!
//! Gmail's modify API wants label ids, but configuration and classifier
//! output speak in label names. The catalog owns the name-to-id map for
//! one session; there is no process-wide cache.

use std::collections::{HashMap, HashSet};

use anyhow::{Context, Result};
use log::{debug, info};

use super::GmailClient;
use crate::models::{Category, LABEL_PREFIX, MessageId};

/// Seam through which the pipeline reads and applies classification labels
pub trait Labeler {
    /// Ids of the classification labels that currently exist in the mailbox
    ///
    /// Used to recognize messages that were already classified in an
    /// earlier run.
    fn classification_ids(&mut self) -> Result<HashSet<String>>;

    /// Apply the category's label to a message, creating the label if needed
    fn apply(&mut self, id: &MessageId, category: Category) -> Result<()>;
}

/// Label name-to-id lookup for one session, backed by the Gmail API
pub struct LabelCatalog<'a> {
    client: &'a GmailClient,
    by_name: HashMap<String, String>,
    loaded: bool,
}

impl<'a> LabelCatalog<'a> {
    /// Create an empty catalog; the label list is fetched on first use
    pub fn new(client: &'a GmailClient) -> Self {
        Self {
            client,
            by_name: HashMap::new(),
            loaded: false,
        }
    }

    fn refresh(&mut self) -> Result<()> {
        let labels = self
            .client
            .list_labels()
            .context("Failed to list Gmail labels")?;

        self.by_name = labels.into_iter().map(|l| (l.name, l.id)).collect();
        self.loaded = true;
        debug!("Label catalog loaded ({} labels)", self.by_name.len());
        Ok(())
    }

    /// Get a label id by name, fetching the label list once if needed
    pub fn get(&mut self, name: &str) -> Result<Option<String>> {
        if !self.loaded {
            self.refresh()?;
        }
        Ok(self.by_name.get(name).cloned())
    }

    /// Get a label id by name, creating the label (and any missing
    /// ancestors, for nested names like "classifications/records") if it
    /// doesn't exist
    pub fn get_or_create(&mut self, name: &str) -> Result<String> {
        if let Some(id) = self.get(name)? {
            return Ok(id);
        }

        let mut id = None;
        for ancestor in ancestry(name) {
            if self.by_name.contains_key(ancestor) {
                id = self.by_name.get(ancestor).cloned();
                continue;
            }

            info!("Creating Gmail label '{}'", ancestor);
            let label = self
                .client
                .create_label(ancestor)
                .with_context(|| format!("Failed to create label '{}'", ancestor))?;
            id = Some(label.id.clone());
            self.by_name.insert(label.name, label.id);
        }

        id.with_context(|| format!("Label '{}' resolved to no id", name))
    }
}

impl Labeler for LabelCatalog<'_> {
    fn classification_ids(&mut self) -> Result<HashSet<String>> {
        if !self.loaded {
            self.refresh()?;
        }

        Ok(self
            .by_name
            .iter()
            .filter(|(name, _)| name.starts_with(LABEL_PREFIX))
            .map(|(_, id)| id.clone())
            .collect())
    }

    fn apply(&mut self, id: &MessageId, category: Category) -> Result<()> {
        let label_id = self.get_or_create(category.label_name())?;
        self.client
            .modify_message(id, &[label_id], &[])
            .with_context(|| format!("Failed to label message {}", id))?;
        Ok(())
    }
}

/// Ancestor chain of a nested label name, shallowest first
///
/// "a/b/c" yields ["a", "a/b", "a/b/c"]; Gmail requires each parent to
/// exist before a child can be created.
fn ancestry(name: &str) -> Vec<&str> {
    name.char_indices()
        .filter(|(_, c)| *c == '/')
        .map(|(i, _)| &name[..i])
        .chain(std::iter::once(name))
        .collect()
}
