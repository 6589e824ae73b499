//! Batch classification pipeline
//!
//! Consumes the incremental scanner and drives the classify-and-label
//! flow: scan for unclassified messages, load their full content, classify
//! them in parallel, then apply labels sequentially.

use std::collections::BTreeMap;
use std::time::Instant;

use anyhow::{Context, Result};
use log::{info, warn};
use rayon::prelude::*;

use super::{Classifier, ClassifyError};
use crate::gmail::Labeler;
use crate::models::{Category, MessageId};
use crate::scan::{MessageIter, MessageSource};
use crate::seen::SeenStore;

/// Options for one pipeline run
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Stop collecting once this many messages are queued for classification
    pub limit: Option<usize>,
    /// Stop scanning after this many messages, classified or not
    pub scan_limit: Option<usize>,
    /// Classify but never touch Gmail labels
    pub dry_run: bool,
    /// Traverse the whole mailbox instead of stopping at the first seen id
    pub ignore_seen: bool,
    /// Maximum classification requests in flight at once
    pub concurrency: usize,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            limit: None,
            scan_limit: None,
            dry_run: false,
            ignore_seen: false,
            concurrency: 10,
        }
    }
}

/// Result of classifying a single message
#[derive(Debug)]
pub struct Outcome {
    pub id: MessageId,
    /// Sender, formatted for display
    pub from: String,
    pub subject: String,
    pub result: Result<Category, ClassifyError>,
}

/// Statistics and per-item outcomes from a pipeline run
#[derive(Debug, Default)]
pub struct RunSummary {
    /// Messages the scanner walked over
    pub scanned: usize,
    /// Messages skipped because they already carried a classification label
    pub skipped: usize,
    /// Successful classifications per category
    pub counts: BTreeMap<Category, usize>,
    /// Messages whose classification failed
    pub errors: usize,
    /// Per-item results, in scan order
    pub outcomes: Vec<Outcome>,
    /// Duration of the run
    pub duration_ms: u64,
}

impl RunSummary {
    /// Total successfully classified messages
    pub fn classified(&self) -> usize {
        self.counts.values().sum()
    }
}

/// Run one scan-classify-label batch
///
/// `scanner` is walked incrementally (metadata detail is enough there);
/// `detail` loads the full records that go into prompts. Scan-level
/// transport errors abort the run; classification failures are isolated
/// per item and reported in the summary. With `dry_run` set, no label is
/// ever applied.
pub fn classify_batch(
    scanner: &dyn MessageSource,
    detail: &dyn MessageSource,
    seen: &dyn SeenStore,
    classifier: &dyn Classifier,
    labeler: &mut dyn Labeler,
    opts: &RunOptions,
) -> Result<RunSummary> {
    let start = Instant::now();
    let mut summary = RunSummary::default();

    let classified_ids = labeler
        .classification_ids()
        .context("Failed to resolve classification labels")?;

    // Phase 1: scan for unclassified messages
    let iter = if opts.ignore_seen {
        MessageIter::all(scanner)
    } else {
        MessageIter::tracked(scanner, seen)
    };

    let mut candidates = Vec::new();
    for result in iter {
        let message = result.context("Scanning mailbox failed")?;
        summary.scanned += 1;

        if message.has_any_label(&classified_ids) {
            summary.skipped += 1;
        } else {
            candidates.push(message);
            if opts.limit.is_some_and(|limit| candidates.len() >= limit) {
                break;
            }
        }

        if opts.scan_limit.is_some_and(|limit| summary.scanned >= limit) {
            break;
        }
    }

    if candidates.is_empty() {
        info!(
            "No unclassified messages found (scanned {}, skipped {})",
            summary.scanned, summary.skipped
        );
        summary.duration_ms = start.elapsed().as_millis() as u64;
        return Ok(summary);
    }

    // Phase 2: load full content for the prompts
    let mut to_classify = Vec::with_capacity(candidates.len());
    for message in &candidates {
        let full = detail
            .fetch_message(&message.id)
            .with_context(|| format!("Failed to load message {}", message.id))?;
        to_classify.push(full);
    }

    info!(
        "Classifying {} messages (concurrency: {})",
        to_classify.len(),
        opts.concurrency
    );

    // Phase 3: classify in parallel. The pool size is the admission gate;
    // collect() is the join barrier, and a failed item never cancels its
    // siblings.
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(opts.concurrency.max(1))
        .build()
        .context("Failed to build classification thread pool")?;

    let outcomes: Vec<Outcome> = pool.install(|| {
        to_classify
            .par_iter()
            .map(|message| Outcome {
                id: message.id.clone(),
                from: message.from.display(),
                subject: message.subject.clone(),
                result: classifier.classify(message),
            })
            .collect()
    });

    // Phase 4: apply labels sequentially
    for outcome in &outcomes {
        match &outcome.result {
            Ok(category) => {
                *summary.counts.entry(*category).or_default() += 1;
                if !opts.dry_run {
                    labeler.apply(&outcome.id, *category)?;
                }
            }
            Err(e) => {
                warn!("Classification failed for {}: {}", outcome.id, e);
                summary.errors += 1;
            }
        }
    }

    summary.outcomes = outcomes;
    summary.duration_ms = start.elapsed().as_millis() as u64;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gmail::TransportError;
    use crate::models::{EmailAddress, Message};
    use crate::scan::MessagePage;
    use crate::seen::{InMemorySeenStore, SeenStore};
    use std::collections::{HashMap, HashSet};

    /// Single-page source over prebuilt messages
    struct FixtureSource {
        order: Vec<MessageId>,
        messages: HashMap<String, Message>,
    }

    impl FixtureSource {
        fn new(messages: Vec<Message>) -> Self {
            Self {
                order: messages.iter().map(|m| m.id.clone()).collect(),
                messages: messages
                    .into_iter()
                    .map(|m| (m.id.as_str().to_string(), m))
                    .collect(),
            }
        }
    }

    impl MessageSource for FixtureSource {
        fn fetch_page(&self, cursor: Option<&str>) -> Result<MessagePage, TransportError> {
            assert!(cursor.is_none());
            Ok(MessagePage {
                ids: self.order.clone(),
                next_cursor: None,
            })
        }

        fn fetch_message(&self, id: &MessageId) -> Result<Message, TransportError> {
            Ok(self.messages[id.as_str()].clone())
        }
    }

    /// Classifies by subject prefix; subjects starting with "err" fail
    struct SubjectClassifier;

    impl Classifier for SubjectClassifier {
        fn classify(&self, message: &Message) -> Result<Category, ClassifyError> {
            if message.subject.starts_with("err") {
                return Err(ClassifyError::Transport("scripted failure".to_string()));
            }
            if message.subject.starts_with("bulk") {
                Ok(Category::BulkContent)
            } else {
                Ok(Category::ReadLater)
            }
        }
    }

    /// Records applied labels instead of talking to Gmail
    struct RecordingLabeler {
        classification_ids: HashSet<String>,
        applied: Vec<(String, Category)>,
    }

    impl RecordingLabeler {
        fn new(classification_ids: &[&str]) -> Self {
            Self {
                classification_ids: classification_ids.iter().map(|s| s.to_string()).collect(),
                applied: Vec::new(),
            }
        }
    }

    impl Labeler for RecordingLabeler {
        fn classification_ids(&mut self) -> Result<HashSet<String>> {
            Ok(self.classification_ids.clone())
        }

        fn apply(&mut self, id: &MessageId, category: Category) -> Result<()> {
            self.applied.push((id.as_str().to_string(), category));
            Ok(())
        }
    }

    fn make_message(id: &str, subject: &str, labels: Vec<&str>) -> Message {
        Message::builder(MessageId::new(id), format!("t-{}", id))
            .from(EmailAddress::new("sender@example.com"))
            .subject(subject)
            .body_text(Some(format!("body of {}", id)))
            .label_ids(labels.into_iter().map(|s| s.to_string()).collect())
            .build()
    }

    #[test]
    fn test_counts_classified_skipped_and_applied() {
        let source = FixtureSource::new(vec![
            make_message("m1", "bulk newsletter", vec!["INBOX"]),
            make_message("m2", "old mail", vec!["INBOX", "CLS1"]),
            make_message("m3", "article", vec!["INBOX"]),
        ]);
        let seen = InMemorySeenStore::new();
        let mut labeler = RecordingLabeler::new(&["CLS1"]);

        let summary = classify_batch(
            &source,
            &source,
            &seen,
            &SubjectClassifier,
            &mut labeler,
            &RunOptions::default(),
        )
        .unwrap();

        assert_eq!(summary.scanned, 3);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.classified(), 2);
        assert_eq!(summary.errors, 0);
        assert_eq!(summary.counts[&Category::BulkContent], 1);
        assert_eq!(summary.counts[&Category::ReadLater], 1);

        assert_eq!(labeler.applied.len(), 2);
        assert_eq!(labeler.applied[0].0, "m1");
        assert_eq!(labeler.applied[1].0, "m3");
    }

    #[test]
    fn test_dry_run_never_applies_labels() {
        let source = FixtureSource::new(vec![
            make_message("m1", "bulk newsletter", vec!["INBOX"]),
            make_message("m2", "article", vec!["INBOX"]),
        ]);
        let seen = InMemorySeenStore::new();
        let mut labeler = RecordingLabeler::new(&[]);

        let opts = RunOptions {
            dry_run: true,
            ..Default::default()
        };
        let summary =
            classify_batch(&source, &source, &seen, &SubjectClassifier, &mut labeler, &opts)
                .unwrap();

        assert_eq!(summary.classified(), 2);
        assert!(labeler.applied.is_empty());
    }

    #[test]
    fn test_classification_errors_are_isolated() {
        let source = FixtureSource::new(vec![
            make_message("m1", "err broken", vec!["INBOX"]),
            make_message("m2", "bulk newsletter", vec!["INBOX"]),
        ]);
        let seen = InMemorySeenStore::new();
        let mut labeler = RecordingLabeler::new(&[]);

        let summary = classify_batch(
            &source,
            &source,
            &seen,
            &SubjectClassifier,
            &mut labeler,
            &RunOptions::default(),
        )
        .unwrap();

        assert_eq!(summary.errors, 1);
        assert_eq!(summary.classified(), 1);
        // The failing sibling didn't stop m2 from being labeled.
        assert_eq!(labeler.applied, vec![("m2".to_string(), Category::BulkContent)]);
        assert!(summary.outcomes[0].result.is_err());
        assert!(summary.outcomes[1].result.is_ok());
    }

    #[test]
    fn test_limit_caps_classified_not_scanned() {
        let source = FixtureSource::new(vec![
            make_message("m1", "a", vec![]),
            make_message("m2", "b", vec![]),
            make_message("m3", "c", vec![]),
        ]);
        let seen = InMemorySeenStore::new();
        let mut labeler = RecordingLabeler::new(&[]);

        let opts = RunOptions {
            limit: Some(2),
            ..Default::default()
        };
        let summary =
            classify_batch(&source, &source, &seen, &SubjectClassifier, &mut labeler, &opts)
                .unwrap();

        assert_eq!(summary.classified(), 2);
        assert_eq!(summary.scanned, 2);
    }

    #[test]
    fn test_scan_limit_stops_early() {
        let source = FixtureSource::new(vec![
            make_message("m1", "a", vec!["CLS1"]),
            make_message("m2", "b", vec!["CLS1"]),
            make_message("m3", "c", vec![]),
        ]);
        let seen = InMemorySeenStore::new();
        let mut labeler = RecordingLabeler::new(&["CLS1"]);

        let opts = RunOptions {
            scan_limit: Some(2),
            ..Default::default()
        };
        let summary =
            classify_batch(&source, &source, &seen, &SubjectClassifier, &mut labeler, &opts)
                .unwrap();

        // Scanning stopped before m3 was ever considered.
        assert_eq!(summary.scanned, 2);
        assert_eq!(summary.skipped, 2);
        assert_eq!(summary.classified(), 0);
    }

    #[test]
    fn test_tracked_run_marks_seen_and_second_run_is_empty() {
        let source = FixtureSource::new(vec![
            make_message("m1", "a", vec![]),
            make_message("m2", "b", vec![]),
        ]);
        let seen = InMemorySeenStore::new();
        let mut labeler = RecordingLabeler::new(&[]);

        let first = classify_batch(
            &source,
            &source,
            &seen,
            &SubjectClassifier,
            &mut labeler,
            &RunOptions::default(),
        )
        .unwrap();
        assert_eq!(first.scanned, 2);
        assert_eq!(seen.count().unwrap(), 2);

        // The newest message is now seen, so a second run stops at once.
        let second = classify_batch(
            &source,
            &source,
            &seen,
            &SubjectClassifier,
            &mut labeler,
            &RunOptions::default(),
        )
        .unwrap();
        assert_eq!(second.scanned, 0);
        assert_eq!(second.classified(), 0);
    }

    #[test]
    fn test_ignore_seen_rescans_everything() {
        let source = FixtureSource::new(vec![
            make_message("m1", "a", vec![]),
            make_message("m2", "b", vec![]),
        ]);
        let seen = InMemorySeenStore::with_ids(["m1", "m2"]);
        let mut labeler = RecordingLabeler::new(&[]);

        let opts = RunOptions {
            ignore_seen: true,
            ..Default::default()
        };
        let summary =
            classify_batch(&source, &source, &seen, &SubjectClassifier, &mut labeler, &opts)
                .unwrap();

        assert_eq!(summary.scanned, 2);
        assert_eq!(summary.classified(), 2);
    }
}
