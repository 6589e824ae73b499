//! The incremental message iterator
//!
//! Pull-driven traversal over a paginated message source. In tracked mode
//! the iterator consults a seen store and stops permanently at the first
//! already-seen id; ids are marked seen only after their record has been
//! fetched, so a failed fetch leaves the id unmarked and a later run picks
//! it up again.

use anyhow::Result;
use log::debug;

use super::source::{MessagePage, MessageSource};
use crate::models::Message;
use crate::seen::SeenStore;

/// Lazy iterator over messages from a paginated source
///
/// Yields messages in the source's order (newest first) and drives page
/// fetches on demand, holding one page at a time. A fresh iterator always
/// restarts pagination from the top of the list; cross-run memory of what
/// was already delivered lives in the seen store, not in iterator state.
///
/// Tracked mode assumes the source is strictly reverse-chronological: the
/// first seen id is read as "everything past this point was already
/// delivered". A message backfilled older into the list after its
/// neighbors were seen will be skipped; [`MessageIter::all`] is the way to
/// sweep the whole mailbox when that matters.
///
/// One instance belongs to one thread; there is no internal locking.
pub struct MessageIter<'a> {
    source: &'a dyn MessageSource,
    seen: Option<&'a dyn SeenStore>,
    page: MessagePage,
    pos: usize,
    started: bool,
    done: bool,
}

impl<'a> MessageIter<'a> {
    /// Traverse only messages not yet in the seen store, marking each one
    /// seen after it is yielded
    pub fn tracked(source: &'a dyn MessageSource, seen: &'a dyn SeenStore) -> Self {
        Self::new(source, Some(seen))
    }

    /// Traverse every message in the source, ignoring seen state entirely
    ///
    /// Never consults or mutates any seen store; terminates only when the
    /// source runs out of pages.
    pub fn all(source: &'a dyn MessageSource) -> Self {
        Self::new(source, None)
    }

    fn new(source: &'a dyn MessageSource, seen: Option<&'a dyn SeenStore>) -> Self {
        Self {
            source,
            seen,
            page: MessagePage::default(),
            pos: 0,
            started: false,
            done: false,
        }
    }

    /// Advance to a page with unconsumed ids, or mark the traversal done
    ///
    /// Returns false once the traversal is finished. A transport error
    /// during pagination is returned without entering the terminal state,
    /// so the caller may pull again and retry the same page fetch.
    fn advance_page(&mut self) -> Result<bool> {
        while self.pos >= self.page.ids.len() {
            if self.started && self.page.next_cursor.is_none() {
                self.done = true;
                return Ok(false);
            }

            let page = self.source.fetch_page(self.page.next_cursor.as_deref())?;
            debug!(
                "Fetched page with {} ids (cursor present: {})",
                page.ids.len(),
                page.next_cursor.is_some()
            );

            self.started = true;
            self.pos = 0;
            self.page = page;

            if self.page.ids.is_empty() {
                // An empty page ends the traversal even if a cursor came
                // with it.
                self.done = true;
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn next_message(&mut self) -> Result<Option<Message>> {
        if self.done {
            return Ok(None);
        }

        if !self.advance_page()? {
            return Ok(None);
        }

        let id = self.page.ids[self.pos].clone();
        self.pos += 1;

        // Pointer logic: the first seen id ends a tracked traversal for
        // good. The id itself is neither yielded nor re-marked.
        if let Some(seen) = self.seen
            && seen.contains(&id)?
        {
            debug!("Hit seen message {}, stopping traversal", id);
            self.done = true;
            return Ok(None);
        }

        // The position is already advanced: a failed fetch propagates to
        // the caller and this id is not retried within this traversal. It
        // also stays unmarked, so a future run re-encounters it.
        let message = self.source.fetch_message(&id)?;

        if let Some(seen) = self.seen {
            seen.mark(&id)?;
        }

        Ok(Some(message))
    }
}

impl Iterator for MessageIter<'_> {
    type Item = Result<Message>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_message().transpose()
    }
}
