//! Pager - the experiment's run set as one lazy sequence
//!
//! The tracking store hands out runs in bounded pages behind an opaque
//! continuation token. The pager folds that into a single
//! `Iterator<Item = Result<RunRecord>>`, so the exporter never sees page
//! boundaries. A retrieval error is yielded once and the iterator fuses.

use std::collections::VecDeque;

use crate::tracking::{RunRecord, TrackingStore};
use crate::Result;

/// Lazy, finite, non-restartable sequence of an experiment's runs.
pub struct RunPager<'a> {
    store: &'a dyn TrackingStore,
    experiment_id: String,
    page_size: usize,
    buffer: VecDeque<RunRecord>,
    token: Option<String>,
    started: bool,
    done: bool,
}

impl<'a> RunPager<'a> {
    /// Create a pager over an experiment's current run set.
    ///
    /// `page_size` bounds each request to the store; it never changes how
    /// many runs the sequence yields.
    #[must_use]
    pub fn new(store: &'a dyn TrackingStore, experiment_id: impl Into<String>, page_size: usize) -> Self {
        Self {
            store,
            experiment_id: experiment_id.into(),
            page_size: page_size.max(1),
            buffer: VecDeque::new(),
            token: None,
            started: false,
            done: false,
        }
    }
}

impl Iterator for RunPager<'_> {
    type Item = Result<RunRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(run) = self.buffer.pop_front() {
                return Some(Ok(run));
            }
            if self.done {
                return None;
            }
            // An absent or empty token after the first page means the
            // store is exhausted.
            let token = match (&self.token, self.started) {
                (Some(token), _) => Some(token.clone()),
                (None, true) => {
                    self.done = true;
                    return None;
                }
                (None, false) => None,
            };
            match self
                .store
                .search_runs(&self.experiment_id, self.page_size, token.as_deref())
            {
                Ok(page) => {
                    self.started = true;
                    let (runs, next_token) = page.into_parts();
                    self.buffer.extend(runs);
                    self.token = next_token.filter(|t| !t.is_empty());
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
    }
}
