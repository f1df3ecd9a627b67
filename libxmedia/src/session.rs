use crate::resource::ResourceIdentifier;
use std::collections::BTreeSet;

/// State of one collect-then-download run. Lives from `start` until the
/// batch is drained, the collection is aborted or found empty.
#[derive(Debug)]
pub struct CollectionSession {
    pub session_id: String,
    /// Profile the media tab belongs to, used as the file name prefix.
    pub subject: String,
    /// Ordered so the drain order is stable across runs.
    collected: BTreeSet<ResourceIdentifier>,
    /// Count last pushed to the progress surface.
    last_reported: usize,
    /// Cleared when observation stops. Scans arriving after that are ignored.
    open: bool,
}

impl CollectionSession {
    pub fn new(session_id: String, subject: String) -> Self {
        Self {
            session_id,
            subject,
            collected: Default::default(),
            last_reported: 0,
            open: true,
        }
    }

    /// Absorbs identifiers, returning the total collected afterwards.
    pub fn add(&mut self, identifiers: impl IntoIterator<Item = ResourceIdentifier>) -> usize {
        self.collected.extend(identifiers);
        self.collected.len()
    }

    /// Records `count` as reported if it is new. Returns true when the
    /// progress surface should be refreshed.
    pub fn mark_reported(&mut self, count: usize) -> bool {
        if count > self.last_reported {
            self.last_reported = count;
            true
        } else {
            false
        }
    }

    pub fn len(&self) -> usize {
        self.collected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collected.is_empty()
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    /// Every collected identifier, in the order they are downloaded.
    pub fn members(&self) -> Vec<ResourceIdentifier> {
        self.collected.iter().cloned().collect()
    }

    /// Hands over every collected identifier, leaving the session empty.
    pub fn drain(&mut self) -> Vec<ResourceIdentifier> {
        self.last_reported = 0;
        std::mem::take(&mut self.collected).into_iter().collect()
    }
}
