use std::sync::{PoisonError, RwLock};
use tokio::sync::broadcast;
use url::Url;

const MUTATION_BUFFER_SIZE: usize = 1024;

/// One batch of structural changes to the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MutationBatch {
    pub added_nodes: usize,
    pub removed_nodes: usize,
}

/// The browser page the collector works against.
pub trait Page: Send + Sync + 'static {
    fn location(&self) -> Url;
    /// Serialized html of the whole document as it is right now.
    fn content(&self) -> String;
    /// A subscription receiving one batch per structural change made after
    /// the call.
    fn mutations(&self) -> broadcast::Receiver<MutationBatch>;
}

#[derive(Debug)]
struct Snapshot {
    location: Url,
    html: String,
}

/// A page backed by saved html snapshots. Replacing the content publishes a
/// mutation batch, the same way new tweets streaming into a timeline would.
#[derive(Debug)]
pub struct SnapshotPage {
    snapshot: RwLock<Snapshot>,
    mutation_tx: broadcast::Sender<MutationBatch>,
}

impl SnapshotPage {
    pub fn new(location: Url, html: impl Into<String>) -> Self {
        let (mutation_tx, _) = broadcast::channel(MUTATION_BUFFER_SIZE);
        Self {
            snapshot: RwLock::new(Snapshot {
                location,
                html: html.into(),
            }),
            mutation_tx,
        }
    }

    pub fn replace_content(&self, html: impl Into<String>) {
        let html = html.into();
        let batch = {
            let mut snapshot = self
                .snapshot
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            let batch = MutationBatch {
                added_nodes: html.matches('<').count(),
                removed_nodes: snapshot.html.matches('<').count(),
            };
            snapshot.html = html;
            batch
        };
        // No receivers just means nobody is observing.
        if self.mutation_tx.send(batch).is_err() {};
    }

    pub fn navigate(&self, location: Url) {
        self.snapshot
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .location = location;
    }
}

impl Page for SnapshotPage {
    fn location(&self) -> Url {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .location
            .clone()
    }

    fn content(&self) -> String {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .html
            .clone()
    }

    fn mutations(&self) -> broadcast::Receiver<MutationBatch> {
        self.mutation_tx.subscribe()
    }
}
