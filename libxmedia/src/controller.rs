use crate::download::{Downloader, Fetch, ReqwestFetcher};
use crate::errors::XmError;
use crate::link::{is_media_page, locate, subject_from_url};
use crate::naming::batch_file_name;
use crate::observer::{observe, Observer};
use crate::page::Page;
use crate::resource::ResourceIdentifier;
use crate::session::CollectionSession;
use crate::throttle::throttle;
use crate::{Message, Progress, Update};
use chrono::Utc;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc::{Receiver, Sender};
use tokio::time::sleep;
use tracing::instrument;

#[derive(Debug, Clone)]
pub struct BatchRule {
    /// Minimum gap between two mutation triggered scans.
    pub throttle_window: Duration,
    /// Delay after every download, failed or not.
    pub pacing_delay: Duration,
}

impl Default for BatchRule {
    fn default() -> Self {
        Self {
            throttle_window: Duration::from_millis(500),
            pacing_delay: Duration::from_millis(1000),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Collecting,
    Downloading,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// The batch button was pressed.
    Toggle,
    /// The page location may have changed.
    Navigated,
}

#[derive(Debug)]
pub struct BatchReport {
    pub session_id: String,
    pub attempted: usize,
    pub saved: Vec<PathBuf>,
    pub failures: Vec<(ResourceIdentifier, XmError)>,
}

#[derive(Debug)]
pub enum Outcome {
    Collecting {
        session_id: String,
        subject: String,
        items: usize,
    },
    Completed(BatchReport),
    /// The event doesn't apply to the current state.
    Ignored,
}

/// Runs a single scan against the live session. Shared between the
/// controller's immediate scan and the observer callback.
struct Scanner<P: Page> {
    page: Arc<P>,
    session: Arc<Mutex<CollectionSession>>,
    update_tx: Sender<Update>,
}

impl<P: Page> Scanner<P> {
    fn scan(&self) {
        let found = locate(&self.page.content());
        let mut session = self
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if !session.is_open() {
            return;
        }
        let before = session.len();
        let count = session.add(found);
        if session.mark_reported(count) {
            tracing::debug!("Found {} new media, {} in total", count - before, count);
            if self
                .update_tx
                .try_send(Update::Collecting {
                    session_id: session.session_id.clone(),
                    items: count,
                })
                .is_err()
            {};
        }
    }
}

/// Collect-then-download state machine for a media tab.
///
/// `Idle -> Collecting` on the first toggle, `Collecting -> Downloading -> Idle`
/// on the second. Leaving the media tab while collecting, or stopping with
/// nothing collected, returns to `Idle` without downloading.
pub struct BatchController<P: Page, F: Fetch = ReqwestFetcher> {
    page: Arc<P>,
    downloader: Downloader<F>,
    rule: BatchRule,
    update_tx: Sender<Update>,
    state: SessionState,
    session: Option<Arc<Mutex<CollectionSession>>>,
    observer: Option<Observer>,
    /// Unthrottled scan of the live session, run once more at stop.
    scanner: Option<Arc<Scanner<P>>>,
}

impl<P: Page, F: Fetch> BatchController<P, F> {
    pub fn new(
        page: Arc<P>,
        downloader: Downloader<F>,
        rule: BatchRule,
        update_tx: Sender<Update>,
    ) -> Self {
        Self {
            page,
            downloader,
            rule,
            update_tx,
            state: SessionState::Idle,
            session: None,
            observer: None,
            scanner: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Number of identifiers collected so far in the live session.
    pub fn collected(&self) -> usize {
        self.session
            .as_ref()
            .map(|s| s.lock().unwrap_or_else(PoisonError::into_inner).len())
            .unwrap_or(0)
    }

    pub async fn handle(&mut self, event: Event) -> Result<Outcome, XmError> {
        match event {
            Event::Toggle => self.toggle().await,
            Event::Navigated => self.navigated(),
        }
    }

    /// Consumes events one at a time. Events arriving while a batch downloads
    /// wait in the channel until it finishes.
    pub async fn run(mut self, mut events: Receiver<Event>) -> Vec<Result<Outcome, XmError>> {
        let mut outcomes = Vec::new();
        while let Some(event) = events.recv().await {
            let outcome = self.handle(event).await;
            if let Err(e) = &outcome {
                tracing::warn!("{:?} ended with : {}", event, e);
            }
            outcomes.push(outcome);
        }
        self.teardown();
        outcomes
    }

    pub async fn toggle(&mut self) -> Result<Outcome, XmError> {
        match self.state {
            SessionState::Idle => self.start(),
            SessionState::Collecting => self.stop_and_download().await,
            SessionState::Downloading => Ok(Outcome::Ignored),
        }
    }

    #[instrument(skip(self))]
    fn start(&mut self) -> Result<Outcome, XmError> {
        let location = self.page.location();
        if !is_media_page(&location) {
            tracing::warn!("Batch download needs a media tab, got {}", location);
            return Err(XmError::NotMediaPage(location.to_string()));
        }
        let session_id = format!("Session-{}", Utc::now().timestamp());
        let subject = subject_from_url(&location);
        tracing::info!("Collecting media for {}", subject);

        let session = Arc::new(Mutex::new(CollectionSession::new(
            session_id.clone(),
            subject.clone(),
        )));
        let scanner = Arc::new(Scanner {
            page: self.page.clone(),
            session: session.clone(),
            update_tx: self.update_tx.clone(),
        });

        let observer_scanner = scanner.clone();
        let gated = throttle(move || observer_scanner.scan(), self.rule.throttle_window);
        // The session is dropped here on failure, state stays Idle.
        let observer = observe(self.page.as_ref(), move || gated.call())?;

        if self
            .update_tx
            .try_send(Update::Collecting {
                session_id: session_id.clone(),
                items: 0,
            })
            .is_err()
        {};
        scanner.scan();

        let items = session.lock().unwrap_or_else(PoisonError::into_inner).len();
        self.session = Some(session);
        self.observer = Some(observer);
        self.scanner = Some(scanner);
        self.state = SessionState::Collecting;
        Ok(Outcome::Collecting {
            session_id,
            subject,
            items,
        })
    }

    #[instrument(skip(self))]
    async fn stop_and_download(&mut self) -> Result<Outcome, XmError> {
        self.dispose_observer();
        // Media added during the last cooldown window is only picked up here.
        if let Some(scanner) = self.scanner.take() {
            scanner.scan();
        }
        let (session_id, subject, queue) = match &self.session {
            Some(session) => {
                let mut session = session.lock().unwrap_or_else(PoisonError::into_inner);
                session.close();
                (
                    session.session_id.clone(),
                    session.subject.clone(),
                    session.members(),
                )
            }
            None => {
                self.state = SessionState::Idle;
                return Ok(Outcome::Ignored);
            }
        };

        if queue.is_empty() {
            tracing::info!("Nothing collected for {}", subject);
            self.session = None;
            self.state = SessionState::Idle;
            self.send_message(&session_id, XmError::EmptyCollection.to_string(), "", true)
                .await;
            return Err(XmError::EmptyCollection);
        }

        self.state = SessionState::Downloading;
        let total = queue.len();
        tracing::info!("Downloading {} media for {}", total, subject);
        let mut report = BatchReport {
            session_id: session_id.clone(),
            attempted: 0,
            saved: Vec::new(),
            failures: Vec::new(),
        };

        for (idx, id) in queue.into_iter().enumerate() {
            let file_name = batch_file_name(&subject, id.media_id());
            if (self
                .update_tx
                .send(Update::DownloadProgress(Progress {
                    session_id: session_id.clone(),
                    index: idx + 1,
                    total,
                    resource_name: file_name.clone(),
                }))
                .await)
                .is_err()
            {};

            report.attempted += 1;
            match self
                .downloader
                .fetch_and_save(&id.original_url(), &file_name)
                .await
            {
                Ok(path) => report.saved.push(path),
                Err(e) => {
                    tracing::warn!("Failed downloading {}. Continuing...\nError : {}", id, e);
                    self.send_message(&session_id, e.to_string(), &file_name, true)
                        .await;
                    report.failures.push((id, e));
                }
            }
            sleep(self.rule.pacing_delay).await;
        }

        self.session = None;
        self.state = SessionState::Idle;
        self.send_message(
            &session_id,
            format!(
                "Download complete. {} attempted, {} saved",
                report.attempted,
                report.saved.len()
            ),
            "",
            !report.failures.is_empty(),
        )
        .await;
        Ok(Outcome::Completed(report))
    }

    fn navigated(&mut self) -> Result<Outcome, XmError> {
        if self.state != SessionState::Collecting || is_media_page(&self.page.location()) {
            return Ok(Outcome::Ignored);
        }
        tracing::info!("Left the media page, collection stopped");
        self.teardown();
        Err(XmError::NavigationAbort)
    }

    fn dispose_observer(&mut self) {
        if let Some(observer) = self.observer.take() {
            observer.dispose();
        }
    }

    /// Drops the live session without downloading anything.
    fn teardown(&mut self) {
        self.dispose_observer();
        self.scanner = None;
        if let Some(session) = self.session.take() {
            let mut session = session.lock().unwrap_or_else(PoisonError::into_inner);
            session.close();
            session.drain();
        }
        self.state = SessionState::Idle;
    }

    async fn send_message(&self, session_id: &str, content: String, resource: &str, is_error: bool) {
        if (self
            .update_tx
            .send(Update::MessageUpdate(Message {
                session_id: session_id.to_string(),
                content,
                resource_name: resource.to_string(),
                is_error,
            }))
            .await)
            .is_err()
        {};
    }
}
