use crate::errors::XmError;
use crate::link::{has_content_root, CONTENT_ROOT};
use crate::page::Page;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

/// Handle to a running observation. Dropping it disposes it.
#[derive(Debug)]
pub struct Observer {
    alive: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl Observer {
    /// Stops all future callback invocations. Safe to call more than once.
    pub fn dispose(&self) {
        if self.alive.swap(false, Ordering::SeqCst) {
            tracing::debug!("Observer disposed");
        }
        self.task.abort();
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }
}

impl Drop for Observer {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Starts watching the page's content root, calling `on_change` once per
/// batch of mutations. The callback is expected to be throttled by the caller.
///
/// Fails with [`XmError::TargetNotFound`] when the page has no content root,
/// in which case nothing is spawned.
pub fn observe<P, F>(page: &P, on_change: F) -> Result<Observer, XmError>
where
    P: Page + ?Sized,
    F: Fn() + Send + Sync + 'static,
{
    // Subscribe before checking so no batch slips between check and spawn.
    let mut mutation_rx = page.mutations();
    if !has_content_root(&page.content()) {
        tracing::error!("Content root {} not found, nothing to observe", CONTENT_ROOT);
        return Err(XmError::TargetNotFound(CONTENT_ROOT.to_string()));
    }

    let alive = Arc::new(AtomicBool::new(true));
    let task_alive = alive.clone();
    let task = tokio::spawn(async move {
        loop {
            match mutation_rx.recv().await {
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!("Observer lagged behind by {} batches", skipped);
                }
                Err(RecvError::Closed) => break,
            }
            if !task_alive.load(Ordering::SeqCst) {
                break;
            }
            on_change();
        }
    });

    Ok(Observer { alive, task })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::SnapshotPage;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use url::Url;

    fn media_page(html: &str) -> SnapshotPage {
        SnapshotPage::new(Url::parse("https://x.com/someone/media").unwrap(), html)
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn calls_back_on_each_batch() {
        let page = media_page(r#"<main role="main"></main>"#);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let observer = observe(&page, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

        page.replace_content(r#"<main role="main"><p></p></main>"#);
        page.replace_content(r#"<main role="main"><p></p><p></p></main>"#);
        settle().await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(observer.is_alive());
    }

    #[tokio::test(start_paused = true)]
    async fn no_callback_after_dispose() {
        let page = media_page(r#"<main role="main"></main>"#);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let observer = observe(&page, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

        // Published but not yet delivered when disposal happens.
        page.replace_content(r#"<main role="main"><p></p></main>"#);
        observer.dispose();
        observer.dispose();
        page.replace_content(r#"<main role="main"><p></p><p></p></main>"#);
        settle().await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(!observer.is_alive());
    }

    #[tokio::test]
    async fn missing_root_is_target_not_found() {
        let page = media_page("<div></div>");
        let result = observe(&page, || {});
        assert_eq!(
            result.unwrap_err(),
            XmError::TargetNotFound(CONTENT_ROOT.to_string())
        );
    }
}
