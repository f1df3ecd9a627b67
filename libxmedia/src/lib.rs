use std::fmt::{Display, Formatter};

mod controller;
mod download;
mod errors;
mod link;
mod naming;
mod observer;
mod page;
mod resource;
mod session;
mod settings;
mod throttle;
mod tweet;

pub use controller::{BatchController, BatchReport, BatchRule, Event, Outcome, SessionState};
pub use download::{Downloader, Fetch, ReqwestFetcher};
pub use errors::XmError;
pub use link::{is_media_page, locate, subject_from_url, CONTENT_ROOT};
pub use naming::{batch_file_name, datestamp, sanitize, tweet_file_name, NamingStyle};
pub use observer::{observe, Observer};
pub use page::{MutationBatch, Page, SnapshotPage};
pub use resource::ResourceIdentifier;
pub use session::CollectionSession;
pub use settings::Settings;
pub use throttle::{throttle, Throttle, Throttled};
pub use tweet::{download_tweet, tweets, TweetMedia, TweetReport};

#[derive(Debug, Clone)]
pub enum Update {
    /// Collection grew to `items` identifiers.
    Collecting { session_id: String, items: usize },
    DownloadProgress(Progress),
    MessageUpdate(Message),
}

#[derive(Debug, Clone)]
pub struct Message {
    pub session_id: String,
    pub content: String,
    pub resource_name: String,
    pub is_error: bool,
}

#[derive(Debug, Clone)]
pub struct Progress {
    pub session_id: String,
    /// 1 based
    pub index: usize,
    pub total: usize,
    pub resource_name: String,
}

impl Display for Update {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Update::Collecting { items, .. } => write!(f, "Collecting... ({items} items)"),
            Update::DownloadProgress(progress) => write!(
                f,
                "Downloading: {}/{} {}",
                progress.index, progress.total, progress.resource_name
            ),
            Update::MessageUpdate(msg) if msg.resource_name.is_empty() => {
                write!(f, "{}", msg.content)
            }
            Update::MessageUpdate(msg) => write!(f, "{} | {}", msg.content, msg.resource_name),
        }
    }
}
