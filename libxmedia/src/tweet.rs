//! One-shot download of every image attached to a single tweet.

use crate::download::{Downloader, Fetch};
use crate::errors::XmError;
use crate::link::MEDIA_SELECTOR;
use crate::naming::{tweet_file_name, NamingStyle};
use crate::resource::ResourceIdentifier;
use chrono::{DateTime, Local, NaiveDateTime};
use lazy_static::lazy_static;
use scraper::{ElementRef, Html, Selector};
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::sleep;
use tracing::instrument;

const UNKNOWN_AUTHOR: &str = "unknown";

lazy_static! {
    static ref TWEET_SELECTOR: Selector = Selector::parse(r#"article[role="article"]"#).unwrap();
    static ref AUTHOR_SELECTOR: Selector =
        Selector::parse(r#"[data-testid="User-Name"] div[dir="ltr"]"#).unwrap();
    static ref TIME_SELECTOR: Selector = Selector::parse("time[datetime]").unwrap();
}

/// Everything needed to name and fetch a tweet's images.
#[derive(Debug, Clone, PartialEq)]
pub struct TweetMedia {
    pub author: String,
    /// Local time the tweet was posted, or the time it was read when the
    /// page didn't say.
    pub posted_at: NaiveDateTime,
    /// In page order, without repeats.
    pub media: Vec<ResourceIdentifier>,
}

#[derive(Debug, Default)]
pub struct TweetReport {
    pub saved: Vec<PathBuf>,
    pub failures: Vec<(ResourceIdentifier, XmError)>,
}

/// Reads every tweet in the document.
pub fn tweets(html_string: &str) -> Vec<TweetMedia> {
    let html_document = Html::parse_document(html_string);
    let found: Vec<TweetMedia> = html_document
        .select(&TWEET_SELECTOR)
        .map(tweet_media)
        .collect();
    found
}

fn tweet_media(article: ElementRef) -> TweetMedia {
    let author = article
        .select(&AUTHOR_SELECTOR)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string());

    let posted_at = article
        .select(&TIME_SELECTOR)
        .next()
        .and_then(|element| element.value().attr("datetime"))
        .and_then(|stamp| DateTime::parse_from_rfc3339(stamp).ok())
        .map(|stamp| stamp.with_timezone(&Local).naive_local())
        .unwrap_or_else(|| Local::now().naive_local());

    let mut media: Vec<ResourceIdentifier> = Vec::new();
    for id in article
        .select(&MEDIA_SELECTOR)
        .filter_map(|element| element.value().attr("src"))
        .filter_map(ResourceIdentifier::parse)
    {
        if !media.contains(&id) {
            media.push(id);
        }
    }

    TweetMedia {
        author,
        posted_at,
        media,
    }
}

/// Downloads the tweet's images one after another, waiting `pacing` between
/// two downloads. Failures are collected and never stop the remaining items.
#[instrument(skip(downloader))]
pub async fn download_tweet<F: Fetch>(
    tweet: &TweetMedia,
    downloader: &Downloader<F>,
    style: NamingStyle,
    pacing: Duration,
) -> TweetReport {
    let mut report = TweetReport::default();
    let total = tweet.media.len();
    for (idx, id) in tweet.media.iter().enumerate() {
        if idx > 0 {
            sleep(pacing).await;
        }
        let file_name = tweet_file_name(&tweet.author, &tweet.posted_at, style, idx + 1, total);
        match downloader
            .fetch_and_save(&id.original_url(), &file_name)
            .await
        {
            Ok(path) => report.saved.push(path),
            Err(e) => {
                tracing::warn!("Failed downloading {}\nError : {}", id, e);
                report.failures.push((id.clone(), e));
            }
        }
    }
    report
}
