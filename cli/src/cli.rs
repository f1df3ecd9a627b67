use clap::{Parser, Subcommand, ValueEnum};
use libxmedia::{
    download_tweet, is_media_page, tweets, BatchController, Downloader, Event, NamingStyle, Outcome, Page,
    ReqwestFetcher, Settings, SnapshotPage, Update, XmError,
};
use owo_colors::{OwoColorize, Stream::Stdout};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc::{channel, Receiver};
use tokio::time::sleep;
use url::Url;

const MAX_BUFFER_SIZE: usize = 100;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Media downloader for saved X/Twitter pages",
    long_about = "Collects the images of a profile's media tab or of single tweets from saved \
    page snapshots and downloads them in original quality."
)]
pub struct Cli {
    #[arg(long, global = true, help = "Settings file. Defaults to the platform config dir.")]
    settings: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Collect every image of a media tab, then download them.
    Batch {
        #[arg(help = "Url of the media tab, e.g https://x.com/someone/media")]
        page_url: Url,
        #[arg(
            required = true,
            help = "Html snapshots of the page in the order they were taken while scrolling."
        )]
        snapshots: Vec<PathBuf>,
        #[arg(short, long)]
        output_directory: Option<PathBuf>,
    },
    /// Download the images of every tweet in a snapshot.
    Tweet {
        snapshot: PathBuf,
        #[arg(short, long)]
        output_directory: Option<PathBuf>,
        #[arg(long, value_enum, help = "Overrides the saved naming style for this run.")]
        style: Option<StyleArg>,
    },
    /// Show or change the naming style used for single tweets.
    Style {
        #[arg(value_enum)]
        style: Option<StyleArg>,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum StyleArg {
    DateOnly,
    DateTimeSeconds,
}

impl From<StyleArg> for NamingStyle {
    fn from(arg: StyleArg) -> Self {
        match arg {
            StyleArg::DateOnly => NamingStyle::DateOnly,
            StyleArg::DateTimeSeconds => NamingStyle::DateTimeSeconds,
        }
    }
}

pub async fn execute(cli: Cli) -> Result<(), XmError> {
    let settings_path = match cli.settings {
        Some(p) => p,
        None => Settings::default_path()?,
    };
    let mut settings = Settings::load(&settings_path)?;

    match cli.command {
        Command::Batch {
            page_url,
            snapshots,
            output_directory,
        } => {
            let dest = output_directory.unwrap_or_else(|| settings.download_dir.clone());
            batch(&settings, page_url, &snapshots, dest).await
        }
        Command::Tweet {
            snapshot,
            output_directory,
            style,
        } => {
            if let Some(style) = style {
                settings.naming_style = style.into();
            }
            let dest = output_directory.unwrap_or_else(|| settings.download_dir.clone());
            tweet(&settings, &snapshot, dest).await
        }
        Command::Style { style } => {
            if let Some(style) = style {
                settings.naming_style = style.into();
                settings.save(&settings_path)?;
                tracing::info!("Naming style set to {:?}", settings.naming_style);
            }
            println!("Naming style : {}", settings.naming_style);
            Ok(())
        }
    }
}

async fn read_snapshot(path: &Path) -> Result<String, XmError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| XmError::FileOperationError {
            file_name: path.to_string_lossy().to_string(),
            message: format!("{} | {}", e, e.kind()),
        })
}

async fn prepare_destination(dest: &Path) -> Result<(), XmError> {
    if let Err(e) = tokio::fs::create_dir_all(dest).await {
        tracing::error!("Failed to create destination directory\nError : {}", e);
        return Err(XmError::DestinationDirectoryDoesNotExist(
            dest.to_string_lossy().to_string(),
        ));
    }
    Ok(())
}

async fn batch(
    settings: &Settings,
    page_url: Url,
    snapshots: &[PathBuf],
    dest: PathBuf,
) -> Result<(), XmError> {
    if !is_media_page(&page_url) {
        return Err(XmError::NotMediaPage(page_url.to_string()));
    }
    let mut documents = Vec::with_capacity(snapshots.len());
    for path in snapshots {
        documents.push(read_snapshot(path).await?);
    }
    prepare_destination(&dest).await?;

    let mut documents = documents.into_iter();
    let initial = documents.next().unwrap_or_default();
    let page = Arc::new(SnapshotPage::new(page_url, initial));
    let rule = settings.batch_rule();
    let window = rule.throttle_window;

    let (tx, rx) = channel::<Update>(MAX_BUFFER_SIZE);
    let printer = tokio::spawn(print_updates(rx));
    let controller = BatchController::new(
        page.clone(),
        Downloader::new(ReqwestFetcher::new()?, &dest),
        rule,
        tx,
    );
    let (event_tx, event_rx) = channel::<Event>(8);
    let runner = tokio::spawn(controller.run(event_rx));

    println!("Collecting media from {}....", page.location());
    if event_tx.send(Event::Toggle).await.is_err() {};
    for document in documents {
        // Give the throttled scan a window per snapshot.
        sleep(window).await;
        page.replace_content(document);
    }
    sleep(window).await;
    if event_tx.send(Event::Toggle).await.is_err() {};
    drop(event_tx);

    let outcomes = runner
        .await
        .map_err(|e| XmError::UnknownError(format!("download task failed. {e}")))?;
    if printer.await.is_err() {};

    for outcome in outcomes {
        match outcome {
            Ok(Outcome::Completed(report)) => {
                println!(
                    "Saved {} of {} images to {}",
                    report.saved.len(),
                    report.attempted,
                    dest.to_string_lossy()
                );
                for (id, e) in report.failures {
                    println!(
                        "{}",
                        format!("[Failed] {id} : {e}").if_supports_color(Stdout, |t| t.red())
                    );
                }
            }
            Ok(_) => {}
            // Already reported through the update channel.
            Err(XmError::EmptyCollection) => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

async fn tweet(settings: &Settings, snapshot: &Path, dest: PathBuf) -> Result<(), XmError> {
    let html = read_snapshot(snapshot).await?;
    let found = tweets(&html);
    if found.iter().all(|t| t.media.is_empty()) {
        println!("No tweet with images found in {}", snapshot.to_string_lossy());
        return Ok(());
    }
    prepare_destination(&dest).await?;

    let downloader = Downloader::new(ReqwestFetcher::new()?, &dest);
    for tweet in found.iter().filter(|t| !t.media.is_empty()) {
        println!("Downloading {} images from {}", tweet.media.len(), tweet.author);
        let report =
            download_tweet(tweet, &downloader, settings.naming_style, settings.tweet_pacing())
                .await;
        for path in report.saved {
            println!("[Downloaded] {}", path.to_string_lossy());
        }
        for (id, e) in report.failures {
            println!(
                "{}",
                format!("[Failed] {id} : {e}").if_supports_color(Stdout, |t| t.red())
            );
        }
    }
    Ok(())
}

async fn print_updates(mut rx: Receiver<Update>) {
    while let Some(update) = rx.recv().await {
        match &update {
            Update::MessageUpdate(msg) if msg.is_error => {
                println!("{}", update.if_supports_color(Stdout, |t| t.red()))
            }
            Update::MessageUpdate(_) => {
                println!("{}", update.if_supports_color(Stdout, |t| t.green()))
            }
            _ => println!("{update}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn parses_batch_arguments() {
        let cli = Cli::try_parse_from([
            "xmedia",
            "batch",
            "https://x.com/someone/media",
            "first.html",
            "second.html",
            "-o",
            "out",
        ])
        .unwrap();
        match cli.command {
            Command::Batch {
                page_url,
                snapshots,
                output_directory,
            } => {
                assert_eq!(page_url.as_str(), "https://x.com/someone/media");
                assert_eq!(snapshots.len(), 2);
                assert_eq!(output_directory, Some(PathBuf::from("out")));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn batch_needs_a_snapshot() {
        assert!(Cli::try_parse_from(["xmedia", "batch", "https://x.com/someone/media"]).is_err());
    }

    #[tokio::test]
    async fn batch_refuses_a_non_media_url() {
        let dir = TempDir::new().unwrap();
        let snapshot = dir.path().join("home.html");
        std::fs::write(&snapshot, r#"<main role="main"></main>"#).unwrap();
        let dest = dir.path().join("out");

        let result = batch(
            &Settings::default(),
            Url::parse("https://x.com/someone/status/1").unwrap(),
            &[snapshot],
            dest.clone(),
        )
        .await;

        assert_eq!(
            result.unwrap_err(),
            XmError::NotMediaPage("https://x.com/someone/status/1".to_string())
        );
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn style_command_persists_choice() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.toml");
        let cli = Cli::try_parse_from([
            "xmedia",
            "style",
            "date-time-seconds",
            "--settings",
            path.to_str().unwrap(),
        ])
        .unwrap();

        execute(cli).await.unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.naming_style, NamingStyle::DateTimeSeconds);
    }

    #[tokio::test]
    async fn tweet_without_media_downloads_nothing() {
        let dir = TempDir::new().unwrap();
        let snapshot = dir.path().join("tweet.html");
        std::fs::write(&snapshot, r#"<article role="article"><p>text only</p></article>"#).unwrap();
        let dest = dir.path().join("out");

        tweet(&Settings::default(), &snapshot, dest.clone())
            .await
            .unwrap();

        assert!(!dest.exists());
    }
}
