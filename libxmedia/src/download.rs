use crate::errors::XmError;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use url::Url;

const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/108.0.0.0 Safari/537.36";

/// Retrieves the body of a resource.
#[async_trait]
pub trait Fetch: Send + Sync {
    /// Fails with [`XmError::HttpFailure`] on a non success status and
    /// [`XmError::NetworkFailure`] when no usable response arrived.
    async fn fetch(&self, url: &Url) -> Result<Bytes, XmError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    client: Client,
}

impl ReqwestFetcher {
    pub fn new() -> Result<Self, XmError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| XmError::NetworkFailure {
                url: String::new(),
                message: format!("failed to build http client. {e}"),
            })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetch for ReqwestFetcher {
    async fn fetch(&self, url: &Url) -> Result<Bytes, XmError> {
        let response = match self.client.get(url.clone()).send().await {
            Err(e) => {
                tracing::error!("Error downloading file from {}", url);
                tracing::error!("{}", e);
                return Err(XmError::NetworkFailure {
                    url: url.to_string(),
                    message: e.to_string(),
                });
            }
            Ok(r) => {
                if !r.status().is_success() {
                    tracing::error!("Error status code received : {} |{}|", r.status(), url);
                    return Err(XmError::HttpFailure {
                        status: r.status().as_u16(),
                        url: url.to_string(),
                    });
                }
                r
            }
        };
        response.bytes().await.map_err(|e| {
            tracing::error!("Error reading body of {}\nError : {}", url, e);
            XmError::NetworkFailure {
                url: url.to_string(),
                message: e.to_string(),
            }
        })
    }
}

/// Fetches resources and saves them under a destination directory.
#[derive(Debug)]
pub struct Downloader<F: Fetch = ReqwestFetcher> {
    fetcher: F,
    destination_dir: PathBuf,
}

impl<F: Fetch> Downloader<F> {
    pub fn new(fetcher: F, destination_dir: impl Into<PathBuf>) -> Self {
        Self {
            fetcher,
            destination_dir: destination_dir.into(),
        }
    }

    /// Downloads `url` into `file_name` inside the destination directory and
    /// returns the written path. Nothing is written unless the fetch
    /// succeeded.
    #[tracing::instrument(skip(self))]
    pub async fn fetch_and_save(&self, url: &Url, file_name: &str) -> Result<PathBuf, XmError> {
        if !self.destination_dir.exists() {
            tracing::error!("Destination directory does not exist. Aborting...");
            return Err(XmError::DestinationDirectoryDoesNotExist(
                self.destination_dir.to_string_lossy().to_string(),
            ));
        }

        let body = self.fetcher.fetch(url).await?;

        let destination = self.destination_dir.join(file_name);
        let dest_file = match OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&destination)
            .await
        {
            Err(e) => {
                tracing::error!(
                    "Error opening/creating file {}",
                    destination.to_string_lossy()
                );
                tracing::error!("{} | {}", e, e.kind());
                return Err(XmError::FileOperationError {
                    file_name: destination.to_string_lossy().to_string(),
                    message: format!("{} | {}", e, e.kind()),
                });
            }
            Ok(f) => f,
        };

        write_or_discard(dest_file, &destination, &body).await?;

        tracing::debug!(
            "Download completed for {}, file @ {}",
            url,
            destination.to_string_lossy()
        );
        Ok(destination)
    }
}

/// Writes `body` through `writer`. A partial file at `destination` is removed
/// when the write or flush fails.
async fn write_or_discard<W: AsyncWrite + Unpin>(
    mut writer: W,
    destination: &Path,
    body: &[u8],
) -> Result<(), XmError> {
    let written = match writer.write_all(body).await {
        Ok(()) => writer.flush().await,
        Err(e) => Err(e),
    };
    if let Err(e) = written {
        tracing::error!(
            "Error writing to destination file {}",
            destination.to_string_lossy()
        );
        drop(writer);
        if tokio::fs::remove_file(destination).await.is_err() {};
        return Err(XmError::FileOperationError {
            file_name: destination.to_string_lossy().to_string(),
            message: format!("{} | {}", e, e.kind()),
        });
    }
    Ok(())
}
