//! HTTP implementation of the `Downloader` port.
//!
//! Streams the body into a staging file next to the destination and renames
//! it into place once the body is complete, so a destination that exists is
//! always a full file. Every call stages into its own file; concurrent
//! downloads of the same image both succeed and the last rename wins.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;

use crate::application::ports::Downloader;
use crate::domain::NetworkError;

pub struct HttpDownloader {
    client: reqwest::Client,
    show_progress: bool,
}

impl HttpDownloader {
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialised.
    pub fn new(show_progress: bool) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("proxbox/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("building HTTP client")?;
        Ok(Self {
            client,
            show_progress,
        })
    }

    fn progress_bar(&self, total: Option<u64>) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        match total {
            Some(len) => {
                let pb = ProgressBar::new(len);
                pb.set_style(
                    ProgressStyle::default_bar()
                        .template("  [{bar:40}] {bytes}/{total_bytes} ({eta})")
                        .unwrap_or_else(|_| ProgressStyle::default_bar())
                        .progress_chars("█▓░"),
                );
                pb
            }
            None => ProgressBar::new_spinner(),
        }
    }
}

/// A uniquely named `.{file}.XXXXXX.part` file in the destination's directory.
/// Removed on drop unless persisted.
///
/// # Errors
///
/// Returns an error if the file cannot be created.
pub fn staging_file(dest: &Path) -> Result<NamedTempFile> {
    let dir = dest
        .parent()
        .filter(|d| !d.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let name = dest
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    tempfile::Builder::new()
        .prefix(&format!(".{name}."))
        .suffix(".part")
        .tempfile_in(dir)
        .with_context(|| format!("creating staging file in {}", dir.display()))
}

fn request_error(url: &str, err: &reqwest::Error) -> NetworkError {
    NetworkError::Request {
        url: url.to_string(),
        message: err.to_string(),
    }
}

impl Downloader for HttpDownloader {
    async fn download(&self, url: &str, dest: &Path, timeout: Duration) -> Result<()> {
        tracing::info!(%url, dest = %dest.display(), "downloading");

        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| request_error(url, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NetworkError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            }
            .into());
        }

        let (file, staged) = staging_file(dest)?.into_parts();
        let pb = self.progress_bar(response.content_length());
        let result = write_body(url, tokio::fs::File::from_std(file), &staged, response, &pb).await;
        pb.finish_and_clear();
        // On error `staged` is dropped here, deleting the staging file.
        result?;

        let staged_display = staged.display().to_string();
        staged
            .persist(dest)
            .with_context(|| format!("renaming {staged_display} to {}", dest.display()))?;
        tracing::debug!(dest = %dest.display(), "download complete");
        Ok(())
    }
}

async fn write_body(
    url: &str,
    mut file: tokio::fs::File,
    partial: &Path,
    response: reqwest::Response,
    pb: &ProgressBar,
) -> Result<()> {
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| request_error(url, &e))?;
        file.write_all(&chunk)
            .await
            .with_context(|| format!("writing {}", partial.display()))?;
        pb.inc(chunk.len() as u64);
    }
    file.flush()
        .await
        .with_context(|| format!("flushing {}", partial.display()))?;
    Ok(())
}
