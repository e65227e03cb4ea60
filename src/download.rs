//! Single-episode download job
//!
//! Downloads one episode's media to a temporary path and atomically
//! publishes it. The job is cancellable between chunks and never leaves a
//! partially written file visible at the target path.

use crate::config::RetryConfig;
use crate::error::{Error, Result};
use crate::feed::Episode;
use crate::session;
use futures::StreamExt;
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Terminal outcome of one download job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    /// The target file already existed; nothing was downloaded
    AlreadyExists,
    /// The media file was downloaded and published
    Completed,
    /// The download failed; no artifact was left behind
    Failed,
    /// The download was cancelled cooperatively; no artifact was left behind
    Aborted,
}

impl JobOutcome {
    /// Whether the episode is safely on disk after this outcome
    pub fn is_successful(self) -> bool {
        matches!(self, Self::AlreadyExists | Self::Completed)
    }
}

impl std::fmt::Display for JobOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::AlreadyExists => "Present",
            Self::Completed => "Archived",
            Self::Failed => "Failed",
            Self::Aborted => "Aborted",
        })
    }
}

/// Resources and policy shared by all download jobs of one run
pub struct DownloadContext {
    /// Shared HTTP client
    pub client: Client,
    /// Transport-level retry policy for the request/response-header phase
    pub retry: RetryConfig,
    /// Cooperative cancellation flag, observed between chunks
    pub cancel: CancellationToken,
    /// Byte cap for partial/debug downloads
    pub max_download_bytes: Option<u64>,
    /// Write a `.info.json` metadata sidecar next to the media file
    pub write_info_json: bool,
}

/// One episode download, fully configured at construction
pub struct DownloadJob {
    episode: Episode,
    target: PathBuf,
    ctx: Arc<DownloadContext>,
}

impl DownloadJob {
    /// Bind a job to an episode and its destination path
    pub fn new(episode: Episode, target: PathBuf, ctx: Arc<DownloadContext>) -> Self {
        Self {
            episode,
            target,
            ctx,
        }
    }

    /// Resolve the job as aborted without running it
    ///
    /// Used for submissions that were cancelled before they started.
    pub fn into_aborted(self) -> (Episode, JobOutcome) {
        debug!(episode = %self.episode, "download cancelled before start");
        (self.episode, JobOutcome::Aborted)
    }

    /// Execute the download and report its terminal outcome
    ///
    /// Never panics or errors: cancellation maps to [`JobOutcome::Aborted`],
    /// everything else unexpected to [`JobOutcome::Failed`].
    pub async fn run(self) -> (Episode, JobOutcome) {
        let outcome = match self.execute().await {
            Ok(outcome) => outcome,
            Err(Error::Aborted) => {
                debug!(episode = %self.episode, "download aborted");
                JobOutcome::Aborted
            }
            Err(e) => {
                error!(
                    episode = %self.episode,
                    url = %self.episode.enclosure.href,
                    error = %e,
                    "download failed"
                );
                JobOutcome::Failed
            }
        };
        (self.episode, outcome)
    }

    async fn execute(&self) -> Result<JobOutcome> {
        // defense in depth against races with the dedup check
        if fs::try_exists(&self.target).await.unwrap_or(false) {
            return Ok(JobOutcome::AlreadyExists);
        }

        if let Some(parent) = self.target.parent() {
            fs::create_dir_all(parent).await?;
        }

        if self.ctx.write_info_json {
            self.write_sidecar().await?;
        }

        info!(episode = %self.episode, "downloading");
        let response = session::get_and_raise(
            &self.ctx.client,
            &self.ctx.retry,
            &self.episode.enclosure.href,
        )
        .await?;

        let part = part_path(&self.target);
        if let Err(e) = self.receive_body(response, &part).await {
            let _ = fs::remove_file(&part).await;
            return Err(e);
        }

        // only this rename makes the file visible under its final name
        if let Err(e) = fs::rename(&part, &self.target).await {
            let _ = fs::remove_file(&part).await;
            return Err(e.into());
        }

        info!(episode = %self.episode, "completed");
        Ok(JobOutcome::Completed)
    }

    async fn receive_body(&self, response: reqwest::Response, part: &Path) -> Result<()> {
        let mut file = fs::File::create(part).await?;
        let mut written: u64 = 0;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(Error::Network)?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;

            if let Some(cap) = self.ctx.max_download_bytes
                && written >= cap
            {
                file.set_len(cap).await?;
                debug!(cap, "partial download cap reached");
                break;
            }

            if self.ctx.cancel.is_cancelled() {
                return Err(Error::Aborted);
            }
        }

        file.flush().await?;
        file.sync_all().await?;
        Ok(())
    }

    /// Serialize the episode's structured fields next to the media file,
    /// with the same temp-then-rename discipline as the media itself
    async fn write_sidecar(&self) -> Result<()> {
        let sidecar = info_json_path(&self.target);
        let part = part_path(&sidecar);

        let mut body = serde_json::to_vec_pretty(&self.episode)?;
        body.push(b'\n');

        let write = async {
            let mut file = fs::File::create(&part).await?;
            file.write_all(&body).await?;
            file.flush().await?;
            file.sync_all().await?;
            Ok::<_, Error>(())
        };
        if let Err(e) = write.await {
            let _ = fs::remove_file(&part).await;
            return Err(e);
        }

        if let Err(e) = fs::rename(&part, &sidecar).await {
            let _ = fs::remove_file(&part).await;
            return Err(e.into());
        }
        debug!(path = %sidecar.display(), "wrote episode metadata");
        Ok(())
    }
}

/// Temporary path a file is streamed to before the atomic rename
fn part_path(target: &Path) -> PathBuf {
    target.with_extension("part")
}

/// Path of the metadata sidecar belonging to a media target
pub(crate) fn info_json_path(target: &Path) -> PathBuf {
    target.with_extension("info.json")
}
