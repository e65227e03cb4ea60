//! Feed processing orchestration
//!
//! [`FeedProcessor::process`] drives one feed end to end: resolve the input
//! URL, walk the episode stream, decide per episode whether it is already
//! archived, dispatch the remainder to the shared download pool, and fold
//! every outcome into one [`ProcessingResult`]. The contract is total —
//! ordinary feed-level failures never escape as errors.

use crate::config::Config;
use crate::db::RecordStore;
use crate::download::{DownloadContext, DownloadJob, JobOutcome};
use crate::error::{Error, Result};
use crate::feed::{Episode, Feed, FeedInfo};
use crate::filename::FilenameFormatter;
use crate::session;
use crate::urls::UrlSourceRegistry;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Terminal summary classification of one feed's processing run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tombstone {
    /// The whole episode stream was traversed
    Completed,
    /// The feed was unchanged, or traversal stopped at the first archived episode
    FoundExisting,
    /// The configured maximum episode count stopped traversal
    MaxEpisodes,
    /// The feed could not be fetched or parsed
    Failed,
}

impl std::fmt::Display for Tombstone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Completed => "Archived all episodes",
            Self::FoundExisting => "Archive is up to date",
            Self::MaxEpisodes => "Maximum episode count reached",
            Self::Failed => "Failed",
        })
    }
}

/// Per-feed aggregate produced by one [`FeedProcessor::process`] call
#[derive(Debug)]
pub struct ProcessingResult {
    /// Show metadata, or `None` when feed resolution failed
    pub feed: Option<FeedInfo>,
    /// Episodes safely on disk after this run (downloaded or already present)
    pub success: u32,
    /// Episodes whose download failed
    pub failures: u32,
    /// How traversal of this feed ended
    pub tombstone: Tombstone,
}

impl ProcessingResult {
    fn failed() -> Self {
        Self {
            feed: None,
            success: 0,
            failures: 0,
            tombstone: Tombstone::Failed,
        }
    }
}

/// An episode either resolved eagerly or waiting on the download pool
enum EpisodeHandle {
    Ready(Episode, JobOutcome),
    Pending(JoinHandle<(Episode, JobOutcome)>),
}

/// What the collection phase decided for one episode
enum Pending {
    Eager(Episode, JobOutcome),
    Download(Episode, PathBuf),
}

/// Orchestrates feed traversal, dedup and concurrent downloads
///
/// Feeds are processed one at a time by the caller, but all episode downloads
/// share one fixed-size pool, bounding simultaneous transfers for the whole
/// run regardless of how many feeds are configured.
pub struct FeedProcessor {
    config: Arc<Config>,
    client: reqwest::Client,
    db: Arc<RecordStore>,
    formatter: FilenameFormatter,
    resolver: UrlSourceRegistry,
    pool: Arc<Semaphore>,
    cancel: CancellationToken,
    known_feeds: Mutex<HashMap<String, FeedInfo>>,
}

impl FeedProcessor {
    /// Create a processor, opening the record store and validating configuration
    ///
    /// Misconfiguration is the only error class surfaced here; everything
    /// feed-related is reported through [`ProcessingResult`] later.
    pub async fn new(config: Config) -> Result<Self> {
        config.validate()?;

        tokio::fs::create_dir_all(&config.archive_directory).await?;

        let client = session::build_client(&config)?;
        let db = RecordStore::open(&config.database_path(), config.ignore_database).await?;
        let formatter = FilenameFormatter::new(&config)?;
        let pool = Arc::new(Semaphore::new(config.concurrency));

        Ok(Self {
            config: Arc::new(config),
            client,
            db: Arc::new(db),
            formatter,
            resolver: UrlSourceRegistry::with_default_sources(),
            pool,
            cancel: CancellationToken::new(),
            known_feeds: Mutex::new(HashMap::new()),
        })
    }

    /// Request a cooperative shutdown
    ///
    /// Pending submissions resolve as aborted, in-flight downloads unwind
    /// between chunks and delete their partial files, and already-completed
    /// work is still recorded.
    pub fn shutdown(&self) {
        info!("shutting down, cancelling in-flight downloads");
        self.cancel.cancel();
    }

    /// Cancellation token driving this processor's downloads
    ///
    /// Exposed so callers can tie the processor into their own shutdown
    /// sequencing.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Archive one feed
    ///
    /// Total for all expected failure modes: network errors, unsupported
    /// content and validation failures fold into a `Failed` tombstone with
    /// `feed = None`; an unchanged feed folds into `FoundExisting`.
    pub async fn process(&self, url: &str) -> ProcessingResult {
        match self.process_inner(url).await {
            Ok(result) => result,
            Err(Error::NotModified(info)) => {
                info!(feed = %info, "feed is unchanged, skipping");
                ProcessingResult {
                    feed: Some(*info),
                    success: 0,
                    failures: 0,
                    tombstone: Tombstone::FoundExisting,
                }
            }
            Err(Error::HttpStatus { status, url }) => {
                error!(status, url = %url, "failed to retrieve feed");
                ProcessingResult::failed()
            }
            Err(e) => {
                error!(url, error = %e, "failed to process feed");
                ProcessingResult::failed()
            }
        }
    }

    async fn process_inner(&self, url: &str) -> Result<ProcessingResult> {
        if self.cancel.is_cancelled() {
            return Err(Error::ShuttingDown);
        }

        let feed_url = self
            .resolver
            .resolve(&self.client, url)
            .await
            .unwrap_or_else(|| url.to_string());

        let known_info = { self.known_feeds.lock().await.get(url).cloned() };
        let mut feed =
            Feed::fetch(&self.client, &self.config.retry, &feed_url, known_info.as_ref()).await?;
        self.known_feeds
            .lock()
            .await
            .insert(url.to_string(), feed.info.clone());

        info!(feed = %feed.info, "downloading archive");

        let (queue, tombstone) = self.collect_episodes(&mut feed).await?;
        let handles = self.dispatch(queue);
        let (success, failures) = self.handle_results(handles).await;

        Ok(ProcessingResult {
            feed: Some(feed.info.clone()),
            success,
            failures,
            tombstone,
        })
    }

    /// Walk the episode stream in yield order (newest first), deciding per
    /// episode whether to skip eagerly or queue a download
    async fn collect_episodes(&self, feed: &mut Feed) -> Result<(Vec<Pending>, Tombstone)> {
        let mut queue = Vec::new();
        let max_count = self.config.maximum_episode_count;
        let mut index: u32 = 0;

        while let Some(episode) = feed.next_episode().await? {
            if self.cancel.is_cancelled() {
                break;
            }
            index += 1;

            let target = self.formatter.format(&episode, &feed.info);
            if self.already_archived(&episode, &target).await? {
                debug!(episode = %episode, "already archived");
                queue.push(Pending::Eager(episode, JobOutcome::AlreadyExists));
                if self.config.update_archive {
                    info!(feed = %feed.info, "up to date with archive");
                    return Ok((queue, Tombstone::FoundExisting));
                }
            } else {
                debug!(episode = %episode, "queueing download");
                queue.push(Pending::Download(episode, target));
            }

            if max_count > 0 && index == max_count {
                info!(max_count, "reached requested maximum episode count");
                return Ok((queue, Tombstone::MaxEpisodes));
            }
        }

        Ok((queue, Tombstone::Completed))
    }

    /// The idempotency decision: is this episode already safely archived?
    ///
    /// Precedence: with no record-store entry, fall back to a disk-existence
    /// check (archives predating the store). With an entry, a changed length
    /// forces a re-download, as does a strictly newer publish time; otherwise
    /// the entry is authoritative over disk state.
    async fn already_archived(&self, episode: &Episode, target: &Path) -> Result<bool> {
        let Some(stored) = self.db.exists(&episode.guid).await? else {
            return Ok(tokio::fs::try_exists(target).await.unwrap_or(false));
        };

        if let (Some(stored_length), Some(live_length)) = (stored.length, episode.enclosure.length)
            && stored_length != live_length
        {
            debug!(
                episode = %episode,
                stored_length,
                live_length,
                "length changed under the same guid, re-downloading"
            );
            return Ok(false);
        }

        if let Some(stored_time) = stored.published_time
            && episode.published_time > stored_time
        {
            debug!(episode = %episode, "episode was republished, re-downloading");
            return Ok(false);
        }

        Ok(true)
    }

    /// Reverse the collected queue (archive oldest first) and submit the
    /// pending downloads to the shared pool
    fn dispatch(&self, mut queue: Vec<Pending>) -> Vec<EpisodeHandle> {
        queue.reverse();

        queue
            .into_iter()
            .map(|pending| match pending {
                Pending::Eager(episode, outcome) => EpisodeHandle::Ready(episode, outcome),
                Pending::Download(episode, target) => {
                    let job = DownloadJob::new(episode, target, self.download_context());
                    let permits = Arc::clone(&self.pool);
                    let cancel = self.cancel.clone();
                    EpisodeHandle::Pending(tokio::spawn(async move {
                        if cancel.is_cancelled() {
                            return job.into_aborted();
                        }
                        let Ok(_permit) = permits.acquire_owned().await else {
                            return job.into_aborted();
                        };
                        if cancel.is_cancelled() {
                            return job.into_aborted();
                        }
                        job.run().await
                    }))
                }
            })
            .collect()
    }

    fn download_context(&self) -> Arc<DownloadContext> {
        Arc::new(DownloadContext {
            client: self.client.clone(),
            retry: self.config.retry.clone(),
            cancel: self.cancel.clone(),
            max_download_bytes: self.config.max_download_bytes(),
            write_info_json: self.config.write_info_json,
        })
    }

    /// Resolve every handle in submission order and reconcile the bookkeeping
    ///
    /// Successful outcomes refresh the record store; aborted downloads count
    /// toward neither tally — a cancellation is not a failure.
    async fn handle_results(&self, handles: Vec<EpisodeHandle>) -> (u32, u32) {
        let mut success = 0;
        let mut failures = 0;

        for handle in handles {
            let (episode, outcome) = match handle {
                EpisodeHandle::Ready(episode, outcome) => (episode, outcome),
                EpisodeHandle::Pending(handle) => match handle.await {
                    Ok(resolved) => resolved,
                    Err(e) => {
                        error!(error = %e, "download task panicked");
                        failures += 1;
                        continue;
                    }
                },
            };

            debug!(episode = %episode, %outcome, "resolved episode outcome");
            if outcome.is_successful() {
                self.db.add(&episode).await;
                success += 1;
            } else if outcome == JobOutcome::Failed {
                failures += 1;
            }
        }

        (success, failures)
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::Link;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(dir: &TempDir) -> Config {
        Config {
            archive_directory: dir.path().to_path_buf(),
            retry: crate::config::RetryConfig {
                max_attempts: 0,
                initial_delay: std::time::Duration::from_millis(1),
                max_delay: std::time::Duration::from_millis(10),
                backoff_multiplier: 2.0,
                jitter: false,
            },
            ..Default::default()
        }
    }

    async fn processor(dir: &TempDir) -> FeedProcessor {
        FeedProcessor::new(test_config(dir)).await.unwrap()
    }

    async fn processor_with(config: Config) -> FeedProcessor {
        FeedProcessor::new(config).await.unwrap()
    }

    fn feed_xml(server_uri: &str, episodes: &[(&str, &str, u32)]) -> String {
        let items: String = episodes
            .iter()
            .map(|(guid, date, length)| {
                format!(
                    r#"<item><title>Episode {guid}</title><guid>{guid}</guid><pubDate>{date}</pubDate>
<enclosure url="{server_uri}/media/{guid}.mp3" length="{length}" type="audio/mpeg"/></item>"#
                )
            })
            .collect();
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"><channel>
<title>Test Show</title>
<link>https://example.com</link>
<description>test</description>
{items}
</channel></rss>"#
        )
    }

    async fn serve_feed(server: &MockServer, episodes: &[(&str, &str, u32)]) {
        let body = feed_xml(&server.uri(), episodes);
        Mock::given(method("GET"))
            .and(path("/feed.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/rss+xml"))
            .mount(server)
            .await;
    }

    async fn serve_media(server: &MockServer, guid: &str, expect: u64) {
        Mock::given(method("GET"))
            .and(path(format!("/media/{guid}.mp3")))
            .respond_with(ResponseTemplate::new(200).set_body_string(format!("media-{guid}")))
            .expect(expect)
            .mount(server)
            .await;
    }

    const EP1: (&str, &str, u32) = ("ep-1", "Mon, 01 Jan 2024 10:00:00 GMT", 100);
    const EP2: (&str, &str, u32) = ("ep-2", "Tue, 02 Jan 2024 10:00:00 GMT", 200);

    fn episode(guid: &str, media_url: &str, length: Option<u64>) -> Episode {
        Episode {
            title: format!("Episode {guid}"),
            subtitle: None,
            author: None,
            links: Vec::new(),
            enclosure: Link {
                rel: "enclosure".to_string(),
                mime_type: "audio/mpeg".to_string(),
                href: media_url.to_string(),
                length,
            },
            published_time: Utc.with_ymd_and_hms(2024, 1, 2, 10, 0, 0).unwrap(),
            guid: guid.to_string(),
            original_filename: format!("{guid}.mp3"),
            ext: "mp3".to_string(),
            summary: None,
            duration: None,
        }
    }

    // -----------------------------------------------------------------------
    // Dedup precedence
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn dedup_store_miss_falls_back_to_disk_check() {
        let dir = TempDir::new().unwrap();
        let proc = processor(&dir).await;
        let ep = episode("ep-1", "https://cdn.example.com/ep-1.mp3", Some(100));

        let absent = dir.path().join("absent.mp3");
        assert!(!proc.already_archived(&ep, &absent).await.unwrap());

        let present = dir.path().join("present.mp3");
        std::fs::write(&present, b"x").unwrap();
        assert!(proc.already_archived(&ep, &present).await.unwrap());
    }

    #[tokio::test]
    async fn dedup_store_entry_is_authoritative_over_disk() {
        let dir = TempDir::new().unwrap();
        let proc = processor(&dir).await;
        let ep = episode("ep-1", "https://cdn.example.com/ep-1.mp3", Some(100));
        proc.db.add(&ep).await;

        // file is gone, but the store says archived
        let absent = dir.path().join("absent.mp3");
        assert!(proc.already_archived(&ep, &absent).await.unwrap());
    }

    #[tokio::test]
    async fn dedup_length_mismatch_forces_redownload() {
        let dir = TempDir::new().unwrap();
        let proc = processor(&dir).await;
        proc.db
            .add(&episode("ep-1", "https://cdn.example.com/ep-1.mp3", Some(50)))
            .await;

        let live = episode("ep-1", "https://cdn.example.com/ep-1.mp3", Some(75));
        let present = dir.path().join("present.mp3");
        std::fs::write(&present, b"x").unwrap();

        assert!(
            !proc.already_archived(&live, &present).await.unwrap(),
            "changed length wins over both store hit and disk state"
        );
    }

    #[tokio::test]
    async fn dedup_newer_publish_time_forces_redownload() {
        let dir = TempDir::new().unwrap();
        let proc = processor(&dir).await;
        proc.db
            .add(&episode("ep-1", "https://cdn.example.com/ep-1.mp3", None))
            .await;

        let mut live = episode("ep-1", "https://cdn.example.com/ep-1.mp3", None);
        live.published_time = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();

        assert!(!proc.already_archived(&live, Path::new("/nope")).await.unwrap());
    }

    #[tokio::test]
    async fn dedup_older_or_equal_publish_time_skips() {
        let dir = TempDir::new().unwrap();
        let proc = processor(&dir).await;
        let mut stored = episode("ep-1", "https://cdn.example.com/ep-1.mp3", None);
        stored.published_time = Utc.with_ymd_and_hms(2999, 1, 1, 0, 0, 0).unwrap();
        proc.db.add(&stored).await;

        let live = episode("ep-1", "https://cdn.example.com/ep-1.mp3", None);
        assert!(proc.already_archived(&live, Path::new("/nope")).await.unwrap());
    }

    // -----------------------------------------------------------------------
    // process() end to end
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn happy_path_archives_every_episode() {
        let server = MockServer::start().await;
        serve_feed(&server, &[EP2, EP1]).await;
        serve_media(&server, "ep-1", 1).await;
        serve_media(&server, "ep-2", 1).await;

        let dir = TempDir::new().unwrap();
        let proc = processor(&dir).await;
        let result = proc.process(&format!("{}/feed.xml", server.uri())).await;

        assert_eq!(result.success, 2);
        assert_eq!(result.failures, 0);
        assert_eq!(result.tombstone, Tombstone::Completed);
        assert_eq!(result.feed.unwrap().title, "Test Show");

        let show_dir = dir.path().join("Test Show");
        assert!(show_dir.join("2024-01-01 - Episode ep-1.mp3").exists());
        assert!(show_dir.join("2024-01-02 - Episode ep-2.mp3").exists());

        assert!(proc.db.exists("ep-1").await.unwrap().is_some());
        assert!(proc.db.exists("ep-2").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn rerun_with_unchanged_feed_downloads_nothing() {
        let server = MockServer::start().await;
        serve_feed(&server, &[EP2, EP1]).await;
        // each media file may be fetched exactly once across both runs
        serve_media(&server, "ep-1", 1).await;
        serve_media(&server, "ep-2", 1).await;

        let dir = TempDir::new().unwrap();
        let url = format!("{}/feed.xml", server.uri());

        let first = processor(&dir).await;
        let result = first.process(&url).await;
        assert_eq!((result.success, result.failures), (2, 0));

        // fresh processor: no cached feed info, so the feed is re-walked and
        // the record store alone must prevent re-downloads
        let second = processor(&dir).await;
        let result = second.process(&url).await;

        assert_eq!(result.success, 2, "both episodes counted as archived");
        assert_eq!(result.failures, 0);
        assert_eq!(result.tombstone, Tombstone::Completed);
    }

    #[tokio::test]
    async fn second_process_call_short_circuits_via_cached_info() {
        let server = MockServer::start().await;
        serve_feed(&server, &[EP1]).await;
        serve_media(&server, "ep-1", 1).await;

        let dir = TempDir::new().unwrap();
        let proc = processor(&dir).await;
        let url = format!("{}/feed.xml", server.uri());

        let first = proc.process(&url).await;
        assert_eq!(first.tombstone, Tombstone::Completed);

        // same processor instance: cached updated_time is unchanged
        let second = proc.process(&url).await;
        assert_eq!(second.tombstone, Tombstone::FoundExisting);
        assert_eq!(second.success, 0);
        assert_eq!(second.feed.unwrap().title, "Test Show");
    }

    #[tokio::test]
    async fn length_change_redownloads_exactly_that_episode() {
        let server = MockServer::start().await;
        serve_feed(&server, &[EP2, EP1]).await;
        serve_media(&server, "ep-1", 1).await;

        let dir = TempDir::new().unwrap();
        let proc = processor(&dir).await;

        // previously archived: ep-2 matches the live feed, ep-1 was smaller
        proc.db
            .add(&episode(
                "ep-2",
                &format!("{}/media/ep-2.mp3", server.uri()),
                Some(200),
            ))
            .await;
        proc.db
            .add(&episode(
                "ep-1",
                &format!("{}/media/ep-1.mp3", server.uri()),
                Some(50),
            ))
            .await;

        let result = proc.process(&format!("{}/feed.xml", server.uri())).await;

        assert_eq!(result.success, 2);
        assert_eq!(result.failures, 0);
        // the expect(1) on ep-1's media mock verifies exactly one download
    }

    #[tokio::test]
    async fn maximum_episode_count_stops_enqueueing() {
        let server = MockServer::start().await;
        let episodes = [
            ("ep-5", "Fri, 05 Jan 2024 10:00:00 GMT", 100),
            ("ep-4", "Thu, 04 Jan 2024 10:00:00 GMT", 100),
            ("ep-3", "Wed, 03 Jan 2024 10:00:00 GMT", 100),
            EP2,
            EP1,
        ];
        serve_feed(&server, &episodes).await;
        serve_media(&server, "ep-5", 1).await;
        serve_media(&server, "ep-4", 1).await;

        let dir = TempDir::new().unwrap();
        let config = Config {
            maximum_episode_count: 2,
            ..test_config(&dir)
        };
        let proc = processor_with(config).await;
        let result = proc.process(&format!("{}/feed.xml", server.uri())).await;

        assert_eq!(result.tombstone, Tombstone::MaxEpisodes);
        assert_eq!(result.success, 2, "exactly two downloads were submitted");
        assert_eq!(result.failures, 0);
    }

    #[tokio::test]
    async fn update_mode_stops_at_first_archived_episode() {
        let server = MockServer::start().await;
        serve_feed(&server, &[EP2, EP1]).await;

        let dir = TempDir::new().unwrap();
        let config = Config {
            update_archive: true,
            ..test_config(&dir)
        };
        let proc = processor_with(config).await;

        // newest episode already archived with matching metadata
        proc.db
            .add(&episode(
                "ep-2",
                &format!("{}/media/ep-2.mp3", server.uri()),
                Some(200),
            ))
            .await;

        let result = proc.process(&format!("{}/feed.xml", server.uri())).await;

        assert_eq!(result.tombstone, Tombstone::FoundExisting);
        assert_eq!(result.success, 1, "the eager hit is still counted");
        assert_eq!(result.failures, 0);
    }

    #[tokio::test]
    async fn unreachable_feed_folds_into_failed_tombstone() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/feed.xml"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let proc = processor(&dir).await;
        let result = proc.process(&format!("{}/feed.xml", server.uri())).await;

        assert!(result.feed.is_none());
        assert_eq!(result.tombstone, Tombstone::Failed);
        assert_eq!((result.success, result.failures), (0, 0));
    }

    #[tokio::test]
    async fn failed_download_counts_without_aborting_siblings() {
        let server = MockServer::start().await;
        serve_feed(&server, &[EP2, EP1]).await;
        serve_media(&server, "ep-1", 1).await;
        Mock::given(method("GET"))
            .and(path("/media/ep-2.mp3"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let proc = processor(&dir).await;
        let result = proc.process(&format!("{}/feed.xml", server.uri())).await;

        assert_eq!(result.success, 1);
        assert_eq!(result.failures, 1);
        assert_eq!(result.tombstone, Tombstone::Completed);
        assert!(
            proc.db.exists("ep-1").await.unwrap().is_some(),
            "sibling success is still recorded"
        );
        assert!(
            proc.db.exists("ep-2").await.unwrap().is_none(),
            "failures are not recorded"
        );
    }

    #[tokio::test]
    async fn shutdown_before_processing_fails_cleanly() {
        let dir = TempDir::new().unwrap();
        let proc = processor(&dir).await;
        proc.shutdown();

        let result = proc.process("https://example.com/feed.xml").await;

        assert_eq!(result.tombstone, Tombstone::Failed);
    }

    #[tokio::test]
    async fn episodes_are_archived_oldest_first() {
        let server = MockServer::start().await;
        serve_feed(&server, &[EP2, EP1]).await;
        serve_media(&server, "ep-1", 1).await;
        serve_media(&server, "ep-2", 1).await;

        let dir = TempDir::new().unwrap();
        let config = Config {
            concurrency: 1, // serialize downloads so completion order is submission order
            ..test_config(&dir)
        };
        let proc = processor_with(config).await;
        proc.process(&format!("{}/feed.xml", server.uri())).await;

        let show_dir = dir.path().join("Test Show");
        let older = show_dir
            .join("2024-01-01 - Episode ep-1.mp3")
            .metadata()
            .unwrap()
            .modified()
            .unwrap();
        let newer = show_dir
            .join("2024-01-02 - Episode ep-2.mp3")
            .metadata()
            .unwrap()
            .modified()
            .unwrap();
        assert!(older <= newer, "oldest episode is written first");
    }
}
