//! # podcast-dl
//!
//! Podcast feed archiving library with bounded concurrency and atomic,
//! resumable downloads.
//!
//! ## Design Philosophy
//!
//! podcast-dl is designed to be:
//! - **Incremental** - re-runs download exactly the episodes not yet safely on disk
//! - **Safe to interrupt** - partial files are never visible under their final name
//! - **Bounded** - one fixed-size pool limits simultaneous transfers for the whole run
//! - **Library-first** - no CLI or UI, purely a Rust crate for embedding
//!
//! ## Quick Start
//!
//! ```no_run
//! use podcast_dl::{Config, FeedProcessor};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config {
//!         archive_directory: "./archive".into(),
//!         ..Default::default()
//!     };
//!
//!     let processor = FeedProcessor::new(config).await?;
//!     let result = processor.process("https://example.com/feed.xml").await;
//!     println!(
//!         "{}: {} archived, {} failed",
//!         result.tombstone, result.success, result.failures
//!     );
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Episode record store
pub mod db;
/// Single-episode download job
pub mod download;
/// Error types
pub mod error;
/// Feed model and paginated walker
pub mod feed;
/// Destination filename templating
pub mod filename;
/// Feed processing orchestration
pub mod processor;
/// Retry logic with exponential backoff
pub mod retry;
/// Shared HTTP client and request helpers
pub mod session;
/// URL resolution heuristics
pub mod urls;

// Re-export commonly used types
pub use config::{Config, RetryConfig};
pub use db::{RecordStore, StoredEpisode};
pub use download::{DownloadContext, DownloadJob, JobOutcome};
pub use error::{DatabaseError, Error, Result};
pub use feed::{Episode, Feed, FeedInfo, FeedPage, Link};
pub use filename::FilenameFormatter;
pub use processor::{FeedProcessor, ProcessingResult, Tombstone};
pub use urls::{UrlSource, UrlSourceRegistry};

use std::sync::Arc;

/// Archive a list of feeds sequentially with graceful signal handling.
///
/// A termination signal triggers the processor's `shutdown()`: pending
/// submissions resolve as aborted, in-flight downloads unwind cleanly, and
/// the results collected so far are still returned.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use podcast_dl::{Config, FeedProcessor, run_with_shutdown};
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let processor = Arc::new(FeedProcessor::new(Config::default()).await?);
///     let feeds = vec!["https://example.com/feed.xml".to_string()];
///
///     let results = run_with_shutdown(processor, &feeds).await;
///     println!("processed {} feeds", results.len());
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(
    processor: Arc<FeedProcessor>,
    feed_urls: &[String],
) -> Vec<ProcessingResult> {
    let signal_processor = Arc::clone(&processor);
    let signal_task = tokio::spawn(async move {
        wait_for_signal().await;
        signal_processor.shutdown();
    });

    let mut results = Vec::with_capacity(feed_urls.len());
    for url in feed_urls {
        results.push(processor.process(url).await);
    }

    signal_task.abort();
    results
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Set up signal handlers - these may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
