//! URL resolution heuristics
//!
//! Inputs handed to the processor are often not feed URLs at all: podcast-app
//! deep links, directory pages, short links. Each heuristic here implements
//! one way of turning such an input into a canonical feed URL; the registry
//! tries them in a fixed priority order and the first hit wins. The feed
//! model only ever receives the resolved URL.

mod apple;
mod fireside;
mod prefixed;
mod soundcloud;

pub use apple::{ApplePodcastsByIdSource, ApplePodcastsPageSource, ApplePodcastsSource};
pub use fireside::FiresideSource;
pub use prefixed::UrlPrefixSource;
pub use soundcloud::SoundCloudSource;

use async_trait::async_trait;
use reqwest::Client;
use tracing::info;

/// One URL-resolution heuristic
#[async_trait]
pub trait UrlSource: Send + Sync {
    /// Short identifier used in logs
    fn name(&self) -> &'static str;

    /// Try to turn `url` into a canonical feed URL
    ///
    /// Returns `None` when the heuristic does not apply or its lookup fails;
    /// resolution failures are never fatal.
    async fn resolve(&self, client: &Client, url: &str) -> Option<String>;
}

/// Fixed-priority chain of [`UrlSource`] heuristics
pub struct UrlSourceRegistry {
    sources: Vec<Box<dyn UrlSource>>,
}

impl UrlSourceRegistry {
    /// Registry with the built-in heuristics in their standard order
    pub fn with_default_sources() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(ApplePodcastsSource::default()));
        registry.register(Box::new(ApplePodcastsByIdSource::default()));
        registry.register(Box::new(ApplePodcastsPageSource::default()));
        registry.register(Box::new(UrlPrefixSource::new()));

        // Known website sources that define feeds as alternate+application/rss+xml
        // or use a deterministic URL pattern to find the feed URL from the website URL.
        registry.register(Box::new(FiresideSource::new()));
        registry.register(Box::new(SoundCloudSource::new()));
        registry
    }

    /// Registry with no heuristics (everything passes through unresolved)
    pub fn empty() -> Self {
        Self {
            sources: Vec::new(),
        }
    }

    /// Append a heuristic at the end of the chain
    pub fn register(&mut self, source: Box<dyn UrlSource>) {
        self.sources.push(source);
    }

    /// Run the chain; the first heuristic returning a URL wins
    pub async fn resolve(&self, client: &Client, url: &str) -> Option<String> {
        for source in &self.sources {
            if let Some(feed_url) = source.resolve(client, url).await {
                info!(source = source.name(), feed_url = %feed_url, "resolved feed URL");
                return Some(feed_url);
            }
        }
        None
    }
}

impl Default for UrlSourceRegistry {
    fn default() -> Self {
        Self::with_default_sources()
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> Client {
        Client::new()
    }

    #[tokio::test]
    async fn plain_feed_urls_pass_through_unresolved() {
        let registry = UrlSourceRegistry::with_default_sources();
        let resolved = registry
            .resolve(&client(), "https://example.com/feed.xml")
            .await;
        assert_eq!(resolved, None);
    }

    #[tokio::test]
    async fn first_matching_source_wins() {
        struct Fixed(&'static str, Option<&'static str>);

        #[async_trait]
        impl UrlSource for Fixed {
            fn name(&self) -> &'static str {
                self.0
            }
            async fn resolve(&self, _client: &Client, _url: &str) -> Option<String> {
                self.1.map(str::to_string)
            }
        }

        let mut registry = UrlSourceRegistry::empty();
        registry.register(Box::new(Fixed("miss", None)));
        registry.register(Box::new(Fixed("hit", Some("https://example.com/a.xml"))));
        registry.register(Box::new(Fixed("late", Some("https://example.com/b.xml"))));

        let resolved = registry.resolve(&client(), "whatever").await;
        assert_eq!(resolved.as_deref(), Some("https://example.com/a.xml"));
    }

    #[tokio::test]
    async fn deep_links_resolve_without_network() {
        let registry = UrlSourceRegistry::with_default_sources();
        let resolved = registry
            .resolve(&client(), "pcast://feeds.example.com/show.xml")
            .await;
        assert_eq!(resolved.as_deref(), Some("http://feeds.example.com/show.xml"));
    }
}
