//! Deep links that are just a feed URL behind an app-specific prefix

use super::UrlSource;
use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;

// cspell: disable
const SUPPORTED_PREFIXED_FEED_URLS: &str = r"(?x)^(
    https?://pcasts\.in/feed/|      #  Pocket Casts
    pktc://subscribe/|              #  Pocket Casts
    podcastrepublic://subscribe/|   #  Podcast Republic
    (
        overcast|           # https://overcast.fm
        beyondpod|          # http://beyondpod.mobi
        downcast|           # https://www.downcastapp.com
        gpodder|            # https://gpodder.github.io
        icatcher|           # https://icatcher.app/
        instacast|          # Instacast
        podcat|             # Podcat
        podcastaddict|      # Podcast Addict
        podscout|           # Podscout
        rssradio|           # http://rssrad.io
        pcast|              # Google Podcasts
        itpc|               # iTunes and misc Android apps
        podcasts            # Apple Podcasts
    )://
    )(?P<hostpath>.+)$";

/// Strips a known app prefix and returns the remainder as an http(s) URL
pub struct UrlPrefixSource {
    pattern: Regex,
}

impl UrlPrefixSource {
    /// Build the source with its compiled prefix pattern
    // the pattern is a compile-time constant, so construction cannot fail at runtime
    #[allow(clippy::expect_used)]
    pub fn new() -> Self {
        Self {
            pattern: Regex::new(SUPPORTED_PREFIXED_FEED_URLS)
                .expect("prefix pattern is a valid regex"),
        }
    }
}

impl Default for UrlPrefixSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UrlSource for UrlPrefixSource {
    fn name(&self) -> &'static str {
        "UrlPrefix"
    }

    async fn resolve(&self, _client: &Client, url: &str) -> Option<String> {
        let captures = self.pattern.captures(url)?;
        let feed = &captures["hostpath"];
        if feed.starts_with("http://") || feed.starts_with("https://") {
            Some(feed.to_string())
        } else {
            Some(format!("http://{feed}"))
        }
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    async fn resolve(url: &str) -> Option<String> {
        UrlPrefixSource::new().resolve(&Client::new(), url).await
    }

    #[tokio::test]
    async fn app_schemes_are_stripped() {
        assert_eq!(
            resolve("pcast://feeds.example.com/show.xml").await.as_deref(),
            Some("http://feeds.example.com/show.xml")
        );
        assert_eq!(
            resolve("itpc://feeds.example.com/show.xml").await.as_deref(),
            Some("http://feeds.example.com/show.xml")
        );
        assert_eq!(
            resolve("podcastrepublic://subscribe/feeds.example.com/show.xml")
                .await
                .as_deref(),
            Some("http://feeds.example.com/show.xml")
        );
    }

    #[tokio::test]
    async fn embedded_scheme_is_preserved() {
        assert_eq!(
            resolve("pktc://subscribe/https://feeds.example.com/show.xml")
                .await
                .as_deref(),
            Some("https://feeds.example.com/show.xml")
        );
    }

    #[tokio::test]
    async fn pcasts_in_links_are_unwrapped() {
        assert_eq!(
            resolve("https://pcasts.in/feed/feeds.example.com/show.xml")
                .await
                .as_deref(),
            Some("http://feeds.example.com/show.xml")
        );
    }

    #[tokio::test]
    async fn ordinary_urls_do_not_match() {
        assert_eq!(resolve("https://example.com/feed.xml").await, None);
        assert_eq!(resolve("ftp://example.com/feed.xml").await, None);
    }
}
