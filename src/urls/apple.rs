//! Apple Podcasts and directory URLs carrying an iTunes podcast id
//!
//! Many apps link to shows through the iTunes directory rather than the feed
//! itself. The id embedded in such URLs can be turned into the canonical feed
//! URL via the public lookup API.

use super::UrlSource;
use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

const LOOKUP_URL: &str = "https://itunes.apple.com/lookup";

// cspell: disable
const APPLE_PODCASTS_FEED_ID_URLS: &str = r"(?x)https?://( # Verbose mode
    pca\.st/itunes/|                    # Pocket Casts
    castbox\.fm/channel/(id)?|          # Castbox
    castro\.fm/itunes/|                 # Castro
    overcast\.fm/itunes|                # Overcast
    geo\.itunes\.apple\.com/.*?/id|     # iTunes
    podcasts\.apple\.com/.*?/id         # Apple Podcasts
    )(?P<podcast_id>\d+)";

const CONTAINING_APPLE_PODCASTS_FEED_ID_URLS: &str = r"(?x)^https?://( # Verbose mode
    overcast\.fm/\+.+|                  # Overcast episode page
    castro\.fm/(episode|podcast)/.+     # Castro podcast and episode pages
    )$";

#[derive(Debug, Deserialize)]
struct LookupResult {
    #[serde(rename = "feedUrl")]
    url: String,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    results: Vec<LookupResult>,
}

async fn feed_by_id(client: &Client, lookup_url: &str, podcast_id: &str) -> Option<String> {
    let response = client
        .get(lookup_url)
        .query(&[("id", podcast_id), ("media", "podcast")])
        .send()
        .await
        .ok()?;
    if !response.status().is_success() {
        debug!(podcast_id, status = response.status().as_u16(), "lookup failed");
        return None;
    }

    let lookup: LookupResponse = response.json().await.ok()?;
    lookup.results.into_iter().next().map(|result| result.url)
}

/// Directory URLs that embed an iTunes podcast id directly
pub struct ApplePodcastsSource {
    pattern: Regex,
    lookup_url: String,
}

impl ApplePodcastsSource {
    /// Build the source against a custom lookup endpoint (used by tests)
    pub fn with_lookup_url(lookup_url: impl Into<String>) -> Self {
        Self {
            lookup_url: lookup_url.into(),
            ..Self::default()
        }
    }
}

impl Default for ApplePodcastsSource {
    // the pattern is a compile-time constant, so construction cannot fail at runtime
    #[allow(clippy::expect_used)]
    fn default() -> Self {
        Self {
            // anchored: the id must sit in the input URL itself, not somewhere inside it
            pattern: Regex::new(&format!("^{APPLE_PODCASTS_FEED_ID_URLS}"))
                .expect("id pattern is a valid regex"),
            lookup_url: LOOKUP_URL.to_string(),
        }
    }
}

#[async_trait]
impl UrlSource for ApplePodcastsSource {
    fn name(&self) -> &'static str {
        "ApplePodcasts"
    }

    async fn resolve(&self, client: &Client, url: &str) -> Option<String> {
        let captures = self.pattern.captures(url)?;
        feed_by_id(client, &self.lookup_url, &captures["podcast_id"]).await
    }
}

/// Bare numeric input (optionally prefixed with "id") treated as an iTunes id
pub struct ApplePodcastsByIdSource {
    pattern: Regex,
    lookup_url: String,
}

impl ApplePodcastsByIdSource {
    /// Build the source against a custom lookup endpoint (used by tests)
    pub fn with_lookup_url(lookup_url: impl Into<String>) -> Self {
        Self {
            lookup_url: lookup_url.into(),
            ..Self::default()
        }
    }
}

impl Default for ApplePodcastsByIdSource {
    // the pattern is a compile-time constant, so construction cannot fail at runtime
    #[allow(clippy::expect_used)]
    fn default() -> Self {
        Self {
            pattern: Regex::new(r"^(id)?(?P<podcast_id>\d+)$").expect("id pattern is a valid regex"),
            lookup_url: LOOKUP_URL.to_string(),
        }
    }
}

#[async_trait]
impl UrlSource for ApplePodcastsByIdSource {
    fn name(&self) -> &'static str {
        "ApplePodcastsById"
    }

    async fn resolve(&self, client: &Client, url: &str) -> Option<String> {
        let captures = self.pattern.captures(url)?;
        feed_by_id(client, &self.lookup_url, &captures["podcast_id"]).await
    }
}

/// App pages (Overcast, Castro) whose HTML embeds an iTunes directory link
pub struct ApplePodcastsPageSource {
    page_pattern: Regex,
    id_pattern: Regex,
    lookup_url: String,
}

impl ApplePodcastsPageSource {
    /// Build the source against a custom lookup endpoint (used by tests)
    pub fn with_lookup_url(lookup_url: impl Into<String>) -> Self {
        Self {
            lookup_url: lookup_url.into(),
            ..Self::default()
        }
    }

    /// Scan page content for an embedded iTunes podcast id
    pub(crate) fn find_podcast_id<'a>(&self, body: &'a str) -> Option<&'a str> {
        self.id_pattern
            .captures(body)
            .and_then(|captures| captures.name("podcast_id"))
            .map(|id| id.as_str())
    }
}

impl Default for ApplePodcastsPageSource {
    // the patterns are compile-time constants, so construction cannot fail at runtime
    #[allow(clippy::expect_used)]
    fn default() -> Self {
        Self {
            page_pattern: Regex::new(CONTAINING_APPLE_PODCASTS_FEED_ID_URLS)
                .expect("page pattern is a valid regex"),
            id_pattern: Regex::new(APPLE_PODCASTS_FEED_ID_URLS)
                .expect("id pattern is a valid regex"),
            lookup_url: LOOKUP_URL.to_string(),
        }
    }
}

#[async_trait]
impl UrlSource for ApplePodcastsPageSource {
    fn name(&self) -> &'static str {
        "ApplePodcastsPage"
    }

    async fn resolve(&self, client: &Client, url: &str) -> Option<String> {
        if !self.page_pattern.is_match(url) {
            return None;
        }

        let response = client.get(url).send().await.ok()?;
        if !response.status().is_success() {
            return None;
        }
        let body = response.text().await.ok()?;

        let podcast_id = self.find_podcast_id(&body)?.to_string();
        feed_by_id(client, &self.lookup_url, &podcast_id).await
    }
}
