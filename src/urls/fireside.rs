//! Fireside-hosted show pages, which map deterministically to their feed

use super::UrlSource;
use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;

/// Maps `<slug>.fireside.fm` pages to `feeds.fireside.fm/<slug>/rss`
pub struct FiresideSource {
    pattern: Regex,
}

impl FiresideSource {
    /// Build the source with its compiled host pattern
    // the pattern is a compile-time constant, so construction cannot fail at runtime
    #[allow(clippy::expect_used)]
    pub fn new() -> Self {
        Self {
            pattern: Regex::new(r"^https?://(?P<slug>[\w-]+)\.fireside\.fm")
                .expect("host pattern is a valid regex"),
        }
    }
}

impl Default for FiresideSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UrlSource for FiresideSource {
    fn name(&self) -> &'static str {
        "Fireside"
    }

    async fn resolve(&self, _client: &Client, url: &str) -> Option<String> {
        let captures = self.pattern.captures(url)?;
        Some(format!("https://feeds.fireside.fm/{}/rss", &captures["slug"]))
    }
}
