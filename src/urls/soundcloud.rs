//! SoundCloud artist pages, whose markup embeds the numeric user id

use super::UrlSource;
use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;

/// Scrapes the user id from a SoundCloud page and builds the RSS feed URL
pub struct SoundCloudSource {
    page_pattern: Regex,
    user_id_pattern: Regex,
}

impl SoundCloudSource {
    /// Build the source with its compiled patterns
    // the patterns are compile-time constants, so construction cannot fail at runtime
    #[allow(clippy::expect_used)]
    pub fn new() -> Self {
        Self {
            page_pattern: Regex::new(r"^https://soundcloud\.com/[\w-]+")
                .expect("page pattern is a valid regex"),
            user_id_pattern: Regex::new(r"(soundcloud(:/)?/users:)(?P<user_id>\d+)")
                .expect("user id pattern is a valid regex"),
        }
    }

    /// Extract the numeric user id from page markup
    pub(crate) fn extract_user_id<'a>(&self, body: &'a str) -> Option<&'a str> {
        self.user_id_pattern
            .captures(body)
            .and_then(|captures| captures.name("user_id"))
            .map(|id| id.as_str())
    }
}

impl Default for SoundCloudSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UrlSource for SoundCloudSource {
    fn name(&self) -> &'static str {
        "SoundCloud"
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

        let user_id = self.extract_user_id(&body)?;
        Some(format!(
            "https://feeds.soundcloud.com/users/soundcloud:users:{user_id}/sounds.rss"
        ))
    }
}
