//! Feed and episode data model
//!
//! Raw parser output is funneled through [`RawEpisode::validate`], which
//! either yields a fully populated [`Episode`] or fails with the reason —
//! an episode without a usable enclosure never exists downstream.

use chrono::{DateTime, Utc};
use serde::Serialize;
use url::Url;

/// Titles longer than this are truncated on a word boundary
pub const MAX_TITLE_LENGTH: usize = 96;

/// One navigational or media link carried by a feed or an episode
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Link {
    /// Link relation ("enclosure", "next", "alternate", ...)
    pub rel: String,
    /// MIME type advertised for the link target
    pub mime_type: String,
    /// Link target URL
    pub href: String,
    /// Advertised size in bytes, when the feed provides one
    pub length: Option<u64>,
}

/// Show-level feed metadata
///
/// Reconstructed on every fetch. A cached copy (`known_info`) is carried
/// between runs to enable conditional re-fetch: `last_modified` feeds the
/// `If-Modified-Since` header and `updated_time` catches servers that do not
/// implement conditional GET correctly.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FeedInfo {
    /// Show title
    pub title: String,
    /// Show subtitle
    pub subtitle: Option<String>,
    /// Show author
    pub author: Option<String>,
    /// Show language code
    pub language: Option<String>,
    /// Navigational links, including pagination ("next") and "alternate" relations
    #[serde(skip)]
    pub links: Vec<Link>,
    /// Feed-level updated timestamp as parsed from the document
    #[serde(skip)]
    pub updated_time: Option<DateTime<Utc>>,
    /// Opaque `Last-Modified` response header cached for conditional re-fetch
    #[serde(skip)]
    pub last_modified: Option<String>,
}

impl Default for FeedInfo {
    fn default() -> Self {
        Self {
            title: "Untitled Podcast".to_string(),
            subtitle: None,
            author: None,
            language: None,
            links: Vec::new(),
            updated_time: None,
            last_modified: None,
        }
    }
}

impl FeedInfo {
    /// URL of the next page of this feed, if the document declares one
    pub fn next_page(&self) -> Option<&str> {
        self.links
            .iter()
            .find(|link| link.rel == "next" && !link.href.is_empty())
            .map(|link| link.href.as_str())
    }
}

impl std::fmt::Display for FeedInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.title)
    }
}

/// One fetched feed document: parse diagnostics, show metadata and the
/// episodes found on that page. Ephemeral — never persisted.
#[derive(Clone, Debug, Default)]
pub struct FeedPage {
    /// Set when the document only parsed after sanitisation of ill-formed XML
    pub malformed: bool,
    /// Show-level metadata parsed from this page
    pub info: FeedInfo,
    /// Episodes found on this page, in document order (newest first)
    pub episodes: Vec<Episode>,
}

/// One syndicated episode with a resolved media enclosure
#[derive(Clone, Debug, Serialize)]
pub struct Episode {
    /// Episode title
    pub title: String,
    /// Episode subtitle
    pub subtitle: Option<String>,
    /// Episode author
    pub author: Option<String>,
    /// All candidate links carried by the item
    pub links: Vec<Link>,
    /// The one link resolved as downloadable media
    pub enclosure: Link,
    /// Publication timestamp
    pub published_time: DateTime<Utc>,
    /// Stable identity; falls back to the enclosure URL when the feed omits one
    pub guid: String,
    /// Filename component of the enclosure URL path
    pub original_filename: String,
    /// File extension derived from the enclosure URL or its MIME type
    pub ext: String,
    /// Episode summary or description
    pub summary: Option<String>,
    /// Duration string as advertised by the feed
    pub duration: Option<String>,
}

impl std::fmt::Display for Episode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({})",
            self.title,
            self.published_time.format("%Y-%m-%d %H:%M")
        )
    }
}

/// Parser-level intermediate representation of one feed item
///
/// Everything is optional here; [`validate`](RawEpisode::validate) decides
/// whether the item becomes an [`Episode`] or is rejected with a reason.
#[derive(Clone, Debug, Default)]
pub(crate) struct RawEpisode {
    pub(crate) title: Option<String>,
    pub(crate) subtitle: Option<String>,
    pub(crate) author: Option<String>,
    pub(crate) links: Vec<Link>,
    pub(crate) guid: Option<String>,
    pub(crate) published_time: Option<DateTime<Utc>>,
    pub(crate) summary: Option<String>,
    pub(crate) duration: Option<String>,
}

impl RawEpisode {
    /// Validate the raw item into an [`Episode`], or fail with the reason
    pub(crate) fn validate(self) -> crate::error::Result<Episode> {
        let title = truncate(
            self.title
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| "Untitled Episode".to_string()),
            MAX_TITLE_LENGTH,
        );

        let enclosure = self
            .links
            .iter()
            .find(|link| is_media_link(link))
            .cloned()
            .ok_or_else(|| crate::error::Error::MissingEnclosure(title.clone()))?;

        let published_time = self
            .published_time
            .ok_or_else(|| crate::error::Error::InvalidFeed(format!(
                "episode '{title}' has no publication date"
            )))?;

        // See https://help.apple.com/itc/podcasts_connect/#/itcb54353390
        let guid = self
            .guid
            .filter(|g| !g.is_empty())
            .unwrap_or_else(|| enclosure.href.clone());

        let original_filename = filename_from_url(&enclosure.href);
        let ext = derive_extension(&original_filename, &enclosure.mime_type);

        Ok(Episode {
            title,
            subtitle: self.subtitle,
            author: self.author,
            links: self.links,
            enclosure,
            published_time,
            guid,
            original_filename,
            ext,
            summary: self.summary,
            duration: self.duration,
        })
    }
}

/// Whether a link qualifies as the downloadable media enclosure
fn is_media_link(link: &Link) -> bool {
    let marked_as_media = link.rel == "enclosure"
        || link.mime_type.starts_with("audio/")
        || link.mime_type.starts_with("video/");
    if !marked_as_media {
        return false;
    }
    match Url::parse(&link.href) {
        Ok(url) => matches!(url.scheme(), "http" | "https") && url.host().is_some(),
        Err(_) => false,
    }
}

fn filename_from_url(href: &str) -> String {
    Url::parse(href)
        .ok()
        .and_then(|url| {
            url.path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .unwrap_or_default()
}

fn derive_extension(original_filename: &str, mime_type: &str) -> String {
    if let Some((stem, suffix)) = original_filename.rsplit_once('.')
        && !stem.is_empty()
        && !suffix.is_empty()
    {
        return suffix.to_string();
    }
    generic_extension(mime_type).to_string()
}

fn generic_extension(mime_type: &str) -> &'static str {
    match mime_type {
        "audio/mp4" => "m4a",
        "audio/mp3" | "audio/mpeg" => "mp3",
        _ => "ext",
    }
}

/// Truncate a string to `max_length`, preferring a word boundary
pub(crate) fn truncate(value: String, max_length: usize) -> String {
    if value.chars().count() <= max_length {
        return value;
    }
    let truncated: String = value.chars().take(max_length).collect();
    match truncated.rsplit_once(' ') {
        Some((prefix, _)) if !prefix.is_empty() => format!("{prefix} …"),
        _ => {
            let shortened: String = value.chars().take(max_length - 1).collect();
            format!("{shortened}…")
        }
    }
}
