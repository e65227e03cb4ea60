//! Feed document parsing
//!
//! Parses one fetched document into a [`FeedPage`], accepting both RSS 2.0
//! and Atom. Ill-formed XML gets one lenient retry after sanitisation; a
//! document that is no feed at all can still be rescued by the caller via
//! [`find_alternate_feed_link`].

use crate::error::{Error, Result};
use crate::feed::model::{Episode, FeedInfo, FeedPage, Link, RawEpisode};
use chrono::{DateTime, Utc};
use regex::Regex;
use tracing::{debug, warn};

/// Parse a fetched document into a [`FeedPage`]
///
/// Tries a strict parse first (RSS, then Atom). If that fails, the body is
/// sanitised (control characters stripped, stray ampersands escaped) and
/// parsed once more; success there marks the page as malformed. A document
/// that still does not parse is [`Error::NotSupported`].
pub(crate) fn parse_feed(body: &[u8], source_url: &str) -> Result<FeedPage> {
    if let Some(page) = parse_document(body) {
        return Ok(page);
    }

    let sanitized = sanitize_xml(body);
    if let Some(mut page) = parse_document(&sanitized) {
        warn!(
            url = source_url,
            "feed content is not well-formed, continuing anyway"
        );
        page.malformed = true;
        return Ok(page);
    }

    Err(Error::NotSupported(source_url.to_string()))
}

/// Scan a non-feed document (typically HTML) for an advertised feed link
///
/// Looks for `<link ... type="application/rss+xml" ... href="...">` with
/// attributes in any order.
pub(crate) fn find_alternate_feed_link(body: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(body);
    let tag_re = Regex::new(r"(?is)<link\b[^>]*>").ok()?;
    let href_re = Regex::new(r#"(?i)href\s*=\s*["']([^"']+)["']"#).ok()?;

    for tag in tag_re.find_iter(&text) {
        let tag = tag.as_str();
        if !tag.contains("application/rss+xml") {
            continue;
        }
        if let Some(caps) = href_re.captures(tag) {
            return Some(caps[1].to_string());
        }
    }
    None
}

fn parse_document(body: &[u8]) -> Option<FeedPage> {
    if let Ok(channel) = rss::Channel::read_from(body) {
        return Some(page_from_rss(&channel));
    }
    if let Ok(feed) = atom_syndication::Feed::read_from(body) {
        return Some(page_from_atom(&feed));
    }
    None
}

fn page_from_rss(channel: &rss::Channel) -> FeedPage {
    let mut links = Vec::new();
    if let Some(atom_ext) = channel.atom_ext() {
        for link in atom_ext.links() {
            links.push(atom_link(link));
        }
    }
    if !channel.link().is_empty() {
        links.push(Link {
            rel: "alternate".to_string(),
            mime_type: "text/html".to_string(),
            href: channel.link().to_string(),
            length: None,
        });
    }

    let itunes = channel.itunes_ext();
    let info = FeedInfo {
        title: non_empty(channel.title()).unwrap_or_else(|| FeedInfo::default().title),
        subtitle: itunes.and_then(|ext| ext.subtitle()).map(str::to_string),
        author: itunes
            .and_then(|ext| ext.author())
            .or(channel.managing_editor())
            .map(str::to_string),
        language: channel.language().map(str::to_string),
        links,
        updated_time: channel
            .last_build_date()
            .or(channel.pub_date())
            .and_then(parse_rfc2822),
        last_modified: None,
    };

    let episodes = channel
        .items()
        .iter()
        .filter_map(|item| collect_episode(raw_from_rss_item(item)))
        .collect();

    FeedPage {
        malformed: false,
        info,
        episodes,
    }
}

fn raw_from_rss_item(item: &rss::Item) -> RawEpisode {
    let mut links = Vec::new();
    if let Some(enclosure) = item.enclosure() {
        links.push(Link {
            rel: "enclosure".to_string(),
            mime_type: enclosure.mime_type().to_string(),
            href: enclosure.url().to_string(),
            length: enclosure.length().parse().ok(),
        });
    }
    if let Some(atom_ext) = item.atom_ext() {
        for link in atom_ext.links() {
            links.push(atom_link(link));
        }
    }
    if let Some(href) = item.link() {
        links.push(Link {
            rel: "alternate".to_string(),
            mime_type: "text/html".to_string(),
            href: href.to_string(),
            length: None,
        });
    }

    let itunes = item.itunes_ext();
    RawEpisode {
        title: item.title().map(str::to_string),
        subtitle: itunes.and_then(|ext| ext.subtitle()).map(str::to_string),
        author: itunes
            .and_then(|ext| ext.author())
            .or(item.author())
            .map(str::to_string),
        links,
        guid: item.guid().map(|guid| guid.value().to_string()),
        published_time: item.pub_date().and_then(parse_rfc2822),
        summary: itunes
            .and_then(|ext| ext.summary())
            .or(item.description())
            .map(str::to_string),
        duration: itunes.and_then(|ext| ext.duration()).map(str::to_string),
    }
}

fn page_from_atom(feed: &atom_syndication::Feed) -> FeedPage {
    let links = feed.links().iter().map(atom_link).collect();

    let info = FeedInfo {
        title: non_empty(feed.title().as_str()).unwrap_or_else(|| FeedInfo::default().title),
        subtitle: feed.subtitle().map(|text| text.as_str().to_string()),
        author: feed.authors().first().map(|person| person.name().to_string()),
        language: feed.lang().map(str::to_string),
        links,
        updated_time: Some(feed.updated().with_timezone(&Utc)),
        last_modified: None,
    };

    let episodes = feed
        .entries()
        .iter()
        .filter_map(|entry| collect_episode(raw_from_atom_entry(entry)))
        .collect();

    FeedPage {
        malformed: false,
        info,
        episodes,
    }
}

fn raw_from_atom_entry(entry: &atom_syndication::Entry) -> RawEpisode {
    RawEpisode {
        title: non_empty(entry.title().as_str()),
        subtitle: None,
        author: entry
            .authors()
            .first()
            .map(|person| person.name().to_string()),
        links: entry.links().iter().map(atom_link).collect(),
        guid: non_empty(entry.id()),
        published_time: entry
            .published()
            .or(Some(entry.updated()))
            .map(|time| time.with_timezone(&Utc)),
        summary: entry.summary().map(|text| text.as_str().to_string()),
        duration: None,
    }
}

/// Validate a raw item, dropping it with a logged reason instead of guessing
fn collect_episode(raw: RawEpisode) -> Option<Episode> {
    match raw.validate() {
        Ok(episode) => Some(episode),
        Err(reason) => {
            debug!(%reason, "skipping feed item");
            None
        }
    }
}

fn atom_link(link: &atom_syndication::Link) -> Link {
    Link {
        rel: link.rel().to_string(),
        mime_type: link.mime_type().unwrap_or_default().to_string(),
        href: link.href().to_string(),
        length: link.length().and_then(|value| value.parse().ok()),
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

fn parse_rfc2822(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value)
        .ok()
        .map(|time| time.with_timezone(&Utc))
}

/// Repair the two most common well-formedness defects in the wild:
/// raw control characters and unescaped ampersands.
fn sanitize_xml(body: &[u8]) -> Vec<u8> {
    let stripped: Vec<u8> = body
        .iter()
        .copied()
        .filter(|byte| *byte >= 0x20 || matches!(byte, b'\t' | b'\n' | b'\r'))
        .collect();
    escape_stray_ampersands(&stripped)
}

fn escape_stray_ampersands(body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(body.len());
    let mut i = 0;
    while i < body.len() {
        let byte = body[i];
        if byte == b'&' && !starts_entity(&body[i..]) {
            out.extend_from_slice(b"&amp;");
        } else {
            out.push(byte);
        }
        i += 1;
    }
    out
}

/// Whether the slice starting at '&' looks like a character entity
fn starts_entity(rest: &[u8]) -> bool {
    // longest named entities in feeds are short; 12 bytes is plenty
    let window = &rest[1..rest.len().min(12)];
    let Some(end) = window.iter().position(|byte| *byte == b';') else {
        return false;
    };
    let name = &window[..end];
    !name.is_empty()
        && (name[0] == b'#' || name.iter().all(|byte| byte.is_ascii_alphanumeric()))
}
