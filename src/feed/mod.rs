//! Paginated feed traversal with conditional re-fetch
//!
//! [`Feed::fetch`] loads the first page of a feed, honoring conditional-GET
//! semantics, and the resulting [`Feed`] walks all pages as one lazy,
//! forward-only episode stream.

mod model;
mod parser;

pub use model::{Episode, FeedInfo, FeedPage, Link};

use crate::config::RetryConfig;
use crate::error::{Error, Result};
use crate::session;
use reqwest::{Client, StatusCode};
use tracing::debug;

/// One feed being traversed page by page
///
/// The episode stream is lazy, forward-only and non-restartable: every
/// episode of the current page is yielded in document order (newest first),
/// then the `rel="next"` link is followed — unconditionally, without cached
/// info — until a page carries no such link.
#[derive(Debug)]
pub struct Feed {
    /// The URL the feed was fetched from
    pub url: String,
    /// Show metadata from the first page, stamped with the response's cache token
    pub info: FeedInfo,
    client: Client,
    retry: RetryConfig,
    page: Option<FeedPage>,
    cursor: usize,
}

impl Feed {
    /// Fetch the first page of a feed
    ///
    /// With `known_info` present this is a conditional request: an HTTP 304,
    /// or an unchanged feed-level `updated_time` (covering servers that do
    /// not implement conditional GET correctly), short-circuits with
    /// [`Error::NotModified`] carrying the cached info. A resource that is
    /// neither a feed nor discoverable as one is [`Error::NotSupported`].
    pub async fn fetch(
        client: &Client,
        retry: &RetryConfig,
        url: &str,
        known_info: Option<&FeedInfo>,
    ) -> Result<Self> {
        let page = fetch_page(client, retry, url, known_info).await?;
        debug!(
            title = %page.info.title,
            author = page.info.author.as_deref().unwrap_or(""),
            url,
            "loaded feed"
        );
        Ok(Self {
            url: url.to_string(),
            info: page.info.clone(),
            client: client.clone(),
            retry: retry.clone(),
            page: Some(page),
            cursor: 0,
        })
    }

    /// Advance the episode stream, fetching the next page when needed
    ///
    /// Returns `Ok(None)` once the last page is exhausted.
    pub async fn next_episode(&mut self) -> Result<Option<Episode>> {
        loop {
            let Some(page) = &self.page else {
                return Ok(None);
            };

            if self.cursor < page.episodes.len() {
                let episode = page.episodes[self.cursor].clone();
                self.cursor += 1;
                return Ok(Some(episode));
            }

            match page.info.next_page() {
                Some(next) => {
                    debug!(url = next, "found next page");
                    let next = next.to_string();
                    self.page = Some(fetch_page(&self.client, &self.retry, &next, None).await?);
                    self.cursor = 0;
                }
                None => {
                    debug!("page was the last");
                    self.page = None;
                }
            }
        }
    }
}

async fn fetch_page(
    client: &Client,
    retry: &RetryConfig,
    url: &str,
    known_info: Option<&FeedInfo>,
) -> Result<FeedPage> {
    let last_modified = known_info.and_then(|info| info.last_modified.as_deref());
    let response = session::get_feed(client, retry, url, last_modified).await?;

    if response.status() == StatusCode::NOT_MODIFIED
        && let Some(info) = known_info
    {
        debug!(url, "server reported 'not modified', skipping fetch");
        return Err(Error::NotModified(Box::new(info.clone())));
    }

    let header_last_modified = session::last_modified_header(&response);
    let body = response.bytes().await?;

    let page = match parser::parse_feed(&body, url) {
        Ok(page) => {
            let mut page = page;
            page.info.last_modified = header_last_modified;
            page
        }
        Err(Error::NotSupported(_)) => fetch_alternate(client, retry, &body, url).await?,
        Err(e) => return Err(e),
    };

    if let Some(known) = known_info
        && known.updated_time == page.info.updated_time
    {
        debug!(url, "feed's updated time did not change, skipping fetch");
        return Err(Error::NotModified(Box::new(known.clone())));
    }

    Ok(page)
}

/// One-shot rescue for a non-feed document that advertises a feed link
async fn fetch_alternate(
    client: &Client,
    retry: &RetryConfig,
    body: &[u8],
    url: &str,
) -> Result<FeedPage> {
    let Some(alternate) = parser::find_alternate_feed_link(body) else {
        return Err(Error::NotSupported(url.to_string()));
    };
    debug!(url, alternate = %alternate, "retrying against advertised feed link");

    let response = session::get_feed(client, retry, &alternate, None).await?;
    let header_last_modified = session::last_modified_header(&response);
    let body = response.bytes().await?;

    let mut page =
        parser::parse_feed(&body, &alternate).map_err(|_| Error::NotSupported(url.to_string()))?;
    page.info.last_modified = header_last_modified;
    Ok(page)
}
