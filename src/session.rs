//! Shared HTTP client construction and request helpers
//!
//! All outbound traffic goes through one [`reqwest::Client`] carrying a
//! descriptive User-Agent and a sane timeout. The helpers here layer
//! conditional-GET support and transient-failure retries on top.

use crate::config::{Config, RetryConfig};
use crate::error::{Error, Result};
use crate::retry::fetch_with_retry;
use reqwest::header::{IF_MODIFIED_SINCE, LAST_MODIFIED};
use reqwest::{Client, Response, StatusCode};

/// Client identifier sent with every request
pub const USER_AGENT: &str = concat!(
    "podcast-dl/",
    env!("CARGO_PKG_VERSION"),
    " (+https://github.com/podcast-dl/podcast-dl)"
);

/// Build the shared HTTP client
pub fn build_client(config: &Config) -> Result<Client> {
    Client::builder()
        .timeout(config.http_timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(Error::Network)
}

/// GET a feed document, optionally as a conditional request
///
/// When `last_modified` is given it is sent as `If-Modified-Since`; an HTTP
/// 304 response is passed through untouched for the caller to interpret.
/// Any other non-success status is an error. Transient failures are retried
/// with backoff.
pub async fn get_feed(
    client: &Client,
    retry: &RetryConfig,
    url: &str,
    last_modified: Option<&str>,
) -> Result<Response> {
    let client = client.clone();
    let url = url.to_string();
    let last_modified = last_modified.map(str::to_string);

    fetch_with_retry(retry, || {
        let client = client.clone();
        let url = url.clone();
        let last_modified = last_modified.clone();
        async move {
            let mut request = client.get(&url);
            if let Some(value) = &last_modified {
                request = request.header(IF_MODIFIED_SINCE, value);
            }
            let response = request.send().await?;
            if response.status() == StatusCode::NOT_MODIFIED {
                return Ok(response);
            }
            raise_for_status(response, &url)
        }
    })
    .await
}

/// GET a resource, failing on any non-success status
///
/// Used for enclosure downloads (the response is streamed by the caller) and
/// for resolver page fetches. Transient failures are retried with backoff;
/// the retry only covers the request/response-header phase, never a partially
/// consumed body.
pub async fn get_and_raise(client: &Client, retry: &RetryConfig, url: &str) -> Result<Response> {
    let client = client.clone();
    let url = url.to_string();

    fetch_with_retry(retry, || {
        let client = client.clone();
        let url = url.clone();
        async move {
            let response = client.get(&url).send().await?;
            raise_for_status(response, &url)
        }
    })
    .await
}

/// Extract the opaque `Last-Modified` cache token from a response
pub fn last_modified_header(response: &Response) -> Option<String> {
    response
        .headers()
        .get(LAST_MODIFIED)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

fn raise_for_status(response: Response, url: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(Error::HttpStatus {
            status: status.as_u16(),
            url: url.to_string(),
        })
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn no_retry() -> RetryConfig {
        RetryConfig {
            max_attempts: 0,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(10),
            backoff_multiplier: 2.0,
            jitter: false,
        }
    }

    fn fast_retry(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(10),
            backoff_multiplier: 2.0,
            jitter: false,
        }
    }

    #[tokio::test]
    async fn conditional_request_carries_if_modified_since() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/feed.xml"))
            .and(header("If-Modified-Since", "Wed, 01 Jan 2025 00:00:00 GMT"))
            .respond_with(ResponseTemplate::new(304))
            .expect(1)
            .mount(&server)
            .await;

        let client = build_client(&Config::default()).unwrap();
        let response = get_feed(
            &client,
            &no_retry(),
            &format!("{}/feed.xml", server.uri()),
            Some("Wed, 01 Jan 2025 00:00:00 GMT"),
        )
        .await
        .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
    }

    #[tokio::test]
    async fn server_errors_are_retried_until_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(1)
            .mount(&server)
            .await;

        let client = build_client(&Config::default()).unwrap();
        let response = get_and_raise(&client, &fast_retry(3), &format!("{}/flaky", server.uri()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn client_errors_fail_without_retry() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let client = build_client(&Config::default()).unwrap();
        let err = get_and_raise(&client, &fast_retry(3), &format!("{}/missing", server.uri()))
            .await
            .unwrap_err();

        match err {
            Error::HttpStatus { status, .. } => assert_eq!(status, 404),
            other => panic!("expected HttpStatus error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn user_agent_identifies_the_client() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ua"))
            .and(header("User-Agent", USER_AGENT))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = build_client(&Config::default()).unwrap();
        get_and_raise(&client, &no_retry(), &format!("{}/ua", server.uri()))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn last_modified_header_is_extracted() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/feed.xml"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Last-Modified", "Thu, 02 Jan 2025 12:00:00 GMT"),
            )
            .mount(&server)
            .await;

        let client = build_client(&Config::default()).unwrap();
        let response = get_feed(&client, &no_retry(), &format!("{}/feed.xml", server.uri()), None)
            .await
            .unwrap();

        assert_eq!(
            last_modified_header(&response).as_deref(),
            Some("Thu, 02 Jan 2025 12:00:00 GMT")
        );
    }
}
