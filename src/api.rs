// api.rs - Quote Search API Client
// GETs the image search endpoint with bounded retries, falls back to the
// public endpoint once when a custom endpoint keeps failing, and validates
// the JSON envelope.

use std::time::Duration;

use log::{debug, warn};
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;

/// Public search endpoint used when no custom `api_base` is configured
pub const DEFAULT_API_URL: &str = "https://api.zvv.quest/search";

/// Per-attempt HTTP timeout
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

const API_OK: i64 = 200;

/// JSON envelope returned by the search API
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ApiResponse {
    pub code: i64,
    #[serde(default)]
    data: Option<Vec<String>>,
    #[serde(default)]
    pub msg: Option<String>,
}

impl ApiResponse {
    /// Image URLs; a missing or null `data` field counts as no results
    pub fn images(&self) -> &[String] {
        self.data.as_deref().unwrap_or_default()
    }

    pub fn into_images(self) -> Vec<String> {
        self.data.unwrap_or_default()
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API returned code {code}: {}", .msg.as_deref().unwrap_or("no message"))]
    Api { code: i64, msg: Option<String> },
    #[error("Malformed API response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// What to search for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub title: String,
    pub count: u32,
}

#[derive(Debug, Clone)]
pub struct SearchClient {
    client: Client,
    timeout: Duration,
    retry_times: u32,
    retry_delay: Duration,
}

impl SearchClient {
    pub fn new(retry_times: u32, retry_delay: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            timeout: REQUEST_TIMEOUT,
            retry_times,
            retry_delay,
        })
    }

    /// Override the per-attempt timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Fetch results from `url`, retrying `retry_times` more times on HTTP failure.
    /// When `fallback` is set and every primary attempt failed, one more attempt
    /// is made against it without retries.
    pub async fn fetch(
        &self,
        url: &str,
        fallback: Option<&str>,
        query: &SearchQuery,
    ) -> Result<ApiResponse, FetchError> {
        let mut attempt: u32 = 0;
        let primary = loop {
            attempt += 1;
            match self.get_body(url, query).await {
                Ok(body) => break Ok(body),
                Err(e) if attempt <= self.retry_times => {
                    warn!(
                        "🔁 Search API attempt {}/{} against {} failed: {}",
                        attempt,
                        self.retry_times + 1,
                        url,
                        e
                    );
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(e) => break Err(e),
            }
        };

        let body = match (primary, fallback) {
            (Ok(body), _) => body,
            (Err(e), Some(fallback_url)) => {
                warn!(
                    "⚠️ Custom API {} failed after {} attempts ({}), trying default API {}",
                    url, attempt, e, fallback_url
                );
                self.get_body(fallback_url, query).await?
            }
            (Err(e), None) => return Err(e.into()),
        };

        parse_envelope(&body)
    }

    /// One GET attempt; any connect, timeout, status or body error fails the attempt
    async fn get_body(&self, url: &str, query: &SearchQuery) -> Result<String, reqwest::Error> {
        debug!("GET {} q={} n={}", url, query.title, query.count);
        let response = self
            .client
            .get(url)
            .query(&[("q", query.title.as_str())])
            .query(&[("n", query.count)])
            .timeout(self.timeout)
            .send()
            .await?
            .error_for_status()?;
        response.text().await
    }
}

/// Decode the envelope and reject non-200 application codes
pub fn parse_envelope(body: &str) -> Result<ApiResponse, FetchError> {
    let response: ApiResponse = serde_json::from_str(body)?;
    if response.code != API_OK {
        return Err(FetchError::Api {
            code: response.code,
            msg: response.msg,
        });
    }
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn query(title: &str, count: u32) -> SearchQuery {
        SearchQuery {
            title: title.to_string(),
            count,
        }
    }

    fn fast_client(retry_times: u32) -> SearchClient {
        SearchClient::new(retry_times, Duration::from_millis(10))
            .unwrap()
            .with_timeout(Duration::from_millis(300))
    }

    fn ok_body(urls: &[&str]) -> serde_json::Value {
        json!({ "code": 200, "data": urls, "msg": "ok" })
    }

    #[test]
    fn envelope_rejects_non_200_code() {
        let err = parse_envelope(r#"{"code": 500, "msg": "boom"}"#).unwrap_err();
        match err {
            FetchError::Api { code, msg } => {
                assert_eq!(code, 500);
                assert_eq!(msg.as_deref(), Some("boom"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn envelope_treats_missing_or_null_data_as_empty() {
        assert!(parse_envelope(r#"{"code": 200}"#).unwrap().images().is_empty());
        assert!(parse_envelope(r#"{"code": 200, "data": null}"#)
            .unwrap()
            .images()
            .is_empty());
    }

    #[test]
    fn envelope_without_code_is_malformed() {
        assert!(matches!(
            parse_envelope(r#"{"data": []}"#),
            Err(FetchError::Decode(_))
        ));
        assert!(matches!(parse_envelope("<html>"), Err(FetchError::Decode(_))));
    }

    #[tokio::test]
    async fn sends_title_and_count_as_query_params() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("q", "泡芙"))
            .and(query_param("n", "3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_body(&["a", "b", "c"])))
            .expect(1)
            .mount(&server)
            .await;

        let url = format!("{}/search", server.uri());
        let response = fast_client(3).fetch(&url, None, &query("泡芙", 3)).await.unwrap();
        assert_eq!(response.into_images(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn retries_then_succeeds_on_primary() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_body(&["x"])))
            .expect(1)
            .mount(&server)
            .await;

        let url = format!("{}/search", server.uri());
        let response = fast_client(3).fetch(&url, None, &query("泡芙", 1)).await.unwrap();
        assert_eq!(response.into_images(), vec!["x".to_string()]);
    }

    #[tokio::test]
    async fn custom_endpoint_failure_falls_back_exactly_once() {
        let primary = MockServer::start().await;
        let fallback = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(3)
            .mount(&primary)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_body(&["f"])))
            .expect(1)
            .mount(&fallback)
            .await;

        let fallback_url = format!("{}/search", fallback.uri());
        let response = fast_client(2)
            .fetch(
                &format!("{}/search", primary.uri()),
                Some(fallback_url.as_str()),
                &query("泡芙", 5),
            )
            .await
            .unwrap();
        assert_eq!(response.into_images(), vec!["f"]);
    }

    #[tokio::test]
    async fn failing_fallback_is_not_retried() {
        let primary = MockServer::start().await;
        let fallback = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502))
            .expect(2)
            .mount(&primary)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502))
            .expect(1)
            .mount(&fallback)
            .await;

        let fallback_url = format!("{}/search", fallback.uri());
        let err = fast_client(1)
            .fetch(&primary.uri(), Some(fallback_url.as_str()), &query("泡芙", 5))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Http(_)));
    }

    #[tokio::test]
    async fn timeouts_without_fallback_surface_after_all_attempts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(ok_body(&["late"]))
                    .set_delay(Duration::from_secs(2)),
            )
            .expect(4)
            .mount(&server)
            .await;

        let err = fast_client(3)
            .fetch(&server.uri(), None, &query("泡芙", 5))
            .await
            .unwrap_err();
        match err {
            FetchError::Http(e) => assert!(e.is_timeout()),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn api_error_code_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "code": 429, "msg": "slow down" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let err = fast_client(3)
            .fetch(&server.uri(), None, &query("泡芙", 5))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Api { code: 429, .. }));
    }
}
