//! Tavily Search API クライアント
//!
//! `POST {base_url}/search` に Bearer 認証でクエリを送り、
//! 結果の `content` を研究メモとして返します。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::traits::{SearchClient, SearchResult};
use crate::config::SearchSettings;
use crate::error::SearchError;

/// APIキーを参照するシークレット名
pub const API_KEY_NAME: &str = "TAVILY_API_KEY";

const DEFAULT_BASE_URL: &str = "https://api.tavily.com";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Tavily が受け付ける最大件数
const MAX_RESULTS_LIMIT: u32 = 20;

pub struct TavilyClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    timeout: Duration,
}

impl TavilyClient {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// 設定ファイルの `[search]` セクションから生成
    pub fn from_settings(settings: &SearchSettings, api_key: Option<String>) -> Self {
        Self::new(api_key)
            .with_base_url(settings.base_url.clone())
            .with_timeout(Duration::from_secs(settings.timeout_secs))
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/search", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl SearchClient for TavilyClient {
    async fn search(&self, query: &str, max_results: u32) -> Result<Vec<SearchResult>, SearchError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| SearchError::MissingCredentials(API_KEY_NAME.to_string()))?;

        let request = TavilyRequest {
            query,
            max_results: max_results.clamp(1, MAX_RESULTS_LIMIT),
            search_depth: "basic",
            topic: "general",
        };

        debug!(query, max_results = request.max_results, "Tavily 検索を実行");

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(api_key)
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SearchError::Timeout
                } else {
                    SearchError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                401 | 403 => SearchError::Unauthorized,
                429 => SearchError::RateLimited,
                code => SearchError::HttpError(code, body),
            });
        }

        let tavily: TavilyResponse = response
            .json()
            .await
            .map_err(|e| SearchError::InvalidResponse(e.to_string()))?;

        debug!(query, results = tavily.results.len(), "Tavily 検索が完了");
        Ok(tavily.results)
    }
}

#[derive(Debug, Serialize)]
struct TavilyRequest<'a> {
    query: &'a str,
    max_results: u32,
    search_depth: &'static str,
    topic: &'static str,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let client = TavilyClient::new(None).with_base_url("http://localhost:1234/");
        assert_eq!(client.endpoint(), "http://localhost:1234/search");
    }

    #[test]
    fn test_from_settings() {
        let settings = SearchSettings {
            timeout_secs: 5,
            ..SearchSettings::default()
        };
        let client = TavilyClient::from_settings(&settings, None);
        assert_eq!(client.endpoint(), "https://api.tavily.com/search");
        assert_eq!(client.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_response_parsing_tolerates_missing_fields() {
        let response: TavilyResponse = serde_json::from_str(
            r#"{"query": "q", "results": [{"content": "only content"}], "response_time": 0.5}"#,
        )
        .unwrap();
        assert_eq!(response.results.len(), 1);
        assert_eq!(response.results[0].content, "only content");
        assert_eq!(response.results[0].title, "");
    }

    #[tokio::test]
    async fn test_missing_api_key() {
        let client = TavilyClient::new(None).with_base_url("http://127.0.0.1:9");
        match client.search("rust", 3).await {
            Err(SearchError::MissingCredentials(name)) => assert_eq!(name, API_KEY_NAME),
            other => panic!("Expected MissingCredentials, got {other:?}"),
        }
    }
}

/// モックサーバーを使った HTTP テスト
#[cfg(test)]
mod http_tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> TavilyClient {
        TavilyClient::new(Some("tvly-test".to_string())).with_base_url(server.uri())
    }

    #[tokio::test]
    async fn test_search_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .and(header("authorization", "Bearer tvly-test"))
            .and(body_json(serde_json::json!({
                "query": "rust ownership",
                "max_results": 3,
                "search_depth": "basic",
                "topic": "general"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "query": "rust ownership",
                "results": [
                    {"title": "Ownership", "url": "https://doc.rust-lang.org", "content": "Each value has an owner.", "score": 0.9},
                    {"title": "Borrowing", "url": "https://example.com", "content": "References borrow.", "score": 0.7}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let results = client_for(&server).search("rust ownership", 3).await.unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].content, "Each value has an owner.");
        assert_eq!(results[1].title, "Borrowing");
    }

    #[tokio::test]
    async fn test_search_empty_results() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"results": []})))
            .mount(&server)
            .await;

        let results = client_for(&server).search("nothing", 3).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_max_results_is_clamped() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(wiremock::matchers::body_partial_json(serde_json::json!({"max_results": 20})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"results": []})))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server).search("q", 100).await.unwrap();
    }

    #[tokio::test]
    async fn test_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let result = client_for(&server).search("q", 3).await;
        assert!(matches!(result, Err(SearchError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .expect(1)
            .mount(&server)
            .await;

        let result = client_for(&server).search("q", 3).await;
        assert!(matches!(result, Err(SearchError::RateLimited)));
    }

    #[tokio::test]
    async fn test_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let result = client_for(&server).search("q", 3).await;
        assert!(matches!(result, Err(SearchError::HttpError(502, body)) if body == "bad gateway"));
    }

    #[tokio::test]
    async fn test_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"results": []}))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let client = client_for(&server).with_timeout(Duration::from_millis(100));
        let result = client.search("q", 3).await;
        assert!(matches!(result, Err(SearchError::Timeout)));
    }
}
