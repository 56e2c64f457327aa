//! HTTP client for the analytics backend.
//!
//! One method per endpoint behind the `AnalyticsApi` trait so the
//! orchestrator can be tested against a mock. Every call carries its own
//! timeout budget; when it elapses the in-flight request future is dropped
//! (which cancels the underlying request) and `ApiError::Timeout` is
//! returned instead.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::debug;

use lens_core::{
    ActivityReport, ActivityWindow, ApiError, CommunityReport, DEFAULT_TIMEOUT_MS, LanguageReport,
    Locale, NARRATIVE_TIMEOUT_MS, Narrative, ProfileReport, SearchFilters,
};

/// The five GET endpoints of the analytics backend.
#[async_trait]
pub trait AnalyticsApi: Send + Sync {
    async fn profile(
        &self,
        subject: &str,
        filters: &SearchFilters,
    ) -> Result<ProfileReport, ApiError>;

    async fn languages(
        &self,
        subject: &str,
        filters: &SearchFilters,
    ) -> Result<LanguageReport, ApiError>;

    async fn community(
        &self,
        subject: &str,
        filters: &SearchFilters,
    ) -> Result<CommunityReport, ApiError>;

    async fn activity(
        &self,
        subject: &str,
        window: ActivityWindow,
    ) -> Result<ActivityReport, ApiError>;

    async fn narrative(&self, subject: &str, locale: Locale) -> Result<Narrative, ApiError>;
}

/// reqwest-backed implementation. Stateless across calls; any number of
/// requests may be in flight concurrently.
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
}

impl ApiClient {
    /// The base URL is explicit configuration, never a process-wide global.
    /// A trailing slash is normalized away.
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        timeout_ms: u64,
    ) -> Result<T, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {url} (budget {timeout_ms}ms)");

        let request = async {
            let response = self
                .http
                .get(&url)
                .query(query)
                .send()
                .await
                .map_err(map_transport_error)?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(ApiError::from_status(status.as_u16(), &body));
            }

            response
                .json::<T>()
                .await
                .map_err(|e| ApiError::Other(format!("invalid response body: {e}")))
        };

        match tokio::time::timeout(Duration::from_millis(timeout_ms), request).await {
            Ok(result) => result,
            Err(_) => Err(ApiError::Timeout),
        }
    }
}

fn map_transport_error(e: reqwest::Error) -> ApiError {
    if e.is_timeout() {
        ApiError::Timeout
    } else if e.is_connect() {
        ApiError::Other(format!("connection failed: {e}"))
    } else {
        ApiError::Other(e.to_string())
    }
}

#[async_trait]
impl AnalyticsApi for ApiClient {
    async fn profile(
        &self,
        subject: &str,
        filters: &SearchFilters,
    ) -> Result<ProfileReport, ApiError> {
        let query = [
            ("username", subject.to_string()),
            ("repos_limit", filters.profile_limit().to_string()),
        ];
        self.get_json("/analyze", &query, DEFAULT_TIMEOUT_MS).await
    }

    async fn languages(
        &self,
        subject: &str,
        filters: &SearchFilters,
    ) -> Result<LanguageReport, ApiError> {
        let mut query = vec![("username", subject.to_string())];
        query.extend(filters.query_pairs(filters.profile_limit()));
        self.get_json("/languages", &query, DEFAULT_TIMEOUT_MS).await
    }

    async fn community(
        &self,
        subject: &str,
        filters: &SearchFilters,
    ) -> Result<CommunityReport, ApiError> {
        let mut query = vec![("username", subject.to_string())];
        query.extend(filters.query_pairs(filters.community_limit()));
        self.get_json("/community", &query, DEFAULT_TIMEOUT_MS).await
    }

    async fn activity(
        &self,
        subject: &str,
        window: ActivityWindow,
    ) -> Result<ActivityReport, ApiError> {
        let query = [
            ("username", subject.to_string()),
            ("days", window.days().to_string()),
        ];
        self.get_json("/activity", &query, DEFAULT_TIMEOUT_MS).await
    }

    async fn narrative(&self, subject: &str, locale: Locale) -> Result<Narrative, ApiError> {
        let query = [
            ("username", subject.to_string()),
            ("lang", locale.as_str().to_string()),
        ];
        self.get_json("/ai-analysis", &query, NARRATIVE_TIMEOUT_MS)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Minimal one-response-per-connection HTTP stub.
    async fn spawn_stub(status: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let mut buf = [0u8; 4096];
                    let _ = socket.read(&mut buf).await;
                    let response = format!(
                        "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                        body.len()
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });
        format!("http://{addr}")
    }

    #[test]
    fn test_trailing_slash_normalized() {
        let client = ApiClient::new("http://localhost:8000/");
        assert_eq!(client.base_url(), "http://localhost:8000");
        let client = ApiClient::new("http://localhost:8000");
        assert_eq!(client.base_url(), "http://localhost:8000");
    }

    #[tokio::test]
    async fn test_profile_success() {
        let base = spawn_stub("200 OK", r#"{"user":{"login":"octocat"},"repos":[]}"#).await;
        let client = ApiClient::new(&base);

        let report = client
            .profile("octocat", &SearchFilters::default())
            .await
            .unwrap();
        assert_eq!(report.user.login, "octocat");
    }

    #[tokio::test]
    async fn test_404_maps_to_not_found() {
        let base = spawn_stub("404 Not Found", r#"{"detail":"User not found"}"#).await;
        let client = ApiClient::new(&base);

        let err = client
            .profile("ghost", &SearchFilters::default())
            .await
            .unwrap_err();
        assert_eq!(err, ApiError::NotFound);
    }

    #[tokio::test]
    async fn test_403_maps_to_rate_limited() {
        let base = spawn_stub("403 Forbidden", "{}").await;
        let client = ApiClient::new(&base);

        let err = client
            .community("octocat", &SearchFilters::default())
            .await
            .unwrap_err();
        assert_eq!(err, ApiError::RateLimited);
    }

    #[tokio::test]
    async fn test_422_carries_first_message() {
        let base = spawn_stub(
            "422 Unprocessable Entity",
            r#"{"detail":[{"loc":["query","days"],"msg":"unexpected value; permitted: 30, 60, 90","type":"value_error"}]}"#,
        )
        .await;
        let client = ApiClient::new(&base);

        let err = client
            .activity("octocat", ActivityWindow::D90)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ApiError::Validation("unexpected value; permitted: 30, 60, 90".to_string())
        );
    }

    #[tokio::test]
    async fn test_500_maps_to_server_error() {
        let base = spawn_stub("500 Internal Server Error", r#"{"detail":"boom"}"#).await;
        let client = ApiClient::new(&base);

        let err = client
            .languages("octocat", &SearchFilters::default())
            .await
            .unwrap_err();
        assert_eq!(err, ApiError::Server("boom".to_string()));
    }

    #[tokio::test]
    async fn test_invalid_json_body_is_other() {
        let base = spawn_stub("200 OK", "not json at all").await;
        let client = ApiClient::new(&base);

        let err = client
            .narrative("octocat", Locale::En)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Other(_)));
    }

    #[tokio::test]
    async fn test_timeout_budget_enforced() {
        // A listener that accepts but never responds.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_secs(120)).await;
                    drop(socket);
                });
            }
        });

        let client = ApiClient::new(&format!("http://{addr}"));
        let result: Result<serde_json::Value, ApiError> =
            client.get_json("/slow", &[], 100).await;
        assert_eq!(result.unwrap_err(), ApiError::Timeout);
    }
}
