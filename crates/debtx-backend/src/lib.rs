//! debtx-backend: Client for the order / price / position REST service
//!
//! Every call carries the configured timeout and is never retried; callers
//! surface the error to the user instead. Responses are unwrapped from the
//! backend's `{success, data, error, timestamp}` envelope.

pub mod types;

use std::time::Duration;

use alloy::primitives::Address;
use debtx_core::{BackendConfig, BackendError};
use serde::de::DeserializeOwned;
use serde::Serialize;

pub use types::*;

/// Result type for backend operations
pub type Result<T> = std::result::Result<T, BackendError>;

/// HTTP client for the backend service
#[derive(Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl BackendClient {
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent("debtx")
            .build()
            .map_err(|e| BackendError::Unavailable {
                url: config.url.clone(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            http,
            base_url: config.url.trim_end_matches('/').to_string(),
            timeout: config.request_timeout(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `<base>/api/<segments>`, each segment percent-encoded
    fn url(&self, segments: &[&str]) -> Result<String> {
        let invalid = |reason: String| BackendError::Unavailable {
            url: self.base_url.clone(),
            reason,
        };
        let mut url = reqwest::Url::parse(&self.base_url).map_err(|e| invalid(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| invalid("URL cannot carry a path".to_string()))?
            .pop_if_empty()
            .push("api")
            .extend(segments);
        Ok(url.to_string())
    }

    /// Liveness probe
    pub async fn is_online(&self) -> bool {
        self.get::<serde_json::Value>(&["health"], &[]).await.is_ok()
    }

    /// Token prices in USD, optionally filtered by symbol
    pub async fn prices(
        &self,
        symbol: Option<&str>,
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> Result<Vec<TokenPrice>> {
        let query = list_query(symbol, limit, offset);
        let list: TokenList<TokenPrice> = self.get(&["prices"], &query).await?;
        Ok(list.tokens)
    }

    /// Liquidation thresholds and bonuses as decimal fractions
    pub async fn liquidation_thresholds(
        &self,
        symbol: Option<&str>,
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> Result<Vec<TokenThreshold>> {
        let query = list_query(symbol, limit, offset);
        let list: TokenList<TokenThreshold> = self.get(&["liquidation-thresholds"], &query).await?;
        Ok(list.tokens)
    }

    pub async fn list_orders(&self, query: &OrderQuery) -> Result<OrderPage> {
        self.get(&["orders"], &query.to_pairs()).await
    }

    pub async fn get_order(&self, id: &str) -> Result<OrderRecord> {
        self.get(&["orders", id], &[]).await
    }

    pub async fn create_order(&self, request: &CreateOrderRequest) -> Result<OrderRecord> {
        let record: OrderRecord = self.post(&["orders"], request).await?;
        tracing::info!(order_id = %record.id, order_type = %record.order_type, "Order submitted");
        Ok(record)
    }

    pub async fn cancel_order(&self, id: &str, request: &CancelOrderRequest) -> Result<OrderRecord> {
        let record: OrderRecord = self.post(&["orders", id, "cancel"], request).await?;
        tracing::info!(order_id = %id, status = %record.status, "Order cancelled");
        Ok(record)
    }

    pub async fn position(&self, debt_address: Address) -> Result<PositionSnapshot> {
        self.get(&["positions", &debt_address.to_string()], &[]).await
    }

    async fn get<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, String)],
    ) -> Result<T> {
        let path = segments.join("/");
        let url = self.url(segments)?;
        tracing::debug!(url = %url, "GET");
        let request = self.http.get(&url).query(query);
        self.execute(&path, &url, request).await
    }

    async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> Result<T> {
        let path = segments.join("/");
        let url = self.url(segments)?;
        tracing::debug!(url = %url, "POST");
        let request = self.http.post(&url).json(body);
        self.execute(&path, &url, request).await
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        path: &str,
        url: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<T> {
        let response = timed_request(path, self.timeout, async {
            let response = request.send().await.map_err(|e| unavailable(url, &e))?;
            let status = response.status();
            let body = response.text().await.map_err(|e| unavailable(url, &e))?;
            Ok::<_, BackendError>((status, body))
        })
        .await;

        let (status, body) = match response {
            Ok(ok) => ok,
            Err(e) => {
                tracing::warn!(path, error = %e, "Backend request failed");
                return Err(e);
            }
        };

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(BackendError::NotFound {
                what: path.to_string(),
            });
        }
        parse_envelope(path, status.as_u16(), &body)
    }
}

/// Wrap a backend future with a deadline
async fn timed_request<T>(
    path: &str,
    timeout: Duration,
    fut: impl std::future::Future<Output = Result<T>>,
) -> Result<T> {
    tokio::time::timeout(timeout, fut)
        .await
        .map_err(|_| BackendError::Timeout {
            path: path.to_string(),
            secs: timeout.as_secs(),
        })?
}

fn unavailable(url: &str, err: &reqwest::Error) -> BackendError {
    BackendError::Unavailable {
        url: url.to_string(),
        reason: err.to_string(),
    }
}

fn list_query(
    symbol: Option<&str>,
    limit: Option<u32>,
    offset: Option<u32>,
) -> Vec<(&'static str, String)> {
    let mut query = Vec::new();
    if let Some(symbol) = symbol {
        query.push(("symbol", symbol.to_string()));
    }
    if let Some(limit) = limit {
        query.push(("limit", limit.to_string()));
    }
    if let Some(offset) = offset {
        query.push(("offset", offset.to_string()));
    }
    query
}

/// Unwrap an envelope body. `success: false` and non-2xx statuses become
/// `ApiError` carrying the backend's message.
fn parse_envelope<T: DeserializeOwned>(path: &str, status: u16, body: &str) -> Result<T> {
    let envelope: ApiEnvelope<T> = match serde_json::from_str(body) {
        Ok(env) => env,
        Err(e) if (200..300).contains(&status) => {
            return Err(BackendError::ParseError(format!("{}: {}", path, e)));
        }
        Err(_) => {
            return Err(BackendError::ApiError {
                message: format!("{} returned HTTP {}", path, status),
            });
        }
    };

    if !envelope.success || !(200..300).contains(&status) {
        return Err(BackendError::ApiError {
            message: envelope
                .error
                .unwrap_or_else(|| format!("{} returned HTTP {}", path, status)),
        });
    }

    envelope
        .data
        .ok_or_else(|| BackendError::ParseError(format!("{}: response has no data", path)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(url: &str) -> BackendClient {
        BackendClient::new(&BackendConfig {
            url: url.to_string(),
            request_timeout_secs: 10,
        })
        .unwrap()
    }

    #[test]
    fn test_url_building() {
        let c = client("http://localhost:3001/");
        assert_eq!(c.base_url(), "http://localhost:3001");
        assert_eq!(c.url(&["prices"]).unwrap(), "http://localhost:3001/api/prices");
        assert_eq!(
            c.url(&["orders", "7", "cancel"]).unwrap(),
            "http://localhost:3001/api/orders/7/cancel"
        );
    }

    #[test]
    fn test_url_encodes_order_id() {
        let c = client("http://localhost:3001");
        assert_eq!(
            c.url(&["orders", "../prices?limit=1", "cancel"]).unwrap(),
            "http://localhost:3001/api/orders/..%2Fprices%3Flimit=1/cancel"
        );
    }

    #[test]
    fn test_envelope_without_data_parses() {
        let envelope: ApiEnvelope<OrderRecord> =
            serde_json::from_str(r#"{"success":false,"error":"boom"}"#).unwrap();
        assert!(envelope.data.is_none());
        assert_eq!(envelope.error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_list_query_omits_unset() {
        assert_eq!(
            list_query(Some("WETH"), None, Some(20)),
            vec![("symbol", "WETH".to_string()), ("offset", "20".to_string())]
        );
        assert!(list_query(None, None, None).is_empty());
    }

    #[test]
    fn test_parse_envelope_success() {
        let body = r#"{"success":true,"data":{"tokens":[]},"timestamp":"t"}"#;
        let list: TokenList<TokenPrice> = parse_envelope("prices", 200, body).unwrap();
        assert!(list.tokens.is_empty());
    }

    #[test]
    fn test_parse_envelope_failure_carries_message() {
        let body = r#"{"success":false,"error":"Invalid signature","timestamp":"t"}"#;
        let err = parse_envelope::<OrderRecord>("orders/1/cancel", 400, body).unwrap_err();
        match err {
            BackendError::ApiError { message } => assert_eq!(message, "Invalid signature"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_parse_envelope_missing_data() {
        let body = r#"{"success":true,"timestamp":"t"}"#;
        assert!(matches!(
            parse_envelope::<OrderRecord>("orders/1", 200, body),
            Err(BackendError::ParseError(_))
        ));
    }

    #[test]
    fn test_parse_envelope_non_json_error_page() {
        let err = parse_envelope::<OrderRecord>("orders", 502, "<html>Bad Gateway</html>").unwrap_err();
        assert!(err.to_string().contains("HTTP 502"));
    }

    #[tokio::test]
    async fn test_unreachable_backend_names_url() {
        // Port 9 (discard) is closed on test machines
        let c = client("http://127.0.0.1:9");
        let err = c.prices(None, None, None).await.unwrap_err();
        match err {
            BackendError::Unavailable { url, .. } => {
                assert_eq!(url, "http://127.0.0.1:9/api/prices")
            }
            BackendError::Timeout { .. } => {}
            other => panic!("unexpected {other:?}"),
        }
        assert!(!c.is_online().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timed_request_times_out() {
        let err = timed_request::<()>("prices", Duration::from_secs(10), std::future::pending())
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Timeout { secs: 10, .. }));
    }
}
