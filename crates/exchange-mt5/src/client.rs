//! Bridge client: HTTP transport, rate limiting, and session lifecycle.

use crate::error::{Mt5Error, Result};
use crate::types::{Envelope, InitializeParams, LastError, LoginParams};
use fx_algo_core::{BridgeConfig, Credentials};
use governor::{Quota, RateLimiter};
use nonzero_ext::nonzero;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::num::NonZeroU32;
use std::sync::Arc;
use tracing::{debug, info};

/// Default bridge address: a local expert advisor listening next to the terminal.
pub const DEFAULT_BRIDGE_URL: &str = "http://127.0.0.1:18812";

/// Configuration for the bridge client.
#[derive(Debug, Clone)]
pub struct Mt5ClientConfig {
    pub base_url: String,
    pub requests_per_second: NonZeroU32,
    pub timeout_secs: u64,
}

impl Default for Mt5ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BRIDGE_URL.to_string(),
            requests_per_second: nonzero!(20u32),
            timeout_secs: 30,
        }
    }
}

impl From<&BridgeConfig> for Mt5ClientConfig {
    fn from(config: &BridgeConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            requests_per_second: NonZeroU32::new(config.requests_per_second)
                .unwrap_or(nonzero!(20u32)),
            timeout_secs: config.timeout_secs,
        }
    }
}

impl Mt5ClientConfig {
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    #[must_use]
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

type DirectLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Terminal client. All calls go through one rate-limited HTTP client.
pub struct Mt5Client {
    config: Mt5ClientConfig,
    http: Client,
    rate_limiter: Arc<DirectLimiter>,
}

impl std::fmt::Debug for Mt5Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mt5Client")
            .field("base_url", &self.config.base_url)
            .field("requests_per_second", &self.config.requests_per_second)
            .finish_non_exhaustive()
    }
}

impl Mt5Client {
    /// Creates a new client with the given configuration.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built.
    pub fn new(config: Mt5ClientConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Mt5Error::Network(format!("failed to build HTTP client: {e}")))?;

        let quota = Quota::per_second(config.requests_per_second);
        let rate_limiter = Arc::new(RateLimiter::direct(quota));

        Ok(Self {
            config,
            http,
            rate_limiter,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Calls a bridge function and unwraps the reply envelope.
    ///
    /// `ok == false` or a null result becomes [`Mt5Error::Terminal`] tagged with
    /// `operation`, carrying the terminal's last error.
    pub(crate) async fn call<T, B>(&self, function: &str, operation: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.rate_limiter.until_ready().await;

        let url = format!("{}/{}", self.config.base_url.trim_end_matches('/'), function);
        debug!(url = %url, "POST");

        let response = self
            .http
            .post(&url)
            .header("Accept", "application/json")
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Mt5Error::bridge(status.as_u16(), text));
        }

        let envelope: Envelope<T> = response.json().await?;
        match (envelope.ok, envelope.result) {
            (true, Some(result)) => Ok(result),
            _ => {
                let last = envelope.error.unwrap_or_else(LastError::unknown);
                Err(Mt5Error::terminal(operation, last.code, last.message))
            }
        }
    }

    /// Calls a bridge function whose terminal counterpart returns a success flag.
    pub(crate) async fn call_flag<B>(&self, function: &str, operation: &str, body: &B) -> Result<()>
    where
        B: Serialize + ?Sized,
    {
        if self.call::<bool, B>(function, operation, body).await? {
            Ok(())
        } else {
            let last = self.last_error().await.unwrap_or_else(|_| LastError::unknown());
            Err(Mt5Error::terminal(operation, last.code, last.message))
        }
    }

    /// The terminal's last error.
    ///
    /// # Errors
    /// Returns error if the bridge cannot be reached.
    pub async fn last_error(&self) -> Result<LastError> {
        self.call("last_error", "last_error", &serde_json::json!({})).await
    }

    /// Starts the terminal connection and logs in to the trading account.
    ///
    /// `initialize` receives the terminal path when one is configured.
    ///
    /// # Errors
    /// Returns `MT5 initialize failed: ...` or `MT5 login failed: ...` with the
    /// terminal's last error.
    pub async fn init(&self, credentials: &Credentials) -> Result<()> {
        info!(
            login = credentials.login,
            server = %credentials.server,
            path = ?credentials.path,
            "Initializing MT5 terminal"
        );

        let init = InitializeParams {
            path: credentials.path.as_deref(),
            login: credentials.login,
            password: credentials.password(),
            server: &credentials.server,
        };
        self.call_flag("initialize", "MT5 initialize", &init).await?;

        let login = LoginParams {
            login: credentials.login,
            password: credentials.password(),
            server: &credentials.server,
        };
        self.call_flag("login", "MT5 login", &login).await?;

        info!(login = credentials.login, "Logged in to MT5");
        Ok(())
    }

    /// Closes the terminal connection.
    ///
    /// # Errors
    /// Returns error if the bridge cannot be reached.
    pub async fn shutdown(&self) -> Result<()> {
        let _: serde_json::Value = self
            .call("shutdown", "MT5 shutdown", &serde_json::json!({}))
            .await?;
        info!("MT5 connection shut down");
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub(crate) fn client_for(server: &MockServer) -> Mt5Client {
        Mt5Client::new(Mt5ClientConfig::default().with_base_url(server.uri())).unwrap()
    }

    pub(crate) fn ok(result: serde_json::Value) -> ResponseTemplate {
        ResponseTemplate::new(200)
            .set_body_json(json!({"ok": true, "result": result, "error": null}))
    }

    pub(crate) fn failed(code: i64, message: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "ok": false,
            "result": null,
            "error": {"code": code, "message": message}
        }))
    }

    #[test]
    fn test_config_from_bridge_section() {
        let bridge = BridgeConfig {
            base_url: "http://10.0.0.5:9000".to_string(),
            timeout_secs: 5,
            requests_per_second: 0,
        };
        let config = Mt5ClientConfig::from(&bridge);
        assert_eq!(config.base_url, "http://10.0.0.5:9000");
        assert_eq!(config.timeout_secs, 5);
        // zero falls back to the default quota
        assert_eq!(config.requests_per_second.get(), 20);
    }

    #[tokio::test]
    async fn test_init_sends_path_and_logs_in() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/initialize"))
            .and(body_partial_json(json!({
                "path": "C:\\MT5\\terminal64.exe",
                "login": 5012345,
                "server": "MetaQuotes-Demo"
            })))
            .respond_with(ok(json!(true)))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/login"))
            .and(body_partial_json(json!({"login": 5012345, "password": "pw"})))
            .respond_with(ok(json!(true)))
            .expect(1)
            .mount(&server)
            .await;

        let creds = Credentials::new(5_012_345, "pw", "MetaQuotes-Demo")
            .with_path("C:\\MT5\\terminal64.exe");
        client_for(&server).init(&creds).await.unwrap();
    }

    #[tokio::test]
    async fn test_initialize_failure_stops_before_login() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/initialize"))
            .respond_with(failed(-10005, "IPC timeout"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/login"))
            .respond_with(ok(json!(true)))
            .expect(0)
            .mount(&server)
            .await;

        let err = client_for(&server)
            .init(&Credentials::new(1, "p", "s"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "MT5 initialize failed: (-10005, \"IPC timeout\")");
    }

    #[tokio::test]
    async fn test_login_refused_reports_last_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/initialize"))
            .respond_with(ok(json!(true)))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/login"))
            .respond_with(ok(json!(false)))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/last_error"))
            .respond_with(ok(json!({"code": -6, "message": "Authorization failed"})))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .init(&Credentials::new(1, "p", "s"))
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("MT5 login failed"));
        assert_eq!(err.code(), Some(-6));
    }

    #[tokio::test]
    async fn test_http_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/shutdown"))
            .respond_with(ResponseTemplate::new(503).set_body_string("terminal not running"))
            .mount(&server)
            .await;

        let err = client_for(&server).shutdown().await.unwrap_err();
        assert!(matches!(err, Mt5Error::Bridge { status_code: 503, .. }));
    }

    #[tokio::test]
    async fn test_shutdown() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/shutdown"))
            .respond_with(ok(json!(true)))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server).shutdown().await.unwrap();
    }
}
