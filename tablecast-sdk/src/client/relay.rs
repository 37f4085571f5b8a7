//! HTTP client for the ingest and query endpoints.

use reqwest::Client;
use url::Url;

use super::{ClientError, LiveSubscription};
use crate::objects::{ChangeNotification, FullResults, IngestAck, Operation, Row};

/// Typed HTTP client for a running relay.
///
/// The automation side uses [`push_results`](Self::push_results) and
/// [`notify_change`](Self::notify_change); viewers use
/// [`subscribe`](Self::subscribe) together with [`get_data`](Self::get_data).
#[derive(Debug, Clone)]
pub struct RelayClient {
    http: Client,
    base_url: Url,
}

impl RelayClient {
    /// Create a new `RelayClient` for the relay rooted at `base_url`
    /// (e.g. `http://localhost:5000`).
    pub fn new(base_url: Url) -> Self {
        Self {
            http: Client::new(),
            base_url,
        }
    }

    /// Replace the default `reqwest::Client` with a custom one (e.g. to
    /// configure timeouts or a proxy).
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    /// `GET /` – plain-text liveness string.
    pub async fn liveness(&self) -> Result<String, ClientError> {
        let url = self.base_url.join("/")?;
        let resp = self.http.get(url).send().await?;
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(ClientError::Api { status, body });
        }
        Ok(body)
    }

    /// `POST /receive-data` with `{"datos": rows}` – replace the snapshot.
    pub async fn push_results(&self, rows: Vec<Row>) -> Result<IngestAck, ClientError> {
        self.post_ingest(&FullResults { rows }).await
    }

    /// `POST /receive-data` with a change notification. The relay only
    /// acknowledges it; the snapshot is not touched.
    pub async fn notify_change(
        &self,
        table: &str,
        operation: Operation,
    ) -> Result<IngestAck, ClientError> {
        self.post_ingest(&ChangeNotification::new(table, operation.as_str()))
            .await
    }

    /// `GET /get-data` – the current snapshot, possibly empty.
    pub async fn get_data(&self) -> Result<Vec<Row>, ClientError> {
        let url = self.base_url.join("/get-data")?;
        let resp = self.http.get(url).send().await?;
        parse_response(resp).await
    }

    /// URL of the live-update channel (`ws://…/ws` or `wss://…/ws`).
    pub fn live_url(&self) -> Result<Url, ClientError> {
        let mut url = self.base_url.join("/ws")?;
        let scheme = match url.scheme() {
            "http" => "ws",
            "https" => "wss",
            "ws" | "wss" => return Ok(url),
            other => return Err(ClientError::UnsupportedScheme(other.to_string())),
        };
        url.set_scheme(scheme)
            .map_err(|_| ClientError::UnsupportedScheme(scheme.to_string()))?;
        Ok(url)
    }

    /// Open the live-update channel.
    pub async fn subscribe(&self) -> Result<LiveSubscription, ClientError> {
        LiveSubscription::connect(&self.live_url()?).await
    }

    async fn post_ingest<T: serde::Serialize>(&self, body: &T) -> Result<IngestAck, ClientError> {
        let url = self.base_url.join("/receive-data")?;
        let resp = self.http.post(url).json(body).send().await?;
        parse_response(resp).await
    }
}

async fn parse_response<T: serde::de::DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<T, ClientError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(ClientError::Api { status, body });
    }
    let bytes = resp.bytes().await?;
    serde_json::from_slice(&bytes).map_err(ClientError::Json)
}
