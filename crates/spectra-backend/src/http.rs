// HTTP adapter for JSON lighting bridge daemons.
//
// Base URL: whatever the configuration supplies, e.g. `http://127.0.0.1:9123/api/v1/`
// Auth: optional bearer token (see `TransportConfig`)

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::Backend;
use crate::error::Error;
use crate::transport::TransportConfig;
use crate::types::{Frame, MatrixDimensions, RawDeviceDescriptor, StateChange};

// ── Error response shape from bridge daemons ─────────────────────────

#[derive(Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    message: Option<String>,
}

/// What kind of endpoint a response came from; decides status mapping.
#[derive(Clone, Copy)]
enum Endpoint<'a> {
    Service,
    Device(&'a str),
    Matrix(&'a str),
}

// ── Client ───────────────────────────────────────────────────────────

/// Adapter for a daemon exposing the bridge REST API.
pub struct HttpBackend {
    id: String,
    http: reqwest::Client,
    base_url: Url,
    timeout: Duration,
}

impl HttpBackend {
    /// Build from a base URL and transport settings.
    ///
    /// The URL must be absolute (`http://` or `https://`); a trailing
    /// slash is added when missing so relative endpoints join cleanly.
    pub fn new(
        id: impl Into<String>,
        base_url: &str,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let id = id.into();
        let http = transport.build_client(&id)?;
        let base_url = Self::normalize_base_url(&id, base_url)?;
        Ok(Self {
            id,
            http,
            base_url,
            timeout: transport.timeout,
        })
    }

    fn normalize_base_url(id: &str, raw: &str) -> Result<Url, Error> {
        let mut url = Url::parse(raw)
            .map_err(|e| Error::unavailable(id, format!("invalid URL {raw:?}: {e}")))?;
        if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
            return Err(Error::unavailable(id, format!("unsupported URL {raw:?}")));
        }
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(url)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builder ──────────────────────────────────────────────────

    /// Append percent-encoded path segments to the base URL.
    fn url(&self, segments: &[&str]) -> Result<Url, Error> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::unavailable(&self.id, "base URL cannot hold a path"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    // ── HTTP verbs ───────────────────────────────────────────────────

    async fn get<T: DeserializeOwned>(&self, url: Url, endpoint: Endpoint<'_>) -> Result<T, Error> {
        debug!(backend = %self.id, "GET {url}");
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| self.transport_error(&e))?;
        let resp = self.check_status(resp, endpoint, false).await?;
        self.decode(resp).await
    }

    async fn send_json<B: Serialize + Sync>(
        &self,
        method: reqwest::Method,
        url: Url,
        body: &B,
        endpoint: Endpoint<'_>,
    ) -> Result<(), Error> {
        debug!(backend = %self.id, "{method} {url}");
        let resp = self
            .http
            .request(method, url)
            .json(body)
            .send()
            .await
            .map_err(|e| self.transport_error(&e))?;
        self.check_status(resp, endpoint, true).await.map(drop)
    }

    // ── Response handling ────────────────────────────────────────────

    fn transport_error(&self, e: &reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::Timeout {
                backend: self.id.clone(),
                timeout_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
            }
        } else {
            Error::unavailable(&self.id, e.to_string())
        }
    }

    async fn check_status(
        &self,
        resp: reqwest::Response,
        endpoint: Endpoint<'_>,
        write: bool,
    ) -> Result<reqwest::Response, Error> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let body = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorResponse>(&body)
            .ok()
            .and_then(|r| r.message)
            .unwrap_or_else(|| format!("HTTP {status}"));

        Err(match (status, endpoint) {
            (StatusCode::NOT_FOUND | StatusCode::NOT_IMPLEMENTED, Endpoint::Matrix(uid)) => {
                Error::unsupported(&self.id, uid, "matrix")
            }
            (StatusCode::NOT_FOUND, Endpoint::Device(uid)) => Error::not_found(&self.id, uid),
            (StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE, _)
            | (_, Endpoint::Service) => Error::unavailable(&self.id, message),
            (_, Endpoint::Device(uid) | Endpoint::Matrix(uid)) if write => {
                Error::device(&self.id, uid, message)
            }
            _ => Error::invalid_response(&self.id, format!("HTTP {status}: {message}")),
        })
    }

    async fn decode<T: DeserializeOwned>(&self, resp: reqwest::Response) -> Result<T, Error> {
        let body = resp.text().await.map_err(|e| self.transport_error(&e))?;
        serde_json::from_str(&body)
            .map_err(|e| Error::invalid_response(&self.id, format!("{e} in body: {body}")))
    }
}

#[async_trait]
impl Backend for HttpBackend {
    fn id(&self) -> &str {
        &self.id
    }

    async fn probe(&self) -> Result<(), Error> {
        let url = self.url(&["health"])?;
        debug!(backend = %self.id, "GET {url}");
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| self.transport_error(&e))?;
        self.check_status(resp, Endpoint::Service, false)
            .await
            .map(drop)
    }

    async fn discover(&self) -> Result<Vec<RawDeviceDescriptor>, Error> {
        self.get(self.url(&["devices"])?, Endpoint::Service).await
    }

    async fn get_device(&self, uid: &str) -> Result<RawDeviceDescriptor, Error> {
        self.get(self.url(&["devices", uid])?, Endpoint::Device(uid))
            .await
    }

    async fn set_state(&self, uid: &str, change: &StateChange) -> Result<(), Error> {
        self.send_json(
            reqwest::Method::POST,
            self.url(&["devices", uid, "state"])?,
            change,
            Endpoint::Device(uid),
        )
        .await
    }

    async fn get_matrix(&self, uid: &str) -> Result<MatrixDimensions, Error> {
        self.get(self.url(&["devices", uid, "matrix"])?, Endpoint::Matrix(uid))
            .await
    }

    async fn draw_matrix(&self, uid: &str, frame: &Frame) -> Result<(), Error> {
        self.send_json(
            reqwest::Method::PUT,
            self.url(&["devices", uid, "matrix"])?,
            frame,
            Endpoint::Matrix(uid),
        )
        .await
    }
}
