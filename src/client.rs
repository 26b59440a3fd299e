//! HTTP client for the Motor Town dedicated server admin API.
//!
//! [`AdminClient`] wraps `reqwest::Client` and provides one method per
//! administrative intent. Every method takes the target [`InstanceRecord`],
//! so the client itself carries no per-server state.
//!
//! ## Authentication
//!
//! The instance secret is sent as a `password` query parameter on every call.
//! Intent-specific parameters are query parameters too, including on POST
//! requests, which never carry a body.
//!
//! ## Error handling
//!
//! Responses are classified in order:
//!
//! 1. transport failure or timeout → [`ClientError::Network`]
//! 2. body is not a valid envelope → [`ClientError::Protocol`]
//! 3. HTTP status other than 200 → [`ClientError::Remote`]
//! 4. `succeeded: false` → [`ClientError::Remote`]
//!
//! A `Remote` error keeps the decoded [`Envelope`] so callers can still
//! inspect it.

use std::time::Duration;

use reqwest::{Method, StatusCode, Url};
use thiserror::Error;
use tracing::debug;

use crate::config::InstanceRecord;
use crate::envelope::Envelope;
use crate::validate::ValidationError;

/// Upper bound on every admin API call, connect included.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors returned by [`AdminClient`] methods.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Rejected locally before any network I/O.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Connection refused, DNS failure, timeout, or the body could not be read.
    #[error("failed to send request: {0}")]
    Network(#[source] reqwest::Error),
    /// The response body was not a decodable envelope.
    #[error("failed to decode response: {0}")]
    Protocol(String),
    /// The server answered with a non-200 status or `succeeded: false`.
    #[error("{}", describe_remote(.status, .envelope))]
    Remote { status: u16, envelope: Envelope },
}

impl ClientError {
    /// The decoded envelope, if the server produced one.
    pub fn envelope(&self) -> Option<&Envelope> {
        match self {
            ClientError::Remote { envelope, .. } => Some(envelope),
            _ => None,
        }
    }

    /// The server-reported message, if any.
    pub fn message(&self) -> Option<&str> {
        self.envelope().map(|e| e.message.as_str())
    }

    /// Returns `true` if the call hit the client-side timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ClientError::Network(e) if e.is_timeout())
    }
}

fn describe_remote(status: &u16, envelope: &Envelope) -> String {
    if *status == StatusCode::OK.as_u16() {
        format!("API call failed: {}", envelope.message)
    } else {
        format!("HTTP {}: {}", status, envelope.message)
    }
}

/// A fully described admin API call, built and validated without touching
/// the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminRequest {
    pub method: Method,
    pub path: &'static str,
    pub params: Vec<(&'static str, String)>,
}

impl AdminRequest {
    fn get(path: &'static str) -> Self {
        Self {
            method: Method::GET,
            path,
            params: Vec::new(),
        }
    }

    fn post(path: &'static str, params: Vec<(&'static str, String)>) -> Self {
        Self {
            method: Method::POST,
            path,
            params,
        }
    }

    /// `POST /chat`: broadcast a chat message.
    pub fn chat(message: &str) -> Result<Self, ValidationError> {
        if message.is_empty() {
            return Err(ValidationError::new("message cannot be empty"));
        }
        Ok(Self::post("/chat", vec![("message", message.to_string())]))
    }

    /// `GET /player/count`
    pub fn player_count() -> Self {
        Self::get("/player/count")
    }

    /// `GET /player/list`
    pub fn player_list() -> Self {
        Self::get("/player/list")
    }

    /// `GET /player/banlist`
    pub fn ban_list() -> Self {
        Self::get("/player/banlist")
    }

    /// `GET /version`
    pub fn version() -> Self {
        Self::get("/version")
    }

    /// `GET /housing/list`
    pub fn housing_list() -> Self {
        Self::get("/housing/list")
    }

    /// `POST /player/kick`
    pub fn kick(unique_id: &str) -> Result<Self, ValidationError> {
        Ok(Self::post(
            "/player/kick",
            vec![("unique_id", require_unique_id(unique_id)?)],
        ))
    }

    /// `POST /player/ban`: `hours <= 0` means no expiry and is not sent;
    /// an empty `reason` is not sent either.
    pub fn ban(unique_id: &str, hours: i64, reason: &str) -> Result<Self, ValidationError> {
        let mut params = vec![("unique_id", require_unique_id(unique_id)?)];
        if hours > 0 {
            params.push(("hours", hours.to_string()));
        }
        if !reason.is_empty() {
            params.push(("reason", reason.to_string()));
        }
        Ok(Self::post("/player/ban", params))
    }

    /// `POST /player/unban`
    pub fn unban(unique_id: &str) -> Result<Self, ValidationError> {
        Ok(Self::post(
            "/player/unban",
            vec![("unique_id", require_unique_id(unique_id)?)],
        ))
    }

    /// `http://{address}:{port}{path}?password={secret}&...`
    pub fn url(&self, instance: &InstanceRecord) -> Result<Url, ClientError> {
        let base = format!("http://{}:{}{}", instance.address, instance.port, self.path);
        let mut url = Url::parse(&base)
            .map_err(|e| ValidationError::new(format!("invalid instance address: {e}")))?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("password", &instance.secret);
            for (key, value) in &self.params {
                query.append_pair(key, value);
            }
        }
        Ok(url)
    }
}

fn require_unique_id(unique_id: &str) -> Result<String, ValidationError> {
    if unique_id.is_empty() {
        return Err(ValidationError::new("unique_id cannot be empty"));
    }
    Ok(unique_id.to_string())
}

/// URL with the `password` value replaced, safe for logs.
fn redacted(url: &Url) -> String {
    let mut shown = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let v = if k == "password" { "***".into() } else { v.into_owned() };
            (k.into_owned(), v)
        })
        .collect();
    shown.query_pairs_mut().clear().extend_pairs(pairs);
    shown.to_string()
}

/// Stateless client for the admin API.
#[derive(Clone)]
pub struct AdminClient {
    http: reqwest::Client,
}

impl AdminClient {
    /// Create a client with the standard 10 second timeout.
    pub fn new() -> Result<Self, ClientError> {
        Self::with_timeout(REQUEST_TIMEOUT)
    }

    /// Create a client with a custom per-call timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Network(e.without_url()))?;
        Ok(Self { http })
    }

    /// `POST /chat`
    pub async fn send_chat(
        &self,
        instance: &InstanceRecord,
        message: &str,
    ) -> Result<Envelope, ClientError> {
        self.execute(instance, &AdminRequest::chat(message)?).await
    }

    /// `GET /player/count`
    pub async fn player_count(&self, instance: &InstanceRecord) -> Result<Envelope, ClientError> {
        self.execute(instance, &AdminRequest::player_count()).await
    }

    /// `GET /player/list`
    pub async fn player_list(&self, instance: &InstanceRecord) -> Result<Envelope, ClientError> {
        self.execute(instance, &AdminRequest::player_list()).await
    }

    /// `GET /player/banlist`
    pub async fn ban_list(&self, instance: &InstanceRecord) -> Result<Envelope, ClientError> {
        self.execute(instance, &AdminRequest::ban_list()).await
    }

    /// `GET /version`
    pub async fn version(&self, instance: &InstanceRecord) -> Result<Envelope, ClientError> {
        self.execute(instance, &AdminRequest::version()).await
    }

    /// `GET /housing/list`
    pub async fn housing_list(&self, instance: &InstanceRecord) -> Result<Envelope, ClientError> {
        self.execute(instance, &AdminRequest::housing_list()).await
    }

    /// `POST /player/kick`
    pub async fn kick(
        &self,
        instance: &InstanceRecord,
        unique_id: &str,
    ) -> Result<Envelope, ClientError> {
        self.execute(instance, &AdminRequest::kick(unique_id)?).await
    }

    /// `POST /player/ban`
    pub async fn ban(
        &self,
        instance: &InstanceRecord,
        unique_id: &str,
        hours: i64,
        reason: &str,
    ) -> Result<Envelope, ClientError> {
        self.execute(instance, &AdminRequest::ban(unique_id, hours, reason)?)
            .await
    }

    /// `POST /player/unban`
    pub async fn unban(
        &self,
        instance: &InstanceRecord,
        unique_id: &str,
    ) -> Result<Envelope, ClientError> {
        self.execute(instance, &AdminRequest::unban(unique_id)?).await
    }

    /// Send a prepared request and classify the response.
    pub async fn execute(
        &self,
        instance: &InstanceRecord,
        request: &AdminRequest,
    ) -> Result<Envelope, ClientError> {
        let url = request.url(instance)?;
        debug!("{} {}", request.method, redacted(&url));

        let resp = self
            .http
            .request(request.method.clone(), url)
            .send()
            .await
            .map_err(|e| ClientError::Network(e.without_url()))?;
        Self::handle_response(resp).await
    }

    /// Decode the envelope, then map HTTP status and `succeeded` onto
    /// [`ClientError::Remote`].
    async fn handle_response(resp: reqwest::Response) -> Result<Envelope, ClientError> {
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| ClientError::Network(e.without_url()))?;

        let envelope = Envelope::decode(&body).map_err(|e| ClientError::Protocol(e.to_string()))?;
        debug!(
            "HTTP {} succeeded={} message={:?}",
            status.as_u16(),
            envelope.succeeded,
            envelope.message
        );

        if status != StatusCode::OK || !envelope.succeeded {
            return Err(ClientError::Remote {
                status: status.as_u16(),
                envelope,
            });
        }
        Ok(envelope)
    }
}
