//! The single choke point for authenticated calls to the LinkedIn REST API.
//!
//! Every request is built from a [`RequestContext`] snapshot taken after the
//! session has been checked for freshness, so a request never leaves the
//! process with a token the session already knows to be expired.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{header, Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::{CoreError, Urn};
use crate::auth::{RefreshOutcome, RequestContext, SessionManager};

const RESTLI_PROTOCOL_VERSION_HEADER: &str = "X-Restli-Protocol-Version";
const RESTLI_PROTOCOL_VERSION: &str = "2.0.0";

/// Response header carrying the id of a created entity.
const RESTLI_ID_HEADER: &str = "x-restli-id";

#[derive(Debug, Clone)]
enum Target {
    /// Path (and query) under the API base URL.
    Api(String),
    /// Fully qualified URL handed out by the API, e.g. an upload URL.
    Absolute(String),
}

#[derive(Debug, Clone)]
pub enum RequestBody {
    Empty,
    Json(serde_json::Value),
    Bytes { content_type: String, data: Vec<u8> },
}

/// Description of one outbound call. Building it performs no I/O.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    target: Target,
    body: RequestBody,
    restli: bool,
    timeout: Option<Duration>,
}

impl ApiRequest {
    fn new(method: Method, target: Target) -> Self {
        let restli = matches!(target, Target::Api(_));
        Self {
            method,
            target,
            body: RequestBody::Empty,
            restli,
            timeout: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, Target::Api(path.into()))
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, Target::Api(path.into()))
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, Target::Api(path.into()))
    }

    /// PUT to a URL outside the API base. Sent without the Rest.li header.
    pub fn put_absolute(url: impl Into<String>) -> Self {
        Self::new(Method::PUT, Target::Absolute(url.into()))
    }

    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    pub fn bytes(mut self, content_type: impl Into<String>, data: Vec<u8>) -> Self {
        self.body = RequestBody::Bytes {
            content_type: content_type.into(),
            data,
        };
        self
    }

    /// Bound this call; overrides the dispatcher default.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn body(&self) -> &RequestBody {
        &self.body
    }
}

#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    /// Value of the `x-restli-id` header, set on create operations.
    pub restli_id: Option<String>,
    pub body: String,
    /// Set when this call refreshed the credential but could not write it to disk.
    pub persistence_warning: Option<CoreError>,
}

impl ApiResponse {
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, CoreError> {
        serde_json::from_str(&self.body)
            .map_err(|e| CoreError::InvalidResponse(format!("{} (body: {} bytes)", e, self.body.len())))
    }
}

/// Dispatcher for authenticated API calls.
/// Clone is cheap: the session is shared and reqwest::Client uses Arc internally.
#[derive(Clone)]
pub struct RequestDispatcher {
    session: Arc<SessionManager>,
    client: Client,
    api_base_url: String,
    default_timeout: Duration,
}

impl RequestDispatcher {
    pub fn new(session: Arc<SessionManager>, client: Client, api_base_url: impl Into<String>, default_timeout: Duration) -> Self {
        Self {
            session,
            client,
            api_base_url: api_base_url.into(),
            default_timeout,
        }
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    /// A credential is on record (it may still need a refresh).
    pub fn ensure_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    pub fn normalize_reference(&self, raw: &str) -> Urn {
        Urn::normalize(raw)
    }

    /// Run one authenticated call.
    ///
    /// `build` may be called a second time when the API rejects the token
    /// with 401: the session is refreshed once and the request rebuilt with
    /// the new credential. No other failure is retried.
    pub async fn invoke<F>(&self, build: F) -> Result<ApiResponse, CoreError>
    where
        F: Fn(&RequestContext) -> ApiRequest,
    {
        if !self.session.is_authenticated() {
            return Err(CoreError::AuthenticationRequired);
        }
        let mut persistence_warning = not_persisted(self.session.ensure_fresh().await?);

        let ctx = self
            .session
            .access_context()
            .ok_or(CoreError::AuthenticationRequired)?;

        let mut response = match self.send(&ctx, build(&ctx)).await {
            Err(CoreError::UpstreamRequestFailed { status, .. }) if status == StatusCode::UNAUTHORIZED.as_u16() => {
                warn!(subject = %ctx.subject_id, "Access token rejected by API, refreshing once");
                let outcome = self.session.refresh_after_rejection(&ctx.access_token).await?;
                persistence_warning = not_persisted(outcome).or(persistence_warning);

                let retry_ctx = self
                    .session
                    .access_context()
                    .ok_or(CoreError::AuthenticationRequired)?;
                self.send(&retry_ctx, build(&retry_ctx)).await?
            }
            other => other?,
        };
        response.persistence_warning = persistence_warning;
        Ok(response)
    }

    /// [`invoke`](Self::invoke) and decode the JSON body.
    pub async fn invoke_json<T, F>(&self, build: F) -> Result<T, CoreError>
    where
        T: DeserializeOwned,
        F: Fn(&RequestContext) -> ApiRequest,
    {
        self.invoke(build).await?.json()
    }

    async fn send(&self, ctx: &RequestContext, request: ApiRequest) -> Result<ApiResponse, CoreError> {
        // Overrides the client-wide timeout, longer or shorter.
        let timeout = request.timeout.unwrap_or(self.default_timeout);
        let url = match &request.target {
            Target::Api(path) => format!("{}{}", self.api_base_url, path),
            Target::Absolute(url) => url.clone(),
        };

        let mut builder = self
            .client
            .request(request.method.clone(), &url)
            .bearer_auth(&ctx.access_token)
            .timeout(timeout);
        if request.restli {
            builder = builder.header(RESTLI_PROTOCOL_VERSION_HEADER, RESTLI_PROTOCOL_VERSION);
        }
        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(ref value) => builder.json(value),
            RequestBody::Bytes { content_type, data } => builder.header(header::CONTENT_TYPE, content_type).body(data),
        };

        debug!(method = %request.method, url = %url, "Sending API request");

        let exchange = async {
            let response = builder.send().await.map_err(|e| CoreError::from_transport(&e))?;
            let status = response.status();
            let restli_id = response
                .headers()
                .get(RESTLI_ID_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let body = response.text().await.map_err(|e| CoreError::from_transport(&e))?;
            Ok::<_, CoreError>((status, restli_id, body))
        };

        let (status, restli_id, body) = match tokio::time::timeout(timeout, exchange).await {
            Ok(result) => result?,
            Err(_) => {
                warn!(method = %request.method, url = %url, ?timeout, "API request timed out");
                return Err(CoreError::timeout(timeout));
            }
        };

        if !status.is_success() {
            warn!(method = %request.method, url = %url, status = status.as_u16(), "API request failed");
            return Err(CoreError::from_status(status, body));
        }

        Ok(ApiResponse {
            status: status.as_u16(),
            restli_id,
            body,
            persistence_warning: None,
        })
    }
}

fn not_persisted(outcome: RefreshOutcome) -> Option<CoreError> {
    match outcome {
        RefreshOutcome::RefreshedNotPersisted(reason) => {
            warn!(%reason, "Continuing with a refreshed credential that is only held in memory");
            Some(CoreError::Persistence(reason))
        }
        _ => None,
    }
}
