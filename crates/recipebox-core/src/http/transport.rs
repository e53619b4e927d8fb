//! Request descriptors and the HTTP transport.

use std::sync::Arc;

use bytes::Bytes;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::cookies::CookieJar;
use super::error::{ApiError, FetchError, extract_message};
use crate::session::AccessToken;

/// Description of one API call, relative to the base URL.
///
/// Each attempt builds a fresh `reqwest::Request` from this value, so a
/// request can be replayed with a different bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: Option<Bytes>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    #[must_use]
    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    /// Attaches a JSON body.
    ///
    /// # Errors
    /// Returns an error if `body` cannot be serialized.
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, serde_json::Error> {
        self.body = Some(Bytes::from(serde_json::to_vec(body)?));
        Ok(self)
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

/// A fully-read HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    status: StatusCode,
    body: Bytes,
}

impl ApiResponse {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Decodes the body as JSON.
    ///
    /// # Errors
    /// Returns an error if the body is not valid JSON for `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// Human-readable message carried by the body, if any.
    pub fn message(&self) -> Option<String> {
        extract_message(&self.body)
    }

    /// Turns a non-success status into [`ApiError::Status`].
    ///
    /// # Errors
    /// Returns an error if the status is not 2xx.
    pub fn error_for_status(self) -> Result<Self, ApiError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ApiError::status(self.status.as_u16(), &self.body))
        }
    }
}

/// Owns the HTTP client (with the persistent cookie jar) and base URL.
pub struct Transport {
    http: reqwest::Client,
    base_url: String,
    jar: Arc<CookieJar>,
}

impl Transport {
    /// Creates a transport for `base_url` (e.g. `http://localhost:8080/api`).
    ///
    /// # Errors
    /// Returns an error if the base URL is malformed or the client cannot be built.
    pub fn new(base_url: &str, jar: Arc<CookieJar>) -> Result<Self, FetchError> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        Url::parse(&base_url).map_err(|source| FetchError::InvalidUrl {
            url: base_url.clone(),
            source,
        })?;

        let http = reqwest::Client::builder()
            .cookie_provider(Arc::clone(&jar))
            .build()
            .map_err(FetchError::Client)?;

        Ok(Self {
            http,
            base_url,
            jar,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Drops every stored cookie, including the refresh credential.
    pub fn forget_cookies(&self) {
        self.jar.clear();
    }

    /// Resolves the absolute URL of `request`.
    ///
    /// # Errors
    /// Returns an error if the joined URL is malformed.
    pub fn url(&self, request: &ApiRequest) -> Result<Url, FetchError> {
        let raw = format!("{}{}", self.base_url, request.path);
        let mut url = Url::parse(&raw).map_err(|source| FetchError::InvalidUrl {
            url: raw.clone(),
            source,
        })?;
        if !request.query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(request.query.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }
        Ok(url)
    }

    /// Issues `request`, attaching `bearer` as the `Authorization` header
    /// when present, and reads the whole body.
    ///
    /// # Errors
    /// Returns an error if no response is received.
    pub async fn send(
        &self,
        request: &ApiRequest,
        bearer: Option<&AccessToken>,
    ) -> Result<ApiResponse, FetchError> {
        let url = self.url(request)?;
        let mut builder = self.http.request(request.method.clone(), url);
        if let Some(token) = bearer {
            builder = builder.header(AUTHORIZATION, token.bearer());
        }
        if let Some(body) = &request.body {
            builder = builder
                .header(CONTENT_TYPE, "application/json")
                .body(body.clone());
        }

        let transport_err = |source| FetchError::Transport {
            path: request.path.clone(),
            source,
        };
        let response = builder.send().await.map_err(transport_err)?;
        let status = response.status();
        let body = response.bytes().await.map_err(transport_err)?;

        debug!(
            method = %request.method,
            path = %request.path,
            status = status.as_u16(),
            authenticated = bearer.is_some(),
            "api response"
        );

        Ok(ApiResponse { status, body })
    }
}
