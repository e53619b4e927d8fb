//! Session state machine.
//!
//! `Anonymous <-> Authenticated`, driven by login/register (set),
//! logout and refresh failure (clear), and token refresh (replace). Every
//! transition is published on the [`EventBus`].

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::token::{AccessToken, Identity, TokenStore};
use crate::events::{AppEvent, AppEventRx, EventBus, SessionEvent, SignOutReason};
use crate::http::{ApiError, ApiRequest, ApiResponse, FetchError, Transport};
use crate::storage::{ClientStorage, StorageError};

pub const LOGIN_PATH: &str = "/auth/login";
pub const REGISTER_PATH: &str = "/auth/register";
pub const LOGOUT_PATH: &str = "/auth/logout";
/// Requests to this path never trigger refresh-on-401.
pub const REFRESH_PATH: &str = "/auth/refresh";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Authenticated,
}

/// Snapshot of the current session.
///
/// Built from the token store in one read, so the token and its identity
/// always belong together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    access_token: Option<AccessToken>,
    identity: Option<Identity>,
}

impl Session {
    fn from_token(access_token: Option<AccessToken>) -> Self {
        let identity = access_token.as_ref().map(Identity::from_token);
        Self {
            access_token,
            identity,
        }
    }

    pub fn access_token(&self) -> Option<&AccessToken> {
        self.access_token.as_ref()
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn state(&self) -> SessionState {
        if self.access_token.is_some() {
            SessionState::Authenticated
        } else {
            SessionState::Anonymous
        }
    }
}

/// Username and password for login/register.
#[derive(Clone, Serialize)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    /// Builds credentials; the username is trimmed, the password is not.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into().trim().to_string(),
            password: password.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    fn validate(&self) -> Result<(), ApiError> {
        if self.username.is_empty() || self.password.is_empty() {
            return Err(ApiError::Invalid("All fields required".to_string()));
        }
        Ok(())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Result of a successful login or register call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthOutcome {
    /// Server-provided message, if any.
    pub message: Option<String>,
    /// Set when the call started a session.
    pub identity: Option<Identity>,
}

impl AuthOutcome {
    pub fn signed_in(&self) -> bool {
        self.identity.is_some()
    }
}

/// Why a refresh did not produce a new access token.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("refresh rejected with HTTP {status}")]
    Rejected { status: u16 },
    #[error("refresh response did not include an access token")]
    MissingToken,
    #[error("refresh request failed")]
    Fetch(#[from] FetchError),
    #[error("could not persist refreshed access token")]
    Storage(#[from] StorageError),
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl TokenResponse {
    /// Non-JSON bodies are read as a plain message.
    fn parse(response: &ApiResponse) -> Self {
        response.json().unwrap_or_else(|_| {
            let text = response.text();
            let text = text.trim();
            Self {
                access_token: None,
                message: (!text.is_empty()).then(|| text.to_string()),
            }
        })
    }

    fn token(&self) -> Option<AccessToken> {
        self.access_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(AccessToken::new)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Owns session transitions and publishes them to subscribers.
pub struct SessionController {
    tokens: TokenStore,
    transport: Arc<Transport>,
    events: EventBus,
    /// Identity last announced to subscribers, for change detection.
    announced: Mutex<Option<Identity>>,
}

impl SessionController {
    /// Restores the session from persisted storage: `Authenticated` iff a
    /// token is stored.
    pub fn new(storage: Arc<dyn ClientStorage>, transport: Arc<Transport>, events: EventBus) -> Self {
        let tokens = TokenStore::new(storage);
        let announced = tokens.derive_identity();
        match &announced {
            Some(identity) => debug!(identity = %identity, "restored session"),
            None => debug!("no stored session"),
        }
        Self {
            tokens,
            transport,
            events,
            announced: Mutex::new(announced),
        }
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn subscribe(&self) -> AppEventRx {
        self.events.subscribe()
    }

    pub fn session(&self) -> Session {
        Session::from_token(self.tokens.get())
    }

    pub fn state(&self) -> SessionState {
        self.session().state()
    }

    pub fn identity(&self) -> Option<Identity> {
        self.tokens.derive_identity()
    }

    /// Logs in and starts a session.
    ///
    /// # Errors
    /// Returns an error if the credentials are blank, the server rejects
    /// them, no token is returned, or the token cannot be persisted.
    pub async fn login(&self, credentials: &Credentials) -> Result<AuthOutcome, ApiError> {
        let body = self.authenticate(LOGIN_PATH, credentials).await?;
        let token = body.token().ok_or_else(|| {
            ApiError::Invalid("Login response did not include an access token".to_string())
        })?;
        let identity = self.sign_in(&token)?;
        info!(identity = %identity, "logged in");
        Ok(AuthOutcome {
            message: body.message,
            identity: Some(identity),
        })
    }

    /// Registers an account. Starts a session only if the server returns a
    /// token.
    ///
    /// # Errors
    /// Returns an error if the credentials are blank, the server rejects
    /// them, or a returned token cannot be persisted.
    pub async fn register(&self, credentials: &Credentials) -> Result<AuthOutcome, ApiError> {
        let body = self.authenticate(REGISTER_PATH, credentials).await?;
        let identity = match body.token() {
            Some(token) => Some(self.sign_in(&token)?),
            None => None,
        };
        info!(username = credentials.username(), signed_in = identity.is_some(), "registered");
        Ok(AuthOutcome {
            message: body.message,
            identity,
        })
    }

    /// Ends the session. Local state is cleared whatever the server says.
    ///
    /// # Errors
    /// Returns an error only if clearing the stored token fails; the
    /// session is reported as ended either way.
    pub async fn logout(&self) -> Result<(), StorageError> {
        match self.transport.send(&ApiRequest::post(LOGOUT_PATH), None).await {
            Ok(response) if response.is_success() => debug!("server session closed"),
            Ok(response) => warn!(status = response.status().as_u16(), "logout rejected by server"),
            Err(err) => warn!(error = %err, "logout request failed"),
        }
        self.transport.forget_cookies();
        let cleared = self.end_session(SignOutReason::Logout);
        info!("logged out");
        cleared
    }

    /// Exchanges the refresh cookie for a new access token.
    ///
    /// On success the token is stored and subscribers hear about a new or
    /// changed identity. On failure the session ends.
    ///
    /// # Errors
    /// Returns the reason no new token was obtained.
    pub async fn refresh(&self) -> Result<AccessToken, SessionError> {
        match self.request_new_token().await {
            Ok(token) => {
                debug!(token = %token.masked(), "access token refreshed");
                Ok(token)
            }
            Err(err) => {
                warn!(error = %err, "token refresh failed, ending session");
                if let Err(clear_err) = self.end_session(SignOutReason::RefreshFailed) {
                    warn!(error = %clear_err, "failed to clear access token");
                }
                Err(err)
            }
        }
    }

    async fn request_new_token(&self) -> Result<AccessToken, SessionError> {
        let response = self
            .transport
            .send(&ApiRequest::post(REFRESH_PATH), None)
            .await?;
        if !response.is_success() {
            return Err(SessionError::Rejected {
                status: response.status().as_u16(),
            });
        }
        let token = TokenResponse::parse(&response)
            .token()
            .ok_or(SessionError::MissingToken)?;

        self.tokens.set(&token)?;
        let identity = Identity::from_token(&token);
        let previous = lock(&self.announced).replace(identity.clone());
        match previous {
            None => self.publish(SessionEvent::SignedIn { identity }),
            Some(previous) if previous.label() != identity.label() => {
                self.publish(SessionEvent::IdentityChanged { identity });
            }
            Some(_) => {}
        }
        Ok(token)
    }

    async fn authenticate(
        &self,
        path: &str,
        credentials: &Credentials,
    ) -> Result<TokenResponse, ApiError> {
        credentials.validate()?;
        let request = ApiRequest::post(path).json(credentials)?;
        let response = self
            .transport
            .send(&request, None)
            .await?
            .error_for_status()?;
        Ok(TokenResponse::parse(&response))
    }

    fn sign_in(&self, token: &AccessToken) -> Result<Identity, StorageError> {
        self.tokens.set(token)?;
        let identity = Identity::from_token(token);
        *lock(&self.announced) = Some(identity.clone());
        self.publish(SessionEvent::SignedIn {
            identity: identity.clone(),
        });
        Ok(identity)
    }

    /// Clears the token. A refresh failure is only announced if a session
    /// was actually active; logout is always announced.
    fn end_session(&self, reason: SignOutReason) -> Result<(), StorageError> {
        let cleared = self.tokens.clear();
        let was_signed_in = lock(&self.announced).take().is_some();
        if was_signed_in || reason == SignOutReason::Logout {
            self.publish(SessionEvent::SignedOut { reason });
        }
        cleared
    }

    fn publish(&self, event: SessionEvent) {
        self.events.publish(AppEvent::Session(event));
    }
}
