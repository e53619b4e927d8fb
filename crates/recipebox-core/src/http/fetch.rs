//! Credentialed fetch with at most one retry after a token refresh.

use std::sync::Arc;

use reqwest::StatusCode;
use tracing::{debug, warn};

use super::error::FetchError;
use super::transport::{ApiRequest, ApiResponse, Transport};
use crate::session::{REFRESH_PATH, SessionController};

/// How a fetch terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The first attempt's response was returned (any status but a
    /// refreshable 401).
    Completed,
    /// The first attempt got a 401, a refresh succeeded, and the second
    /// attempt's response was returned whatever its status.
    RetriedAfterRefresh,
    /// The first attempt got a 401 and the refresh failed; the first
    /// 401 was returned and the session has ended.
    SessionEnded,
}

/// A response together with the path that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fetched {
    pub response: ApiResponse,
    pub outcome: FetchOutcome,
}

impl Fetched {
    pub fn into_response(self) -> ApiResponse {
        self.response
    }
}

/// Attaches the current bearer token to requests and recovers once from an
/// expired token.
#[derive(Clone)]
pub struct AuthenticatedFetch {
    transport: Arc<Transport>,
    session: Arc<SessionController>,
}

impl AuthenticatedFetch {
    pub fn new(transport: Arc<Transport>, session: Arc<SessionController>) -> Self {
        Self { transport, session }
    }

    pub fn session(&self) -> &SessionController {
        &self.session
    }

    /// Issues `request` without a bearer token and without refresh handling,
    /// for public endpoints.
    ///
    /// # Errors
    /// Returns an error if no response was received.
    pub async fn fetch_anonymous(&self, request: &ApiRequest) -> Result<ApiResponse, FetchError> {
        self.transport.send(request, None).await
    }

    /// Issues `request`.
    ///
    /// Non-401 responses come back untouched. A 401 triggers exactly one
    /// refresh; a request to the refresh endpoint itself never does.
    ///
    /// # Errors
    /// Returns an error only when no response was received. A failed
    /// refresh is not an error: the first 401 is returned.
    pub async fn fetch(&self, request: &ApiRequest) -> Result<Fetched, FetchError> {
        let token = self.session.tokens().get();
        let first = self.transport.send(request, token.as_ref()).await?;

        if first.status() != StatusCode::UNAUTHORIZED || request.path() == REFRESH_PATH {
            return Ok(Fetched {
                response: first,
                outcome: FetchOutcome::Completed,
            });
        }

        debug!(path = request.path(), "access token rejected, refreshing");
        match self.session.refresh().await {
            Ok(token) => {
                let retried = self.transport.send(request, Some(&token)).await?;
                if retried.status() == StatusCode::UNAUTHORIZED {
                    warn!(path = request.path(), "request still unauthorized after refresh");
                }
                Ok(Fetched {
                    response: retried,
                    outcome: FetchOutcome::RetriedAfterRefresh,
                })
            }
            Err(err) => {
                debug!(path = request.path(), error = %err, "returning first 401");
                Ok(Fetched {
                    response: first,
                    outcome: FetchOutcome::SessionEnded,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::events::{AppEvent, EventBus, SessionEvent, SignOutReason};
    use crate::http::CookieJar;
    use crate::session::{ACCESS_TOKEN_KEY, SessionState, token_for};
    use crate::storage::{ClientStorage, MemoryStorage};

    struct Harness {
        fetch: AuthenticatedFetch,
        session: Arc<SessionController>,
    }

    fn harness(base_url: &str, token: Option<&str>) -> Harness {
        let storage = Arc::new(MemoryStorage::new());
        if let Some(token) = token {
            storage.set(ACCESS_TOKEN_KEY, token).unwrap();
        }
        let jar = Arc::new(CookieJar::load(storage.clone()));
        let transport = Arc::new(Transport::new(base_url, jar).unwrap());
        let session = Arc::new(SessionController::new(
            storage,
            Arc::clone(&transport),
            EventBus::default(),
        ));
        Harness {
            fetch: AuthenticatedFetch::new(transport, Arc::clone(&session)),
            session,
        }
    }

    fn bearer(token: &str) -> String {
        format!("Bearer {token}")
    }

    #[tokio::test]
    async fn test_bearer_attached_when_token_present() {
        let server = MockServer::start().await;
        let token = token_for("alice");
        Mock::given(method("GET"))
            .and(path("/api/favorites"))
            .and(header("authorization", bearer(&token).as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let h = harness(&format!("{}/api", server.uri()), Some(&token));
        let fetched = h.fetch.fetch(&ApiRequest::get("/favorites")).await.unwrap();

        assert_eq!(fetched.outcome, FetchOutcome::Completed);
        assert!(fetched.response.is_success());
    }

    #[tokio::test]
    async fn test_no_header_without_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/recipes/categories"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!(["DESSERT"])))
            .mount(&server)
            .await;

        let h = harness(&format!("{}/api", server.uri()), None);
        h.fetch
            .fetch(&ApiRequest::get("/recipes/categories"))
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        assert!(!requests[0].headers.contains_key("authorization"));
    }

    #[tokio::test]
    async fn test_401_refresh_then_retry_succeeds() {
        let server = MockServer::start().await;
        let stale = token_for("alice");
        let fresh = crate::session::token_with_claims(&serde_json::json!({"sub": "alice", "v": 2}));

        Mock::given(method("GET"))
            .and(path("/api/favorites"))
            .and(header("authorization", bearer(&stale).as_str()))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/auth/refresh"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"accessToken": fresh})),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/favorites"))
            .and(header("authorization", bearer(&fresh).as_str()))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!([{"id": 1, "title": "Pancakes"}])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let h = harness(&format!("{}/api", server.uri()), Some(&stale));
        let fetched = h.fetch.fetch(&ApiRequest::get("/favorites")).await.unwrap();

        assert_eq!(fetched.outcome, FetchOutcome::RetriedAfterRefresh);
        assert_eq!(fetched.response.status(), StatusCode::OK);
        assert_eq!(h.session.tokens().get().unwrap().as_str(), fresh);
        assert_eq!(h.session.state(), SessionState::Authenticated);
    }

    #[tokio::test]
    async fn test_401_with_failed_refresh_returns_original_and_ends_session() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/favorites"))
            .respond_with(ResponseTemplate::new(401).set_body_string("expired"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/auth/refresh"))
            .respond_with(ResponseTemplate::new(403))
            .expect(1)
            .mount(&server)
            .await;

        let h = harness(&format!("{}/api", server.uri()), Some(&token_for("alice")));
        let mut rx = h.session.subscribe();
        let fetched = h.fetch.fetch(&ApiRequest::get("/favorites")).await.unwrap();

        assert_eq!(fetched.outcome, FetchOutcome::SessionEnded);
        assert_eq!(fetched.response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(fetched.response.text(), "expired");
        assert!(h.session.tokens().get().is_none());
        assert_eq!(h.session.state(), SessionState::Anonymous);
        assert_eq!(
            *rx.try_recv().unwrap(),
            AppEvent::Session(SessionEvent::SignedOut {
                reason: SignOutReason::RefreshFailed
            })
        );
    }

    #[tokio::test]
    async fn test_retry_that_returns_401_is_not_retried_again() {
        let server = MockServer::start().await;
        let fresh = crate::session::token_with_claims(&serde_json::json!({"sub": "alice", "v": 2}));
        Mock::given(method("GET"))
            .and(path("/api/favorites"))
            .respond_with(ResponseTemplate::new(401))
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/auth/refresh"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"accessToken": fresh})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let h = harness(&format!("{}/api", server.uri()), Some(&token_for("alice")));
        let fetched = h.fetch.fetch(&ApiRequest::get("/favorites")).await.unwrap();

        assert_eq!(fetched.outcome, FetchOutcome::RetriedAfterRefresh);
        assert_eq!(fetched.response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(h.session.tokens().get().unwrap().as_str(), fresh);
    }

    #[tokio::test]
    async fn test_concurrent_401s_refresh_independently() {
        let server = MockServer::start().await;
        let stale = token_for("alice");
        let fresh = crate::session::token_with_claims(&serde_json::json!({"sub": "alice.smith"}));

        Mock::given(method("GET"))
            .and(path("/api/favorites"))
            .and(header("authorization", bearer(&stale).as_str()))
            .respond_with(ResponseTemplate::new(401))
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/auth/refresh"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"accessToken": fresh})),
            )
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/favorites"))
            .and(header("authorization", bearer(&fresh).as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .expect(2)
            .mount(&server)
            .await;

        let h = harness(&format!("{}/api", server.uri()), Some(&stale));
        let mut rx = h.session.subscribe();
        let request = ApiRequest::get("/favorites");
        let (first, second) = tokio::join!(h.fetch.fetch(&request), h.fetch.fetch(&request));

        assert_eq!(first.unwrap().outcome, FetchOutcome::RetriedAfterRefresh);
        assert_eq!(second.unwrap().outcome, FetchOutcome::RetriedAfterRefresh);
        assert_eq!(h.session.tokens().get().unwrap().as_str(), fresh);
        assert_eq!(h.session.state(), SessionState::Authenticated);

        // the second refresh sees an unchanged label and stays quiet
        assert!(matches!(
            *rx.try_recv().unwrap(),
            AppEvent::Session(SessionEvent::IdentityChanged { .. })
        ));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_refresh_endpoint_401_does_not_recurse() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/refresh"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let h = harness(&format!("{}/api", server.uri()), Some(&token_for("alice")));
        let fetched = h.fetch.fetch(&ApiRequest::post(REFRESH_PATH)).await.unwrap();

        assert_eq!(fetched.outcome, FetchOutcome::Completed);
        assert_eq!(fetched.response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(h.session.state(), SessionState::Authenticated);
    }

    #[tokio::test]
    async fn test_other_error_statuses_pass_through() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/recipes/99"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/auth/refresh"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let h = harness(&format!("{}/api", server.uri()), Some(&token_for("alice")));
        let fetched = h.fetch.fetch(&ApiRequest::get("/recipes/99")).await.unwrap();

        assert_eq!(fetched.outcome, FetchOutcome::Completed);
        assert_eq!(fetched.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_transport_failure_is_distinct_from_401() {
        let h = harness("http://127.0.0.1:9/api", Some(&token_for("alice")));
        let err = h
            .fetch
            .fetch(&ApiRequest::get("/favorites"))
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Transport { .. }));
        assert_eq!(h.session.state(), SessionState::Authenticated);
    }
}
