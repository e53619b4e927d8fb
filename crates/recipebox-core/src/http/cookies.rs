//! Persistent cookie jar.
//!
//! Replays server-set cookies (notably the refresh credential) on later
//! requests, like a browser would. Cookie semantics (domain, path, expiry,
//! `Secure`) are `cookie_store`'s; this module only persists the store in
//! [`ClientStorage`] whenever a response sets cookies. Values are never
//! logged.

use std::sync::{Arc, MutexGuard, PoisonError};

use reqwest::Url;
use reqwest::cookie::CookieStore as _;
use reqwest::header::HeaderValue;
use reqwest_cookie_store::{CookieStore, CookieStoreMutex};
use tracing::{debug, warn};

use crate::storage::ClientStorage;

/// Storage key holding the serialized jar.
pub const COOKIES_KEY: &str = "rs_cookies";

/// Cookie store handed to `reqwest`, persisted through [`ClientStorage`].
pub struct CookieJar {
    storage: Arc<dyn ClientStorage>,
    store: CookieStoreMutex,
}

impl CookieJar {
    /// Loads previously stored cookies. An unreadable entry yields an empty jar.
    pub fn load(storage: Arc<dyn ClientStorage>) -> Self {
        let store = storage
            .get(COOKIES_KEY)
            .and_then(|raw| match cookie_store::serde::json::load_all(raw.as_bytes()) {
                Ok(store) => Some(store),
                Err(err) => {
                    warn!(error = %err, "discarding unreadable cookie jar");
                    None
                }
            })
            .unwrap_or_default();

        Self {
            storage,
            store: CookieStoreMutex::new(store),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CookieStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Removes every cookie.
    pub fn clear(&self) {
        self.lock().clear();
        if let Err(err) = self.storage.remove(COOKIES_KEY) {
            warn!(error = %err, "failed to clear persisted cookies");
        }
    }

    /// Number of live cookies that would be sent to `url`.
    pub fn count_for(&self, url: &Url) -> usize {
        self.lock().matches(url).len()
    }

    // Session cookies are kept too: the refresh credential has to outlive
    // the process even when the server sets it without an expiry.
    fn persist(&self) {
        let mut raw = Vec::new();
        let saved = {
            let store = self.lock();
            cookie_store::serde::json::save_incl_expired_and_nonpersistent(&store, &mut raw)
        };
        let result = saved
            .map_err(|err| err.to_string())
            .and_then(|()| String::from_utf8(raw).map_err(|err| err.to_string()))
            .and_then(|raw| {
                self.storage
                    .set(COOKIES_KEY, &raw)
                    .map_err(|err| err.to_string())
            });
        if let Err(err) = result {
            warn!(error = %err, "failed to persist cookies");
        }
    }
}

impl reqwest::cookie::CookieStore for CookieJar {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        let headers: Vec<&HeaderValue> = cookie_headers.collect();
        if headers.is_empty() {
            return;
        }
        debug!(count = headers.len(), host = url.host_str(), "storing cookies");
        self.store.set_cookies(&mut headers.into_iter(), url);
        self.persist();
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        self.store.cookies(url)
    }
}
