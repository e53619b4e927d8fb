//! Access token persistence and display identity.
//!
//! The token's claims are decoded without signature verification. The
//! resulting [`Identity`] is for display only and must never be used for
//! authorization decisions.

use std::fmt;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};

use crate::storage::{ClientStorage, StorageError};

/// Storage key holding the current access token.
pub const ACCESS_TOKEN_KEY: &str = "accessToken";

/// Label shown when a token's claims cannot be decoded.
pub const PLACEHOLDER_IDENTITY: &str = "user";

/// Opaque bearer credential.
///
/// `Debug` output is masked so tokens never end up in logs in full.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns a masked version of the token for display (first 12 chars + ...).
    pub fn masked(&self) -> String {
        if self.0.len() <= 16 || !self.0.is_char_boundary(12) {
            return "***".to_string();
        }
        format!("{}...", &self.0[..12])
    }

    /// Returns the `Authorization` header value for this token.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AccessToken").field(&self.masked()).finish()
    }
}

/// Display identity derived from an access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    /// Subject (or username) claim read from the token payload.
    Subject(String),
    /// The payload could not be decoded.
    Placeholder,
}

impl Identity {
    /// Derives the identity of `token`. Never fails.
    pub fn from_token(token: &AccessToken) -> Self {
        decode_subject(token.as_str()).map_or(Identity::Placeholder, Identity::Subject)
    }

    pub fn label(&self) -> &str {
        match self {
            Identity::Subject(name) => name,
            Identity::Placeholder => PLACEHOLDER_IDENTITY,
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Extracts `sub` (or `username`) from the middle segment of a
/// three-part dot-delimited token.
fn decode_subject(token: &str) -> Option<String> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return None;
    }
    let payload = parts[1].trim_end_matches('=');
    let decoded = URL_SAFE_NO_PAD
        .decode(payload)
        .or_else(|_| STANDARD_NO_PAD.decode(payload))
        .ok()?;
    let json: serde_json::Value = serde_json::from_slice(&decoded).ok()?;

    ["sub", "username"]
        .iter()
        .filter_map(|field| json.get(field).and_then(|v| v.as_str()))
        .find(|v| !v.trim().is_empty())
        .map(std::string::ToString::to_string)
}

/// Sole owner of the persisted access token.
#[derive(Clone)]
pub struct TokenStore {
    storage: Arc<dyn ClientStorage>,
}

impl TokenStore {
    pub fn new(storage: Arc<dyn ClientStorage>) -> Self {
        Self { storage }
    }

    /// Returns the current token, if any.
    pub fn get(&self) -> Option<AccessToken> {
        self.storage
            .get(ACCESS_TOKEN_KEY)
            .filter(|t| !t.is_empty())
            .map(AccessToken)
    }

    /// Persists `token` as current, overwriting any prior value.
    ///
    /// # Errors
    /// Returns an error if the token cannot be persisted.
    pub fn set(&self, token: &AccessToken) -> Result<(), StorageError> {
        self.storage.set(ACCESS_TOKEN_KEY, token.as_str())
    }

    /// Removes the persisted token.
    ///
    /// # Errors
    /// Returns an error if the removal cannot be persisted.
    pub fn clear(&self) -> Result<(), StorageError> {
        self.storage.remove(ACCESS_TOKEN_KEY)
    }

    /// Derives the display identity of the current token.
    /// Returns `None` only when no token is stored.
    pub fn derive_identity(&self) -> Option<Identity> {
        self.get().map(|token| Identity::from_token(&token))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use base64::engine::general_purpose::STANDARD;

    use super::*;
    use crate::storage::MemoryStorage;

    /// Builds an unsigned three-part token around `claims`.
    pub(crate) fn token_with_claims(claims: &serde_json::Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
        format!("{header}.{payload}.signature")
    }

    pub(crate) fn token_for(subject: &str) -> String {
        token_with_claims(&serde_json::json!({ "sub": subject, "exp": 4_102_444_800_u64 }))
    }

    #[test]
    fn test_subject_is_extracted() {
        let token = AccessToken::new(token_for("alice"));
        assert_eq!(
            Identity::from_token(&token),
            Identity::Subject("alice".to_string())
        );
    }

    #[test]
    fn test_username_claim_is_a_fallback() {
        let token = AccessToken::new(token_with_claims(&serde_json::json!({ "username": "bob" })));
        assert_eq!(Identity::from_token(&token).label(), "bob");
    }

    #[test]
    fn test_padded_standard_alphabet_payload_is_accepted() {
        let payload = STANDARD.encode(r#"{"sub":"carol??"}"#);
        let token = AccessToken::new(format!("h.{payload}.s"));
        assert_eq!(Identity::from_token(&token).label(), "carol??");
    }

    #[test]
    fn test_malformed_tokens_fall_back_to_placeholder() {
        let missing_field = token_with_claims(&serde_json::json!({ "role": "USER" }));
        let not_json = format!("h.{}.s", URL_SAFE_NO_PAD.encode("plain text"));
        let cases = [
            "",
            "opaque-token",
            "only.two",
            "a.b.c.d",
            "h.!!!not-base64!!!.s",
            not_json.as_str(),
            missing_field.as_str(),
        ];

        for raw in cases {
            let identity = Identity::from_token(&AccessToken::new(raw));
            assert_eq!(identity, Identity::Placeholder, "token: {raw:?}");
            assert_eq!(identity.label(), "user");
        }
    }

    #[test]
    fn test_store_set_get_clear() {
        let store = TokenStore::new(Arc::new(MemoryStorage::new()));
        assert!(store.get().is_none());
        assert!(store.derive_identity().is_none());

        store.set(&AccessToken::new(token_for("alice"))).unwrap();
        assert_eq!(store.derive_identity().unwrap().label(), "alice");

        store.set(&AccessToken::new("second")).unwrap();
        assert_eq!(store.get().unwrap().as_str(), "second");
        assert_eq!(store.derive_identity(), Some(Identity::Placeholder));

        store.clear().unwrap();
        assert!(store.get().is_none());
    }

    #[test]
    fn test_debug_output_is_masked() {
        let token = AccessToken::new("eyJhbGciOiJIUzI1NiJ9.secret-payload.sig");
        let debug = format!("{token:?}");
        assert!(debug.contains("eyJhbGciOiJI..."));
        assert!(!debug.contains("secret-payload"));
        assert_eq!(AccessToken::new("short").masked(), "***");
    }
}
