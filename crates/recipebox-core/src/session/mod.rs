//! Session lifecycle: the persisted access token and the controller that
//! moves between `Anonymous` and `Authenticated`.

mod controller;
mod token;

pub use controller::{
    AuthOutcome, Credentials, LOGIN_PATH, LOGOUT_PATH, REFRESH_PATH, REGISTER_PATH, Session,
    SessionController, SessionError, SessionState,
};
pub use token::{ACCESS_TOKEN_KEY, AccessToken, Identity, PLACEHOLDER_IDENTITY, TokenStore};

#[cfg(test)]
pub(crate) use token::tests::{token_for, token_with_claims};
