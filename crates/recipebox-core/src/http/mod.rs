//! HTTP plumbing: request descriptors, the cookie-carrying transport and
//! the refresh-aware fetch wrapper.

mod cookies;
mod error;
mod fetch;
mod transport;

pub use cookies::{COOKIES_KEY, CookieJar};
pub use error::{ApiError, FetchError};
pub use fetch::{AuthenticatedFetch, FetchOutcome, Fetched};
pub use transport::{ApiRequest, ApiResponse, Transport};
