//! Event types published to the presentation layer.
//!
//! The session controller and the [`App`](crate::app::App) facade publish
//! [`AppEvent`]s on an [`EventBus`]; front-ends subscribe and reconcile
//! their view with [`ViewState`](crate::view::ViewState) instead of being
//! wired to individual call sites.

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::resources::FavoriteRecipe;
use crate::session::Identity;

/// Default capacity of the event bus.
///
/// Subscribers that fall further behind than this lose the oldest events.
pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 64;

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignOutReason {
    /// The user logged out.
    Logout,
    /// The refresh credential was rejected or unreachable.
    RefreshFailed,
}

/// Session state transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// `Anonymous -> Authenticated`.
    SignedIn { identity: Identity },
    /// `Authenticated -> Anonymous`.
    SignedOut { reason: SignOutReason },
    /// Token refreshed and the identity label changed.
    IdentityChanged { identity: Identity },
}

/// Severity of a user-facing notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Warning,
    Error,
}

/// A user-facing notification (the toast of a browser front-end).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// Everything the presentation layer reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    Session(SessionEvent),
    Notice(Notice),
    /// Favorites were (re)loaded for the signed-in user.
    FavoritesLoaded(Vec<FavoriteRecipe>),
    /// Loading favorites failed.
    FavoritesFailed(String),
}

pub type AppEventRx = broadcast::Receiver<Arc<AppEvent>>;

/// Broadcast sender shared by every publisher.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<Arc<AppEvent>>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CHANNEL_CAPACITY)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> AppEventRx {
        self.tx.subscribe()
    }

    /// Publishes `event`. Having no subscribers is not an error.
    pub fn publish(&self, event: AppEvent) {
        let _ = self.tx.send(Arc::new(event));
    }

    pub fn notify(&self, notice: Notice) {
        self.publish(AppEvent::Notice(notice));
    }
}
