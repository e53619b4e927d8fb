//! Presentation state reconciled from session and resource events.

use std::collections::VecDeque;

use crate::events::{AppEvent, Notice, SessionEvent};
use crate::resources::FavoriteRecipe;
use crate::session::{Session, SessionState};

/// Which session-dependent controls are shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Affordances {
    pub login: bool,
    pub register: bool,
    pub logout: bool,
    pub create: bool,
}

impl Affordances {
    fn for_state(state: SessionState) -> Self {
        let signed_in = state == SessionState::Authenticated;
        Self {
            login: !signed_in,
            register: !signed_in,
            logout: signed_in,
            create: signed_in,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FavoritesPanel {
    LoginRequired,
    Loading,
    Loaded(Vec<FavoriteRecipe>),
    Failed(String),
}

/// What a front-end shows, derived only from events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
    state: SessionState,
    greeting: Option<String>,
    affordances: Affordances,
    favorites: FavoritesPanel,
    notices: VecDeque<Notice>,
}

fn greeting(label: &str) -> String {
    format!("Hi, {label}")
}

impl ViewState {
    /// Initial view for a restored session. Favorites of a signed-in user
    /// start out loading.
    pub fn from_session(session: &Session) -> Self {
        let state = session.state();
        Self {
            state,
            greeting: session.identity().map(|identity| greeting(identity.label())),
            affordances: Affordances::for_state(state),
            favorites: match state {
                SessionState::Authenticated => FavoritesPanel::Loading,
                SessionState::Anonymous => FavoritesPanel::LoginRequired,
            },
            notices: VecDeque::new(),
        }
    }

    pub fn apply(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Session(SessionEvent::SignedIn { identity }) => {
                self.set_state(SessionState::Authenticated);
                self.greeting = Some(greeting(identity.label()));
                self.favorites = FavoritesPanel::Loading;
            }
            AppEvent::Session(SessionEvent::IdentityChanged { identity }) => {
                self.greeting = Some(greeting(identity.label()));
            }
            AppEvent::Session(SessionEvent::SignedOut { .. }) => {
                self.set_state(SessionState::Anonymous);
                self.greeting = None;
                self.favorites = FavoritesPanel::LoginRequired;
            }
            AppEvent::Notice(notice) => self.notices.push_back(notice.clone()),
            // A late result must not resurrect the panel after sign-out.
            AppEvent::FavoritesLoaded(favorites) if self.state == SessionState::Authenticated => {
                self.favorites = FavoritesPanel::Loaded(favorites.clone());
            }
            AppEvent::FavoritesFailed(message) if self.state == SessionState::Authenticated => {
                self.favorites = FavoritesPanel::Failed(message.clone());
            }
            AppEvent::FavoritesLoaded(_) | AppEvent::FavoritesFailed(_) => {}
        }
    }

    fn set_state(&mut self, state: SessionState) {
        self.state = state;
        self.affordances = Affordances::for_state(state);
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn greeting(&self) -> Option<&str> {
        self.greeting.as_deref()
    }

    pub fn affordances(&self) -> Affordances {
        self.affordances
    }

    pub fn favorites(&self) -> &FavoritesPanel {
        &self.favorites
    }

    /// Takes the pending notifications, oldest first.
    pub fn drain_notices(&mut self) -> Vec<Notice> {
        self.notices.drain(..).collect()
    }
}
