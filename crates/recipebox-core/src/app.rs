//! User-action facade.
//!
//! Wires storage, transport, session and resource clients together, and
//! turns every user action into exactly one success or error [`Notice`].

use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Context, Result};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::{Config, paths};
use crate::events::{AppEvent, AppEventRx, EventBus, Notice};
use crate::http::{ApiError, AuthenticatedFetch, CookieJar, FetchError, Transport};
use crate::preferences::SearchPreferences;
use crate::resources::{
    FavoriteRecipe, FavoriteToggle, FavoritesClient, Recipe, RecipeDraft, RecipesClient,
};
use crate::session::{AuthOutcome, Credentials, SessionController, SessionState};
use crate::storage::{ClientStorage, FileStorage, StorageError};

/// A user action failed and its error notice has already been published.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ActionFailed {
    pub message: String,
}

/// Notice text for a failed action: the server's message when it sent
/// one, otherwise `fallback`.
fn failure_text(err: &ApiError, fallback: &str) -> String {
    match err {
        ApiError::Status {
            message: Some(message),
            ..
        }
        | ApiError::Invalid(message) => message.clone(),
        _ => fallback.to_string(),
    }
}

pub struct App {
    storage: Arc<dyn ClientStorage>,
    events: EventBus,
    session: Arc<SessionController>,
    recipes: RecipesClient,
    favorites: FavoritesClient,
    /// Whether favorites were requested since the session last began.
    favorites_synced: Mutex<bool>,
}

impl App {
    /// Opens the app against `${RECIPEBOX_HOME}/storage.json`.
    ///
    /// # Errors
    /// Returns an error if the storage file is unreadable or the base URL
    /// is invalid.
    pub fn open(config: &Config) -> Result<Self> {
        let storage_path = paths::storage_path();
        let storage = FileStorage::open(&storage_path)
            .with_context(|| format!("Failed to open client storage {}", storage_path.display()))?;
        let base_url = config.resolve_base_url()?;
        debug!(base_url = %base_url, storage = %storage_path.display(), "opening app");
        Ok(Self::with_storage(&base_url, Arc::new(storage))?)
    }

    /// # Errors
    /// Returns an error if the base URL is malformed or the HTTP client
    /// cannot be built.
    pub fn with_storage(base_url: &str, storage: Arc<dyn ClientStorage>) -> Result<Self, FetchError> {
        let jar = Arc::new(CookieJar::load(Arc::clone(&storage)));
        let transport = Arc::new(Transport::new(base_url, jar)?);
        let events = EventBus::default();
        let session = Arc::new(SessionController::new(
            Arc::clone(&storage),
            Arc::clone(&transport),
            events.clone(),
        ));
        let fetch = AuthenticatedFetch::new(transport, Arc::clone(&session));
        // a restored session loads its favorites on demand
        let favorites_synced = Mutex::new(session.state() == SessionState::Authenticated);

        Ok(Self {
            storage,
            events,
            session,
            recipes: RecipesClient::new(fetch.clone()),
            favorites: FavoritesClient::new(fetch),
            favorites_synced,
        })
    }

    pub fn session(&self) -> &SessionController {
        &self.session
    }

    pub fn recipes(&self) -> &RecipesClient {
        &self.recipes
    }

    pub fn favorites(&self) -> &FavoritesClient {
        &self.favorites
    }

    pub fn subscribe(&self) -> AppEventRx {
        self.events.subscribe()
    }

    pub fn preferences(&self) -> SearchPreferences {
        SearchPreferences::load(self.storage.as_ref())
    }

    /// # Errors
    /// Returns an error if the preferences cannot be persisted.
    pub fn save_preferences(&self, preferences: &SearchPreferences) -> Result<(), StorageError> {
        preferences.save(self.storage.as_ref())
    }

    /// # Errors
    /// Returns [`ActionFailed`] after publishing the error notice.
    pub async fn login(&self, username: &str, password: &str) -> Result<AuthOutcome, ActionFailed> {
        let credentials = Credentials::new(username, password);
        match self.session.login(&credentials).await {
            Ok(outcome) => {
                let message = outcome.message.as_deref().unwrap_or("Logged in");
                self.events.notify(Notice::success(message));
                self.refresh_favorites().await;
                Ok(outcome)
            }
            Err(err) => Err(self.fail(&err, "Login failed")),
        }
    }

    /// # Errors
    /// Returns [`ActionFailed`] after publishing the error notice.
    pub async fn register(
        &self,
        username: &str,
        password: &str,
    ) -> Result<AuthOutcome, ActionFailed> {
        let credentials = Credentials::new(username, password);
        match self.session.register(&credentials).await {
            Ok(outcome) => {
                let message = outcome
                    .message
                    .as_deref()
                    .unwrap_or("Registered successfully");
                self.events.notify(Notice::success(message));
                if outcome.signed_in() {
                    self.refresh_favorites().await;
                }
                Ok(outcome)
            }
            Err(err) => Err(self.fail(&err, "Registration failed")),
        }
    }

    /// # Errors
    /// Returns [`ActionFailed`] only if the local token could not be
    /// cleared.
    pub async fn logout(&self) -> Result<(), ActionFailed> {
        match self.session.logout().await {
            Ok(()) => {
                self.events.notify(Notice::success("Logged out"));
                Ok(())
            }
            Err(err) => Err(self.fail(&ApiError::Storage(err), "Logout could not clear the session")),
        }
    }

    /// Creates a recipe, or updates `id` when given.
    ///
    /// # Errors
    /// Returns [`ActionFailed`] after publishing the error notice.
    pub async fn save_recipe(
        &self,
        id: Option<i64>,
        draft: &RecipeDraft,
    ) -> Result<Recipe, ActionFailed> {
        let result = match id {
            Some(id) => self.recipes.update(id, draft).await,
            None => self.recipes.create(draft).await,
        };
        match result {
            Ok(recipe) => {
                self.events.notify(Notice::success("Recipe saved"));
                Ok(recipe)
            }
            Err(err) => Err(self.fail(&err, "Save failed")),
        }
    }

    /// # Errors
    /// Returns [`ActionFailed`] after publishing the error notice.
    pub async fn delete_recipe(&self, id: i64) -> Result<(), ActionFailed> {
        match self.recipes.delete(id).await {
            Ok(()) => {
                self.events.notify(Notice::success("Recipe deleted"));
                Ok(())
            }
            Err(err) => Err(self.fail(&err, "Delete failed")),
        }
    }

    /// # Errors
    /// Returns [`ActionFailed`] after publishing the error notice.
    pub async fn toggle_favorite(&self, recipe_id: i64) -> Result<FavoriteToggle, ActionFailed> {
        match self.favorites.toggle(recipe_id).await {
            Ok(toggle) => {
                self.events.notify(Notice::success(match toggle {
                    FavoriteToggle::Added => "Added to favorites",
                    FavoriteToggle::Removed => "Removed from favorites",
                }));
                self.refresh_favorites().await;
                Ok(toggle)
            }
            Err(err) => Err(self.fail(&err, "Failed")),
        }
    }

    /// # Errors
    /// Returns [`ActionFailed`] after publishing the error notice.
    pub async fn add_favorite(&self, recipe_id: i64) -> Result<(), ActionFailed> {
        match self.favorites.add(recipe_id).await {
            Ok(()) => {
                self.events.notify(Notice::success("Added to favorites"));
                self.refresh_favorites().await;
                Ok(())
            }
            Err(err) => Err(self.fail(&err, "Failed")),
        }
    }

    /// # Errors
    /// Returns [`ActionFailed`] after publishing the error notice.
    pub async fn remove_favorite(&self, recipe_id: i64) -> Result<(), ActionFailed> {
        match self.favorites.remove(recipe_id).await {
            Ok(()) => {
                self.events.notify(Notice::success("Removed"));
                self.refresh_favorites().await;
                Ok(())
            }
            Err(err) => Err(self.fail(&err, "Remove failed")),
        }
    }

    /// Reloads the favorites panel. Does nothing while anonymous.
    pub async fn refresh_favorites(&self) -> Option<Vec<FavoriteRecipe>> {
        if self.session.state() == SessionState::Anonymous {
            return None;
        }
        *self.favorites_synced.lock().unwrap_or_else(PoisonError::into_inner) = true;
        match self.favorites.list().await {
            Ok(favorites) => {
                self.events
                    .publish(AppEvent::FavoritesLoaded(favorites.clone()));
                Some(favorites)
            }
            Err(err) => {
                warn!(error = %err, "failed to load favorites");
                self.events.publish(AppEvent::FavoritesFailed(err.to_string()));
                None
            }
        }
    }

    /// Loads favorites if a refresh signed the user in during an earlier
    /// request and nothing has loaded them since. Returns whether it did.
    pub async fn reconcile_favorites(&self) -> bool {
        let signed_in = self.session.state() == SessionState::Authenticated;
        let synced = {
            let mut synced = self.favorites_synced.lock().unwrap_or_else(PoisonError::into_inner);
            if !signed_in {
                *synced = false;
            }
            *synced
        };
        if !signed_in || synced {
            return false;
        }
        debug!("session resumed by refresh, reloading favorites");
        self.refresh_favorites().await;
        true
    }

    fn fail(&self, err: &ApiError, fallback: &str) -> ActionFailed {
        let message = failure_text(err, fallback);
        if matches!(err, ApiError::Invalid(_)) {
            self.events.notify(Notice::warning(message.clone()));
        } else {
            warn!(error = %err, "{fallback}");
            self.events.notify(Notice::error(message.clone()));
        }
        ActionFailed { message }
    }
}
