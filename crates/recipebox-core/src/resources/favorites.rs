use tracing::debug;

use super::FavoriteRecipe;
use crate::http::{ApiError, ApiRequest, AuthenticatedFetch};

/// What [`FavoritesClient::toggle`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FavoriteToggle {
    Added,
    Removed,
}

/// The signed-in user's favorites. Every call needs a bearer token.
#[derive(Clone)]
pub struct FavoritesClient {
    fetch: AuthenticatedFetch,
}

impl FavoritesClient {
    pub fn new(fetch: AuthenticatedFetch) -> Self {
        Self { fetch }
    }

    /// # Errors
    /// Returns an error on a non-success status (401 once the session has
    /// ended), transport failure or an unexpected body.
    pub async fn list(&self) -> Result<Vec<FavoriteRecipe>, ApiError> {
        let response = self
            .fetch
            .fetch(&ApiRequest::get("/favorites"))
            .await?
            .into_response()
            .error_for_status()?;
        Ok(response.json()?)
    }

    /// # Errors
    /// Returns an error on a non-success status or transport failure.
    pub async fn add(&self, recipe_id: i64) -> Result<(), ApiError> {
        self.fetch
            .fetch(&ApiRequest::post(format!("/favorites/{recipe_id}")))
            .await?
            .into_response()
            .error_for_status()?;
        Ok(())
    }

    /// # Errors
    /// Returns an error on a non-success status or transport failure.
    pub async fn remove(&self, recipe_id: i64) -> Result<(), ApiError> {
        self.fetch
            .fetch(&ApiRequest::delete(format!("/favorites/{recipe_id}")))
            .await?
            .into_response()
            .error_for_status()?;
        Ok(())
    }

    /// # Errors
    /// Same as [`FavoritesClient::list`].
    pub async fn is_favorite(&self, recipe_id: i64) -> Result<bool, ApiError> {
        Ok(self.list().await?.iter().any(|f| f.id == recipe_id))
    }

    /// Removes `recipe_id` if it is already a favorite, adds it otherwise.
    ///
    /// # Errors
    /// Returns an error if the membership check or the change fails.
    pub async fn toggle(&self, recipe_id: i64) -> Result<FavoriteToggle, ApiError> {
        let toggle = if self.is_favorite(recipe_id).await? {
            self.remove(recipe_id).await?;
            FavoriteToggle::Removed
        } else {
            self.add(recipe_id).await?;
            FavoriteToggle::Added
        };
        debug!(recipe_id, ?toggle, "favorite toggled");
        Ok(toggle)
    }
}
