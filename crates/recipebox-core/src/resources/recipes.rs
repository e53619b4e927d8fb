use tracing::debug;

use super::{Category, Page, PageBody, Recipe, RecipeDraft};
use crate::http::{ApiError, ApiRequest, AuthenticatedFetch};

/// Fixed page size for recipe listings.
pub const PAGE_SIZE: u32 = 8;

/// Filter and page selection for [`RecipesClient::list`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeQuery {
    /// Title substring; matching and case policy are the server's.
    pub title: Option<String>,
    pub category: Option<Category>,
    /// Zero-based page index.
    pub page: u32,
}

impl RecipeQuery {
    fn to_request(&self) -> ApiRequest {
        let mut request = ApiRequest::get("/recipes")
            .query("page", self.page)
            .query("size", PAGE_SIZE);
        if let Some(title) = self.title.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            request = request.query("title", title);
        }
        if let Some(category) = self.category.as_ref().filter(|c| !c.is_empty()) {
            request = request.query("category", category);
        }
        request
    }
}

#[derive(Clone)]
pub struct RecipesClient {
    fetch: AuthenticatedFetch,
}

impl RecipesClient {
    pub fn new(fetch: AuthenticatedFetch) -> Self {
        Self { fetch }
    }

    /// Lists one page of recipes.
    ///
    /// # Errors
    /// Returns an error on a non-success status, transport failure or an
    /// unexpected body.
    pub async fn list(&self, query: &RecipeQuery) -> Result<Page<Recipe>, ApiError> {
        let response = self
            .fetch
            .fetch(&query.to_request())
            .await?
            .into_response()
            .error_for_status()?;
        let page: Page<Recipe> = response.json::<PageBody<Recipe>>()?.into();
        debug!(
            page = page.number,
            total_pages = page.total_pages,
            items = page.items.len(),
            "recipes listed"
        );
        Ok(page)
    }

    /// # Errors
    /// Returns [`ApiError::Status`] with 404 for an unknown id.
    pub async fn get(&self, id: i64) -> Result<Recipe, ApiError> {
        let response = self
            .fetch
            .fetch(&ApiRequest::get(format!("/recipes/{id}")))
            .await?
            .into_response()
            .error_for_status()?;
        Ok(response.json()?)
    }

    /// # Errors
    /// Returns [`ApiError::Invalid`] for an incomplete draft (no request is
    /// issued), otherwise any server or transport failure.
    pub async fn create(&self, draft: &RecipeDraft) -> Result<Recipe, ApiError> {
        draft.validate()?;
        let request = ApiRequest::post("/recipes").json(draft)?;
        let response = self
            .fetch
            .fetch(&request)
            .await?
            .into_response()
            .error_for_status()?;
        Ok(response.json()?)
    }

    /// # Errors
    /// Same as [`RecipesClient::create`]; a recipe owned by someone else
    /// comes back as a 403.
    pub async fn update(&self, id: i64, draft: &RecipeDraft) -> Result<Recipe, ApiError> {
        draft.validate()?;
        let request = ApiRequest::put(format!("/recipes/{id}")).json(draft)?;
        let response = self
            .fetch
            .fetch(&request)
            .await?
            .into_response()
            .error_for_status()?;
        Ok(response.json()?)
    }

    /// # Errors
    /// Returns an error on a non-success status or transport failure.
    pub async fn delete(&self, id: i64) -> Result<(), ApiError> {
        self.fetch
            .fetch(&ApiRequest::delete(format!("/recipes/{id}")))
            .await?
            .into_response()
            .error_for_status()?;
        Ok(())
    }

    /// Lists the categories the server accepts. Public endpoint.
    ///
    /// # Errors
    /// Returns an error on a non-success status or transport failure.
    pub async fn categories(&self) -> Result<Vec<Category>, ApiError> {
        let response = self
            .fetch
            .fetch_anonymous(&ApiRequest::get("/recipes/categories"))
            .await?
            .error_for_status()?;
        Ok(response.json()?)
    }
}
