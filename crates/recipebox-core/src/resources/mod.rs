//! Typed clients for the recipe and favorites endpoints.

mod favorites;
mod recipes;

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::http::ApiError;

pub use favorites::{FavoriteToggle, FavoritesClient};
pub use recipes::{PAGE_SIZE, RecipeQuery, RecipesClient};

/// Server-enumerated recipe category, e.g. `MAIN_COURSE`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Category(String);

impl Category {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Human form: `MAIN_COURSE` -> `Main Course`.
    pub fn display_name(&self) -> String {
        let lowered = self.0.replace('_', " ").to_lowercase();
        let mut out = String::with_capacity(lowered.len());
        let mut at_word_start = true;
        for ch in lowered.chars() {
            if at_word_start {
                out.extend(ch.to_uppercase());
            } else {
                out.push(ch);
            }
            at_word_start = !(ch.is_alphanumeric() || ch == '_');
        }
        out
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub author_username: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl Recipe {
    /// Creation date, when the server sent a parseable timestamp.
    pub fn created_date(&self) -> Option<NaiveDate> {
        let raw = self.created_at.as_deref()?;
        raw.parse::<NaiveDateTime>()
            .map(|at| at.date())
            .or_else(|_| raw.parse::<NaiveDate>())
            .ok()
    }
}

/// Favorites are listed in a reduced shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteRecipe {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub author_username: Option<String>,
}

/// Body of a create or update call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipeDraft {
    pub title: String,
    pub category: Category,
    pub description: String,
    pub instructions: String,
}

impl RecipeDraft {
    /// Builds a draft with every field trimmed.
    pub fn new(
        title: impl Into<String>,
        category: impl Into<String>,
        description: impl Into<String>,
        instructions: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into().trim().to_string(),
            category: Category::new(category),
            description: description.into().trim().to_string(),
            instructions: instructions.into().trim().to_string(),
        }
    }

    /// Starts an edit from an existing recipe.
    pub fn from_recipe(recipe: &Recipe) -> Self {
        Self::new(
            recipe.title.clone(),
            recipe.category.as_str(),
            recipe.description.clone().unwrap_or_default(),
            recipe.instructions.clone().unwrap_or_default(),
        )
    }

    /// Title and category are required.
    ///
    /// # Errors
    /// Returns [`ApiError::Invalid`] if either is blank.
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.title.is_empty() || self.category.is_empty() {
            return Err(ApiError::Invalid("Title & Category required".to_string()));
        }
        Ok(())
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Zero-based index of this page.
    pub number: u32,
    pub total_pages: u32,
}

impl<T> Page<T> {
    /// Highest valid page index (0 when the server reports no pages).
    pub fn last_page_index(&self) -> u32 {
        self.total_pages.max(1) - 1
    }

    pub fn label(&self) -> String {
        format!("Page {} of {}", self.number.saturating_add(1), self.total_pages.max(1))
    }
}

/// The server sends a page envelope; a bare array is taken as one page.
#[derive(Deserialize)]
#[serde(untagged)]
enum PageBody<T> {
    Envelope {
        content: Vec<T>,
        #[serde(default)]
        number: u32,
        #[serde(default, rename = "totalPages")]
        total_pages: u32,
    },
    Bare(Vec<T>),
}

impl<T> From<PageBody<T>> for Page<T> {
    fn from(body: PageBody<T>) -> Self {
        match body {
            PageBody::Envelope {
                content,
                number,
                total_pages,
            } => Page {
                items: content,
                number,
                total_pages,
            },
            PageBody::Bare(items) => Page {
                items,
                number: 0,
                total_pages: 1,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_display_name() {
        assert_eq!(Category::new("MAIN_COURSE").display_name(), "Main Course");
        assert_eq!(Category::new("BREAKFAST").display_name(), "Breakfast");
        assert_eq!(Category::new("").display_name(), "");
    }

    #[test]
    fn test_recipe_decodes_server_shape() {
        let recipe: Recipe = serde_json::from_value(serde_json::json!({
            "id": 7,
            "title": "Pancakes",
            "description": "Fluffy",
            "category": "BREAKFAST",
            "instructions": "Mix. Fry.",
            "authorUsername": "alice",
            "createdAt": "2025-03-14T09:26:53.589793"
        }))
        .unwrap();

        assert_eq!(recipe.category.as_str(), "BREAKFAST");
        assert_eq!(recipe.author_username.as_deref(), Some("alice"));
        assert_eq!(
            recipe.created_date(),
            NaiveDate::from_ymd_opt(2025, 3, 14)
        );
    }

    #[test]
    fn test_draft_is_trimmed_and_validated() {
        let draft = RecipeDraft::new("  Soup ", " DINNER ", " hot ", "");
        assert_eq!(draft.title, "Soup");
        assert_eq!(draft.category.as_str(), "DINNER");
        assert!(draft.validate().is_ok());
        assert_eq!(
            serde_json::to_value(&draft).unwrap(),
            serde_json::json!({
                "title": "Soup",
                "category": "DINNER",
                "description": "hot",
                "instructions": ""
            })
        );

        let err = RecipeDraft::new("Soup", "  ", "", "").validate().unwrap_err();
        assert_eq!(err.to_string(), "Title & Category required");
    }

    #[test]
    fn test_page_envelope_and_bare_array() {
        let page: Page<FavoriteRecipe> = serde_json::from_value::<PageBody<FavoriteRecipe>>(
            serde_json::json!({
                "content": [{"id": 1, "title": "A", "category": "DESSERT"}],
                "number": 1,
                "totalPages": 3
            }),
        )
        .unwrap()
        .into();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.last_page_index(), 2);
        assert_eq!(page.label(), "Page 2 of 3");

        let bare: Page<FavoriteRecipe> =
            serde_json::from_value::<PageBody<FavoriteRecipe>>(serde_json::json!([]))
                .unwrap()
                .into();
        assert_eq!(bare.number, 0);
        assert_eq!(bare.last_page_index(), 0);
    }

    #[test]
    fn test_label_with_extreme_page_number() {
        let page: Page<FavoriteRecipe> = Page {
            items: Vec::new(),
            number: u32::MAX,
            total_pages: 0,
        };
        assert_eq!(page.label(), format!("Page {} of 1", u32::MAX));
    }
}
