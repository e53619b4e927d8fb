//! Search and page preferences persisted across runs.
//!
//! Never cleared by logout.

use crate::resources::{Category, RecipeQuery};
use crate::storage::{ClientStorage, StorageError};

pub const SEARCH_TITLE_KEY: &str = "rs_searchTitle";
pub const SEARCH_CATEGORY_KEY: &str = "rs_searchCategory";
pub const CURRENT_PAGE_KEY: &str = "rs_currentPage";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchPreferences {
    pub title: String,
    pub category: String,
    pub page: u32,
}

impl SearchPreferences {
    /// Reads the stored values. Missing entries are empty; an unreadable
    /// page index restarts at 0.
    pub fn load(storage: &dyn ClientStorage) -> Self {
        Self {
            title: storage.get(SEARCH_TITLE_KEY).unwrap_or_default(),
            category: storage.get(SEARCH_CATEGORY_KEY).unwrap_or_default(),
            page: storage
                .get(CURRENT_PAGE_KEY)
                .and_then(|raw| raw.trim().parse().ok())
                .unwrap_or(0),
        }
    }

    /// Writes all three values.
    ///
    /// # Errors
    /// Returns an error if any value cannot be persisted.
    pub fn save(&self, storage: &dyn ClientStorage) -> Result<(), StorageError> {
        storage.set(SEARCH_TITLE_KEY, &self.title)?;
        storage.set(SEARCH_CATEGORY_KEY, &self.category)?;
        storage.set(CURRENT_PAGE_KEY, &self.page.to_string())
    }

    /// Changing the filter goes back to the first page.
    pub fn set_title(&mut self, title: &str) {
        let title = title.trim();
        if self.title != title {
            self.title = title.to_string();
            self.page = 0;
        }
    }

    /// Changing the filter goes back to the first page. Empty means all
    /// categories.
    pub fn set_category(&mut self, category: &str) {
        let category = category.trim();
        if self.category != category {
            self.category = category.to_string();
            self.page = 0;
        }
    }

    /// Advances unless already on `last_page`. Returns whether it moved.
    pub fn next_page(&mut self, last_page: u32) -> bool {
        if self.page < last_page {
            self.page += 1;
            true
        } else {
            false
        }
    }

    /// Steps back unless on the first page. Returns whether it moved.
    pub fn prev_page(&mut self) -> bool {
        if self.page > 0 {
            self.page -= 1;
            true
        } else {
            false
        }
    }

    pub fn query(&self) -> RecipeQuery {
        RecipeQuery {
            title: Some(self.title.clone()).filter(|t| !t.is_empty()),
            category: Some(Category::new(self.category.as_str())).filter(|c| !c.is_empty()),
            page: self.page,
        }
    }
}
