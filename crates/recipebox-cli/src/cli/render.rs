//! Terminal presentation: drains the event bus into a [`ViewState`] and
//! prints notices and tables.

use comfy_table::{ContentArrangement, Table};
use recipebox_core::app::App;
use recipebox_core::events::{AppEvent, AppEventRx, NoticeLevel, SessionEvent, SignOutReason};
use recipebox_core::resources::{Category, FavoriteRecipe, Recipe};
use recipebox_core::view::ViewState;
use tokio::sync::broadcast::error::TryRecvError;

pub struct ViewRenderer {
    rx: AppEventRx,
    view: ViewState,
}

impl ViewRenderer {
    /// Subscribes before any command runs so no event is missed.
    pub fn attach(app: &App) -> Self {
        Self {
            rx: app.subscribe(),
            view: ViewState::from_session(&app.session().session()),
        }
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    /// Applies every pending event to the view.
    pub fn sync(&mut self) {
        loop {
            let event = match self.rx.try_recv() {
                Ok(event) => event,
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "presentation fell behind the event bus");
                    continue;
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            };
            if let AppEvent::Session(SessionEvent::SignedOut {
                reason: SignOutReason::RefreshFailed,
            }) = event.as_ref()
            {
                eprintln!("! Session expired. Please log in again.");
            }
            self.view.apply(&event);
        }
    }

    /// Syncs, then prints queued notices.
    pub fn flush(&mut self) {
        self.sync();
        for notice in self.view.drain_notices() {
            match notice.level {
                NoticeLevel::Success => println!("✓ {}", notice.message),
                NoticeLevel::Warning => eprintln!("! {}", notice.message),
                NoticeLevel::Error => eprintln!("✗ {}", notice.message),
            }
        }
    }
}

fn table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(header);
    table
}

fn preview(text: Option<&str>, max_chars: usize) -> String {
    let text = text.unwrap_or_default();
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{cut}…")
}

pub fn recipes_table(recipes: &[Recipe]) -> Table {
    let mut table = table(&["ID", "Title", "Category", "Author", "Description"]);
    for recipe in recipes {
        table.add_row(vec![
            recipe.id.to_string(),
            recipe.title.clone(),
            recipe.category.display_name(),
            recipe.author_username.clone().unwrap_or_default(),
            preview(recipe.description.as_deref(), 100),
        ]);
    }
    table
}

pub fn favorites_table(favorites: &[FavoriteRecipe]) -> Table {
    let mut table = table(&["ID", "Title", "Category", "Author"]);
    for favorite in favorites {
        table.add_row(vec![
            favorite.id.to_string(),
            favorite.title.clone(),
            favorite.category.display_name(),
            favorite.author_username.clone().unwrap_or_default(),
        ]);
    }
    table
}

pub fn categories_table(categories: &[Category]) -> Table {
    let mut table = table(&["Category", "Name"]);
    for category in categories {
        table.add_row(vec![category.as_str().to_string(), category.display_name()]);
    }
    table
}

pub fn recipe_detail(recipe: &Recipe) -> String {
    let mut out = format!("{} (#{})\n", recipe.title, recipe.id);
    out.push_str(&format!("Category: {}\n", recipe.category.display_name()));
    if let Some(author) = &recipe.author_username {
        out.push_str(&format!("By: {author}\n"));
    }
    if let Some(date) = recipe.created_date() {
        out.push_str(&format!("Created: {date}\n"));
    }
    out.push_str(&format!(
        "\nDescription:\n{}\n\nInstructions:\n{}",
        recipe.description.as_deref().unwrap_or_default(),
        recipe.instructions.as_deref().unwrap_or_default()
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        assert_eq!(preview(Some("short"), 10), "short");
        assert_eq!(preview(Some("crème brûlée"), 5), "crème…");
        assert_eq!(preview(None, 5), "");
    }

    #[test]
    fn test_recipe_detail_uses_display_category() {
        let recipe = Recipe {
            id: 3,
            title: "Soup".to_string(),
            description: None,
            category: Category::new("MAIN_COURSE"),
            instructions: Some("Boil".to_string()),
            author_username: Some("alice".to_string()),
            created_at: Some("2025-01-02T03:04:05".to_string()),
        };
        let detail = recipe_detail(&recipe);
        assert!(detail.contains("Category: Main Course"));
        assert!(detail.contains("By: alice"));
        assert!(detail.contains("Created: 2025-01-02"));
        assert!(detail.ends_with("Instructions:\nBoil"));
    }
}
