//! Recipe command handlers.

use anyhow::{Context, Result};
use recipebox_core::app::App;
use recipebox_core::resources::RecipeDraft;
use recipebox_core::session::SessionState;
use tracing::debug;

use crate::cli::render;

/// Page movement requested on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Paging {
    Stay,
    Next,
    Prev,
    /// 1-based page number as typed by the user.
    Jump(u32),
}

/// Recipe fields given on the command line; unset fields are `None`.
#[derive(Debug, Clone, Default)]
pub struct RecipeForm {
    pub title: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub instructions: Option<String>,
}

impl RecipeForm {
    fn into_draft(self, base: Option<RecipeDraft>) -> RecipeDraft {
        let base = base.unwrap_or_else(|| RecipeDraft::new("", "", "", ""));
        RecipeDraft::new(
            self.title.unwrap_or(base.title),
            self.category
                .unwrap_or_else(|| base.category.as_str().to_string()),
            self.description.unwrap_or(base.description),
            self.instructions.unwrap_or(base.instructions),
        )
    }
}

pub async fn list(
    app: &App,
    title: Option<String>,
    category: Option<String>,
    paging: Paging,
) -> Result<()> {
    let mut prefs = app.preferences();
    if let Some(title) = title {
        prefs.set_title(&title);
    }
    if let Some(category) = category {
        prefs.set_category(&category);
    }
    match paging {
        Paging::Prev => {
            prefs.prev_page();
        }
        Paging::Jump(page) => prefs.page = page.saturating_sub(1),
        Paging::Stay | Paging::Next => {}
    }

    debug!(page = prefs.page, title = %prefs.title, category = %prefs.category, "listing recipes");
    let mut page = app
        .recipes()
        .list(&prefs.query())
        .await
        .context("Load failed")?;

    if paging == Paging::Next {
        if prefs.next_page(page.last_page_index()) {
            page = app
                .recipes()
                .list(&prefs.query())
                .await
                .context("Load failed")?;
        } else {
            eprintln!("! Already on the last page.");
        }
    }

    app.save_preferences(&prefs)
        .context("save search preferences")?;

    if page.items.is_empty() {
        println!("No recipes");
    } else {
        println!("{}", render::recipes_table(&page.items));
    }
    println!("{}", page.label());
    Ok(())
}

pub async fn show(app: &App, id: i64, json: bool) -> Result<()> {
    let recipe = app
        .recipes()
        .get(id)
        .await
        .with_context(|| format!("Failed to load recipe {id}"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&recipe)?);
        return Ok(());
    }

    println!("{}", render::recipe_detail(&recipe));
    if app.session().state() == SessionState::Authenticated {
        // membership is informational; a failed lookup just hides the marker
        let favorite = app.favorites().is_favorite(id).await.unwrap_or(false);
        if favorite {
            println!("\n❤ In your favorites");
        }
    }
    Ok(())
}

pub async fn create(app: &App, form: RecipeForm) -> Result<()> {
    let recipe = app.save_recipe(None, &form.into_draft(None)).await?;
    println!("Created recipe #{}", recipe.id);
    Ok(())
}

pub async fn update(app: &App, id: i64, form: RecipeForm) -> Result<()> {
    let current = app
        .recipes()
        .get(id)
        .await
        .with_context(|| format!("Failed to load recipe {id}"))?;
    let draft = form.into_draft(Some(RecipeDraft::from_recipe(&current)));
    app.save_recipe(Some(id), &draft).await?;
    Ok(())
}

pub async fn delete(app: &App, id: i64) -> Result<()> {
    app.delete_recipe(id).await?;
    Ok(())
}

pub async fn categories(app: &App) -> Result<()> {
    let categories = app
        .recipes()
        .categories()
        .await
        .context("Failed to load categories")?;
    println!("{}", render::categories_table(&categories));
    Ok(())
}
