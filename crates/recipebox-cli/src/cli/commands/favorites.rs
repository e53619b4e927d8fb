//! Favorites command handlers.

use anyhow::{Result, bail};
use recipebox_core::app::App;
use recipebox_core::view::FavoritesPanel;

use crate::cli::render::{self, ViewRenderer};

pub async fn list(app: &App, renderer: &mut ViewRenderer) -> Result<()> {
    app.refresh_favorites().await;
    renderer.sync();

    match renderer.view().favorites() {
        FavoritesPanel::LoginRequired => println!("(login to view)"),
        FavoritesPanel::Loading => println!("(loading)"),
        FavoritesPanel::Loaded(favorites) if favorites.is_empty() => println!("(none)"),
        FavoritesPanel::Loaded(favorites) => println!("{}", render::favorites_table(favorites)),
        FavoritesPanel::Failed(message) => bail!("Failed to load favorites: {message}"),
    }
    Ok(())
}

pub async fn add(app: &App, id: i64) -> Result<()> {
    app.add_favorite(id).await?;
    Ok(())
}

pub async fn remove(app: &App, id: i64) -> Result<()> {
    app.remove_favorite(id).await?;
    Ok(())
}

pub async fn toggle(app: &App, id: i64) -> Result<()> {
    app.toggle_favorite(id).await?;
    Ok(())
}
