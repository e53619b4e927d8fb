//! Auth command handlers.

use std::io::{self, BufRead, IsTerminal, Write};

use anyhow::{Context, Result};
use recipebox_core::app::App;

use crate::cli::render::ViewRenderer;

/// Uses `provided` when given, otherwise reads one line from stdin.
pub fn read_password(provided: Option<String>) -> Result<String> {
    if let Some(password) = provided {
        return Ok(password);
    }
    if io::stdin().is_terminal() {
        eprint!("Password: ");
        io::stderr().flush()?;
    }
    let mut input = String::new();
    io::stdin()
        .lock()
        .read_line(&mut input)
        .context("read password from stdin")?;
    Ok(input.trim_end_matches(['\r', '\n']).to_string())
}

pub async fn login(app: &App, username: &str, password: &str) -> Result<()> {
    app.login(username, password).await?;
    Ok(())
}

pub async fn register(app: &App, username: &str, password: &str) -> Result<()> {
    let outcome = app.register(username, password).await?;
    if !outcome.signed_in() {
        println!("Run `recipebox login --username {username}` to sign in.");
    }
    Ok(())
}

pub async fn logout(app: &App) -> Result<()> {
    app.logout().await?;
    Ok(())
}

pub fn whoami(renderer: &ViewRenderer) {
    match renderer.view().greeting() {
        Some(greeting) => println!("{greeting}"),
        None => println!("Not logged in."),
    }
}
