//! CLI entry and dispatch.

use anyhow::{Context, Result};
use clap::Parser;
use recipebox_core::{config, logging};

mod commands;
mod render;

#[derive(Parser)]
#[command(name = "recipebox")]
#[command(version)]
#[command(about = "Browse recipes and manage your favorites from the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Username and password, shared by login and register.
#[derive(clap::Args, Debug, Clone)]
struct CredentialArgs {
    /// Account username
    #[arg(short, long)]
    username: String,

    /// Account password (read from stdin when omitted)
    #[arg(long, env = "RECIPEBOX_PASSWORD", hide_env_values = true)]
    password: Option<String>,
}

/// Fields of a recipe form.
#[derive(clap::Args, Debug, Clone)]
struct RecipeFormArgs {
    /// Recipe title
    #[arg(long)]
    title: Option<String>,

    /// Category, e.g. BREAKFAST (see `recipebox recipes categories`)
    #[arg(long)]
    category: Option<String>,

    /// Short description
    #[arg(long)]
    description: Option<String>,

    /// Preparation steps
    #[arg(long)]
    instructions: Option<String>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Log in and start a session
    Login(CredentialArgs),
    /// Create an account
    Register(CredentialArgs),
    /// End the session (always clears local credentials)
    Logout,
    /// Show who is signed in
    Whoami,

    /// Browse and edit recipes
    Recipes {
        #[command(subcommand)]
        command: RecipeCommands,
    },
    /// Manage your favorites
    Favorites {
        #[command(subcommand)]
        command: FavoriteCommands,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Subcommand)]
enum RecipeCommands {
    /// List recipes (search and page are remembered between runs)
    List {
        /// Filter by title (empty string clears the filter)
        #[arg(long)]
        title: Option<String>,
        /// Filter by category (empty string clears the filter)
        #[arg(long)]
        category: Option<String>,
        /// Jump to a page (1-based)
        #[arg(long, conflicts_with_all = ["next", "prev"])]
        page: Option<u32>,
        /// Go to the next page
        #[arg(long, conflicts_with = "prev")]
        next: bool,
        /// Go to the previous page
        #[arg(long)]
        prev: bool,
    },
    /// Show a recipe
    Show {
        #[arg(value_name = "RECIPE_ID")]
        id: i64,
        /// Print the raw recipe as JSON
        #[arg(long)]
        json: bool,
    },
    /// Create a recipe
    Create(RecipeFormArgs),
    /// Update a recipe you own (unset fields keep their current value)
    Update {
        #[arg(value_name = "RECIPE_ID")]
        id: i64,
        #[command(flatten)]
        form: RecipeFormArgs,
    },
    /// Delete a recipe you own
    Delete {
        #[arg(value_name = "RECIPE_ID")]
        id: i64,
    },
    /// List available categories
    Categories,
}

#[derive(clap::Subcommand)]
enum FavoriteCommands {
    /// List your favorites
    List,
    /// Add a recipe to your favorites
    Add {
        #[arg(value_name = "RECIPE_ID")]
        id: i64,
    },
    /// Remove a recipe from your favorites
    Remove {
        #[arg(value_name = "RECIPE_ID")]
        id: i64,
    },
    /// Add the recipe if missing, remove it otherwise
    Toggle {
        #[arg(value_name = "RECIPE_ID")]
        id: i64,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    // config commands must work even with a broken config file
    if let Commands::Config { command } = &cli.command {
        return match command {
            ConfigCommands::Path => {
                commands::config::path();
                Ok(())
            }
            ConfigCommands::Init => commands::config::init(),
        };
    }

    let config = config::Config::load().context("load config")?;
    let _log_guard = logging::init(&config).context("init logging")?;

    // one tokio runtime for everything
    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;

    rt.block_on(async move { dispatch(cli, &config).await })
}

async fn dispatch(cli: Cli, config: &config::Config) -> Result<()> {
    let app = recipebox_core::app::App::open(config).context("open recipebox")?;
    let mut view = render::ViewRenderer::attach(&app);

    let result = match cli.command {
        Commands::Login(args) => {
            let password = commands::auth::read_password(args.password)?;
            commands::auth::login(&app, &args.username, &password).await
        }
        Commands::Register(args) => {
            let password = commands::auth::read_password(args.password)?;
            commands::auth::register(&app, &args.username, &password).await
        }
        Commands::Logout => commands::auth::logout(&app).await,
        Commands::Whoami => {
            commands::auth::whoami(&view);
            Ok(())
        }

        Commands::Recipes { command } => match command {
            RecipeCommands::List {
                title,
                category,
                page,
                next,
                prev,
            } => {
                let paging = match (page, next, prev) {
                    (Some(page), _, _) => commands::recipes::Paging::Jump(page),
                    (None, true, _) => commands::recipes::Paging::Next,
                    (None, false, true) => commands::recipes::Paging::Prev,
                    (None, false, false) => commands::recipes::Paging::Stay,
                };
                commands::recipes::list(&app, title, category, paging).await
            }
            RecipeCommands::Show { id, json } => commands::recipes::show(&app, id, json).await,
            RecipeCommands::Create(form) => commands::recipes::create(&app, form.into()).await,
            RecipeCommands::Update { id, form } => {
                commands::recipes::update(&app, id, form.into()).await
            }
            RecipeCommands::Delete { id } => commands::recipes::delete(&app, id).await,
            RecipeCommands::Categories => commands::recipes::categories(&app).await,
        },

        Commands::Favorites { command } => match command {
            FavoriteCommands::List => commands::favorites::list(&app, &mut view).await,
            FavoriteCommands::Add { id } => commands::favorites::add(&app, id).await,
            FavoriteCommands::Remove { id } => commands::favorites::remove(&app, id).await,
            FavoriteCommands::Toggle { id } => commands::favorites::toggle(&app, id).await,
        },

        Commands::Config { .. } => unreachable!("handled before the runtime starts"),
    };

    app.reconcile_favorites().await;
    view.flush();
    result
}

impl From<RecipeFormArgs> for commands::recipes::RecipeForm {
    fn from(args: RecipeFormArgs) -> Self {
        Self {
            title: args.title,
            category: args.category,
            description: args.description,
            instructions: args.instructions,
        }
    }
}
