use anyhow::Result;
use clap::{Parser, Subcommand};
use colloquy_core::entity::EntityKind;

mod app;
mod commands;

#[derive(Parser)]
#[command(name = "colloquy")]
#[command(about = "Colloquy - chat sessions grounded in files, prompts and channels", long_about = None)]
struct Cli {
    /// Use this config file instead of the platform default
    #[arg(long, global = true)]
    config: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a message and wait for the assistant's reply
    Send {
        /// The message text
        text: String,
        /// Continue an existing session instead of starting a new one
        #[arg(long)]
        session: Option<String>,
        /// Select a file from the catalog (repeatable)
        #[arg(long = "file")]
        files: Vec<String>,
        /// Select a prompt from the catalog
        #[arg(long)]
        prompt: Option<String>,
        /// Select a channel from the catalog
        #[arg(long)]
        channel: Option<String>,
    },
    /// Inspect and manage stored sessions
    Sessions {
        #[command(subcommand)]
        action: SessionsAction,
    },
    /// Inspect and edit the file, prompt and channel catalog
    Catalog {
        #[command(subcommand)]
        action: CatalogAction,
    },
    /// Show or initialize the configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum SessionsAction {
    /// List sessions, most recently updated first
    List {
        /// Only show sessions whose title or last message contains this text
        #[arg(long)]
        query: Option<String>,
    },
    /// Print a session's messages
    Show {
        id: String,
        /// Print the session as JSON
        #[arg(long)]
        json: bool,
    },
    /// Give a session a new title
    Rename { id: String, title: String },
    /// Delete a session
    Delete { id: String },
}

#[derive(Subcommand)]
enum CatalogAction {
    /// List catalog entries, optionally of one kind
    List { kind: Option<EntityKind> },
    /// Register a file
    AddFile {
        id: String,
        name: String,
        #[arg(long, default_value = "")]
        file_type: String,
        #[arg(long, default_value_t = 0)]
        size: u64,
    },
    /// Register a prompt
    AddPrompt {
        id: String,
        name: String,
        #[arg(long, default_value = "general")]
        category: String,
    },
    /// Register a channel
    AddChannel { id: String, name: String },
    /// Remove an entry
    Remove { kind: EntityKind, id: String },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration and paths
    Show,
    /// Write a default config file if none exists
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let app = app::App::load(cli.config)?;
    app.init_tracing();

    match cli.command {
        Commands::Send {
            text,
            session,
            files,
            prompt,
            channel,
        } => {
            let selection = commands::send::Selection {
                session,
                files,
                prompt,
                channel,
            };
            commands::send::run(&app, &text, selection).await?
        }
        Commands::Sessions { action } => match action {
            SessionsAction::List { query } => {
                commands::sessions::list(&app, query.as_deref()).await?
            }
            SessionsAction::Show { id, json } => commands::sessions::show(&app, &id, json).await?,
            SessionsAction::Rename { id, title } => {
                commands::sessions::rename(&app, &id, &title).await?
            }
            SessionsAction::Delete { id } => commands::sessions::delete(&app, &id).await?,
        },
        Commands::Catalog { action } => match action {
            CatalogAction::List { kind } => commands::catalog::list(&app, kind)?,
            CatalogAction::AddFile {
                id,
                name,
                file_type,
                size,
            } => commands::catalog::add(
                &app,
                colloquy_core::entity::EntityMetadata::file(id, name, file_type, size),
            )?,
            CatalogAction::AddPrompt { id, name, category } => commands::catalog::add(
                &app,
                colloquy_core::entity::EntityMetadata::prompt(id, name, category),
            )?,
            CatalogAction::AddChannel { id, name } => commands::catalog::add(
                &app,
                colloquy_core::entity::EntityMetadata::channel(id, name),
            )?,
            CatalogAction::Remove { kind, id } => commands::catalog::remove(&app, kind, &id)?,
        },
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config::show(&app)?,
            ConfigAction::Init => commands::config::init(&app)?,
        },
    }

    Ok(())
}
