//! blend: query several LLM providers at once and blend their answers

mod commands;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use blend_core::settings::{Settings, Theme};
use blend_core::store::FileStore;
use blend_core::types::Provider;
use blend_sessions::SessionStore;

#[derive(Parser)]
#[command(name = "blend", version, about = "Query multiple LLM providers side by side and blend their answers", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override the data directory holding keys, settings, and sessions
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a prompt to the selected providers and print each answer
    Send {
        /// The prompt to send
        prompt: String,

        /// Providers to query (comma-separated); defaults to the
        /// session's previous selection, then to every provider with a
        /// stored API key
        #[arg(short, long, value_delimiter = ',')]
        providers: Vec<Provider>,

        /// Merge the successful answers into one via a second model call
        #[arg(short, long)]
        consolidate: bool,

        /// Provider whose model performs the consolidation
        /// (defaults to the first queried provider)
        #[arg(long, requires = "consolidate")]
        consolidator: Option<Provider>,

        /// Start a fresh conversation instead of continuing the active one
        #[arg(long)]
        new_session: bool,

        /// Let providers without a stored key fail individually instead
        /// of aborting the whole send
        #[arg(long)]
        allow_missing_keys: bool,
    },

    /// Manage conversation sessions
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },

    /// Manage API keys, models, and preferences
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum SessionAction {
    /// List all sessions, newest first
    List,

    /// Create a new session and make it active
    New,

    /// Print a session's transcript and cached results
    Show {
        /// Session id; defaults to the active session
        id: Option<String>,
    },

    /// Change a session's title
    Rename { id: String, title: String },

    /// Delete a session
    Delete { id: String },

    /// Write a session to conversation-<id>.json
    Export {
        id: String,
        /// Output directory; defaults to the current directory
        #[arg(short, long, default_value = ".")]
        out: PathBuf,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Store an API key for a provider
    SetKey { provider: Provider, key: String },

    /// Select the default model for a provider
    SetModel { provider: Provider, model: String },

    /// Set a custom model override (omit the model to clear it)
    SetCustomModel {
        provider: Provider,
        model: Option<String>,
    },

    /// Show configured providers and resolved models
    Show,

    /// Manage the consolidation prompt template
    Template {
        #[command(subcommand)]
        action: TemplateAction,
    },

    /// Show or set the theme
    Theme { theme: Option<Theme> },
}

#[derive(Subcommand)]
enum TemplateAction {
    /// Print the current template
    Show,
    /// Replace the template ({responses} marks where answers go)
    Set { template: String },
    /// Restore the built-in template
    Reset,
}

fn data_dir(cli: &Cli) -> Result<PathBuf> {
    if let Some(dir) = &cli.data_dir {
        return Ok(dir.clone());
    }
    let base = dirs::data_dir().context("Could not determine the user data directory")?;
    Ok(base.join("blendspeak").join("store"))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    let cli = Cli::parse();
    let store = Arc::new(FileStore::new(data_dir(&cli)?));
    let settings = Settings::new(store.clone());
    let sessions = SessionStore::new(store);

    match cli.command {
        Commands::Send {
            prompt,
            providers,
            consolidate,
            consolidator,
            new_session,
            allow_missing_keys,
        } => {
            commands::send(
                &settings,
                &sessions,
                commands::SendArgs {
                    prompt,
                    providers,
                    consolidate,
                    consolidator,
                    new_session,
                    allow_missing_keys,
                },
            )
            .await
        }
        Commands::Session { action } => match action {
            SessionAction::List => commands::session_list(&sessions),
            SessionAction::New => commands::session_new(&sessions),
            SessionAction::Show { id } => commands::session_show(&sessions, id.as_deref()),
            SessionAction::Rename { id, title } => {
                commands::session_rename(&sessions, &id, &title)
            }
            SessionAction::Delete { id } => commands::session_delete(&sessions, &id),
            SessionAction::Export { id, out } => commands::session_export(&sessions, &id, &out),
        },
        Commands::Config { action } => match action {
            ConfigAction::SetKey { provider, key } => {
                settings.set_api_key(provider, &key)?;
                println!("Stored {provider} API key");
                Ok(())
            }
            ConfigAction::SetModel { provider, model } => {
                settings.set_selected_model(provider, &model)?;
                println!("Selected model '{model}' for {provider}");
                Ok(())
            }
            ConfigAction::SetCustomModel { provider, model } => {
                let model = model.unwrap_or_default();
                settings.set_custom_model(provider, &model)?;
                if model.trim().is_empty() {
                    println!("Cleared custom model for {provider}");
                } else {
                    println!("Custom model '{}' set for {provider}", model.trim());
                }
                Ok(())
            }
            ConfigAction::Show => commands::config_show(&settings),
            ConfigAction::Template { action } => match action {
                TemplateAction::Show => {
                    println!("{}", settings.consolidation_template());
                    Ok(())
                }
                TemplateAction::Set { template } => {
                    settings.set_consolidation_template(&template)?;
                    println!("Consolidation template updated");
                    Ok(())
                }
                TemplateAction::Reset => {
                    settings.reset_consolidation_template()?;
                    println!("Consolidation template reset to default");
                    Ok(())
                }
            },
            ConfigAction::Theme { theme } => {
                match theme {
                    Some(theme) => {
                        settings.set_theme(theme)?;
                        println!("Theme set to {}", theme.as_str());
                    }
                    None => println!("{}", settings.theme().as_str()),
                }
                Ok(())
            }
        },
    }
}
