use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use tokio::io::BufReader;

use devchat::ai::chat::DEFAULT_BASE_URL;
use devchat::ai::legacy::DEFAULT_LEGACY_URL;
use devchat::config::ModelType;
use devchat::repl::{self, parse_format, write_history, write_reply};
use devchat::{
    request, ApiProvider, ChatClient, ChatError, ChatSession, LegacyClient, Renderer, Settings,
    SettingsStore, TranscriptStore,
};

#[derive(Parser)]
#[command(name = "devchat")]
#[command(about = "Chat with a DevChat completion backend and export the conversation")]
struct Cli {
    /// Base URL of the chat backend
    #[arg(long, env = "DEVCHAT_API_URL", default_value = DEFAULT_BASE_URL, global = true)]
    base_url: String,
    /// Base URL of the legacy /ask backend
    #[arg(long, env = "DEVCHAT_LEGACY_URL", default_value = DEFAULT_LEGACY_URL, global = true)]
    legacy_url: String,
    /// Settings file (defaults to the platform config directory)
    #[arg(long, env = "DEVCHAT_SETTINGS", global = true)]
    settings: Option<PathBuf>,
    /// Transcript file (defaults to the platform data directory)
    #[arg(long, env = "DEVCHAT_TRANSCRIPT", global = true)]
    transcript: Option<PathBuf>,
    /// Request timeout in seconds
    #[arg(long, default_value = "30", global = true)]
    timeout: u64,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive chat (type /help for commands)
    Chat,
    /// Send one message and print the reply
    Send {
        /// Message text
        #[arg(required = true)]
        message: Vec<String>,
    },
    /// Ask the legacy backend directly (not recorded in the transcript)
    Ask {
        /// Message text
        #[arg(required = true)]
        message: Vec<String>,
        /// Upstream provider: openai, gemini or perplexity
        #[arg(short, long, default_value = "openai")]
        provider: String,
        /// Model (defaults to the provider's first model)
        #[arg(short, long)]
        model: Option<String>,
    },
    /// Clear the conversation here and on the backend
    Clear,
    /// Print the conversation
    History,
    /// Save the conversation to a file
    Export {
        /// json, md, txt, pdf or doc
        #[arg(short, long, default_value = "json")]
        format: String,
        /// Output directory
        #[arg(short, long, default_value = ".")]
        out: PathBuf,
    },
    /// Show or change settings
    Settings {
        #[command(subcommand)]
        action: Option<SettingsAction>,
    },
    /// List available models
    Models {
        /// Legacy provider to list models for
        #[arg(short, long)]
        provider: Option<String>,
    },
}

#[derive(Subcommand)]
enum SettingsAction {
    /// Print current settings
    Show,
    /// Change one setting, e.g. `set temperature 0.9`
    Set { key: String, value: String },
    /// Restore defaults
    Reset,
    /// Print the settings file location
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let timeout = Duration::from_secs(cli.timeout);

    let settings_store = match &cli.settings {
        Some(path) => SettingsStore::new(path),
        None => SettingsStore::default_location()?,
    };
    let transcript = match &cli.transcript {
        Some(path) => TranscriptStore::new(path),
        None => TranscriptStore::new(TranscriptStore::default_path()?),
    };
    let client = ChatClient::new(&cli.base_url).with_timeout(timeout);

    match cli.command {
        Commands::Chat => {
            let mut session = ChatSession::new(settings_store, client).with_transcript(transcript)?;
            let stdin = BufReader::new(tokio::io::stdin());
            repl::run_chat(&mut session, stdin, &mut std::io::stdout()).await?
        }
        Commands::Send { message } => {
            let mut session = ChatSession::new(settings_store, client).with_transcript(transcript)?;
            send_once(&mut session, &message.join(" ")).await?
        }
        Commands::Ask { message, provider, model } => {
            let legacy = LegacyClient::new(&cli.legacy_url).with_timeout(timeout);
            ask_legacy(&legacy, &settings_store.load_or_default(), &message.join(" "), &provider, model.as_deref()).await?
        }
        Commands::Clear => {
            let mut session = ChatSession::new(settings_store, client).with_transcript(transcript)?;
            session.clear_history().await.map_err(report)?;
            println!("Chat history cleared");
        }
        Commands::History => {
            let session = ChatSession::new(settings_store, client).with_transcript(transcript)?;
            write_history(&mut std::io::stdout(), &session, &Renderer::new())?;
        }
        Commands::Export { format, out } => {
            let session = ChatSession::new(settings_store, client).with_transcript(transcript)?;
            export_conversation(&session, &format, &out)?
        }
        Commands::Settings { action } => {
            let mut session = ChatSession::new(settings_store.clone(), client);
            manage_settings(&mut session, &settings_store, action.unwrap_or(SettingsAction::Show))?
        }
        Commands::Models { provider } => list_models(provider.as_deref())?,
    }

    Ok(())
}

/// Turn a chat error into what the user sees.
fn report(e: ChatError) -> anyhow::Error {
    anyhow!("{} ({})", e.user_message(), e)
}

async fn send_once(session: &mut ChatSession, message: &str) -> Result<()> {
    let reply = session.submit(message).await.map_err(report)?;
    write_reply(&mut std::io::stdout(), &reply, session.settings(), &Renderer::new())
}

async fn ask_legacy(
    client: &LegacyClient,
    settings: &Settings,
    message: &str,
    provider: &str,
    model: Option<&str>,
) -> Result<()> {
    let provider = ApiProvider::from_str(provider)
        .ok_or_else(|| anyhow!("Unknown provider {:?}. Choose openai, gemini or perplexity.", provider))?;
    let request = request::compose_legacy(message, settings, provider, model).map_err(report)?;

    let reply = client.ask(&request).await.map_err(report)?;
    let renderer = Renderer::new();
    println!("{}", renderer.render_body(&reply, settings));
    Ok(())
}

fn export_conversation(session: &ChatSession, format: &str, out: &Path) -> Result<()> {
    let format = parse_format(format)?;
    let path = session.export(format, out).map_err(report)?;
    println!("Chat exported successfully! {}", path.display());
    Ok(())
}

fn manage_settings(session: &mut ChatSession, store: &SettingsStore, action: SettingsAction) -> Result<()> {
    match action {
        SettingsAction::Show => println!("{}", serde_json::to_string_pretty(session.settings())?),
        SettingsAction::Set { key, value } => {
            let mut next = session.settings().clone();
            next.set(&key, &value)?;
            session.update_settings(next)?;
            println!("{} updated", key);
        }
        SettingsAction::Reset => {
            session.update_settings(Settings::default())?;
            println!("Settings restored to defaults");
        }
        SettingsAction::Path => println!("{}", store.path().display()),
    }
    Ok(())
}

fn list_models(provider: Option<&str>) -> Result<()> {
    match provider {
        None => {
            println!("Chat models:");
            for model in ModelType::all() {
                println!("  • {}", model.as_str());
            }
        }
        Some(name) => {
            let provider = ApiProvider::from_str(name)
                .ok_or_else(|| anyhow!("Unknown provider {:?}. Choose openai, gemini or perplexity.", name))?;
            println!("{} models:", provider.display_name());
            for model in provider.models() {
                println!("  • {}", model);
            }
        }
    }
    Ok(())
}
