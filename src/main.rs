//! AlooChat: chat assistant with a tool-using agent.
//!
//! Usage:
//!   aloochat init                 Write a default config
//!   aloochat ask "<message>"      One turn in a new (or given) chat
//!   aloochat chat                 Interactive session
//!   aloochat chats list           Saved conversations
//!   aloochat tools                Tool catalog and credential status

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;
use tracing::{debug, info};

use aloochat::agent::{Agent, AgentSettings};
use aloochat::config::{self, AlooConfig};
use aloochat::conversation::ChatService;
use aloochat::llm::GeminiClient;
use aloochat::render;
use aloochat::state::Database;
use aloochat::tools::{self, ToolRegistry};

const CONFIG_FILE: &str = "aloochat.toml";

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(name = "aloochat")]
#[command(version = "0.1.0")]
#[command(about = "Chat assistant with weather, GitHub, Wikipedia, Giphy and HTTP tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to aloochat home directory.
    #[arg(long, default_value = "~/.aloochat")]
    home: String,

    /// Log level (debug, info, warn, error). Overrides the config file.
    #[arg(long)]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a default config file into the home directory.
    Init {
        /// Overwrite an existing config.
        #[arg(long)]
        force: bool,
    },

    /// Send one message and print the reply.
    Ask {
        message: String,

        /// Continue an existing chat instead of starting a new one.
        #[arg(long)]
        chat: Option<String>,

        /// Print the reply as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Interactive chat session (/new starts a new chat, /exit quits).
    Chat {
        #[arg(long)]
        chat: Option<String>,
    },

    /// Manage saved chats.
    Chats {
        #[command(subcommand)]
        action: ChatsAction,
    },

    /// List the available tools and whether their credentials are set.
    Tools,
}

#[derive(Subcommand, Debug)]
enum ChatsAction {
    /// List chats, most recent first.
    List,
    /// Print a chat's messages.
    Show { id: String },
    /// Rename a chat.
    Rename { id: String, title: String },
    /// Delete a chat.
    Delete { id: String },
    /// Delete every chat.
    Clear,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let home_dir = PathBuf::from(shellexpand::tilde(&cli.home).into_owned());
    let config_path = home_dir.join(CONFIG_FILE);
    let cfg = config::load_config(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    // Logs go to stderr so replies on stdout stay clean.
    let level = cli.log_level.as_deref().unwrap_or(&cfg.log_level);
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Init { force } => cmd_init(&config_path, force),
        Commands::Ask {
            message,
            chat,
            json,
        } => cmd_ask(cfg, &message, chat, json).await,
        Commands::Chat { chat } => cmd_chat(cfg, chat).await,
        Commands::Chats { action } => cmd_chats(cfg, action),
        Commands::Tools => cmd_tools(&cfg),
    }
}

// ---------------------------------------------------------------------------
// Command implementations
// ---------------------------------------------------------------------------

fn cmd_init(config_path: &Path, force: bool) -> Result<()> {
    if config_path.exists() && !force {
        bail!(
            "Config already exists at {} (use --force to overwrite)",
            config_path.display()
        );
    }
    config::save_config(&AlooConfig::default(), config_path)?;
    println!(
        "{} Wrote {}",
        ">>>".green().bold(),
        config_path.display()
    );
    println!("    Set gemini_api_key (or GEMINI_API_KEY) before chatting.");
    Ok(())
}

async fn cmd_ask(cfg: AlooConfig, message: &str, chat: Option<String>, json: bool) -> Result<()> {
    let service = bootstrap(&cfg)?;
    let chat_id = match chat {
        Some(id) => id,
        None => service.start_chat().await?.id,
    };

    let response = service.send(&chat_id, message).await?;
    if json {
        let body = serde_json::json!({
            "chatId": chat_id,
            "text": response.text,
            "toolOutput": response.tool_output,
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
    } else {
        print!("{}", render::render_reply(&response));
    }
    Ok(())
}

async fn cmd_chat(cfg: AlooConfig, chat: Option<String>) -> Result<()> {
    let service = bootstrap(&cfg)?;
    let mut chat_id = match chat {
        Some(id) => id,
        None => service.start_chat().await?.id,
    };

    println!(
        "{} Chat {} ({} to start over, {} to quit)",
        ">>>".green().bold(),
        chat_id.dimmed(),
        "/new".bold(),
        "/exit".bold()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    loop {
        stdout.write_all(format!("{} ", "you>".green().bold()).as_bytes()).await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        match line.trim() {
            "" => continue,
            "/exit" | "/quit" => break,
            "/new" => {
                chat_id = service.start_chat().await?.id;
                println!("{} New chat {}", ">>>".green().bold(), chat_id.dimmed());
            }
            message => {
                let response = service.send(&chat_id, message).await?;
                print!("{}", render::render_reply(&response));
            }
        }
    }

    info!("Chat session ended");
    Ok(())
}

fn cmd_chats(cfg: AlooConfig, action: ChatsAction) -> Result<()> {
    let db = open_database(&cfg)?;
    let user = cfg.user_id.as_str();

    match action {
        ChatsAction::List => print!("{}", render::render_chat_list(&db.get_chats(user)?)),
        ChatsAction::Show { id } => match db.get_chat(&id, user)? {
            Some(chat) => print!("{}", render::render_chat(&chat)),
            None => bail!("Chat {} not found", id),
        },
        ChatsAction::Rename { id, title } => {
            let title = title.trim();
            if title.is_empty() {
                bail!("Title must not be empty");
            }
            if !db.update_chat_title(&id, user, title)? {
                bail!("Chat {} not found", id);
            }
            println!("Renamed {} to \"{}\"", id, title);
        }
        ChatsAction::Delete { id } => {
            if !db.delete_chat(&id, user)? {
                bail!("Chat {} not found", id);
            }
            println!("Deleted {}", id);
        }
        ChatsAction::Clear => {
            let removed = db.delete_all_chats(user)?;
            println!("Deleted {} chats", removed);
        }
    }
    Ok(())
}

fn cmd_tools(cfg: &AlooConfig) -> Result<()> {
    let registry = tools::default_registry(cfg, http_client(cfg)?)?;
    print!("{}", render::render_tool_catalog(&registry));
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn http_client(cfg: &AlooConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(cfg.user_agent.as_str())
        .timeout(Duration::from_secs(30))
        .build()
        .context("Failed to build HTTP client")
}

fn open_database(cfg: &AlooConfig) -> Result<Database> {
    let db_path = cfg.resolved_db_path();
    let db_path = Path::new(&db_path);
    Database::open(db_path)
        .with_context(|| format!("Failed to open database at {}", db_path.display()))
}

/// Wire config, store, model and tools into a chat service.
fn bootstrap(cfg: &AlooConfig) -> Result<ChatService> {
    if cfg.gemini_api_key.trim().is_empty() {
        eprintln!(
            "{} No Gemini API key configured; replies will fall back to an apology. \
             Set gemini_api_key or GEMINI_API_KEY.",
            "Warning:".yellow().bold()
        );
    }

    let http = http_client(cfg)?;
    let registry: ToolRegistry = tools::default_registry(cfg, http.clone())?;
    let llm = GeminiClient::new(http, &cfg.gemini_api_url, &cfg.gemini_api_key, &cfg.gemini_model);
    debug!("Using model {}", llm.model());

    let agent = Agent::new(
        Arc::new(llm),
        Arc::new(registry),
        AgentSettings::from_config(cfg),
    );
    let db = open_database(cfg)?;
    Ok(ChatService::new(
        Arc::new(Mutex::new(db)),
        Arc::new(agent),
        cfg.user_id.clone(),
    ))
}
