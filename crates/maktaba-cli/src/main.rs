#![deny(unsafe_code)]

//! Maktaba CLI — ask questions answered from the Maktaba Shamila library.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use maktaba_config::AppConfig;
use maktaba_core::secrets::load_env_secret;
use maktaba_core::{
    Accounts, Assistant, AuthError, ConversationStore, Credentials, History, MemoryUserStore,
    SessionIdentity, SqliteUserStore, UserStore,
};

const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Maktaba — Islamic Q&A grounded in the Maktaba Shamila library.
#[derive(Parser)]
#[command(name = "maktaba", version, about, long_about = None)]
struct Cli {
    /// Path to configuration file.
    #[arg(short, long, default_value = "maktaba.toml")]
    config: PathBuf,

    /// Increase log verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct CredentialArgs {
    #[arg(short, long)]
    username: String,

    #[arg(short, long, env = "MAKTABA_PASSWORD", hide_env_values = true)]
    password: String,
}

impl CredentialArgs {
    fn credentials(&self) -> Credentials {
        Credentials::new(self.username.clone(), self.password.as_str())
    }
}

/// Credentials for commands that fall back to a guest session.
#[derive(Args)]
struct OptionalCredentialArgs {
    #[arg(short, long, requires = "password")]
    username: Option<String>,

    #[arg(short, long, requires = "username")]
    password: Option<String>,

    /// Guest only: skip the user database and keep history in memory.
    #[arg(long, conflicts_with_all = ["username", "password"])]
    ephemeral: bool,
}

impl OptionalCredentialArgs {
    fn credentials(&self) -> Option<Credentials> {
        match (&self.username, &self.password) {
            (Some(username), Some(password)) => {
                Some(Credentials::new(username.clone(), password.as_str()))
            }
            _ => None,
        }
    }

    /// The user store for this session: in memory for `--ephemeral`
    /// guests, else the configured database.
    fn open_users(&self, config: &AppConfig) -> Result<Arc<dyn UserStore>> {
        if self.ephemeral {
            return Ok(Arc::new(MemoryUserStore::new()));
        }
        open_users(config)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account.
    Signup(CredentialArgs),

    /// Check credentials.
    Login(CredentialArgs),

    /// Ask a single question (as a guest unless credentials are given).
    Ask {
        #[command(flatten)]
        who: OptionalCredentialArgs,

        /// The question.
        #[arg(required = true, trailing_var_arg = true)]
        question: Vec<String>,
    },

    /// Start an interactive session.
    Chat {
        #[command(flatten)]
        who: OptionalCredentialArgs,
    },

    /// Print a user's stored conversation.
    History {
        #[command(flatten)]
        who: CredentialArgs,

        /// Print the stored JSON instead of labelled lines.
        #[arg(long)]
        json: bool,
    },

    /// Validate and display configuration.
    Config {
        /// Show the resolved configuration.
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let (config, from_file) = load_config(&cli.config).await?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(effective_level(&config.logging.level, cli.verbose))
        }))
        .with_writer(std::io::stderr)
        .init();

    if !from_file {
        info!(path = %cli.config.display(), "config file not found, using defaults");
    }

    match cli.command {
        Commands::Config { show } => cmd_config(&cli.config, &config, show),
        Commands::Signup(who) => {
            let users = open_users(&config)?;
            cmd_signup(&Accounts::new(users), &who.credentials()).await
        }
        Commands::Login(who) => {
            let users = open_users(&config)?;
            cmd_login(&Accounts::new(users), &who.credentials()).await
        }
        Commands::History { who, json } => {
            let users = open_users(&config)?;
            cmd_history(users, &who.credentials(), json).await
        }
        Commands::Ask { who, question } => {
            let assistant = build_assistant(&config).await?;
            let users = who.open_users(&config)?;
            cmd_ask(&assistant, users, who.credentials(), &question.join(" ")).await
        }
        Commands::Chat { who } => {
            let assistant = build_assistant(&config).await?;
            let users = who.open_users(&config)?;
            cmd_chat(&assistant, users, who.credentials()).await
        }
    }
}

async fn cmd_signup(accounts: &Accounts, credentials: &Credentials) -> Result<ExitCode> {
    match accounts.signup(credentials).await {
        Ok(()) => {
            println!("Account created. Please log in.");
            Ok(ExitCode::SUCCESS)
        }
        Err(AuthError::AlreadyExists) => {
            eprintln!("Username already exists.");
            Ok(ExitCode::FAILURE)
        }
        Err(AuthError::EmptyUsername) => {
            eprintln!("Username must not be empty.");
            Ok(ExitCode::FAILURE)
        }
        Err(AuthError::Store(e)) => Err(e).context("signup failed"),
    }
}

async fn cmd_login(accounts: &Accounts, credentials: &Credentials) -> Result<ExitCode> {
    match accounts.login(credentials).await? {
        Some(_) => {
            println!("Welcome back, {}!", credentials.username);
            Ok(ExitCode::SUCCESS)
        }
        None => {
            eprintln!("Invalid credentials.");
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn cmd_history(
    users: Arc<dyn UserStore>,
    credentials: &Credentials,
    json: bool,
) -> Result<ExitCode> {
    let Some(identity) = Accounts::new(users.clone()).login(credentials).await? else {
        eprintln!("Invalid credentials.");
        return Ok(ExitCode::FAILURE);
    };

    let history = ConversationStore::new(users).load(&identity).await?;
    if json {
        println!("{}", history.to_json()?);
    } else if history.is_empty() {
        println!("No conversation history yet.");
    } else {
        print_history(&history);
    }
    Ok(ExitCode::SUCCESS)
}

async fn cmd_ask(
    assistant: &Assistant,
    users: Arc<dyn UserStore>,
    credentials: Option<Credentials>,
    question: &str,
) -> Result<ExitCode> {
    let Some(identity) = resolve_identity(&users, credentials).await? else {
        eprintln!("Invalid credentials.");
        return Ok(ExitCode::FAILURE);
    };

    let store = ConversationStore::new(users);
    let reply = assistant
        .answer(&store, &identity, question)
        .await
        .context("could not answer the question")?;

    if let Some(notice) = reply.trimmed_notice() {
        eprintln!("{notice}");
    }
    println!("{reply}");
    Ok(ExitCode::SUCCESS)
}

async fn cmd_chat(
    assistant: &Assistant,
    users: Arc<dyn UserStore>,
    credentials: Option<Credentials>,
) -> Result<ExitCode> {
    let Some(identity) = resolve_identity(&users, credentials).await? else {
        eprintln!("Invalid credentials.");
        return Ok(ExitCode::FAILURE);
    };

    let store = ConversationStore::new(users);
    match identity.username() {
        Some(username) => {
            println!("Welcome back, {username}!");
            print_history(&store.load(&identity).await?);
        }
        None => println!("Guest session: history is discarded on exit."),
    }
    println!("Type a question, or /quit to leave.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if question == "/quit" || question == "/exit" {
            break;
        }

        match assistant.answer(&store, &identity, question).await {
            Ok(reply) => {
                if let Some(notice) = reply.trimmed_notice() {
                    println!("({notice})");
                }
                println!("Maktaba: {reply}");
            }
            Err(e) => {
                error!(error = %e, %identity, "question failed");
                eprintln!("Error: {e}");
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn cmd_config(config_path: &Path, config: &AppConfig, show: bool) -> Result<ExitCode> {
    if show {
        let toml_str = toml::to_string_pretty(config).context("failed to render config")?;
        println!("{toml_str}");
    } else {
        println!("Configuration at '{}' is valid.", config_path.display());
    }
    Ok(ExitCode::SUCCESS)
}

/// Log in if credentials were given; otherwise a guest. `None` means the
/// credentials were rejected.
async fn resolve_identity(
    users: &Arc<dyn UserStore>,
    credentials: Option<Credentials>,
) -> Result<Option<SessionIdentity>> {
    match credentials {
        Some(credentials) => Ok(Accounts::new(users.clone()).login(&credentials).await?),
        None => Ok(Some(SessionIdentity::Guest)),
    }
}

fn print_history(history: &History) {
    for turn in history {
        println!("You: {}", turn.question());
        println!("Maktaba: {}", turn.answer());
    }
}

/// Read the API key and build the assistant; fails before any question is
/// taken if the key is missing.
async fn build_assistant(config: &AppConfig) -> Result<Assistant> {
    let api_key = load_env_secret(&config.llm.api_key_env)
        .context("completion service API key is not configured")?;
    let assistant = Assistant::from_config(config, api_key).await?;
    info!(
        model = %config.llm.model,
        domain = %config.llm.include_domain,
        budget = %assistant.budget(),
        "assistant ready"
    );
    Ok(assistant)
}

fn open_users(config: &AppConfig) -> Result<Arc<dyn UserStore>> {
    let store = SqliteUserStore::open(&config.store.path).with_context(|| {
        format!(
            "failed to open user store at '{}'",
            config.store.path.display()
        )
    })?;
    Ok(Arc::new(store))
}

/// Load the config file, or defaults if it does not exist. The flag is
/// `true` when the file was read.
async fn load_config(path: &Path) -> Result<(AppConfig, bool)> {
    if tokio::fs::try_exists(path).await.unwrap_or(false) {
        let config = AppConfig::load(path)
            .await
            .with_context(|| format!("invalid config at '{}'", path.display()))?;
        Ok((config, true))
    } else {
        Ok((AppConfig::default(), false))
    }
}

/// The configured level raised by one step per `-v`, capped at `trace`.
fn effective_level(configured: &str, verbose: u8) -> &'static str {
    let base = LOG_LEVELS
        .iter()
        .position(|level| level.eq_ignore_ascii_case(configured))
        .unwrap_or(2);
    LOG_LEVELS[(base + verbose as usize).min(LOG_LEVELS.len() - 1)]
}
