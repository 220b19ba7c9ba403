mod commands;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use commands::serve::ServeConfig;
use supportdesk::classify::{ClassifierConfig, DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL};
use supportdesk::db::Database;
use supportdesk::models::{SortKey, TicketFilter};

#[derive(Parser)]
#[command(name = "supportdesk")]
#[command(about = "Support ticket API with LLM-assisted triage")]
#[command(version)]
struct Cli {
    /// Path to the SQLite database
    #[arg(long, global = true, env = "SUPPORTDESK_DB", default_value = "tickets.db")]
    database: PathBuf,

    /// Log output format
    #[arg(long, global = true, env = "SUPPORTDESK_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Pretty,
    Json,
}

#[derive(Args)]
struct LlmArgs {
    /// Gemini API key. Without it classification always returns defaults
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    gemini_api_key: Option<String>,
    /// Gemini model name
    #[arg(long, env = "GEMINI_MODEL", default_value = DEFAULT_GEMINI_MODEL)]
    gemini_model: String,
    /// Gemini API base URL
    #[arg(long, env = "GEMINI_BASE_URL", default_value = DEFAULT_GEMINI_BASE_URL)]
    gemini_base_url: String,
    /// Request timeout for the LLM call, in seconds
    #[arg(long, env = "SUPPORTDESK_LLM_TIMEOUT_SECS", default_value_t = 30)]
    llm_timeout_secs: u64,
}

impl LlmArgs {
    fn into_config(self) -> ClassifierConfig {
        ClassifierConfig {
            api_key: self.gemini_api_key,
            model: self.gemini_model,
            base_url: self.gemini_base_url,
            timeout_secs: self.llm_timeout_secs,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve {
        /// Address to listen on
        #[arg(long, env = "SUPPORTDESK_BIND", default_value = "127.0.0.1:8000")]
        bind: SocketAddr,
        /// Bearer token granting admin access (repeatable or comma separated)
        #[arg(long = "admin-token", env = "SUPPORTDESK_ADMIN_TOKENS", value_delimiter = ',', hide_env_values = true)]
        admin_tokens: Vec<String>,
        #[command(flatten)]
        llm: LlmArgs,
    },

    /// List tickets, newest first
    List {
        /// Filter by status (open, in_progress, resolved, closed)
        #[arg(short, long)]
        status: Option<String>,
        /// Filter by category (billing, technical, account, general)
        #[arg(short, long)]
        category: Option<String>,
        /// Filter by priority (low, medium, high, critical)
        #[arg(short, long)]
        priority: Option<String>,
        /// Search title and description
        #[arg(long)]
        search: Option<String>,
        /// Sort fields, e.g. "-priority,title"
        #[arg(long)]
        ordering: Option<String>,
    },

    /// Show ticket details
    Show {
        /// Ticket ID
        id: i64,
    },

    /// Show ticket statistics
    Stats {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Classify a description once and print the suggestion
    Classify {
        /// Ticket description
        description: String,
        #[command(flatten)]
        llm: LlmArgs,
    },
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Pretty => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn get_db(path: &Path) -> Result<Database> {
    Database::open(path).with_context(|| format!("Failed to open database at {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    match cli.command {
        Commands::Serve {
            bind,
            admin_tokens,
            llm,
        } => {
            let db = get_db(&cli.database)?;
            let config = ServeConfig {
                bind,
                admin_tokens,
                classifier: llm.into_config(),
            };
            commands::serve::run(db, config).await
        }

        Commands::List {
            status,
            category,
            priority,
            search,
            ordering,
        } => {
            let db = get_db(&cli.database)?;
            let filter = TicketFilter {
                category: category.map(|c| c.parse()).transpose()?,
                priority: priority.map(|p| p.parse()).transpose()?,
                status: status.map(|s| s.parse()).transpose()?,
                search,
                ordering: ordering
                    .as_deref()
                    .map(SortKey::parse_list)
                    .unwrap_or_default(),
            };
            commands::list::run(&db, &filter)
        }

        Commands::Show { id } => {
            let db = get_db(&cli.database)?;
            commands::show::run(&db, id)
        }

        Commands::Stats { json } => {
            let db = get_db(&cli.database)?;
            commands::stats::run(&db, json)
        }

        Commands::Classify { description, llm } => {
            commands::classify::run(&llm.into_config(), &description).await
        }
    }
}
