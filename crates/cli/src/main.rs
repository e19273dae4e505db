//! Switchboard CLI entry point.
//!
//! Commands:
//! - `list`:            Show agents and their senders
//! - `create`:          Create an agent from flags or interactively
//! - `knowledge-agent`: Create a preset agent wired to the knowledge base
//! - `update`:          Change an agent's persona or model settings
//! - `delete`:          Delete a non-built-in agent
//! - `assign`:          Route a sender to an agent
//! - `unassign`:        Stop routing a sender to an agent
//! - `clear-history`:   Forget a sender's conversation with an agent
//! - `conversations`:   Summarize an agent's conversations
//! - `chat`:            Dispatch one message as a sender
//! - `cleanup`:         Delete history past the retention window
//! - `init`:            Write a default config file

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use switchboard_config::AppConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "switchboard",
    about = "Switchboard: route chat senders to persona agents",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// Config file (defaults to ~/.switchboard/config.toml)
    #[arg(short, long, global = true, env = "SWITCHBOARD_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List all agents with their assigned senders
    List,

    /// Create a new agent
    Create(commands::agents::CreateArgs),

    /// Create a knowledge-base agent with the query tool enabled
    KnowledgeAgent {
        /// Agent ID
        #[arg(long, default_value = switchboard_agent::personas::KNOWLEDGE_AGENT)]
        id: String,

        /// Display name
        #[arg(long, default_value = "Knowledge Assistant")]
        name: String,
    },

    /// Update an existing agent
    Update(commands::agents::UpdateArgs),

    /// Delete an agent
    Delete {
        agent_id: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Assign a sender to an agent
    Assign { sender: String, agent_id: String },

    /// Remove a sender from an agent
    Unassign { sender: String, agent_id: String },

    /// Clear the conversation history between a sender and an agent
    ClearHistory { sender: String, agent_id: String },

    /// Show all conversations for an agent
    Conversations { agent_id: String },

    /// Send one message through the router as if it came from `sender`
    Chat {
        sender: String,

        message: String,

        /// Sender display name
        #[arg(long, default_value = "CLI")]
        name: String,

        /// Recipient address; messages not for the router are ignored
        #[arg(long)]
        to: Option<String>,
    },

    /// Delete conversation history older than the retention window
    Cleanup {
        /// Override history.retention_days
        #[arg(long)]
        days: Option<u32>,
    },

    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    if cli.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }

    if let Commands::Init { force } = cli.command {
        return commands::maintenance::init(cli.config.as_deref(), force);
    }

    let config = AppConfig::load_with(cli.config.as_deref())
        .map_err(|e| format!("Failed to load config: {e}"))?;

    match cli.command {
        Commands::List => commands::agents::list(&config).await?,
        Commands::Create(args) => commands::agents::create(&config, args).await?,
        Commands::KnowledgeAgent { id, name } => {
            commands::agents::knowledge_agent(&config, id, name).await?
        }
        Commands::Update(args) => commands::agents::update(&config, args).await?,
        Commands::Delete { agent_id, yes } => commands::agents::delete(&config, &agent_id, yes).await?,
        Commands::Assign { sender, agent_id } => {
            commands::senders::assign(&config, &sender, &agent_id).await?
        }
        Commands::Unassign { sender, agent_id } => {
            commands::senders::unassign(&config, &sender, &agent_id).await?
        }
        Commands::ClearHistory { sender, agent_id } => {
            commands::senders::clear_history(&config, &sender, &agent_id).await?
        }
        Commands::Conversations { agent_id } => {
            commands::senders::conversations(&config, &agent_id).await?
        }
        Commands::Chat {
            sender,
            message,
            name,
            to,
        } => commands::chat::run(&config, &sender, &name, &message, to.as_deref()).await?,
        Commands::Cleanup { days } => commands::maintenance::cleanup(&config, days).await?,
        Commands::Init { .. } => {}
    }

    Ok(())
}
