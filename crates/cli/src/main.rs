use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use arena_core::{SessionSnapshot, SessionStatus};
use clap::{Parser, Subcommand};
use server::agents::AgentFactory;
use server::config::{
    default_roster, AgentBackend, ServerConfig, API_KEY_ENV, CONFIG_DIR, DEFAULT_ROSTER_SIZE,
};
use server::state::AppState;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "arena")]
#[command(about = "Elimination show played by AI agents", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Overrides the port from the config file
    #[arg(short, long, global = true)]
    port: Option<u16>,

    /// Config file (default: .arena/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config to .arena/config.toml
    Init,
    /// Run the HTTP and WebSocket server
    Serve {
        /// Play every round to game over once a session is started
        #[arg(long)]
        auto_advance: bool,
    },
    /// Show the config and the sessions of a running server
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = match cli.config {
        Some(path) => path,
        None => ServerConfig::path(&std::env::current_dir()?),
    };

    match cli.command {
        Some(Commands::Init) => init_project(&config_path).await,
        Some(Commands::Serve { auto_advance }) => serve(&config_path, cli.port, auto_advance).await,
        Some(Commands::Status) => status(&config_path, cli.port).await,
        None => serve(&config_path, cli.port, false).await,
    }
}

async fn init_project(config_path: &Path) -> Result<()> {
    if config_path.exists() {
        println!("Arena already initialized at {}", config_path.display());
        return Ok(());
    }

    let config = ServerConfig {
        roster: default_roster(DEFAULT_ROSTER_SIZE),
        ..Default::default()
    };
    config
        .write(config_path)
        .await
        .context("Failed to write config")?;

    println!();
    println!("Initialized Arena at {}", config_path.display());
    println!();
    println!("Roster: {}", config.roster.join(", "));
    println!();
    println!("Next steps:");
    println!("  1. Edit the roster and rules in {}", config_path.display());
    println!(
        "  2. Set [agent] kind = \"openrouter\" and export {} for model-backed players",
        API_KEY_ENV
    );
    println!("  3. Run 'arena serve' to start the server");

    Ok(())
}

async fn serve(config_path: &Path, port: Option<u16>, auto_advance: bool) -> Result<()> {
    init_tracing();

    if !config_path.exists() {
        println!("No {} directory found.", CONFIG_DIR);
        println!("Run 'arena init' first, or using default configuration.");
        println!();
    }

    let mut config = ServerConfig::read(config_path).await;
    if let Some(port) = port {
        config.port = port;
    }
    config.auto_advance |= auto_advance;

    let agents = AgentFactory::from_env(&config.agent).context("Failed to set up agents")?;
    let port = config.port;

    println!();
    println!("Arena");
    println!("════════════════════════════════════════");
    println!();
    println!("  API Server:  http://localhost:{}", port);
    println!("  Swagger UI:  http://localhost:{}/swagger-ui", port);
    println!("  Agents:      {}", agents.kind());
    println!("  Roster:      {}", config.roster().join(", "));
    println!("  Auto-advance: {}", config.auto_advance);
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let state = AppState::new(config, agents);
    server::serve(state, port).await
}

async fn status(config_path: &Path, port: Option<u16>) -> Result<()> {
    if !config_path.exists() {
        println!("Not an Arena directory.");
        println!("Run 'arena init' to initialize.");
        return Ok(());
    }

    let config = ServerConfig::try_read(config_path)
        .await
        .with_context(|| format!("Failed to read {}", config_path.display()))?;
    let port = port.unwrap_or(config.port);

    let agents = match &config.agent {
        AgentBackend::Scripted => "scripted".to_string(),
        AgentBackend::OpenRouter { model, .. } => format!("openrouter ({})", model),
    };

    println!();
    println!("Config:  {}", config_path.display());
    println!("Roster:  {}", config.roster().join(", "));
    println!("Agents:  {}", agents);
    println!("Exit:    {:?}", config.game.exit_rule);
    println!();

    let url = format!("http://localhost:{}/api/sessions", port);
    let sessions: Vec<SessionSnapshot> = match reqwest::get(&url).await {
        Ok(response) => response
            .error_for_status()?
            .json()
            .await
            .context("Unexpected response from server")?,
        Err(e) => {
            tracing::debug!(error = %e, "Server not reachable");
            println!("Server is not running on port {}.", port);
            return Ok(());
        }
    };

    if sessions.is_empty() {
        println!("No sessions yet.");
    } else {
        println!("Sessions ({}):", sessions.len());
        for session in &sessions {
            let status_icon = match session.status {
                SessionStatus::Pending => "○",
                SessionStatus::Running => "◐",
                SessionStatus::Idle => "◑",
                SessionStatus::Completed => "●",
                SessionStatus::Failed => "✗",
            };
            println!(
                "  {} [{}] {} round {} ({} active, {} out)",
                status_icon,
                session.status.as_str(),
                session.id,
                session.round,
                session.active.len(),
                session.eliminated.len()
            );
            if !session.winners.is_empty() {
                let names: Vec<&str> = session.winners.iter().map(|p| p.name.as_str()).collect();
                println!("      winners: {}", names.join(", "));
            }
        }
    }

    println!();

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "arena=info,server=info,orchestrator=info,events=info,websocket=info,tower_http=info"
                    .into()
            }),
        )
        .init();
}
