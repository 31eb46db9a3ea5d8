use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::info;

use politely::config::Config;
use politely::moderation::ModerationPipeline;

/// Politely: a chat relay that rephrases toxic messages before the
/// receiver sees them.
#[derive(Parser)]
#[command(name = "politely", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP + WebSocket relay
    #[cfg(feature = "web")]
    Serve {
        /// Port to listen on (overrides POLITELY_PORT)
        #[arg(long)]
        port: Option<u16>,

        /// Address to bind (overrides POLITELY_BIND)
        #[arg(long)]
        bind: Option<String>,
    },

    /// Moderate a single message and print the decision
    Moderate {
        /// The message text
        text: String,
    },

    /// Show the scorer, threshold and rephrase chain
    Providers,

    /// Download the ONNX toxicity model (~126 MB)
    DownloadModel,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    // Set up structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("politely=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        #[cfg(feature = "web")]
        Commands::Serve { port, bind } => {
            let mut config = Config::load()?;
            if let Some(port) = port {
                config.port = port;
            }
            if let Some(bind) = bind {
                config.bind = bind;
            }
            info!(
                threshold = config.threshold,
                scorer = config.scorer_backend.as_str(),
                "Starting relay"
            );
            politely::web::run_server(config).await?;
        }

        Commands::Moderate { text } => {
            let config = Config::load()?;
            let pipeline = ModerationPipeline::from_config(&config)?;
            let decision = pipeline.moderate(&text).await;
            politely::output::terminal::display_decision(&decision);
        }

        Commands::Providers => {
            let config = Config::load()?;
            politely::output::terminal::display_providers(
                &config,
                config.scorer_backend.as_str(),
            );
            if let Err(e) = config.require_scorer() {
                println!("\n{} {e}", "Warning:".yellow());
            }
        }

        Commands::DownloadModel => {
            let config = Config::load()?;
            let model_dir = &config.model_dir;

            println!("Downloading ONNX toxicity model...");
            println!("  Destination: {}", model_dir.display());

            politely::toxicity::download::download_model(model_dir).await?;

            println!("\n{}", "Model downloaded successfully.".bold());
            println!("Set POLITELY_SCORER=onnx to use it.");
        }
    }

    Ok(())
}
