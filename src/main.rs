use anyhow::Result;
use clap::{Parser, Subcommand};
use ecospatial::transport::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    env!("ECOSPATIAL_VERSION_SUFFIX")
);

#[derive(Parser)]
#[command(name = "ecospatial")]
#[command(author, version = VERSION, about = "EcoSpatial - conversational climate data agent for Gyeonggi-do", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive conversation with the agent
    Chat,

    /// Send a single message and print the reply with the active layers
    Ask {
        /// The message to send
        message: String,

        /// Output format (text, json)
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Resolve a place name to its canonical location (no network)
    Resolve {
        /// Place name, e.g. "수원" or "경기도 성남시"
        place: String,
    },

    /// List the supported layer kinds
    Layers,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    // Initialize logging
    let filter = if args.verbose {
        "ecospatial=debug"
    } else {
        "ecospatial=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match args.command {
        Commands::Chat => cli::run_chat().await?,
        Commands::Ask { message, format } => cli::run_ask(&message, &format).await?,
        Commands::Resolve { place } => cli::run_resolve(&place)?,
        Commands::Layers => cli::run_layers()?,
    }

    Ok(())
}
