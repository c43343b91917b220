//! Glossa CLI - translate prompts and replay captured LLM streams

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use glossa::config::Config;
use glossa_cli::commands::{ConfigCommand, ModelsCommand, NormalizeCommand, TranslateCommand};
use glossa_cli::error::CliResult;
use glossa_cli::output::OutputFormat;

#[derive(Parser)]
#[command(name = "glossa")]
#[command(about = "Translate prompts to provider wire formats and normalize streamed replies")]
#[command(version)]
pub struct Cli {
    #[clap(long, short, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[clap(long, short = 'c', global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    #[clap(about = "Translate a prompt file into a provider wire payload")]
    Translate(TranslateCommand),

    #[clap(about = "Replay a captured raw response through the stream normalizer")]
    Normalize(NormalizeCommand),

    #[clap(about = "List known models and their dialect families")]
    Models(ModelsCommand),

    #[clap(about = "Show the resolved configuration")]
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> CliResult<()> {
    init_logging();

    let cli = Cli::parse();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Table
    };

    let config = Config::load(cli.config.as_deref())?;

    match &cli.command {
        Command::Translate(cmd) => cmd.execute(&config, format),
        Command::Normalize(cmd) => cmd.execute(format).await,
        Command::Models(cmd) => cmd.execute(&config, format),
        Command::Config(cmd) => cmd.execute(&config, format),
    }
}

fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,glossa=debug"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
