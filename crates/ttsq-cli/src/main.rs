//! CLI entry point - the composition root.
//!
//! Logging, environment and configuration are set up here; command
//! dispatch routes to handlers.

use clap::{CommandFactory, Parser};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use ttsq_cli::{Cli, Commands, handlers, settings};

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    // Events go to stdout as JSON lines, so logs go to stderr.
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact(),
        )
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables before parsing so TTSQ_CONFIG can come from .env
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    match command {
        Commands::Split { text } => handlers::split::execute(&text),
        Commands::Normalize { symbols, text } => handlers::normalize::execute(&symbols, &text)?,
        Commands::Speak(args) => {
            let config = settings::load(cli.config.as_deref())?;
            let config = settings::apply(config, &args.overrides())?;
            handlers::speak::execute(config, &args).await?;
        }
    }

    Ok(())
}
