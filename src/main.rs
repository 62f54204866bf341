use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use newsdesk::cli::{run_command, Cli};
use newsdesk::config::Config;
use newsdesk::error::AppError;
use newsdesk::AppContext;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if let Some(app_error) = e.downcast_ref::<AppError>() {
                eprintln!("Error: {}", app_error.message());
                // A single message is already the summary line
                if let Some(fields) = app_error.fields() {
                    if fields.values().map(Vec::len).sum::<usize>() > 1 {
                        for (field, messages) in fields {
                            for message in messages {
                                eprintln!("  {}: {}", field, message);
                            }
                        }
                    }
                }
                ExitCode::from(app_error.code().exit_code() as u8)
            } else {
                eprintln!("Error: {:#}", e);
                ExitCode::FAILURE
            }
        }
    }
}

async fn run(cli: &Cli) -> Result<()> {
    // Load configuration; validated only once overrides are applied
    let mut config = Config::load(&cli.config)?;
    cli.apply_overrides(&mut config)?;

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level)),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::debug!("Starting newsdesk v{}", env!("CARGO_PKG_VERSION"));
    Config::log_source(&cli.config);

    let ctx = AppContext::new(config)?;
    let result = run_command(cli, &ctx).await;
    ctx.shutdown();
    result
}
