use clap::Parser;
use finance_reports::args::{Args, Command};
use finance_reports::{commands, Config, Mode, Result};
use std::process::ExitCode;
use tracing::{debug, error, trace};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let log_level = args.common().log_level();
    init_logger(log_level);
    debug!("Log level set to {}", log_level.to_string().to_lowercase());

    match main_inner(args).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Exiting with error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

pub async fn main_inner(args: Args) -> Result<()> {
    trace!("{args:?}");
    let home = args.common().home().path();

    // When FINANCE_REPORTS_TEST_MODE is set and non-empty the built-in workbook is used instead of
    // the Google APIs.
    let mode = Mode::from_env();

    match args.command() {
        Command::Init(init_args) => {
            commands::init(home, init_args.client_secret(), init_args.sheet_url())
                .await?
                .print()
        }

        Command::Auth(auth_args) => {
            let config = Config::load(home).await?;
            if auth_args.verify() {
                commands::auth_verify(config, mode).await?.print()
            } else {
                commands::auth(&config).await?.print()
            }
        }

        Command::Sync => {
            let config = Config::load(home).await?;
            commands::sync(config, mode).await?.print_json()?
        }

        Command::Serve(serve_args) => {
            let config = Config::load(home).await?;
            commands::serve(config, mode, serve_args.host(), serve_args.port())
                .await?
                .print()
        }
    }
    Ok(())
}

/// Initializes the tracing subscriber.
pub fn init_logger(level: LevelFilter) {
    let filter = match std::env::var("RUST_LOG").ok() {
        Some(_) => {
            // RUST_LOG exists; use it.
            EnvFilter::from_default_env()
        }
        None => {
            // RUST_LOG does not exist; use the log level for this crate and the HTTP trace layer.
            EnvFilter::new(format!(
                "{}={},{}={},tower_http={}",
                env!("CARGO_CRATE_NAME"),
                level,
                env!("CARGO_BIN_NAME"),
                level,
                level
            ))
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
