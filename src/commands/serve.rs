use crate::api::{self, Mode, Prompt};
use crate::commands::Out;
use crate::server::{run_server, ServerConfig};
use crate::sync::Coordinator;
use crate::{Config, Result};
use std::sync::Arc;
use tracing::{info, warn};

/// Connects to the sheet, loads a first snapshot and serves the HTTP API until shutdown.
///
/// Failing to authenticate or sync at startup is not fatal: the server starts anyway and the
/// client can call `POST /api/auth/connect` and `POST /api/sync` later.
///
/// # Arguments
/// - `host`, `port` - Override the address from `config.json`.
pub async fn serve(
    config: Config,
    mode: Mode,
    host: Option<&str>,
    port: Option<u16>,
) -> Result<Out<()>> {
    let server_config = ServerConfig {
        host: host.unwrap_or(config.host()).to_string(),
        port: port.unwrap_or(config.port()),
    };
    let coordinator = Arc::new(Coordinator::new(api::authenticator(config, mode)));

    match coordinator.authenticate(Prompt::Never).await {
        Ok(()) => match coordinator.sync().await {
            Ok(report) => info!(
                "Initial sync loaded {} tabs with {} warnings",
                report.sheets_loaded,
                report.warnings.len()
            ),
            Err(e) => warn!("The initial sync failed: {e:#}"),
        },
        Err(e) => warn!(
            "Could not authenticate with Google Sheets, run 'finance-reports auth' or call \
            POST /api/auth/connect: {e:#}"
        ),
    }

    run_server(coordinator, server_config).await?;
    Ok("Server stopped".into())
}
