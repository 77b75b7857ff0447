use crate::api::{self, Mode};
use crate::commands::Out;
use crate::model::{DashboardKpis, Snapshot};
use crate::sync::Coordinator;
use crate::{Config, Result};
use tracing::{info, warn};

/// Performs one sync without prompting for consent and returns the resulting snapshot.
pub async fn sync(config: Config, mode: Mode) -> Result<Out<Snapshot>> {
    let coordinator = Coordinator::new(api::authenticator(config, mode));
    let report = coordinator.sync().await?;
    for warning in &report.warnings {
        warn!("{warning}");
    }

    let snapshot = coordinator.snapshot().await;
    log_summary(&snapshot.dashboard);
    Ok(Out::new(
        format!("{}, {} tabs found", report.message, report.sheets_loaded),
        Snapshot::clone(&snapshot),
    ))
}

fn log_summary(kpis: &DashboardKpis) {
    info!(
        "Latest month {} ({} months tracked)",
        kpis.latest_month, kpis.months_tracked
    );
    info!("  Bank balance:      {}", amount(kpis.bank_balance));
    info!("  Outstanding:       {}", amount(kpis.total_outstanding));
    info!("  Advances:          {}", amount(kpis.advance_balance));
    info!("  Suspense:          {}", amount(kpis.suspense_balance));
    info!("  Cash position:     {}", amount(kpis.cash_position));
    info!("  Net cash flow YTD: {}", amount(kpis.net_cash_flow));
    info!(
        "  Outstanding growth: {}%",
        format_num::format_num!(".2", kpis.outstanding_growth_rate)
    );
}

fn amount(value: f64) -> String {
    format_num::format_num!(",.2", value)
}
