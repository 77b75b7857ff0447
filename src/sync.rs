//! The `Coordinator` owns the authenticated session and the latest `Snapshot`.
//!
//! A sync fetches every range in turn while holding the session lock, so syncs never overlap.
//! The new snapshot is assembled off to the side and swapped in with a single write, so readers
//! see either the previous snapshot or the new one and never a mix.

use crate::api::{
    checked_fetch_range, fetch_range, sheet_infos, Authenticator, Prompt, Sheet,
};
use crate::model::{Grid, Outcome, OutstandingSummary, Snapshot};
use crate::parse::{
    monthly_detail_range, monthly_summary_range, parse_monthly_outstanding,
    parse_outstanding_comparison, parse_settings, ComparisonKind, OUTSTANDING_COMPARISON_RANGE,
    SETTINGS_RANGE,
};
use crate::{kpi, Result};
use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

type Session = Option<Box<dyn Sheet + Send>>;

pub struct Coordinator {
    authenticator: Box<dyn Authenticator>,
    session: Mutex<Session>,
    /// Mirrors `session.is_some()` so that status checks do not wait for a running sync.
    authenticated: AtomicBool,
    snapshot: RwLock<Arc<Snapshot>>,
}

/// The result of a successful sync.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SyncReport {
    pub success: bool,
    pub message: String,
    pub last_sync: Option<DateTime<Utc>>,
    pub sheets_loaded: usize,
    /// Why ranges came back empty, if any did.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AuthStatus {
    pub authenticated: bool,
    pub has_credentials: bool,
    pub has_token: bool,
    pub message: String,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SyncStatus {
    pub last_sync: Option<DateTime<Utc>>,
    pub authenticated: bool,
}

impl Coordinator {
    /// Creates a coordinator with no session and an empty snapshot.
    pub fn new(authenticator: Box<dyn Authenticator>) -> Self {
        Self {
            authenticator,
            session: Mutex::new(None),
            authenticated: AtomicBool::new(false),
            snapshot: RwLock::new(Arc::new(Snapshot::default())),
        }
    }

    /// Opens a new session, replacing the current one. On failure the current session is kept.
    pub async fn authenticate(&self, prompt: Prompt) -> Result<()> {
        let sheet = self.authenticator.authenticate(prompt).await?;
        *self.session.lock().await = Some(sheet);
        self.authenticated.store(true, Ordering::Release);
        info!("Authenticated with the workbook");
        Ok(())
    }

    /// `true` once a session has been opened.
    pub fn is_authenticated(&self) -> bool {
        self.authenticated.load(Ordering::Acquire)
    }

    pub async fn auth_status(&self) -> AuthStatus {
        let authenticated = self.is_authenticated();
        AuthStatus {
            authenticated,
            has_credentials: self.authenticator.has_credentials().await,
            has_token: self.authenticator.has_token().await,
            message: if authenticated {
                "Ready"
            } else {
                "Authentication required"
            }
            .to_string(),
        }
    }

    pub async fn sync_status(&self) -> SyncStatus {
        SyncStatus {
            last_sync: self.snapshot().await.last_sync,
            authenticated: self.is_authenticated(),
        }
    }

    /// The latest snapshot. It stays valid, and unchanged, even if a sync replaces it.
    pub async fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshot.read().await.clone()
    }

    /// Fetches and parses every range and replaces the snapshot.
    ///
    /// Opens a session first if there is none, without prompting. Ranges that cannot be fetched are
    /// treated as empty and reported in `warnings`.
    ///
    /// An authentication failure, whether opening the session or refreshing its token part way
    /// through, fails the sync and leaves the previous snapshot alone. A session whose token cannot
    /// be refreshed is dropped.
    pub async fn sync(&self) -> Result<SyncReport> {
        let mut session = self.session.lock().await;
        if session.is_none() {
            debug!("No session, authenticating before the sync");
            let sheet = self
                .authenticator
                .authenticate(Prompt::Never)
                .await
                .context("Authentication failed")?;
            *session = Some(sheet);
            self.authenticated.store(true, Ordering::Release);
        }

        let mut warnings = Vec::new();
        let snapshot = match build_snapshot(session.as_deref_mut(), &mut warnings).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                *session = None;
                self.authenticated.store(false, Ordering::Release);
                return Err(e).context("The session is no longer authenticated");
            }
        };
        drop(session);

        let report = SyncReport {
            success: true,
            message: "Data synchronized successfully".to_string(),
            last_sync: snapshot.last_sync,
            sheets_loaded: snapshot.sheets.len(),
            warnings,
        };
        *self.snapshot.write().await = Arc::new(snapshot);
        info!(
            "Synced {} sheets with {} warnings",
            report.sheets_loaded,
            report.warnings.len()
        );
        Ok(report)
    }

    /// Fetches and parses one `Outstanding_<MONTH>` tab. This is read live and is not part of the
    /// snapshot. A month without a tab gives an empty summary.
    pub async fn monthly_outstanding(&self, month: &str) -> OutstandingSummary {
        let mut session = self.session.lock().await;
        let summary = fetch_range(session.as_deref_mut(), &monthly_summary_range(month)).await;
        let detail = fetch_range(session.as_deref_mut(), &monthly_detail_range(month)).await;
        parse_monthly_outstanding(month, summary.value(), detail.value())
    }
}

async fn build_snapshot(
    mut sheet: Option<&mut (dyn Sheet + Send + 'static)>,
    warnings: &mut Vec<String>,
) -> Result<Snapshot> {
    let sheets = collect(sheet_infos(sheet.as_deref_mut()).await?, warnings);

    let banks = ComparisonKind::Banks.parse(
        &fetch_grid(sheet.as_deref_mut(), ComparisonKind::Banks.range(), warnings).await?,
    );
    let advances = ComparisonKind::Advances.parse(
        &fetch_grid(sheet.as_deref_mut(), ComparisonKind::Advances.range(), warnings).await?,
    );
    let suspense = ComparisonKind::Suspense.parse(
        &fetch_grid(sheet.as_deref_mut(), ComparisonKind::Suspense.range(), warnings).await?,
    );
    let outstanding = parse_outstanding_comparison(
        &fetch_grid(sheet.as_deref_mut(), OUTSTANDING_COMPARISON_RANGE, warnings).await?,
    );
    let settings =
        parse_settings(&fetch_grid(sheet.as_deref_mut(), SETTINGS_RANGE, warnings).await?);

    Ok(Snapshot {
        dashboard: kpi::dashboard(&banks, &advances, &suspense, &outstanding),
        sheets,
        banks,
        advances,
        suspense,
        outstanding,
        settings,
        last_sync: Some(Utc::now()),
    })
}

async fn fetch_grid(
    sheet: Option<&mut (dyn Sheet + Send + 'static)>,
    range: &str,
    warnings: &mut Vec<String>,
) -> Result<Grid> {
    Ok(collect(checked_fetch_range(sheet, range).await?, warnings))
}

/// Takes the value and keeps the reason, if the outcome was degraded.
fn collect<T>(outcome: Outcome<T>, warnings: &mut Vec<String>) -> T {
    if let Some(reason) = outcome.reason() {
        warnings.push(reason.to_string());
    }
    outcome.into_value()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{seed_workbook, TestAuthenticator, TestSheet};
    use crate::error::{error_type, ErrorType, IntoResult};
    use anyhow::anyhow;

    fn coordinator() -> Coordinator {
        Coordinator::new(Box::new(TestAuthenticator::default()))
    }

    /// Serves the seed workbook for a number of calls, then fails the way a session does when its
    /// token can no longer be refreshed.
    struct ExpiringSheet {
        inner: TestSheet,
        calls_left: usize,
    }

    impl ExpiringSheet {
        fn spend_call(&mut self) -> Result<()> {
            if self.calls_left == 0 {
                return Err(anyhow!("Failed to refresh the OAuth access token"))
                    .pub_result(ErrorType::Auth);
            }
            self.calls_left -= 1;
            Ok(())
        }
    }

    #[async_trait::async_trait]
    impl Sheet for ExpiringSheet {
        async fn titles(&mut self) -> Result<Vec<String>> {
            self.spend_call()?;
            self.inner.titles().await
        }

        async fn get(&mut self, range: &str) -> Result<Vec<Vec<String>>> {
            self.spend_call()?;
            self.inner.get(range).await
        }
    }

    struct ExpiringAuthenticator {
        calls: usize,
    }

    #[async_trait::async_trait]
    impl Authenticator for ExpiringAuthenticator {
        async fn authenticate(&self, _: Prompt) -> Result<Box<dyn Sheet + Send>> {
            Ok(Box::new(ExpiringSheet {
                inner: TestSheet::default(),
                calls_left: self.calls,
            }))
        }

        async fn has_credentials(&self) -> bool {
            true
        }

        async fn has_token(&self) -> bool {
            true
        }
    }

    #[tokio::test]
    async fn test_starts_empty() {
        let c = coordinator();
        assert!(!c.is_authenticated());
        assert_eq!(Snapshot::default(), *c.snapshot().await);
        let status = c.auth_status().await;
        assert!(!status.authenticated);
        assert!(status.has_credentials);
        assert_eq!("Authentication required", status.message);
        assert_eq!(None, c.sync_status().await.last_sync);
    }

    #[tokio::test]
    async fn test_authenticate() {
        let c = coordinator();
        c.authenticate(Prompt::Never).await.unwrap();
        assert!(c.is_authenticated());
        assert_eq!("Ready", c.auth_status().await.message);
    }

    #[tokio::test]
    async fn test_sync_seed_workbook() {
        let c = coordinator();
        let report = c.sync().await.unwrap();
        assert!(report.success);
        assert_eq!(8, report.sheets_loaded);
        assert!(report.warnings.is_empty(), "{:?}", report.warnings);
        assert!(report.last_sync.is_some());
        assert!(c.is_authenticated());

        let snapshot = c.snapshot().await;
        assert_eq!(report.last_sync, snapshot.last_sync);
        assert_eq!("MAR-2024", snapshot.dashboard.latest_month);
        assert_eq!(155_000.0, snapshot.dashboard.bank_balance);
        assert_eq!(100_000.0, snapshot.dashboard.total_outstanding);
        assert_eq!(8_000.0, snapshot.dashboard.advance_balance);
        assert_eq!(0.0, snapshot.dashboard.suspense_balance);
        assert_eq!(155_000.0, snapshot.dashboard.ytd_received);
        assert_eq!(3, snapshot.dashboard.months_tracked);
        assert_eq!(3, snapshot.outstanding.salesmen.len());
        assert_eq!(vec!["", "0.0%", "0.0%"], snapshot.outstanding.mom_changes);
        assert_eq!(
            vec!["Al Rajhi Bank", "Saudi National Bank", "Riyad Bank"],
            snapshot.settings.banks
        );
        assert_eq!(vec!["Ali", "Sara", "Omar"], snapshot.settings.salesmen);
        assert_eq!(&[12.9, 14.39], &snapshot.banks.metric("mom_percent")[1..]);
        assert_eq!(c.sync_status().await.last_sync, report.last_sync);
    }

    #[tokio::test]
    async fn test_sync_auth_failure_keeps_snapshot() {
        let c = Coordinator::new(Box::new(TestAuthenticator::rejecting()));
        let before = c.snapshot().await;
        let e = c.sync().await.unwrap_err();
        assert_eq!(ErrorType::Auth, error_type(&e));
        assert!(format!("{e:#}").contains("Authentication failed"));
        assert!(Arc::ptr_eq(&before, &c.snapshot().await));
        assert!(!c.is_authenticated());
    }

    #[tokio::test]
    async fn test_sync_missing_tab_degrades() {
        let mut data = seed_workbook();
        data.remove("Advances_Comparison");
        let c = Coordinator::new(Box::new(TestAuthenticator::new(data)));
        let report = c.sync().await.unwrap();
        assert!(report.success);
        assert_eq!(1, report.warnings.len());
        assert!(report.warnings[0].contains("Advances_Comparison!A3:Z10"));

        let snapshot = c.snapshot().await;
        assert_eq!(crate::model::ComparisonData::default(), snapshot.advances);
        assert_eq!(0.0, snapshot.dashboard.advance_balance);
        assert_eq!(155_000.0, snapshot.dashboard.bank_balance);
    }

    #[tokio::test]
    async fn test_old_snapshot_survives_sync() {
        let c = coordinator();
        c.sync().await.unwrap();
        let first = c.snapshot().await;
        c.sync().await.unwrap();
        let second = c.snapshot().await;
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(first.dashboard, second.dashboard);
    }

    #[tokio::test]
    async fn test_monthly_outstanding() {
        let c = coordinator();
        c.authenticate(Prompt::Never).await.unwrap();
        let jan = c.monthly_outstanding("JAN-2024").await;
        assert_eq!("JAN-2024", jan.month);
        assert_eq!(3, jan.salesman_summary.len());
        assert_eq!(100_000.0, jan.total_outstanding);
        assert_eq!(4, jan.total_customers);
        assert_eq!(4, jan.entries.len());
        assert_eq!("C004", jan.entries[3].customer_code);
        assert_eq!(15, jan.entries[3].days);
        let total: f64 = jan.entries.iter().map(|e| e.balance).sum();
        assert_eq!(jan.total_outstanding, total);

        let missing = c.monthly_outstanding("DEC-1999").await;
        assert!(missing.entries.is_empty());
        assert_eq!(0.0, missing.total_outstanding);
    }

    #[tokio::test]
    async fn test_refresh_failure_keeps_snapshot() {
        // One sync is one titles call and five range fetches.
        let c = Coordinator::new(Box::new(ExpiringAuthenticator { calls: 6 }));
        c.sync().await.unwrap();
        let first = c.snapshot().await;
        assert_eq!(155_000.0, first.dashboard.bank_balance);

        let e = c.sync().await.unwrap_err();
        assert_eq!(ErrorType::Auth, error_type(&e));
        assert!(format!("{e:#}").contains("Failed to refresh the OAuth access token"));
        assert!(Arc::ptr_eq(&first, &c.snapshot().await));
        assert!(!c.is_authenticated());
        assert_eq!(first.last_sync, c.sync_status().await.last_sync);

        // The expired session was dropped, so the next sync opens a new one.
        c.sync().await.unwrap();
        assert!(c.is_authenticated());
        assert_eq!(155_000.0, c.snapshot().await.dashboard.bank_balance);
    }
}
