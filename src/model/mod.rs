//! Types that represent the data model: raw cells, the typed records parsed out of them, and the
//! `Snapshot` that holds the result of a sync.
mod cell;
pub mod number;
mod outcome;
mod records;
mod sheet_info;

pub use cell::{grid_from_values, Cell, Grid};
pub(crate) use cell::cell_at;
pub use number::{parse_int, parse_number};
pub use outcome::Outcome;
pub use records::{
    ComparisonData, DashboardKpis, OutstandingComparison, OutstandingEntry, OutstandingSummary,
    SalesmanReport, SalesmanSummary, SettingsLists, Trend,
};
pub use sheet_info::SheetInfo;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Everything loaded by the most recent successful sync. A new `Snapshot` is built from scratch on
/// every sync and replaces the previous one as a whole.
///
/// The default is the snapshot of an empty workbook, so its dashboard is computed like any other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Snapshot {
    pub sheets: Vec<SheetInfo>,
    pub dashboard: DashboardKpis,
    pub banks: ComparisonData,
    pub advances: ComparisonData,
    pub suspense: ComparisonData,
    pub outstanding: OutstandingComparison,
    pub settings: SettingsLists,
    /// `None` until the first sync completes.
    pub last_sync: Option<DateTime<Utc>>,
}

impl Default for Snapshot {
    fn default() -> Self {
        let banks = ComparisonData::default();
        let advances = ComparisonData::default();
        let suspense = ComparisonData::default();
        let outstanding = OutstandingComparison::default();
        Self {
            sheets: Vec::new(),
            dashboard: crate::kpi::dashboard(&banks, &advances, &suspense, &outstanding),
            banks,
            advances,
            suspense,
            outstanding,
            settings: SettingsLists::default(),
            last_sync: None,
        }
    }
}
