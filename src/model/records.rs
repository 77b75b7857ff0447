//! The typed records produced by the parsers and the KPI aggregation. These are plain values that
//! serialize to the JSON served by the API.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A month-indexed table of named metrics. Index `i` of every metric series refers to
/// `months[i]`, and no series is longer than `months`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ComparisonData {
    pub months: Vec<String>,
    pub metrics: BTreeMap<String, Vec<f64>>,
}

impl ComparisonData {
    /// The series for `metric`, or an empty slice when the metric was not found.
    pub fn metric(&self, metric: &str) -> &[f64] {
        self.metrics.get(metric).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// The month-by-month outstanding balance of each salesman, with the `TOTAL` and `MoM` rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct OutstandingComparison {
    pub months: Vec<String>,
    pub salesmen: BTreeMap<String, Vec<f64>>,
    pub totals: Vec<f64>,
    /// Month-over-month change labels exactly as shown in the sheet, e.g. `+4.2%`.
    pub mom_changes: Vec<String>,
}

/// One customer row of a monthly outstanding sheet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct OutstandingEntry {
    pub customer_code: String,
    pub customer_name: String,
    pub area: String,
    pub salesman: String,
    pub invoice_amount: f64,
    pub paid_amount: f64,
    pub balance: f64,
    pub days: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SalesmanSummary {
    pub salesman: String,
    pub total_outstanding: f64,
    pub customer_count: i64,
    pub average: f64,
}

/// A monthly outstanding sheet: the per-salesman summary block and the customer detail block.
///
/// `total_outstanding` and `total_customers` are read from the sheet's `TOTAL` row. They are not
/// recomputed, so they only match the summary rows if the sheet itself is consistent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct OutstandingSummary {
    pub month: String,
    pub salesman_summary: Vec<SalesmanSummary>,
    pub total_outstanding: f64,
    pub total_customers: i64,
    pub entries: Vec<OutstandingEntry>,
}

/// The lookup lists maintained on the Settings tab.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SettingsLists {
    pub banks: Vec<String>,
    pub salesmen: Vec<String>,
    pub areas: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DashboardKpis {
    pub latest_month: String,
    pub bank_balance: f64,
    pub total_outstanding: f64,
    pub advance_balance: f64,
    pub suspense_balance: f64,
    pub ytd_received: f64,
    pub ytd_payments: f64,
    pub net_cash_flow: f64,
    pub avg_outstanding: f64,
    pub months_tracked: usize,
    pub highest_bank_balance: f64,
    pub lowest_bank_balance: f64,
    pub avg_monthly_revenue: f64,
    pub outstanding_growth_rate: f64,
    pub cash_position: f64,
}

/// Whether a series ended higher than it started.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Up,
    /// Also used for flat and single-point series.
    #[default]
    Down,
}

serde_plain::derive_display_from_serialize!(Trend);
serde_plain::derive_fromstr_from_deserialize!(Trend);

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SalesmanReport {
    pub salesman: String,
    pub months: Vec<String>,
    pub values: Vec<f64>,
    pub total: f64,
    pub average: f64,
    pub trend: Trend,
}
