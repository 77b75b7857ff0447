//! The month-by-metric comparison tabs: `Banks_Comparison`, `Advances_Comparison` and
//! `Suspense_Comparison`.
//!
//! Row 0 holds the month labels from column 1 onward. Each later row is one metric, identified only
//! by its position, with its label in column 0.

use crate::model::{ComparisonData, Grid};
use crate::parse::rows::Row;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The comparison tabs that share the month-by-metric layout.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonKind {
    Banks,
    Advances,
    Suspense,
}

serde_plain::derive_display_from_serialize!(ComparisonKind);
serde_plain::derive_fromstr_from_deserialize!(ComparisonKind);

const BANK_METRICS: &[&str] = &[
    "opening_balance",
    "total_received",
    "bank_charges",
    "total_payments",
    "closing_balance",
    "net_cash_flow",
    "mom_percent",
];

const ADVANCE_METRICS: &[&str] = &[
    "opening_balance",
    "advances_given",
    "advances_settled",
    "closing_balance",
];

const SUSPENSE_METRICS: &[&str] = &[
    "opening_balance",
    "total_debits",
    "total_credits",
    "closing_balance",
];

impl ComparisonKind {
    pub const ALL: [ComparisonKind; 3] = [Self::Banks, Self::Advances, Self::Suspense];

    /// The metric names in the order their rows appear below the header.
    pub fn metric_names(self) -> &'static [&'static str] {
        match self {
            ComparisonKind::Banks => BANK_METRICS,
            ComparisonKind::Advances => ADVANCE_METRICS,
            ComparisonKind::Suspense => SUSPENSE_METRICS,
        }
    }

    /// The A1 range that holds the header row and the metric rows.
    pub fn range(self) -> &'static str {
        match self {
            ComparisonKind::Banks => "Banks_Comparison!A3:Z20",
            ComparisonKind::Advances => "Advances_Comparison!A3:Z10",
            ComparisonKind::Suspense => "Suspense_Comparison!A3:Z10",
        }
    }

    pub fn parse(self, grid: &Grid) -> ComparisonData {
        parse_comparison(grid, self.metric_names())
    }
}

/// Parses a comparison grid.
///
/// - Months are the non-blank header cells from column 1 onward.
/// - Row `i` (1-based) becomes `metric_names[i - 1]`. Rows past the end of `metric_names` are
///   ignored.
/// - A row with at most one cell is skipped, but still uses up its metric name.
/// - Each series holds at most `months.len()` values. A short row gives a shorter series.
pub fn parse_comparison(grid: &Grid, metric_names: &[&str]) -> ComparisonData {
    let Some(header) = grid.first() else {
        return ComparisonData::default();
    };
    let months: Vec<String> = header
        .iter()
        .skip(1)
        .filter(|cell| !cell.is_blank())
        .map(ToString::to_string)
        .collect();

    let mut metrics = BTreeMap::new();
    for (name, cells) in metric_names.iter().zip(grid.iter().skip(1)) {
        if cells.len() <= 1 {
            continue;
        }
        let values = Row::new(cells).numbers(1, months.len());
        metrics.insert(name.to_string(), values);
    }

    ComparisonData { months, metrics }
}

/// The last value of a metric, or `0.0` when the series is empty.
pub(crate) fn last_value(data: &ComparisonData, metric: &str) -> f64 {
    data.metric(metric).last().copied().unwrap_or_default()
}
