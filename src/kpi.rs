//! Derived figures. Everything here is a pure function of already-parsed data, so a dashboard can
//! be recomputed at any time from a snapshot.

use crate::model::{ComparisonData, DashboardKpis, OutstandingComparison, SalesmanReport, Trend};
use crate::parse::comparison::last_value;

/// Shown as the latest month when the banks comparison has no months.
pub const NO_MONTH: &str = "N/A";

const CLOSING_BALANCE: &str = "closing_balance";
const TOTAL_RECEIVED: &str = "total_received";
const TOTAL_PAYMENTS: &str = "total_payments";

/// Combines the comparison tabs into the dashboard figures. Every "last", "max", "min" or "mean"
/// of an empty series is `0.0`.
pub fn dashboard(
    banks: &ComparisonData,
    advances: &ComparisonData,
    suspense: &ComparisonData,
    outstanding: &OutstandingComparison,
) -> DashboardKpis {
    let closing = banks.metric(CLOSING_BALANCE);
    let totals = outstanding.totals.as_slice();

    let bank_balance = last_value(banks, CLOSING_BALANCE);
    let total_outstanding = last(totals);
    let ytd_received: f64 = banks.metric(TOTAL_RECEIVED).iter().sum();
    let ytd_payments: f64 = banks.metric(TOTAL_PAYMENTS).iter().sum();
    let months_tracked = banks.months.len();

    DashboardKpis {
        latest_month: banks
            .months
            .last()
            .cloned()
            .unwrap_or_else(|| NO_MONTH.to_string()),
        bank_balance,
        total_outstanding,
        advance_balance: last_value(advances, CLOSING_BALANCE),
        suspense_balance: last_value(suspense, CLOSING_BALANCE),
        ytd_received,
        ytd_payments,
        net_cash_flow: ytd_received - ytd_payments,
        avg_outstanding: mean(totals),
        months_tracked,
        highest_bank_balance: closing.iter().copied().reduce(f64::max).unwrap_or_default(),
        lowest_bank_balance: closing.iter().copied().reduce(f64::min).unwrap_or_default(),
        avg_monthly_revenue: if months_tracked == 0 {
            0.0
        } else {
            ytd_received / months_tracked as f64
        },
        outstanding_growth_rate: growth_rate(totals),
        cash_position: bank_balance - total_outstanding,
    }
}

/// The percentage change from the first value to the last.
///
/// Returns `0.0` when the first value is zero (or the series is empty), so an undefined rate
/// cannot be told apart from no growth.
pub fn growth_rate(series: &[f64]) -> f64 {
    let first = series.first().copied().unwrap_or_default();
    if first == 0.0 {
        return 0.0;
    }
    (last(series) - first) / first * 100.0
}

/// The outstanding history of one salesman. An unknown name gives an empty series rather than an
/// error.
pub fn salesman_report(outstanding: &OutstandingComparison, name: &str) -> SalesmanReport {
    let values = outstanding.salesmen.get(name).cloned().unwrap_or_default();
    SalesmanReport {
        salesman: name.to_string(),
        months: outstanding.months.clone(),
        total: values.iter().sum(),
        average: mean(&values),
        trend: trend(&values),
        values,
    }
}

/// `Up` only when there are at least two points and the last is above the first. Flat, falling and
/// single-point series are all `Down`.
pub fn trend(series: &[f64]) -> Trend {
    match (series.first(), series.last()) {
        (Some(first), Some(last)) if series.len() > 1 && last > first => Trend::Up,
        _ => Trend::Down,
    }
}

fn last(series: &[f64]) -> f64 {
    series.last().copied().unwrap_or_default()
}

fn mean(series: &[f64]) -> f64 {
    if series.is_empty() {
        return 0.0;
    }
    series.iter().sum::<f64>() / series.len() as f64
}
