//! The outstanding-balance tabs.
//!
//! `Outstanding_Comparison` lists one salesman per row with a balance per month, plus a `TOTAL`
//! row and a `MoM %` row. Each `Outstanding_<MONTH>` tab has a per-salesman summary block at the
//! top and the customer detail rows below it, ending at `GRAND TOTAL`.

use crate::model::{
    Grid, OutstandingComparison, OutstandingEntry, OutstandingSummary, SalesmanSummary,
};
use crate::parse::rows::{
    always, apply_rules, has_no_label, is_blank, is_grand_total, is_total, skip, stop, Flow, Row,
    RowRule,
};

pub const OUTSTANDING_COMPARISON_RANGE: &str = "Outstanding_Comparison!A3:Z50";

/// Labels that repeat the header and carry no data.
const SALESMAN_HEADER: &str = "Salesman";
const TREND_HEADER: &str = "Trend";

/// The first column that holds a month value on the comparison tab. Columns 0 and 1 are the
/// salesman name and a trend sparkline.
const FIRST_MONTH_COLUMN: usize = 2;

pub fn monthly_summary_range(month: &str) -> String {
    format!("Outstanding_{month}!A4:D20")
}

/// The detail range overlaps the summary block. The scan skips the first row and then relies on
/// the `GRAND TOTAL` sentinel to find the end.
pub fn monthly_detail_range(month: &str) -> String {
    format!("Outstanding_{month}!A19:H502")
}

struct ComparisonScan {
    width: usize,
    data: OutstandingComparison,
}

fn is_mom(row: &Row<'_>) -> bool {
    row.label().starts_with("MoM")
}

fn is_comparison_header(row: &Row<'_>) -> bool {
    let label = row.label();
    has_no_label(row) || label == SALESMAN_HEADER || label == TREND_HEADER
}

fn take_totals(scan: &mut ComparisonScan, row: &Row<'_>) -> Flow {
    scan.data.totals = row.numbers(FIRST_MONTH_COLUMN, scan.width);
    Flow::Next
}

fn take_mom(scan: &mut ComparisonScan, row: &Row<'_>) -> Flow {
    scan.data.mom_changes = row
        .span(FIRST_MONTH_COLUMN, scan.width)
        .map(ToString::to_string)
        .collect();
    Flow::Next
}

fn take_salesman(scan: &mut ComparisonScan, row: &Row<'_>) -> Flow {
    let values = row.numbers(FIRST_MONTH_COLUMN, scan.width);
    scan.data.salesmen.insert(row.label(), values);
    Flow::Next
}

const COMPARISON_RULES: &[RowRule<ComparisonScan>] = &[
    RowRule {
        name: "blank",
        when: is_blank,
        then: skip,
    },
    RowRule {
        name: "total",
        when: is_total,
        then: take_totals,
    },
    RowRule {
        name: "month over month",
        when: is_mom,
        then: take_mom,
    },
    RowRule {
        name: "header",
        when: is_comparison_header,
        then: skip,
    },
    RowRule {
        name: "salesman",
        when: always,
        then: take_salesman,
    },
];

/// Parses the `Outstanding_Comparison` grid. Months are the non-blank header cells from column 2
/// onward. A salesman that appears twice keeps the values of the later row.
pub fn parse_outstanding_comparison(grid: &Grid) -> OutstandingComparison {
    let Some((header, rows)) = grid.split_first() else {
        return OutstandingComparison::default();
    };
    let months: Vec<String> = header
        .iter()
        .skip(FIRST_MONTH_COLUMN)
        .filter(|cell| !cell.is_blank())
        .map(ToString::to_string)
        .collect();

    let mut scan = ComparisonScan {
        width: months.len(),
        data: OutstandingComparison {
            months,
            ..Default::default()
        },
    };
    apply_rules(rows, COMPARISON_RULES, &mut scan);
    scan.data
}

#[derive(Default)]
struct SummaryScan {
    rows: Vec<SalesmanSummary>,
    total_outstanding: f64,
    total_customers: i64,
}

fn is_summary_header(row: &Row<'_>) -> bool {
    has_no_label(row) || row.label() == SALESMAN_HEADER || is_grand_total(row)
}

fn take_summary_total(scan: &mut SummaryScan, row: &Row<'_>) -> Flow {
    scan.total_outstanding = row.number(1);
    scan.total_customers = row.int(2);
    Flow::Next
}

fn take_summary(scan: &mut SummaryScan, row: &Row<'_>) -> Flow {
    scan.rows.push(SalesmanSummary {
        salesman: row.label(),
        total_outstanding: row.number(1),
        customer_count: row.int(2),
        average: row.number(3),
    });
    Flow::Next
}

const SUMMARY_RULES: &[RowRule<SummaryScan>] = &[
    RowRule {
        name: "blank",
        when: is_blank,
        then: skip,
    },
    RowRule {
        name: "total",
        when: is_total,
        then: take_summary_total,
    },
    RowRule {
        name: "header",
        when: is_summary_header,
        then: skip,
    },
    RowRule {
        name: "salesman",
        when: always,
        then: take_summary,
    },
];

fn take_entry(entries: &mut Vec<OutstandingEntry>, row: &Row<'_>) -> Flow {
    entries.push(OutstandingEntry {
        // The code is kept exactly as typed, whitespace included.
        customer_code: row.text(0),
        customer_name: row.text(1),
        area: row.text(2),
        salesman: row.text(3),
        invoice_amount: row.number(4),
        paid_amount: row.number(5),
        balance: row.number(6),
        days: row.int(7),
    });
    Flow::Next
}

const DETAIL_RULES: &[RowRule<Vec<OutstandingEntry>>] = &[
    RowRule {
        name: "blank",
        when: is_blank,
        then: skip,
    },
    RowRule {
        name: "grand total",
        when: is_grand_total,
        then: stop,
    },
    RowRule {
        name: "customer",
        when: always,
        then: take_entry,
    },
];

/// Parses the two blocks of an `Outstanding_<MONTH>` tab.
///
/// The totals come from the summary block's `TOTAL` row as typed in the sheet. Detail rows are
/// read until the first `GRAND TOTAL`, even if more rows follow it.
pub fn parse_monthly_outstanding(
    month: impl Into<String>,
    summary_grid: &Grid,
    detail_grid: &Grid,
) -> OutstandingSummary {
    let mut summary = SummaryScan::default();
    apply_rules(summary_grid, SUMMARY_RULES, &mut summary);

    let mut entries = Vec::new();
    apply_rules(
        detail_grid.get(1..).unwrap_or_default(),
        DETAIL_RULES,
        &mut entries,
    );

    OutstandingSummary {
        month: month.into(),
        salesman_summary: summary.rows,
        total_outstanding: summary.total_outstanding,
        total_customers: summary.total_customers,
        entries,
    }
}
