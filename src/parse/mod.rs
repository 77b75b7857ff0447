//! Turns the raw grids fetched from the workbook into typed records.
//!
//! Every shape here is a positional scan. The workbook has no machine-readable schema, so the
//! parsers tolerate short rows and blank cells and rely on fixed sentinel labels to find totals and
//! the end of the data.

pub mod comparison;
pub mod outstanding;
pub(crate) mod rows;
pub mod settings;

pub use comparison::{parse_comparison, ComparisonKind};
pub use outstanding::{
    monthly_detail_range, monthly_summary_range, parse_monthly_outstanding,
    parse_outstanding_comparison, OUTSTANDING_COMPARISON_RANGE,
};
pub use settings::{parse_settings, SETTINGS_RANGE};
