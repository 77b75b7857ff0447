use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub const DASHBOARD: &str = "Dashboard";
pub const SETTINGS: &str = "Settings";
const COMPARISON_MARKER: &str = "_Comparison";
const OTHER: &str = "other";

/// A month tag at the end of a tab name, e.g. the `JAN-2024` in `Banks_JAN-2024`.
static MONTH_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([A-Z]{3}-\d{4})$").expect("month pattern is a valid regex"));

/// Describes a tab of the workbook. Everything except `name` is derived from the name alone.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SheetInfo {
    pub name: String,
    pub sheet_type: String,
    pub month: Option<String>,
}

impl SheetInfo {
    /// Classifies a tab by its name. The rules are checked in order and the first one that
    /// matches wins:
    ///
    /// 1. `Dashboard` -> `dashboard`
    /// 2. `Settings` -> `settings`
    /// 3. `Banks_Comparison` -> `banks_comparison`
    /// 4. `Banks_JAN-2024` -> `banks`, month `JAN-2024`
    /// 5. anything else -> `other`
    pub fn classify(name: impl Into<String>) -> Self {
        let name = name.into();
        let (sheet_type, month) = classify_name(&name);
        Self {
            name,
            sheet_type,
            month,
        }
    }
}

fn classify_name(name: &str) -> (String, Option<String>) {
    if name == DASHBOARD {
        return ("dashboard".into(), None);
    }
    if name == SETTINGS {
        return ("settings".into(), None);
    }
    if name.contains(COMPARISON_MARKER) {
        let base = name.replace(COMPARISON_MARKER, "").to_lowercase();
        return (format!("{base}_comparison"), None);
    }
    if let Some(m) = MONTH_SUFFIX.captures(name).and_then(|c| c.get(1)) {
        let month = m.as_str();
        let sheet_type = name.replace(&format!("_{month}"), "").to_lowercase();
        return (sheet_type, Some(month.to_string()));
    }
    (OTHER.into(), None)
}
