use crate::model::{cell_at, Grid, SettingsLists};

pub const SETTINGS_RANGE: &str = "Settings!A14:F30";

/// The header labels that sit above each list on the Settings tab.
const HEADERS: &[&str] = &["BANKS", "SALESMEN", "AREAS"];

const BANKS_COLUMN: usize = 0;
const SALESMEN_COLUMN: usize = 2;
const AREAS_COLUMN: usize = 4;

/// Reads the banks, salesmen and areas lists from their columns of the Settings grid. Header
/// labels and blank or whitespace-only cells are dropped. Values are kept untrimmed.
pub fn parse_settings(grid: &Grid) -> SettingsLists {
    SettingsLists {
        banks: column(grid, BANKS_COLUMN),
        salesmen: column(grid, SALESMEN_COLUMN),
        areas: column(grid, AREAS_COLUMN),
    }
}

fn column(grid: &Grid, ix: usize) -> Vec<String> {
    grid.iter()
        .map(|row| cell_at(row, ix))
        .filter(|cell| !cell.is_blank())
        .map(ToString::to_string)
        .filter(|value| !HEADERS.contains(&value.as_str()))
        .filter(|value| !value.trim().is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::grid;

    #[test]
    fn test_settings() {
        let g = grid(&[
            &["BANKS", "", "SALESMEN", "", "AREAS"],
            &["Al Rajhi", "", "Ali", "", "Riyadh"],
            &["SNB", "", "  ", "", "Jeddah"],
            &["", "", "Sara"],
            &["Riyad Bank"],
        ]);
        let lists = parse_settings(&g);
        assert_eq!(vec!["Al Rajhi", "SNB", "Riyad Bank"], lists.banks);
        assert_eq!(vec!["Ali", "Sara"], lists.salesmen);
        assert_eq!(vec!["Riyadh", "Jeddah"], lists.areas);
    }

    #[test]
    fn test_header_labels_dropped_in_any_column() {
        // A header label is dropped wherever it shows up.
        let g = grid(&[&["AREAS", "", "BANKS", "", "SALESMEN"]]);
        assert_eq!(SettingsLists::default(), parse_settings(&g));
    }

    #[test]
    fn test_empty() {
        assert_eq!(SettingsLists::default(), parse_settings(&Grid::new()));
    }
}
