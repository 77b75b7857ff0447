use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// A rectangular (but possibly ragged) block of cells as returned for an A1 range. Rows that end
/// in blank cells are usually shorter than the range is wide.
pub type Grid = Vec<Vec<Cell>>;

/// A single loosely-typed spreadsheet cell.
///
/// Serializes untagged, so a blank cell is `null`, a number is a JSON number and text is a JSON
/// string.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    #[default]
    Empty,
    Number(f64),
    Text(String),
}

static EMPTY: Cell = Cell::Empty;

impl Cell {
    /// `true` for an empty cell or a zero-length string. Whitespace is not blank.
    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Number(_) => false,
            Cell::Text(s) => s.is_empty(),
        }
    }

    /// The cell rendered as text, with surrounding whitespace removed.
    pub fn trimmed(&self) -> String {
        self.to_string().trim().to_string()
    }
}

impl Display for Cell {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Cell::Number(n) => write!(f, "{n}"),
            Cell::Text(s) => f.write_str(s),
        }
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        if value.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(value)
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::from(value.to_string())
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Cell::Number(value as f64)
    }
}

/// Returns the cell at column `ix`, or a blank cell if the row is too short.
pub(crate) fn cell_at(row: &[Cell], ix: usize) -> &Cell {
    row.get(ix).unwrap_or(&EMPTY)
}

/// Converts the string values returned by the Sheets API into a `Grid`.
pub fn grid_from_values<S, R, I>(values: I) -> Grid
where
    S: Into<String>,
    R: IntoIterator<Item = S>,
    I: IntoIterator<Item = R>,
{
    values
        .into_iter()
        .map(|row| row.into_iter().map(|s| Cell::from(s.into())).collect())
        .collect()
}
