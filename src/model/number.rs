//! Parsing of currency-formatted cells into numbers.
//!
//! The sheet renders amounts in whatever format the person who typed them chose, e.g.
//! `1,234.50`, `$1,234.50` or `SAR 1,234.50`. Anything that still is not a number once the
//! separators and currency markers are gone counts as zero.

use crate::model::{Cell, Outcome};
use tracing::debug;

/// The substrings removed before parsing. `SAR` is the currency code used in the workbook.
const NOISE: &[&str] = &[",", "$", "SAR"];

/// Parses `cell` into a number, reporting a degraded outcome when the text is not numeric.
pub fn normalize(cell: &Cell) -> Outcome<f64> {
    match cell {
        Cell::Empty => Outcome::Ok(0.0),
        Cell::Number(n) => Outcome::Ok(*n),
        Cell::Text(s) => normalize_str(s),
    }
}

/// Parses `cell` into a number. Blank or malformed cells are `0.0`.
pub fn parse_number(cell: &Cell) -> f64 {
    let outcome = normalize(cell);
    if let Some(reason) = outcome.reason() {
        debug!("Treating cell as 0: {reason}");
    }
    outcome.into_value()
}

/// Parses `cell` into an integer by truncating toward zero, e.g. a `days` or `count` column.
pub fn parse_int(cell: &Cell) -> i64 {
    parse_number(cell).trunc() as i64
}

fn normalize_str(s: &str) -> Outcome<f64> {
    let cleaned = NOISE
        .iter()
        .fold(s.to_string(), |acc, noise| acc.replace(noise, ""));
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return Outcome::Ok(0.0);
    }
    match cleaned.parse::<f64>() {
        Ok(n) => Outcome::Ok(n),
        Err(e) => Outcome::degraded(0.0, format!("'{s}' is not a number: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbers_are_unchanged() {
        assert_eq!(42.5, parse_number(&Cell::Number(42.5)));
        assert_eq!(-3.0, parse_number(&Cell::Number(-3.0)));
        let once = parse_number(&Cell::from("1,234.50"));
        assert_eq!(once, parse_number(&Cell::Number(once)));
    }

    #[test]
    fn test_thousands_separators() {
        assert_eq!(1234.5, parse_number(&Cell::from("1,234.50")));
        assert_eq!(1234567.0, parse_number(&Cell::from("1,234,567")));
    }

    #[test]
    fn test_currency_markers() {
        assert_eq!(100.0, parse_number(&Cell::from("SAR 100")));
        assert_eq!(2500.75, parse_number(&Cell::from("$2,500.75")));
        assert_eq!(-50.0, parse_number(&Cell::from("-50 SAR")));
    }

    #[test]
    fn test_blank_is_zero() {
        assert_eq!(0.0, parse_number(&Cell::from("")));
        assert_eq!(0.0, parse_number(&Cell::Empty));
        assert_eq!(0.0, parse_number(&Cell::from("   ")));
        assert!(!normalize(&Cell::from("SAR")).is_degraded());
    }

    #[test]
    fn test_garbage_is_zero_but_degraded() {
        assert_eq!(0.0, parse_number(&Cell::from("abc")));
        let outcome = normalize(&Cell::from("12 units"));
        assert!(outcome.is_degraded());
        assert_eq!(&0.0, outcome.value());
        assert!(outcome.reason().unwrap().contains("12 units"));
    }

    #[test]
    fn test_parse_int_truncates() {
        assert_eq!(45, parse_int(&Cell::from("45.9")));
        assert_eq!(-2, parse_int(&Cell::from("-2.7")));
        assert_eq!(0, parse_int(&Cell::from("n/a")));
    }
}
