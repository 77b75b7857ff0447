//! Fetching ranges without failing. Any problem becomes an `Outcome::Degraded` holding an empty
//! value, so one missing tab cannot abort a whole sync.
//!
//! `checked_fetch_range` and `sheet_infos` are the exception: an `ErrorType::Auth` failure, such
//! as a token that can no longer be refreshed, is returned as an error because every later call
//! would fail too.

use crate::api::Sheet;
use crate::error::{error_type, ErrorType};
use crate::model::{grid_from_values, Grid, Outcome, SheetInfo};
use crate::Result;
use anyhow::{anyhow, Context};
use tracing::{debug, warn};

const NO_SESSION: &str = "not authenticated";

/// Fetches `range` as a `Grid`.
///
/// - No session, an unknown range or a failed call: `Degraded` with an empty grid.
/// - A range that exists but holds no values: `Ok` with an empty grid.
pub async fn fetch_range(
    sheet: Option<&mut (dyn Sheet + Send + 'static)>,
    range: &str,
) -> Outcome<Grid> {
    degrade(get_grid(sheet, range).await)
}

/// Like `fetch_range`, but an authentication failure is an error.
pub(crate) async fn checked_fetch_range(
    sheet: Option<&mut (dyn Sheet + Send + 'static)>,
    range: &str,
) -> Result<Outcome<Grid>> {
    degrade_unless_auth(get_grid(sheet, range).await)
}

/// Lists the tabs of the workbook and classifies each by name. Like `checked_fetch_range`, only an
/// authentication failure is an error.
pub async fn sheet_infos(
    sheet: Option<&mut (dyn Sheet + Send + 'static)>,
) -> Result<Outcome<Vec<SheetInfo>>> {
    degrade_unless_auth(list_sheets(sheet).await)
}

async fn get_grid(sheet: Option<&mut (dyn Sheet + Send + 'static)>, range: &str) -> Result<Grid> {
    let values = match sheet {
        Some(sheet) => sheet.get(range).await,
        None => Err(anyhow!(NO_SESSION)),
    }
    .with_context(|| format!("Unable to fetch {range}"))?;
    debug!("Fetched {} rows from {range}", values.len());
    Ok(grid_from_values(values))
}

async fn list_sheets(sheet: Option<&mut (dyn Sheet + Send + 'static)>) -> Result<Vec<SheetInfo>> {
    let titles = match sheet {
        Some(sheet) => sheet.titles().await,
        None => Err(anyhow!(NO_SESSION)),
    }
    .context("Unable to list the sheets")?;
    Ok(titles.into_iter().map(SheetInfo::classify).collect())
}

fn degrade_unless_auth<T: Default>(result: Result<T>) -> Result<Outcome<T>> {
    match result {
        Err(e) if error_type(&e) == ErrorType::Auth => Err(e),
        result => Ok(degrade(result)),
    }
}

fn degrade<T: Default>(result: Result<T>) -> Outcome<T> {
    let outcome = Outcome::or_default(result);
    if let Some(reason) = outcome.reason() {
        warn!("{reason}");
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{seed_workbook, TestSheet};
    use crate::error::IntoResult;
    use crate::model::Cell;

    /// Answers every call with an expired-token error.
    struct ExpiredToken;

    #[async_trait::async_trait]
    impl Sheet for ExpiredToken {
        async fn titles(&mut self) -> Result<Vec<String>> {
            Err(anyhow!("Failed to refresh the OAuth access token")).pub_result(ErrorType::Auth)
        }

        async fn get(&mut self, _: &str) -> Result<Vec<Vec<String>>> {
            Err(anyhow!("Failed to refresh the OAuth access token")).pub_result(ErrorType::Auth)
        }
    }

    #[tokio::test]
    async fn test_fetch_existing_range() {
        let mut sheet = TestSheet::default();
        let outcome = fetch_range(Some(&mut sheet), "Settings!A14:F30").await;
        assert!(!outcome.is_degraded());
        let grid = outcome.into_value();
        assert_eq!(Cell::from("BANKS"), grid[0][0]);
        assert_eq!(Cell::Empty, grid[0][1]);
    }

    #[tokio::test]
    async fn test_fetch_empty_range_is_ok() {
        let mut sheet = TestSheet::default();
        let outcome = fetch_range(Some(&mut sheet), "Dashboard!A10:B20").await;
        assert_eq!(Outcome::Ok(Grid::new()), outcome);
    }

    #[tokio::test]
    async fn test_fetch_missing_tab_is_degraded() {
        let mut data = seed_workbook();
        data.remove("Settings");
        let mut sheet = TestSheet::new(data);
        let outcome = fetch_range(Some(&mut sheet), "Settings!A14:F30").await;
        assert!(outcome.is_degraded());
        assert!(outcome.reason().unwrap().contains("Settings!A14:F30"));
        assert!(outcome.value().is_empty());
    }

    #[tokio::test]
    async fn test_no_session() {
        let outcome = fetch_range(None, "Settings!A14:F30").await;
        assert!(outcome.is_degraded());
        assert!(outcome.into_value().is_empty());
        let sheets = sheet_infos(None).await.unwrap();
        assert!(sheets.is_degraded());
    }

    #[tokio::test]
    async fn test_sheet_infos() {
        let mut sheet = TestSheet::default();
        let infos = sheet_infos(Some(&mut sheet)).await.unwrap().into_value();
        let banks = infos.iter().find(|i| i.name == "Banks_JAN-2024").unwrap();
        assert_eq!("banks", banks.sheet_type);
        assert_eq!(Some("JAN-2024".to_string()), banks.month);
    }

    #[tokio::test]
    async fn test_checked_fetch_returns_auth_errors() {
        let mut sheet = ExpiredToken;
        let e = checked_fetch_range(Some(&mut sheet), "Settings!A14:F30")
            .await
            .unwrap_err();
        assert_eq!(ErrorType::Auth, error_type(&e));
        assert!(format!("{e:#}").contains("Unable to fetch Settings!A14:F30"));
        let e = sheet_infos(Some(&mut sheet)).await.unwrap_err();
        assert_eq!(ErrorType::Auth, error_type(&e));

        // `fetch_range` still degrades.
        assert!(fetch_range(Some(&mut sheet), "Settings!A14:F30")
            .await
            .is_degraded());
    }

    #[tokio::test]
    async fn test_checked_fetch_degrades_other_errors() {
        let mut data = seed_workbook();
        data.remove("Settings");
        let mut sheet = TestSheet::new(data);
        let outcome = checked_fetch_range(Some(&mut sheet), "Settings!A14:F30")
            .await
            .unwrap();
        assert!(outcome.is_degraded());
        assert!(outcome.into_value().is_empty());
        let outcome = checked_fetch_range(None, "Settings!A14:F30").await.unwrap();
        assert!(outcome.is_degraded());
    }
}
