//! Implements the `Sheet` and `Authenticator` traits with in-memory data for testing purposes.
//!
//! Note: this is compiled even in the "production" version of this app so that we can run the whole
//! app, top-to-bottom, without using Google Sheets. Set `FINANCE_REPORTS_TEST_MODE=1` to do so.

use crate::api::{Authenticator, Prompt, Sheet};
use crate::error::{ErrorType, IntoResult};
use crate::Result;
use anyhow::{anyhow, Context};
use std::collections::BTreeMap;
use std::io::Cursor;

/// The tabs of a workbook. Each tab is stored from cell `A1`.
pub(crate) type Workbook = BTreeMap<String, Vec<Vec<String>>>;

/// An implementation of the `Sheet` trait that does not use Google sheets. It answers A1 range
/// requests from in-memory tabs and, by default, is seeded with a small monthly-reports workbook.
#[derive(Debug, Clone)]
pub(crate) struct TestSheet {
    pub(crate) data: Workbook,
}

impl TestSheet {
    pub(crate) fn new(data: Workbook) -> Self {
        Self { data }
    }
}

impl Default for TestSheet {
    fn default() -> Self {
        Self::new(seed_workbook())
    }
}

#[async_trait::async_trait]
impl Sheet for TestSheet {
    async fn titles(&mut self) -> Result<Vec<String>> {
        // Google returns tabs in workbook order, this returns them sorted.
        Ok(self.data.keys().cloned().collect())
    }

    async fn get(&mut self, range: &str) -> Result<Vec<Vec<String>>> {
        let a1 = A1Range::parse(range)?;
        let tab = self
            .data
            .get(&a1.tab)
            .with_context(|| format!("Unable to parse range: {range}"))
            .pub_result(ErrorType::Sheets)?;
        Ok(a1.slice(tab))
    }
}

/// Hands out `TestSheet` sessions. It can be told to reject every attempt, which is how tests
/// exercise authentication failures.
#[derive(Debug, Clone)]
pub(crate) struct TestAuthenticator {
    data: Workbook,
    reject: bool,
}

impl TestAuthenticator {
    pub(crate) fn new(data: Workbook) -> Self {
        Self {
            data,
            reject: false,
        }
    }

    pub(crate) fn rejecting() -> Self {
        Self {
            data: Workbook::new(),
            reject: true,
        }
    }
}

impl Default for TestAuthenticator {
    fn default() -> Self {
        Self::new(seed_workbook())
    }
}

#[async_trait::async_trait]
impl Authenticator for TestAuthenticator {
    async fn authenticate(&self, _: Prompt) -> Result<Box<dyn Sheet + Send>> {
        if self.reject {
            return Err(anyhow!("The test authenticator rejects every attempt"))
                .pub_result(ErrorType::Auth);
        }
        Ok(Box::new(TestSheet::new(self.data.clone())))
    }

    async fn has_credentials(&self) -> bool {
        !self.reject
    }

    async fn has_token(&self) -> bool {
        !self.reject
    }
}

/// A parsed A1 range such as `Banks_Comparison!A3:Z20`. Row and column bounds are zero-based and
/// inclusive. A range without cells, e.g. `Settings`, covers the whole tab.
#[derive(Debug, Clone, Eq, PartialEq)]
struct A1Range {
    tab: String,
    rows: (usize, usize),
    cols: (usize, usize),
}

impl A1Range {
    fn parse(range: &str) -> Result<Self> {
        let (tab, cells) = match range.rsplit_once('!') {
            Some((tab, cells)) => (tab, Some(cells)),
            None => (range, None),
        };
        let tab = tab.trim_matches('\'').to_string();
        let Some(cells) = cells else {
            return Ok(Self {
                tab,
                rows: (0, usize::MAX),
                cols: (0, usize::MAX),
            });
        };
        let (start, end) = cells.split_once(':').unwrap_or((cells, cells));
        let (c1, r1) = parse_cell(start).with_context(|| format!("Bad range '{range}'"))?;
        let (c2, r2) = parse_cell(end).with_context(|| format!("Bad range '{range}'"))?;
        Ok(Self {
            tab,
            rows: (r1, r2),
            cols: (c1, c2),
        })
    }

    /// Cuts the range out of `tab` the way the Sheets API does: trailing blank cells and trailing
    /// blank rows are left out.
    fn slice(&self, tab: &[Vec<String>]) -> Vec<Vec<String>> {
        let mut rows: Vec<Vec<String>> = tab
            .iter()
            .skip(self.rows.0)
            .take(self.rows.1.saturating_sub(self.rows.0).saturating_add(1))
            .map(|row| {
                let mut cells: Vec<String> = row
                    .iter()
                    .skip(self.cols.0)
                    .take(self.cols.1.saturating_sub(self.cols.0).saturating_add(1))
                    .cloned()
                    .collect();
                while cells.last().is_some_and(|c| c.is_empty()) {
                    cells.pop();
                }
                cells
            })
            .collect();
        while rows.last().is_some_and(|r| r.is_empty()) {
            rows.pop();
        }
        rows
    }
}

/// Parses a cell reference like `AB12` into zero-based `(column, row)`.
fn parse_cell(cell: &str) -> Result<(usize, usize)> {
    let split = cell
        .find(|c: char| c.is_ascii_digit())
        .with_context(|| format!("Cell reference '{cell}' has no row"))?;
    let (letters, digits) = cell.split_at(split);
    if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_uppercase()) {
        return Err(anyhow!("Cell reference '{cell}' has no column"));
    }
    let col = letters
        .bytes()
        .fold(0usize, |acc, b| acc * 26 + usize::from(b - b'A' + 1))
        - 1;
    let row: usize = digits
        .parse()
        .with_context(|| format!("Cell reference '{cell}' has a bad row"))?;
    if row == 0 {
        return Err(anyhow!("Cell reference '{cell}' has row 0"));
    }
    Ok((col, row - 1))
}

/// The seed workbook used in test mode and by the tests.
pub(crate) fn seed_workbook() -> Workbook {
    let tabs = [
        ("Dashboard", DASHBOARD_DATA),
        ("Settings", SETTINGS_DATA),
        ("Banks_Comparison", BANKS_COMPARISON_DATA),
        ("Advances_Comparison", ADVANCES_COMPARISON_DATA),
        ("Suspense_Comparison", SUSPENSE_COMPARISON_DATA),
        ("Outstanding_Comparison", OUTSTANDING_COMPARISON_DATA),
        ("Banks_JAN-2024", BANKS_JAN_DATA),
        ("Outstanding_JAN-2024", OUTSTANDING_JAN_DATA),
    ];
    tabs.into_iter()
        .map(|(name, csv)| (name.to_string(), load_csv(csv)))
        .collect()
}

/// Loads rows from a CSV-formatted string. The seed data is static and known to be valid, so a
/// malformed record simply ends the tab.
fn load_csv(csv_data: &str) -> Vec<Vec<String>> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(Cursor::new(csv_data.as_bytes()))
        .records()
        .map_while(|record| record.ok())
        .map(|record| record.iter().map(str::to_string).collect())
        .collect()
}

const DASHBOARD_DATA: &str = r##"Monthly Finance Dashboard
Generated from the comparison tabs
"##;

/// Lists start at row 14.
const SETTINGS_DATA: &str = r##"Settings
Company,Acme Trading Co.
Currency,SAR
,
,
,
,
,
,
,
,
,
,
BANKS,,SALESMEN,,AREAS
Al Rajhi Bank,,Ali,,Riyadh
Saudi National Bank,,Sara,,Jeddah
Riyad Bank,,Omar,,Dammam
,,  ,,
"##;

/// The header row is row 3.
const BANKS_COMPARISON_DATA: &str = r##"Banks Comparison
,
Metric,JAN-2024,FEB-2024,MAR-2024
Opening Balance,"100,000.00","120,000.00","135,500.00"
Total Received,"SAR 50,000.00","45,000.00","60,000.00"
Bank Charges,150.00,120.00,180.00
Total Payments,"29,850.00","29,380.00","40,320.00"
Closing Balance,"120,000.00","135,500.00","155,000.00"
Net Cash Flow,"20,000.00","15,500.00","19,500.00"
MoM %,,12.90,14.39
"##;

const ADVANCES_COMPARISON_DATA: &str = r##"Advances Comparison
,
Metric,JAN-2024,FEB-2024,MAR-2024
Opening Balance,"5,000.00","7,000.00","6,000.00"
Advances Given,"3,000.00","1,000.00","2,500.00"
Advances Settled,"1,000.00","2,000.00","500.00"
Closing Balance,"7,000.00","6,000.00","8,000.00"
"##;

const SUSPENSE_COMPARISON_DATA: &str = r##"Suspense Comparison
,
Metric,JAN-2024,FEB-2024,MAR-2024
Opening Balance,0.00,250.00,100.00
Total Debits,500.00,100.00,300.00
Total Credits,250.00,250.00,400.00
Closing Balance,250.00,100.00,0.00
"##;

const OUTSTANDING_COMPARISON_DATA: &str = r##"Outstanding Comparison
,
Salesman,Trend,JAN-2024,FEB-2024,MAR-2024
Ali,,"40,000.00","42,000.00","45,000.00"
Sara,,"35,000.00","30,000.00","28,000.00"
Omar,,"25,000.00","28,000.00","27,000.00"
TOTAL,,"100,000.00","100,000.00","100,000.00"
MoM %,,,0.0%,0.0%
"##;

const BANKS_JAN_DATA: &str = r##"Bank Statement JAN-2024
Date,Bank,Description,Debit,Credit
01/01/2024,Al Rajhi Bank,Opening balance,,"100,000.00"
"##;

/// The summary block starts at row 4. Customer rows start at row 21, below a header row whose
/// first cell is blank so that the summary scan passes over it.
const OUTSTANDING_JAN_DATA: &str = r##"Outstanding JAN-2024
,
,
Salesman,Outstanding,Customers,Average
Ali,"40,000.00",2,"20,000.00"
Sara,"35,000.00",1,"35,000.00"
Omar,"25,000.00",1,"25,000.00"
TOTAL,"100,000.00",4
,
,
,
,
,
,
,
,
,
,
,
,Customer,Area,Salesman,Invoice Amount,Paid Amount,Balance,Days
C001,Al Noor Trading,Riyadh,Ali,"30,000.00","5,000.00","25,000.00",45
C002,Gulf Supplies,Riyadh,Ali,"20,000.00","5,000.00","15,000.00",30
C003,Red Sea Foods,Jeddah,Sara,"40,000.00","5,000.00","35,000.00",60
C004,Eastern Motors,Dammam,Omar,"25,000.00",0.00,"25,000.00",15
GRAND TOTAL,,,,"115,000.00","15,000.00","100,000.00",
Notes,Figures exclude VAT,,,,,,
"##;
