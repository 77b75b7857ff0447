//! Implements the `Sheet` trait using the `sheets::Client` to read from the Google sheet.

use crate::api::{Sheet, TokenProvider};
use crate::error::{ErrorType, IntoResult, Res};
use anyhow::{bail, Context};
use serde::Deserialize;
use sheets::types::{DateTimeRenderOption, Dimension, ValueRenderOption};
use sheets::ClientError;
use tracing::trace;

const SPREADSHEETS_API: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// Reads ranges from one spreadsheet. It holds a `TokenProvider` and refreshes the access token
/// before each call when needed.
pub(super) struct GoogleSheet {
    spreadsheet_id: String,
    token_provider: TokenProvider,
    client: sheets::Client,
    http: reqwest::Client,
}

impl GoogleSheet {
    pub(super) async fn new(
        spreadsheet_id: impl Into<String>,
        mut token_provider: TokenProvider,
    ) -> Res<Self> {
        let client = create_sheets_client(&mut token_provider).await?;
        Ok(Self {
            spreadsheet_id: spreadsheet_id.into(),
            token_provider,
            client,
            http: reqwest::Client::new(),
        })
    }

    /// Rebuilds the sheets client in case the access token was refreshed.
    async fn refresh_client(&mut self) -> Res<()> {
        self.client = create_sheets_client(&mut self.token_provider).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl Sheet for GoogleSheet {
    async fn titles(&mut self) -> Res<Vec<String>> {
        trace!("titles for {}", self.spreadsheet_id);
        let token = self.token_provider.token_with_refresh().await?.to_string();

        // The `sheets` client deserializes the whole spreadsheet resource, so ask for just the
        // titles directly.
        let url = format!("{SPREADSHEETS_API}/{}", self.spreadsheet_id);
        let response = self
            .http
            .get(&url)
            .query(&[("fields", "sheets.properties.title")])
            .bearer_auth(token)
            .send()
            .await
            .context("Failed to send the spreadsheet metadata request")
            .pub_result(ErrorType::Sheets)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read response body".to_string());
            bail!("The Sheets API returned {status} for the spreadsheet metadata: {body}");
        }

        let metadata: SpreadsheetMetadata = response
            .json()
            .await
            .context("Failed to parse the spreadsheet metadata")?;
        Ok(metadata
            .sheets
            .into_iter()
            .map(|s| s.properties.title)
            .collect())
    }

    async fn get(&mut self, range: &str) -> Res<Vec<Vec<String>>> {
        trace!("get for {range}");
        self.refresh_client().await?;
        let response = self
            .client
            .spreadsheets()
            .values_get(
                &self.spreadsheet_id,
                range,
                DateTimeRenderOption::FormattedString,
                Dimension::Rows,
                ValueRenderOption::FormattedValue,
            )
            .await
            .map_err(map_client_error)
            .with_context(|| format!("Failed to fetch the range {range}"))
            .pub_result(ErrorType::Sheets)?;
        Ok(response.body.values)
    }
}

#[derive(Debug, Default, Deserialize)]
struct SpreadsheetMetadata {
    #[serde(default)]
    sheets: Vec<SheetMetadata>,
}

#[derive(Debug, Deserialize)]
struct SheetMetadata {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
struct SheetProperties {
    title: String,
}

/// Creates a new sheets client with a refreshed access token.
async fn create_sheets_client(token_provider: &mut TokenProvider) -> Res<sheets::Client> {
    let access_token = token_provider.token_with_refresh().await?;

    // The client wants the OAuth client settings too, but they are only used for its own refresh,
    // which we never call.
    Ok(sheets::Client::new(
        String::new(),
        String::new(),
        String::new(),
        access_token.to_string(),
        String::new(),
    ))
}

fn map_client_error(e: ClientError) -> anyhow::Error {
    let kind = match &e {
        ClientError::EmptyRefreshToken => "EmptyRefreshToken",
        ClientError::FromUtf8Error(_) => "FromUtf8Error",
        ClientError::UrlParserError(_) => "UrlParserError",
        ClientError::SerdeJsonError(_) => "SerdeJsonError",
        ClientError::ReqwestError(_) => "ReqwestError",
        ClientError::InvalidHeaderValue(_) => "InvalidHeaderValue",
        ClientError::ReqwestMiddleWareError(_) => "ReqwestMiddleWareError",
        ClientError::HttpError { .. } => "HttpError",
        ClientError::Other(_) => "Other",
    };
    anyhow::Error::new(e).context(format!("Sheets client error: {kind}"))
}
