//! Access to the workbook. The rest of the crate only sees the `Sheet` and `Authenticator` traits,
//! which have a Google implementation and an in-memory one for tests and test mode.

mod extract;
mod files;
mod oauth;
mod sheet;
mod sheet_test_client;

use crate::error::{ErrorType, IntoResult};
use crate::{Config, Result};
use anyhow::anyhow;
use sheet::GoogleSheet;
use std::path::Path;
use tracing::{debug, info};

pub use extract::{fetch_range, sheet_infos};
pub(crate) use extract::checked_fetch_range;
pub(crate) use oauth::TokenProvider;
#[cfg(test)]
pub(crate) use sheet_test_client::{seed_workbook, TestSheet};
pub(crate) use sheet_test_client::TestAuthenticator;

/// Read-only access: the app never writes to the workbook.
pub(crate) const OAUTH_SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/spreadsheets.readonly",
    "https://www.googleapis.com/auth/drive.readonly",
];

/// The environment variable that switches the app to the in-memory workbook.
pub const TEST_MODE_VAR: &str = "FINANCE_REPORTS_TEST_MODE";

/// A source of cell ranges from one workbook.
#[async_trait::async_trait]
pub trait Sheet: Send {
    /// The titles of all tabs.
    async fn titles(&mut self) -> Result<Vec<String>>;

    /// The formatted values of an A1 range, e.g. `Settings!A14:F30`. Trailing blank cells and rows
    /// may be missing from the result.
    async fn get(&mut self, range: &str) -> Result<Vec<Vec<String>>>;
}

/// Whether an authentication attempt may open the interactive consent flow.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub enum Prompt {
    /// Fall back to the consent flow when there is no usable token.
    Allowed,
    /// Only use an existing token.
    #[default]
    Never,
}

/// Produces authenticated `Sheet` sessions.
#[async_trait::async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, prompt: Prompt) -> Result<Box<dyn Sheet + Send>>;

    /// `true` if the OAuth client secret is present.
    async fn has_credentials(&self) -> bool;

    /// `true` if a token file is present. It may still be expired.
    async fn has_token(&self) -> bool;
}

/// Selects the data source the app runs against.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub enum Mode {
    #[default]
    Google,
    Testing,
}

impl Mode {
    /// `Testing` when `FINANCE_REPORTS_TEST_MODE` is set to something non-empty, `Google`
    /// otherwise.
    pub fn from_env() -> Self {
        match std::env::var(TEST_MODE_VAR) {
            Ok(value) if !value.is_empty() => Mode::Testing,
            _ => Mode::Google,
        }
    }
}

/// Creates the `Authenticator` for `mode`.
pub fn authenticator(config: Config, mode: Mode) -> Box<dyn Authenticator> {
    match mode {
        Mode::Google => Box::new(GoogleAuthenticator { config }),
        Mode::Testing => {
            info!("Running in test mode against the built-in workbook");
            Box::new(TestAuthenticator::default())
        }
    }
}

/// Authenticates with the OAuth files named in the `Config`.
struct GoogleAuthenticator {
    config: Config,
}

#[async_trait::async_trait]
impl Authenticator for GoogleAuthenticator {
    async fn authenticate(&self, prompt: Prompt) -> Result<Box<dyn Sheet + Send>> {
        let secret = self.config.client_secret_path();
        let token = self.config.token_path();
        if !crate::utils::is_file(&secret).await {
            return Err(anyhow!(
                "The OAuth client secret is missing '{}'",
                secret.display()
            ))
            .pub_result(ErrorType::Auth);
        }

        let provider = match (load_token(&secret, &token).await, prompt) {
            (Ok(provider), _) => provider,
            (Err(e), Prompt::Never) => return Err(e).pub_result(ErrorType::Auth),
            (Err(e), Prompt::Allowed) => {
                debug!("No usable token, starting the consent flow: {e:#}");
                TokenProvider::initialize(&secret, &token).await?
            }
        };

        let sheet = GoogleSheet::new(self.config.spreadsheet_id(), provider).await?;
        Ok(Box::new(sheet))
    }

    async fn has_credentials(&self) -> bool {
        crate::utils::is_file(self.config.client_secret_path()).await
    }

    async fn has_token(&self) -> bool {
        crate::utils::is_file(self.config.token_path()).await
    }
}

/// Loads the saved token and makes sure it can still be used, refreshing it if it has expired.
async fn load_token(secret: &Path, token: &Path) -> Result<TokenProvider> {
    let mut provider = TokenProvider::load(secret, token).await?;
    provider.token_with_refresh().await?;
    Ok(provider)
}
