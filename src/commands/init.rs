use crate::commands::Out;
use crate::error::{ErrorType, IntoResult};
use crate::{Config, Result};
use anyhow::Context;
use std::path::Path;

/// Creates the home directory with its `config.json` and `.secrets/` and moves the downloaded
/// OAuth client secret into `.secrets/client_secret.json`.
///
/// # Arguments
/// - `home` - The directory that will hold the configuration, e.g. `$HOME/finance-reports`
/// - `secret_file` - The OAuth 2.0 Desktop App credentials downloaded from Google Cloud Console.
/// - `url` - The URL of the Google Sheet holding the monthly reports, e.g.
///   https://docs.google.com/spreadsheets/d/7KpXm2RfZwNJgs84QhVYno5DU6iM9Wlr3bCzAv1txRpL
///
/// # Errors
/// - Returns an error if the URL has no spreadsheet ID or if any file operation fails.
pub async fn init(home: &Path, secret_file: &Path, url: &str) -> Result<Out<()>> {
    let config = Config::create(home, secret_file, url)
        .await
        .context("Unable to create the home directory and config")
        .pub_result(ErrorType::Config)?;
    Ok(format!(
        "Created {}, run 'finance-reports auth' next",
        config.config_path().display()
    )
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_init() {
        let dir = TempDir::new().unwrap();
        let secret = dir.path().join("download.json");
        utils::write(&secret, "{}").await.unwrap();
        let home = dir.path().join("home");

        let out = init(&home, &secret, "https://docs.google.com/spreadsheets/d/abc/edit")
            .await
            .unwrap();
        assert!(out.message().contains("config.json"));
        assert!(Config::load(&home).await.is_ok());
    }

    #[tokio::test]
    async fn test_init_bad_url() {
        let dir = TempDir::new().unwrap();
        let secret = dir.path().join("download.json");
        utils::write(&secret, "{}").await.unwrap();

        let e = init(&dir.path().join("home"), &secret, "https://example.com")
            .await
            .unwrap_err();
        assert_eq!(ErrorType::Config, crate::error::error_type(&e));
        assert!(secret.exists());
    }
}
