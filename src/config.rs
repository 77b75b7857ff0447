//! Configuration file handling.
//!
//! The configuration file is stored at `$FINANCE_REPORTS_HOME/config.json` and contains the
//! Google Sheet URL, the paths to the OAuth files and, optionally, the address the API server
//! listens on.

use crate::{utils, Result};
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

const APP_NAME: &str = "finance-reports";
const CONFIG_VERSION: u8 = 1;
const SECRETS: &str = ".secrets";
const CLIENT_SECRET_JSON: &str = "client_secret.json";
const TOKEN_JSON: &str = "token.json";
const CONFIG_JSON: &str = "config.json";
pub(crate) const DEFAULT_HOST: &str = "0.0.0.0";
pub(crate) const DEFAULT_PORT: u16 = 8000;

/// The loaded `config.json` together with the home directory it lives in. Paths in the file may be
/// relative to the home directory; the accessors always return usable paths.
#[derive(Debug, Clone)]
pub struct Config {
    root: PathBuf,
    secrets: PathBuf,
    config_path: PathBuf,
    config_file: ConfigFile,
    spreadsheet_id: String,
}

impl Config {
    /// Sets up a new home directory at `dir`: writes a default `config.json` for `sheet_url` and
    /// moves `secret_file` to `.secrets/client_secret.json`.
    ///
    /// # Errors
    /// - The URL has no spreadsheet ID. Nothing is written in that case.
    /// - Any file operation fails.
    pub async fn create(
        dir: impl Into<PathBuf>,
        secret_file: &Path,
        sheet_url: &str,
    ) -> Result<Self> {
        // Fail before touching the filesystem if the URL is unusable
        let spreadsheet_id = extract_spreadsheet_id(sheet_url)
            .context("Failed to extract spreadsheet ID from sheet URL")?;

        let maybe_relative = dir.into();
        utils::make_dir(&maybe_relative)
            .await
            .context("Unable to create the home directory")?;
        let root = utils::canonicalize(&maybe_relative).await?;

        let secrets_dir = root.join(SECRETS);
        utils::make_dir(&secrets_dir).await?;

        let secret_destination = secrets_dir.join(CLIENT_SECRET_JSON);
        utils::rename(secret_file, secret_destination).await?;

        let config_path = root.join(CONFIG_JSON);
        let config_file = ConfigFile {
            sheet_url: sheet_url.to_string(),
            ..ConfigFile::default()
        };
        config_file.save(&config_path).await?;

        Ok(Self {
            root,
            secrets: secrets_dir,
            config_path,
            config_file,
            spreadsheet_id,
        })
    }

    /// Loads `config.json` from `home`. Fails if the home directory, the config file or the
    /// secrets directory is missing.
    pub async fn load(home: impl Into<PathBuf>) -> Result<Self> {
        let maybe_relative = home.into();
        let root = utils::canonicalize(&maybe_relative)
            .await
            .context("The home directory is missing, run 'finance-reports init' first")?;

        let config_path = root.join(CONFIG_JSON);
        if !utils::is_file(&config_path).await {
            bail!("The config file is missing '{}'", config_path.display())
        }
        let config_file = ConfigFile::load(&config_path).await?;

        let spreadsheet_id = extract_spreadsheet_id(&config_file.sheet_url)
            .context("Failed to extract spreadsheet ID from sheet URL")?;

        let config = Self {
            root: root.clone(),
            secrets: root.join(SECRETS),
            config_path,
            config_file,
            spreadsheet_id,
        };
        if !config.secrets.is_dir() {
            bail!(
                "The secrets directory is missing '{}'",
                config.secrets.display()
            )
        }
        Ok(config)
    }

    #[cfg(test)]
    pub(crate) fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    #[cfg(test)]
    pub(crate) fn secrets(&self) -> &Path {
        &self.secrets
    }

    pub fn sheet_url(&self) -> &str {
        &self.config_file.sheet_url
    }

    pub fn spreadsheet_id(&self) -> &str {
        &self.spreadsheet_id
    }

    /// The address the API server should bind to when none is given on the command line.
    pub fn host(&self) -> &str {
        self.config_file.host.as_deref().unwrap_or(DEFAULT_HOST)
    }

    /// The port the API server should listen on when none is given on the command line.
    pub fn port(&self) -> u16 {
        self.config_file.port.unwrap_or(DEFAULT_PORT)
    }

    /// Returns the stored `client_secret_path` if it is absolute, otherwise resolves the relative path.
    pub fn client_secret_path(&self) -> PathBuf {
        self.resolve_secrets_file_path(self.config_file.client_secret_path())
    }

    /// Returns the stored `token_path` if it is absolute, otherwise resolves the relative path.
    pub fn token_path(&self) -> PathBuf {
        self.resolve_secrets_file_path(self.config_file.token_path())
    }

    /// Checks if `p` is relative, and if so, resolves it. Returns it unchanged if it is absolute.
    fn resolve_secrets_file_path(&self, p: PathBuf) -> PathBuf {
        if p.is_absolute() {
            return p;
        }
        self.root.join(p)
    }
}

/// Represents the serialization and deserialization format of the configuration file.
///
/// Example configuration:
/// ```json
/// {
///   "app_name": "finance-reports",
///   "config_version": 1,
///   "sheet_url": "https://docs.google.com/spreadsheets/d/7KpXm2RfZwNJgs84QhVYno5DU6iM9Wlr3bCzAv1txRpL",
///   "client_secret_path": ".secrets/client_secret.json",
///   "token_path": ".secrets/token.json",
///   "port": 8000
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
struct ConfigFile {
    /// Always "finance-reports", checked on load to catch a wrong `--home`.
    app_name: String,
    config_version: u8,
    sheet_url: String,

    /// Relative to the home directory unless absolute. Defaults to `.secrets/client_secret.json`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    client_secret_path: Option<PathBuf>,

    /// Relative to the home directory unless absolute. Defaults to `.secrets/token.json`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    token_path: Option<PathBuf>,

    /// The API server's bind address. `--host` and `FINANCE_REPORTS_HOST` take precedence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    host: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    port: Option<u16>,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            app_name: APP_NAME.to_string(),
            config_version: CONFIG_VERSION,
            sheet_url: String::new(),
            client_secret_path: None,
            token_path: None,
            host: None,
            port: None,
        }
    }
}

impl ConfigFile {
    async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config: ConfigFile = utils::deserialize(path).await?;

        anyhow::ensure!(
            config.app_name == APP_NAME,
            "Invalid app_name in config file: expected '{}', got '{}'",
            APP_NAME,
            config.app_name
        );

        Ok(config)
    }

    async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let p = path.as_ref();
        let data = serde_json::to_string_pretty(self).context("Unable to serialize config")?;
        utils::write(p, data)
            .await
            .context("Unable to write config file")
    }

    fn client_secret_path(&self) -> PathBuf {
        self.client_secret_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(SECRETS).join(CLIENT_SECRET_JSON))
    }

    fn token_path(&self) -> PathBuf {
        self.token_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(SECRETS).join(TOKEN_JSON))
    }
}

/// The spreadsheet ID is the path segment after `/d/`, e.g. the `abc123` in
/// `https://docs.google.com/spreadsheets/d/abc123/edit#gid=0`.
fn extract_spreadsheet_id(sheet_url: &str) -> Result<String> {
    let url = Url::parse(sheet_url).with_context(|| format!("'{sheet_url}' is not a URL"))?;
    let id = url
        .path_segments()
        .and_then(|mut segments| {
            segments.find(|s| *s == "d")?;
            segments.next()
        })
        .filter(|id| !id.is_empty());
    match id {
        Some(id) => Ok(id.to_string()),
        None => bail!(
            "Invalid Google Sheets URL format. Expected: \
            https://docs.google.com/spreadsheets/d/SPREADSHEET_ID"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_config_create() {
        let dir = TempDir::new().unwrap();
        let home_dir = dir.path().join("reports_home");
        let secret_source_file = dir.path().join("x.txt");
        let secret_content = "12345";
        let sheet_url = "https://docs.google.com/spreadsheets/d/7KpXm2RfZwNJgs84QhVYno5DU6iM9Wlr3bCzAv1txRpL/edit";
        utils::write(&secret_source_file, secret_content)
            .await
            .unwrap();

        let config = Config::create(&home_dir, &secret_source_file, sheet_url)
            .await
            .unwrap();

        assert_eq!(sheet_url, config.sheet_url());
        assert_eq!(
            "7KpXm2RfZwNJgs84QhVYno5DU6iM9Wlr3bCzAv1txRpL",
            config.spreadsheet_id()
        );

        let found_secret_content = utils::read(&config.client_secret_path()).await.unwrap();
        assert_eq!(secret_content, found_secret_content);
        assert!(config.secrets().is_dir());
        assert!(!secret_source_file.exists());
    }

    #[tokio::test]
    async fn test_config_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let home_dir = dir.path().to_owned();
        let secret_file = dir.path().join("foo.json");
        utils::write(&secret_file, "{}").await.unwrap();
        let url = "https://example.com/spreadsheets/d/MySheetIDX";
        let created = Config::create(&home_dir, &secret_file, url).await.unwrap();

        let loaded = Config::load(created.root()).await.unwrap();
        assert_eq!("MySheetIDX", loaded.spreadsheet_id());
        assert_eq!(created.token_path(), loaded.token_path());
        assert_eq!("0.0.0.0", loaded.host());
        assert_eq!(8000, loaded.port());
    }

    #[tokio::test]
    async fn test_config_load_missing_home() {
        let dir = TempDir::new().unwrap();
        let result = Config::load(dir.path().join("nope")).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_config_load_wrong_app_name() {
        let dir = TempDir::new().unwrap();
        utils::make_dir(dir.path().join(SECRETS)).await.unwrap();
        utils::write(
            dir.path().join(CONFIG_JSON),
            r#"{"app_name":"ledger","config_version":1,"sheet_url":"https://x/d/abc"}"#,
        )
        .await
        .unwrap();
        let error = Config::load(dir.path()).await.unwrap_err();
        assert!(format!("{error:#}").contains("Invalid app_name"));
    }

    #[tokio::test]
    async fn test_config_load_with_server_overrides() {
        let dir = TempDir::new().unwrap();
        utils::make_dir(dir.path().join(SECRETS)).await.unwrap();
        utils::write(
            dir.path().join(CONFIG_JSON),
            r#"{
                "app_name": "finance-reports",
                "config_version": 1,
                "sheet_url": "https://docs.google.com/spreadsheets/d/abc123/edit",
                "token_path": "/etc/reports/token.json",
                "host": "127.0.0.1",
                "port": 9000
            }"#,
        )
        .await
        .unwrap();
        let config = Config::load(dir.path()).await.unwrap();
        assert_eq!("abc123", config.spreadsheet_id());
        assert_eq!("127.0.0.1", config.host());
        assert_eq!(9000, config.port());
        assert_eq!(PathBuf::from("/etc/reports/token.json"), config.token_path());
        assert!(config
            .client_secret_path()
            .ends_with(".secrets/client_secret.json"));
    }

    #[test]
    fn test_extract_spreadsheet_id() {
        assert_eq!(
            "1FfofGkKptykgc4",
            extract_spreadsheet_id("https://docs.google.com/spreadsheets/d/1FfofGkKptykgc4?gid=0")
                .unwrap()
        );
        assert_eq!(
            "abc",
            extract_spreadsheet_id("https://docs.google.com/spreadsheets/d/abc#gid=0").unwrap()
        );
        assert!(extract_spreadsheet_id("https://docs.google.com/spreadsheets/").is_err());
        assert!(extract_spreadsheet_id("").is_err());
    }
}
