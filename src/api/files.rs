//! The two OAuth files kept in `$FINANCE_REPORTS_HOME/.secrets`:
//! - `client_secret.json`: the Desktop App credentials downloaded from Google Cloud Console
//! - `token.json`: the access and refresh tokens we receive at the end of the consent flow

use crate::api::OAUTH_SCOPES;
use crate::{utils, Result};
use anyhow::{bail, Context};
use chrono::{DateTime, TimeDelta, Utc};
use serde::de::{DeserializeOwned, Error};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt::Debug;
use std::path::{Path, PathBuf};

/// The loopback redirect that must be registered on the OAuth client. Google accepts any port on
/// a registered loopback redirect, which is how the callback server can pick its own.
const REDIRECT: &str = "http://localhost";

/// Tokens this close to expiry are treated as expired.
const EXPIRY_MARGIN_MINUTES: i64 = 5;

/// JSON data together with the path it was loaded from, so that it can be written back.
#[derive(Default, Debug, Clone)]
pub(super) struct File<F>
where
    F: Serialize + DeserializeOwned + Clone + Debug,
{
    path: PathBuf,
    data: F,
}

impl<F> File<F>
where
    F: Serialize + DeserializeOwned + Clone + Debug,
{
    pub(super) async fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let data: F = utils::deserialize(&path).await?;
        Ok(Self { path, data })
    }

    pub(super) fn new(path: impl Into<PathBuf>, data: F) -> Self {
        Self {
            path: path.into(),
            data,
        }
    }

    /// Writes the data back to `path`. On Unix the file is made readable by the owner only.
    pub(super) async fn save(&self) -> Result<()> {
        let json =
            serde_json::to_string_pretty(&self.data).context("Failed to serialize data to JSON")?;
        utils::write(&self.path, json).await?;

        #[cfg(unix)]
        {
            use std::fs::Permissions;
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&self.path, Permissions::from_mode(0o600))
                .await
                .with_context(|| format!("Failed to set permissions on {}", self.path.display()))?;
        }

        Ok(())
    }

    pub(super) fn data(&self) -> &F {
        &self.data
    }

    pub(super) fn data_mut(&mut self) -> &mut F {
        &mut self.data
    }

    pub(super) fn path(&self) -> &Path {
        &self.path
    }
}

/// The `client_secret.json` file downloaded from Google Cloud Console for a Desktop App client.
/// Google wraps the credentials in an `installed` object:
///
/// ```json
/// {
///   "installed": {
///     "client_id": "1234.apps.googleusercontent.com",
///     "client_secret": "GOCSPX-abc",
///     "redirect_uris": ["http://localhost"],
///     "auth_uri": "https://accounts.google.com/o/oauth2/auth",
///     "token_uri": "https://oauth2.googleapis.com/token"
///   }
/// }
/// ```
#[derive(Default, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) struct SecretFile {
    installed: InstalledCredentials,
}

impl SecretFile {
    pub(crate) async fn load(path: &Path) -> Result<SecretFile> {
        utils::deserialize(path)
            .await
            .with_context(|| format!("Unable to read the OAuth client secret {}", path.display()))
    }

    pub(super) fn client_id(&self) -> &str {
        &self.installed.client_id
    }

    pub(super) fn client_secret(&self) -> &str {
        &self.installed.client_secret
    }

    pub(super) fn auth_uri(&self) -> &str {
        &self.installed.auth_uri
    }

    pub(super) fn token_uri(&self) -> &str {
        &self.installed.token_uri
    }
}

#[derive(Default, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
struct InstalledCredentials {
    client_id: String,
    client_secret: String,
    #[serde(deserialize_with = "loopback_redirects")]
    redirect_uris: Vec<String>,
    auth_uri: String,
    token_uri: String,
}

/// Rejects a client that has no plain loopback redirect, because the consent flow could never
/// complete with it.
fn loopback_redirects<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let uris = Vec::<String>::deserialize(deserializer)?;
    if !uris.iter().any(|s| s == REDIRECT || s == "http://127.0.0.1") {
        return Err(D::Error::custom(format!(
            "The OAuth client has no '{REDIRECT}' redirect URI. Add '{REDIRECT}' to the \
            redirect URIs of the Desktop App client and download client_secret.json again"
        )));
    }
    Ok(uris)
}

/// The tokens received from Google, in our own shape rather than Google's.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(super) struct TokenFile {
    scopes: Vec<String>,
    access_token: String,
    refresh_token: String,
    expires_at: DateTime<Utc>,
}

impl TokenFile {
    /// Loads `token.json` and checks that it was granted every scope the app needs.
    pub(super) async fn load(p: impl AsRef<Path>) -> Result<File<Self>> {
        let file: File<Self> = File::load(p.as_ref())
            .await
            .context("Unable to load the OAuth token file")?;
        file.data().validate_scopes()?;
        Ok(file)
    }

    fn validate_scopes(&self) -> Result<()> {
        for &required in OAUTH_SCOPES {
            if !self.scopes.iter().any(|s| s == required) {
                bail!("OAuth scope '{required}' is missing, run 'finance-reports auth' again");
            }
        }
        Ok(())
    }

    pub(super) fn new(
        scopes: Vec<String>,
        access_token: String,
        refresh_token: String,
        expires_in: TimeDelta,
    ) -> Self {
        Self {
            scopes,
            access_token,
            refresh_token,
            expires_at: Utc::now() + expires_in,
        }
    }

    pub(super) fn access_token(&self) -> &str {
        &self.access_token
    }

    pub(super) fn refresh_token(&self) -> &str {
        &self.refresh_token
    }

    pub(super) fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub(super) fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now() + TimeDelta::minutes(EXPIRY_MARGIN_MINUTES)
    }

    /// Google only sends a new refresh token occasionally, so the old one is kept when `None`.
    pub(super) fn update(
        &mut self,
        access_token: String,
        expires_in: TimeDelta,
        refresh_token: Option<String>,
    ) {
        self.access_token = access_token;
        self.expires_at = Utc::now() + expires_in;
        if let Some(rt) = refresh_token {
            self.refresh_token = rt;
        }
    }
}
