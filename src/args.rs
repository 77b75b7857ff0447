//! These structs provide the CLI interface for the finance-reports CLI.

use clap::{Parser, Subcommand};
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::error;
use tracing::level_filters::LevelFilter;

/// finance-reports: Monthly accounting reports from a Google Sheet.
///
/// The program reads the comparison, outstanding and settings tabs of a monthly accounting
/// workbook, computes the dashboard KPIs and serves everything as JSON over HTTP.
///
/// You will need a Google Cloud OAuth client (Desktop App) with the Sheets API enabled. Download
/// its credentials and pass them to `finance-reports init`.
#[derive(Debug, Parser, Clone)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn new(common: Common, command: Command) -> Self {
        Self { common, command }
    }

    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the home directory and initialize the configuration files.
    ///
    /// Run this first. It needs the URL of the Google Sheet (--sheet-url) and the OAuth client
    /// credentials downloaded from Google Cloud Console (--client-secret). The credentials file is
    /// moved into $FINANCE_REPORTS_HOME/.secrets.
    Init(InitArgs),
    /// Authenticate with Google Sheets via OAuth.
    Auth(AuthArgs),
    /// Download every report tab once and print the result as JSON.
    Sync,
    /// Run the HTTP API.
    Serve(ServeArgs),
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The directory where the configuration and OAuth files are kept. Defaults to
    /// ~/finance-reports
    #[arg(long, env = "FINANCE_REPORTS_HOME", default_value_t = default_home())]
    home: DisplayPath,
}

impl Common {
    pub fn new(log_level: LevelFilter, home: PathBuf) -> Self {
        Self {
            log_level,
            home: home.into(),
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn home(&self) -> &DisplayPath {
        &self.home
    }
}

/// (Not shown): Args for the `finance-reports init` command.
#[derive(Debug, Parser, Clone)]
pub struct InitArgs {
    /// The URL of the Google Sheet. It looks like this:
    /// https://docs.google.com/spreadsheets/d/7KpXm2RfZwNJgs84QhVYno5DU6iM9Wlr3bCzAv1txRpL
    #[arg(long)]
    sheet_url: String,

    /// The path to the downloaded OAuth client credentials. The file is moved into the secrets
    /// directory.
    #[arg(long)]
    client_secret: PathBuf,
}

impl InitArgs {
    pub fn new(sheet_url: impl Into<String>, client_secret: impl Into<PathBuf>) -> Self {
        Self {
            sheet_url: sheet_url.into(),
            client_secret: client_secret.into(),
        }
    }

    pub fn sheet_url(&self) -> &str {
        &self.sheet_url
    }

    pub fn client_secret(&self) -> &Path {
        &self.client_secret
    }
}

/// (Not shown): Args for the `finance-reports auth` command.
#[derive(Debug, Parser, Clone)]
pub struct AuthArgs {
    /// Verify and refresh the saved token without opening a browser.
    #[arg(long)]
    verify: bool,
}

impl AuthArgs {
    pub fn new(verify: bool) -> Self {
        Self { verify }
    }

    pub fn verify(&self) -> bool {
        self.verify
    }
}

/// (Not shown): Args for the `finance-reports serve` command.
#[derive(Debug, Default, Parser, Clone)]
pub struct ServeArgs {
    /// The address to bind, overrides `host` in config.json. Defaults to 0.0.0.0
    #[arg(long, env = "FINANCE_REPORTS_HOST")]
    host: Option<String>,

    /// The port to listen on, overrides `port` in config.json. Defaults to 8000
    #[arg(long, env = "FINANCE_REPORTS_PORT")]
    port: Option<u16>,
}

impl ServeArgs {
    pub fn new(host: Option<String>, port: Option<u16>) -> Self {
        Self { host, port }
    }

    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }
}

fn default_home() -> DisplayPath {
    DisplayPath(match dirs::home_dir() {
        Some(home) => home.join("finance-reports"),
        None => {
            error!(
                "There was an error when trying to get your home directory. You can get around \
                this by providing --home or FINANCE_REPORTS_HOME. If you continue using the \
                program right now, you may have problems!",
            );
            PathBuf::from("finance-reports")
        }
    })
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DisplayPath(PathBuf);

impl From<PathBuf> for DisplayPath {
    fn from(value: PathBuf) -> Self {
        DisplayPath(value)
    }
}

impl Deref for DisplayPath {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<Path> for DisplayPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Display for DisplayPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_string_lossy())
    }
}

impl FromStr for DisplayPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(PathBuf::from(s)))
    }
}

impl DisplayPath {
    pub fn path(&self) -> &Path {
        &self.0
    }
}
