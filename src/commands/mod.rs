//! Command handlers for the finance-reports CLI.

mod auth;
mod init;
mod serve;
mod sync;

use crate::Result;
use anyhow::Context;
use serde::Serialize;
use std::fmt::Debug;
use tracing::{debug, info};

pub use auth::{auth, auth_verify};
pub use init::init;
pub use serve::serve;
pub use sync::sync;

/// The output type for a command: a message for the user and, optionally, structured data about
/// the outcome.
#[derive(Debug, Clone, Serialize)]
pub struct Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// A message that can be printed to the user regarding the outcome of the command execution.
    message: String,

    /// Any structured data that needs to be output from the call.
    structure: Option<T>,
}

impl<T, S> From<S> for Out<T>
where
    T: Debug + Clone + Serialize,
    S: Into<String>,
{
    fn from(value: S) -> Self {
        Out::new_message(value)
    }
}

impl<T> Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// Create a new `Out` object that has `Some(structure)`.
    pub fn new<S>(message: S, structure: T) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: Some(structure),
        }
    }

    /// Create a new `Out` object that has `None` for `structure`.
    pub fn new_message<S>(message: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: None,
        }
    }

    /// Get the `message`.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the structured data stored in `structure`.
    pub fn structure(&self) -> Option<&T> {
        self.structure.as_ref()
    }

    /// Print the message to `info!` and the structured data (if it exists) as JSON to `debug!`.
    pub fn print(&self) {
        info!("{}", self.message);
        if let Some(structure) = self.structure() {
            if let Ok(json) = serde_json::to_string_pretty(structure) {
                debug!("Command output:\n\n{json}\n\n");
            }
        }
    }

    /// Print the message to `info!` and the structured data (if it exists) as JSON to stdout, so
    /// that it can be piped into other tools while the logs go to stderr.
    pub fn print_json(&self) -> Result<()> {
        info!("{}", self.message);
        if let Some(structure) = self.structure() {
            let json = serde_json::to_string_pretty(structure)
                .context("Unable to serialize the command output")?;
            println!("{json}");
        }
        Ok(())
    }
}
