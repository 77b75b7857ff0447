//! Error handling. Internally everything is an `anyhow::Error`. Errors that cross a public
//! boundary (CLI exit, HTTP response) are tagged with an `ErrorType` so that the caller can decide
//! how to present them.

use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display, Formatter};

pub type Error = anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;
pub(crate) type Res<T> = Result<T>;

/// The broad category of a public-facing error.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    /// There is no usable OAuth session.
    Auth,
    /// The configuration or the home directory is missing or invalid.
    Config,
    /// The Google Sheets API failed.
    Sheets,
    /// The caller asked for something that does not exist.
    Request,
    /// Anything else.
    #[default]
    Internal,
}

serde_plain::derive_display_from_serialize!(ErrorType);
serde_plain::derive_fromstr_from_deserialize!(ErrorType);

/// An `anyhow::Error` tagged with an `ErrorType`. This is carried inside of an `anyhow::Error` so
/// that it can be found again with `downcast_ref`.
#[derive(Debug)]
pub struct PubError {
    error_type: ErrorType,
    inner: Error,
}

impl PubError {
    pub fn error_type(&self) -> ErrorType {
        self.error_type
    }
}

impl Display for PubError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        // Show the whole context chain, the way `{:#}` does for anyhow.
        write!(f, "{:#}", self.inner)
    }
}

impl std::error::Error for PubError {}

/// Tags the error of a `Result` with an `ErrorType`.
pub trait IntoResult<T> {
    fn pub_result(self, error_type: ErrorType) -> Result<T>;
}

impl<T> IntoResult<T> for Result<T> {
    fn pub_result(self, error_type: ErrorType) -> Result<T> {
        self.map_err(|inner| {
            // Do not re-tag an error that already carries a type.
            if inner.downcast_ref::<PubError>().is_some() {
                return inner;
            }
            anyhow::Error::new(PubError { error_type, inner })
        })
    }
}

/// Finds the `ErrorType` of `e`, or `ErrorType::Internal` if it was never tagged.
pub fn error_type(e: &Error) -> ErrorType {
    e.chain()
        .find_map(|cause| cause.downcast_ref::<PubError>())
        .map(PubError::error_type)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{anyhow, Context};

    #[test]
    fn test_untagged_is_internal() {
        let e = anyhow!("boom");
        assert_eq!(ErrorType::Internal, error_type(&e));
    }

    #[test]
    fn test_tagged_survives_context() {
        let r: Result<()> = Err(anyhow!("no token"));
        let e = r
            .pub_result(ErrorType::Auth)
            .context("Unable to sync")
            .unwrap_err();
        assert_eq!(ErrorType::Auth, error_type(&e));
    }

    #[test]
    fn test_first_tag_wins() {
        let r: Result<()> = Err(anyhow!("bad url"));
        let e = r
            .pub_result(ErrorType::Config)
            .pub_result(ErrorType::Internal)
            .unwrap_err();
        assert_eq!(ErrorType::Config, error_type(&e));
    }

    #[test]
    fn test_display_keeps_chain() {
        let r: Result<()> = Err(anyhow!("inner"));
        let e = r.context("outer").pub_result(ErrorType::Sheets).unwrap_err();
        assert_eq!("outer: inner", e.to_string());
    }

    #[test]
    fn test_error_type_display() {
        assert_eq!("auth", ErrorType::Auth.to_string());
        assert_eq!(ErrorType::Request, "request".parse().unwrap());
    }
}
