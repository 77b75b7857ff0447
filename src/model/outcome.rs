//! `Outcome` makes the "degrade to a default instead of failing" policy visible.
//!
//! A malformed cell becomes `0.0` and a failed range fetch becomes an empty grid, exactly as if
//! the data had been blank. The difference is that the degraded case carries the reason, so that
//! callers and tests can tell the two apart when they care to.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome<T> {
    /// The value was obtained normally.
    Ok(T),
    /// The value is a stand-in default; `reason` says what went wrong.
    Degraded { value: T, reason: String },
}

impl<T> Outcome<T> {
    pub fn degraded(value: T, reason: impl Into<String>) -> Self {
        Outcome::Degraded {
            value,
            reason: reason.into(),
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Outcome::Degraded { .. })
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Outcome::Ok(_) => None,
            Outcome::Degraded { reason, .. } => Some(reason),
        }
    }

    pub fn value(&self) -> &T {
        match self {
            Outcome::Ok(value) | Outcome::Degraded { value, .. } => value,
        }
    }

    /// Discards the distinction and returns the value.
    pub fn into_value(self) -> T {
        match self {
            Outcome::Ok(value) | Outcome::Degraded { value, .. } => value,
        }
    }
}

impl<T: Default> Outcome<T> {
    /// Converts a `Result` into an `Outcome`, substituting `T::default()` for an error.
    pub fn or_default(result: crate::Result<T>) -> Self {
        match result {
            Ok(value) => Outcome::Ok(value),
            Err(e) => Outcome::degraded(T::default(), format!("{e:#}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn test_or_default_keeps_reason() {
        let outcome: Outcome<Vec<u8>> = Outcome::or_default(Err(anyhow!("range not found")));
        assert!(outcome.is_degraded());
        assert_eq!(Some("range not found"), outcome.reason());
        assert!(outcome.into_value().is_empty());
    }
}
