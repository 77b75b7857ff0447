//! `finance-reports auth` runs the OAuth consent flow. `finance-reports auth --verify` checks the
//! saved token without ever opening a browser.

use crate::api::{self, Mode, Prompt, TokenProvider};
use crate::commands::Out;
use crate::error::{ErrorType, IntoResult};
use crate::{Config, Result};
use anyhow::Context;

/// Runs the consent flow and saves `token.json`. This is the only command that asks the user to
/// open a browser.
///
/// # Errors
/// Returns an error if `client_secret.json` is missing or the flow fails.
pub async fn auth(config: &Config) -> Result<Out<()>> {
    TokenProvider::initialize(&config.client_secret_path(), &config.token_path())
        .await
        .pub_result(ErrorType::Auth)?;
    Ok(format!("Tokens saved to {}", config.token_path().display()).into())
}

/// Loads the saved token, refreshes it and reads the tab titles to prove access to the sheet.
///
/// # Errors
/// Fails, rather than prompting, when the token is missing, lacks a scope or cannot be refreshed.
pub async fn auth_verify(config: Config, mode: Mode) -> Result<Out<Vec<String>>> {
    let authenticator = api::authenticator(config, mode);
    let mut sheet = authenticator
        .authenticate(Prompt::Never)
        .await
        .context(
            "Unable to use the saved token. \n\n\
            You should run 'finance-reports auth' (without the --verify flag).",
        )
        .pub_result(ErrorType::Auth)?;
    let titles = sheet.titles().await.context("Unable to read the sheet")?;
    Ok(Out::new(
        format!("Your OAuth token is valid, the sheet has {} tabs", titles.len()),
        titles,
    ))
}
