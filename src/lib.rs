mod api;
pub mod args;
pub mod commands;
mod config;
mod error;
pub mod kpi;
pub mod model;
pub mod parse;
pub mod server;
pub mod sync;
mod utils;


pub use api::{authenticator, Authenticator, Mode, Prompt, Sheet, TEST_MODE_VAR};
pub use config::Config;
pub use error::{error_type, Error, ErrorType, Result};
pub use sync::Coordinator;
