mod config;
mod ctx;
mod error;
mod forms;
mod models;
mod run;
mod services;
mod web;

#[cfg(test)]
mod test_utils;

use std::process;

use config::Config;
use tracing::error;

// Re-exports
pub use error::{Error, Result};

use crate::run::run;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_target(false)
        .compact()
        .init();

    // A missing .env file is fine, the environment may be set already
    let _ = dotenvy::dotenv();

    let config = match Config::build() {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration error: {e}");
            process::exit(1);
        }
    };

    if let Err(e) = run(config).await {
        error!("Application error: {e}");
        process::exit(1);
    }
}
