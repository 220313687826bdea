use snafu::ensure;
use std::env;
use std::path::PathBuf;

use crate::Result;
use crate::error::ConfigSnafu;

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub jwt_secret: String,
    pub api_url: String,
    pub frontend_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

impl Config {
    pub fn build() -> Result<Self> {
        // Build the config from ENV vars
        let jwt_secret = env::var("JWT_SECRET").unwrap_or_default();
        let api_url = env::var("API_URL").unwrap_or_default();
        let port = env::var("PORT")
            .ok()
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(0);
        let frontend_dir: PathBuf = env::var("FRONTEND_DIR").unwrap_or_default().into();

        // Validate config values
        ensure!(
            !jwt_secret.is_empty(),
            ConfigSnafu {
                msg: "JWT_SECRET is required.".to_string()
            }
        );

        ensure!(
            !api_url.is_empty(),
            ConfigSnafu {
                msg: "API_URL is required.".to_string()
            }
        );

        ensure!(
            port > 0,
            ConfigSnafu {
                msg: "PORT must be a valid port number.".to_string()
            }
        );

        ensure!(
            frontend_dir.is_dir(),
            ConfigSnafu {
                msg: "FRONTEND_DIR does not exist.".to_string()
            }
        );

        Ok(Config {
            server: ServerConfig { port },
            jwt_secret,
            api_url: api_url.trim_end_matches('/').to_string(),
            frontend_dir,
        })
    }
}
