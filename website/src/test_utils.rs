use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use apikeys::dto::{CreateTokenDto, GeneratedTokenDto, TokenConfigDto};
use apikeys::lifetime::NANOS_PER_DAY;
use async_trait::async_trait;
use tokio::sync::{Notify, Semaphore};

use crate::config::{Config, ServerConfig};
use crate::forms::FormRegistry;
use crate::run::AppState;
use crate::services::tokens::TokenService;
use crate::{Error, Result};

pub const SESSION: &str = "test-session";
pub const JWT_SECRET: &str = "test-secret";

pub fn config_days(days: i64) -> TokenConfigDto {
    TokenConfigDto {
        max_token_lifetime: days * NANOS_PER_DAY,
    }
}

/// Holds a create call until the test releases it
pub struct Gate {
    pub entered: Notify,
    pub release: Semaphore,
}

enum Outcome {
    Key(String),
    Fail(String),
}

/// Token service double counting the calls it receives
pub struct StubTokenService {
    config: Option<TokenConfigDto>,
    outcome: Outcome,
    gate: Option<Arc<Gate>>,
    requests: Mutex<Vec<CreateTokenDto>>,
    pub config_calls: AtomicUsize,
    pub create_calls: AtomicUsize,
}

impl StubTokenService {
    fn new(outcome: Outcome) -> Self {
        Self {
            config: Some(config_days(90)),
            outcome,
            gate: None,
            requests: Mutex::new(Vec::new()),
            config_calls: AtomicUsize::new(0),
            create_calls: AtomicUsize::new(0),
        }
    }

    pub fn resolving(key: &str) -> Self {
        Self::new(Outcome::Key(key.to_string()))
    }

    pub fn rejecting(message: &str) -> Self {
        Self::new(Outcome::Fail(message.to_string()))
    }

    pub fn with_config(mut self, config: TokenConfigDto) -> Self {
        self.config = Some(config);
        self
    }

    /// Token settings fail to load
    pub fn without_config(mut self) -> Self {
        self.config = None;
        self
    }

    pub fn gated(mut self) -> (Self, Arc<Gate>) {
        let gate = Arc::new(Gate {
            entered: Notify::new(),
            release: Semaphore::new(0),
        });
        self.gate = Some(gate.clone());
        (self, gate)
    }

    pub fn requests(&self) -> Vec<CreateTokenDto> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl TokenService for StubTokenService {
    async fn token_config(&self, _session: &str) -> Result<TokenConfigDto> {
        self.config_calls.fetch_add(1, Ordering::SeqCst);
        match &self.config {
            Some(config) => Ok(config.clone()),
            None => Err(Error::Service {
                msg: "Unable to load token settings. Try again later.".to_string(),
            }),
        }
    }

    async fn create_token(
        &self,
        _session: &str,
        data: &CreateTokenDto,
    ) -> Result<GeneratedTokenDto> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(data.clone());

        if let Some(gate) = &self.gate {
            gate.entered.notify_one();
            let permit = gate.release.acquire().await.unwrap();
            permit.forget();
        }

        match &self.outcome {
            Outcome::Key(key) => Ok(GeneratedTokenDto { key: key.clone() }),
            Outcome::Fail(msg) => Err(Error::BadRequest { msg: msg.clone() }),
        }
    }
}

pub fn test_state(tokens: Arc<StubTokenService>) -> AppState {
    AppState {
        config: Arc::new(Config {
            server: ServerConfig { port: 3000 },
            jwt_secret: JWT_SECRET.to_string(),
            api_url: "http://127.0.0.1:9".to_string(),
            frontend_dir: PathBuf::from("."),
        }),
        tokens,
        forms: FormRegistry::new(),
    }
}
