use apikeys::dto::{CreateTokenDto, GeneratedTokenDto, TokenConfigDto};
use async_trait::async_trait;
use reqwest::Client;
use snafu::ResultExt;

use crate::{
    Error, Result,
    error::{HttpClientSnafu, HttpResponseParseSnafu},
};

use super::handle_response_error;

pub const SESSION_TOKEN_HEADER: &str = "Coder-Session-Token";

/// Token service the create-token form talks to.
///
/// `session` is the caller's session token issued by the host application.
#[async_trait]
pub trait TokenService: Send + Sync {
    async fn token_config(&self, session: &str) -> Result<TokenConfigDto>;

    async fn create_token(&self, session: &str, data: &CreateTokenDto)
    -> Result<GeneratedTokenDto>;
}

/// Token service backed by the deployment's REST API
pub struct ApiTokenService {
    client: Client,
    api_url: String,
}

impl ApiTokenService {
    pub fn new(client: Client, api_url: &str) -> Self {
        Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl TokenService for ApiTokenService {
    async fn token_config(&self, session: &str) -> Result<TokenConfigDto> {
        let url = format!("{}/api/v2/users/me/keys/tokens/tokenconfig", &self.api_url);

        let response = self
            .client
            .get(url)
            .header(SESSION_TOKEN_HEADER, session)
            .send()
            .await
            .context(HttpClientSnafu {
                msg: "Unable to load token settings. Try again later.",
            })?;

        if !response.status().is_success() {
            let not_found = Error::NotFound {
                msg: "Token settings not found.".to_string(),
            };
            return Err(handle_response_error(response, "tokens", not_found).await);
        }

        let config = response
            .json::<TokenConfigDto>()
            .await
            .context(HttpResponseParseSnafu {
                msg: "Unable to parse token settings.",
            })?;

        Ok(config)
    }

    async fn create_token(
        &self,
        session: &str,
        data: &CreateTokenDto,
    ) -> Result<GeneratedTokenDto> {
        let url = format!("{}/api/v2/users/me/keys/tokens", &self.api_url);

        let response = self
            .client
            .post(url)
            .header(SESSION_TOKEN_HEADER, session)
            .json(data)
            .send()
            .await
            .context(HttpClientSnafu {
                msg: "Unable to create token. Try again later.",
            })?;

        if !response.status().is_success() {
            let not_found = Error::NotFound {
                msg: "User not found.".to_string(),
            };
            return Err(handle_response_error(response, "tokens", not_found).await);
        }

        let token = response
            .json::<GeneratedTokenDto>()
            .await
            .context(HttpResponseParseSnafu {
                msg: "Unable to parse token information.",
            })?;

        Ok(token)
    }
}
