pub mod token;
pub mod tokens;

use apikeys::dto::ApiErrorDto;
use reqwest::StatusCode;
use snafu::ResultExt;

use crate::{Error, Result, error::HttpResponseParseSnafu};

pub async fn handle_response_error(
    response: reqwest::Response,
    resource: &str,
    not_found: Error,
) -> Error {
    // Assumes that ok responses are already handled
    match response.status() {
        StatusCode::BAD_REQUEST => {
            let message_res = parse_response_error(response).await;
            match message_res {
                Ok(msg) => Error::BadRequest { msg },
                Err(_) => Error::BadRequest {
                    msg: "Bad Request.".to_string(),
                },
            }
        }
        StatusCode::UNAUTHORIZED => Error::LoginRequired,
        StatusCode::FORBIDDEN => Error::Forbidden {
            msg: format!("You have no permissions to manage {}.", resource),
        },
        StatusCode::NOT_FOUND => not_found,
        _ => Error::Service {
            msg: "Service error. Try again later.".to_string(),
        },
    }
}

pub async fn parse_response_error(response: reqwest::Response) -> Result<String> {
    let Some(content_type) = response.headers().get("Content-Type") else {
        return Err(Error::Service {
            msg: "Unable to identify service response type".to_string(),
        });
    };

    let Ok(content_type) = content_type.to_str() else {
        return Err(Error::Service {
            msg: "Unable to identify service response type".to_string(),
        });
    };

    if content_type.starts_with("application/json") {
        // Expected response when properly handled by the backend service
        let json = response
            .json::<ApiErrorDto>()
            .await
            .context(HttpResponseParseSnafu {
                msg: "Unable to parse error response.",
            })?;

        return match json.detail {
            Some(detail) if !detail.is_empty() => Ok(format!("{} {}", json.message, detail)),
            _ => Ok(json.message),
        };
    }

    if content_type.starts_with("text/plain") {
        // Probably some default http error
        return match response.text().await {
            Ok(text) => Ok(text),
            Err(_) => Err(Error::Service {
                msg: "Unable to parse text service error response".to_string(),
            }),
        };
    }

    Err(Error::Service {
        msg: "Unable to parse service error response".to_string(),
    })
}
