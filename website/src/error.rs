use axum::http::{self, StatusCode};
use axum::{
    body::Body,
    response::{IntoResponse, Response},
};
use snafu::Snafu;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("Config error: {}", msg))]
    Config { msg: String },

    #[snafu(display("Unable to bind {}: {}", addr, source))]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    #[snafu(display("Server error: {}", source))]
    Serve { source: std::io::Error },

    #[snafu(display("Failed to render template: {}", source))]
    Template { source: askama::Error },

    #[snafu(display("Response builder error: {}", source))]
    ResponseBuilder { source: http::Error },

    #[snafu(display("{}", msg))]
    Validation { msg: String },

    #[snafu(display("{}", msg))]
    BadRequest { msg: String },

    #[snafu(display("{}", msg))]
    Forbidden { msg: String },

    #[snafu(display("{}", msg))]
    NotFound { msg: String },

    #[snafu(display("Login to continue"))]
    LoginRequired,

    #[snafu(display("{}: {}", msg, source))]
    HttpClient { msg: String, source: reqwest::Error },

    #[snafu(display("{}: {}", msg, source))]
    HttpResponseParse { msg: String, source: reqwest::Error },

    #[snafu(display("{}", msg))]
    Service { msg: String },

    #[snafu(display("Stale form data. Refresh the page and try again."))]
    CsrfToken,

    #[snafu(display("Failed to initialize form data. Refresh the page and try again."))]
    CsrfInit,

    #[snafu(display("This form has expired. Refresh the page and try again."))]
    FormExpired,

    #[snafu(display("The form is still loading."))]
    FormNotReady,

    #[snafu(display("A token is already being created."))]
    SubmitInFlight,

    #[snafu(display("The token has already been created."))]
    TokenAlreadyCreated,

    #[snafu(display("The form was closed before the token was created."))]
    FormUnmounted,
}

impl Error {
    /// Message shown to the user, without transport details
    pub fn public_message(&self) -> String {
        match self {
            Error::HttpClient { msg, .. } => msg.clone(),
            Error::HttpResponseParse { msg, .. } => msg.clone(),
            _ => self.to_string(),
        }
    }
}

/// Allow Error to be converted to StatusCode
impl From<&Error> for StatusCode {
    fn from(err: &Error) -> Self {
        match err {
            Error::Validation { .. } => StatusCode::BAD_REQUEST,
            Error::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Error::Forbidden { .. } => StatusCode::FORBIDDEN,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::LoginRequired => StatusCode::UNAUTHORIZED,
            Error::CsrfToken => StatusCode::BAD_REQUEST,
            Error::FormExpired => StatusCode::NOT_FOUND,
            Error::FormNotReady => StatusCode::CONFLICT,
            Error::SubmitInFlight => StatusCode::CONFLICT,
            Error::TokenAlreadyCreated => StatusCode::CONFLICT,
            Error::FormUnmounted => StatusCode::GONE,
            Error::Service { .. } => StatusCode::BAD_GATEWAY,
            Error::HttpClient { .. } => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// Allow errors to be rendered as response
impl IntoResponse for Error {
    fn into_response(self) -> Response<Body> {
        let info = ErrorInfo::from(&self);

        // The response mapper renders the final page or widget
        let mut res = Response::builder()
            .status(info.status_code)
            .body(Body::empty())
            .unwrap_or_default();

        res.extensions_mut().insert(info);
        res
    }
}

#[derive(Clone, Debug)]
pub struct ErrorInfo {
    pub status_code: StatusCode,
    pub title: String,
    pub message: String,
}

impl From<&Error> for ErrorInfo {
    fn from(e: &Error) -> Self {
        let status_code: StatusCode = e.into();
        Self {
            status_code,
            title: status_code
                .canonical_reason()
                .unwrap_or("Error")
                .to_string(),
            message: e.public_message(),
        }
    }
}
