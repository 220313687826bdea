use askama::Template;
use axum::{body::Body, http::StatusCode, response::Response};

use crate::{Error, error::ErrorInfo, models::TemplateData};

#[derive(Clone, Template)]
#[template(path = "pages/error.html")]
struct ErrorPageTemplate {
    t: TemplateData,
    error: ErrorInfo,
}

#[derive(Clone, Template)]
#[template(path = "widgets/error.html")]
struct ErrorWidgetTemplate {
    error: ErrorInfo,
}

#[derive(Clone, Template)]
#[template(path = "widgets/error_message.html")]
struct ErrorMessageTemplate {
    message: String,
}

pub async fn error_handler() -> Response<Body> {
    handle_error(
        ErrorInfo {
            status_code: StatusCode::NOT_FOUND,
            title: String::from("Not Found"),
            message: String::from("The page you are looking for cannot be found."),
        },
        true,
    )
}

/// Render an error page or an error widget
pub fn handle_error(error: ErrorInfo, full_page: bool) -> Response<Body> {
    let status_code = error.status_code;
    let fallback = error.message.clone();

    let rendered = if full_page {
        let t = TemplateData::new(&error.title);
        ErrorPageTemplate { t, error }.render()
    } else {
        ErrorWidgetTemplate { error }.render()
    };

    html_response(status_code, rendered.unwrap_or(fallback))
}

/// Render a simple error message
pub fn handle_error_message(error: &Error) -> Response<Body> {
    let error_info: ErrorInfo = error.into();
    let tpl = ErrorMessageTemplate {
        message: error_info.message.clone(),
    };

    html_response(
        error_info.status_code,
        tpl.render().unwrap_or(error_info.message),
    )
}

fn html_response(status_code: StatusCode, body: String) -> Response<Body> {
    Response::builder()
        .status(status_code)
        .header("Content-Type", "text/html; charset=utf-8")
        .body(Body::from(body))
        .unwrap_or_default()
}
