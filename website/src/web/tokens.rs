use apikeys::dto::TokenConfigDto;
use apikeys::lifetime::{LifetimeOption, default_choice, format_days, lifetime_options};
use askama::Template;
use axum::http::StatusCode;
use axum::{Extension, Form, body::Body, extract::State, response::Response};
use chrono::{TimeDelta, Utc};
use snafu::{OptionExt, ResultExt};
use tracing::{info, warn};

use crate::{
    Error, Result,
    ctx::Ctx,
    error::{ErrorInfo, FormNotReadySnafu, LoginRequiredSnafu, ResponseBuilderSnafu, TemplateSnafu},
    forms::{CreateTokenForm, FormState, TokenFormValues, failure_message},
    models::{CreateTokenFormData, TemplateData},
    run::AppState,
    services::token::{create_form_token, verify_form_token},
};

use super::{TOKENS_URL, handle_error_message};

const DATE_FORMAT: &str = "%Y-%m-%d";

fn form_url(form_id: &str) -> String {
    format!("{}/new/{}", TOKENS_URL, form_id)
}

fn html_response(status: StatusCode, body: String) -> Result<Response<Body>> {
    Response::builder()
        .status(status)
        .header("Content-Type", "text/html; charset=utf-8")
        .body(Body::from(body))
        .context(ResponseBuilderSnafu)
}

#[derive(Template)]
#[template(path = "pages/new_token.html")]
struct NewTokenPageTemplate {
    t: TemplateData,
    form_id: String,
    form_url: String,
}

/// Mounts a new form and renders the page shell; the form loads itself
pub async fn new_token_page_handler(State(state): State<AppState>) -> Result<Response<Body>> {
    let form = state.forms.mount();
    info!(form_id = %form.id(), "Create token form mounted");

    let tpl = NewTokenPageTemplate {
        t: TemplateData::new("Create Token"),
        form_id: form.id().to_string(),
        form_url: format!("{}/form", form_url(form.id())),
    };

    html_response(StatusCode::OK, tpl.render().context(TemplateSnafu)?)
}

#[derive(Template)]
#[template(path = "widgets/create_token_form.html")]
struct CreateTokenFormTemplate {
    action: String,
    cancel_action: String,
    payload: CreateTokenFormData,
    expires_at: String,
    min_date: String,
    max_date: String,
    lifetime_options: Vec<LifetimeOption>,
    expires_on: String,
    max_lifetime: String,
    submitting: bool,
    error_message: Option<String>,
}

#[derive(Template)]
#[template(path = "widgets/create_token_success.html")]
struct CreateTokenSuccessTemplate {
    key: String,
    continue_url: String,
}

#[derive(Template)]
#[template(path = "widgets/create_token_load_error.html")]
struct CreateTokenLoadErrorTemplate {
    reload_url: String,
    message: String,
}

struct FormView<'a> {
    values: Option<&'a TokenFormValues>,
    submitting: bool,
    error_message: Option<String>,
}

fn render_form(
    state: &AppState,
    form: &CreateTokenForm,
    config: &TokenConfigDto,
    view: FormView<'_>,
    status: StatusCode,
) -> Result<Response<Body>> {
    let now = Utc::now();

    // Any token issued for this form id is accepted
    let token = create_form_token(form.id(), &state.config.jwt_secret)?;

    let choice = match view.values {
        Some(values) => values.lifetime.clone(),
        None => default_choice(config, now),
    };

    let mut payload = CreateTokenFormData {
        token,
        lifetime: choice.value(),
        expires_at: choice.custom_date(),
        ..Default::default()
    };
    if let Some(values) = view.values {
        payload = payload.with_values(values);
    }

    let max_date = now + TimeDelta::nanoseconds(config.max_token_lifetime);
    let action = form_url(form.id());

    let tpl = CreateTokenFormTemplate {
        cancel_action: format!("{}/cancel", action),
        action,
        expires_at: payload.expires_at.clone().unwrap_or_default(),
        payload,
        min_date: now.format(DATE_FORMAT).to_string(),
        max_date: max_date.format(DATE_FORMAT).to_string(),
        lifetime_options: lifetime_options(config, &choice),
        expires_on: choice.expires_on(now).format("%B %-d, %Y").to_string(),
        max_lifetime: format_days(config.max_token_lifetime),
        submitting: view.submitting,
        error_message: view.error_message,
    };

    html_response(status, tpl.render().context(TemplateSnafu)?)
}

fn render_success(key: &str) -> Result<Response<Body>> {
    let tpl = CreateTokenSuccessTemplate {
        key: key.to_string(),
        continue_url: TOKENS_URL.to_string(),
    };

    html_response(StatusCode::OK, tpl.render().context(TemplateSnafu)?)
}

/// Loads the token settings then renders the interactive form
pub async fn token_form_handler(
    Extension(ctx): Extension<Ctx>,
    Extension(form): Extension<CreateTokenForm>,
    State(state): State<AppState>,
) -> Result<Response<Body>> {
    let snapshot = form.snapshot();
    if let FormState::Success { key } = &snapshot.state {
        return render_success(key);
    }

    let config = match snapshot.config {
        Some(config) => config,
        None => {
            let session = ctx.token().context(LoginRequiredSnafu)?;
            match state.tokens.token_config(session).await {
                Ok(config) => config,
                Err(err) => {
                    warn!(form_id = %form.id(), "Failed to load token settings: {}", err);

                    // Form stays in loading until a retry succeeds
                    let error_info = ErrorInfo::from(&err);
                    let tpl = CreateTokenLoadErrorTemplate {
                        reload_url: format!("{}/form", form_url(form.id())),
                        message: error_info.message,
                    };
                    return html_response(
                        error_info.status_code,
                        tpl.render().context(TemplateSnafu)?,
                    );
                }
            }
        }
    };

    let view = match form.mark_ready(config.clone()) {
        FormState::Success { key } => return render_success(&key),
        FormState::Submitting => FormView {
            values: snapshot.values.as_ref(),
            submitting: true,
            error_message: None,
        },
        FormState::Error { message } => FormView {
            values: snapshot.values.as_ref(),
            submitting: false,
            error_message: Some(message),
        },
        FormState::Loading | FormState::Idle => FormView {
            values: snapshot.values.as_ref(),
            submitting: false,
            error_message: snapshot.validation_message.clone(),
        },
    };

    render_form(&state, &form, &config, view, StatusCode::OK)
}

pub async fn post_create_token_handler(
    Extension(ctx): Extension<Ctx>,
    Extension(form): Extension<CreateTokenForm>,
    State(state): State<AppState>,
    payload: Form<CreateTokenFormData>,
) -> Result<Response<Body>> {
    verify_form_token(&payload.token, &state.config.jwt_secret, form.id())?;

    let session = ctx.token().context(LoginRequiredSnafu)?;
    let config = form.snapshot().config.context(FormNotReadySnafu)?;

    let values = match payload.values() {
        Ok(values) => values,
        Err(err) => {
            let fallback = TokenFormValues {
                name: payload.name.clone(),
                lifetime: default_choice(&config, Utc::now()),
            };
            form.reject(fallback.clone(), &err.to_string());

            let view = FormView {
                values: Some(&fallback),
                submitting: false,
                error_message: Some(err.to_string()),
            };
            return render_form(&state, &form, &config, view, StatusCode::from(&err));
        }
    };

    match form.submit(&*state.tokens, session, values.clone()).await {
        Ok(token) => {
            info!(form_id = %form.id(), "Token created");
            render_success(&token.key)
        }
        Err(Error::TokenAlreadyCreated) => match form.state() {
            FormState::Success { key } => render_success(&key),
            _ => Err(Error::TokenAlreadyCreated),
        },
        Err(err @ (Error::SubmitInFlight | Error::FormNotReady)) => Ok(handle_error_message(&err)),
        Err(err @ (Error::FormUnmounted | Error::LoginRequired)) => Err(err),
        Err(err) => {
            let view = FormView {
                values: Some(&values),
                submitting: false,
                error_message: Some(failure_message(&err)),
            };
            render_form(&state, &form, &config, view, StatusCode::from(&err))
        }
    }
}

/// Unmounts the form, any pending token result is discarded
pub async fn cancel_token_handler(
    Extension(form): Extension<CreateTokenForm>,
    State(state): State<AppState>,
) -> Result<Response<Body>> {
    state.forms.unmount(form.id());

    Response::builder()
        .status(200)
        .header("HX-Redirect", TOKENS_URL)
        .body(Body::from("".to_string()))
        .context(ResponseBuilderSnafu)
}
