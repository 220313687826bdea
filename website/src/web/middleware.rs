use apikeys::utils::{FORM_ID_PREFIX, valid_id};
use axum::{
    Extension,
    extract::{Path, Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;
use snafu::ensure;

use crate::{
    Error, Result, ctx::Ctx, error::NotFoundSnafu, models::FormParams, run::AppState,
};

use super::SESSION_COOKIE;

/// Reads the session cookie but does not require it
pub async fn auth_middleware(cookies: CookieJar, mut req: Request, next: Next) -> Response {
    let token = cookies
        .get(SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|t| !t.is_empty());

    // Allow ctx to be always present
    req.extensions_mut().insert(Ctx::new(token));
    next.run(req).await
}

pub async fn require_auth_middleware(
    ctx: Extension<Ctx>,
    req: Request,
    next: Next,
) -> Result<Response> {
    let full_page = req.headers().get("HX-Request").is_none();

    if ctx.token().is_none() {
        if full_page {
            let url = format!("/login?redirect={}", urlencoding::encode(req.uri().path()));
            return Ok(Redirect::to(&url).into_response());
        } else {
            return Err(Error::LoginRequired);
        }
    }

    Ok(next.run(req).await)
}

pub async fn form_middleware(
    state: State<AppState>,
    params: Path<FormParams>,
    mut req: Request,
    next: Next,
) -> Result<Response> {
    ensure!(
        valid_id(FORM_ID_PREFIX, &params.form_id),
        NotFoundSnafu {
            msg: "Form not found."
        }
    );

    let form = state.forms.get(&params.form_id)?;

    req.extensions_mut().insert(form);
    Ok(next.run(req).await)
}
