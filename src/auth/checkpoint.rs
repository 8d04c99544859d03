use axum::Form;
use axum::debug_handler;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::{Html, IntoResponse, Redirect, Response};
use serde::Deserialize;

use crate::{AppResult, AppState, esc, include_res};

#[derive(Deserialize)]
pub(crate) struct CheckpointQuery {
    next: Option<String>,
}

#[derive(Deserialize)]
pub(crate) struct CheckpointForm {
    #[serde(default)]
    next: String,
}

#[debug_handler]
pub(crate) async fn checkpoint_page(
    State(app): State<AppState>,
    headers: HeaderMap,
    Query(CheckpointQuery { next }): Query<CheckpointQuery>,
) -> AppResult<Response> {
    let username = match super::require_user(&app, &headers, "/checkpoint") {
        Ok(u) => u,
        Err(to) => return Ok(to),
    };

    let next = super::safe_path(next.as_deref().unwrap_or("/search"));
    let body = include_res!(str, "/pages/checkpoint.html")
        .replace("{brand}", &esc(&app.site.brand_name))
        .replace("{nav}", &super::nav(&username))
        .replace("{next}", &esc(&next));
    Ok(Html(body).into_response())
}

#[debug_handler]
pub(crate) async fn checkpoint(
    State(app): State<AppState>,
    headers: HeaderMap,
    Form(CheckpointForm { next }): Form<CheckpointForm>,
) -> AppResult<Response> {
    if super::session_user(&app, &headers).is_none() {
        return Ok(Redirect::to("/login").into_response());
    }
    let mut next = super::safe_path(&next);
    if next == "/" {
        next = "/search".to_owned();
    }
    Ok(Redirect::to(&next).into_response())
}
