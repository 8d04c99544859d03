use axum::Form;
use axum::Router;
use axum::debug_handler;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use serde::Deserialize;
use time::format_description::well_known::Rfc3339;

use crate::state::StateError;
use crate::{AppResult, AppState, auth, esc, include_res};

pub(crate) const BODY_LIMIT: usize = 500;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/messages", get(messages_page))
        .route("/messages/send", post(send))
}

#[derive(Deserialize)]
pub(crate) struct MessagesQuery {
    thread: Option<String>,
}

#[debug_handler]
pub(crate) async fn messages_page(
    State(app): State<AppState>,
    headers: HeaderMap,
    Query(MessagesQuery { thread }): Query<MessagesQuery>,
) -> AppResult<Response> {
    let username = match auth::require_user(&app, &headers, "/messages") {
        Ok(u) => u,
        Err(to) => return Ok(to),
    };

    let thread = thread.unwrap_or_default().trim().to_owned();

    let mut threads_html = String::new();
    for tid in app.net.list_threads() {
        let pid = tid.strip_prefix("thread-").unwrap_or(&tid).to_owned();
        let (name, company) = app
            .net
            .get_profile(&pid)
            .map(|p| (p.full_name(), p.company))
            .unwrap_or_else(|| (pid.clone(), String::new()));
        threads_html += &include_res!(str, "/pages/thread_item.html")
            .replace("{thread_id}", &esc(&tid))
            .replace("{name}", &esc(&name))
            .replace("{company}", &esc(&company));
    }

    let mut messages_html = String::new();
    let mut composer = String::new();
    if !thread.is_empty() {
        let pid = thread.strip_prefix("thread-").unwrap_or(&thread).to_owned();
        let counterparty = app
            .net
            .get_profile(&pid)
            .map(|p| p.full_name())
            .unwrap_or_else(|| pid.clone());
        for m in app.net.messages(&thread) {
            let from = if m.from_self { "You" } else { counterparty.as_str() };
            let sent_at = m.sent_at.format(&Rfc3339).unwrap_or_default();
            messages_html += &include_res!(str, "/pages/message_item.html")
                .replace("{from}", &esc(from))
                .replace("{body}", &esc(&m.body))
                .replace("{sent_at}", &sent_at);
        }
        composer = include_res!(str, "/pages/composer.html").replace("{profile_id}", &esc(&pid));
    }

    let body = include_res!(str, "/pages/messages.html")
        .replace("{brand}", &esc(&app.site.brand_name))
        .replace("{nav}", &auth::nav(&username))
        .replace("{threads}", &threads_html)
        .replace("{messages}", &messages_html)
        .replace("{composer}", &composer);
    Ok(Html(body).into_response())
}

#[derive(Deserialize)]
pub(crate) struct SendForm {
    profile_id: String,
    body: String,
}

#[debug_handler]
pub(crate) async fn send(
    State(app): State<AppState>,
    headers: HeaderMap,
    Form(SendForm { profile_id, body }): Form<SendForm>,
) -> AppResult<Response> {
    if auth::session_user(&app, &headers).is_none() {
        return Ok(Redirect::to("/login").into_response());
    }

    let profile_id = profile_id.trim().to_owned();
    let body = body.trim().to_owned();
    if body.is_empty() {
        return Ok((StatusCode::BAD_REQUEST, "empty message").into_response());
    }
    if body.chars().count() > BODY_LIMIT {
        return Ok((StatusCode::BAD_REQUEST, "message too long").into_response());
    }

    match app.net.send_message(&profile_id, &body) {
        Ok(m) => {
            tracing::info!(%profile_id, "message sent");
            Ok(Redirect::to(&format!("/messages?thread={}", m.thread_id)).into_response())
        }
        Err(StateError::NotConnected) => {
            Ok((StatusCode::BAD_REQUEST, "not connected").into_response())
        }
        Err(e) => Err(e.into()),
    }
}
