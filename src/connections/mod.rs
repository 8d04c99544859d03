use axum::Form;
use axum::Router;
use axum::debug_handler;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use serde::Deserialize;

use crate::state::thread_id;
use crate::{AppResult, AppState, auth, esc, include_res};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/connections", get(connections_page))
        .route("/admin/accept", post(admin_accept))
}

fn display_name(app: &AppState, profile_id: &str) -> String {
    app.net
        .get_profile(profile_id)
        .map(|p| p.full_name())
        .unwrap_or_else(|| profile_id.to_owned())
}

#[debug_handler]
pub(crate) async fn connections_page(
    State(app): State<AppState>,
    headers: HeaderMap,
) -> AppResult<Response> {
    let username = match auth::require_user(&app, &headers, "/connections") {
        Ok(u) => u,
        Err(to) => return Ok(to),
    };

    let (pending, accepted) = app.net.list_connections();

    let mut pending_items = String::new();
    for c in &pending {
        pending_items += &include_res!(str, "/pages/pending_item.html")
            .replace("{id}", &esc(&c.profile_id))
            .replace("{name}", &esc(&display_name(&app, &c.profile_id)))
            .replace("{note}", &esc(&c.note));
    }

    let mut accepted_items = String::new();
    for c in &accepted {
        accepted_items += &include_res!(str, "/pages/accepted_item.html")
            .replace("{id}", &esc(&c.profile_id))
            .replace("{name}", &esc(&display_name(&app, &c.profile_id)))
            .replace("{thread_id}", &thread_id(&c.profile_id));
    }

    let body = include_res!(str, "/pages/connections.html")
        .replace("{brand}", &esc(&app.site.brand_name))
        .replace("{nav}", &auth::nav(&username))
        .replace("{pending_count}", &pending.len().to_string())
        .replace("{accepted_count}", &accepted.len().to_string())
        .replace("{pending}", &pending_items)
        .replace("{accepted}", &accepted_items);
    Ok(Html(body).into_response())
}

#[derive(Deserialize)]
pub(crate) struct AcceptForm {
    profile_id: String,
    #[serde(default)]
    back: String,
}

/// Admin toggle: simulates the counterparty accepting a request. Part of the
/// mock, not a real product surface.
#[debug_handler]
pub(crate) async fn admin_accept(
    State(app): State<AppState>,
    headers: HeaderMap,
    Form(AcceptForm { profile_id, back }): Form<AcceptForm>,
) -> AppResult<Response> {
    if auth::session_user(&app, &headers).is_none() {
        return Ok(Redirect::to("/login").into_response());
    }

    let profile_id = profile_id.trim();
    if profile_id.is_empty() {
        return Ok((StatusCode::BAD_REQUEST, "profile_id required").into_response());
    }
    if app.net.get_profile(profile_id).is_none() {
        return Ok((StatusCode::BAD_REQUEST, "unknown profile_id").into_response());
    }

    app.net.accept_connection(profile_id);
    tracing::info!(%profile_id, "connection accepted");

    let back = if back.trim().is_empty() {
        "/connections".to_owned()
    } else {
        auth::safe_path(&back)
    };
    Ok(Redirect::to(&back).into_response())
}
