use axum::Form;
use axum::debug_handler;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use serde::Deserialize;

use crate::state::StateError;
use crate::{AppResult, AppState, auth};

pub(crate) const NOTE_LIMIT: usize = 200;

#[derive(Deserialize)]
pub(crate) struct ConnectForm {
    #[serde(default)]
    note: String,
}

#[debug_handler]
pub(crate) async fn connect(
    State(app): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Form(ConnectForm { note }): Form<ConnectForm>,
) -> AppResult<Response> {
    if auth::session_user(&app, &headers).is_none() {
        return Ok(Redirect::to("/login").into_response());
    }
    if app.net.get_profile(&id).is_none() {
        return Ok(StatusCode::NOT_FOUND.into_response());
    }

    let mut note = note.trim().to_owned();
    if note.chars().count() > NOTE_LIMIT {
        return Ok((StatusCode::BAD_REQUEST, "note too long").into_response());
    }
    if note.is_empty() {
        note = "(no note)".to_owned();
    }

    match app.net.send_connection_request(&id, &note) {
        Ok(_) => {
            tracing::info!(profile_id = %id, "connection request sent");
            Ok(Redirect::to("/connections").into_response())
        }
        Err(StateError::AlreadyRequested) => {
            Ok(Redirect::to(&format!("/profile/{id}?already=1")).into_response())
        }
        Err(e) => Err(e.into()),
    }
}
