use axum::debug_handler;
use axum::extract::State;
use axum::http::{HeaderMap, header};
use axum::response::{IntoResponse, Redirect, Response};

use crate::{AppResult, AppState};

#[debug_handler]
pub(crate) async fn logout(State(app): State<AppState>, headers: HeaderMap) -> AppResult<Response> {
    if let Some(sid) = super::session_id(&headers) {
        app.net.delete_session(&sid);
    }
    Ok((
        [(header::SET_COOKIE, super::clear_session_cookie())],
        Redirect::to("/login"),
    )
        .into_response())
}
