use axum::debug_handler;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use serde::Deserialize;

use crate::state::{ConnectionStatus, thread_id};
use crate::{AppResult, AppState, auth, esc, include_res};

#[derive(Deserialize)]
pub(crate) struct ProfileQuery {
    already: Option<String>,
}

#[debug_handler]
pub(crate) async fn profile(
    State(app): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Query(ProfileQuery { already }): Query<ProfileQuery>,
) -> AppResult<Response> {
    let username = match auth::require_user(&app, &headers, &format!("/profile/{id}")) {
        Ok(u) => u,
        Err(to) => return Ok(to),
    };

    let Some(p) = app.net.get_profile(&id) else {
        return Ok(StatusCode::NOT_FOUND.into_response());
    };
    let conn = app.net.connection_for(&id);

    let flash = if already.is_some() {
        r#"<p class="flash" data-testid="connect-flash">Connection already requested.</p>"#
    } else {
        ""
    };

    let connect_block = match conn.status {
        ConnectionStatus::None => {
            include_res!(str, "/pages/connect_form.html").replace("{id}", &esc(&id))
        }
        ConnectionStatus::Pending => {
            r#"<p data-testid="connect-pending">Connection request pending.</p>"#.to_owned()
        }
        ConnectionStatus::Accepted => format!(
            r#"<a data-testid="profile-message-link" href="/messages?thread={}">Message</a>"#,
            thread_id(&id)
        ),
    };

    let body = include_res!(str, "/pages/profile.html")
        .replace("{brand}", &esc(&app.site.brand_name))
        .replace("{nav}", &auth::nav(&username))
        .replace("{id}", &esc(&id))
        .replace("{name}", &esc(&p.full_name()))
        .replace("{title}", &esc(&p.title))
        .replace("{company}", &esc(&p.company))
        .replace("{location}", &esc(&p.location))
        .replace("{keywords}", &esc(&p.keywords))
        .replace("{status}", conn.status.as_str())
        .replace("{flash}", flash)
        .replace("{connect}", &connect_block);
    Ok(Html(body).into_response())
}
