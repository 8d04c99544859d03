use axum::Form;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, header};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::debug_handler;
use serde::Deserialize;

use crate::{AppResult, AppState, esc, include_res};

#[derive(Deserialize)]
pub(crate) struct LoginQuery {
    pub(crate) next: Option<String>,
}

#[derive(Deserialize)]
pub(crate) struct LoginForm {
    username: String,
    password: String,
    #[serde(default)]
    next: String,
}

fn login_page_html(app: &AppState, next: &str, error: &str) -> Html<String> {
    Html(
        include_res!(str, "/pages/login.html")
            .replace("{brand}", &esc(&app.site.brand_name))
            .replace("{next}", &esc(next))
            .replace("{error}", error),
    )
}

#[debug_handler]
pub(crate) async fn login_page(
    State(app): State<AppState>,
    headers: HeaderMap,
    Query(LoginQuery { next }): Query<LoginQuery>,
) -> AppResult<Response> {
    if super::session_user(&app, &headers).is_some() {
        return Ok(Redirect::to("/search").into_response());
    }
    let next = super::safe_path(next.as_deref().unwrap_or("/search"));
    Ok(login_page_html(&app, &next, "").into_response())
}

#[debug_handler]
pub(crate) async fn login(
    State(app): State<AppState>,
    Form(LoginForm {
        username,
        password,
        next,
    }): Form<LoginForm>,
) -> AppResult<Response> {
    let username = username.trim().to_owned();
    let password = password.trim().to_owned();
    let mut next = super::safe_path(&next);
    if next == "/" {
        next = "/search".to_owned();
    }

    let creds = &app.site.credentials;
    if username != creds.username || password != creds.password {
        tracing::debug!(%username, "rejected login");
        let error = r#"<p class="error" data-testid="login-error">Invalid credentials (this is a local mock app).</p>"#;
        return Ok(login_page_html(&app, &next, error).into_response());
    }

    let sid = app.net.new_session(&username)?;
    tracing::info!(%username, "session created");

    let to = if app.site.checkpoint_enabled {
        format!("/checkpoint?next={}", urlencoding::encode(&next))
    } else {
        next
    };
    Ok((
        [(header::SET_COOKIE, super::session_cookie(&sid))],
        Redirect::to(&to),
    )
        .into_response())
}
