mod checkpoint;
mod login;
mod logout;

use axum::Router;
use axum::http::{HeaderMap, header};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;

use crate::{AppState, esc, include_res};

pub const SESSION_COOKIE: &str = "mocknet_session";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", get(login::login_page).post(login::login))
        .route("/logout", get(logout::logout))
        .route(
            "/checkpoint",
            get(checkpoint::checkpoint_page).post(checkpoint::checkpoint),
        )
}

/// Pulls the session cookie value out of the request, if present.
pub fn session_id(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(header::COOKIE)?.to_str().ok()?;
    raw.split(';')
        .filter_map(|kv| kv.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_owned())
}

/// Resolves the cookie to a username server-side. The cookie itself carries
/// no claims.
pub fn session_user(app: &AppState, headers: &HeaderMap) -> Option<String> {
    session_id(headers).and_then(|sid| app.net.username_for_session(&sid))
}

/// Auth gate for protected pages: the signed-in username, or the redirect to
/// send back instead.
pub fn require_user(app: &AppState, headers: &HeaderMap, path: &str) -> Result<String, Response> {
    match session_user(app, headers) {
        Some(username) => Ok(username),
        None => Err(Redirect::to(&format!(
            "/login?next={}",
            urlencoding::encode(&safe_path(path))
        ))
        .into_response()),
    }
}

pub(crate) fn session_cookie(sid: &str) -> String {
    format!("{SESSION_COOKIE}={sid}; Path=/; HttpOnly; SameSite=Lax")
}

pub(crate) fn clear_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax")
}

/// Sanitizes `next`/`back` redirect values to same-site absolute paths.
pub fn safe_path(p: &str) -> String {
    let p = p.trim();
    if p.is_empty() || !p.starts_with('/') || p.starts_with("//") || p.contains("..") {
        return "/".to_owned();
    }
    p.to_owned()
}

pub(crate) fn nav(username: &str) -> String {
    include_res!(str, "/pages/nav.html").replace("{username}", &esc(username))
}

#[cfg(test)]
mod tests {
    use axum::http::{HeaderMap, HeaderValue, header};

    use super::*;

    #[test]
    fn session_id_finds_the_cookie_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; mocknet_session=abc123; other=1"),
        );
        assert_eq!(session_id(&headers).as_deref(), Some("abc123"));

        headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark"));
        assert_eq!(session_id(&headers), None);

        assert_eq!(session_id(&HeaderMap::new()), None);
    }

    #[test]
    fn safe_path_rejects_offsite_and_traversal() {
        assert_eq!(safe_path("/search"), "/search");
        assert_eq!(safe_path("  /messages?thread=thread-p1  "), "/messages?thread=thread-p1");
        assert_eq!(safe_path(""), "/");
        assert_eq!(safe_path("https://evil.example"), "/");
        assert_eq!(safe_path("//evil.example"), "/");
        assert_eq!(safe_path("/a/../b"), "/");
    }
}
