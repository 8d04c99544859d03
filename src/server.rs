use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use axum::debug_handler;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, header};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::get;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::config::Config;
use crate::state::{Profile, State as NetState};
use crate::{
    AppResult, AppState, Credentials, SiteConfig, auth, connections, esc, include_res, messages,
    profiles, search,
};

/// The profile catalog ships inside the binary and is loaded exactly once;
/// the state never re-reads it.
pub fn seed_profiles() -> anyhow::Result<Vec<Profile>> {
    serde_json::from_str(include_res!(str, "/seed/profiles.json")).context("parse seed profiles")
}

fn nonempty_or(value: &str, fallback: &str) -> String {
    let v = value.trim();
    if v.is_empty() { fallback.to_owned() } else { v.to_owned() }
}

pub fn app_state(cfg: &Config) -> anyhow::Result<AppState> {
    Ok(AppState {
        net: Arc::new(NetState::new(seed_profiles()?)),
        site: SiteConfig {
            brand_name: cfg.mocknet.brand_name.clone(),
            checkpoint_enabled: cfg.mocknet.checkpoint,
            credentials: Credentials {
                username: nonempty_or(&cfg.auth.username, "demo"),
                password: nonempty_or(&cfg.auth.password, "demo"),
            },
        },
    })
}

pub fn router(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/static/style.css", get(style))
        .merge(auth::router())
        .merge(search::router())
        .nest("/profile", profiles::router())
        .merge(connections::router())
        .merge(messages::router())
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .with_state(app_state)
}

pub async fn run(cfg: &Config) -> anyhow::Result<()> {
    let app = router(app_state(cfg)?);
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", cfg.mocknet.port))
        .await
        .with_context(|| format!("bind 127.0.0.1:{}", cfg.mocknet.port))?;
    let port = listener.local_addr()?.port();

    tracing::info!(port, "mocknet listening");
    println!("MockNet running at: http://localhost:{port}");
    println!("Login at: http://localhost:{port}/login");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutting down");
}

#[debug_handler]
async fn home(State(app): State<AppState>, headers: HeaderMap) -> AppResult<Response> {
    if auth::session_user(&app, &headers).is_some() {
        return Ok(Redirect::to("/search").into_response());
    }
    Ok(Html(include_res!(str, "/pages/home.html").replace("{brand}", &esc(&app.site.brand_name)))
        .into_response())
}

#[debug_handler]
async fn style() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/css; charset=utf-8")],
        include_res!(str, "/style.css"),
    )
}
