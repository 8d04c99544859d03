pub mod auth;
pub mod automation;
pub mod config;
pub mod connections;
pub mod logging;
pub mod messages;
pub mod profiles;
pub mod search;
pub mod server;
pub mod state;
pub mod storage;

use std::sync::Arc;

use axum::extract::FromRef;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Server-side knobs the handlers need besides the state itself.
#[derive(Clone)]
pub struct SiteConfig {
    pub brand_name: String,
    pub checkpoint_enabled: bool,
    pub credentials: Credentials,
}

#[derive(Clone, FromRef)]
pub struct AppState {
    pub net: Arc<state::State>,
    pub site: SiteConfig,
}

pub type AppResult<T> = Result<T, AppError>;
pub struct AppError(pub anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("{}\n\n{}", self.0, self.0.backtrace()),
        )
            .into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[macro_export]
macro_rules! include_res {
    (bytes, $p:expr) => {
        include_bytes!(concat!(env!("CARGO_MANIFEST_DIR"), "/res", $p))
    };
    (str, $p:expr) => {
        include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/res", $p))
    };
}

/// Minimal HTML escaping for user-supplied text spliced into pages.
pub fn esc(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
