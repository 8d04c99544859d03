mod connect;
mod page;

use axum::Router;
use axum::routing::{get, post};

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{id}", get(page::profile))
        .route("/{id}/connect", post(connect::connect))
}
