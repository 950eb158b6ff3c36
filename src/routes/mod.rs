use axum::routing::get;
use axum::{middleware, Router};

use crate::app_state::AppState;

pub mod error;
pub mod guard;
pub mod health;
pub mod metrics;
pub mod printers;

pub use error::ApiError;

/// Printer API plus health check, with rate limits applied.
pub fn router(state: AppState) -> Router {
    let live = get(printers::live_status).layer(middleware::from_fn_with_state(
        state.clone(),
        guard::limit_live_requests,
    ));

    Router::new()
        .route("/health", get(health::health_check))
        .route(
            "/api/printers",
            get(printers::list_printers).post(printers::create_printer),
        )
        .route(
            "/api/printers/{id}",
            get(printers::get_printer)
                .patch(printers::update_printer)
                .delete(printers::delete_printer),
        )
        .route("/api/printers/{id}/live", live)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            guard::limit_requests,
        ))
        .with_state(state)
}
