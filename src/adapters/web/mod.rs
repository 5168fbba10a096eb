//! HTTP adapter.
//!
//! JSON API over the ledger ports. Store calls block, so every handler runs
//! them on the blocking thread pool.

mod error;
mod handlers;

pub use error::WebError;
pub use handlers::*;

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::ports::ledger_port::LedgerStore;

pub struct AppState {
    pub store: Arc<dyn LedgerStore>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::health))
        .route(
            "/v1/stocks",
            post(handlers::create_stock)
                .get(handlers::list_stocks)
                .delete(handlers::delete_stocks),
        )
        .route(
            "/v1/stocks/{name}",
            get(handlers::get_stock).put(handlers::update_stock),
        )
        .route(
            "/v1/sales",
            post(handlers::record_sale).get(handlers::total_sales),
        )
        .route("/v1/sales/", post(handlers::record_sale))
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}
