//! HTTP request handlers for web adapter.

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::domain::error::LedgerError;
use crate::domain::sale::{Sale, SaleRequest};
use crate::domain::stock::{to_stock_map, Stock, StockMap};
use crate::ports::ledger_port::LedgerStore;

use super::{AppState, WebError};

#[derive(Debug, Deserialize)]
pub struct CreateStockBody {
    pub name: String,
    pub amount: i64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStockBody {
    pub amount: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageBody {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TotalSalesBody {
    pub total_sales: f64,
}

/// Runs a store call on the blocking pool.
async fn with_store<T, F>(state: &AppState, op: F) -> Result<T, LedgerError>
where
    F: FnOnce(&dyn LedgerStore) -> Result<T, LedgerError> + Send + 'static,
    T: Send + 'static,
{
    let store = Arc::clone(&state.store);
    tokio::task::spawn_blocking(move || op(&*store))
        .await
        .map_err(|e| LedgerError::Task {
            reason: e.to_string(),
        })?
}

/// Unwraps a JSON body, turning malformed or missing payloads into a 400.
fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, WebError> {
    match payload {
        Ok(Json(body)) => Ok(body),
        Err(rejection) => {
            tracing::warn!(error = %rejection, "invalid request body");
            Err(WebError::bad_request(rejection.body_text()))
        }
    }
}

pub async fn health() -> &'static str {
    "OK"
}

pub async fn create_stock(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateStockBody>, JsonRejection>,
) -> Result<(StatusCode, Json<Stock>), WebError> {
    let body = json_body(payload)?;
    let stock = with_store(&state, move |store| {
        store.create_stock(&body.name, body.amount)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(stock)))
}

pub async fn list_stocks(State(state): State<Arc<AppState>>) -> Result<Json<StockMap>, WebError> {
    let stocks = with_store(&state, |store| store.list_stocks()).await?;
    Ok(Json(to_stock_map(stocks)))
}

pub async fn get_stock(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<StockMap>, WebError> {
    let stock = with_store(&state, move |store| store.get_stock(&name)).await?;
    Ok(Json(stock.as_entry()))
}

pub async fn update_stock(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    payload: Result<Json<UpdateStockBody>, JsonRejection>,
) -> Result<Json<Stock>, WebError> {
    let body = json_body(payload)?;
    let stock = with_store(&state, move |store| {
        store.update_stock_amount(&name, body.amount)
    })
    .await?;
    Ok(Json(stock))
}

pub async fn delete_stocks(
    State(state): State<Arc<AppState>>,
) -> Result<Json<MessageBody>, WebError> {
    let deleted = with_store(&state, |store| store.delete_all_stocks()).await?;
    Ok(Json(MessageBody {
        message: format!("Successfully deleted {deleted} stocks"),
    }))
}

pub async fn record_sale(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SaleRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Sale>), WebError> {
    let request = json_body(payload)?;
    let sale = with_store(&state, move |store| store.record_sale(request))
        .await
        .map_err(WebError::from_sale_error)?;
    Ok((StatusCode::CREATED, Json(sale)))
}

pub async fn total_sales(
    State(state): State<Arc<AppState>>,
) -> Result<Json<TotalSalesBody>, WebError> {
    let total_sales = with_store(&state, |store| store.total_sales()).await?;
    Ok(Json(TotalSalesBody { total_sales }))
}

pub async fn not_found() -> WebError {
    WebError::not_found("Not found")
}
