// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! REST API server exposing the ledger over HTTP.
//!
//! Run with: cargo run --example server
//!
//! # Endpoints
//!
//! ```bash
//! # Record the initial advance
//! curl -X POST http://localhost:3000/anchor \
//!   -H "Content-Type: application/json" \
//!   -d '{"amount": "1000.00", "date": "2024-01-01"}'
//!
//! # Add a day
//! curl -X POST http://localhost:3000/records \
//!   -H "Content-Type: application/json" \
//!   -d '{"date": "2024-01-02", "totalEarnings": "200.00"}'
//!
//! # Edit a day (later days are restamped)
//! curl -X PATCH http://localhost:3000/records/2 \
//!   -H "Content-Type: application/json" \
//!   -d '{"totalEarnings": "300.00"}'
//!
//! # Delete a day
//! curl -X DELETE http://localhost:3000/records/2
//!
//! # List records, newest first / current balance
//! curl http://localhost:3000/records
//! curl http://localhost:3000/balance
//! ```

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
};
use chrono::NaiveDate;
use earnings_ledger::{
    LedgerError, LedgerStore, MemoryBackend, Record, RecordDraft, RecordId, RecordPatch,
    format_currency,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;

// === Request/Response DTOs ===

/// Request body for recording the initial advance.
#[derive(Debug, Deserialize)]
pub struct AnchorRequest {
    pub amount: Decimal,
    pub date: NaiveDate,
}

/// Response body for the current balance.
#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub remaining: Decimal,
    pub display: String,
}

/// Response body for errors.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

// === Application State ===

/// Shared application state containing the ledger store.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<LedgerStore<MemoryBackend>>,
}

// === Error Handling ===

/// Wrapper for converting `LedgerError` into HTTP responses.
pub struct AppError(LedgerError);

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        AppError(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self.0 {
            LedgerError::NotFound(_) => (StatusCode::NOT_FOUND, "RECORD_NOT_FOUND"),
            LedgerError::AnchorExists(_) => (StatusCode::CONFLICT, "ANCHOR_EXISTS"),
            LedgerError::InvalidCurrency(_) => (StatusCode::BAD_REQUEST, "INVALID_AMOUNT"),
            LedgerError::Overflow(_) => (StatusCode::UNPROCESSABLE_ENTITY, "AMOUNT_OUT_OF_RANGE"),
            LedgerError::Backend(_) => (StatusCode::INTERNAL_SERVER_ERROR, "BACKEND_ERROR"),
            LedgerError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "CONFIG_ERROR"),
        };

        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
                code: code.to_string(),
            }),
        )
            .into_response()
    }
}

// === Handlers ===

/// GET /records - List records, newest first.
async fn list_records(State(state): State<AppState>) -> Result<Json<Vec<Record>>, AppError> {
    Ok(Json(state.store.list_records()?))
}

/// POST /records - Add a day.
async fn create_record(
    State(state): State<AppState>,
    Json(draft): Json<RecordDraft>,
) -> Result<(StatusCode, Json<Record>), AppError> {
    let record = state.store.add_record(draft)?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// PATCH /records/{id} - Edit a record.
async fn update_record(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(patch): Json<RecordPatch>,
) -> Result<Json<Record>, AppError> {
    Ok(Json(state.store.update_record(RecordId(id), patch)?))
}

/// DELETE /records/{id} - Delete a record.
async fn delete_record(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<Record>, AppError> {
    Ok(Json(state.store.delete_record(RecordId(id))?))
}

/// POST /anchor - Record the initial advance.
async fn create_anchor(
    State(state): State<AppState>,
    Json(request): Json<AnchorRequest>,
) -> Result<(StatusCode, Json<Record>), AppError> {
    let anchor = state.store.create_anchor(request.amount, request.date)?;
    Ok((StatusCode::CREATED, Json(anchor)))
}

/// GET /balance - Current remaining balance.
async fn balance(State(state): State<AppState>) -> Result<Json<BalanceResponse>, AppError> {
    let remaining = state.store.current_balance()?;
    Ok(Json(BalanceResponse {
        remaining,
        display: format_currency(remaining),
    }))
}

// === Router ===

fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/records", get(list_records).post(create_record))
        .route("/records/{id}", patch(update_record).delete(delete_record))
        .route("/anchor", post(create_anchor))
        .route("/balance", get(balance))
        .with_state(state)
}

// === Main ===

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().init();

    let state = AppState {
        store: Arc::new(LedgerStore::new(MemoryBackend::new())),
    };

    let app = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:3000").await.unwrap();
    println!("Ledger API server running on http://127.0.0.1:3000");
    println!();
    println!("Endpoints:");
    println!("  GET    /records       - List records, newest first");
    println!("  POST   /records       - Add a day");
    println!("  PATCH  /records/:id   - Edit a record");
    println!("  DELETE /records/:id   - Delete a record");
    println!("  POST   /anchor        - Record the initial advance");
    println!("  GET    /balance       - Current remaining balance");

    axum::serve(listener, app).await.unwrap();
}
