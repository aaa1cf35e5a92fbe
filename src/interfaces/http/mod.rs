//! HTTP adapter exposing the ledger as a JSON API.
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/v1/wallet` | Deposit into or withdraw from a wallet |
//! | `GET`  | `/api/v1/wallets/:id` | Current balance, `0` for unknown wallets |

pub mod error;
pub mod handlers;

use crate::application::ledger::WalletLedger;
use axum::Router;
use axum::routing::{get, post};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub fn create_router(ledger: Arc<WalletLedger>) -> Router {
    Router::new()
        .route("/api/v1/wallet", post(handlers::change_balance))
        .route("/api/v1/wallets/:id", get(handlers::get_balance))
        .layer(TraceLayer::new_for_http())
        .with_state(ledger)
}
