use super::error::ApiResult;
use crate::application::ledger::WalletLedger;
use crate::domain::wallet::{WalletId, WalletRequest};
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Body of `POST /api/v1/wallet`.
///
/// The operation and amount stay raw so that their validation errors come
/// from the domain rather than from the JSON decoder.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeBalanceBody {
    pub wallet_id: WalletId,
    pub operation_type: String,
    pub amount: i64,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct BalanceResponse {
    pub balance: i64,
}

pub async fn change_balance(
    State(ledger): State<Arc<WalletLedger>>,
    payload: Result<Json<ChangeBalanceBody>, JsonRejection>,
) -> ApiResult<Json<BalanceResponse>> {
    let Json(body) = payload?;
    let request = WalletRequest::parse(body.wallet_id, &body.operation_type, body.amount)?;

    let balance = ledger.change_balance(request).await?;
    tracing::info!(
        wallet_id = %request.wallet_id,
        operation = %request.operation,
        amount = request.amount.value(),
        %balance,
        "balance changed"
    );

    Ok(Json(BalanceResponse {
        balance: balance.value(),
    }))
}

pub async fn get_balance(
    State(ledger): State<Arc<WalletLedger>>,
    Path(id): Path<String>,
) -> ApiResult<Json<BalanceResponse>> {
    let wallet_id: WalletId = id.parse()?;
    let balance = ledger.get_balance(wallet_id).await?;

    Ok(Json(BalanceResponse {
        balance: balance.value(),
    }))
}
