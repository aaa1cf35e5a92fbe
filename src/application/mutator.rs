use super::dispatcher::WorkHandler;
use crate::domain::ports::WalletStoreBox;
use crate::domain::wallet::{Balance, OperationType, WalletId, WalletRequest};
use crate::error::{Result, WalletError};
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

/// Applies wallet requests atomically against the store.
///
/// The mutator holds no state besides the store handle. Its atomicity does not
/// depend on the per-wallet queues: every mutation is a single conditional
/// store operation, so callers that bypass the dispatcher stay correct.
pub struct BalanceMutator {
    store: WalletStoreBox,
    operation_timeout: Duration,
}

impl BalanceMutator {
    /// Creates a mutator whose store calls fail with
    /// [`WalletError::StorageTimeout`] after `operation_timeout`.
    pub fn new(store: WalletStoreBox, operation_timeout: Duration) -> Self {
        Self {
            store,
            operation_timeout,
        }
    }

    pub async fn change_balance(&self, request: &WalletRequest) -> Result<Balance> {
        let WalletRequest {
            wallet_id,
            operation,
            amount,
        } = *request;

        let balance = match operation {
            OperationType::Deposit => self.bounded(self.store.deposit(wallet_id, amount)).await?,
            OperationType::Withdraw => self
                .bounded(self.store.withdraw(wallet_id, amount))
                .await?
                .ok_or(WalletError::InsufficientFunds {
                    wallet_id,
                    requested: amount.value(),
                })?,
        };

        tracing::debug!(
            %wallet_id,
            %operation,
            amount = amount.value(),
            %balance,
            "balance changed"
        );
        Ok(balance)
    }

    /// Reads a balance; a wallet that was never created reads as zero.
    pub async fn get_balance(&self, wallet_id: WalletId) -> Result<Balance> {
        let balance = self.bounded(self.store.balance(wallet_id)).await?;
        Ok(balance.unwrap_or(Balance::ZERO))
    }

    async fn bounded<T, F>(&self, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        tokio::time::timeout(self.operation_timeout, call)
            .await
            .map_err(|_| WalletError::StorageTimeout(self.operation_timeout))?
    }
}

#[async_trait]
impl WorkHandler for BalanceMutator {
    async fn handle(&self, request: WalletRequest) -> Result<Balance> {
        self.change_balance(&request).await
    }
}
