use super::wallet::{Amount, Balance, WalletId};
use crate::error::Result;
use async_trait::async_trait;

/// Durable keyed store of wallet balances.
///
/// Each mutation must be atomic on its own: implementations perform the
/// read-check-write of a single wallet under one lock or transaction, never as
/// a separate read followed by a write.
#[async_trait]
pub trait WalletStore: Send + Sync {
    /// Inserts the wallet with `amount` or increments its balance by `amount`.
    async fn deposit(&self, wallet_id: WalletId, amount: Amount) -> Result<Balance>;

    /// Decrements the balance by `amount` only if it covers `amount`.
    ///
    /// Returns `Ok(None)` when no row satisfies the guard, including when the
    /// wallet does not exist.
    async fn withdraw(&self, wallet_id: WalletId, amount: Amount) -> Result<Option<Balance>>;

    /// Point read. `None` means the wallet has never been created.
    async fn balance(&self, wallet_id: WalletId) -> Result<Option<Balance>>;
}

pub type WalletStoreBox = Box<dyn WalletStore>;
