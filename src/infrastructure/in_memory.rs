use crate::domain::ports::WalletStore;
use crate::domain::wallet::{Amount, Balance, WalletId};
use crate::error::{Result, WalletError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory wallet store.
///
/// Uses `Arc<RwLock<HashMap<WalletId, Balance>>>` so clones share the same rows.
/// Every mutation happens under a single write guard, which makes each
/// deposit or withdrawal one atomic read-check-write.
#[derive(Default, Clone)]
pub struct InMemoryWalletStore {
    wallets: Arc<RwLock<HashMap<WalletId, Balance>>>,
}

impl InMemoryWalletStore {
    /// Creates a new, empty in-memory wallet store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of wallet rows that exist.
    pub async fn wallet_count(&self) -> usize {
        self.wallets.read().await.len()
    }
}

#[async_trait]
impl WalletStore for InMemoryWalletStore {
    async fn deposit(&self, wallet_id: WalletId, amount: Amount) -> Result<Balance> {
        let mut wallets = self.wallets.write().await;
        match wallets.entry(wallet_id) {
            Entry::Occupied(mut row) => {
                let updated = row
                    .get()
                    .checked_deposit(amount)
                    .ok_or(WalletError::BalanceOverflow(wallet_id))?;
                row.insert(updated);
                Ok(updated)
            }
            Entry::Vacant(row) => Ok(*row.insert(Balance::from(amount))),
        }
    }

    async fn withdraw(&self, wallet_id: WalletId, amount: Amount) -> Result<Option<Balance>> {
        let mut wallets = self.wallets.write().await;
        let Some(balance) = wallets.get_mut(&wallet_id) else {
            return Ok(None);
        };
        let updated = balance.checked_withdraw(amount);
        if let Some(updated) = updated {
            *balance = updated;
        }
        Ok(updated)
    }

    async fn balance(&self, wallet_id: WalletId) -> Result<Option<Balance>> {
        let wallets = self.wallets.read().await;
        Ok(wallets.get(&wallet_id).copied())
    }
}
