use crate::domain::ports::WalletStore;
use crate::domain::wallet::{Amount, Balance, WalletId};
use crate::error::{Result, WalletError};
use async_trait::async_trait;
use rocksdb::{Options, TransactionDB, TransactionDBOptions};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// Value stored under each wallet key.
#[derive(Debug, Serialize, Deserialize)]
struct WalletRecord {
    wallet_id: WalletId,
    balance: Balance,
}

/// A persistent wallet store backed by a pessimistic RocksDB `TransactionDB`.
///
/// Keys are the 16 raw bytes of the wallet id, values are JSON-encoded
/// records. Deposits and withdrawals run inside one transaction that takes
/// an exclusive lock on the row with `get_for_update`, so the guard check and
/// the write cannot interleave with another writer of the same wallet.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<TransactionDB>`).
#[derive(Clone)]
pub struct RocksDbWalletStore {
    db: Arc<TransactionDB>,
}

impl RocksDbWalletStore {
    /// Opens or creates a RocksDB instance at the specified path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        let txn_opts = TransactionDBOptions::default();

        let db = TransactionDB::open(&opts, &txn_opts, path)?;

        Ok(Self { db: Arc::new(db) })
    }

    fn decode(bytes: &[u8]) -> Result<Balance> {
        let record: WalletRecord = serde_json::from_slice(bytes)?;
        Ok(record.balance)
    }

    fn encode(wallet_id: WalletId, balance: Balance) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(&WalletRecord { wallet_id, balance })?)
    }

    /// Runs a synchronous RocksDB call on the blocking pool so that row locks
    /// and disk I/O never stall a runtime worker thread.
    async fn blocking<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&TransactionDB) -> Result<T> + Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || op(&db))
            .await
            .map_err(WalletError::storage)?
    }

    fn apply_deposit(db: &TransactionDB, wallet_id: WalletId, amount: Amount) -> Result<Balance> {
        let key = wallet_id.as_bytes();
        // Dropping the transaction without commit rolls it back.
        let txn = db.transaction();

        let current = match txn.get_for_update(key, true)? {
            Some(bytes) => Self::decode(&bytes)?,
            None => Balance::ZERO,
        };
        let updated = current
            .checked_deposit(amount)
            .ok_or(WalletError::BalanceOverflow(wallet_id))?;

        txn.put(key, Self::encode(wallet_id, updated)?)?;
        txn.commit()?;

        Ok(updated)
    }

    fn apply_withdraw(
        db: &TransactionDB,
        wallet_id: WalletId,
        amount: Amount,
    ) -> Result<Option<Balance>> {
        let key = wallet_id.as_bytes();
        let txn = db.transaction();

        let Some(bytes) = txn.get_for_update(key, true)? else {
            return Ok(None);
        };
        let Some(updated) = Self::decode(&bytes)?.checked_withdraw(amount) else {
            return Ok(None);
        };

        txn.put(key, Self::encode(wallet_id, updated)?)?;
        txn.commit()?;

        Ok(Some(updated))
    }
}

#[async_trait]
impl WalletStore for RocksDbWalletStore {
    async fn deposit(&self, wallet_id: WalletId, amount: Amount) -> Result<Balance> {
        self.blocking(move |db| Self::apply_deposit(db, wallet_id, amount))
            .await
    }

    async fn withdraw(&self, wallet_id: WalletId, amount: Amount) -> Result<Option<Balance>> {
        self.blocking(move |db| Self::apply_withdraw(db, wallet_id, amount))
            .await
    }

    async fn balance(&self, wallet_id: WalletId) -> Result<Option<Balance>> {
        self.blocking(move |db| match db.get(wallet_id.as_bytes())? {
            Some(bytes) => Ok(Some(Self::decode(&bytes)?)),
            None => Ok(None),
        })
        .await
    }
}
