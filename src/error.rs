use crate::domain::wallet::WalletId;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WalletError {
    #[error("insufficient funds in wallet {wallet_id}: requested {requested}")]
    InsufficientFunds { wallet_id: WalletId, requested: i64 },
    #[error("unknown operation type: {0:?}")]
    UnknownOperation(String),
    #[error("amount must be positive, got {0}")]
    InvalidAmount(i64),
    #[error("balance of wallet {0} would overflow")]
    BalanceOverflow(WalletId),
    #[error("storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("storage operation timed out after {0:?}")]
    StorageTimeout(Duration),
    #[error("queue for wallet {0} is full")]
    QueueFull(WalletId),
    #[error("server is shutting down")]
    ShuttingDown,
    #[error("shutdown deadline reached with {pending} operations still pending")]
    ShutdownTimeout { pending: u64 },
    #[error("worker for wallet {0} stopped before replying")]
    WorkerStopped(WalletId),
}

impl WalletError {
    pub fn storage<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::Storage(err.into())
    }

    /// Business-rule and input rejections, as opposed to faults of the service.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InsufficientFunds { .. }
                | Self::UnknownOperation(_)
                | Self::InvalidAmount(_)
                | Self::BalanceOverflow(_)
        )
    }
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for WalletError {
    fn from(err: rocksdb::Error) -> Self {
        Self::storage(err)
    }
}

impl From<serde_json::Error> for WalletError {
    fn from(err: serde_json::Error) -> Self {
        Self::storage(err)
    }
}

pub type Result<T> = std::result::Result<T, WalletError>;
