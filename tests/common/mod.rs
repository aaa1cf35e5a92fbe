#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use wallet_ledger::application::ledger::{LedgerConfig, WalletLedger};
use wallet_ledger::domain::ports::WalletStore;
use wallet_ledger::domain::wallet::{Amount, Balance, WalletId, WalletRequest};
use wallet_ledger::error::{Result, WalletError};
use wallet_ledger::infrastructure::in_memory::InMemoryWalletStore;

pub fn amount(value: i64) -> Amount {
    Amount::new(value).unwrap()
}

pub fn deposit(wallet_id: WalletId, value: i64) -> WalletRequest {
    WalletRequest::deposit(wallet_id, amount(value))
}

pub fn withdraw(wallet_id: WalletId, value: i64) -> WalletRequest {
    WalletRequest::withdraw(wallet_id, amount(value))
}

pub fn ledger_with<S: WalletStore + 'static>(store: S, config: LedgerConfig) -> Arc<WalletLedger> {
    Arc::new(WalletLedger::new(Box::new(store), config))
}

/// In-memory ledger plus a handle on its rows.
pub fn in_memory_ledger() -> (Arc<WalletLedger>, InMemoryWalletStore) {
    let store = InMemoryWalletStore::new();
    (ledger_with(store.clone(), LedgerConfig::default()), store)
}

/// Yields until `condition` holds, panicking after a bounded number of tries.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..10_000 {
        if condition() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition not reached");
}

/// Store that sleeps before every call.
#[derive(Clone)]
pub struct SlowStore {
    pub inner: InMemoryWalletStore,
    delay: Duration,
}

impl SlowStore {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: InMemoryWalletStore::new(),
            delay,
        }
    }
}

#[async_trait]
impl WalletStore for SlowStore {
    async fn deposit(&self, wallet_id: WalletId, amount: Amount) -> Result<Balance> {
        tokio::time::sleep(self.delay).await;
        self.inner.deposit(wallet_id, amount).await
    }

    async fn withdraw(&self, wallet_id: WalletId, amount: Amount) -> Result<Option<Balance>> {
        tokio::time::sleep(self.delay).await;
        self.inner.withdraw(wallet_id, amount).await
    }

    async fn balance(&self, wallet_id: WalletId) -> Result<Option<Balance>> {
        tokio::time::sleep(self.delay).await;
        self.inner.balance(wallet_id).await
    }
}

/// Store that parks every mutation of one wallet until released.
#[derive(Clone)]
pub struct GatedStore {
    pub inner: InMemoryWalletStore,
    blocked: WalletId,
    pub started: Arc<Notify>,
    pub release: Arc<Notify>,
}

impl GatedStore {
    pub fn new(blocked: WalletId) -> Self {
        Self {
            inner: InMemoryWalletStore::new(),
            blocked,
            started: Arc::new(Notify::new()),
            release: Arc::new(Notify::new()),
        }
    }

    async fn gate(&self, wallet_id: WalletId) {
        if wallet_id == self.blocked {
            self.started.notify_one();
            self.release.notified().await;
        }
    }
}

#[async_trait]
impl WalletStore for GatedStore {
    async fn deposit(&self, wallet_id: WalletId, amount: Amount) -> Result<Balance> {
        self.gate(wallet_id).await;
        self.inner.deposit(wallet_id, amount).await
    }

    async fn withdraw(&self, wallet_id: WalletId, amount: Amount) -> Result<Option<Balance>> {
        self.gate(wallet_id).await;
        self.inner.withdraw(wallet_id, amount).await
    }

    async fn balance(&self, wallet_id: WalletId) -> Result<Option<Balance>> {
        self.inner.balance(wallet_id).await
    }
}

/// Store whose calls fail for one wallet, or for one amount on any wallet.
#[derive(Clone)]
pub struct FailingStore {
    pub inner: InMemoryWalletStore,
    broken_wallet: Option<WalletId>,
    broken_amount: Option<i64>,
}

impl FailingStore {
    pub fn for_wallet(wallet_id: WalletId) -> Self {
        Self {
            inner: InMemoryWalletStore::new(),
            broken_wallet: Some(wallet_id),
            broken_amount: None,
        }
    }

    pub fn for_amount(value: i64) -> Self {
        Self {
            inner: InMemoryWalletStore::new(),
            broken_wallet: None,
            broken_amount: Some(value),
        }
    }

    fn check(&self, wallet_id: WalletId, amount: Option<Amount>) -> Result<()> {
        let wallet_broken = self.broken_wallet == Some(wallet_id);
        let amount_broken = amount.is_some_and(|a| self.broken_amount == Some(a.value()));
        if wallet_broken || amount_broken {
            return Err(WalletError::storage("connection reset by peer"));
        }
        Ok(())
    }
}

#[async_trait]
impl WalletStore for FailingStore {
    async fn deposit(&self, wallet_id: WalletId, amount: Amount) -> Result<Balance> {
        self.check(wallet_id, Some(amount))?;
        self.inner.deposit(wallet_id, amount).await
    }

    async fn withdraw(&self, wallet_id: WalletId, amount: Amount) -> Result<Option<Balance>> {
        self.check(wallet_id, Some(amount))?;
        self.inner.withdraw(wallet_id, amount).await
    }

    async fn balance(&self, wallet_id: WalletId) -> Result<Option<Balance>> {
        self.check(wallet_id, None)?;
        self.inner.balance(wallet_id).await
    }
}
