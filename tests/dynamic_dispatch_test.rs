use std::time::Duration;
use wallet_ledger::application::ledger::{LedgerConfig, WalletLedger};
use wallet_ledger::domain::ports::WalletStoreBox;
use wallet_ledger::domain::wallet::{Balance, WalletId};
use wallet_ledger::infrastructure::in_memory::InMemoryWalletStore;

mod common;
use common::{SlowStore, amount, deposit};

#[tokio::test]
async fn test_store_as_trait_object() {
    let store: WalletStoreBox = Box::new(InMemoryWalletStore::new());
    let wallet_id = WalletId::random();

    // Verify Send + Sync by moving the boxed store into a task
    let handle = tokio::spawn(async move {
        store.deposit(wallet_id, amount(100)).await.unwrap();
        store.withdraw(wallet_id, amount(40)).await.unwrap();
        store.balance(wallet_id).await.unwrap()
    });

    assert_eq!(handle.await.unwrap(), Some(Balance::new(60)));
}

#[tokio::test]
async fn test_ledger_over_any_store() {
    let stores: Vec<WalletStoreBox> = vec![
        Box::new(InMemoryWalletStore::new()),
        Box::new(SlowStore::new(Duration::from_millis(1))),
    ];

    for store in stores {
        let ledger = WalletLedger::new(store, LedgerConfig::default());
        let wallet_id = WalletId::random();

        ledger.change_balance(deposit(wallet_id, 75)).await.unwrap();
        assert_eq!(ledger.get_balance(wallet_id).await.unwrap(), Balance::new(75));
    }
}
