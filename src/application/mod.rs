//! Application layer orchestrating wallet operations.
//!
//! [`ledger::WalletLedger`] is the entry point. It gates admission with the
//! [`shutdown::ShutdownCoordinator`], serializes balance changes per wallet
//! through the [`dispatcher::DispatchQueueManager`] (one `tokio` task and
//! channel per active wallet) and applies them with the
//! [`mutator::BalanceMutator`].

pub mod dispatcher;
pub mod ledger;
pub mod mutator;
pub mod shutdown;
