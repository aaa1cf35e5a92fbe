use super::dispatcher::{DispatchConfig, DispatchQueueManager};
use super::mutator::BalanceMutator;
use super::shutdown::{CoordinatorState, DEFAULT_POLL_INTERVAL, ShutdownCoordinator};
use crate::domain::ports::WalletStoreBox;
use crate::domain::wallet::{Balance, WalletId, WalletRequest};
use crate::error::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone)]
pub struct LedgerConfig {
    pub dispatch: DispatchConfig,
    /// Upper bound on a single store call.
    pub operation_timeout: Duration,
    pub drain_poll_interval: Duration,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            dispatch: DispatchConfig::default(),
            operation_timeout: Duration::from_secs(5),
            drain_poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// The caller-facing wallet ledger.
///
/// Every operation is admitted through the [`ShutdownCoordinator`]. Balance
/// changes are serialized per wallet by the [`DispatchQueueManager`]; reads go
/// straight to the [`BalanceMutator`].
pub struct WalletLedger {
    coordinator: ShutdownCoordinator,
    dispatcher: DispatchQueueManager<BalanceMutator>,
    mutator: Arc<BalanceMutator>,
}

impl WalletLedger {
    pub fn new(store: WalletStoreBox, config: LedgerConfig) -> Self {
        let mutator = Arc::new(BalanceMutator::new(store, config.operation_timeout));
        Self {
            coordinator: ShutdownCoordinator::new(config.drain_poll_interval),
            dispatcher: DispatchQueueManager::new(mutator.clone(), config.dispatch),
            mutator,
        }
    }

    pub async fn change_balance(&self, request: WalletRequest) -> Result<Balance> {
        let wallet_id = request.wallet_id;
        let _guard = self.coordinator.begin_operation().inspect_err(|_| {
            tracing::debug!(%wallet_id, "rejected balance change during shutdown");
        })?;

        self.dispatcher.submit(request).await.inspect_err(|err| {
            if err.is_client_error() {
                tracing::warn!(%wallet_id, error = %err, "balance change refused");
            } else {
                tracing::error!(%wallet_id, error = %err, "balance change failed");
            }
        })
    }

    pub async fn get_balance(&self, wallet_id: WalletId) -> Result<Balance> {
        let _guard = self.coordinator.begin_operation()?;
        self.mutator.get_balance(wallet_id).await
    }

    /// Stops admission, waits for in-flight calls and queued jobs, then
    /// closes the per-wallet queues.
    ///
    /// Both waits share `timeout`. The queues are closed even when the
    /// deadline is missed.
    pub async fn shutdown(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;

        let drained = match self.coordinator.shutdown(timeout).await {
            Ok(()) => {
                self.dispatcher
                    .drain(deadline.saturating_duration_since(Instant::now()))
                    .await
            }
            Err(err) => Err(err),
        };
        self.dispatcher.close();

        drained
    }

    pub fn state(&self) -> CoordinatorState {
        self.coordinator.state()
    }

    pub fn in_flight(&self) -> u64 {
        self.coordinator.in_flight()
    }

    pub fn pending_jobs(&self) -> usize {
        self.dispatcher.pending_jobs()
    }

    pub fn active_queues(&self) -> usize {
        self.dispatcher.active_queues()
    }
}
