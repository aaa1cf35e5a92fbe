use crate::error::{Result, WalletError};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};

const DRAINING: u64 = 1 << 63;
const STOPPED: u64 = 1 << 62;
const COUNT_MASK: u64 = STOPPED - 1;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    Running,
    Draining,
    Stopped,
}

/// Admission gate and in-flight counter for caller-facing operations.
///
/// The flags and the counter share one atomic word, so admitting an
/// operation checks the state and increments the counter in a single step.
/// An operation admitted before [`ShutdownCoordinator::shutdown`] flips the
/// state is always counted; one arriving after is always rejected.
#[derive(Clone)]
pub struct ShutdownCoordinator {
    state: Arc<AtomicU64>,
    poll_interval: Duration,
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL)
    }
}

impl ShutdownCoordinator {
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            state: Arc::new(AtomicU64::new(0)),
            poll_interval,
        }
    }

    /// Admits one operation, or fails with [`WalletError::ShuttingDown`]
    /// once shutdown has begun. The operation ends when the guard drops.
    pub fn begin_operation(&self) -> Result<OperationGuard> {
        self.state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |word| {
                (word & DRAINING == 0).then_some(word + 1)
            })
            .map_err(|_| WalletError::ShuttingDown)?;

        Ok(OperationGuard {
            state: self.state.clone(),
        })
    }

    pub fn in_flight(&self) -> u64 {
        self.state.load(Ordering::Acquire) & COUNT_MASK
    }

    pub fn state(&self) -> CoordinatorState {
        let word = self.state.load(Ordering::Acquire);
        if word & STOPPED != 0 {
            CoordinatorState::Stopped
        } else if word & DRAINING != 0 {
            CoordinatorState::Draining
        } else {
            CoordinatorState::Running
        }
    }

    pub fn is_shutting_down(&self) -> bool {
        self.state.load(Ordering::Acquire) & DRAINING != 0
    }

    /// Stops admitting operations and waits for in-flight ones to finish.
    ///
    /// The counter is polled every `poll_interval`. When it reaches zero
    /// before `timeout` the coordinator becomes [`CoordinatorState::Stopped`];
    /// otherwise it stays draining and the call fails with
    /// [`WalletError::ShutdownTimeout`].
    pub async fn shutdown(&self, timeout: Duration) -> Result<()> {
        let previous = self.state.fetch_or(DRAINING, Ordering::AcqRel);
        if previous & DRAINING == 0 {
            tracing::info!(in_flight = previous & COUNT_MASK, "draining in-flight operations");
        }

        let expiry = tokio::time::sleep_until(Instant::now() + timeout);
        tokio::pin!(expiry);
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = ticker.tick() => {
                    let in_flight = self.in_flight();
                    if in_flight == 0 {
                        self.state.fetch_or(STOPPED, Ordering::AcqRel);
                        tracing::info!("all in-flight operations completed");
                        return Ok(());
                    }
                    tracing::info!(in_flight, "waiting for in-flight operations");
                }
                _ = &mut expiry => {
                    let pending = self.in_flight();
                    tracing::warn!(pending, "shutdown deadline reached");
                    return Err(WalletError::ShutdownTimeout { pending });
                }
            }
        }
    }
}

/// Marks one admitted operation; dropping it ends the operation.
#[must_use = "the operation ends as soon as the guard is dropped"]
pub struct OperationGuard {
    state: Arc<AtomicU64>,
}

impl Drop for OperationGuard {
    fn drop(&mut self) {
        self.state.fetch_sub(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_tracks_in_flight() {
        let coordinator = ShutdownCoordinator::default();
        assert_eq!(coordinator.state(), CoordinatorState::Running);

        let first = coordinator.begin_operation().unwrap();
        let second = coordinator.begin_operation().unwrap();
        assert_eq!(coordinator.in_flight(), 2);

        drop(first);
        assert_eq!(coordinator.in_flight(), 1);
        drop(second);
        assert_eq!(coordinator.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_idle_shutdown_stops_immediately() {
        let coordinator = ShutdownCoordinator::default();
        coordinator.shutdown(Duration::from_secs(1)).await.unwrap();

        assert_eq!(coordinator.state(), CoordinatorState::Stopped);
        assert!(matches!(
            coordinator.begin_operation(),
            Err(WalletError::ShuttingDown)
        ));
        assert_eq!(coordinator.in_flight(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_waits_for_guards() {
        let coordinator = ShutdownCoordinator::default();
        let guard = coordinator.begin_operation().unwrap();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(250)).await;
            drop(guard);
        });

        let started = Instant::now();
        coordinator.shutdown(Duration::from_secs(1)).await.unwrap();

        assert!(started.elapsed() >= Duration::from_millis(250));
        assert_eq!(coordinator.state(), CoordinatorState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_timeout_stays_draining() {
        let coordinator = ShutdownCoordinator::default();
        let _guard = coordinator.begin_operation().unwrap();

        let result = coordinator.shutdown(Duration::from_millis(30)).await;
        assert!(matches!(
            result,
            Err(WalletError::ShutdownTimeout { pending: 1 })
        ));
        assert_eq!(coordinator.state(), CoordinatorState::Draining);
        assert!(coordinator.is_shutting_down());
    }

    #[test]
    fn test_rejected_admission_does_not_count() {
        let coordinator = ShutdownCoordinator::default();
        let _guard = coordinator.begin_operation().unwrap();
        coordinator.state.fetch_or(DRAINING, Ordering::AcqRel);

        for _ in 0..10 {
            assert!(coordinator.begin_operation().is_err());
        }
        assert_eq!(coordinator.in_flight(), 1);
    }
}
