use crate::domain::wallet::{Balance, WalletId, WalletRequest};
use crate::error::{Result, WalletError};
use async_trait::async_trait;
use futures::FutureExt;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{Notify, mpsc, oneshot};
use tokio::time::Instant;

/// Work executed by the per-wallet workers.
#[async_trait]
pub trait WorkHandler: Send + Sync + 'static {
    async fn handle(&self, request: WalletRequest) -> Result<Balance>;
}

/// What `enqueue` does when a wallet's queue is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OverflowPolicy {
    /// Wait for room in the queue.
    #[default]
    Block,
    /// Fail fast with [`WalletError::QueueFull`].
    Reject,
}

#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Bound of each per-wallet queue.
    pub queue_capacity: usize,
    pub overflow_policy: OverflowPolicy,
    /// Number of independently locked registry shards.
    pub shards: usize,
    /// A worker with nothing to do for this long retires its queue.
    pub idle_timeout: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1000,
            overflow_policy: OverflowPolicy::Block,
            shards: 16,
            idle_timeout: Duration::from_secs(300),
        }
    }
}

/// Counts work admitted to any queue and not yet completed.
#[derive(Default)]
struct PendingTracker {
    count: AtomicUsize,
    drained: Notify,
}

impl PendingTracker {
    fn current(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }

    /// Waits until nothing is pending. Returns `false` if `deadline` passes first.
    async fn wait_idle(&self, deadline: Instant) -> bool {
        loop {
            let notified = self.drained.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.current() == 0 {
                return true;
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return self.current() == 0;
            }
        }
    }
}

/// Claim on a queue slot, held from admission until the job completes.
///
/// A worker never retires while its slot has outstanding reservations.
struct Reservation {
    reserved: Arc<AtomicUsize>,
    pending: Arc<PendingTracker>,
}

impl Drop for Reservation {
    fn drop(&mut self) {
        self.reserved.fetch_sub(1, Ordering::AcqRel);
        if self.pending.count.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.pending.drained.notify_waiters();
        }
    }
}

struct WorkItem {
    request: WalletRequest,
    reply: oneshot::Sender<Result<Balance>>,
    _reservation: Reservation,
}

/// A reserved place in a wallet's queue and the sender to fill it with.
struct Admission {
    sender: mpsc::Sender<WorkItem>,
    reservation: Reservation,
}

#[derive(Clone)]
struct QueueSlot {
    sender: mpsc::Sender<WorkItem>,
    reserved: Arc<AtomicUsize>,
}

type Shard = Mutex<HashMap<WalletId, QueueSlot>>;

struct Inner<H> {
    shards: Vec<Shard>,
    handler: Arc<H>,
    config: DispatchConfig,
    pending: Arc<PendingTracker>,
    closed: AtomicBool,
}

impl<H: WorkHandler> Inner<H> {
    fn shard(&self, wallet_id: &WalletId) -> &Shard {
        let mut hasher = DefaultHasher::new();
        wallet_id.hash(&mut hasher);
        let index = (hasher.finish() % self.shards.len() as u64) as usize;
        &self.shards[index]
    }

    /// Looks up or creates the wallet's queue and reserves a place in it.
    ///
    /// Runs entirely under the shard lock, which is never held across an await.
    fn reserve(self: &Arc<Self>, wallet_id: WalletId) -> Result<Admission> {
        let mut shard = self.shard(&wallet_id).lock();
        if self.closed.load(Ordering::Acquire) {
            return Err(WalletError::ShuttingDown);
        }

        let slot = shard
            .entry(wallet_id)
            .or_insert_with(|| self.spawn_worker(wallet_id));

        slot.reserved.fetch_add(1, Ordering::AcqRel);
        self.pending.count.fetch_add(1, Ordering::AcqRel);
        let reservation = Reservation {
            reserved: slot.reserved.clone(),
            pending: self.pending.clone(),
        };

        Ok(Admission {
            sender: slot.sender.clone(),
            reservation,
        })
    }

    fn spawn_worker(self: &Arc<Self>, wallet_id: WalletId) -> QueueSlot {
        let (sender, receiver) = mpsc::channel(self.config.queue_capacity.max(1));
        let reserved = Arc::new(AtomicUsize::new(0));

        tokio::spawn(run_worker(
            wallet_id,
            receiver,
            reserved.clone(),
            self.handler.clone(),
            Arc::downgrade(self),
            self.config.idle_timeout,
        ));
        tracing::debug!(%wallet_id, "spawned wallet worker");

        QueueSlot { sender, reserved }
    }

    /// Removes the wallet's queue if it is still the worker's own and nothing is reserved.
    fn retire(&self, wallet_id: WalletId, reserved: &Arc<AtomicUsize>) -> bool {
        let mut shard = self.shard(&wallet_id).lock();
        let idle = reserved.load(Ordering::Acquire) == 0;
        let registered = shard
            .get(&wallet_id)
            .is_some_and(|slot| Arc::ptr_eq(&slot.reserved, reserved));

        // An unregistered worker was evicted or closed and only waits out its reservations.
        if idle && registered {
            shard.remove(&wallet_id);
        }
        idle
    }

    /// Drops a registry entry whose worker is gone.
    fn evict(&self, wallet_id: WalletId, sender: &mpsc::Sender<WorkItem>) {
        let mut shard = self.shard(&wallet_id).lock();
        if shard
            .get(&wallet_id)
            .is_some_and(|slot| slot.sender.same_channel(sender))
        {
            shard.remove(&wallet_id);
            tracing::warn!(%wallet_id, "evicted stopped wallet worker");
        }
    }
}

async fn run_worker<H: WorkHandler>(
    wallet_id: WalletId,
    mut receiver: mpsc::Receiver<WorkItem>,
    reserved: Arc<AtomicUsize>,
    handler: Arc<H>,
    registry: Weak<Inner<H>>,
    idle_timeout: Duration,
) {
    loop {
        match tokio::time::timeout(idle_timeout, receiver.recv()).await {
            Ok(Some(item)) => {
                let WorkItem {
                    request,
                    reply,
                    _reservation,
                } = item;
                // A panicking job fails alone; the queue keeps its worker.
                let result = AssertUnwindSafe(handler.handle(request))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|_| {
                        tracing::error!(%wallet_id, "wallet job panicked");
                        Err(WalletError::WorkerStopped(wallet_id))
                    });
                // The caller may have gone away; the mutation stands regardless.
                let _ = reply.send(result);
            }
            Ok(None) => break,
            Err(_) => {
                let Some(inner) = registry.upgrade() else {
                    break;
                };
                if inner.retire(wallet_id, &reserved) {
                    tracing::debug!(%wallet_id, "retired idle wallet worker");
                    break;
                }
            }
        }
    }
}

/// Pending result of an enqueued request.
pub struct ReplyHandle {
    wallet_id: WalletId,
    receiver: oneshot::Receiver<Result<Balance>>,
}

impl ReplyHandle {
    pub async fn wait(self) -> Result<Balance> {
        self.receiver
            .await
            .map_err(|_| WalletError::WorkerStopped(self.wallet_id))?
    }
}

/// Serializes requests per wallet while letting different wallets run in parallel.
///
/// Each wallet gets a bounded FIFO queue drained by exactly one worker task,
/// created on first use. The registry of queues is split into shards keyed by
/// a hash of the wallet id; shard locks only guard lookups and are released
/// before any job runs.
pub struct DispatchQueueManager<H> {
    inner: Arc<Inner<H>>,
}

impl<H: WorkHandler> DispatchQueueManager<H> {
    pub fn new(handler: Arc<H>, config: DispatchConfig) -> Self {
        let shards = (0..config.shards.max(1))
            .map(|_| Mutex::new(HashMap::new()))
            .collect();

        Self {
            inner: Arc::new(Inner {
                shards,
                handler,
                config,
                pending: Arc::new(PendingTracker::default()),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Admits `request` to its wallet's queue.
    ///
    /// Once this returns, the request's position relative to other requests
    /// on the same wallet is fixed.
    pub async fn enqueue(&self, request: WalletRequest) -> Result<ReplyHandle> {
        let wallet_id = request.wallet_id;

        // A closed queue is left behind by a worker that stopped; evicting it
        // lets the second attempt spawn a fresh worker.
        for _ in 0..2 {
            let Admission {
                sender,
                reservation,
            } = self.inner.reserve(wallet_id)?;
            let (reply, receiver) = oneshot::channel();
            let item = WorkItem {
                request,
                reply,
                _reservation: reservation,
            };

            let sent = match self.inner.config.overflow_policy {
                OverflowPolicy::Block => sender.send(item).await.is_ok(),
                OverflowPolicy::Reject => match sender.try_send(item) {
                    Ok(()) => true,
                    Err(TrySendError::Full(_)) => {
                        tracing::warn!(%wallet_id, "wallet queue full, rejecting request");
                        return Err(WalletError::QueueFull(wallet_id));
                    }
                    Err(TrySendError::Closed(_)) => false,
                },
            };

            if sent {
                return Ok(ReplyHandle {
                    wallet_id,
                    receiver,
                });
            }
            self.inner.evict(wallet_id, &sender);
        }

        Err(WalletError::WorkerStopped(wallet_id))
    }

    /// Enqueues `request` and waits for its result.
    pub async fn submit(&self, request: WalletRequest) -> Result<Balance> {
        self.enqueue(request).await?.wait().await
    }

    pub fn pending_jobs(&self) -> usize {
        self.inner.pending.current()
    }

    pub fn active_queues(&self) -> usize {
        self.inner.shards.iter().map(|shard| shard.lock().len()).sum()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Waits until every admitted job has completed.
    pub async fn drain(&self, timeout: Duration) -> Result<()> {
        if self.inner.pending.wait_idle(Instant::now() + timeout).await {
            Ok(())
        } else {
            Err(WalletError::ShutdownTimeout {
                pending: self.pending_jobs() as u64,
            })
        }
    }

    /// Stops admitting work. Queued jobs still run, then the workers exit.
    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::Release);
        for shard in &self.inner.shards {
            shard.lock().clear();
        }
    }
}
