//! Priority-aware crypto task dispatcher.
//!
//! Routes per-message encrypt/decrypt requests to one of three parallel
//! worker pools by declared priority, correlates asynchronous replies to
//! the original caller, and broadcasts per-session key material to every
//! pool.
//!
//! # Architecture
//!
//! - [`CryptoDispatcher`]: public API; owns the three pools and mints
//!   task ids. Constructed explicitly and owned by the application's
//!   composition root; there is no global instance.
//! - [`pool`]: one actor per priority class, owning the pending-task
//!   table and one execution unit.
//! - [`engine`]: the cipher seam the execution units run behind, plus
//!   the shipped [`AeadEngine`].
//! - [`protocol`]: the typed request/response contract on the unit's
//!   channels.
//!
//! # Concurrency
//!
//! An unbounded number of tasks may be in flight on one pool; completion
//! order is whatever order the unit emits results in. Tasks on different
//! pools run fully in parallel and never block each other. A dispatched
//! task cannot be withdrawn; without a configured timeout, an unanswered
//! task leaves its caller pending indefinitely.

mod engine;
mod error;
mod pool;
mod protocol;

pub use engine::{AEAD_KEY_SIZE, AeadEngine, CipherEngine, EngineError};
pub use error::DispatchError;
pub use protocol::{SessionKey, TaskId, WorkerRequest, WorkerResponse};

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::oneshot;

use pool::{ExpectedKind, Pool, PoolCommand, TaskOutput};

/// Task priority classes, highest first.
///
/// A static, caller-declared property of a task. The class picks the
/// executing pool; there is no preemption or re-prioritization once a
/// task is dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Priority {
    /// Interactive traffic: messages the user is waiting on.
    High,
    /// Everything without a declared urgency.
    #[default]
    Medium,
    /// Background work: prefetch, history backfill.
    Low,
}

impl Priority {
    /// Map a numeric priority level onto a class.
    ///
    /// 0 is high and 2 is low; every other value is medium.
    pub fn from_level(level: u8) -> Self {
        match level {
            0 => Self::High,
            2 => Self::Low,
            _ => Self::Medium,
        }
    }

    fn pool_index(self) -> usize {
        match self {
            Self::High => 0,
            Self::Medium => 1,
            Self::Low => 2,
        }
    }
}

/// Dispatcher construction options.
#[derive(Debug, Clone, Default)]
pub struct DispatcherConfig {
    /// Reject and evict a task that has not completed within this bound.
    ///
    /// With `None`, a task whose execution unit never answers stays
    /// pending indefinitely; bounding latency is the caller's concern.
    pub task_timeout: Option<Duration>,
}

/// Three priority pools, each owning one isolated execution unit.
///
/// Sessions must be initialized through [`init_session`] before any task
/// referencing them is issued; the dispatcher does not enforce this, the
/// unit answers an error for unknown sessions. Key material is forwarded
/// to the units at broadcast time and not retained here.
///
/// [`init_session`]: CryptoDispatcher::init_session
pub struct CryptoDispatcher {
    pools: [Pool; 3],
    next_task_id: AtomicU64,
    config: DispatcherConfig,
}

impl CryptoDispatcher {
    /// Spawn the three pools, each driving a clone of `engine`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new<C: CipherEngine>(config: DispatcherConfig, engine: C) -> Self {
        let pools = [
            Pool::spawn("high", engine.clone()),
            Pool::spawn("medium", engine.clone()),
            Pool::spawn("low", engine),
        ];
        Self { pools, next_task_id: AtomicU64::new(1), config }
    }

    /// Import `key` for `session_id` into every pool concurrently.
    ///
    /// Fails if any pool fails to forward the key to its execution unit.
    /// Init is fire-and-forget at the unit: no import acknowledgment is
    /// awaited, so success means "delivered", not "imported". Callers
    /// initialize a session once, before the first task referencing it.
    pub async fn init_session(
        &self,
        session_id: &str,
        key: SessionKey,
    ) -> Result<(), DispatchError> {
        let mut acks = Vec::with_capacity(self.pools.len());
        for pool in &self.pools {
            let (done_tx, done_rx) = oneshot::channel();
            pool.send(PoolCommand::InitSession {
                request: WorkerRequest::InitSession {
                    session_id: session_id.to_string(),
                    key: key.clone(),
                },
                done: done_tx,
            })?;
            acks.push(done_rx);
        }

        for ack in acks {
            ack.await.map_err(|_| DispatchError::WorkerUnavailable)??;
        }
        Ok(())
    }

    /// Encrypt `plaintext` under the session's key at `priority`.
    ///
    /// Returns the packed ciphertext produced by the pool's execution
    /// unit.
    pub async fn encrypt(
        &self,
        session_id: &str,
        plaintext: Vec<u8>,
        priority: Priority,
    ) -> Result<String, DispatchError> {
        let id = self.next_task_id();
        let request = WorkerRequest::Encrypt {
            id,
            session_id: session_id.to_string(),
            payload: plaintext,
            priority,
        };

        match self.submit(priority, id, request, ExpectedKind::Encrypt).await? {
            TaskOutput::Ciphertext(data) => Ok(data),
            TaskOutput::Plaintext(_) => {
                unreachable!("pool verified the result kind at delivery")
            },
        }
    }

    /// Decrypt a packed ciphertext under the session's key at `priority`.
    pub async fn decrypt(
        &self,
        session_id: &str,
        packed: String,
        priority: Priority,
    ) -> Result<Vec<u8>, DispatchError> {
        let id = self.next_task_id();
        let request = WorkerRequest::Decrypt {
            id,
            session_id: session_id.to_string(),
            payload: packed,
            priority,
        };

        match self.submit(priority, id, request, ExpectedKind::Decrypt).await? {
            TaskOutput::Plaintext(data) => Ok(data),
            TaskOutput::Ciphertext(_) => {
                unreachable!("pool verified the result kind at delivery")
            },
        }
    }

    async fn submit(
        &self,
        priority: Priority,
        id: TaskId,
        request: WorkerRequest,
        expects: ExpectedKind,
    ) -> Result<TaskOutput, DispatchError> {
        let pool = &self.pools[priority.pool_index()];
        let (completion_tx, completion_rx) = oneshot::channel();
        pool.send(PoolCommand::Submit { id, request, expects, completion: completion_tx })?;

        match self.config.task_timeout {
            None => completion_rx.await.map_err(|_| DispatchError::Abandoned)?,
            Some(limit) => match tokio::time::timeout(limit, completion_rx).await {
                Ok(delivered) => delivered.map_err(|_| DispatchError::Abandoned)?,
                Err(_) => {
                    let _ = pool.send(PoolCommand::Evict { id });
                    Err(DispatchError::Timeout { elapsed: limit })
                },
            },
        }
    }

    fn next_task_id(&self) -> TaskId {
        TaskId(self.next_task_id.fetch_add(1, Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_mapping_is_exhaustive() {
        assert_eq!(Priority::from_level(0), Priority::High);
        assert_eq!(Priority::from_level(2), Priority::Low);
        // Anything unlisted is medium, including 1 itself
        assert_eq!(Priority::from_level(1), Priority::Medium);
        assert_eq!(Priority::from_level(3), Priority::Medium);
        assert_eq!(Priority::from_level(255), Priority::Medium);
    }

    #[test]
    fn default_priority_is_medium() {
        assert_eq!(Priority::default(), Priority::Medium);
    }

    #[test]
    fn pool_indices_are_distinct() {
        assert_eq!(Priority::High.pool_index(), 0);
        assert_eq!(Priority::Medium.pool_index(), 1);
        assert_eq!(Priority::Low.pool_index(), 2);
    }

    #[tokio::test]
    async fn task_ids_are_unique() {
        let dispatcher = CryptoDispatcher::new(DispatcherConfig::default(), AeadEngine);
        let a = dispatcher.next_task_id();
        let b = dispatcher.next_task_id();
        assert_ne!(a, b);
    }
}
