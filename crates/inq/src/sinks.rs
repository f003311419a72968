//! 🕳️ Queue sinks — where the batches go to leave the process.
//!
//! 🚰 The batch workers accumulate, the sinks transmit. A sink accepts one
//! batch per call and answers with a per-message status vector, which is the
//! entire error-handling contract of this pipeline:
//!
//! - `Ok(statuses)` — every message landed, all statuses true.
//! - `Err` downcastable to [`PartialFailure`] — the service took the call
//!   but rejected some messages; the statuses ride inside the error.
//! - any other `Err` — the service or the environment is broken. Unretryable.
//!   The worker escalates and the process goes down. Fail-fast is the policy.
//!
//! 🎭 Same casting-agency setup as everything else around here: a trait, the
//! concrete impls, and an enum dispatcher so callers never need to know
//! whether they're talking to a real queue service or a Vec in a trench coat.
//!
//! 🦆 The duck is here because every file must have one. This is law.

use anyhow::Result;
use async_trait::async_trait;

use crate::message::TransportMessage;

pub(crate) mod http_queue;
pub(crate) mod in_mem;

pub(crate) use http_queue::HttpQueueSink;
pub(crate) use in_mem::InMemorySink;

use crate::app_config::SinkConfig;

/// 📦 The most messages the transport accepts in one `batch_put` call.
/// A constraint of the queue service, not a tunable — workers size their
/// batches to this and never submit more.
pub(crate) const MAX_BATCH_COUNT: usize = 10;

/// ⚠️ The "one or more messages failed" outcome — the only tolerable error a
/// sink can return. Carries the full per-message status vector so the caller
/// can name names. Detected by `err.downcast_ref::<PartialFailure>()`.
#[derive(Debug, Clone)]
pub(crate) struct PartialFailure {
    pub statuses: Vec<bool>,
}

impl std::fmt::Display for PartialFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let failed = self.statuses.iter().filter(|ok| !**ok).count();
        write!(
            f,
            "one or more messages in the batch were rejected ({failed} of {})",
            self.statuses.len()
        )
    }
}

impl std::error::Error for PartialFailure {}

/// 🕳️ A batch-capable, at-least-once message sink.
///
/// # Contract
/// - `batch_put` submits the whole batch in one call and reports per-message
///   outcome. The status vector is always the same length as the batch.
/// - Batches longer than [`MAX_BATCH_COUNT`] are refused outright.
/// - The call is synchronous from the worker's point of view and bounded by
///   the sink's own timeouts. No cancellation. It runs to completion or error.
#[async_trait]
pub(crate) trait QueueSink: std::fmt::Debug {
    async fn batch_put(&self, messages: &[TransportMessage]) -> Result<Vec<bool>>;
}

/// 🎭 The many faces of a sink. The enum dispatches to the concrete impl so
/// the workers stay blissfully ignorant of where the messages actually land.
#[derive(Debug, Clone)]
pub(crate) enum SinkBackend {
    Http(HttpQueueSink),
    InMemory(InMemorySink),
}

impl SinkBackend {
    /// 🔧 Resolve and stand up the sink named by the config. For the HTTP
    /// backend this performs the queue-handle lookup, so a missing or
    /// unreachable queue is fatal here, at startup, not 50,000 records in.
    pub(crate) async fn from_config(config: &SinkConfig) -> Result<Self> {
        match config {
            SinkConfig::Http(http_config) => Ok(Self::Http(
                HttpQueueSink::new(http_config.clone()).await?,
            )),
            SinkConfig::InMemory(_) => Ok(Self::InMemory(InMemorySink::new())),
        }
    }
}

#[async_trait]
impl QueueSink for SinkBackend {
    async fn batch_put(&self, messages: &[TransportMessage]) -> Result<Vec<bool>> {
        match self {
            SinkBackend::Http(sink) => sink.batch_put(messages).await,
            SinkBackend::InMemory(sink) => sink.batch_put(messages).await,
        }
    }
}
