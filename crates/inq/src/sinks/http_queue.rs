// ai
//! # 📡 THE HTTP QUEUE BACKEND
//!
//! *Previously, on inq...*
//!
//! 🎬 COLD OPEN — INT. SERVER ROOM — 3:47 AM
//!
//! The ingest had been running for six hours. The queue service dashboard
//! glowed a reassuring green. Somewhere in the distance, a pager stayed
//! quiet, which was somehow worse. "Just POST the batch," they said.
//! "The queue is at-least-once," someone promised, once, at a conference.
//!
//! 🚀 This module ships batches of transport messages into the remote queue
//! service and reads back the per-message verdict. It is equal parts HTTP
//! client, status-vector interpreter, and coping mechanism. It does not
//! retry. Retries are a policy decision this pipeline deliberately refuses
//! to make (see the batch worker for what happens instead).
//!
//! 🦆 (mandatory duck, no context provided, none shall be requested)

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, trace};

use crate::message::TransportMessage;
use crate::sinks::{MAX_BATCH_COUNT, PartialFailure, QueueSink};

/// 📡 Where and what to send. `url` is the queue service root, `queue_name`
/// is the human name we resolve to a handle at startup.
#[derive(Debug, Deserialize, Clone)]
pub struct HttpQueueSinkConfig {
    /// 📡 Queue service root URL. Where to send the bodies. Uh. The records.
    pub url: String,
    /// 🏷️ Destination queue by name. Resolved to a handle once, at startup.
    pub queue_name: String,
}

/// 📬 The handle-lookup reply: the service's opaque name for the queue.
#[derive(Debug, Deserialize)]
struct QueueHandleReply {
    handle: String,
}

/// 📬 The batch-put reply: one bool per submitted message, in order.
#[derive(Debug, Deserialize)]
struct BatchPutReply {
    statuses: Vec<bool>,
}

/// 📡 The HTTP face of the queue service — pure I/O, zero buffering.
///
/// Accepts a batch, POSTs it as JSON, interprets the status vector. The
/// batch worker upstream owns accumulation, flush timing, and what to do
/// about failures. This type only ever does the wire round trip.
///
/// Cheap to clone — each worker carries its own copy and the underlying
/// `reqwest::Client` shares its connection pool across clones.
#[derive(Debug, Clone)]
pub(crate) struct HttpQueueSink {
    client: reqwest::Client,
    messages_url: String,
}

impl HttpQueueSink {
    /// 🚀 Stand up the sink, fully wired and ready to transmit.
    ///
    /// Two things happen here:
    /// 1. The `reqwest::Client` is built with sane timeouts (10s connect,
    ///    30s request). The flush call is bounded by these — there is no
    ///    other timeout anywhere in the send path.
    /// 2. The queue name is resolved to a handle with a GET. If the queue
    ///    does not exist we fail loudly now, not mid-ingest.
    pub(crate) async fn new(config: HttpQueueSinkConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()
            // 💀 The HTTP client refused to be born. The TLS stack wept.
            .context("💀 Could not build the HTTP client. Probably a missing TLS cert or a cursed system OpenSSL. Either way: tragic.")?;

        // 📡 Resolve queue name → queue handle. The service's front desk.
        let base = config.url.trim_end_matches('/');
        let queue_url = format!("{base}/queues/{}", config.queue_name);
        let response = client
            .get(&queue_url)
            .send()
            .await
            .context(format!(
                "💀 Reached out to resolve queue '{}' and got ghosted. The network is giving us the silent treatment, or the queue service is not running. Either way: we cannot proceed.",
                config.queue_name
            ))?;

        let status = response.status();
        if !status.is_success() {
            // 💀 The queue does not exist. This is not a warning. This is a
            // hard stop. Publishing into a nonexistent queue is chaos.
            anyhow::bail!(
                "💀 Queue '{}' could not be resolved ({status}). We knocked. We waited. The door remained unanswered. Check the queue name, or create the queue.",
                config.queue_name
            );
        }

        let handle: QueueHandleReply = response
            .json()
            .await
            .context("💀 The queue service answered the handle lookup with something that is not the handle JSON we agreed on. Someone changed the API and told no one.")?;
        debug!(
            "✅ queue '{}' resolved to handle '{}' — welcome mat is out, service is home",
            config.queue_name, handle.handle
        );

        let messages_url = format!("{base}/queues/{}/messages", handle.handle);
        Ok(Self {
            client,
            messages_url,
        })
    }
}

#[async_trait]
impl QueueSink for HttpQueueSink {
    /// 📡 POST one batch, read one verdict.
    ///
    /// 🔄 This function does not retry. A non-2xx reply is a fatal error for
    /// the caller to escalate. A 2xx reply with false statuses becomes a
    /// [`PartialFailure`] carrying the vector.
    async fn batch_put(&self, messages: &[TransportMessage]) -> Result<Vec<bool>> {
        // Transport constraint, enforced on our side of the wire too. The
        // workers never build an oversized batch; anything else is a bug.
        anyhow::ensure!(
            messages.len() <= MAX_BATCH_COUNT,
            "batch of {} messages exceeds the transport limit of {MAX_BATCH_COUNT}",
            messages.len()
        );

        let total_bytes: usize = messages.iter().map(|m| m.payload().len()).sum();
        debug!(
            "📡 sending batch of {} messages ({total_bytes} bytes) — the payload has left the building, Elvis-style",
            messages.len()
        );

        let response = self
            .client
            .post(&self.messages_url)
            .json(messages)
            .send()
            .await
            // 💀 We gathered the messages. We serialized them with artisanal
            // care. And the network layer dropped the packet. No response.
            // No closure. Just an Err.
            .context("💀 The batch never made it to the queue service. We launched the payload into the network and the network responded with what can only be described as 'not vibing with it.'")?;

        let status = response.status();
        if !status.is_success() {
            // the body usually says which part of the request offended it
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!(
                "💀 The batch arrived, but the queue service looked at our messages and said '{status}'. The body of the response read: '{body}'."
            );
        }

        let reply: BatchPutReply = response
            .json()
            .await
            .context("💀 The queue service accepted the batch but replied with JSON we cannot read. Schrodinger's send: it probably worked, and we refuse to guess.")?;

        anyhow::ensure!(
            reply.statuses.len() == messages.len(),
            "queue service returned {} statuses for a batch of {}",
            reply.statuses.len(),
            messages.len()
        );

        if reply.statuses.iter().all(|ok| *ok) {
            trace!("🚀 batch landed in full — all statuses true, nobody clapped, the work was done");
            Ok(reply.statuses)
        } else {
            Err(PartialFailure {
                statuses: reply.statuses,
            }
            .into())
        }
    }
}
