use std::collections::VecDeque;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::message::TransportMessage;
use crate::sinks::{MAX_BATCH_COUNT, PartialFailure, QueueSink};

/// 🔧 Config for the in-memory sink. There is nothing to configure. The
/// empty struct exists so `[sink.InMemory]` parses as a TOML table like its
/// HTTP sibling does.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct InMemorySinkConfig {}

/// 📝 What the sink should answer next, instead of its default "all true".
/// Tests script these to exercise the two failure paths of the flush logic.
#[derive(Debug, Clone)]
pub(crate) enum ScriptedReply {
    /// ⚠️ Take the batch, mark these indices failed, answer PartialFailure.
    RejectIndices(Vec<usize>),
    /// 💀 Refuse the batch entirely with an unretryable error.
    Fatal(String),
}

/// 📦 A sink that never forgets. Unlike my dad, who forgot my soccer game in 1998.
///
/// `InMemorySink` hoards every batch it is handed in a shared Vec wrapped in
/// a Mutex wrapped in an Arc. It's types all the way down. Clone-able because
/// tests need to peek inside after handing a copy off to the workers — the
/// `Arc` means everyone shares the same evidence locker.
///
/// By default every `batch_put` succeeds. Queue a [`ScriptedReply`] and the
/// next call answers with that instead, which is how the worker tests inject
/// partial and fatal outcomes without a network in sight.
#[derive(Debug, Clone, Default)]
pub(crate) struct InMemorySink {
    /// 🔒 The vault. One entry per flush call, batch order preserved.
    received: Arc<Mutex<Vec<Vec<TransportMessage>>>>,
    /// 📝 Pending scripted replies, consumed front to back.
    script: Arc<Mutex<VecDeque<ScriptedReply>>>,
}

impl InMemorySink {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// 📝 Queue up what the next `batch_put` should answer.
    pub(crate) async fn script_reply(&self, reply: ScriptedReply) {
        self.script.lock().await.push_back(reply);
    }

    /// 🔎 Every batch received so far, one Vec per flush call.
    pub(crate) async fn batches(&self) -> Vec<Vec<TransportMessage>> {
        self.received.lock().await.clone()
    }

    /// 🔎 Total messages across all received batches.
    pub(crate) async fn total_received(&self) -> usize {
        self.received.lock().await.iter().map(Vec::len).sum()
    }
}

#[async_trait]
impl QueueSink for InMemorySink {
    async fn batch_put(&self, messages: &[TransportMessage]) -> Result<Vec<bool>> {
        anyhow::ensure!(
            messages.len() <= MAX_BATCH_COUNT,
            "batch of {} messages exceeds the transport limit of {MAX_BATCH_COUNT}",
            messages.len()
        );

        let scripted = self.script.lock().await.pop_front();
        match scripted {
            // 💀 a fatal reply refuses the batch outright: nothing is recorded
            Some(ScriptedReply::Fatal(reason)) => anyhow::bail!(reason),
            Some(ScriptedReply::RejectIndices(indices)) => {
                self.received.lock().await.push(messages.to_vec());
                let mut statuses = vec![true; messages.len()];
                for ix in indices {
                    statuses[ix] = false;
                }
                Err(PartialFailure { statuses }.into())
            }
            None => {
                // 🔒 The Mutex is load-bearing. Do not remove. I know it
                // looks optional. It isn't.
                self.received.lock().await.push(messages.to_vec());
                Ok(vec![true; messages.len()])
            }
        }
    }
}
