//! 🎬 *[a channel fills with messages. somewhere, a queue waits.]*
//! *[the clock on the wall reads 2:47am.]*
//! *[nobody asked for this ingest. and yet, here we are.]*
//!
//! 📦 The BatchWorker module — patient, tireless, and deeply unbothered by
//! the chaos happening upstream. It receives messages. It accumulates
//! batches. It flushes when the batch is full or the channel goes quiet.
//! It is, in many ways, the most emotionally stable part of this codebase.
//!
//! The whole state machine is one blocking race per iteration: the next
//! message against the idle clock. A full batch flushes immediately. An idle
//! worker flushes whatever it holds. That dual trigger bounds both the
//! staleness of a message (one idle interval, workers keeping up) and the
//! size of a transmit (the transport's batch cap).
//!
//! 🦆 (the duck has no comment at this time)

use std::time::{Duration, Instant};

use anyhow::Result;
use async_channel::{Receiver, Sender};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::Worker;
use crate::message::{ATTR_RECORD_ID, TransportMessage};
use crate::sinks::{MAX_BATCH_COUNT, PartialFailure, QueueSink, SinkBackend};

/// ⏳ How long a worker waits on the channel before flushing what it has.
pub(crate) const IDLE_FLUSH_INTERVAL: Duration = Duration::from_secs(5);

// throughput log line cadence, in messages
const THROUGHPUT_LOG_EVERY: u64 = 1000;

/// 🧵 One batch worker: pulls from the shared dispatch queue, accumulates up
/// to [`MAX_BATCH_COUNT`] messages, flushes on full-or-idle.
///
/// Workers never talk to each other. All the state in here — the batch, the
/// counters, the throughput window — is strictly worker-owned. The only
/// shared things a worker touches are the inbound channel and the fault
/// channel it reports unrecoverable sink errors into.
#[derive(Debug)]
pub(crate) struct BatchWorker {
    id: usize,
    inbound: Receiver<TransportMessage>,
    sink: SinkBackend,
    faults: Sender<anyhow::Error>,
    idle_flush: Duration,
}

impl BatchWorker {
    pub(crate) fn new(
        id: usize,
        inbound: Receiver<TransportMessage>,
        sink: SinkBackend,
        faults: Sender<anyhow::Error>,
    ) -> Self {
        Self {
            id,
            inbound,
            sink,
            faults,
            idle_flush: IDLE_FLUSH_INTERVAL,
        }
    }

    /// ⏳ Tests run the idle clock in milliseconds, not wall-clock seconds.
    #[cfg(test)]
    pub(crate) fn with_idle_flush(mut self, idle_flush: Duration) -> Self {
        self.idle_flush = idle_flush;
        self
    }
}

impl Worker for BatchWorker {
    fn start(self) -> JoinHandle<Result<()>> {
        tokio::spawn(async move { self.run().await })
    }
}

impl BatchWorker {
    async fn run(self) -> Result<()> {
        debug!("📥 worker {} started draining the dispatch queue", self.id);

        // the batch storage is reused across flushes, cleared not dropped
        let mut batch: Vec<TransportMessage> = Vec::with_capacity(MAX_BATCH_COUNT);
        let mut total_count: u64 = 0;
        let mut window_start = Instant::now();

        loop {
            // ⏳ the race: next message vs. the idle clock
            match timeout(self.idle_flush, self.inbound.recv()).await {
                Ok(Ok(message)) => {
                    batch.push(message);
                    total_count += 1;

                    if batch.len() == MAX_BATCH_COUNT {
                        self.flush(&mut batch).await?;
                    }

                    if total_count % THROUGHPUT_LOG_EVERY == 0 {
                        let elapsed = window_start.elapsed().as_secs_f64();
                        info!(
                            "worker {}: processed {} messages ({:.2} tps)",
                            self.id,
                            total_count,
                            total_count as f64 / elapsed
                        );
                    }
                }
                Err(_elapsed) => {
                    // we timed out, probably best to send anything pending
                    if !batch.is_empty() {
                        self.flush(&mut batch).await?;
                        let elapsed = window_start.elapsed().as_secs_f64();
                        info!(
                            "worker {}: processed {} messages (flushing on idle) ({:.2} tps)",
                            self.id,
                            total_count,
                            total_count as f64 / elapsed
                        );
                    }
                    // the throughput window restarts on every idle, flush or not
                    window_start = Instant::now();
                }
                Ok(Err(_closed)) => {
                    // channel closed: push out the remainder and clock out
                    if !batch.is_empty() {
                        self.flush(&mut batch).await?;
                    }
                    debug!("🏁 worker {}: channel closed, shutting down", self.id);
                    return Ok(());
                }
            }
        }
    }

    /// 📡 Submit the batch and sort the outcome into the error taxonomy.
    ///
    /// - full success: silence. the periodic throughput line is enough.
    /// - partial failure: one warning per failed index, then carry on. The
    ///   failed messages are dropped — there is no retry or requeue path.
    /// - anything else: report into the fault channel and bail. The process
    ///   is coming down; continuing would mean silent, accumulating loss.
    ///
    /// The batch is cleared after every attempt, whatever the outcome.
    async fn flush(&self, batch: &mut Vec<TransportMessage>) -> Result<()> {
        let result = self.sink.batch_put(batch).await;

        let outcome = match result {
            Ok(_) => Ok(()),
            Err(err) => {
                if let Some(partial) = err.downcast_ref::<PartialFailure>() {
                    for (ix, ok) in partial.statuses.iter().enumerate() {
                        if !*ok {
                            let record = batch
                                .get(ix)
                                .and_then(|m| m.attribute(ATTR_RECORD_ID))
                                .unwrap_or("unknown");
                            warn!(
                                "worker {}: message {ix} (record {record}) failed to send to queue",
                                self.id
                            );
                        }
                    }
                    Ok(())
                } else {
                    let summary = format!("worker {}: fatal queue sink error: {err:#}", self.id);
                    // best effort: the receiver may already be gone mid-abort
                    let _ = self.faults.send(err).await;
                    Err(anyhow::anyhow!(summary))
                }
            }
        };

        // the batch storage is reused; cleared after every attempt, success or not
        batch.clear();
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sinks::InMemorySink;
    use crate::sinks::in_mem::ScriptedReply;

    const TEST_IDLE: Duration = Duration::from_millis(200);

    struct Rig {
        tx: async_channel::Sender<TransportMessage>,
        sink: InMemorySink,
        faults_rx: async_channel::Receiver<anyhow::Error>,
        handle: JoinHandle<Result<()>>,
    }

    fn rig(queue_capacity: usize) -> Rig {
        let (tx, rx) = async_channel::bounded(queue_capacity);
        let (fault_tx, faults_rx) = async_channel::unbounded();
        let sink = InMemorySink::new();
        let worker = BatchWorker::new(1, rx, SinkBackend::InMemory(sink.clone()), fault_tx)
            .with_idle_flush(TEST_IDLE);
        let handle = worker.start();
        Rig {
            tx,
            sink,
            faults_rx,
            handle,
        }
    }

    fn message(ix: usize) -> TransportMessage {
        TransportMessage::new("test-source", &format!("rec-{ix}"), "<doc/>")
    }

    #[tokio::test]
    async fn the_one_where_full_batches_flush_at_exactly_the_cap() {
        let rig = rig(64);
        for ix in 0..25 {
            rig.tx.send(message(ix)).await.unwrap();
        }
        rig.tx.close();
        rig.handle.await.unwrap().unwrap();

        let batches = rig.sink.batches().await;
        // two capped batches, one close-time remainder; accounting is total
        let sizes: Vec<usize> = batches.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![MAX_BATCH_COUNT, MAX_BATCH_COUNT, 5]);
        assert_eq!(rig.sink.total_received().await, 25);

        // within one worker, batch order is arrival order
        let ids: Vec<String> = batches
            .iter()
            .flatten()
            .map(|m| m.attribute(ATTR_RECORD_ID).unwrap().to_string())
            .collect();
        let expected: Vec<String> = (0..25).map(|ix| format!("rec-{ix}")).collect();
        assert_eq!(ids, expected);
    }

    #[tokio::test]
    async fn the_one_where_an_idle_worker_flushes_what_it_has() {
        let rig = rig(64);
        for ix in 0..3 {
            rig.tx.send(message(ix)).await.unwrap();
        }

        // stay quiet for a few idle intervals; the partial batch must go out
        tokio::time::sleep(TEST_IDLE * 5).await;
        let batches = rig.sink.batches().await;
        assert_eq!(batches.len(), 1, "idle flush must have happened");
        assert_eq!(batches[0].len(), 3);

        // the batch was emptied by the flush: closing now flushes nothing new
        rig.tx.close();
        rig.handle.await.unwrap().unwrap();
        assert_eq!(rig.sink.batches().await.len(), 1);
    }

    #[tokio::test]
    async fn the_one_where_rejected_messages_are_dropped_not_fatal() {
        let rig = rig(64);
        rig.sink
            .script_reply(ScriptedReply::RejectIndices(vec![2, 5]))
            .await;

        // a full batch triggers the partially-failing flush
        for ix in 0..MAX_BATCH_COUNT {
            rig.tx.send(message(ix)).await.unwrap();
        }
        // the worker must shrug and keep accepting work afterwards
        for ix in MAX_BATCH_COUNT..MAX_BATCH_COUNT + 3 {
            rig.tx.send(message(ix)).await.unwrap();
        }
        rig.tx.close();
        rig.handle.await.unwrap().unwrap();

        let sizes: Vec<usize> = rig.sink.batches().await.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![MAX_BATCH_COUNT, 3]);
        assert!(rig.faults_rx.is_empty(), "partial failure is not a fault");
    }

    #[tokio::test]
    async fn the_one_where_a_sink_meltdown_stops_the_worker() {
        let rig = rig(64);
        rig.sink
            .script_reply(ScriptedReply::Fatal("the queue service is a crater".into()))
            .await;

        for ix in 0..MAX_BATCH_COUNT {
            rig.tx.send(message(ix)).await.unwrap();
        }

        // the fault is reported on the shared channel...
        let fault = rig.faults_rx.recv().await.unwrap();
        assert!(fault.to_string().contains("crater"));

        // ...and the worker halts with an error, no further flush attempts
        let result = rig.handle.await.unwrap();
        assert!(result.is_err());
        assert_eq!(rig.sink.batches().await.len(), 0);
    }

    #[tokio::test]
    async fn the_one_where_the_channel_closes_mid_accumulation() {
        let rig = rig(64);
        for ix in 0..4 {
            rig.tx.send(message(ix)).await.unwrap();
        }
        rig.tx.close();
        rig.handle.await.unwrap().unwrap();

        // the pending partial batch went out exactly once
        let sizes: Vec<usize> = rig.sink.batches().await.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![4]);
    }
}
