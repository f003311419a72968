// ai
//! 🚰 The pipeline — one driver, one bounded channel, N workers.
//!
//! 🎬 COLD OPEN — INT. A FILE, NEWLINE-DELIMITED — 2:47 AM
//!
//! Ten million lines of XML sat in a file, waiting. A driver read them, one
//! at a time, the way drivers do. A bounded channel stood between the driver
//! and the workers — not as decoration, but as the system's entire
//! backpressure story: when the workers fall behind, the channel fills, the
//! driver's send blocks, and the file simply stops being read. No message is
//! dropped at the channel. Capacity only buys timing, never correctness.
//!
//! ```text
//!   file → driver → bounded channel → BatchWorker ×N → queue sink
//! ```
//!
//! The shutdown at the end is a heuristic, not a barrier: the driver watches
//! the channel drain, then grants one grace pause, then exits. A worker can
//! still be mid-accumulation at that moment. Known limitation, kept on
//! purpose — see DESIGN.md before "fixing" it.
//!
//! 🦆 (the duck rides in the channel. the duck is message-shaped today.)

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_channel::Sender;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::sleep;
use tracing::{info, warn};

use crate::app_config::{AppConfig, IngestConfig};
use crate::extract::extract_id;
use crate::message::TransportMessage;
use crate::sinks::SinkBackend;
use crate::workers::{BatchWorker, Worker};

// driver throughput log cadence, in records
const DRIVER_LOG_EVERY: u64 = 1000;
// how often the drain loop re-checks the channel
const DRAIN_POLL_INTERVAL: Duration = Duration::from_secs(1);
// one last chance for in-flight batches before the process goes away
const DRAIN_GRACE_PERIOD: Duration = Duration::from_secs(10);

/// 🚀 Wire everything up and run the ingest to completion.
///
/// The driver runs in a race against the fault channel: the first worker to
/// hit an unrecoverable sink error wins the race, and its error becomes the
/// process-fatal one. No cleanup of other workers' in-flight batches is
/// attempted at that point — fail-fast beats availability here.
pub(crate) async fn run_pipeline(config: AppConfig) -> Result<()> {
    let sink = SinkBackend::from_config(&config.sink).await?;

    // the dispatch queue: single producer, N consumers, bounded = backpressure
    let (outbound, inbound) = async_channel::bounded(config.runtime.worker_queue_size);
    let (fault_tx, fault_rx) = async_channel::unbounded();

    for id in 1..=config.runtime.workers {
        BatchWorker::new(id, inbound.clone(), sink.clone(), fault_tx.clone()).start();
    }
    info!(
        "started {} workers (queue capacity {})",
        config.runtime.workers, config.runtime.worker_queue_size
    );

    // the fault race covers the drain too: the final partial batches flush
    // during the grace pause, and a sink meltdown there must still fail the
    // run instead of letting the process exit clean over lost messages
    let driven = tokio::select! {
        driven = async {
            run_driver(&config.ingest, &outbound).await?;
            drain(&outbound).await;
            Ok(())
        } => driven,
        fault = fault_rx.recv() => {
            match fault {
                Ok(err) => Err(err.context("a batch worker hit an unrecoverable queue sink error")),
                // unreachable while our own fault_tx clone lives, but anyhow > unwrap
                Err(_) => Err(anyhow::anyhow!("the worker fault channel closed unexpectedly")),
            }
        }
    };
    driven?;

    // a fault can land in the instant between the drain ending and the race
    // resolving; one last non-blocking look before we call the run clean
    if let Ok(err) = fault_rx.try_recv() {
        return Err(err.context("a batch worker hit an unrecoverable queue sink error"));
    }
    Ok(())
}

/// 📖 The ingest driver: sequential loop over input lines.
///
/// Per line: extract the id (a malformed line is warned about and skipped,
/// and does not advance the record counter), build the transport message,
/// push it onto the dispatch queue. The push blocks when the queue is full —
/// that stall is the backpressure contract the rest of the system leans on.
///
/// Stops at end-of-input, or after `max_count` successfully extracted
/// records when a cap is configured. Returns the number of records pushed.
pub(crate) async fn run_driver(
    config: &IngestConfig,
    outbound: &Sender<TransportMessage>,
) -> Result<u64> {
    let file = File::open(&config.file_name).await.context(format!(
        "💀 The door to '{}' would not budge. We knocked. We checked if it existed (it might not). We checked permissions (they might be wrong). The file remains unopened. We remain outside.",
        config.file_name
    ))?;
    let mut reader = BufReader::new(file);

    let mut line = String::new();
    let mut count: u64 = 0;
    let start = Instant::now();

    loop {
        line.clear();
        let bytes_read = reader
            .read_line(&mut line)
            .await
            // anything other than end-of-input is environment breakage
            .context("read failure on the input file")?;
        if bytes_read == 0 {
            break;
        }

        let record = line.trim_end_matches(['\n', '\r']);
        let id = match extract_id(record) {
            Ok(id) => id,
            Err(err) => {
                warn!("document error, ignoring ({err:#})");
                continue;
            }
        };

        outbound
            .send(TransportMessage::new(&config.data_source_name, &id, record))
            .await
            .context("the dispatch queue closed while the driver was still reading")?;
        count += 1;

        if count % DRIVER_LOG_EVERY == 0 {
            let elapsed = start.elapsed().as_secs_f64();
            info!("processed {count} records ({:.2} tps)", count as f64 / elapsed);
        }

        // cap counts successful extractions, not raw lines read
        if config.max_count > 0 && count >= config.max_count {
            info!("terminating after {count} records");
            break;
        }
    }

    let elapsed = start.elapsed().as_secs_f64();
    info!(
        "done, processed {count} records in {elapsed:.2} seconds ({:.2} tps)",
        count as f64 / elapsed
    );
    Ok(count)
}

/// 💤 Best-effort drain: wait for the channel to look empty, then pause once
/// so in-flight workers get a final opportunity to flush partial batches.
/// Explicitly not a synchronization barrier.
async fn drain(outbound: &Sender<TransportMessage>) {
    while !outbound.is_empty() {
        info!("waiting for workers to complete... zzzz");
        sleep(DRAIN_POLL_INTERVAL).await;
    }
    sleep(DRAIN_GRACE_PERIOD).await;
}
