//! 📦 inq — reads a file of newline-delimited XML records, stamps each one
//! into a transport message, and fans the messages out across a pool of
//! batch workers that publish them to a remote message queue for downstream
//! indexing.
//!
//! The interesting part is the middle: a bounded dispatch queue feeding
//! workers that flush on batch-full or idle-timeout, with partial-failure
//! handling at the sink. Everything around that — config, file reading, id
//! extraction — is sequential plumbing and behaves like it.

pub mod app_config;
mod extract;
mod message;
mod pipeline;
mod sinks;
mod workers;

use anyhow::{Context, Result};
use app_config::AppConfig;

pub async fn run(app_config: AppConfig) -> Result<()> {
    pipeline::run_pipeline(app_config)
        .await
        .context("the ingest pipeline did not finish cleanly")
}
