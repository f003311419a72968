//! 🔧 App Configuration — the sacred TOML-to-struct pipeline.
//!
//! 📡 "Config not found: We looked everywhere. Under the couch. Behind the
//! fridge. In the junk drawer. Nothing." — every developer at 3am 🦆
//!
//! 🏗️ Powered by Figment, because manually parsing env vars is a form of
//! self-harm that even the borrow checker wouldn't approve of.

use anyhow::Context;
use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::Deserialize;
use std::path::Path;
use tracing::info;

use crate::sinks::http_queue::HttpQueueSinkConfig;
use crate::sinks::in_mem::InMemorySinkConfig;

/// 📦 The AppConfig: one struct to rule them all, one struct to find them,
/// one struct to bring them all, and in the Figment bind them.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// 📖 What to read and how to label it.
    pub ingest: IngestConfig,
    /// 🧵 How many workers, how deep the dispatch queue.
    #[serde(default)]
    pub runtime: RuntimeConfig,
    /// 🕳️ Where the batches go.
    pub sink: SinkConfig,
}

/// 📖 Ingest-side knobs: the input file, the source label stamped into every
/// message, and an optional record cap.
#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    /// 📂 Newline-delimited input file, one XML record per line.
    pub file_name: String,
    /// 🏷️ Stamped into every message's record-source attribute.
    pub data_source_name: String,
    /// 🔢 0 means unbounded; otherwise the driver stops after this many
    /// successfully extracted records.
    #[serde(default)]
    pub max_count: u64,
}

/// 🧵 Concurrency knobs. Defaults are deliberately timid — one worker and a
/// modest queue — so a bare config does something sane on a laptop.
#[derive(Debug, Deserialize, Clone)]
pub struct RuntimeConfig {
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_worker_queue_size")]
    pub worker_queue_size: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            worker_queue_size: default_worker_queue_size(),
        }
    }
}

fn default_workers() -> usize {
    1
}

fn default_worker_queue_size() -> usize {
    100
}

/// 🎭 Which sink backend to stand up. Externally tagged so the TOML reads
/// `[sink.Http]` or `[sink.InMemory]` — the table name picks the variant.
#[derive(Debug, Deserialize, Clone)]
pub enum SinkConfig {
    Http(HttpQueueSinkConfig),
    InMemory(InMemorySinkConfig),
}

/// 🚀 Load the config — from a file, from env vars, or from the sheer power
/// of hoping.
///
/// 🔧 Merges environment variables (INQ_*) with an optional TOML file.
///   - `config_file_name` is None → env vars only. No file. No assumptions.
///   - `config_file_name` is Some → env vars + TOML file, merged. TOML wins
///     on conflicts.
///
/// 💀 Returns an error if the config is unparseable. Which it will be. Check
/// the error message though — it's contextual and written with love. Or
/// despair. Hard to tell at 3am.
pub fn load_config(config_file_name: Option<&Path>) -> anyhow::Result<AppConfig> {
    info!(
        "🔧 Loading configuration: {:#?}",
        config_file_name.unwrap_or(Path::new(""))
    );

    // 🏗️ env vars are the base layer, like a good sourdough starter
    let config = Figment::new().merge(Env::prefixed("INQ_"));

    let config = match config_file_name {
        Some(file_name) => config.merge(Toml::file(file_name)),
        None => config,
    };

    let context_msg = match config_file_name {
        Some(path) => format!(
            "💀 Failed to parse configuration from file '{}' and environment variables (INQ_*). The file exists in our hearts, but apparently not in a shape serde recognizes.",
            path.display()
        ),
        None => "💀 Failed to parse configuration from environment variables (INQ_*). No file was provided — this one's all on the environment. Classic."
            .to_string(),
    };

    config.extract().context(context_msg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_test_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("💀 Failed to create test config. The filesystem said 'new phone who dis'.");
        file.write_all(contents.as_bytes())
            .expect("💀 Failed to write test config");
        file
    }

    #[test]
    fn the_one_where_a_full_toml_loads_every_knob() {
        let config_file = write_test_config(
            r#"
            [ingest]
            file_name = "records.xml"
            data_source_name = "archive-a"
            max_count = 500

            [runtime]
            workers = 4
            worker_queue_size = 32

            [sink.Http]
            url = "http://localhost:9000"
            queue_name = "ingest-out"
            "#,
        );

        let app_config = load_config(Some(config_file.path()))
            .expect("💀 A fully specified config should parse");

        assert_eq!(app_config.ingest.file_name, "records.xml");
        assert_eq!(app_config.ingest.data_source_name, "archive-a");
        assert_eq!(app_config.ingest.max_count, 500);
        assert_eq!(app_config.runtime.workers, 4);
        assert_eq!(app_config.runtime.worker_queue_size, 32);
        match app_config.sink {
            SinkConfig::Http(http) => {
                assert_eq!(http.url, "http://localhost:9000");
                assert_eq!(http.queue_name, "ingest-out");
            }
            honestly_who_knows => panic!(
                "💀 Expected the Http sink config, but serde took us to {honestly_who_knows:?}. Plot twist energy."
            ),
        }
    }

    #[test]
    fn the_one_where_the_defaults_show_up_uninvited_but_helpful() {
        let config_file = write_test_config(
            r#"
            [ingest]
            file_name = "records.xml"
            data_source_name = "archive-a"

            [sink.InMemory]
            "#,
        );

        let app_config =
            load_config(Some(config_file.path())).expect("💀 Defaults should fill the gaps");

        assert_eq!(app_config.ingest.max_count, 0, "0 means unbounded");
        assert_eq!(app_config.runtime.workers, 1);
        assert_eq!(app_config.runtime.worker_queue_size, 100);
        assert!(matches!(app_config.sink, SinkConfig::InMemory(_)));
    }

    #[test]
    fn the_one_where_a_config_without_a_sink_is_refused() {
        let config_file = write_test_config(
            r#"
            [ingest]
            file_name = "records.xml"
            data_source_name = "archive-a"
            "#,
        );

        assert!(load_config(Some(config_file.path())).is_err());
    }
}
