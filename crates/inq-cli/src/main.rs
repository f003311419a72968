//! 🚀 inq-cli — the front door, the bouncer, the maitre d' of inq.
//!
//! 🎬 *[narrator voice]* "It all started with a simple main() function..."
//! 📦 This binary crate is the thin CLI wrapper that loads config,
//! sets up logging, and then lets the real code do the heavy lifting.
//! Like a manager. 🦆

use anyhow::{Context, Result};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// 🚀 main() — where it all begins. The genesis. The big bang.
///
/// 🔧 Steps:
/// 1. Init tracing (so we can see what goes wrong, and when)
/// 2. Print the startup banner (tradition is tradition)
/// 3. Resolve + validate the config path
/// 4. Load config (the moment of truth)
/// 5. Run the thing (send it and pray 🙏)
/// 6. Handle errors (cry)
#[tokio::main]
async fn main() -> Result<()> {
    // 📡 Set up tracing — because println! debugging is a lifestyle choice
    // we're trying to move past, like flip phones and cargo shorts
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    info!(
        "===> {} service starting up (version: {}) <===",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    );

    // 🎯 One positional arg: the config path. No arg? The ol' reliable.
    let args: Vec<String> = std::env::args().collect();
    let path_arg = args.get(1).map(String::as_str).unwrap_or("inq.toml");

    // 🔒 Validate the config file exists before we get too emotionally attached
    let config_file = std::path::Path::new(path_arg);
    let config_exists = config_file.try_exists().context(format!(
        "💀 Configuration file may not exist, couldn't even check. Maybe it's an issue with pwd/cwd and relative paths. In that case, use an absolute path, to be absolutely certain. Was checking here: '{}'",
        config_file.display()
    ))?;
    let validated_config_file = config_exists.then_some(config_file);

    // 🔧 Load the config — this is the moment where we find out if the TOML is
    // valid or if someone put a tab where a space should be (looking at you, Kevin)
    let app_config = inq::app_config::load_config(validated_config_file)
        .context("💀 Couldn't load the config. Take a look at the file, make sure it's correct, and make sure you didn't forget something obvious.")?;

    // 🚀 SEND IT. No take-backs.
    let result = inq::run(app_config).await;

    // 💀 Error handling: the part where we find out what went wrong
    // and print it in a way that's helpful at 3am
    if let Err(err) = result {
        error!("💀 error: {}", err);
        // 🧅 peel the onion of sadness, one tear-jerking layer at a time
        let mut the_vibes_are_giving_connection_issues = false;
        for cause in err.chain().skip(1) {
            error!("⚠️  cause: {}", cause);
            // 🕵️ sniff the cause like a truffle pig hunting for connection problems
            let cause_str = cause.to_string();
            if cause_str.contains("error sending request")
                || cause_str.contains("connection refused")
                || cause_str.contains("Connection refused")
                || cause_str.contains("tcp connect error")
                || cause_str.contains("dns error")
            {
                the_vibes_are_giving_connection_issues = true;
            }
        }

        // 📡 if it smells like a connection problem, it's probably a connection problem
        if the_vibes_are_giving_connection_issues {
            error!(
                "🔧 hint: looks like the queue service isn't reachable. \
                Double-check that it is actually running and that the configured \
                url points at it. If you're using Docker, try: `docker ps` to see \
                what's up, or `docker compose up -d` to resurrect it. \
                Even servers need a nudge sometimes. ☕"
            );
        }

        // 🗑️ Exit with prejudice. Process exitus maximus.
        std::process::exit(1);
    }

    // ✅ If we got here, everything worked. Pop the champagne. 🍾
    Ok(())
}
