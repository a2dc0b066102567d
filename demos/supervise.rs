//! # Example: supervise
//!
//! Supervise a few shell commands with a [`Registry`] and watch the lifecycle
//! through `tracing`.
//!
//! Demonstrates how to:
//! - Build a registry with the built-in [`LogWriter`] subscriber.
//! - Add a long-running service, a crash-looping job and a port-hungry server.
//! - Observe the retry budget running out for the crash loop.
//! - Tear everything down on Ctrl-C.
//!
//! ## Flow
//! ```text
//! main()
//!   ├─► Registry::builder(cfg).with_subscribers([LogWriter]).build()
//!   ├─► add("ticker")  sh -c 'while true; do echo tick; sleep 1; done'
//!   ├─► add("flaky")   sh -c 'exit 3'     (max_retries = 2)
//!   ├─► add("server")  EphemeralPort ─► python3 -m http.server <port>
//!   ├─► start(...)     flaky reports its exit error within the grace window
//!   └─► stop_all_on_signal()
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=procvisor=info cargo run --example supervise
//! ```

use std::{sync::Arc, time::Duration};

use procvisor::{
    Config, EphemeralPort, LogWriter, PortTable, ProcessSpec, Registry, Subscribe,
};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // 1) Configure runtime
    let cfg = Config {
        start_grace: Duration::from_secs(2),
        terminate_timeout: Duration::from_secs(2),
        ..Config::default()
    };
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let registry = Registry::builder(cfg).with_subscribers(subs).build();

    // 2) A well-behaved service
    registry
        .add(
            "ticker",
            ProcessSpec::new(["while true; do echo tick; sleep 1; done"]).with_shell(true),
        )
        .await?;

    // 3) A job that always fails
    registry
        .add(
            "flaky",
            ProcessSpec::new(["sh", "-c", "exit 3"])
                .with_max_retries(2)
                .with_restart_delay(Duration::from_millis(100))
                .on_stop(|_| println!("[flaky] cleanup after supervision ended")),
        )
        .await?;

    // 4) A server that needs a fresh port on every launch
    let ports = Arc::new(PortTable::new());
    let args = EphemeralPort::new(
        |port, _extra: &[String]| {
            vec![
                "python3".to_string(),
                "-m".to_string(),
                "http.server".to_string(),
                port.to_string(),
            ]
        },
        ports.recorder("server"),
    );
    registry
        .add("server", ProcessSpec::computed(Arc::new(args)))
        .await?;

    // 5) Start everything
    registry.start("ticker", &[]).await?;
    if let Err(e) = registry.start("flaky", &[]).await {
        println!("flaky gave up: {e} ({})", e.as_label());
    }
    match registry.start("server", &[]).await {
        Ok(()) => println!("server listening on {:?}", ports.address("server")),
        Err(e) => println!("server failed: {e}"),
    }

    for name in registry.list().await {
        if let Some(status) = registry.status(&name).await {
            println!(
                "{name:>8}: {:<11} pid={:?} retries={}",
                status.phase.as_str(),
                status.pid,
                status.retries
            );
        }
    }

    // 6) Wait for Ctrl-C, then stop every child
    println!("press Ctrl-C to stop");
    registry.stop_all_on_signal().await?;
    Ok(())
}
