//! Crosswire host (v1)
//!
//! Runs a handful of execution contexts in one process, wired together by
//! an in-process broadcast bus, and optionally observes outgoing HTTP
//! requests made through an intercepted client.
//!
//! # Architecture Overview
//!
//! ```text
//!   context 1                 context 2                 context N
//!  ┌───────────────┐         ┌───────────────┐         ┌───────────────┐
//!  │ChannelRegistry│         │ChannelRegistry│         │ChannelRegistry│
//!  │  #alpha       │         │  #alpha       │         │  #alpha       │
//!  │  #internal    │         │  #internal    │         │  #internal    │
//!  └──────┬────────┘         └──────┬────────┘         └──────┬────────┘
//!         │                         │                         │
//!  ───────┴─────────────────────────┴─────────────────────────┴─────── LocalBus
//!
//!  InterceptingClient ──▶ InterceptionHook ──▶ DispatchHandler ──▶ observable(PatternCatalog)
//!         │
//!         ▼
//!  ReqwestTransport ──▶ network
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use crosswire::clock::{SystemClock, UuidGenerator};
use crosswire::config::{load_config, ConfigWatcher, CrosswireConfig};
use crosswire::intercept::{DispatchHandler, InterceptingClient, ReqwestTransport};
use crosswire::lifecycle::{Shutdown, TokioScheduler};
use crosswire::matching::{observable, PatternCatalog};
use crosswire::messaging::{Capabilities, ChannelRegistry, Handler, MessageEnvelope};
use crosswire::observability::{logging::init_logging, metrics::init_metrics};
use crosswire::transport::{LocalBus, MessageEvent};

const DEMO_CHANNEL: &str = "alpha";

#[derive(Parser)]
#[command(name = "crosswire")]
#[command(about = "Cross-context broadcast messaging with request observation", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Reload request patterns when the configuration file changes
    #[arg(short, long, requires = "config")]
    watch: bool,

    /// Number of contexts to run on the shared bus
    #[arg(short = 'n', long, default_value_t = 2)]
    contexts: usize,

    /// Fetch this URL through the intercepted client
    #[arg(short, long)]
    fetch: Option<String>,

    /// HTTP method for --fetch
    #[arg(short, long, default_value = "GET")]
    method: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => CrosswireConfig::default(),
    };
    init_logging(&config.observability);

    tracing::info!("crosswire v0.1.0 starting");
    tracing::info!(
        internal_channel = %config.broadcast.internal_channel,
        continuous_handshake = config.broadcast.continuous_handshake,
        patterns = config.intercept.patterns.len(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let shutdown = Shutdown::new();
    let bus = LocalBus::new();
    let pump = bus.spawn_pump(shutdown.subscribe());
    let caps = Capabilities {
        transport: Arc::new(bus.clone()),
        scheduler: Arc::new(TokioScheduler::new(shutdown.clone())?),
        clock: Arc::new(SystemClock),
        ids: Arc::new(UuidGenerator),
    };

    let mut registries = Vec::with_capacity(cli.contexts);
    for n in 0..cli.contexts {
        let registry = ChannelRegistry::new(config.broadcast.clone(), caps.clone());
        registry.init()?;
        registry.add_channel(DEMO_CHANNEL)?;

        let label = registry.id().unwrap_or_default();
        let handler: Handler = Arc::new(move |event: &MessageEvent| {
            tracing::info!(context = %label, channel = %event.channel, data = %event.data, "Message received");
        });
        registry.adjust_channel(DEMO_CHANNEL, handler)?;

        let hello = MessageEnvelope::new("hello", format!("context {} online", n + 1), &SystemClock)
            .on_channel(DEMO_CHANNEL);
        registry.broadcast(hello)?;
        registries.push(registry);
    }

    let catalog = Arc::new(PatternCatalog::new(config.intercept.patterns.clone()));

    // Dropping the notify watcher stops it, so keep it for the whole run.
    let _watcher = if cli.watch {
        match cli.config.as_deref() {
            Some(path) => {
                let (watcher, mut updates) =
                    ConfigWatcher::new(path, catalog.clone(), config.broadcast.clone());
                let watcher = watcher.run()?;
                tokio::spawn(async move {
                    while let Some(intercept) = updates.recv().await {
                        if !intercept.enabled {
                            tracing::warn!("Interception disabled in config; restart to detach the hook");
                        }
                    }
                });
                Some(watcher)
            }
            None => None,
        }
    } else {
        None
    };

    if let Some(url) = &cli.fetch {
        let client = InterceptingClient::new(ReqwestTransport::new());
        if config.intercept.enabled {
            let dispatcher = DispatchHandler::new();
            dispatcher.init(
                &client,
                Some(observable(catalog.clone(), |pattern, report| {
                    tracing::info!(
                        pattern = %pattern.name(),
                        request_id = %report.request_id,
                        status = report.status,
                        content_type = %report.content_type,
                        "Observed request"
                    );
                })),
            )?;
        }

        match client.fetch(&cli.method, url, None).await {
            Ok(response) => tracing::info!(url = %url, status = response.status, "Fetch complete"),
            Err(e) => tracing::error!(url = %url, error = %e, "Fetch failed"),
        }
    }

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");

    for registry in &registries {
        if let Err(e) = registry.close_channel(DEMO_CHANNEL, true) {
            tracing::warn!(error = %e, "Close notice not sent");
        }
    }
    bus.deliver_pending();
    for registry in &registries {
        registry.teardown();
    }
    shutdown.trigger();
    let _ = pump.await;

    tracing::info!("Shutdown complete");
    Ok(())
}
