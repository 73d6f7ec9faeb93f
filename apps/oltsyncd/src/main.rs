//! oltsyncd: access-network reconciliation daemon.
//!
//! Periodically pulls the device backend inventory, runs the sync worker
//! over dirty records, and feeds bus events read as NDJSON from stdin
//! (`{"topic": "...", "payload": {...}}` per line) into the dispatcher.

mod config;
mod logging;

use std::sync::Arc;

use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tracing::{error, info, warn};

use oltsync_client::ProfileKvClient;
use oltsync_core::graph::AccessService;
use oltsync_engine::context::{EngineContext, PollConfig, RetryConfig, ValidationRegistry};
use oltsync_engine::{event, pull, SyncWorker};
use oltsync_store::{LogAlarmSink, RecordStore};

use config::Config;

/// One line of the stdin event feed.
#[derive(Debug, Deserialize)]
struct BusEvent {
    topic: String,
    payload: serde_json::Value,
}

#[tokio::main]
async fn main() {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("FATAL: configuration error: {e}");
            std::process::exit(1);
        }
    };
    logging::init_logging(&config.rust_log);

    let ctx = match build_context(&config) {
        Ok(ctx) => Arc::new(ctx),
        Err(e) => {
            error!(error = %e, "failed to build engine context");
            std::process::exit(1);
        }
    };

    info!(
        pull_interval = ?config.pull_interval,
        sync_interval = ?config.sync_interval,
        "oltsyncd starting"
    );

    let pull_ctx = Arc::clone(&ctx);
    let pull_interval = config.pull_interval;
    let pull_task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(pull_interval);
        loop {
            ticker.tick().await;
            if let Err(e) = pull::run_pull(&pull_ctx).await {
                warn!(error = %e, "pull cycle failed");
            }
        }
    });

    let worker = SyncWorker::new(Arc::clone(&ctx));
    let sync_interval = config.sync_interval;
    let worker_task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(sync_interval);
        loop {
            ticker.tick().await;
            worker.run_pass().await;
        }
    });

    let event_ctx = Arc::clone(&ctx);
    let event_task = tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    handle_event_line(&event_ctx, line).await;
                }
                Ok(None) => {
                    info!("event feed closed");
                    break;
                }
                Err(e) => {
                    warn!(error = %e, "failed to read event feed");
                    break;
                }
            }
        }
    });

    match signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(e) => error!(error = %e, "failed to listen for shutdown signal"),
    }
    pull_task.abort();
    worker_task.abort();
    event_task.abort();
    info!("oltsyncd stopped");
}

fn build_context(config: &Config) -> Result<EngineContext, Box<dyn std::error::Error>> {
    let store = Arc::new(RecordStore::new());
    if let Some(path) = config.service_graph_path.as_deref() {
        seed_service_graph(&store, path)?;
    } else {
        warn!("no service graph file configured, starting with an empty store");
    }

    Ok(EngineContext {
        store,
        alarms: Arc::new(LogAlarmSink),
        profile_kv: ProfileKvClient::new(&config.profile_kv_url)?,
        validators: ValidationRegistry::new(),
        poll: PollConfig {
            max_attempts: config.poll_max_attempts,
            interval: config.poll_interval,
        },
        retry: RetryConfig {
            attempts: config.retry_attempts,
            delay: config.retry_delay,
        },
    })
}

fn seed_service_graph(
    store: &RecordStore,
    path: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let raw = std::fs::read_to_string(path)?;
    let services: Vec<AccessService> = serde_json::from_str(&raw)?;
    for service in services {
        let service = store.insert_service(service);
        info!(service = %service.name, backend = %service.backend_url, "service loaded");
    }
    Ok(())
}

async fn handle_event_line(ctx: &Arc<EngineContext>, line: &str) {
    let event: BusEvent = match serde_json::from_str(line) {
        Ok(event) => event,
        Err(e) => {
            warn!(error = %e, "discarding malformed event line");
            return;
        }
    };
    let payload = event.payload.to_string();
    if let Err(e) = event::dispatch(ctx, &event.topic, &payload).await {
        warn!(topic = %event.topic, error = %e, "event handling failed");
    }
}
