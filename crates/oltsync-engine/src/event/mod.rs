//! Event path: asynchronous notifications converted into record updates
//! and state invalidation.
//!
//! Handlers never call external systems directly; they touch the store so
//! the next sync pass does the outbound work.

use tracing::debug;

use oltsync_core::{EngineError, Result};

use crate::context::EngineContext;

mod endpoint_activate;
mod port_link;
mod workload;

/// Switch port up/down notifications from the controller.
pub const TOPIC_PORT_LINK: &str = "link.port";
/// Workload lifecycle notifications from the orchestrator.
pub const TOPIC_WORKLOAD: &str = "workload.lifecycle";
/// Endpoint activation notifications from the device backend.
pub const TOPIC_ENDPOINT_ACTIVATE: &str = "endpoint.activate";

/// Route one raw event to its handler.
///
/// An unknown topic is not an error: the bus carries traffic for other
/// consumers too. A payload that is not JSON is.
pub async fn dispatch(ctx: &EngineContext, topic: &str, payload: &str) -> Result<()> {
    let value: serde_json::Value = serde_json::from_str(payload)
        .map_err(|e| EngineError::validation(format!("malformed event on {topic}: {e}")))?;
    match topic {
        TOPIC_PORT_LINK => port_link::handle(ctx, &value).await,
        TOPIC_WORKLOAD => workload::handle(ctx, &value),
        TOPIC_ENDPOINT_ACTIVATE => endpoint_activate::handle(ctx, &value).await,
        other => {
            debug!(topic = other, "ignoring event on unhandled topic");
            Ok(())
        }
    }
}
