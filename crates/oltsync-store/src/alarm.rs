//! Alarm emission seam.

use async_trait::async_trait;
use std::sync::{Mutex, MutexGuard};
use tracing::warn;

use oltsync_core::model::Alarm;
use oltsync_core::Result;

/// Consumer of alarm records produced by event handlers.
#[async_trait]
pub trait AlarmSink: Send + Sync {
    async fn emit(&self, alarm: Alarm) -> Result<()>;
}

/// Records alarms in memory; used by tests and the default wiring.
#[derive(Default)]
pub struct MemoryAlarmSink {
    alarms: Mutex<Vec<Alarm>>,
}

impl MemoryAlarmSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything emitted so far.
    #[must_use]
    pub fn emitted(&self) -> Vec<Alarm> {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Alarm>> {
        self.alarms.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl AlarmSink for MemoryAlarmSink {
    async fn emit(&self, alarm: Alarm) -> Result<()> {
        self.lock().push(alarm);
        Ok(())
    }
}

/// Writes alarms to the structured log as JSON.
#[derive(Default)]
pub struct LogAlarmSink;

#[async_trait]
impl AlarmSink for LogAlarmSink {
    async fn emit(&self, alarm: Alarm) -> Result<()> {
        match serde_json::to_string(&alarm) {
            Ok(body) => warn!(alarm_id = %alarm.id, alarm = %body, "alarm"),
            Err(e) => warn!(alarm_id = %alarm.id, error = %e, "alarm not serializable"),
        }
        Ok(())
    }
}
