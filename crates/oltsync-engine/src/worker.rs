//! Sync worker: scan the store for dirty records and drive each through
//! its reconciliation step.
//!
//! One pass visits record kinds in dependency order so prerequisites land
//! before their dependents: technology profiles first, then access
//! devices, endpoint devices, and finally subscriber attachments (policy
//! before sync). A deletion sweep over flagged records closes the pass.

use std::sync::Arc;

use tracing::{debug, info, warn};

use oltsync_core::{Progress, Result};

use crate::context::EngineContext;
use crate::{policy, sync};

/// What one worker pass did, for logging and tests.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PassSummary {
    pub completed: u32,
    pub deferred: u32,
    pub failed: u32,
    pub retried: u32,
    pub removed: u32,
}

impl PassSummary {
    fn record(&mut self, outcome: &Result<Progress>) {
        match outcome {
            Ok(Progress::Complete) => self.completed += 1,
            Ok(Progress::Deferred(_)) => self.deferred += 1,
            Err(e) if e.is_retryable() => self.retried += 1,
            Err(_) => self.failed += 1,
        }
    }
}

/// Periodic reconciliation driver over a shared [`EngineContext`].
pub struct SyncWorker {
    ctx: Arc<EngineContext>,
}

impl SyncWorker {
    #[must_use]
    pub fn new(ctx: Arc<EngineContext>) -> Self {
        Self { ctx }
    }

    /// Run one full reconciliation pass.
    pub async fn run_pass(&self) -> PassSummary {
        let mut summary = PassSummary::default();
        self.sync_profiles(&mut summary).await;
        self.sync_devices(&mut summary).await;
        self.sync_endpoints(&mut summary).await;
        self.sync_attachments(&mut summary).await;
        self.sweep_deletions(&mut summary).await;
        info!(
            completed = summary.completed,
            deferred = summary.deferred,
            failed = summary.failed,
            retried = summary.retried,
            removed = summary.removed,
            "reconciliation pass finished"
        );
        summary
    }

    async fn sync_profiles(&self, summary: &mut PassSummary) {
        for profile in self.ctx.store.dirty_profiles() {
            let outcome = sync::sync_tech_profile(&self.ctx, profile.meta.id).await;
            summary.record(&outcome);
            self.apply(
                "TechnologyProfile",
                &profile.kv_key(),
                outcome,
                |s| self.ctx.store.mark_profile_enacted(s),
                |s, m| self.ctx.store.mark_profile_failed(s, m),
                profile.meta.id,
            );
        }
    }

    async fn sync_devices(&self, summary: &mut PassSummary) {
        for device in self.ctx.store.dirty_devices() {
            let outcome = sync::sync_access_device(&self.ctx, device.meta.id).await;
            summary.record(&outcome);
            self.apply(
                "AccessDevice",
                &device.name,
                outcome,
                |s| self.ctx.store.mark_device_enacted(s),
                |s, m| self.ctx.store.mark_device_failed(s, m),
                device.meta.id,
            );
        }
    }

    async fn sync_endpoints(&self, summary: &mut PassSummary) {
        for endpoint in self.ctx.store.dirty_endpoints() {
            let outcome = sync::sync_endpoint_device(&self.ctx, endpoint.meta.id).await;
            summary.record(&outcome);
            self.apply(
                "EndpointDevice",
                &endpoint.serial_number,
                outcome,
                |s| self.ctx.store.mark_endpoint_enacted(s),
                |s, m| self.ctx.store.mark_endpoint_failed(s, m),
                endpoint.meta.id,
            );
        }
    }

    async fn sync_attachments(&self, summary: &mut PassSummary) {
        for attachment in self.ctx.store.dirty_attachments() {
            // Policy expands the chain before the outbound step; a policy
            // failure is as fatal as a sync one.
            let outcome = match policy::attachment_policy(&self.ctx, attachment.meta.id) {
                Ok(()) => sync::sync_attachment(&self.ctx, attachment.meta.id).await,
                Err(e) => Err(e),
            };
            summary.record(&outcome);
            self.apply(
                "SubscriberAttachment",
                &attachment.name,
                outcome,
                |s| self.ctx.store.mark_attachment_enacted(s),
                |s, m| self.ctx.store.mark_attachment_failed(s, m),
                attachment.meta.id,
            );
        }
    }

    /// Apply one step's outcome to its record.
    ///
    /// `Complete` marks the record enacted. `Deferred` and retryable errors
    /// leave it dirty for the next pass. A fatal error is written onto the
    /// record and will not be retried until the record changes again.
    fn apply(
        &self,
        kind: &str,
        name: &str,
        outcome: Result<Progress>,
        enact: impl FnOnce(u32) -> Result<()>,
        fail: impl FnOnce(u32, &str) -> Result<()>,
        id: u32,
    ) {
        let marked = match outcome {
            Ok(Progress::Complete) => {
                debug!(kind, name, "record enacted");
                enact(id)
            }
            Ok(Progress::Deferred(reason)) => {
                debug!(kind, name, reason, "record deferred");
                Ok(())
            }
            Err(e) if e.is_retryable() => {
                warn!(kind, name, error = %e, "transient failure, will retry next pass");
                Ok(())
            }
            Err(e) => {
                warn!(kind, name, error = %e, "permanent failure recorded");
                fail(id, &e.to_string())
            }
        };
        if let Err(e) = marked {
            warn!(kind, name, error = %e, "failed to update record status");
        }
    }

    /// Remove records flagged for deletion, tearing down their backend
    /// state first. A teardown failure leaves the record flagged so the
    /// next pass tries again.
    async fn sweep_deletions(&self, summary: &mut PassSummary) {
        for attachment in self.ctx.store.deleted_attachments() {
            let torn_down = sync::delete_attachment(&self.ctx, &attachment).await;
            self.remove(
                "SubscriberAttachment",
                &attachment.name,
                torn_down.and_then(|()| self.ctx.store.remove_attachment(attachment.meta.id)),
                summary,
            );
        }
        for device in self.ctx.store.deleted_devices() {
            let torn_down = sync::delete_access_device(&self.ctx, &device).await;
            self.remove(
                "AccessDevice",
                &device.name,
                torn_down.and_then(|()| self.ctx.store.remove_device(device.meta.id)),
                summary,
            );
        }
        for profile in self.ctx.store.deleted_profiles() {
            let torn_down = sync::delete_tech_profile(&self.ctx, &profile).await;
            self.remove(
                "TechnologyProfile",
                &profile.kv_key(),
                torn_down.and_then(|()| self.ctx.store.remove_profile(profile.meta.id)),
                summary,
            );
        }
    }

    fn remove(&self, kind: &str, name: &str, result: Result<()>, summary: &mut PassSummary) {
        match result {
            Ok(()) => {
                info!(kind, name, "record removed");
                summary.removed += 1;
            }
            Err(e) if e.is_retryable() => {
                warn!(kind, name, error = %e, "teardown deferred, will retry next pass");
            }
            Err(e) => warn!(kind, name, error = %e, "removal refused"),
        }
    }
}
