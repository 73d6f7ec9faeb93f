//! Model policy: expand a subscriber attachment into its service chain.
//!
//! Runs after an attachment is saved and before its sync step. Every run
//! converges to the same end state; a run that finds nothing to do writes
//! nothing.

use tracing::{debug, info, warn};

use oltsync_core::model::{DownstreamServiceInstance, Link};
use oltsync_core::{EngineError, Result};

use crate::context::EngineContext;

/// Reconcile one attachment's endpoint association and downstream chain.
///
/// Detach handling comes first: an attachment that has seen link deletions
/// and now has no links left is itself flagged for deletion, and nothing
/// else runs. Otherwise the westbound `onu_device` serial is resolved to a
/// local endpoint record as a hard requirement, inherited values (endpoint
/// id, PON s-tag) are filled in, and for each declared downstream
/// dependency exactly one instance-plus-link pair is ensured.
pub fn attachment_policy(ctx: &EngineContext, attachment_id: u32) -> Result<()> {
    let attachment = ctx.store.get_attachment(attachment_id)?;
    let service = ctx.store.get_service(attachment.service_id)?;

    let links = ctx.store.links_for_subscriber(attachment_id);
    if attachment.link_deleted_count > 0 && links.is_empty() {
        info!(
            attachment = %attachment.name,
            "all downstream links removed, flagging attachment for deletion"
        );
        ctx.store.flag_attachment_deleted(attachment_id)?;
        return Ok(());
    }

    // The endpoint association is a hard requirement: an attachment whose
    // serial cannot be resolved must surface on the record, not converge
    // silently.
    let serial = attachment
        .westbound_property("onu_device")
        .map(str::to_owned)
        .ok_or_else(|| {
            EngineError::validation(format!(
                "attachment {} carries no onu_device property",
                attachment.name
            ))
        })?;
    let endpoint = ctx
        .store
        .find_endpoint_by_serial(&serial)
        .ok_or_else(|| EngineError::not_found("EndpointDevice", serial.clone()))?;

    let mut attachment = attachment;
    let mut changed = false;
    if attachment.endpoint_id != Some(endpoint.meta.id) {
        attachment.endpoint_id = Some(endpoint.meta.id);
        changed = true;
    }
    if attachment.s_tag.is_none() {
        let pon = ctx.store.get_pon_port(endpoint.pon_port_id)?;
        if pon.s_tag.is_some() {
            attachment.s_tag = pon.s_tag;
            changed = true;
        }
    }
    if changed {
        attachment = ctx.store.save_attachment(attachment);
    } else {
        debug!(attachment = %attachment.name, "attachment already converged");
    }

    for dependency in service.downstreams() {
        ensure_downstream(ctx, &attachment.name, attachment_id, &dependency.name)?;
    }
    Ok(())
}

/// Make sure exactly one downstream instance of `dependency` is linked to
/// the attachment. Duplicates can appear when an external system recreates
/// instances; the newest one wins and the rest are removed.
fn ensure_downstream(
    ctx: &EngineContext,
    attachment_name: &str,
    attachment_id: u32,
    dependency: &str,
) -> Result<()> {
    let mut matching: Vec<Link> = Vec::new();
    for link in ctx.store.links_for_subscriber(attachment_id) {
        match ctx.store.get_downstream(link.provider_id) {
            Ok(instance) if instance.owner_dependency == dependency => matching.push(link),
            Ok(_) => {}
            Err(_) => {
                // Dangling link, its provider is already gone.
                warn!(link = link.meta.id, "removing link with missing provider");
                ctx.store.remove_link(link.meta.id)?;
            }
        }
    }

    if matching.is_empty() {
        let instance = ctx.store.save_downstream(DownstreamServiceInstance {
            name: format!("{dependency}-{attachment_name}"),
            owner_dependency: dependency.to_owned(),
            ..Default::default()
        });
        ctx.store.save_link(Link {
            provider_id: instance.meta.id,
            subscriber_id: attachment_id,
            ..Default::default()
        });
        info!(
            attachment = %attachment_name,
            dependency,
            instance = instance.meta.id,
            "downstream instance created"
        );
        return Ok(());
    }

    // Keep the most recently created provider, drop the rest.
    matching.sort_by_key(|l| l.provider_id);
    let keep = matching
        .pop()
        .ok_or_else(|| EngineError::inconsistent("link set emptied during policy run"))?;
    debug!(
        attachment = %attachment_name,
        dependency,
        instance = keep.provider_id,
        "downstream instance already present"
    );
    for orphan in matching {
        warn!(
            attachment = %attachment_name,
            dependency,
            instance = orphan.provider_id,
            "removing duplicate downstream instance"
        );
        ctx.store.remove_link(orphan.meta.id)?;
        ctx.store.remove_downstream(orphan.provider_id)?;
    }
    Ok(())
}
