//! Model policy: endpoint association, inherited tags, downstream chain.

mod support;

use oltsync_core::model::{DownstreamServiceInstance, Link};
use oltsync_core::EngineError;
use oltsync_engine::policy::attachment_policy;

use support::{
    harness, seed_attachment, seed_device, seed_endpoint, seed_pon_port, seed_service,
    DOWNSTREAM_DEP,
};

#[tokio::test]
async fn test_policy_associates_endpoint_and_builds_chain() {
    let h = harness();
    let service = seed_service(&h.store, "http://127.0.0.1:1", "http://127.0.0.1:1");
    let device = seed_device(&h.store, service.meta.id);
    let pon = seed_pon_port(&h.store, device.meta.id, 0);
    let endpoint = seed_endpoint(&h.store, pon.meta.id, "BRCM1234");
    let attachment = seed_attachment(&h.store, service.meta.id, "BRCM1234");

    attachment_policy(&h.ctx, attachment.meta.id).unwrap();

    let attachment = h.store.get_attachment(attachment.meta.id).unwrap();
    assert_eq!(attachment.endpoint_id, Some(endpoint.meta.id));
    assert_eq!(attachment.s_tag, pon.s_tag);

    let links = h.store.links_for_subscriber(attachment.meta.id);
    assert_eq!(links.len(), 1);
    let instance = h.store.get_downstream(links[0].provider_id).unwrap();
    assert_eq!(instance.owner_dependency, DOWNSTREAM_DEP);
}

#[tokio::test]
async fn test_policy_second_run_writes_nothing() {
    let h = harness();
    let service = seed_service(&h.store, "http://127.0.0.1:1", "http://127.0.0.1:1");
    let device = seed_device(&h.store, service.meta.id);
    let pon = seed_pon_port(&h.store, device.meta.id, 0);
    seed_endpoint(&h.store, pon.meta.id, "BRCM1234");
    let attachment = seed_attachment(&h.store, service.meta.id, "BRCM1234");

    attachment_policy(&h.ctx, attachment.meta.id).unwrap();
    let settled = h.store.mutation_count();
    attachment_policy(&h.ctx, attachment.meta.id).unwrap();
    assert_eq!(h.store.mutation_count(), settled);
}

#[tokio::test]
async fn test_policy_prunes_duplicate_downstream_instances() {
    let h = harness();
    let service = seed_service(&h.store, "http://127.0.0.1:1", "http://127.0.0.1:1");
    let device = seed_device(&h.store, service.meta.id);
    let pon = seed_pon_port(&h.store, device.meta.id, 0);
    seed_endpoint(&h.store, pon.meta.id, "BRCM1234");
    let attachment = seed_attachment(&h.store, service.meta.id, "BRCM1234");

    // Three chains for one dependency; only the newest may survive.
    let mut providers = Vec::new();
    for _ in 0..3 {
        let instance = h.store.save_downstream(DownstreamServiceInstance {
            name: "vcpe-dup".into(),
            owner_dependency: DOWNSTREAM_DEP.into(),
            ..Default::default()
        });
        h.store.save_link(Link {
            provider_id: instance.meta.id,
            subscriber_id: attachment.meta.id,
            ..Default::default()
        });
        providers.push(instance.meta.id);
    }

    attachment_policy(&h.ctx, attachment.meta.id).unwrap();

    let links = h.store.links_for_subscriber(attachment.meta.id);
    assert_eq!(links.len(), 1);
    let newest = *providers.iter().max().unwrap();
    assert_eq!(links[0].provider_id, newest);
    for stale in providers.into_iter().filter(|id| *id != newest) {
        assert!(h.store.get_downstream(stale).is_err());
    }
}

#[tokio::test]
async fn test_policy_flags_attachment_after_last_link_removed() {
    let h = harness();
    let service = seed_service(&h.store, "http://127.0.0.1:1", "http://127.0.0.1:1");
    let device = seed_device(&h.store, service.meta.id);
    let pon = seed_pon_port(&h.store, device.meta.id, 0);
    seed_endpoint(&h.store, pon.meta.id, "BRCM1234");
    let mut attachment = seed_attachment(&h.store, service.meta.id, "BRCM1234");
    attachment.link_deleted_count = 1;
    let attachment = h.store.save_attachment(attachment);

    attachment_policy(&h.ctx, attachment.meta.id).unwrap();

    let attachment = h.store.get_attachment(attachment.meta.id).unwrap();
    assert!(attachment.meta.deleted);
    // The chain was not rebuilt on the way out.
    assert!(h.store.links_for_subscriber(attachment.meta.id).is_empty());
}

#[tokio::test]
async fn test_policy_requires_endpoint_serial_property() {
    let h = harness();
    let service = seed_service(&h.store, "http://127.0.0.1:1", "http://127.0.0.1:1");
    let mut attachment = seed_attachment(&h.store, service.meta.id, "BRCM1234");
    attachment.westbound.clear();
    let attachment = h.store.save_attachment(attachment);

    let err = attachment_policy(&h.ctx, attachment.meta.id).unwrap_err();
    assert!(matches!(err, EngineError::Validation { .. }));
}

#[tokio::test]
async fn test_policy_unknown_serial_is_hard_error() {
    let h = harness();
    let service = seed_service(&h.store, "http://127.0.0.1:1", "http://127.0.0.1:1");
    let attachment = seed_attachment(&h.store, service.meta.id, "NO-SUCH-ONU");

    let err = attachment_policy(&h.ctx, attachment.meta.id).unwrap_err();
    match err {
        EngineError::NotFound { key, .. } => assert_eq!(key, "NO-SUCH-ONU"),
        other => panic!("expected not found, got {other:?}"),
    }
}
