//! Entity records managed by the reconciliation engine.
//!
//! One struct per entity; narrow DTOs live at the client boundary, not here.
//! Every record embeds [`RecordMeta`] for change tracking.

mod alarm;
mod attachment;
mod device;
mod meta;
mod profile;

pub use alarm::{Alarm, AlarmState};
pub use attachment::{DownstreamServiceInstance, Link, SubscriberAttachment};
pub use device::{
    AccessDevice, AdminState, EndpointDevice, LinkStatus, NniPort, PonPort, Technology, UniPort,
};
pub use meta::{RecordMeta, BACKEND_ERROR, BACKEND_IN_PROGRESS, BACKEND_OK};
pub use profile::TechnologyProfile;
