//! Outbound sync: drive local desired-state records toward activation on
//! the device backend, the SDN controller, and the profile KV store.

mod access_device;
mod attachment;
mod endpoint_device;
mod tech_profile;

pub use access_device::{delete_access_device, sync_access_device};
pub use attachment::{delete_attachment, sync_attachment};
pub use endpoint_device::sync_endpoint_device;
pub use tech_profile::{delete_tech_profile, sync_tech_profile};
