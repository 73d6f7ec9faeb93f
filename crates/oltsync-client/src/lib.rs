//! HTTP clients for the external systems the engine reconciles against.
//!
//! - [`backend`] - device-management backend (VOLTHA-style `api/v1` REST)
//! - [`controller`] - SDN controller (ONOS-style netcfg + subscriber flows)
//! - [`profile_kv`] - technology-profile KV store (etcd v3 JSON gateway)
//!
//! All clients carry a short fixed timeout and map failures into
//! [`ClientError`], which the engine folds into its error taxonomy.

pub mod backend;
pub mod controller;
pub mod error;
pub mod profile_kv;

pub use backend::{
    BackendDevice, BackendPort, CreatedDevice, DeviceBackendClient, LogicalDevice, NewDevice,
    ProxyAddress,
};
pub use controller::SdnControllerClient;
pub use error::{ClientError, ClientResult};
pub use profile_kv::ProfileKvClient;
