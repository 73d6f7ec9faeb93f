//! oltsync Core Library
//!
//! Shared types for the oltsync reconciliation engine.
//!
//! # Modules
//!
//! - [`error`] - Error taxonomy (`EngineError`) and the `Progress` outcome tag
//! - [`model`] - Entity records (access devices, endpoints, ports, attachments, profiles)
//! - [`graph`] - Service dependency graph with typed capabilities
//! - [`helpers`] - URL and datapath-id formatting helpers

pub mod error;
pub mod graph;
pub mod helpers;
pub mod model;

pub use error::{EngineError, Progress, Result};
pub use graph::{AccessService, Capability, ServiceDependency};
