//! # oltsync reconciliation engine
//!
//! Four paths share one discipline: idempotent convergence under partial
//! failure and out-of-order information.
//!
//! - [`pull`] - import the backend's device/port inventory into local records
//! - [`sync`] - drive local desired state onto the backend and controller
//! - [`policy`] - expand a subscriber attachment into its downstream chain
//! - [`event`] - convert asynchronous notifications into state invalidation
//!
//! The [`worker`] scans for dirty records and applies outcomes:
//! `Complete` marks the record enacted, `Deferred` leaves it dirty for the
//! next pass, a fatal error is written onto the record's status field.
//! All collaborators are injected through [`context::EngineContext`].

pub mod context;
pub mod event;
pub mod policy;
pub mod pull;
pub mod sync;
pub mod worker;

pub use context::{EngineContext, PollConfig, RetryConfig, ValidationHook, ValidationRegistry};
pub use worker::{PassSummary, SyncWorker};
