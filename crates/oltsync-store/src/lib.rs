//! oltsync record store.
//!
//! Persistence is an external collaborator with change tracking; this
//! crate provides the in-memory implementation the engine and its tests
//! run against. Records carry `updated`/`enacted` version markers; the
//! store is the only component that advances them.

pub mod alarm;
pub mod store;

pub use alarm::{AlarmSink, LogAlarmSink, MemoryAlarmSink};
pub use store::RecordStore;
