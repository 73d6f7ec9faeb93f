//! Change-tracking metadata embedded in every record.

use serde::{Deserialize, Serialize};

/// Backend code for a record that converged successfully.
pub const BACKEND_OK: i32 = 1;
/// Backend code for a record whose sync has not completed yet.
pub const BACKEND_IN_PROGRESS: i32 = 0;
/// Backend code for a record whose sync failed fatally.
pub const BACKEND_ERROR: i32 = 2;

/// Identity and synchronization markers shared by all records.
///
/// `updated` is the desired-state version, bumped by the store on every
/// normal save. `enacted` is the last-synchronized version. A record is
/// dirty (needs sync) while `enacted < updated`; a dirty record is also
/// treated as mid-sync by the pull path, which then skips mutating it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordMeta {
    /// Store-assigned surrogate id (0 until first save).
    pub id: u32,
    /// Desired-state version, monotonically increasing per store.
    pub updated: u64,
    /// Version last driven onto the external systems, if any.
    pub enacted: Option<u64>,
    /// Operator-visible status line, also carrying fatal error text.
    pub backend_status: String,
    /// One of [`BACKEND_OK`], [`BACKEND_IN_PROGRESS`], [`BACKEND_ERROR`].
    pub backend_code: i32,
    /// Set when the record awaits backend-side cleanup before removal.
    pub deleted: bool,
}

impl RecordMeta {
    /// Whether desired state has moved past what was last synchronized.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        match self.enacted {
            Some(enacted) => enacted < self.updated,
            None => true,
        }
    }

    /// Whether a previous sync attempt failed fatally.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.backend_code == BACKEND_ERROR
    }
}
