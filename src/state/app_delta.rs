//! Per-application delta records carried by a state layer.
//!
//! Each record pairs a lifecycle tag with a key/value overlay. The tag
//! expresses the net status change this layer introduces relative to its
//! parent's view, not the absolute status: a layer over an opted-in baseline
//! that does nothing has no record at all.

use crate::core::app::AppParams;
use crate::state::kv_overlay::KvOverlay;
use crate::types::address::Address;

/// Net lifecycle change of an application's global state in one layer.
///
/// Invariants the variants make structural: a created app always carries its
/// creator and parameters, and a deleted app carries neither.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum GlobalChange {
    /// The app existed below this layer and still does.
    ///
    /// `params` is `Some` when this layer replaced the app's programs; reads
    /// then see the updated parameters while the creator still resolves
    /// through the parent.
    Unchanged { params: Option<AppParams> },
    /// The app was created in this layer.
    Created {
        creator: Address,
        params: AppParams,
    },
    /// The app was deleted in this layer.
    Deleted,
}

/// Delta of one application's global state within a layer.
///
/// Invariant: when `change` is [`GlobalChange::Deleted`], `kv` is empty and
/// stays empty (deleting clears it and further writes are rejected).
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct GlobalAppDelta {
    pub change: GlobalChange,
    pub kv: KvOverlay,
}

impl Default for GlobalAppDelta {
    fn default() -> Self {
        Self {
            change: GlobalChange::Unchanged { params: None },
            kv: KvOverlay::default(),
        }
    }
}

/// Net opt-in status change of one (account, app) pair in one layer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) enum LocalChange {
    /// No status change; the overlay may still carry value deltas.
    #[default]
    Unchanged,
    /// The account opted in within this layer.
    OptedIn,
    /// The account opted out within this layer.
    OptedOut,
}

/// Delta of one account's local state for one application within a layer.
///
/// Invariant: when `change` is [`LocalChange::OptedOut`], `kv` is empty and
/// stays empty until a subsequent opt-in resets the record.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct LocalAppDelta {
    pub change: LocalChange,
    pub kv: KvOverlay,
}
