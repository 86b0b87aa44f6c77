//! Application and creatable identifiers and parameters.
//!
//! Applications and assets are both "creatables": on-chain objects identified
//! by a globally unique, monotonically increasing 64-bit id drawn from the
//! same sequence. Ids are never reused, which the state merge relies on.

use crate::types::bytes::Bytes;
use ledger_derive::BinaryCodec;
use std::fmt;

/// Identifier of an application.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, BinaryCodec)]
pub struct AppId(pub u64);

/// Identifier of an asset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, BinaryCodec)]
pub struct AssetId(pub u64);

/// Identifier shared by all creatable kinds.
///
/// An [`AppId`] and an [`AssetId`] with the same numeric value refer to the
/// same slot in the creatable sequence; the [`CreatableType`] disambiguates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, BinaryCodec)]
pub struct CreatableId(pub u64);

impl fmt::Display for AppId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for CreatableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<AppId> for CreatableId {
    fn from(app: AppId) -> Self {
        CreatableId(app.0)
    }
}

impl From<AssetId> for CreatableId {
    fn from(asset: AssetId) -> Self {
        CreatableId(asset.0)
    }
}

/// The kind of an on-chain creatable object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, BinaryCodec)]
pub enum CreatableType {
    /// An asset.
    Asset,
    /// An application.
    App,
}

/// Locates one creatable: its id plus its kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, BinaryCodec)]
pub struct CreatableLocator {
    pub id: CreatableId,
    pub ctype: CreatableType,
}

impl CreatableLocator {
    /// Locator for an application.
    pub fn app(id: AppId) -> CreatableLocator {
        CreatableLocator {
            id: id.into(),
            ctype: CreatableType::App,
        }
    }

    /// Locator for an asset.
    pub fn asset(id: AssetId) -> CreatableLocator {
        CreatableLocator {
            id: id.into(),
            ctype: CreatableType::Asset,
        }
    }
}

/// Sizing of an application's key/value store.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, BinaryCodec)]
pub struct StateSchema {
    /// Maximum number of integer-valued keys.
    pub num_uints: u64,
    /// Maximum number of byte-string-valued keys.
    pub num_byte_slices: u64,
}

/// Parameters of a deployed application.
///
/// Program blobs are shared [`Bytes`] buffers: several state layers may hold
/// the same params at once, and a layer that replaces a program gets its own
/// copy of the incoming bytes.
#[derive(Clone, Debug, Default, PartialEq, Eq, BinaryCodec)]
pub struct AppParams {
    /// Program deciding whether an application call is approved.
    pub approval_program: Bytes,
    /// Program run when an account clears its local state.
    pub clear_state_program: Bytes,
    /// Schema of the per-account local store.
    pub local_schema: StateSchema,
    /// Schema of the application's global store.
    pub global_schema: StateSchema,
}
