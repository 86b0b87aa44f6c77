//! Contract key/value state model.
//!
//! Contract state maps string keys to [`TealValue`]s. Pending modifications
//! are expressed as [`ValueDelta`]s, which add a `Delete` action on top of
//! the two value kinds so an overlay can record removals.

use crate::types::bytes::Bytes;
use ledger_derive::BinaryCodec;

/// A single contract state value: an unsigned integer or a byte string.
///
/// Equality is structural.
#[derive(Clone, Debug, PartialEq, Eq, BinaryCodec)]
pub enum TealValue {
    /// Unsigned 64-bit integer value.
    Uint(u64),
    /// Arbitrary byte string value.
    Bytes(Bytes),
}

impl TealValue {
    /// Creates a byte-string value from anything convertible to bytes.
    pub fn from_bytes(data: impl Into<Bytes>) -> TealValue {
        TealValue::Bytes(data.into())
    }

    /// Converts this value into the delta that writes it.
    pub fn to_value_delta(&self) -> ValueDelta {
        match self {
            TealValue::Uint(v) => ValueDelta::SetUint(*v),
            TealValue::Bytes(b) => ValueDelta::SetBytes(b.clone()),
        }
    }
}

/// A pending modification to a single contract state key.
#[derive(Clone, Debug, PartialEq, Eq, BinaryCodec)]
pub enum ValueDelta {
    /// Set the key to an integer value.
    SetUint(u64),
    /// Set the key to a byte-string value.
    SetBytes(Bytes),
    /// Remove the key.
    Delete,
}

impl ValueDelta {
    /// Projects the delta to the value it writes.
    ///
    /// Returns `None` for [`ValueDelta::Delete`], signaling that the key is
    /// absent after applying the delta.
    pub fn to_teal_value(&self) -> Option<TealValue> {
        match self {
            ValueDelta::SetUint(v) => Some(TealValue::Uint(*v)),
            ValueDelta::SetBytes(b) => Some(TealValue::Bytes(b.clone())),
            ValueDelta::Delete => None,
        }
    }
}
