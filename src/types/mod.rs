//! Core type definitions for ledger primitives.
//!
//! This module provides fundamental types used throughout the ledger:
//! - `Address`: fixed-size 32-byte account identifiers
//! - `Hash`: 32-byte SHA3-256 hashes (transaction ids)
//! - `Bytes`: reference-counted copy-on-write byte buffers
//! - `Encode`/`Decode`: deterministic binary serialization
//! - `TealValue`/`ValueDelta`: the contract key/value state model

pub mod address;
pub mod bytes;
pub mod encoding;
pub mod hash;
pub mod teal;
