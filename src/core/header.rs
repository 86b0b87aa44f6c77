//! Block header fields visible to state evaluation.

use crate::core::consensus::ProtocolVersion;

/// Block round number.
pub type Round = u64;

/// Header of the block whose transactions are being evaluated.
///
/// Shared read-only by every state layer spawned during the block's
/// evaluation; it never changes for the lifetime of the root layer.
#[derive(Clone, Debug)]
pub struct BlockHeader {
    /// Round this block occupies.
    pub round: Round,
    /// Block timestamp, seconds since the Unix epoch.
    pub timestamp: i64,
    /// Protocol version the block was produced under.
    pub protocol: ProtocolVersion,
    /// Accumulated rewards level as of this block.
    pub rewards_level: u64,
}
