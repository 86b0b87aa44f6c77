//! Consensus parameters keyed by protocol version.
//!
//! Each block header names the protocol it was produced under; the state
//! subsystem looks up the matching [`ConsensusParams`] once per root layer
//! and children inherit them.

/// Protocol version identifier carried in block headers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProtocolVersion {
    /// Initial protocol: no transaction leases.
    V1,
    /// Adds transaction leases for replay protection.
    V2,
}

/// Chain parameters fixed by the protocol version.
#[derive(Clone, Copy, Debug)]
pub struct ConsensusParams {
    /// Whether transactions may carry a lease for mutual exclusion.
    pub supports_tx_leases: bool,
    /// Maximum number of arguments in an application call.
    pub max_app_args: usize,
    /// Maximum number of extra accounts an application call may reference.
    pub max_tx_accounts: usize,
    /// Maximum number of foreign applications a call may reference.
    pub max_foreign_apps: usize,
    /// Maximum size of an application program in bytes.
    pub max_app_program_len: usize,
}

/// Returns the consensus parameters for a protocol version.
pub fn consensus_params(version: ProtocolVersion) -> ConsensusParams {
    match version {
        ProtocolVersion::V1 => ConsensusParams {
            supports_tx_leases: false,
            max_app_args: 16,
            max_tx_accounts: 4,
            max_foreign_apps: 2,
            max_app_program_len: 1024,
        },
        ProtocolVersion::V2 => ConsensusParams {
            supports_tx_leases: true,
            max_app_args: 16,
            max_tx_accounts: 4,
            max_foreign_apps: 2,
            max_app_program_len: 1024,
        },
    }
}
