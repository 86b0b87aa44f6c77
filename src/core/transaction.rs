//! Transactions as seen by the state subsystem.
//!
//! Only the fields the ledger state consumes are modeled: the sender and
//! validity window feed replay protection, the lease feeds mutual exclusion,
//! and the application-call payload drives the contract state machinery.
//! Signatures, fees, and the other payment fields live above this layer.

use crate::core::app::{AppId, StateSchema};
use crate::core::consensus::ConsensusParams;
use crate::core::header::Round;
use crate::types::address::Address;
use crate::types::bytes::Bytes;
use crate::types::encoding::Encode;
use crate::types::hash::Hash;
use ledger_derive::{BinaryCodec, Error};

/// Unique transaction identifier.
pub type Txid = Hash;

/// Lease size in bytes. An all-zero lease means "no lease".
pub const LEASE_SIZE: usize = 32;

/// A (sender, lease) pair granting exclusive use of the lease value until it
/// expires.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TxLease {
    pub sender: Address,
    pub lease: [u8; LEASE_SIZE],
}

impl TxLease {
    /// Returns true if the lease value is all zeroes, i.e. no lease at all.
    pub fn is_zero(&self) -> bool {
        self.lease == [0u8; LEASE_SIZE]
    }
}

/// Side effect an application call has on completion.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, BinaryCodec)]
pub enum OnCompletion {
    /// Only run the approval program.
    #[default]
    NoOp,
    /// Allocate local state for the application in the sender's account.
    OptIn,
    /// Deallocate the sender's local state for the application.
    CloseOut,
    /// Like close-out, but may never fail: lets an account reclaim its
    /// minimum balance from an application it no longer wants.
    ClearState,
    /// Replace the application's approval and clear state programs.
    UpdateApplication,
    /// Delete the application's parameters from its creator's record.
    DeleteApplication,
}

impl OnCompletion {
    /// Decodes a wire value, returning `None` for unknown actions.
    pub fn from_u64(value: u64) -> Option<OnCompletion> {
        match value {
            0 => Some(OnCompletion::NoOp),
            1 => Some(OnCompletion::OptIn),
            2 => Some(OnCompletion::CloseOut),
            3 => Some(OnCompletion::ClearState),
            4 => Some(OnCompletion::UpdateApplication),
            5 => Some(OnCompletion::DeleteApplication),
            _ => None,
        }
    }
}

/// Malformed-transaction errors raised before any state is touched.
#[derive(Debug, Error)]
pub enum TxnError {
    /// More application arguments than the protocol permits.
    #[error("too many application arguments: {count} > {max}")]
    TooManyAppArgs { count: usize, max: usize },
    /// More referenced accounts than the protocol permits.
    #[error("too many referenced accounts: {count} > {max}")]
    TooManyAccounts { count: usize, max: usize },
    /// More foreign applications than the protocol permits.
    #[error("too many foreign applications: {count} > {max}")]
    TooManyForeignApps { count: usize, max: usize },
    /// A program blob exceeds the protocol's size limit.
    #[error("{which} program too long: {len} > {max} bytes")]
    ProgramTooLong {
        which: &'static str,
        len: usize,
        max: usize,
    },
}

/// Fields of an application-call transaction.
#[derive(Clone, Debug, Default, BinaryCodec)]
pub struct ApplicationCallFields {
    /// Application being called; zero means this call creates one.
    pub application_id: AppId,
    /// Side effect to apply if the call is approved.
    pub on_completion: OnCompletion,
    /// Arguments passed to the program.
    pub application_args: Vec<Bytes>,
    /// Extra accounts whose state the program may touch.
    pub accounts: Vec<Address>,
    /// Other applications whose global state the program may read.
    pub foreign_apps: Vec<AppId>,
    /// Local store schema, used when creating.
    pub local_schema: StateSchema,
    /// Global store schema, used when creating.
    pub global_schema: StateSchema,
    /// Approval program, used when creating or updating.
    pub approval_program: Bytes,
    /// Clear state program, used when creating or updating.
    pub clear_state_program: Bytes,
}

impl ApplicationCallFields {
    /// Checks the allocation bounds the protocol imposes on call payloads.
    pub fn well_formed(&self, proto: &ConsensusParams) -> Result<(), TxnError> {
        if self.application_args.len() > proto.max_app_args {
            return Err(TxnError::TooManyAppArgs {
                count: self.application_args.len(),
                max: proto.max_app_args,
            });
        }
        if self.accounts.len() > proto.max_tx_accounts {
            return Err(TxnError::TooManyAccounts {
                count: self.accounts.len(),
                max: proto.max_tx_accounts,
            });
        }
        if self.foreign_apps.len() > proto.max_foreign_apps {
            return Err(TxnError::TooManyForeignApps {
                count: self.foreign_apps.len(),
                max: proto.max_foreign_apps,
            });
        }
        if self.approval_program.len() > proto.max_app_program_len {
            return Err(TxnError::ProgramTooLong {
                which: "approval",
                len: self.approval_program.len(),
                max: proto.max_app_program_len,
            });
        }
        if self.clear_state_program.len() > proto.max_app_program_len {
            return Err(TxnError::ProgramTooLong {
                which: "clear state",
                len: self.clear_state_program.len(),
                max: proto.max_app_program_len,
            });
        }
        Ok(())
    }
}

/// A transaction, reduced to the fields state evaluation consumes.
#[derive(Clone, Debug, BinaryCodec)]
pub struct Transaction {
    /// Sender account.
    pub sender: Address,
    /// First round at which the transaction is valid.
    pub first_valid: Round,
    /// Last round at which the transaction is valid.
    pub last_valid: Round,
    /// Optional mutual-exclusion lease; all zeroes means none.
    pub lease: [u8; LEASE_SIZE],
    /// Application-call payload, when this is an application call.
    pub app_call: Option<ApplicationCallFields>,
}

impl Transaction {
    /// Returns the unique transaction identifier.
    ///
    /// Computed as a domain-separated SHA3-256 hash over the deterministic
    /// encoding of the transaction.
    pub fn id(&self) -> Txid {
        let mut h = Hash::sha3();
        h.update(b"TXID");
        self.encode(&mut h);
        h.finalize()
    }

    /// Returns this transaction's (sender, lease) pair.
    pub fn lease_key(&self) -> TxLease {
        TxLease {
            sender: self.sender,
            lease: self.lease,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::consensus::{ProtocolVersion, consensus_params};
    use crate::utils::test_utils::utils::addr;

    fn plain_tx(sender: Address, last_valid: Round) -> Transaction {
        Transaction {
            sender,
            first_valid: 1,
            last_valid,
            lease: [0u8; LEASE_SIZE],
            app_call: None,
        }
    }

    #[test]
    fn id_is_deterministic() {
        let tx = plain_tx(addr(1), 100);
        assert_eq!(tx.id(), tx.id());
    }

    #[test]
    fn id_depends_on_fields() {
        let a = plain_tx(addr(1), 100);
        let b = plain_tx(addr(2), 100);
        let c = plain_tx(addr(1), 101);
        assert_ne!(a.id(), b.id());
        assert_ne!(a.id(), c.id());
    }

    #[test]
    fn lease_key_flags_zero_lease() {
        let tx = plain_tx(addr(1), 10);
        assert!(tx.lease_key().is_zero());

        let mut leased = plain_tx(addr(1), 10);
        leased.lease[0] = 1;
        assert!(!leased.lease_key().is_zero());
    }

    #[test]
    fn on_completion_wire_values() {
        assert_eq!(OnCompletion::from_u64(0), Some(OnCompletion::NoOp));
        assert_eq!(
            OnCompletion::from_u64(5),
            Some(OnCompletion::DeleteApplication)
        );
        assert_eq!(OnCompletion::from_u64(6), None);
    }

    #[test]
    fn well_formed_accepts_defaults() {
        let fields = ApplicationCallFields::default();
        let proto = consensus_params(ProtocolVersion::V2);
        assert!(fields.well_formed(&proto).is_ok());
    }

    #[test]
    fn well_formed_rejects_excess_accounts() {
        let proto = consensus_params(ProtocolVersion::V2);
        let fields = ApplicationCallFields {
            accounts: (0..=proto.max_tx_accounts as u8).map(addr).collect(),
            ..Default::default()
        };
        assert!(matches!(
            fields.well_formed(&proto),
            Err(TxnError::TooManyAccounts { .. })
        ));
    }

    #[test]
    fn well_formed_rejects_oversized_program() {
        let proto = consensus_params(ProtocolVersion::V2);
        let fields = ApplicationCallFields {
            approval_program: Bytes::new(vec![0u8; proto.max_app_program_len + 1]),
            ..Default::default()
        };
        assert!(matches!(
            fields.well_formed(&proto),
            Err(TxnError::ProgramTooLong { .. })
        ));
    }
}
