//! Error taxonomy for ledger state operations.

use crate::core::app::{AppId, AssetId};
use crate::core::transaction::TxnError;
use crate::error;
use crate::types::address::Address;
use ledger_derive::Error;

/// Errors raised by the state subsystem.
///
/// Everything except [`LedgerError::Invariant`] is an ordinary precondition
/// failure or rejection that propagates to the transaction dispatcher, which
/// discards the transaction's pending state. `Invariant` is different: it can
/// only arise from a programming bug, and callers must abort block
/// evaluation when they see it (see [`invariant_violation`]).
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Local state read/written for an account not opted in to the app.
    #[error("account {0} is not opted in to app {1}")]
    NotOptedIn(Address, AppId),
    /// Global state read/written on a non-existent app.
    #[error("app {0} does not exist")]
    AppMissing(AppId),
    /// Attempt to create an app whose id already exists.
    #[error("app {0} already exists")]
    AppExists(AppId),
    /// Opt-in attempted while already opted in.
    #[error("account {0} is already opted in to app {1}")]
    AlreadyOptedIn(Address, AppId),
    /// Opt-out attempted while not opted in.
    #[error("account {0} is not currently opted in to app {1}")]
    NotCurrentlyOptedIn(Address, AppId),
    /// Contract execution touched an account outside its whitelist.
    #[error("account {0} is not in the transaction's account whitelist")]
    NotInAccountWhitelist(Address),
    /// Contract execution touched an app outside its whitelist.
    #[error("app {0} is not in the transaction's app whitelist")]
    NotInAppWhitelist(AppId),
    /// The referenced account holds no balance of the asset.
    #[error("account {0} has not opted in to asset {1}")]
    AssetNotHeld(Address, AssetId),
    /// The referenced account did not create the asset.
    #[error("account {0} has not created asset {1}")]
    AssetNotCreated(Address, AssetId),
    /// Unknown on-completion action.
    #[error("invalid application action")]
    InvalidAction,
    /// The approval program ran to completion and rejected the transaction.
    #[error("transaction rejected by approval program")]
    TransactionRejected,
    /// The application-call payload violates protocol bounds.
    #[error("malformed application call: {0}")]
    MalformedAppCall(String),
    /// I/O failure in the persistent baseline, propagated unchanged.
    #[error("baseline lookup failed: {0}")]
    Baseline(String),
    /// Corrupted copy-on-write bookkeeping. Fatal to block evaluation.
    #[error("state invariant violated: {0}")]
    Invariant(String),
}

impl From<TxnError> for LedgerError {
    fn from(value: TxnError) -> Self {
        LedgerError::MalformedAppCall(value.to_string())
    }
}

/// Builds the error for a condition that can only arise from a programming
/// bug.
///
/// This is the single constructor for [`LedgerError::Invariant`]. The layers
/// below never construct it directly, and no caller may recover from it:
/// it signals that the copy-on-write bookkeeping later merges depend on has
/// been corrupted, so block evaluation must be abandoned.
pub(crate) fn invariant_violation(message: impl Into<String>) -> LedgerError {
    let message = message.into();
    error!("state invariant violated, block evaluation must abort: {message}");
    LedgerError::Invariant(message)
}
