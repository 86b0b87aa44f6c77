//! The read capability shared by the baseline and every state layer.

use crate::core::account::AccountData;
use crate::core::app::{AppId, AppParams, CreatableId, CreatableType};
use crate::core::header::Round;
use crate::core::transaction::{TxLease, Txid};
use crate::state::errors::LedgerError;
use crate::types::address::Address;
use crate::types::teal::TealValue;

/// Read-through lookups over ledger state.
///
/// Implemented both by the persistent baseline below the root layer and by
/// [`StateOverlay`](crate::state::overlay::StateOverlay) itself, so a child
/// layer resolves misses through its parent without knowing whether the
/// parent is another layer or the bottom of the stack.
///
/// Implementations backed by I/O report failures as
/// [`LedgerError::Baseline`]; layers propagate those unchanged.
pub trait StateReader {
    /// Returns the account state for an address.
    fn lookup_account(&self, addr: Address) -> Result<AccountData, LedgerError>;

    /// Returns true if the transaction id, or an active matching lease, has
    /// already been recorded within the validity window.
    fn is_dup(
        &self,
        first_valid: Round,
        last_valid: Round,
        txid: Txid,
        lease: &TxLease,
    ) -> Result<bool, LedgerError>;

    /// Returns the number of transactions recorded so far.
    fn txn_counter(&self) -> u64;

    /// Returns the creator of a creatable, or `None` if no creatable of the
    /// given kind exists under that id.
    fn get_creator(
        &self,
        cidx: CreatableId,
        ctype: CreatableType,
    ) -> Result<Option<Address>, LedgerError>;

    /// Returns an application's parameters and creator, or `None` if the
    /// application does not exist.
    fn get_app_params(&self, app: AppId) -> Result<Option<(AppParams, Address)>, LedgerError>;

    /// Returns true if the account is opted in to the application.
    fn opted_in(&self, addr: Address, app: AppId) -> Result<bool, LedgerError>;

    /// Reads one key of an account's local store for an application.
    fn get_local(
        &self,
        addr: Address,
        app: AppId,
        key: &str,
    ) -> Result<Option<TealValue>, LedgerError>;

    /// Reads one key of an application's global store.
    fn get_global(&self, app: AppId, key: &str) -> Result<Option<TealValue>, LedgerError>;
}
