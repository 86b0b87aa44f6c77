//! The copy-on-write state layer.
//!
//! A [`StateOverlay`] accumulates an in-memory [`StateDelta`] over a
//! read-through parent. The root layer's parent is the persistent baseline;
//! a child layer's parent is the layer that spawned it. Reads resolve
//! against the layer's own delta first and fall through to the parent on a
//! miss; writes consult the parent so that a write equal to the parent's
//! effective value leaves no delta behind.
//!
//! Children are speculative: a child is committed by extracting its delta
//! with [`StateOverlay::into_delta`] and replaying it into the parent with
//! [`StateOverlay::absorb`](crate::state::merge), or discarded by simply
//! dropping it.

use crate::core::account::AccountData;
use crate::core::app::{AppId, AppParams, CreatableId, CreatableLocator, CreatableType};
use crate::core::consensus::{ConsensusParams, consensus_params};
use crate::core::header::{BlockHeader, Round};
use crate::core::transaction::{Transaction, TxLease, Txid};
use crate::state::app_delta::{GlobalChange, LocalChange};
use crate::state::delta::{AccountDelta, ModifiedCreatable, StateDelta};
use crate::state::errors::{LedgerError, invariant_violation};
use crate::state::reader::StateReader;
use crate::types::address::Address;
use crate::types::bytes::Bytes;
use crate::types::teal::TealValue;
use std::collections::hash_map::Entry;
use std::sync::Arc;

/// One level of the copy-on-write state stack.
///
/// Exclusively owns its [`StateDelta`]; holds its parent only as a read
/// capability. The parent must outlive the layer, which the borrow enforces,
/// and a parent with a live child cannot be mutated, so at most one child is
/// ever active per parent.
pub struct StateOverlay<'a> {
    /// Read-through view below this layer's own modifications.
    parent: &'a dyn StateReader,
    /// Consensus parameters of the protocol the block was produced under.
    proto: ConsensusParams,
    /// This layer's accumulated modifications.
    mods: StateDelta,
}

impl<'a> StateOverlay<'a> {
    /// Creates the root layer of a block evaluation over a baseline.
    pub fn new(base: &'a dyn StateReader, header: BlockHeader) -> StateOverlay<'a> {
        let proto = consensus_params(header.protocol);
        StateOverlay {
            parent: base,
            proto,
            mods: StateDelta::new(Arc::new(header)),
        }
    }

    /// Spawns a speculative child layer over this one.
    pub fn child(&self) -> StateOverlay<'_> {
        StateOverlay {
            parent: self,
            proto: self.proto,
            mods: StateDelta::new(Arc::clone(&self.mods.header)),
        }
    }

    /// Returns the round of the block under evaluation.
    pub fn round(&self) -> Round {
        self.mods.header.round
    }

    /// Returns the timestamp of the block under evaluation.
    pub fn latest_timestamp(&self) -> i64 {
        self.mods.header.timestamp
    }

    /// Returns the rewards level of the block under evaluation.
    pub fn rewards_level(&self) -> u64 {
        self.mods.header.rewards_level
    }

    /// Returns the header shared by every layer of this evaluation.
    pub fn header(&self) -> &BlockHeader {
        &self.mods.header
    }

    /// Returns the consensus parameters this layer evaluates under.
    pub fn proto(&self) -> &ConsensusParams {
        &self.proto
    }

    /// Returns this layer's accumulated delta.
    pub fn delta(&self) -> &StateDelta {
        &self.mods
    }

    /// Mutable access to the accumulated delta, for the merge machinery.
    pub(crate) fn delta_mut(&mut self) -> &mut StateDelta {
        &mut self.mods
    }

    /// Consumes the layer, yielding its delta for commit or inspection.
    pub fn into_delta(self) -> StateDelta {
        self.mods
    }

    /// Records an account write.
    ///
    /// The first write to an address retains `old` so the layer's delta can
    /// later be replayed against a compatible baseline; subsequent writes
    /// only advance `new`.
    pub fn put_account(&mut self, addr: Address, old: AccountData, new: AccountData) {
        match self.mods.accts.entry(addr) {
            Entry::Occupied(mut entry) => entry.get_mut().new = new,
            Entry::Vacant(entry) => {
                entry.insert(AccountDelta { old, new });
            }
        }
    }

    /// Records creations and deletions in the creatable index.
    ///
    /// A deletion of an id that was created in this same layer cancels out:
    /// the entry is removed entirely so the committed delta stays minimal.
    pub fn put_creatables(
        &mut self,
        addr: Address,
        new: &[CreatableLocator],
        deleted: &[CreatableLocator],
    ) {
        for locator in new {
            self.mods.creatables.insert(
                locator.id,
                ModifiedCreatable {
                    ctype: locator.ctype,
                    creator: addr,
                    created: true,
                },
            );
        }

        for locator in deleted {
            let created_here = matches!(
                self.mods.creatables.get(&locator.id),
                Some(existing) if existing.created
            );
            if created_here {
                self.mods.creatables.remove(&locator.id);
            } else {
                self.mods.creatables.insert(
                    locator.id,
                    ModifiedCreatable {
                        ctype: locator.ctype,
                        creator: addr,
                        created: false,
                    },
                );
            }
        }
    }

    /// Records a transaction id for replay protection, and its lease when
    /// the protocol supports leases and the transaction carries one.
    pub fn add_tx(&mut self, txn: &Transaction, txid: Txid) {
        self.mods.txids.insert(txid, txn.last_valid);

        let lease = txn.lease_key();
        if self.proto.supports_tx_leases && !lease.is_zero() {
            self.mods.tx_leases.insert(lease, txn.last_valid);
        }
    }

    /// Creates an application in this layer.
    ///
    /// Fails with [`LedgerError::AppExists`] if an app with this id is
    /// visible from this layer.
    pub fn create_app(
        &mut self,
        app: AppId,
        creator: Address,
        params: AppParams,
    ) -> Result<(), LedgerError> {
        if self.get_app_params(app)?.is_some() {
            return Err(LedgerError::AppExists(app));
        }

        let entry = self.mods.global_apps.entry(app).or_default();
        if !entry.kv.is_empty() {
            // Writes require the app to exist, so a fresh create can never
            // find pending state for it.
            return Err(invariant_violation(format!(
                "app {app} created over pending state writes"
            )));
        }
        entry.change = GlobalChange::Created { creator, params };
        Ok(())
    }

    /// Replaces an application's programs.
    ///
    /// The layer stores its own copy of the incoming byte slices; the caller
    /// is free to reuse or mutate its buffers afterwards.
    pub fn update_app(
        &mut self,
        app: AppId,
        approval_program: &[u8],
        clear_state_program: &[u8],
    ) -> Result<(), LedgerError> {
        let Some((mut params, _)) = self.get_app_params(app)? else {
            return Err(LedgerError::AppMissing(app));
        };
        params.approval_program = Bytes::new(approval_program);
        params.clear_state_program = Bytes::new(clear_state_program);

        let entry = self.mods.global_apps.entry(app).or_default();
        match &mut entry.change {
            GlobalChange::Created { params: stored, .. } => *stored = params,
            GlobalChange::Unchanged { params: stored } => *stored = Some(params),
            GlobalChange::Deleted => {
                // get_app_params above reported the app as existing.
                return Err(invariant_violation(format!("update of deleted app {app}")));
            }
        }
        Ok(())
    }

    /// Deletes an application in this layer.
    pub fn delete_app(&mut self, app: AppId) -> Result<(), LedgerError> {
        if self.get_app_params(app)?.is_none() {
            return Err(LedgerError::AppMissing(app));
        }

        let entry = self.mods.global_apps.entry(app).or_default();
        entry.change = GlobalChange::Deleted;
        entry.kv.clear();
        Ok(())
    }

    /// Opts an account in to an application, starting from a clean store.
    pub fn opt_in(&mut self, addr: Address, app: AppId) -> Result<(), LedgerError> {
        if self.opted_in(addr, app)? {
            return Err(LedgerError::AlreadyOptedIn(addr, app));
        }

        let entry = self.mods.local_apps.entry((addr, app)).or_default();
        entry.kv.clear();
        entry.change = LocalChange::OptedIn;
        Ok(())
    }

    /// Opts an account out of an application, clearing its local store.
    ///
    /// When the parent's view says the account was not opted in below this
    /// layer, the whole record is removed instead of tagged: the layer's
    /// net transition is zero, and the committed delta must say so.
    pub fn opt_out(&mut self, addr: Address, app: AppId) -> Result<(), LedgerError> {
        if !self.opted_in(addr, app)? {
            return Err(LedgerError::NotCurrentlyOptedIn(addr, app));
        }

        if self.parent.opted_in(addr, app)? {
            let entry = self.mods.local_apps.entry((addr, app)).or_default();
            entry.kv.clear();
            entry.change = LocalChange::OptedOut;
        } else {
            self.mods.local_apps.remove(&(addr, app));
        }
        Ok(())
    }

    /// Writes one key of an account's local store for an application.
    pub fn set_local(
        &mut self,
        addr: Address,
        app: AppId,
        key: &str,
        value: TealValue,
    ) -> Result<(), LedgerError> {
        if !self.opted_in(addr, app)? {
            return Err(LedgerError::NotOptedIn(addr, app));
        }

        // If this layer performed the opt-in, the parent cannot hold local
        // state for the account; skip the backing lookup and always record.
        let opted_in_here = matches!(
            self.mods.local_apps.get(&(addr, app)),
            Some(delta) if delta.change == LocalChange::OptedIn
        );
        let base = if opted_in_here {
            None
        } else {
            self.parent.get_local(addr, app, key)?
        };

        let entry = self.mods.local_apps.entry((addr, app)).or_default();
        entry.kv.write(key, value, base.as_ref());
        Ok(())
    }

    /// Deletes one key of an account's local store for an application.
    pub fn del_local(&mut self, addr: Address, app: AppId, key: &str) -> Result<(), LedgerError> {
        if !self.opted_in(addr, app)? {
            return Err(LedgerError::NotOptedIn(addr, app));
        }

        let opted_in_here = matches!(
            self.mods.local_apps.get(&(addr, app)),
            Some(delta) if delta.change == LocalChange::OptedIn
        );
        let base_present = if opted_in_here {
            false
        } else {
            self.parent.get_local(addr, app, key)?.is_some()
        };

        let entry = self.mods.local_apps.entry((addr, app)).or_default();
        entry.kv.del(key, base_present);
        Ok(())
    }

    /// Writes one key of an application's global store.
    pub fn set_global(
        &mut self,
        app: AppId,
        key: &str,
        value: TealValue,
    ) -> Result<(), LedgerError> {
        if self.get_app_params(app)?.is_none() {
            return Err(LedgerError::AppMissing(app));
        }

        // If this layer created the app, it cannot exist in the parent;
        // skip the backing lookup and always record.
        let created_here = matches!(
            self.mods.global_apps.get(&app),
            Some(delta) if matches!(delta.change, GlobalChange::Created { .. })
        );
        let base = if created_here {
            None
        } else {
            self.parent.get_global(app, key)?
        };

        let entry = self.mods.global_apps.entry(app).or_default();
        entry.kv.write(key, value, base.as_ref());
        Ok(())
    }

    /// Deletes one key of an application's global store.
    pub fn del_global(&mut self, app: AppId, key: &str) -> Result<(), LedgerError> {
        if self.get_app_params(app)?.is_none() {
            return Err(LedgerError::AppMissing(app));
        }

        let created_here = matches!(
            self.mods.global_apps.get(&app),
            Some(delta) if matches!(delta.change, GlobalChange::Created { .. })
        );
        let base_present = if created_here {
            false
        } else {
            self.parent.get_global(app, key)?.is_some()
        };

        let entry = self.mods.global_apps.entry(app).or_default();
        entry.kv.del(key, base_present);
        Ok(())
    }
}

impl StateReader for StateOverlay<'_> {
    fn lookup_account(&self, addr: Address) -> Result<AccountData, LedgerError> {
        if let Some(delta) = self.mods.accts.get(&addr) {
            return Ok(delta.new.clone());
        }
        self.parent.lookup_account(addr)
    }

    fn is_dup(
        &self,
        first_valid: Round,
        last_valid: Round,
        txid: Txid,
        lease: &TxLease,
    ) -> Result<bool, LedgerError> {
        if self.mods.txids.contains_key(&txid) {
            return Ok(true);
        }

        if self.proto.supports_tx_leases && !lease.is_zero() {
            if let Some(&expires) = self.mods.tx_leases.get(lease)
                && self.mods.header.round <= expires
            {
                return Ok(true);
            }
        }

        self.parent.is_dup(first_valid, last_valid, txid, lease)
    }

    fn txn_counter(&self) -> u64 {
        self.parent.txn_counter() + self.mods.txids.len() as u64
    }

    fn get_creator(
        &self,
        cidx: CreatableId,
        ctype: CreatableType,
    ) -> Result<Option<Address>, LedgerError> {
        if let Some(delta) = self.mods.creatables.get(&cidx) {
            if delta.created && delta.ctype == ctype {
                return Ok(Some(delta.creator));
            }
            return Ok(None);
        }
        self.parent.get_creator(cidx, ctype)
    }

    fn get_app_params(&self, app: AppId) -> Result<Option<(AppParams, Address)>, LedgerError> {
        if let Some(delta) = self.mods.global_apps.get(&app) {
            match &delta.change {
                GlobalChange::Deleted => return Ok(None),
                GlobalChange::Created { creator, params } => {
                    return Ok(Some((params.clone(), *creator)));
                }
                GlobalChange::Unchanged {
                    params: Some(updated),
                } => {
                    // Programs were replaced in this layer; the app itself,
                    // and thus its creator, still resolves below.
                    let Some((_, creator)) = self.parent.get_app_params(app)? else {
                        return Err(invariant_violation(format!(
                            "pending program update for missing app {app}"
                        )));
                    };
                    return Ok(Some((updated.clone(), creator)));
                }
                GlobalChange::Unchanged { params: None } => {}
            }
        }
        self.parent.get_app_params(app)
    }

    fn opted_in(&self, addr: Address, app: AppId) -> Result<bool, LedgerError> {
        if let Some(delta) = self.mods.local_apps.get(&(addr, app)) {
            match delta.change {
                LocalChange::OptedIn => return Ok(true),
                LocalChange::OptedOut => return Ok(false),
                LocalChange::Unchanged => {}
            }
        }
        self.parent.opted_in(addr, app)
    }

    fn get_local(
        &self,
        addr: Address,
        app: AppId,
        key: &str,
    ) -> Result<Option<TealValue>, LedgerError> {
        if !self.opted_in(addr, app)? {
            return Err(LedgerError::NotOptedIn(addr, app));
        }

        if let Some(delta) = self.mods.local_apps.get(&(addr, app)) {
            if let Some(value) = delta.kv.read(key) {
                return Ok(value);
            }
            // A layer that performed the opt-in must not see whatever the
            // parent held before: the store started clean here.
            if delta.change == LocalChange::OptedIn {
                return Ok(None);
            }
        }

        self.parent.get_local(addr, app, key)
    }

    fn get_global(&self, app: AppId, key: &str) -> Result<Option<TealValue>, LedgerError> {
        if self.get_app_params(app)?.is_none() {
            return Err(LedgerError::AppMissing(app));
        }

        if let Some(delta) = self.mods.global_apps.get(&app) {
            if let Some(value) = delta.kv.read(key) {
                return Ok(value);
            }
            // A layer that created the app must not see the parent's store:
            // the app did not exist before.
            if matches!(delta.change, GlobalChange::Created { .. }) {
                return Ok(None);
            }
        }

        self.parent.get_global(app, key)
    }
}
