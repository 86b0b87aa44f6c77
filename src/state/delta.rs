//! The aggregate delta one state layer accumulates.

use crate::core::account::AccountData;
use crate::core::app::{AppId, CreatableId, CreatableType};
use crate::core::header::{BlockHeader, Round};
use crate::core::transaction::{TxLease, Txid};
use crate::state::app_delta::{GlobalAppDelta, LocalAppDelta};
use crate::types::address::Address;
use crate::types::teal::ValueDelta;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Modification of one account within a layer.
///
/// `old` retains the account state as it was when the layer first touched the
/// address, so the layer's writes can be replayed against any compatible
/// baseline; `new` is the latest write.
#[derive(Clone, Debug)]
pub struct AccountDelta {
    pub old: AccountData,
    pub new: AccountData,
}

/// Modification of one entry in the creatable (id → creator) index.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ModifiedCreatable {
    /// Kind of the creatable.
    pub ctype: CreatableType,
    /// Account that created (or owned) the creatable.
    pub creator: Address,
    /// True if the creatable was created, false if deleted.
    pub created: bool,
}

/// Every modification a single state layer has accumulated.
///
/// A passive container: all invariants are maintained by the operations on
/// the owning layer. Consumed either by merging into the parent layer or by
/// the block evaluator committing the root to the persistent baseline.
pub struct StateDelta {
    /// Modified accounts.
    pub(crate) accts: HashMap<Address, AccountDelta>,
    /// Modified per-account application state.
    pub(crate) local_apps: HashMap<(Address, AppId), LocalAppDelta>,
    /// Modified global application state, including programs.
    pub(crate) global_apps: HashMap<AppId, GlobalAppDelta>,
    /// Transaction ids added this layer, mapped to their last valid round.
    pub(crate) txids: HashMap<Txid, Round>,
    /// Transaction leases added this layer, mapped to their expiration round.
    pub(crate) tx_leases: HashMap<TxLease, Round>,
    /// Changes to the creatable (id → creator) index.
    pub(crate) creatables: HashMap<CreatableId, ModifiedCreatable>,
    /// Header of the block under evaluation; shared by all layers.
    pub(crate) header: Arc<BlockHeader>,
}

impl StateDelta {
    /// Creates an empty delta over the given block header.
    pub(crate) fn new(header: Arc<BlockHeader>) -> Self {
        Self {
            accts: HashMap::new(),
            local_apps: HashMap::new(),
            global_apps: HashMap::new(),
            txids: HashMap::new(),
            tx_leases: HashMap::new(),
            creatables: HashMap::new(),
            header,
        }
    }

    /// Returns the header of the block under evaluation.
    pub fn header(&self) -> &BlockHeader {
        &self.header
    }

    /// Returns the addresses of every account this delta modifies.
    pub fn modified_accounts(&self) -> Vec<Address> {
        self.accts.keys().copied().collect()
    }

    /// Iterates over the account modifications.
    pub fn account_deltas(&self) -> impl Iterator<Item = (Address, &AccountDelta)> {
        self.accts.iter().map(|(addr, delta)| (*addr, delta))
    }

    /// Projects the delta one contract execution produced for one app.
    ///
    /// Picks out the global key/value delta of `app` and the local key/value
    /// deltas every account accumulated for `app`. Accounts whose record
    /// carries only a status change and no value deltas are omitted.
    pub fn eval_delta(&self, app: AppId) -> EvalDelta {
        let global_delta = match self.global_apps.get(&app) {
            Some(delta) => delta
                .kv
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            None => BTreeMap::new(),
        };

        let mut local_deltas = BTreeMap::new();
        for (&(addr, app_id), delta) in &self.local_apps {
            if app_id != app || delta.kv.is_empty() {
                continue;
            }
            let kv: BTreeMap<String, ValueDelta> = delta
                .kv
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            local_deltas.insert(addr, kv);
        }

        EvalDelta {
            global_delta,
            local_deltas,
        }
    }
}

/// The state delta produced by one contract program execution.
///
/// Committed into the block's apply data iff the program approved.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EvalDelta {
    /// Pending writes to the executed application's global store.
    pub global_delta: BTreeMap<String, ValueDelta>,
    /// Pending writes to each account's local store for the application.
    pub local_deltas: BTreeMap<Address, BTreeMap<String, ValueDelta>>,
}

impl EvalDelta {
    /// Returns true if the execution produced no state changes.
    pub fn is_empty(&self) -> bool {
        self.global_delta.is_empty() && self.local_deltas.is_empty()
    }
}
