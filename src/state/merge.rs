//! Child-to-parent merge of state layers.
//!
//! A committed child is replayed into its parent through the parent's public
//! write API, so the parent re-runs its own baseline-aware no-op suppression
//! on every replayed write: a child write equal to the parent's effective
//! value is dropped on merge, keeping the merged delta minimal.
//!
//! The lifecycle tags compose according to a fixed table. Combinations that
//! cannot arise from any legal sequence of operations (an app created twice,
//! deleted twice, or recreated after deletion; an account opted out twice)
//! surface as [`LedgerError::Invariant`] and abort block evaluation.

use crate::core::app::AppId;
use crate::state::app_delta::{GlobalAppDelta, GlobalChange, LocalAppDelta, LocalChange};
use crate::state::delta::StateDelta;
use crate::state::errors::{LedgerError, invariant_violation};
use crate::state::overlay::StateOverlay;
use crate::state::reader::StateReader;
use crate::types::address::Address;
use std::collections::hash_map::Entry;

/// Wraps a failure seen while replaying a committed child write.
///
/// The child already performed these writes against a view equivalent to the
/// parent, so anything other than baseline I/O means the two layers disagree
/// about state they must agree on.
fn replay_error(context: &str, err: LedgerError) -> LedgerError {
    match err {
        LedgerError::Baseline(_) => err,
        other => invariant_violation(format!("merge replay failed ({context}): {other}")),
    }
}

impl StateOverlay<'_> {
    /// Merges a committed child's delta into this layer.
    ///
    /// After a successful absorb, this layer's effective state equals "child
    /// on top of parent". The child's header is the same shared header and
    /// is dropped.
    pub fn absorb(&mut self, child: StateDelta) -> Result<(), LedgerError> {
        let StateDelta {
            accts,
            local_apps,
            global_apps,
            txids,
            tx_leases,
            creatables,
            header: _,
        } = child;

        // Accounts: keep the oldest retained original, take the newest write.
        for (addr, delta) in accts {
            match self.delta_mut().accts.entry(addr) {
                Entry::Occupied(mut entry) => entry.get_mut().new = delta.new,
                Entry::Vacant(entry) => {
                    entry.insert(delta);
                }
            }
        }

        for (app, delta) in global_apps {
            self.absorb_global_app(app, delta)?;
        }
        for ((addr, app), delta) in local_apps {
            self.absorb_local_app(addr, app, delta)?;
        }

        // Txids and leases: union, child overrides.
        self.delta_mut().txids.extend(txids);
        self.delta_mut().tx_leases.extend(tx_leases);

        // Creatables: a child deletion of an id this layer created cancels
        // the pair outright; otherwise the child entry wins.
        for (id, delta) in creatables {
            let cancels = matches!(
                self.delta().creatables.get(&id),
                Some(existing) if existing.created && !delta.created
            );
            if cancels {
                self.delta_mut().creatables.remove(&id);
            } else {
                self.delta_mut().creatables.insert(id, delta);
            }
        }

        Ok(())
    }

    /// Merges one application's global delta from a committed child.
    fn absorb_global_app(&mut self, app: AppId, child: GlobalAppDelta) -> Result<(), LedgerError> {
        let GlobalAppDelta { change, kv } = child;

        if let Some(existing) = self.delta().global_apps.get(&app) {
            match (&existing.change, &change) {
                (GlobalChange::Created { .. }, GlobalChange::Created { .. }) => {
                    return Err(invariant_violation(format!(
                        "app {app} created twice; creatable ids are unique"
                    )));
                }
                (GlobalChange::Deleted, GlobalChange::Deleted) => {
                    return Err(invariant_violation(format!("app {app} deleted twice")));
                }
                (GlobalChange::Deleted, GlobalChange::Created { .. }) => {
                    return Err(invariant_violation(format!(
                        "app {app} recreated after deletion; creatable ids are never reused"
                    )));
                }
                _ => {}
            }
        }

        match change {
            GlobalChange::Deleted => {
                if !kv.is_empty() {
                    return Err(invariant_violation(format!(
                        "deleted app {app} carries pending state writes"
                    )));
                }
                self.delete_app(app)
                    .map_err(|e| replay_error("app delete", e))?;
            }
            GlobalChange::Created { creator, params } => {
                if let Some(existing) = self.delta().global_apps.get(&app)
                    && !existing.kv.is_empty()
                {
                    return Err(invariant_violation(format!(
                        "app {app} created in child over pending parent state writes"
                    )));
                }
                self.create_app(app, creator, params)
                    .map_err(|e| replay_error("app create", e))?;
            }
            GlobalChange::Unchanged {
                params: Some(updated),
            } => {
                self.update_app(app, &updated.approval_program, &updated.clear_state_program)
                    .map_err(|e| replay_error("app update", e))?;
            }
            GlobalChange::Unchanged { params: None } => {}
        }

        for (key, value_delta) in kv {
            match value_delta.to_teal_value() {
                Some(value) => self
                    .set_global(app, &key, value)
                    .map_err(|e| replay_error("global write", e))?,
                None => self
                    .del_global(app, &key)
                    .map_err(|e| replay_error("global delete", e))?,
            }
        }

        Ok(())
    }

    /// Merges one (account, app) local delta from a committed child.
    fn absorb_local_app(
        &mut self,
        addr: Address,
        app: AppId,
        child: LocalAppDelta,
    ) -> Result<(), LedgerError> {
        let LocalAppDelta { change, kv } = child;

        if let Some(existing) = self.delta().local_apps.get(&(addr, app))
            && existing.change == LocalChange::OptedOut
        {
            // Over an opted-out view the child can only have opted back in:
            // it cannot opt out again, and it cannot have produced value
            // deltas without opting in first.
            match change {
                LocalChange::OptedOut => {
                    return Err(invariant_violation(format!(
                        "account {addr} opted out of app {app} twice"
                    )));
                }
                LocalChange::Unchanged => {
                    return Err(invariant_violation(format!(
                        "local delta for account {addr} composed over opted-out view of app {app}"
                    )));
                }
                LocalChange::OptedIn => {}
            }
        }

        match change {
            LocalChange::OptedOut => {
                if !kv.is_empty() {
                    return Err(invariant_violation(format!(
                        "opted-out record for account {addr}, app {app} carries pending writes"
                    )));
                }
                self.opt_out(addr, app)
                    .map_err(|e| replay_error("opt-out", e))?;
            }
            LocalChange::OptedIn => {
                // The child's opt-in wiped whatever view it had, including
                // any opt-in this layer recorded earlier; reset before
                // replaying so the store starts clean here too.
                if self.opted_in(addr, app)? {
                    self.opt_out(addr, app)
                        .map_err(|e| replay_error("opt-out before re-opt-in", e))?;
                }
                self.opt_in(addr, app)
                    .map_err(|e| replay_error("opt-in", e))?;
            }
            LocalChange::Unchanged => {}
        }

        for (key, value_delta) in kv {
            match value_delta.to_teal_value() {
                Some(value) => self
                    .set_local(addr, app, &key, value)
                    .map_err(|e| replay_error("local write", e))?,
                None => self
                    .del_local(addr, app, &key)
                    .map_err(|e| replay_error("local delete", e))?,
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::account::AccountData;
    use crate::core::app::{AssetId, CreatableLocator, CreatableType};
    use crate::state::test_base::test::TestBase;
    use crate::types::teal::TealValue;
    use crate::utils::test_utils::utils::{addr, app_params, header, plain_tx};

    const APP: AppId = AppId(7);

    #[test]
    fn created_app_and_state_commit_through_to_root() {
        let base = TestBase::new();
        let mut root = StateOverlay::new(&base, header(1));

        let mut child = root.child();
        child.create_app(APP, addr(1), app_params("a")).unwrap();
        child.set_global(APP, "k", TealValue::Uint(1)).unwrap();
        let delta = child.into_delta();
        root.absorb(delta).unwrap();

        let (params, creator) = root.get_app_params(APP).unwrap().unwrap();
        assert_eq!(params, app_params("a"));
        assert_eq!(creator, addr(1));
        assert_eq!(root.get_global(APP, "k").unwrap(), Some(TealValue::Uint(1)));
    }

    #[test]
    fn noop_write_leaves_no_delta_after_merge() {
        let base = TestBase::new()
            .with_app(APP, addr(1), app_params("a"))
            .with_global(APP, "k", TealValue::Uint(5));
        let mut root = StateOverlay::new(&base, header(1));

        let mut child = root.child();
        child.set_global(APP, "k", TealValue::Uint(5)).unwrap();
        root.absorb(child.into_delta()).unwrap();

        let recorded = root
            .delta()
            .global_apps
            .get(&APP)
            .map(|d| d.kv.read("k").is_some())
            .unwrap_or(false);
        assert!(!recorded, "write equal to the baseline must leave no delta");
    }

    #[test]
    fn dropped_child_has_no_effect() {
        let base = TestBase::new()
            .with_app(APP, addr(1), app_params("a"))
            .with_global(APP, "k", TealValue::from_bytes("a"));
        let mut root = StateOverlay::new(&base, header(1));
        root.set_global(APP, "k", TealValue::from_bytes("b")).unwrap();

        {
            let mut child = root.child();
            child.set_global(APP, "k", TealValue::from_bytes("c")).unwrap();
            child.opt_in(addr(2), APP).unwrap();
            child
                .put_account(addr(3), AccountData::new(1), AccountData::new(2));
            // Dropped without absorb: discarded.
        }

        assert_eq!(
            root.get_global(APP, "k").unwrap(),
            Some(TealValue::from_bytes("b"))
        );
        assert!(!root.opted_in(addr(2), APP).unwrap());
        assert!(root.delta().accts.is_empty());
    }

    #[test]
    fn nested_child_discard_keeps_middle_layer_write() {
        let base = TestBase::new()
            .with_app(APP, addr(1), app_params("a"))
            .with_global(APP, "k", TealValue::from_bytes("a"));
        let mut root = StateOverlay::new(&base, header(1));

        let mut middle = root.child();
        middle
            .set_global(APP, "k", TealValue::from_bytes("b"))
            .unwrap();

        {
            let mut inner = middle.child();
            inner
                .set_global(APP, "k", TealValue::from_bytes("c"))
                .unwrap();
            // Inner rejected: dropped.
        }

        root.absorb(middle.into_delta()).unwrap();
        assert_eq!(
            root.get_global(APP, "k").unwrap(),
            Some(TealValue::from_bytes("b"))
        );
    }

    #[test]
    fn create_after_delete_across_layers_is_an_invariant_violation() {
        let base = TestBase::new().with_app(APP, addr(1), app_params("a"));
        let mut root = StateOverlay::new(&base, header(1));
        root.delete_app(APP).unwrap();

        let mut child = root.child();
        // The child sees the app as deleted, so creating it succeeds there.
        child.create_app(APP, addr(2), app_params("b")).unwrap();

        let err = root.absorb(child.into_delta()).unwrap_err();
        assert!(matches!(err, LedgerError::Invariant(_)));
    }

    #[test]
    fn double_create_across_layers_is_an_invariant_violation() {
        let base = TestBase::new();
        let mut root = StateOverlay::new(&base, header(1));
        root.create_app(APP, addr(1), app_params("a")).unwrap();

        // Forge a child delta claiming to create the same app; a real child
        // could never record this since it sees the parent's create.
        let mut forged = StateDelta::new(std::sync::Arc::new(header(1)));
        forged.global_apps.insert(
            APP,
            GlobalAppDelta {
                change: GlobalChange::Created {
                    creator: addr(2),
                    params: app_params("b"),
                },
                kv: Default::default(),
            },
        );

        let err = root.absorb(forged).unwrap_err();
        assert!(matches!(err, LedgerError::Invariant(_)));
    }

    #[test]
    fn double_delete_across_layers_is_an_invariant_violation() {
        let base = TestBase::new().with_app(APP, addr(1), app_params("a"));
        let mut root = StateOverlay::new(&base, header(1));
        root.delete_app(APP).unwrap();

        let mut forged = StateDelta::new(std::sync::Arc::new(header(1)));
        forged.global_apps.insert(
            APP,
            GlobalAppDelta {
                change: GlobalChange::Deleted,
                kv: Default::default(),
            },
        );

        let err = root.absorb(forged).unwrap_err();
        assert!(matches!(err, LedgerError::Invariant(_)));
    }

    #[test]
    fn child_delete_replays_into_parent() {
        let base = TestBase::new().with_app(APP, addr(1), app_params("a"));
        let mut root = StateOverlay::new(&base, header(1));

        let mut child = root.child();
        child.delete_app(APP).unwrap();
        root.absorb(child.into_delta()).unwrap();

        assert_eq!(root.get_app_params(APP).unwrap(), None);
        assert!(matches!(
            root.get_global(APP, "k").unwrap_err(),
            LedgerError::AppMissing(_)
        ));
    }

    #[test]
    fn child_update_replays_into_parent() {
        let base = TestBase::new().with_app(APP, addr(1), app_params("a"));
        let mut root = StateOverlay::new(&base, header(1));

        let mut child = root.child();
        child.update_app(APP, b"new approval", b"new clear").unwrap();
        root.absorb(child.into_delta()).unwrap();

        let (params, creator) = root.get_app_params(APP).unwrap().unwrap();
        assert_eq!(params.approval_program.as_slice(), b"new approval");
        assert_eq!(params.clear_state_program.as_slice(), b"new clear");
        assert_eq!(creator, addr(1));
        // Schemas are not touched by updates.
        assert_eq!(params.local_schema, app_params("a").local_schema);
    }

    #[test]
    fn accounts_merge_keeps_parent_original() {
        let base = TestBase::new();
        let mut root = StateOverlay::new(&base, header(1));
        root.put_account(addr(1), AccountData::new(100), AccountData::new(90));

        let mut child = root.child();
        child.put_account(addr(1), AccountData::new(90), AccountData::new(70));
        child.put_account(addr(2), AccountData::new(5), AccountData::new(6));
        root.absorb(child.into_delta()).unwrap();

        let merged = &root.delta().accts[&addr(1)];
        assert_eq!(merged.old.balance(), 100, "first retained original wins");
        assert_eq!(merged.new.balance(), 70, "latest write wins");
        assert_eq!(root.delta().accts[&addr(2)].old.balance(), 5);
    }

    #[test]
    fn txids_and_leases_union_on_merge() {
        let base = TestBase::new();
        let mut root = StateOverlay::new(&base, header(1));
        let tx1 = plain_tx(addr(1), 10, [1u8; 32]);
        root.add_tx(&tx1, tx1.id());

        let mut child = root.child();
        let tx2 = plain_tx(addr(2), 20, [2u8; 32]);
        child.add_tx(&tx2, tx2.id());
        assert_eq!(child.txn_counter(), root.txn_counter() + 1);

        root.absorb(child.into_delta()).unwrap();
        assert_eq!(root.delta().txids.len(), 2);
        assert_eq!(root.delta().tx_leases.len(), 2);
        assert!(root.is_dup(1, 20, tx2.id(), &tx2.lease_key()).unwrap());
    }

    #[test]
    fn child_creatable_delete_cancels_parent_create() {
        let base = TestBase::new();
        let mut root = StateOverlay::new(&base, header(1));
        root.put_creatables(addr(1), &[CreatableLocator::asset(AssetId(9))], &[]);

        let mut child = root.child();
        child.put_creatables(addr(1), &[], &[CreatableLocator::asset(AssetId(9))]);
        root.absorb(child.into_delta()).unwrap();

        assert!(root.delta().creatables.is_empty());
        assert_eq!(
            root.get_creator(AssetId(9).into(), CreatableType::Asset)
                .unwrap(),
            None
        );
    }

    #[test]
    fn child_local_writes_replay_with_suppression() {
        let base = TestBase::new()
            .with_app(APP, addr(9), app_params("a"))
            .with_local(addr(1), APP, "x", TealValue::Uint(3))
            .with_local(addr(1), APP, "y", TealValue::Uint(4));
        let mut root = StateOverlay::new(&base, header(1));

        let mut child = root.child();
        child.set_local(addr(1), APP, "x", TealValue::Uint(3)).unwrap();
        child.set_local(addr(1), APP, "y", TealValue::Uint(40)).unwrap();
        root.absorb(child.into_delta()).unwrap();

        // The write of the baseline value left no delta; the real write did.
        let record = root.delta().local_apps.get(&(addr(1), APP)).unwrap();
        assert!(record.kv.read("x").is_none());
        assert!(record.kv.read("y").is_some());
        assert_eq!(
            root.get_local(addr(1), APP, "y").unwrap(),
            Some(TealValue::Uint(40))
        );
    }

    #[test]
    fn child_opt_in_resets_parent_opt_in() {
        let base = TestBase::new().with_app(APP, addr(9), app_params("a"));
        let mut root = StateOverlay::new(&base, header(1));
        root.opt_in(addr(1), APP).unwrap();
        root.set_local(addr(1), APP, "x", TealValue::Uint(1)).unwrap();

        // The child opts out and back in, wiping the store.
        let mut child = root.child();
        child.opt_out(addr(1), APP).unwrap();
        child.opt_in(addr(1), APP).unwrap();
        child.set_local(addr(1), APP, "z", TealValue::Uint(2)).unwrap();
        root.absorb(child.into_delta()).unwrap();

        assert!(root.opted_in(addr(1), APP).unwrap());
        assert_eq!(root.get_local(addr(1), APP, "x").unwrap(), None);
        assert_eq!(
            root.get_local(addr(1), APP, "z").unwrap(),
            Some(TealValue::Uint(2))
        );
    }

    #[test]
    fn child_opt_out_replays_into_parent() {
        let base = TestBase::new()
            .with_app(APP, addr(9), app_params("a"))
            .with_local(addr(1), APP, "x", TealValue::Uint(3));
        let mut root = StateOverlay::new(&base, header(1));

        let mut child = root.child();
        child.opt_out(addr(1), APP).unwrap();
        root.absorb(child.into_delta()).unwrap();

        assert!(!root.opted_in(addr(1), APP).unwrap());
        let record = root.delta().local_apps.get(&(addr(1), APP)).unwrap();
        assert_eq!(record.change, LocalChange::OptedOut);
        assert!(record.kv.is_empty());
    }

    #[test]
    fn child_opt_out_of_layer_opt_in_nets_to_zero() {
        let base = TestBase::new().with_app(APP, addr(9), app_params("a"));
        let mut root = StateOverlay::new(&base, header(1));
        root.opt_in(addr(1), APP).unwrap();

        let mut child = root.child();
        child.opt_out(addr(1), APP).unwrap();
        root.absorb(child.into_delta()).unwrap();

        // The base never saw the account opted in, so the pair cancels.
        assert!(!root.opted_in(addr(1), APP).unwrap());
        assert!(root.delta().local_apps.get(&(addr(1), APP)).is_none());
    }

    #[test]
    fn forged_double_opt_out_is_an_invariant_violation() {
        let base = TestBase::new()
            .with_app(APP, addr(9), app_params("a"))
            .with_opted_in(addr(1), APP);
        let mut root = StateOverlay::new(&base, header(1));
        root.opt_out(addr(1), APP).unwrap();

        let mut forged = StateDelta::new(std::sync::Arc::new(header(1)));
        forged.local_apps.insert(
            (addr(1), APP),
            LocalAppDelta {
                change: LocalChange::OptedOut,
                kv: Default::default(),
            },
        );

        let err = root.absorb(forged).unwrap_err();
        assert!(matches!(err, LedgerError::Invariant(_)));
    }
}
