//! Application of one application-call transaction.
//!
//! [`apply_app_call`] translates the call's fields into the correct sequence
//! of operations on the state layer, driving program execution through the
//! [`StateEvaluator`] capability. It is deliberately thin so the sequencing
//! rules stay testable with a scripted evaluator.

use crate::apps::evaluator::StateEvaluator;
use crate::core::app::{AppId, AppParams};
use crate::core::transaction::{ApplicationCallFields, OnCompletion};
use crate::state::delta::EvalDelta;
use crate::state::errors::LedgerError;
use crate::state::overlay::StateOverlay;
use crate::types::address::Address;
use crate::{info, warn};

/// Per-transaction results the block evaluator records alongside the
/// transaction, so consumers can apply state changes without re-running the
/// interpreter.
#[derive(Clone, Debug, Default)]
pub struct ApplyData {
    /// State delta produced by the executed program, empty if none ran.
    pub eval_delta: EvalDelta,
}

/// Decodes a wire on-completion value, rejecting unknown actions.
pub fn on_completion_from_wire(value: u64) -> Result<OnCompletion, LedgerError> {
    OnCompletion::from_u64(value).ok_or(LedgerError::InvalidAction)
}

/// Applies one application call to the given state layer.
///
/// `txn_counter` is the number of transactions recorded before this one; a
/// call with application id zero creates the app under `txn_counter + 1`.
///
/// On error the caller observes no [`ApplyData`] at all, so a failed call
/// can never surface a partially-applied state delta; whether the
/// transaction still charges a fee is decided above this layer.
pub fn apply_app_call<E: StateEvaluator>(
    fields: &ApplicationCallFields,
    sender: Address,
    cow: &mut StateOverlay<'_>,
    txn_counter: u64,
    evaluator: &mut E,
) -> Result<ApplyData, LedgerError> {
    fields.well_formed(cow.proto())?;

    // An application id of zero means this call creates the application,
    // which takes the next id in the creatable sequence.
    let app_idx = if fields.application_id == AppId(0) {
        AppId(txn_counter + 1)
    } else {
        fields.application_id
    };

    // The program may only touch the sender, the accounts listed in the
    // call, its own application, and the listed foreign apps.
    let mut acct_whitelist = fields.accounts.clone();
    acct_whitelist.push(sender);
    let mut app_whitelist = fields.foreign_apps.clone();
    app_whitelist.push(app_idx);
    evaluator.init_ledger(acct_whitelist, app_whitelist, app_idx)?;

    if fields.application_id == AppId(0) {
        let params = AppParams {
            approval_program: fields.approval_program.clone(),
            clear_state_program: fields.clear_state_program.clone(),
            local_schema: fields.local_schema,
            global_schema: fields.global_schema,
        };
        evaluator.create_application(cow, app_idx, sender, params)?;
        info!(
            "application created: id={} creator={} round={}",
            app_idx,
            sender,
            cow.round()
        );
    }

    // Clearing state never runs the approval program: reclaiming local state
    // is always permitted. The clear state program runs, and a rejection
    // discards its writes without failing the transaction.
    if fields.on_completion == OnCompletion::ClearState {
        let (pass, eval_delta) = evaluator.eval_clear_state(cow)?;
        if pass {
            return Ok(ApplyData { eval_delta });
        }
        warn!("clear state program rejected for app {app_idx}; its writes are discarded");
        return Ok(ApplyData::default());
    }

    // Allocate local state before evaluation so the approval program can
    // initialize it in the same transaction.
    if fields.on_completion == OnCompletion::OptIn {
        evaluator.opt_in_application(cow, app_idx, sender)?;
    }

    let (pass, eval_delta) = evaluator.eval_approval(cow)?;
    if !pass {
        return Err(LedgerError::TransactionRejected);
    }

    match fields.on_completion {
        OnCompletion::NoOp => {}
        // Handled before evaluation.
        OnCompletion::OptIn => {}
        OnCompletion::CloseOut => evaluator.opt_out_application(cow, app_idx, sender)?,
        OnCompletion::DeleteApplication => evaluator.delete_application(cow, app_idx)?,
        OnCompletion::UpdateApplication => evaluator.update_application(
            cow,
            app_idx,
            &fields.approval_program,
            &fields.clear_state_program,
        )?,
        OnCompletion::ClearState => unreachable!("clear state returns before evaluation"),
    }

    Ok(ApplyData { eval_delta })
}
