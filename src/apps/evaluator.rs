//! Program evaluation against speculative state layers.
//!
//! The transaction dispatcher drives evaluation through the
//! [`StateEvaluator`] capability. The production implementation,
//! [`AppEvaluator`], spawns a child state layer per program run, hands the
//! interpreter a whitelisted [`AppLedger`] over it, and merges the child
//! into the parent only when the program approves. A failed or rejected run
//! leaves the parent untouched because the child is simply dropped.

use crate::apps::ledger::{AppLedger, LedgerForLogic};
use crate::core::app::{AppId, AppParams};
use crate::state::delta::EvalDelta;
use crate::state::errors::{LedgerError, invariant_violation};
use crate::state::overlay::StateOverlay;
use crate::state::reader::StateReader;
use crate::types::address::Address;

/// The contract interpreter, reduced to the single entry point this
/// subsystem needs: run a program against a ledger and report whether it
/// approved.
///
/// Opcode semantics live outside this crate; tests drive state changes
/// through closures.
pub trait ProgramRunner {
    fn run(
        &mut self,
        program: &[u8],
        ledger: &mut dyn LedgerForLogic,
    ) -> Result<bool, LedgerError>;
}

impl<F> ProgramRunner for F
where
    F: FnMut(&[u8], &mut dyn LedgerForLogic) -> Result<bool, LedgerError>,
{
    fn run(
        &mut self,
        program: &[u8],
        ledger: &mut dyn LedgerForLogic,
    ) -> Result<bool, LedgerError> {
        self(program, ledger)
    }
}

/// Evaluation capability the transaction dispatcher drives.
///
/// Methods take the state layer explicitly; the evaluator holds no state
/// reference of its own between calls.
pub trait StateEvaluator {
    /// Declares the whitelists and executing app for subsequent evaluations.
    ///
    /// Must be called before `eval_approval` or `eval_clear_state`.
    fn init_ledger(
        &mut self,
        acct_whitelist: Vec<Address>,
        app_whitelist: Vec<AppId>,
        app_idx: AppId,
    ) -> Result<(), LedgerError>;

    /// Runs the approval program, committing its writes iff it approves.
    fn eval_approval(
        &mut self,
        cow: &mut StateOverlay<'_>,
    ) -> Result<(bool, EvalDelta), LedgerError>;

    /// Runs the clear state program, committing its writes iff it approves.
    fn eval_clear_state(
        &mut self,
        cow: &mut StateOverlay<'_>,
    ) -> Result<(bool, EvalDelta), LedgerError>;

    /// Creates an application.
    fn create_application(
        &mut self,
        cow: &mut StateOverlay<'_>,
        app: AppId,
        creator: Address,
        params: AppParams,
    ) -> Result<(), LedgerError>;

    /// Replaces an application's programs.
    fn update_application(
        &mut self,
        cow: &mut StateOverlay<'_>,
        app: AppId,
        approval_program: &[u8],
        clear_state_program: &[u8],
    ) -> Result<(), LedgerError>;

    /// Deletes an application.
    fn delete_application(&mut self, cow: &mut StateOverlay<'_>, app: AppId)
    -> Result<(), LedgerError>;

    /// Opts an account in to an application.
    fn opt_in_application(
        &mut self,
        cow: &mut StateOverlay<'_>,
        app: AppId,
        addr: Address,
    ) -> Result<(), LedgerError>;

    /// Opts an account out of an application.
    fn opt_out_application(
        &mut self,
        cow: &mut StateOverlay<'_>,
        app: AppId,
        addr: Address,
    ) -> Result<(), LedgerError>;
}

/// Which of the application's two programs to run.
#[derive(Clone, Copy, Debug)]
enum ProgramKind {
    Approval,
    ClearState,
}

/// Whitelists and executing app, captured by `init_ledger`.
#[derive(Clone)]
struct LedgerContext {
    addresses: Vec<Address>,
    apps: Vec<AppId>,
    app_idx: AppId,
}

/// Production [`StateEvaluator`] running programs through a [`ProgramRunner`].
pub struct AppEvaluator<R: ProgramRunner> {
    runner: R,
    context: Option<LedgerContext>,
}

impl<R: ProgramRunner> AppEvaluator<R> {
    /// Creates an evaluator around the given interpreter.
    pub fn new(runner: R) -> Self {
        Self { runner, context: None }
    }

    /// Runs one of the app's programs in a child layer of `cow`.
    ///
    /// The child is merged into `cow` iff the program approves; the reported
    /// [`EvalDelta`] is projected from the child's own delta either way.
    fn eval_program(
        &mut self,
        cow: &mut StateOverlay<'_>,
        kind: ProgramKind,
    ) -> Result<(bool, EvalDelta), LedgerError> {
        let context = match &self.context {
            Some(context) => context.clone(),
            None => {
                return Err(invariant_violation(
                    "evaluator used before init_ledger".to_string(),
                ));
            }
        };

        let Some((params, _creator)) = cow.get_app_params(context.app_idx)? else {
            return Err(LedgerError::AppMissing(context.app_idx));
        };
        let program = match kind {
            ProgramKind::Approval => params.approval_program,
            ProgramKind::ClearState => params.clear_state_program,
        };

        let mut child = cow.child();
        let mut ledger = AppLedger::new(&mut child, &context.addresses, &context.apps, context.app_idx)?;
        let pass = self.runner.run(program.as_slice(), &mut ledger)?;
        drop(ledger);

        let delta = child.into_delta();
        let eval_delta = delta.eval_delta(context.app_idx);
        if pass {
            cow.absorb(delta)?;
        }
        Ok((pass, eval_delta))
    }
}

impl<R: ProgramRunner> StateEvaluator for AppEvaluator<R> {
    fn init_ledger(
        &mut self,
        acct_whitelist: Vec<Address>,
        app_whitelist: Vec<AppId>,
        app_idx: AppId,
    ) -> Result<(), LedgerError> {
        self.context = Some(LedgerContext {
            addresses: acct_whitelist,
            apps: app_whitelist,
            app_idx,
        });
        Ok(())
    }

    fn eval_approval(
        &mut self,
        cow: &mut StateOverlay<'_>,
    ) -> Result<(bool, EvalDelta), LedgerError> {
        self.eval_program(cow, ProgramKind::Approval)
    }

    fn eval_clear_state(
        &mut self,
        cow: &mut StateOverlay<'_>,
    ) -> Result<(bool, EvalDelta), LedgerError> {
        self.eval_program(cow, ProgramKind::ClearState)
    }

    fn create_application(
        &mut self,
        cow: &mut StateOverlay<'_>,
        app: AppId,
        creator: Address,
        params: AppParams,
    ) -> Result<(), LedgerError> {
        cow.create_app(app, creator, params)
    }

    fn update_application(
        &mut self,
        cow: &mut StateOverlay<'_>,
        app: AppId,
        approval_program: &[u8],
        clear_state_program: &[u8],
    ) -> Result<(), LedgerError> {
        cow.update_app(app, approval_program, clear_state_program)
    }

    fn delete_application(
        &mut self,
        cow: &mut StateOverlay<'_>,
        app: AppId,
    ) -> Result<(), LedgerError> {
        cow.delete_app(app)
    }

    fn opt_in_application(
        &mut self,
        cow: &mut StateOverlay<'_>,
        app: AppId,
        addr: Address,
    ) -> Result<(), LedgerError> {
        cow.opt_in(addr, app)
    }

    fn opt_out_application(
        &mut self,
        cow: &mut StateOverlay<'_>,
        app: AppId,
        addr: Address,
    ) -> Result<(), LedgerError> {
        cow.opt_out(addr, app)
    }
}
