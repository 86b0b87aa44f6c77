//! The state view handed to the contract interpreter.
//!
//! A contract execution may only touch a declared set of accounts and
//! foreign applications. [`AppLedger`] wraps a state layer and enforces
//! those whitelists on every access; the interpreter never sees the layer
//! directly.

use crate::core::account::{AssetHolding, AssetParams};
use crate::core::app::{AppId, AssetId};
use crate::core::header::Round;
use crate::state::errors::LedgerError;
use crate::state::overlay::StateOverlay;
use crate::state::reader::StateReader;
use crate::types::address::Address;
use crate::types::teal::TealValue;
use std::collections::HashSet;

/// Ledger operations available to a running contract program.
///
/// All reads of foreign state are whitelist-checked. Writes are restricted
/// further: local state may only be written for whitelisted accounts under
/// the executing application, and global state only for the executing
/// application itself.
pub trait LedgerForLogic {
    /// Round of the block under evaluation.
    fn round(&self) -> Round;
    /// Timestamp of the block under evaluation.
    fn latest_timestamp(&self) -> i64;
    /// Id of the application being executed.
    fn application_id(&self) -> AppId;
    /// Balance of a whitelisted account.
    fn balance(&self, addr: Address) -> Result<u64, LedgerError>;
    /// Asset holding of a whitelisted account.
    fn asset_holding(&self, addr: Address, asset: AssetId) -> Result<AssetHolding, LedgerError>;
    /// Parameters of an asset created by a whitelisted account.
    fn asset_params(&self, addr: Address, asset: AssetId) -> Result<AssetParams, LedgerError>;
    /// Whether a whitelisted account is opted in to a whitelisted app.
    fn opted_in(&self, addr: Address, app: AppId) -> Result<bool, LedgerError>;
    /// Reads local state of a whitelisted account for a whitelisted app.
    fn get_local(
        &self,
        addr: Address,
        app: AppId,
        key: &str,
    ) -> Result<Option<TealValue>, LedgerError>;
    /// Writes local state of a whitelisted account for the executing app.
    fn set_local(&mut self, addr: Address, key: &str, value: TealValue)
    -> Result<(), LedgerError>;
    /// Deletes local state of a whitelisted account for the executing app.
    fn del_local(&mut self, addr: Address, key: &str) -> Result<(), LedgerError>;
    /// Reads global state of a whitelisted app.
    fn get_global(&self, app: AppId, key: &str) -> Result<Option<TealValue>, LedgerError>;
    /// Writes global state of the executing app.
    fn set_global(&mut self, key: &str, value: TealValue) -> Result<(), LedgerError>;
    /// Deletes global state of the executing app.
    fn del_global(&mut self, key: &str) -> Result<(), LedgerError>;
}

/// Whitelisted view over a state layer for one contract execution.
pub struct AppLedger<'c, 'l> {
    cow: &'c mut StateOverlay<'l>,
    addresses: HashSet<Address>,
    apps: HashSet<AppId>,
    app_idx: AppId,
}

impl<'c, 'l> AppLedger<'c, 'l> {
    /// Wraps a state layer with the whitelists of one application call.
    ///
    /// The account whitelist must include at least the transaction sender,
    /// and the app whitelist at least the executing application.
    pub fn new(
        cow: &'c mut StateOverlay<'l>,
        acct_whitelist: &[Address],
        app_whitelist: &[AppId],
        app_idx: AppId,
    ) -> Result<AppLedger<'c, 'l>, LedgerError> {
        if acct_whitelist.is_empty() {
            return Err(LedgerError::MalformedAppCall(
                "account whitelist must at least include the transaction sender".to_string(),
            ));
        }
        if app_whitelist.is_empty() {
            return Err(LedgerError::MalformedAppCall(
                "app whitelist must at least include the executing application".to_string(),
            ));
        }
        if app_idx == AppId(0) {
            return Err(LedgerError::MalformedAppCall(
                "cannot execute application id 0".to_string(),
            ));
        }

        Ok(AppLedger {
            cow,
            addresses: acct_whitelist.iter().copied().collect(),
            apps: app_whitelist.iter().copied().collect(),
            app_idx,
        })
    }

    fn check_account(&self, addr: Address) -> Result<(), LedgerError> {
        if self.addresses.contains(&addr) {
            Ok(())
        } else {
            Err(LedgerError::NotInAccountWhitelist(addr))
        }
    }

    fn check_app(&self, app: AppId) -> Result<(), LedgerError> {
        if self.apps.contains(&app) {
            Ok(())
        } else {
            Err(LedgerError::NotInAppWhitelist(app))
        }
    }
}

impl LedgerForLogic for AppLedger<'_, '_> {
    fn round(&self) -> Round {
        self.cow.round()
    }

    fn latest_timestamp(&self) -> i64 {
        self.cow.latest_timestamp()
    }

    fn application_id(&self) -> AppId {
        self.app_idx
    }

    fn balance(&self, addr: Address) -> Result<u64, LedgerError> {
        self.check_account(addr)?;
        Ok(self.cow.lookup_account(addr)?.balance())
    }

    fn asset_holding(&self, addr: Address, asset: AssetId) -> Result<AssetHolding, LedgerError> {
        self.check_account(addr)?;
        let record = self.cow.lookup_account(addr)?;
        record
            .asset_holding(asset)
            .copied()
            .ok_or(LedgerError::AssetNotHeld(addr, asset))
    }

    fn asset_params(&self, addr: Address, asset: AssetId) -> Result<AssetParams, LedgerError> {
        self.check_account(addr)?;
        let record = self.cow.lookup_account(addr)?;
        record
            .created_asset_params(asset)
            .cloned()
            .ok_or(LedgerError::AssetNotCreated(addr, asset))
    }

    fn opted_in(&self, addr: Address, app: AppId) -> Result<bool, LedgerError> {
        self.check_account(addr)?;
        self.check_app(app)?;
        self.cow.opted_in(addr, app)
    }

    fn get_local(
        &self,
        addr: Address,
        app: AppId,
        key: &str,
    ) -> Result<Option<TealValue>, LedgerError> {
        self.check_account(addr)?;
        self.check_app(app)?;
        self.cow.get_local(addr, app, key)
    }

    fn set_local(
        &mut self,
        addr: Address,
        key: &str,
        value: TealValue,
    ) -> Result<(), LedgerError> {
        self.check_account(addr)?;
        self.cow.set_local(addr, self.app_idx, key, value)
    }

    fn del_local(&mut self, addr: Address, key: &str) -> Result<(), LedgerError> {
        self.check_account(addr)?;
        self.cow.del_local(addr, self.app_idx, key)
    }

    fn get_global(&self, app: AppId, key: &str) -> Result<Option<TealValue>, LedgerError> {
        self.check_app(app)?;
        self.cow.get_global(app, key)
    }

    fn set_global(&mut self, key: &str, value: TealValue) -> Result<(), LedgerError> {
        self.cow.set_global(self.app_idx, key, value)
    }

    fn del_global(&mut self, key: &str) -> Result<(), LedgerError> {
        self.cow.del_global(self.app_idx, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::account::AccountData;
    use crate::state::test_base::test::TestBase;
    use crate::utils::test_utils::utils::{addr, app_params, header};

    const APP: AppId = AppId(7);

    fn holding(amount: u64) -> AssetHolding {
        AssetHolding {
            amount,
            frozen: false,
        }
    }

    #[test]
    fn construction_requires_whitelists_and_app_id() {
        let base = TestBase::new();
        let mut cow = StateOverlay::new(&base, header(1));

        assert!(AppLedger::new(&mut cow, &[], &[APP], APP).is_err());
        assert!(AppLedger::new(&mut cow, &[addr(1)], &[], APP).is_err());
        assert!(AppLedger::new(&mut cow, &[addr(1)], &[AppId(0)], AppId(0)).is_err());
        assert!(AppLedger::new(&mut cow, &[addr(1)], &[APP], APP).is_ok());
    }

    #[test]
    fn non_whitelisted_account_is_rejected_everywhere() {
        let base = TestBase::new()
            .with_account(addr(2), AccountData::new(50).with_asset(AssetId(1), holding(5)));
        let mut cow = StateOverlay::new(&base, header(1));
        let mut ledger = AppLedger::new(&mut cow, &[addr(1)], &[APP], APP).unwrap();

        assert!(matches!(
            ledger.balance(addr(2)).unwrap_err(),
            LedgerError::NotInAccountWhitelist(_)
        ));
        assert!(matches!(
            ledger.asset_holding(addr(2), AssetId(1)).unwrap_err(),
            LedgerError::NotInAccountWhitelist(_)
        ));
        assert!(matches!(
            ledger.asset_params(addr(2), AssetId(1)).unwrap_err(),
            LedgerError::NotInAccountWhitelist(_)
        ));
        assert!(matches!(
            ledger.get_local(addr(2), APP, "k").unwrap_err(),
            LedgerError::NotInAccountWhitelist(_)
        ));
        assert!(matches!(
            ledger
                .set_local(addr(2), "k", TealValue::Uint(1))
                .unwrap_err(),
            LedgerError::NotInAccountWhitelist(_)
        ));
    }

    #[test]
    fn non_whitelisted_app_is_rejected() {
        let base = TestBase::new().with_app(AppId(8), addr(9), app_params("other"));
        let mut cow = StateOverlay::new(&base, header(1));
        let ledger = AppLedger::new(&mut cow, &[addr(1)], &[APP], APP).unwrap();

        assert!(matches!(
            ledger.get_global(AppId(8), "k").unwrap_err(),
            LedgerError::NotInAppWhitelist(_)
        ));
        assert!(matches!(
            ledger.opted_in(addr(1), AppId(8)).unwrap_err(),
            LedgerError::NotInAppWhitelist(_)
        ));
    }

    #[test]
    fn whitelisted_reads_resolve_through_the_layer() {
        let base = TestBase::new()
            .with_account(addr(1), AccountData::new(77).with_asset(AssetId(3), holding(12)))
            .with_app(APP, addr(9), app_params("a"))
            .with_global(APP, "k", TealValue::Uint(5));
        let mut cow = StateOverlay::new(&base, header(4));
        let ledger = AppLedger::new(&mut cow, &[addr(1)], &[APP], APP).unwrap();

        assert_eq!(ledger.round(), 4);
        assert_eq!(ledger.application_id(), APP);
        assert_eq!(ledger.balance(addr(1)).unwrap(), 77);
        assert_eq!(ledger.asset_holding(addr(1), AssetId(3)).unwrap().amount, 12);
        assert_eq!(
            ledger.get_global(APP, "k").unwrap(),
            Some(TealValue::Uint(5))
        );
    }

    #[test]
    fn missing_asset_reads_fail_cleanly() {
        let base = TestBase::new().with_account(addr(1), AccountData::new(1));
        let mut cow = StateOverlay::new(&base, header(1));
        let ledger = AppLedger::new(&mut cow, &[addr(1)], &[APP], APP).unwrap();

        assert!(matches!(
            ledger.asset_holding(addr(1), AssetId(2)).unwrap_err(),
            LedgerError::AssetNotHeld(..)
        ));
        assert!(matches!(
            ledger.asset_params(addr(1), AssetId(2)).unwrap_err(),
            LedgerError::AssetNotCreated(..)
        ));
    }

    #[test]
    fn writes_target_the_executing_app() {
        let base = TestBase::new()
            .with_app(APP, addr(9), app_params("a"))
            .with_opted_in(addr(1), APP);
        let mut cow = StateOverlay::new(&base, header(1));
        let mut ledger = AppLedger::new(&mut cow, &[addr(1)], &[APP], APP).unwrap();

        ledger.set_global("g", TealValue::Uint(1)).unwrap();
        ledger.set_local(addr(1), "l", TealValue::Uint(2)).unwrap();
        assert_eq!(
            ledger.get_global(APP, "g").unwrap(),
            Some(TealValue::Uint(1))
        );
        assert_eq!(
            ledger.get_local(addr(1), APP, "l").unwrap(),
            Some(TealValue::Uint(2))
        );

        ledger.del_global("g").unwrap();
        ledger.del_local(addr(1), "l").unwrap();
        assert_eq!(ledger.get_global(APP, "g").unwrap(), None);
        assert_eq!(ledger.get_local(addr(1), APP, "l").unwrap(), None);
    }
}
