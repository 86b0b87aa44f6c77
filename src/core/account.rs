//! Account state as seen by the state subsystem.

use crate::core::app::AssetId;
use std::collections::BTreeMap;

/// One account's holding of a single asset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AssetHolding {
    /// Number of base units held.
    pub amount: u64,
    /// Whether transfers of this holding are frozen.
    pub frozen: bool,
}

/// Parameters of an asset, stored on its creator's account.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AssetParams {
    /// Total number of base units issued.
    pub total: u64,
    /// Number of digits after the decimal point when displaying amounts.
    pub decimals: u32,
    /// Whether holdings start out frozen.
    pub default_frozen: bool,
    /// Short display name for one unit.
    pub unit_name: String,
}

/// Full account state.
///
/// The state subsystem treats this mostly as an opaque record keyed by
/// address; only the balance, asset holdings, and created-asset parameters
/// are projected out, for the contract execution ledger.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AccountData {
    /// Spendable balance in base units.
    balance: u64,
    /// Rewards level already applied to this balance.
    rewards_base: u64,
    /// Holdings of assets this account has opted in to.
    assets: BTreeMap<AssetId, AssetHolding>,
    /// Parameters of assets this account created.
    asset_params: BTreeMap<AssetId, AssetParams>,
}

impl AccountData {
    /// Creates account state with the given balance and no assets.
    pub fn new(balance: u64) -> Self {
        Self {
            balance,
            ..Self::default()
        }
    }

    /// Returns the account's spendable balance.
    pub fn balance(&self) -> u64 {
        self.balance
    }

    /// Returns the rewards level already applied to this balance.
    pub fn rewards_base(&self) -> u64 {
        self.rewards_base
    }

    /// Returns the holding for an asset, if the account has opted in to it.
    pub fn asset_holding(&self, asset: AssetId) -> Option<&AssetHolding> {
        self.assets.get(&asset)
    }

    /// Returns the parameters of an asset, if this account created it.
    pub fn created_asset_params(&self, asset: AssetId) -> Option<&AssetParams> {
        self.asset_params.get(&asset)
    }

    /// Adds or replaces an asset holding. Builder-style, used when seeding state.
    pub fn with_asset(mut self, asset: AssetId, holding: AssetHolding) -> Self {
        self.assets.insert(asset, holding);
        self
    }

    /// Adds or replaces created-asset parameters. Builder-style, used when seeding state.
    pub fn with_created_asset(mut self, asset: AssetId, params: AssetParams) -> Self {
        self.asset_params.insert(asset, params);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_has_balance_and_no_assets() {
        let account = AccountData::new(1_000_000);
        assert_eq!(account.balance(), 1_000_000);
        assert_eq!(account.asset_holding(AssetId(1)), None);
        assert_eq!(account.created_asset_params(AssetId(1)), None);
    }

    #[test]
    fn with_asset_records_holding() {
        let holding = AssetHolding {
            amount: 50,
            frozen: false,
        };
        let account = AccountData::new(10).with_asset(AssetId(3), holding);
        assert_eq!(account.asset_holding(AssetId(3)), Some(&holding));
        assert_eq!(account.asset_holding(AssetId(4)), None);
    }

    #[test]
    fn with_created_asset_records_params() {
        let params = AssetParams {
            total: 1000,
            decimals: 2,
            default_frozen: false,
            unit_name: "COIN".to_string(),
        };
        let account = AccountData::new(0).with_created_asset(AssetId(7), params.clone());
        assert_eq!(account.created_asset_params(AssetId(7)), Some(&params));
    }
}
