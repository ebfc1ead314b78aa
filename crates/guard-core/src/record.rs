//! Validator records as returned by the DPOS contract, and their
//! normalized form used by the watchdog.

use crate::MAX_COMMISSION_BPS;
use alloy_primitives::{Address, U256};

/// Contract-side validator info tuple, fields in ABI order:
///
/// | idx | field                  | ABI type  |
/// |-----|------------------------|-----------|
/// | 0   | total_stake            | uint256   |
/// | 1   | commission_reward      | uint256   |
/// | 2   | commission             | uint16    |
/// | 3   | last_commission_change | uint64    |
/// | 4   | undelegations_count    | uint16    |
/// | 5   | owner                  | address   |
/// | 6   | description            | string    |
/// | 7   | endpoint               | string    |
///
/// Gateways fill this struct once; nothing downstream indexes by position.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidatorInfo {
    pub total_stake: U256,
    pub commission_reward: U256,
    pub commission: u16,
    pub last_commission_change: u64,
    pub undelegations_count: u16,
    pub owner: Address,
    pub description: String,
    pub endpoint: String,
}

/// One element of a `getValidators` page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorEntry {
    pub account: Address,
    pub info: ValidatorInfo,
}

/// Snapshot of a validator, rebuilt on every read and never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorRecord {
    pub address: Address,
    /// Tokens currently delegated (own + delegators'), in wei
    pub total_stake: U256,
    /// Commission accrued to the owner but not yet claimed, in wei
    pub commission_reward: U256,
    /// Basis points as reported; see [`ValidatorRecord::commission_in_range`]
    pub commission_rate: u16,
    pub last_commission_change_block: u64,
    pub pending_undelegations_count: u16,
    pub owner: Address,
    pub description: String,
    pub endpoint: String,
}

impl ValidatorRecord {
    /// Normalize a contract info tuple for `address`.
    ///
    /// Values are carried as reported. An out-of-range commission does not
    /// stop the record from being evaluated, since the stranded check only
    /// reads stake and reward.
    pub fn decode(address: Address, info: ValidatorInfo) -> Self {
        Self {
            address,
            total_stake: info.total_stake,
            commission_reward: info.commission_reward,
            commission_rate: info.commission,
            last_commission_change_block: info.last_commission_change,
            pending_undelegations_count: info.undelegations_count,
            owner: info.owner,
            description: info.description,
            endpoint: info.endpoint,
        }
    }

    pub fn commission_in_range(&self) -> bool {
        self.commission_rate <= MAX_COMMISSION_BPS
    }

    /// Commission as a percentage string, e.g. `12.50%`.
    pub fn commission_percent(&self) -> String {
        format!(
            "{}.{:02}%",
            self.commission_rate / 100,
            self.commission_rate % 100
        )
    }
}

impl From<ValidatorEntry> for ValidatorRecord {
    fn from(entry: ValidatorEntry) -> Self {
        Self::decode(entry.account, entry.info)
    }
}
