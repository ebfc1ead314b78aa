use crate::record::ValidatorRecord;

/// A validator is stranded when it has earned commission (so it was active
/// at some point) but currently holds no stake at all.
///
/// Evaluated on a fresh record every time: stake and reward move between
/// reads, and a stale verdict means either a missed or a duplicate delegation.
pub fn needs_remediation(record: &ValidatorRecord) -> bool {
    record.total_stake.is_zero() && !record.commission_reward.is_zero()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::ValidatorInfo;
    use alloy_primitives::{Address, U256};

    fn record(stake: u64, reward: u64) -> ValidatorRecord {
        ValidatorRecord::decode(
            Address::repeat_byte(0x33),
            ValidatorInfo {
                total_stake: U256::from(stake),
                commission_reward: U256::from(reward),
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_zero_stake_with_reward_is_stranded() {
        assert!(needs_remediation(&record(0, 5)));
    }

    #[test]
    fn test_zero_stake_without_reward_is_ignored() {
        // never earned anything: a fresh or abandoned registration
        assert!(!needs_remediation(&record(0, 0)));
    }

    #[test]
    fn test_staked_validator_is_ignored() {
        assert!(!needs_remediation(&record(10, 0)));
        assert!(!needs_remediation(&record(50, 7)));
    }

    #[test]
    fn test_one_wei_of_stake_is_enough() {
        assert!(!needs_remediation(&record(1, 1_000)));
    }
}
