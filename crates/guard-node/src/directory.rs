//! Validator directory: full paginated listing and single lookups.

use crate::ledger::LedgerGateway;
use guard_core::{Address, GuardError, ValidatorRecord};
use tracing::{debug, warn};

/// Walk `getValidators` from cursor 0 until the contract flags the last page.
///
/// Pages are concatenated in cursor order. At most `max_pages` calls are made;
/// if none of them is flagged final the listing fails with
/// [`GuardError::DirectoryExhausted`]. Any read failure aborts the whole
/// listing, there is no partial result. A record with an out-of-range
/// commission is logged and kept.
pub async fn list_all_validators(
    ledger: &dyn LedgerGateway,
    max_pages: u32,
) -> Result<Vec<ValidatorRecord>, GuardError> {
    let mut records = Vec::new();

    for cursor in 0..max_pages {
        let page = ledger
            .validators_page(cursor)
            .await
            .map_err(GuardError::DirectoryRead)?;

        debug!(
            "Directory page {}: {} validator(s), last={}",
            cursor,
            page.entries.len(),
            page.is_last_page
        );

        for entry in page.entries {
            let record = ValidatorRecord::from(entry);
            if !record.commission_in_range() {
                warn!(
                    "Validator {} reports commission {} bps, above the 10000 bps maximum",
                    record.address, record.commission_rate
                );
            }
            records.push(record);
        }

        if page.is_last_page {
            return Ok(records);
        }
    }

    Err(GuardError::DirectoryExhausted { pages: max_pages })
}

/// Fresh record for one validator.
pub async fn get_validator(
    ledger: &dyn LedgerGateway,
    address: Address,
) -> Result<ValidatorRecord, GuardError> {
    let info = ledger
        .validator(address)
        .await
        .map_err(GuardError::DirectoryRead)?;
    Ok(ValidatorRecord::decode(address, info))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock_ledger::{entry, info, page, MockLedger};
    use guard_core::{LedgerError, U256};

    #[tokio::test]
    async fn test_two_pages_concatenated_in_order() {
        let v1 = Address::repeat_byte(1);
        let v2 = Address::repeat_byte(2);
        let v3 = Address::repeat_byte(3);
        let mock = MockLedger::new().with_pages(vec![
            page(vec![entry(v1, 0, 5), entry(v2, 1, 1)], false),
            page(vec![entry(v3, 10, 0)], true),
        ]);

        let records = list_all_validators(&mock, 100).await.unwrap();

        let addresses: Vec<Address> = records.iter().map(|r| r.address).collect();
        assert_eq!(addresses, vec![v1, v2, v3]);
        assert_eq!(mock.page_calls(), 2);
    }

    #[tokio::test]
    async fn test_single_final_page() {
        let mock = MockLedger::new().with_pages(vec![page(vec![], true)]);
        let records = list_all_validators(&mock, 100).await.unwrap();
        assert!(records.is_empty());
        assert_eq!(mock.page_calls(), 1);
    }

    #[tokio::test]
    async fn test_never_ending_directory_is_bounded() {
        let mock = MockLedger::new().endless_directory();
        let err = list_all_validators(&mock, 7).await.unwrap_err();
        assert_eq!(err, GuardError::DirectoryExhausted { pages: 7 });
        assert_eq!(mock.page_calls(), 7);
    }

    #[tokio::test]
    async fn test_last_page_exactly_at_bound() {
        let mock = MockLedger::new().with_pages(vec![
            page(vec![entry(Address::repeat_byte(1), 0, 0)], false),
            page(vec![entry(Address::repeat_byte(2), 0, 0)], true),
        ]);
        let records = list_all_validators(&mock, 2).await.unwrap();
        assert_eq!(records.len(), 2);
    }

    #[tokio::test]
    async fn test_read_failure_aborts_listing() {
        // page 1 is missing from the script, so the mock fails that read
        let mock = MockLedger::new().with_pages(vec![page(
            vec![entry(Address::repeat_byte(1), 0, 5)],
            false,
        )]);
        let err = list_all_validators(&mock, 10).await.unwrap_err();
        assert!(matches!(
            err,
            GuardError::DirectoryRead(LedgerError::Transport(_))
        ));
    }

    #[tokio::test]
    async fn test_out_of_range_commission_does_not_abort_listing() {
        let mut odd = entry(Address::repeat_byte(1), 0, 5);
        odd.info.commission = 20_000;
        let healthy = entry(Address::repeat_byte(2), 10, 0);
        let mock = MockLedger::new().with_pages(vec![page(vec![odd, healthy], true)]);

        let records = list_all_validators(&mock, 10).await.unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].commission_rate, 20_000);
        assert!(!records[0].commission_in_range());
    }

    #[tokio::test]
    async fn test_get_validator_reads_fresh_state() {
        let v = Address::repeat_byte(4);
        let mock = MockLedger::new().with_validator(v, info(0, 7));

        let before = get_validator(&mock, v).await.unwrap();
        assert_eq!(before.total_stake, U256::ZERO);

        mock.set_validator(v, info(50, 7));
        let after = get_validator(&mock, v).await.unwrap();
        assert_eq!(after.total_stake, U256::from(50u64));
        assert_eq!(mock.lookups(), 2);
    }
}
