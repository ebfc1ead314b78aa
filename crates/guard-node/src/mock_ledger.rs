//! Scripted in-memory ledger for tests. Compiled for this crate's own tests
//! and, through the `test-util` feature, for downstream test suites.
//!
//! Pages are served by cursor, single lookups come from a validator map, and
//! every submitted delegation is recorded. A successful delegation also bumps
//! the target's `total_stake`, so a follow-up lookup sees the new stake just
//! as a real node would.
//!
//! Uses `std::sync::Mutex` for interior mutability; a poisoned lock is
//! reported as [`LedgerError::Transport`] rather than a panic.

use crate::ledger::{
    Confirmation, LedgerGateway, UndelegatedEvent, UndelegationStream, ValidatorPage,
    EVENT_CHANNEL_CAPACITY,
};
use async_trait::async_trait;
use guard_core::{Address, LedgerError, ValidatorEntry, ValidatorInfo, B256, U256};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, Notify};

fn poisoned<T>(e: std::sync::PoisonError<T>) -> LedgerError {
    LedgerError::Transport(format!("mutex poisoned: {}", e))
}

pub struct MockLedger {
    pages: Mutex<Vec<ValidatorPage>>,
    /// Serve a non-final empty page for every cursor past the script
    endless: bool,
    validators: Mutex<HashMap<Address, ValidatorInfo>>,
    rejected: Mutex<HashSet<Address>>,
    reverted: Mutex<HashSet<Address>>,
    unconfirmed: Mutex<HashSet<Address>>,
    delegations: Mutex<Vec<(Address, U256)>>,
    pending: Mutex<HashMap<B256, Address>>,
    /// Confirmation waits for these validators block until notified
    gates: Mutex<HashMap<Address, Arc<Notify>>>,
    confirmed: Mutex<Vec<Address>>,
    page_calls: AtomicU32,
    lookups: AtomicU32,
    tx_counter: AtomicU64,
    event_tx: Mutex<Option<mpsc::Sender<UndelegatedEvent>>>,
    event_rx: Mutex<Option<mpsc::Receiver<UndelegatedEvent>>>,
}

impl MockLedger {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            pages: Mutex::new(Vec::new()),
            endless: false,
            validators: Mutex::new(HashMap::new()),
            rejected: Mutex::new(HashSet::new()),
            reverted: Mutex::new(HashSet::new()),
            unconfirmed: Mutex::new(HashSet::new()),
            delegations: Mutex::new(Vec::new()),
            pending: Mutex::new(HashMap::new()),
            gates: Mutex::new(HashMap::new()),
            confirmed: Mutex::new(Vec::new()),
            page_calls: AtomicU32::new(0),
            lookups: AtomicU32::new(0),
            tx_counter: AtomicU64::new(0),
            event_tx: Mutex::new(Some(tx)),
            event_rx: Mutex::new(Some(rx)),
        }
    }

    /// Script the directory. Each page's entries also become available to
    /// single-validator lookups.
    pub fn with_pages(self, pages: Vec<ValidatorPage>) -> Self {
        if let Ok(mut validators) = self.validators.lock() {
            for entry in pages.iter().flat_map(|p| p.entries.iter()) {
                validators.insert(entry.account, entry.info.clone());
            }
        }
        if let Ok(mut slot) = self.pages.lock() {
            *slot = pages;
        }
        self
    }

    /// Directory that never reports a last page.
    pub fn endless_directory(mut self) -> Self {
        self.endless = true;
        self
    }

    pub fn with_validator(self, address: Address, info: ValidatorInfo) -> Self {
        self.set_validator(address, info);
        self
    }

    /// Refuse every delegation to `address` at submission.
    pub fn reject_delegations_to(self, address: Address) -> Self {
        if let Ok(mut set) = self.rejected.lock() {
            set.insert(address);
        }
        self
    }

    /// Accept delegations to `address`, then report the receipt as reverted.
    pub fn revert_delegations_to(self, address: Address) -> Self {
        if let Ok(mut set) = self.reverted.lock() {
            set.insert(address);
        }
        self
    }

    /// Accept delegations to `address`, then time out on the receipt.
    pub fn time_out_delegations_to(self, address: Address) -> Self {
        if let Ok(mut set) = self.unconfirmed.lock() {
            set.insert(address);
        }
        self
    }

    /// Hold every confirmation wait for `address` until `gate` is notified.
    pub fn gate_confirmations_for(self, address: Address, gate: Arc<Notify>) -> Self {
        if let Ok(mut gates) = self.gates.lock() {
            gates.insert(address, gate);
        }
        self
    }

    pub fn set_validator(&self, address: Address, info: ValidatorInfo) {
        if let Ok(mut validators) = self.validators.lock() {
            validators.insert(address, info);
        }
    }

    /// Current stored info for `address`.
    pub fn validator_info(&self, address: Address) -> Option<ValidatorInfo> {
        self.validators
            .lock()
            .ok()
            .and_then(|v| v.get(&address).cloned())
    }

    /// Push an `Undelegated` event to the subscriber.
    pub async fn emit(&self, event: UndelegatedEvent) -> bool {
        let sender = match self.event_tx.lock() {
            Ok(slot) => slot.clone(),
            Err(_) => None,
        };
        match sender {
            Some(tx) => tx.send(event).await.is_ok(),
            None => false,
        }
    }

    /// Drop the event source; the subscriber sees the stream end after
    /// draining whatever was already emitted.
    pub fn close_events(&self) {
        if let Ok(mut slot) = self.event_tx.lock() {
            slot.take();
        }
    }

    /// Delegations accepted at submission, in order.
    pub fn delegations(&self) -> Vec<(Address, U256)> {
        self.delegations
            .lock()
            .map(|d| d.clone())
            .unwrap_or_default()
    }

    /// Validators whose delegation confirmed, in completion order.
    pub fn confirmed(&self) -> Vec<Address> {
        self.confirmed
            .lock()
            .map(|c| c.clone())
            .unwrap_or_default()
    }

    pub fn delegation_count_for(&self, address: Address) -> usize {
        self.delegations()
            .iter()
            .filter(|(target, _)| *target == address)
            .count()
    }

    pub fn page_calls(&self) -> u32 {
        self.page_calls.load(Ordering::SeqCst)
    }

    pub fn lookups(&self) -> u32 {
        self.lookups.load(Ordering::SeqCst)
    }

    fn next_tx_hash(&self) -> B256 {
        let n = self.tx_counter.fetch_add(1, Ordering::SeqCst) + 1;
        B256::left_padding_from(&n.to_be_bytes())
    }
}

impl Default for MockLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerGateway for MockLedger {
    async fn validators_page(&self, cursor: u32) -> Result<ValidatorPage, LedgerError> {
        self.page_calls.fetch_add(1, Ordering::SeqCst);
        let pages = self.pages.lock().map_err(poisoned)?;

        if let Some(page) = pages.get(cursor as usize) {
            return Ok(page.clone());
        }
        if self.endless {
            return Ok(ValidatorPage {
                entries: Vec::new(),
                is_last_page: false,
            });
        }
        Err(LedgerError::Transport(format!(
            "no scripted page for cursor {}",
            cursor
        )))
    }

    async fn validator(&self, address: Address) -> Result<ValidatorInfo, LedgerError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        let validators = self.validators.lock().map_err(poisoned)?;
        // The contract answers unknown addresses with a zeroed tuple.
        Ok(validators.get(&address).cloned().unwrap_or_default())
    }

    async fn submit_delegation(
        &self,
        validator: Address,
        amount: U256,
    ) -> Result<B256, LedgerError> {
        if self.rejected.lock().map_err(poisoned)?.contains(&validator) {
            return Err(LedgerError::Rejected(
                "insufficient funds for gas * price + value".to_string(),
            ));
        }

        let tx_hash = self.next_tx_hash();
        self.delegations
            .lock()
            .map_err(poisoned)?
            .push((validator, amount));
        self.pending.lock().map_err(poisoned)?.insert(tx_hash, validator);

        let mut validators = self.validators.lock().map_err(poisoned)?;
        let info = validators.entry(validator).or_default();
        info.total_stake = info.total_stake.saturating_add(amount);

        Ok(tx_hash)
    }

    async fn await_confirmation(&self, tx_hash: B256) -> Result<Confirmation, LedgerError> {
        let validator = self
            .pending
            .lock()
            .map_err(poisoned)?
            .remove(&tx_hash)
            .ok_or_else(|| LedgerError::Transport(format!("unknown transaction {}", tx_hash)))?;

        let gate = self.gates.lock().map_err(poisoned)?.get(&validator).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        if self.reverted.lock().map_err(poisoned)?.contains(&validator) {
            return Err(LedgerError::Reverted { tx_hash });
        }
        if self.unconfirmed.lock().map_err(poisoned)?.contains(&validator) {
            return Err(LedgerError::Timeout { tx_hash });
        }

        self.confirmed.lock().map_err(poisoned)?.push(validator);
        Ok(Confirmation {
            tx_hash,
            block_number: Some(1_000 + self.tx_counter.load(Ordering::SeqCst)),
        })
    }

    async fn subscribe_undelegations(&self) -> Result<UndelegationStream, LedgerError> {
        self.event_rx
            .lock()
            .map_err(poisoned)?
            .take()
            .ok_or_else(|| LedgerError::Subscription("already subscribed".to_string()))
    }
}

/// Page helper for scripted directories.
pub fn page(entries: Vec<ValidatorEntry>, is_last_page: bool) -> ValidatorPage {
    ValidatorPage {
        entries,
        is_last_page,
    }
}

/// Validator entry with the given stake and commission reward (in wei).
pub fn entry(account: Address, total_stake: u64, commission_reward: u64) -> ValidatorEntry {
    ValidatorEntry {
        account,
        info: info(total_stake, commission_reward),
    }
}

pub fn info(total_stake: u64, commission_reward: u64) -> ValidatorInfo {
    ValidatorInfo {
        total_stake: U256::from(total_stake),
        commission_reward: U256::from(commission_reward),
        commission: 1_000,
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pages_served_by_cursor() {
        let a = Address::repeat_byte(1);
        let b = Address::repeat_byte(2);
        let mock = MockLedger::new().with_pages(vec![
            page(vec![entry(a, 0, 5)], false),
            page(vec![entry(b, 10, 0)], true),
        ]);

        let p0 = mock.validators_page(0).await.unwrap();
        assert_eq!(p0.entries[0].account, a);
        assert!(!p0.is_last_page);
        assert!(mock.validators_page(1).await.unwrap().is_last_page);
        assert!(mock.validators_page(2).await.is_err());
        assert_eq!(mock.page_calls(), 3);
    }

    #[tokio::test]
    async fn test_usable_as_shared_ledger() {
        let mock = Arc::new(MockLedger::new().with_validator(Address::repeat_byte(1), info(0, 5)));
        let shared: crate::ledger::SharedLedger = mock.clone();
        let worker = tokio::spawn(async move { shared.validator(Address::repeat_byte(1)).await });
        assert_eq!(worker.await.unwrap().unwrap().commission_reward, U256::from(5u64));
        assert_eq!(mock.lookups(), 1);
    }

    #[tokio::test]
    async fn test_gated_confirmation_waits_for_notify() {
        let a = Address::repeat_byte(1);
        let gate = Arc::new(Notify::new());
        let mock = MockLedger::new().gate_confirmations_for(a, gate.clone());

        let tx = mock.submit_delegation(a, U256::from(1u64)).await.unwrap();
        let wait = mock.await_confirmation(tx);
        tokio::pin!(wait);

        let early = tokio::time::timeout(std::time::Duration::from_millis(20), &mut wait).await;
        assert!(early.is_err());
        assert!(mock.confirmed().is_empty());

        gate.notify_one();
        wait.await.unwrap();
        assert_eq!(mock.confirmed(), vec![a]);
    }

    #[tokio::test]
    async fn test_delegation_bumps_stake() {
        let a = Address::repeat_byte(1);
        let mock = MockLedger::new().with_validator(a, info(0, 5));

        let tx = mock.submit_delegation(a, U256::from(100u64)).await.unwrap();
        let confirmation = mock.await_confirmation(tx).await.unwrap();

        assert_eq!(confirmation.tx_hash, tx);
        assert_eq!(mock.validator(a).await.unwrap().total_stake, U256::from(100u64));
        assert_eq!(mock.delegation_count_for(a), 1);
    }

    #[tokio::test]
    async fn test_rejected_delegation_not_recorded() {
        let a = Address::repeat_byte(1);
        let mock = MockLedger::new().reject_delegations_to(a);

        let err = mock.submit_delegation(a, U256::from(1u64)).await.unwrap_err();
        assert!(matches!(err, LedgerError::Rejected(_)));
        assert!(mock.delegations().is_empty());
    }

    #[tokio::test]
    async fn test_second_subscription_refused() {
        let mock = MockLedger::new();
        assert!(mock.subscribe_undelegations().await.is_ok());
        assert!(matches!(
            mock.subscribe_undelegations().await,
            Err(LedgerError::Subscription(_))
        ));
    }

    #[tokio::test]
    async fn test_close_events_ends_stream_after_drain() {
        let mock = MockLedger::new();
        let mut stream = mock.subscribe_undelegations().await.unwrap();
        let event = UndelegatedEvent {
            delegator: Address::repeat_byte(9),
            validator: Address::repeat_byte(1),
            amount: U256::from(3u64),
        };

        assert!(mock.emit(event).await);
        mock.close_events();

        assert_eq!(stream.recv().await, Some(event));
        assert_eq!(stream.recv().await, None);
    }
}
