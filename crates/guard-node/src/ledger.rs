//! Ledger gateway capability.
//!
//! Everything the watchdog needs from the chain goes through
//! [`LedgerGateway`]: two contract reads, a payable `delegate` call with its
//! receipt wait, and the `Undelegated` event stream. One instance is built at
//! startup and shared (as [`SharedLedger`]) by the sweep and every event
//! handler; there is no other connection or signer in the process.

use async_trait::async_trait;
use guard_core::{Address, LedgerError, ValidatorEntry, ValidatorInfo, B256, U256};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Buffered undelegation events between the gateway and the reactor.
pub const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// One `getValidators(cursor)` response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorPage {
    pub entries: Vec<ValidatorEntry>,
    pub is_last_page: bool,
}

/// Receipt summary for a confirmed delegation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    pub tx_hash: B256,
    pub block_number: Option<u64>,
}

/// `Undelegated(delegator, validator, amount)` as emitted by the contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UndelegatedEvent {
    pub delegator: Address,
    pub validator: Address,
    pub amount: U256,
}

pub type UndelegationStream = mpsc::Receiver<UndelegatedEvent>;

pub type SharedLedger = Arc<dyn LedgerGateway>;

/// Chain access used by the watchdog.
///
/// Implementations must not retry on their own beyond what the underlying
/// client does, and must report a timed-out receipt wait as
/// [`LedgerError::Timeout`] and a failed receipt as [`LedgerError::Reverted`].
#[async_trait]
pub trait LedgerGateway: Send + Sync {
    /// `getValidators(cursor)`: one page of the validator set.
    async fn validators_page(&self, cursor: u32) -> Result<ValidatorPage, LedgerError>;

    /// `getValidator(address)`: a single validator's info.
    async fn validator(&self, address: Address) -> Result<ValidatorInfo, LedgerError>;

    /// Sign and broadcast `delegate(validator)` carrying `amount` wei.
    /// Returns the transaction hash as the pending handle.
    async fn submit_delegation(&self, validator: Address, amount: U256)
        -> Result<B256, LedgerError>;

    /// Block until `tx_hash` is included with the configured confirmations.
    async fn await_confirmation(&self, tx_hash: B256) -> Result<Confirmation, LedgerError>;

    /// Start delivering `Undelegated` events. Events are delivered for the
    /// rest of the process lifetime; the stream only ends if the gateway
    /// loses the subscription.
    async fn subscribe_undelegations(&self) -> Result<UndelegationStream, LedgerError>;
}
