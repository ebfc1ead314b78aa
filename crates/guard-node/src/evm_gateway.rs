//! JSON-RPC ledger gateway for the DPOS precompile, built on alloy.
//!
//! Reads go through `eth_call`, `delegate` is signed locally with the
//! configured key and broadcast with `eth_sendRawTransaction`, and the
//! `Undelegated` stream is a polled log filter (works over plain HTTP
//! endpoints, no websocket needed).

use crate::ledger::{
    Confirmation, LedgerGateway, UndelegatedEvent, UndelegationStream, ValidatorPage,
    EVENT_CHANNEL_CAPACITY,
};
use alloy::network::{EthereumWallet, ReceiptResponse};
use alloy::providers::{
    DynProvider, PendingTransactionBuilder, PendingTransactionError, Provider, ProviderBuilder,
    WatchTxError,
};
use alloy::rpc::types::Filter;
use alloy::signers::local::PrivateKeySigner;
use alloy::sol;
use alloy::sol_types::SolEvent;
use async_trait::async_trait;
use futures::StreamExt;
use guard_core::{
    Address, GuardConfig, GuardError, LedgerError, ValidatorEntry, ValidatorInfo, B256, U256,
};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

// DPOS contract, restricted to the calls the watchdog makes
sol! {
    #[allow(missing_docs)]
    #[sol(rpc)]
    interface IDposContract {
        struct ValidatorBasicInfo {
            uint256 total_stake;
            uint256 commission_reward;
            uint16 commission;
            uint64 last_commission_change;
            uint16 undelegations_count;
            address owner;
            string description;
            string endpoint;
        }

        struct ValidatorData {
            address account;
            ValidatorBasicInfo info;
        }

        event Undelegated(address indexed delegator, address indexed validator, uint256 amount);

        function delegate(address validator) external payable;

        function getValidator(address validator) external view returns (ValidatorBasicInfo memory info);

        function getValidators(uint32 batch) external view returns (ValidatorData[] memory validators, bool end);
    }
}

impl From<IDposContract::ValidatorBasicInfo> for ValidatorInfo {
    fn from(raw: IDposContract::ValidatorBasicInfo) -> Self {
        Self {
            total_stake: raw.total_stake,
            commission_reward: raw.commission_reward,
            commission: raw.commission,
            last_commission_change: raw.last_commission_change,
            undelegations_count: raw.undelegations_count,
            owner: raw.owner,
            description: raw.description,
            endpoint: raw.endpoint,
        }
    }
}

fn read_error(err: alloy::contract::Error) -> LedgerError {
    match err {
        alloy::contract::Error::AbiError(e) => LedgerError::Decode(e.to_string()),
        e @ alloy::contract::Error::ZeroData(..) => LedgerError::Decode(e.to_string()),
        other => LedgerError::Transport(other.to_string()),
    }
}

pub struct EvmLedger {
    provider: DynProvider,
    contract: IDposContract::IDposContractInstance<DynProvider>,
    contract_address: Address,
    signer_address: Option<Address>,
    confirmations: u64,
    confirmation_timeout: Option<Duration>,
    poll_interval: Duration,
}

impl EvmLedger {
    /// Build the gateway. Without a signing key the gateway is read-only and
    /// every `submit_delegation` is rejected.
    pub fn connect(config: &GuardConfig, private_key: Option<&str>) -> Result<Self, GuardError> {
        let rpc_url = config
            .rpc_url
            .trim()
            .parse()
            .map_err(|e| GuardError::Config(format!("invalid RPC URL: {}", e)))?;
        let contract_address = config.contract()?;

        let (provider, signer_address) = match private_key {
            Some(key) => {
                let signer: PrivateKeySigner = key
                    .trim()
                    .parse()
                    .map_err(|e| GuardError::Config(format!("invalid private key: {}", e)))?;
                let signer_address = signer.address();
                let wallet = EthereumWallet::from(signer);
                let provider = ProviderBuilder::new()
                    .wallet(wallet)
                    .connect_http(rpc_url)
                    .erased();
                (provider, Some(signer_address))
            }
            None => (ProviderBuilder::new().connect_http(rpc_url).erased(), None),
        };

        let contract = IDposContract::new(contract_address, provider.clone());

        Ok(Self {
            provider,
            contract,
            contract_address,
            signer_address,
            confirmations: config.confirmations,
            confirmation_timeout: config.confirmation_timeout(),
            poll_interval: config.event_poll_interval(),
        })
    }

    /// Account that funds remediations, if a key was supplied.
    pub fn signer_address(&self) -> Option<Address> {
        self.signer_address
    }

    /// Native balance of the funding account.
    pub async fn signer_balance(&self) -> Result<Option<U256>, LedgerError> {
        match self.signer_address {
            Some(addr) => self
                .provider
                .get_balance(addr)
                .await
                .map(Some)
                .map_err(|e| LedgerError::Transport(e.to_string())),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl LedgerGateway for EvmLedger {
    async fn validators_page(&self, cursor: u32) -> Result<ValidatorPage, LedgerError> {
        let ret = self
            .contract
            .getValidators(cursor)
            .call()
            .await
            .map_err(read_error)?;

        let entries = ret
            .validators
            .into_iter()
            .map(|v| ValidatorEntry {
                account: v.account,
                info: v.info.into(),
            })
            .collect();

        Ok(ValidatorPage {
            entries,
            is_last_page: ret.end,
        })
    }

    async fn validator(&self, address: Address) -> Result<ValidatorInfo, LedgerError> {
        let info = self
            .contract
            .getValidator(address)
            .call()
            .await
            .map_err(read_error)?;
        Ok(info.into())
    }

    async fn submit_delegation(
        &self,
        validator: Address,
        amount: U256,
    ) -> Result<B256, LedgerError> {
        if self.signer_address.is_none() {
            return Err(LedgerError::Rejected(
                "no signing key configured".to_string(),
            ));
        }

        let pending = self
            .contract
            .delegate(validator)
            .value(amount)
            .send()
            .await
            .map_err(|e| LedgerError::Rejected(e.to_string()))?;

        Ok(*pending.tx_hash())
    }

    async fn await_confirmation(&self, tx_hash: B256) -> Result<Confirmation, LedgerError> {
        let receipt = PendingTransactionBuilder::new(self.provider.root().clone(), tx_hash)
            .with_required_confirmations(self.confirmations)
            .with_timeout(self.confirmation_timeout)
            .get_receipt()
            .await
            .map_err(|e| match e {
                PendingTransactionError::TxWatcher(WatchTxError::Timeout) => {
                    LedgerError::Timeout { tx_hash }
                }
                other => LedgerError::Transport(other.to_string()),
            })?;

        if !receipt.status() {
            return Err(LedgerError::Reverted { tx_hash });
        }

        Ok(Confirmation {
            tx_hash,
            block_number: receipt.block_number,
        })
    }

    async fn subscribe_undelegations(&self) -> Result<UndelegationStream, LedgerError> {
        let filter = Filter::new()
            .address(self.contract_address)
            .event_signature(IDposContract::Undelegated::SIGNATURE_HASH);

        let poller = self
            .provider
            .watch_logs(&filter)
            .await
            .map_err(|e| LedgerError::Subscription(e.to_string()))?;
        let mut logs = poller.with_poll_interval(self.poll_interval).into_stream();

        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        tokio::spawn(async move {
            while let Some(batch) = logs.next().await {
                for log in batch {
                    let decoded = match log.log_decode::<IDposContract::Undelegated>() {
                        Ok(decoded) => decoded.inner.data,
                        Err(e) => {
                            warn!("Skipping undecodable Undelegated log: {}", e);
                            continue;
                        }
                    };
                    let event = UndelegatedEvent {
                        delegator: decoded.delegator,
                        validator: decoded.validator,
                        amount: decoded.amount,
                    };
                    if tx.send(event).await.is_err() {
                        debug!("Undelegated receiver dropped, stopping log poller");
                        return;
                    }
                }
            }
            warn!("Undelegated log filter stream ended");
        });

        Ok(rx)
    }
}
