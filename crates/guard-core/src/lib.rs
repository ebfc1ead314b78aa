// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// STAKEGUARD - CORE MODULE
//
// Shared primitives for the delegation watchdog:
// - ValidatorRecord and its contract-side wire form
// - The stranded-validator predicate
// - Error taxonomy for directory reads and remediation
// - GuardConfig (TOML file / environment)
// All token arithmetic uses U256 wei units (no floating-point).
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub mod eligibility;
pub mod error;
pub mod guard_config;
pub mod record;

pub use alloy_primitives::{Address, B256, U256};
pub use eligibility::needs_remediation;
pub use error::{GuardError, LedgerError};
pub use guard_config::GuardConfig;
pub use record::{ValidatorEntry, ValidatorInfo, ValidatorRecord};

/// 1 token = 10^18 wei
pub const WEI_PER_TOKEN: u128 = 1_000_000_000_000_000_000;
/// Whole tokens injected into a stranded validator.
pub const DEFAULT_DELEGATION_TOKENS: u128 = 1_000;
/// Default remediation amount in wei (1000 tokens).
pub const DEFAULT_DELEGATION_WEI: u128 = DEFAULT_DELEGATION_TOKENS * WEI_PER_TOKEN;

/// Commission is expressed in basis points, max 10000 (precision 0.01%).
pub const MAX_COMMISSION_BPS: u16 = 10_000;

/// Upper bound on `getValidators` pages fetched in one sweep.
/// The contract signals the final page itself; this only stops a runaway loop.
pub const DEFAULT_MAX_DIRECTORY_PAGES: u32 = 10_000;

pub const DEFAULT_RPC_URL: &str = "https://rpc.mainnet.taraxa.io/";
/// DPOS precompile address on the mainnet.
pub const DEFAULT_CONTRACT_ADDRESS: &str = "0x00000000000000000000000000000000000000fe";

pub const DEFAULT_CONFIRMATIONS: u64 = 1;
pub const DEFAULT_EVENT_POLL_INTERVAL_MS: u64 = 2_000;

/// Render a wei amount as whole tokens with 18 fractional digits.
pub fn format_token_amount(wei: U256) -> String {
    let unit = U256::from(WEI_PER_TOKEN);
    let whole = wei / unit;
    let fractional = u128::try_from(wei % unit).unwrap_or_default();
    format!("{}.{:018}", whole, fractional)
}
