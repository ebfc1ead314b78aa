// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// STAKEGUARD - WATCHDOG NODE
//
// Keeps DPOS validators that still hold commission rewards from sitting at
// zero stake:
// - Startup sweep over the paginated validator directory
// - Event reactor on the contract's Undelegated events
// - Remediation by delegating a fixed minimal stake
// Chain access goes through a single LedgerGateway capability object.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub mod actuator;
pub mod context;
pub mod directory;
pub mod evm_gateway;
pub mod ledger;
#[cfg(any(test, feature = "test-util"))]
pub mod mock_ledger;
pub mod reactor;
pub mod sweep;

pub use context::GuardContext;
pub use evm_gateway::EvmLedger;
pub use ledger::{
    Confirmation, LedgerGateway, SharedLedger, UndelegatedEvent, UndelegationStream,
    ValidatorPage,
};
#[cfg(any(test, feature = "test-util"))]
pub use mock_ledger::MockLedger;
pub use reactor::{EventOutcome, EventReactor, ReactorState};
pub use sweep::{run_startup_sweep, SweepReport};
