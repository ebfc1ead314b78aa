use crate::ledger::SharedLedger;
use guard_core::{GuardConfig, U256};

/// Everything the sweep and the event handlers need, built once at startup.
///
/// Cloning is cheap: the ledger is behind an `Arc`, so every clone shares the
/// same connection and signing identity.
#[derive(Clone)]
pub struct GuardContext {
    pub ledger: SharedLedger,
    pub delegation_amount: U256,
    pub max_directory_pages: u32,
    /// Evaluate and log, but never submit a delegation
    pub dry_run: bool,
}

impl GuardContext {
    pub fn new(ledger: SharedLedger, config: &GuardConfig) -> Self {
        Self {
            ledger,
            delegation_amount: config.delegation_amount(),
            max_directory_pages: config.max_directory_pages,
            dry_run: false,
        }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}
