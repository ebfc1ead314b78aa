//! Startup sweep: one pass over the full validator set.

use crate::actuator;
use crate::context::GuardContext;
use crate::directory;
use guard_core::{needs_remediation, Address, GuardError, ValidatorRecord};
use std::collections::HashSet;
use tracing::{error, info, warn};

/// Counters for one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub scanned: usize,
    pub stranded: usize,
    pub remediated: usize,
    pub failed: usize,
}

/// Stranded validators in directory order, each address at most once.
pub fn stranded_validators(records: &[ValidatorRecord]) -> Vec<&ValidatorRecord> {
    let mut seen = HashSet::new();
    let mut stranded = Vec::new();
    for record in records.iter().filter(|r| needs_remediation(r)) {
        if seen.insert(record.address) {
            stranded.push(record);
        } else {
            warn!(
                "Validator {} listed more than once by the directory",
                record.address
            );
        }
    }
    stranded
}

/// List the full directory, then remediate every stranded validator one at a
/// time. Delegations are never submitted concurrently, so the signing account's
/// nonce sequence stays linear.
///
/// A directory failure aborts the sweep. A failed remediation is logged and
/// the sweep moves on to the next candidate.
pub async fn run_startup_sweep(ctx: &GuardContext) -> Result<SweepReport, GuardError> {
    info!("Checking existing validators...");
    let validators =
        directory::list_all_validators(ctx.ledger.as_ref(), ctx.max_directory_pages).await?;
    let candidates: Vec<Address> = stranded_validators(&validators)
        .into_iter()
        .map(|r| r.address)
        .collect();

    info!(
        "Found {} validators with no stake that have a commission reward ({} scanned)",
        candidates.len(),
        validators.len()
    );

    let mut report = SweepReport {
        scanned: validators.len(),
        stranded: candidates.len(),
        ..Default::default()
    };

    for validator in candidates {
        if ctx.dry_run {
            info!("[DRY RUN] Would delegate to validator {}", validator);
            continue;
        }

        match actuator::remediate(ctx.ledger.as_ref(), validator, ctx.delegation_amount).await {
            Ok(_) => report.remediated += 1,
            Err(e) => {
                error!("Remediation of validator {} failed: {}", validator, e);
                report.failed += 1;
            }
        }
    }

    info!(
        "Sweep finished: {} remediated, {} failed",
        report.remediated, report.failed
    );
    Ok(report)
}
