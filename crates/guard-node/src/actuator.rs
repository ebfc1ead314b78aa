//! Remediation actuator: one `delegate` transaction, awaited to confirmation.
//!
//! Nothing here guards against two concurrent remediations of the same
//! validator (a sweep candidate that also receives an event, or two events in
//! quick succession). Both delegations go through and the validator simply
//! ends up with extra stake. That race is accepted and left unguarded.

use crate::ledger::{Confirmation, LedgerGateway};
use guard_core::{format_token_amount, Address, GuardError, U256};
use tracing::info;

/// Delegate `amount` wei to `validator` and wait for the receipt.
///
/// Not retried. Submission failures map to
/// [`GuardError::RemediationSubmission`]; receipt failures map to
/// [`GuardError::ConfirmationFailure`] or [`GuardError::ConfirmationTimeout`].
pub async fn remediate(
    ledger: &dyn LedgerGateway,
    validator: Address,
    amount: U256,
) -> Result<Confirmation, GuardError> {
    info!(
        "Delegating {} to validator {}...",
        format_token_amount(amount),
        validator
    );

    let tx_hash = ledger
        .submit_delegation(validator, amount)
        .await
        .map_err(|e| GuardError::RemediationSubmission {
            validator,
            reason: e.to_string(),
        })?;

    info!("Delegation to {} submitted: tx {}", validator, tx_hash);

    let confirmation = ledger
        .await_confirmation(tx_hash)
        .await
        .map_err(|e| GuardError::from_confirmation(validator, tx_hash, e))?;

    info!(
        "Delegation to {} confirmed in block {}",
        validator,
        confirmation
            .block_number
            .map(|b| b.to_string())
            .unwrap_or_else(|| "?".to_string())
    );

    Ok(confirmation)
}
