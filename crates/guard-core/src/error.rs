use alloy_primitives::{Address, B256};
use std::fmt;

/// Failures reported by a ledger gateway (RPC node + contract marshaling).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Network / JSON-RPC failure
    Transport(String),
    /// Response could not be ABI-decoded
    Decode(String),
    /// Transaction refused at submission (nonce, funds, gas estimation revert)
    Rejected(String),
    /// Transaction mined with a failed status
    Reverted { tx_hash: B256 },
    /// Gateway gave up waiting for the receipt
    Timeout { tx_hash: B256 },
    /// Event subscription could not be established or broke
    Subscription(String),
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "ledger transport error: {}", e),
            Self::Decode(e) => write!(f, "ledger decode error: {}", e),
            Self::Rejected(e) => write!(f, "transaction rejected: {}", e),
            Self::Reverted { tx_hash } => write!(f, "transaction {} reverted", tx_hash),
            Self::Timeout { tx_hash } => {
                write!(f, "timed out waiting for transaction {}", tx_hash)
            }
            Self::Subscription(e) => write!(f, "event subscription error: {}", e),
        }
    }
}

impl std::error::Error for LedgerError {}

/// Watchdog-level errors.
///
/// `RemediationSubmission`, `ConfirmationFailure` and `ConfirmationTimeout`
/// are scoped to a single validator: callers log them and move on.
/// Directory errors abort the sweep or lookup that produced them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardError {
    /// A `getValidators` page or `getValidator` read failed
    DirectoryRead(LedgerError),
    /// The contract never flagged a final page within the bound
    DirectoryExhausted { pages: u32 },
    /// `delegate` was refused before inclusion
    RemediationSubmission { validator: Address, reason: String },
    /// `delegate` was included but failed, or the receipt wait broke
    ConfirmationFailure {
        validator: Address,
        tx_hash: B256,
        reason: String,
    },
    ConfirmationTimeout { validator: Address, tx_hash: B256 },
    Config(String),
    Subscription(String),
}

impl GuardError {
    /// True for failures that only concern one validator's remediation.
    pub fn is_isolated(&self) -> bool {
        matches!(
            self,
            Self::RemediationSubmission { .. }
                | Self::ConfirmationFailure { .. }
                | Self::ConfirmationTimeout { .. }
        )
    }

    /// Classify a gateway error raised while waiting on a delegation receipt.
    pub fn from_confirmation(validator: Address, tx_hash: B256, err: LedgerError) -> Self {
        match err {
            LedgerError::Timeout { tx_hash } => Self::ConfirmationTimeout { validator, tx_hash },
            LedgerError::Reverted { tx_hash } => Self::ConfirmationFailure {
                validator,
                tx_hash,
                reason: "execution reverted".to_string(),
            },
            other => Self::ConfirmationFailure {
                validator,
                tx_hash,
                reason: other.to_string(),
            },
        }
    }
}

impl fmt::Display for GuardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DirectoryRead(e) => write!(f, "directory read failed: {}", e),
            Self::DirectoryExhausted { pages } => write!(
                f,
                "validator directory did not signal its last page within {} pages",
                pages
            ),
            Self::RemediationSubmission { validator, reason } => {
                write!(f, "delegation to {} rejected: {}", validator, reason)
            }
            Self::ConfirmationFailure {
                validator,
                tx_hash,
                reason,
            } => write!(
                f,
                "delegation to {} (tx {}) failed: {}",
                validator, tx_hash, reason
            ),
            Self::ConfirmationTimeout { validator, tx_hash } => write!(
                f,
                "delegation to {} (tx {}) was not confirmed in time",
                validator, tx_hash
            ),
            Self::Config(e) => write!(f, "configuration error: {}", e),
            Self::Subscription(e) => write!(f, "event reactor stopped: {}", e),
        }
    }
}

impl std::error::Error for GuardError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::DirectoryRead(e) => Some(e),
            _ => None,
        }
    }
}

impl From<LedgerError> for GuardError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Subscription(e) => Self::Subscription(e),
            other => Self::DirectoryRead(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_isolated_classification() {
        let validator = Address::repeat_byte(0x11);
        let tx_hash = B256::repeat_byte(0x22);

        assert!(GuardError::RemediationSubmission {
            validator,
            reason: "insufficient funds".into()
        }
        .is_isolated());
        assert!(GuardError::ConfirmationTimeout { validator, tx_hash }.is_isolated());
        assert!(!GuardError::DirectoryExhausted { pages: 3 }.is_isolated());
        assert!(!GuardError::DirectoryRead(LedgerError::Transport("eof".into())).is_isolated());
    }

    #[test]
    fn test_confirmation_timeout_maps_to_timeout() {
        let validator = Address::repeat_byte(0x01);
        let tx_hash = B256::repeat_byte(0xab);
        let err = GuardError::from_confirmation(validator, tx_hash, LedgerError::Timeout { tx_hash });
        assert_eq!(err, GuardError::ConfirmationTimeout { validator, tx_hash });
    }

    #[test]
    fn test_confirmation_revert_maps_to_failure() {
        let validator = Address::repeat_byte(0x01);
        let tx_hash = B256::repeat_byte(0xcd);
        let err =
            GuardError::from_confirmation(validator, tx_hash, LedgerError::Reverted { tx_hash });
        match err {
            GuardError::ConfirmationFailure { tx_hash: h, .. } => assert_eq!(h, tx_hash),
            other => panic!("Expected ConfirmationFailure, got {:?}", other),
        }
    }

    #[test]
    fn test_subscription_error_conversion() {
        let err: GuardError = LedgerError::Subscription("filter expired".into()).into();
        assert_eq!(err, GuardError::Subscription("filter expired".into()));
    }

    #[test]
    fn test_display_mentions_validator() {
        let validator = Address::repeat_byte(0x42);
        let msg = GuardError::RemediationSubmission {
            validator,
            reason: "nonce too low".into(),
        }
        .to_string();
        assert!(msg.contains("nonce too low"));
        assert!(msg.to_lowercase().contains("4242"));
    }
}
