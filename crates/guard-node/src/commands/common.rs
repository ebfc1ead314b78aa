use crate::print_info;
use guard_core::{format_token_amount, GuardConfig, GuardError};
use guard_node::EvmLedger;
use std::path::Path;
use std::sync::Arc;
use tracing::warn;
use zeroize::Zeroizing;

/// Environment variable holding the hex private key that funds delegations.
pub const PRIVATE_KEY_ENV: &str = "WALLET_PRIVATE_KEY";

/// Build the effective config. Precedence: CLI flags, then the config file,
/// then `STAKEGUARD_*` variables, then defaults. The result is validated.
pub fn resolve_config(
    config_path: Option<&Path>,
    rpc: Option<&str>,
    contract: Option<&str>,
) -> Result<GuardConfig, GuardError> {
    resolve_config_with(config_path, rpc, contract, |name| std::env::var(name).ok())
}

/// [`resolve_config`] with an injectable environment.
pub fn resolve_config_with<F>(
    config_path: Option<&Path>,
    rpc: Option<&str>,
    contract: Option<&str>,
    lookup: F,
) -> Result<GuardConfig, GuardError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match config_path {
        Some(path) => GuardConfig::load_layered(path, lookup)?,
        None => GuardConfig::load_from_lookup(lookup)?,
    };

    if let Some(rpc) = rpc {
        config.rpc_url = rpc.to_string();
    }
    if let Some(contract) = contract {
        config.contract_address = contract.to_string();
    }

    config.validate()?;
    Ok(config)
}

/// Read the signing key from the environment. The returned string is wiped
/// from memory when dropped.
pub fn load_signing_key(required: bool) -> Result<Option<Zeroizing<String>>, GuardError> {
    match std::env::var(PRIVATE_KEY_ENV) {
        Ok(key) if !key.trim().is_empty() => Ok(Some(Zeroizing::new(key))),
        _ if required => Err(GuardError::Config(format!(
            "{} is not set; it is required to submit delegations",
            PRIVATE_KEY_ENV
        ))),
        _ => Ok(None),
    }
}

/// Connect the shared ledger gateway. `signing` selects whether a key is
/// mandatory (anything that may delegate) or optional (read-only commands).
pub async fn connect_ledger(
    config: &GuardConfig,
    signing: bool,
) -> Result<Arc<EvmLedger>, GuardError> {
    let key = load_signing_key(signing)?;
    let ledger = EvmLedger::connect(config, key.as_ref().map(|k| k.as_str()))?;

    print_info(&format!(
        "RPC {} | contract {}",
        config.rpc_url, config.contract_address
    ));

    if let Some(signer) = ledger.signer_address() {
        match ledger.signer_balance().await {
            Ok(Some(balance)) => print_info(&format!(
                "Funding account {} holds {}",
                signer,
                format_token_amount(balance)
            )),
            Ok(None) => {}
            // informational only; submission surfaces real balance problems
            Err(e) => warn!("Could not read balance of {}: {}", signer, e),
        }
    }

    Ok(Arc::new(ledger))
}
