use crate::commands::common::connect_ledger;
use crate::{print_error, print_info, print_success};
use colored::*;
use guard_core::{format_token_amount, needs_remediation, Address, GuardConfig, ValidatorRecord};
use guard_node::directory;
use guard_node::sweep::stranded_validators;

/// Show one validator and whether it would be remediated. Never delegates.
pub async fn check(config: &GuardConfig, address: &str) -> Result<(), Box<dyn std::error::Error>> {
    let address: Address = address
        .trim()
        .parse()
        .map_err(|e| format!("Invalid validator address '{}': {}", address, e))?;

    print_info(&format!("Querying validator {}...", address));
    let ledger = connect_ledger(config, false).await?;
    let record = directory::get_validator(ledger.as_ref(), address).await?;

    println!();
    print_record(&record);
    println!();

    if needs_remediation(&record) {
        print_error("Stranded: zero stake with unclaimed commission reward.");
    } else {
        print_success("Validator needs no remediation.");
    }
    Ok(())
}

/// List every stranded validator in the directory. Never delegates.
pub async fn stranded(config: &GuardConfig) -> Result<(), Box<dyn std::error::Error>> {
    print_info("Fetching validator directory...");
    let ledger = connect_ledger(config, false).await?;
    let validators =
        directory::list_all_validators(ledger.as_ref(), config.max_directory_pages).await?;
    let stranded = stranded_validators(&validators);

    println!();
    println!("{}", "Stranded Validators:".bold());
    println!();
    for (i, record) in stranded.iter().enumerate() {
        println!(
            "  {}. {}",
            (i + 1).to_string().cyan(),
            record.address.to_string().green()
        );
        println!(
            "     {}: {}",
            "Commission reward".dimmed(),
            format_token_amount(record.commission_reward)
        );
        println!("     {}: {}", "Owner".dimmed(), record.owner);
        println!();
    }

    println!(
        "{} {} {} {}",
        "Total:".bold(),
        stranded.len().to_string().cyan(),
        "of".dimmed(),
        format!("{} validator(s)", validators.len()).dimmed()
    );
    Ok(())
}

fn print_record(record: &ValidatorRecord) {
    println!("{} {}", "Address:".bold(), record.address.to_string().green());
    println!(
        "{} {}",
        "Total stake:".bold(),
        format_token_amount(record.total_stake).cyan()
    );
    println!(
        "{} {}",
        "Commission reward:".bold(),
        format_token_amount(record.commission_reward).cyan()
    );
    println!("{} {}", "Commission:".bold(), record.commission_percent());
    println!(
        "{} {}",
        "Last commission change:".bold(),
        record.last_commission_change_block
    );
    println!(
        "{} {}",
        "Pending undelegations:".bold(),
        record.pending_undelegations_count
    );
    println!("{} {}", "Owner:".bold(), record.owner);
    println!("{} {}", "Description:".bold(), record.description);
    println!("{} {}", "Endpoint:".bold(), record.endpoint);
}
