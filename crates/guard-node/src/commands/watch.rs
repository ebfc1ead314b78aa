use crate::commands::common::connect_ledger;
use crate::{print_info, print_success, print_warning};
use colored::*;
use guard_core::{format_token_amount, GuardConfig};
use guard_node::{run_startup_sweep, EventReactor, GuardContext, SweepReport};

/// Startup sweep, then react to Undelegated events until the subscription
/// is lost.
pub async fn run(config: &GuardConfig, dry_run: bool) -> Result<(), Box<dyn std::error::Error>> {
    let ledger = connect_ledger(config, !dry_run).await?;
    let ctx = GuardContext::new(ledger, config).with_dry_run(dry_run);
    announce(&ctx);

    let report = run_startup_sweep(&ctx).await?;
    print_report(&report);

    // Subscription starts only after the sweep has returned.
    EventReactor::new(ctx).run().await?;
    Ok(())
}

/// One-shot sweep.
pub async fn sweep(config: &GuardConfig, dry_run: bool) -> Result<(), Box<dyn std::error::Error>> {
    let ledger = connect_ledger(config, !dry_run).await?;
    let ctx = GuardContext::new(ledger, config).with_dry_run(dry_run);
    announce(&ctx);

    let report = run_startup_sweep(&ctx).await?;
    print_report(&report);
    Ok(())
}

fn announce(ctx: &GuardContext) {
    print_info(&format!(
        "Remediation amount: {}",
        format_token_amount(ctx.delegation_amount)
    ));
    if ctx.dry_run {
        print_warning("Dry run: no delegation will be submitted");
    }
}

fn print_report(report: &SweepReport) {
    println!();
    println!("{}", "Startup sweep:".bold());
    println!("  {} {}", "Scanned:".bold(), report.scanned.to_string().cyan());
    println!(
        "  {} {}",
        "Stranded:".bold(),
        report.stranded.to_string().yellow()
    );
    println!(
        "  {} {}",
        "Remediated:".bold(),
        report.remediated.to_string().green()
    );
    if report.failed > 0 {
        println!("  {} {}", "Failed:".bold(), report.failed.to_string().red());
    } else {
        print_success("Sweep complete.");
    }
    println!();
}
