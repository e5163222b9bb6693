//! `init` and `pull`.

use super::{CommandResult, Workspace};
use zonesync_engine::PullReport;

/// Runs the init command.
pub fn init(workspace: &Workspace) -> CommandResult {
    let report = workspace.client.initialize()?;
    println!(
        "Initialized zone {} ({} records cached)",
        workspace.config.zone_id,
        workspace.client.current_names().len()
    );
    print_report(&report);
    Ok(())
}

/// Runs the pull command.
pub fn pull(workspace: &Workspace, retry: bool) -> CommandResult {
    let report = if retry {
        workspace.client.pull_changes_with_retry()?
    } else {
        workspace.client.pull_changes()?
    };
    print_report(&report);
    Ok(())
}

fn print_report(report: &PullReport) {
    if report.has_changes() || report.skipped > 0 {
        println!(
            "Pulled {} page(s): {} upserted, {} removed, {} skipped",
            report.pages, report.upserted, report.removed, report.skipped
        );
    } else {
        println!("Up to date");
    }
}
