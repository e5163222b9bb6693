//! Status command implementation.

use super::{CommandResult, Workspace};
use serde::Serialize;

/// Local sync status.
#[derive(Debug, Serialize)]
pub struct StatusReport {
    /// Zone being synced.
    pub zone: String,
    /// Last persisted cursor as hex, if any.
    pub cursor: Option<String>,
    /// Whether the zone is recorded as created.
    pub zone_created: bool,
    /// Whether the subscription is recorded as created.
    pub subscription_created: bool,
    /// Number of cached records.
    pub record_count: usize,
}

/// Runs the status command.
pub fn run(workspace: &Workspace, format: &str) -> CommandResult {
    let flags = workspace.client.bootstrap_flags()?;
    let report = StatusReport {
        zone: workspace.config.zone_id.to_string(),
        cursor: workspace.client.last_cursor()?.map(|cursor| cursor.to_hex()),
        zone_created: flags.zone_created,
        subscription_created: flags.subscription_created,
        record_count: workspace.client.records().len(),
    };

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        _ => print_text_output(&report),
    }
    Ok(())
}

fn print_text_output(report: &StatusReport) {
    println!("Zone:                 {}", report.zone);
    println!(
        "Cursor:               {}",
        report.cursor.as_deref().unwrap_or("(none)")
    );
    println!("Zone created:         {}", report.zone_created);
    println!("Subscription created: {}", report.subscription_created);
    println!("Records:              {}", report.record_count);
}
