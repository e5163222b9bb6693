//! `remote-put`: another device writes, then the push signal is delivered.

use super::{CommandResult, Workspace};
use tracing::warn;
use zonesync_engine::SignalOutcome;
use zonesync_protocol::RecordFields;

/// Runs the remote-put command.
pub fn run(workspace: &Workspace, name: &str) -> CommandResult {
    let mut signals = workspace.server.subscribe();
    let record = workspace
        .server
        .save_record(&workspace.config.zone_id, &RecordFields::with_name(name))?;
    println!("Remote wrote {} ({})", name, record.id);

    let mut delivered = 0;
    while signals.try_recv().is_ok() {
        delivered += 1;
        match workspace.client.on_signal() {
            SignalOutcome::NewData(report) => {
                println!("Signal pulled {} change(s)", report.upserted + report.removed)
            }
            SignalOutcome::NoData => println!("Signal found nothing new"),
            SignalOutcome::Coalesced => {}
            SignalOutcome::Failed(e) => return Err(e.into()),
        }
    }

    if delivered == 0 {
        warn!("no subscription on this zone, run `init` to receive signals");
    }
    Ok(())
}
