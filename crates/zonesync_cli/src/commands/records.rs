//! `add`, `delete` and `list`.

use super::{CommandResult, Workspace};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct RecordRow {
    id: String,
    name: String,
}

/// Runs the add command.
pub fn add(workspace: &Workspace, name: &str) -> CommandResult {
    let record = workspace.client.add_record(name)?;
    println!("Added {} ({})", record.name(), record.id);
    Ok(())
}

/// Runs the delete command.
pub fn delete(workspace: &Workspace, name: &str) -> CommandResult {
    let id = workspace.client.delete_record(name)?;
    println!("Deleted {} ({})", name, id);
    Ok(())
}

/// Runs the list command.
pub fn list(workspace: &Workspace, format: &str) -> CommandResult {
    match format {
        "json" => {
            let rows: Vec<RecordRow> = workspace
                .client
                .records()
                .into_iter()
                .map(|record| RecordRow {
                    name: record.name().to_string(),
                    id: record.id.to_string(),
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        _ => {
            for name in workspace.client.current_names() {
                println!("{}", name);
            }
        }
    }
    Ok(())
}
