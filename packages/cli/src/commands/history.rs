use anyhow::{bail, Result};
use clap::Args;
use serde_json::{Map, Value};
use splice_editor::Operation;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct SnapshotArgs {
    pub project: PathBuf,

    /// What this snapshot captures
    #[arg(short, long)]
    pub description: String,

    /// Extra metadata as a JSON object
    #[arg(short, long)]
    pub metadata: Option<String>,
}

#[derive(Args, Debug)]
pub struct UndoArgs {
    pub project: PathBuf,

    /// Snapshot to return to (defaults to the newest)
    #[arg(short, long)]
    pub snapshot: Option<String>,
}

pub fn snapshot(args: SnapshotArgs) -> Result<Operation> {
    let metadata = match args.metadata.as_deref() {
        None => Map::new(),
        Some(raw) => match serde_json::from_str::<Value>(raw)? {
            Value::Object(map) => map,
            _ => bail!("metadata must be a JSON object"),
        },
    };
    Ok(Operation::Snapshot {
        project: args.project,
        description: args.description,
        metadata,
    })
}

pub fn history(project: PathBuf) -> Result<Operation> {
    Ok(Operation::History { project })
}

pub fn undo(args: UndoArgs) -> Result<Operation> {
    Ok(Operation::Undo {
        project: args.project,
        snapshot_id: args.snapshot,
    })
}

pub fn redo(project: PathBuf) -> Result<Operation> {
    Ok(Operation::Redo { project })
}
