mod commands;
mod config;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{
    CloneArgs, DiffArgs, EditArgs, PlanArgs, ProjectArgs, RunArgs, SegmentsArgs, SnapshotArgs, UndoArgs,
};
use serde_json::{json, Value};
use splice_editor::{execute, EditorError, ErrorKind, Operation};
use tracing_subscriber::EnvFilter;

/// Splice - edit MLT / kdenlive projects from the command line
#[derive(Parser, Debug)]
#[command(name = "splice")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Summarize tracks, producers and clips
    Inspect(ProjectArgs),

    /// Check project structure and references
    Validate(ProjectArgs),

    /// Compare two projects clip by clip
    Diff(DiffArgs),

    /// List a track's clips and gaps
    Segments(SegmentsArgs),

    /// Apply one mutation and save
    Edit(EditArgs),

    /// Preview a mutation as a diff
    Plan(PlanArgs),

    /// Copy a project file
    Clone(CloneArgs),

    /// Record the current state in the history
    Snapshot(SnapshotArgs),

    /// List snapshots, newest first
    History(ProjectArgs),

    /// Roll back to a snapshot
    Undo(UndoArgs),

    /// Restore the state before the last undo
    Redo(ProjectArgs),

    /// List operations and mutation actions
    Actions,

    /// Execute a JSON request
    Run(RunArgs),
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Command::Inspect(_) => "inspect",
            Command::Validate(_) => "validate",
            Command::Diff(_) => "diff",
            Command::Segments(_) => "segments",
            Command::Edit(_) => "edit",
            Command::Plan(_) => "plan",
            Command::Clone(_) => "clone",
            Command::Snapshot(_) => "snapshot",
            Command::History(_) => "history",
            Command::Undo(_) => "undo",
            Command::Redo(_) => "redo",
            Command::Actions => "actions",
            Command::Run(_) => "run",
        }
    }

    fn into_operation(self) -> anyhow::Result<Operation> {
        match self {
            Command::Inspect(args) => commands::inspect(args),
            Command::Validate(args) => commands::validate(args),
            Command::Diff(args) => commands::diff(args),
            Command::Segments(args) => commands::segments(args),
            Command::Edit(args) => commands::edit(args),
            Command::Plan(args) => commands::plan(args),
            Command::Clone(args) => commands::clone(args),
            Command::Snapshot(args) => commands::snapshot(args),
            Command::History(args) => commands::history(args.project),
            Command::Undo(args) => commands::undo(args),
            Command::Redo(args) => commands::redo(args.project),
            Command::Actions => Ok(Operation::Actions),
            Command::Run(args) => commands::run(args),
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("SPLICE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn execute_command(command: Command) -> anyhow::Result<(String, Value)> {
    let cwd = std::env::current_dir()?;
    let config = config::load(&cwd)?;

    let operation = command.into_operation()?;
    let method = operation.method().to_string();
    tracing::debug!(method = %method, "executing operation");
    let data = execute(&operation, &config)?;
    Ok((method, data))
}

fn classify(err: &anyhow::Error) -> ErrorKind {
    if let Some(e) = err.downcast_ref::<EditorError>() {
        e.kind()
    } else if err.downcast_ref::<serde_json::Error>().is_some() {
        ErrorKind::InvalidInput
    } else {
        ErrorKind::Other
    }
}

fn exit_code(kind: ErrorKind) -> i32 {
    match kind {
        ErrorKind::InvalidInput => 2,
        ErrorKind::NotFound => 3,
        ErrorKind::Overlap => 4,
        ErrorKind::Conflict => 5,
        ErrorKind::ValidationFailed => 6,
        ErrorKind::Other => 1,
    }
}

fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(_) => println!("{}", value),
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging();

    let command_name = cli.command.name();
    match execute_command(cli.command) {
        Ok((method, data)) => {
            print_json(&json!({"ok": true, "command": method, "data": data}));
        }
        Err(err) => {
            let kind = classify(&err);
            print_json(&json!({
                "ok": false,
                "command": command_name,
                "error": {"code": kind.code(), "message": err.to_string()},
            }));
            eprintln!("{} {}", "Error:".red().bold(), err);
            std::process::exit(exit_code(kind));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use splice_editor::MutationError;

    #[test]
    fn test_parse_edit_command() {
        let cli = Cli::try_parse_from([
            "splice",
            "edit",
            "cut.kdenlive",
            "timeline.move_clip",
            "--params",
            r#"{"clip_ref": "clip_a", "track_id": "playlist1", "position": 30}"#,
            "--dry-run",
        ])
        .unwrap();
        assert_eq!(cli.command.name(), "edit");

        let Operation::Edit { dry_run, mutation, .. } = cli.command.into_operation().unwrap() else {
            panic!("expected an edit");
        };
        assert!(dry_run);
        assert_eq!(mutation.action(), "timeline.move_clip");
    }

    #[test]
    fn test_exit_codes_follow_error_kind() {
        let overlap: anyhow::Error = EditorError::from(MutationError::Overlap {
            track: "playlist0".into(),
            position: 3,
            clip: "clip_a".into(),
        })
        .into();
        assert_eq!(exit_code(classify(&overlap)), 4);

        let missing: anyhow::Error = EditorError::SnapshotNotFound("x".into()).into();
        assert_eq!(exit_code(classify(&missing)), 3);

        let bad_json: anyhow::Error = serde_json::from_str::<Value>("{").unwrap_err().into();
        assert_eq!(exit_code(classify(&bad_json)), 2);

        assert_eq!(exit_code(classify(&anyhow::anyhow!("boom"))), 1);
    }
}
