//! # Operations
//!
//! Every externally callable request, as a closed set. Transports (the
//! CLI, an RPC layer) deserialize an [`Operation`] and hand it to
//! [`execute`]; the result is plain JSON.
//!
//! ```json
//! {"method": "project.edit",
//!  "params": {"project": "cut.kdenlive",
//!             "mutation": {"action": "timeline.ripple_delete",
//!                          "params": {"clip_ref": "clip_a"}}}}
//! ```

use crate::assets::{MediaProbe, NoProbe};
use crate::config::EditorConfig;
use crate::diff::diff;
use crate::history::SnapshotStore;
use crate::mutations::Mutation;
use crate::project::Project;
use crate::session::EditSession;
use crate::validator::validate;
use crate::EditorError;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "method", content = "params")]
pub enum Operation {
    #[serde(rename = "project.inspect")]
    Inspect { project: PathBuf },

    #[serde(rename = "project.validate")]
    Validate { project: PathBuf },

    #[serde(rename = "project.diff")]
    Diff { source: PathBuf, target: PathBuf },

    #[serde(rename = "project.snapshot")]
    Snapshot {
        project: PathBuf,
        description: String,
        #[serde(default)]
        metadata: Map<String, Value>,
    },

    #[serde(rename = "project.history")]
    History { project: PathBuf },

    #[serde(rename = "project.undo")]
    Undo {
        project: PathBuf,
        #[serde(default)]
        snapshot_id: Option<String>,
    },

    #[serde(rename = "project.redo")]
    Redo { project: PathBuf },

    /// Copy a project file
    #[serde(rename = "project.clone")]
    Clone {
        source: PathBuf,
        target: PathBuf,
        #[serde(default)]
        overwrite: bool,
    },

    /// Preview a mutation as a diff, without writing anything
    #[serde(rename = "project.plan_edit")]
    PlanEdit { project: PathBuf, mutation: Mutation },

    #[serde(rename = "project.edit")]
    Edit {
        project: PathBuf,
        mutation: Mutation,
        /// Save here instead of over the project
        #[serde(default)]
        output: Option<PathBuf>,
        #[serde(default)]
        dry_run: bool,
    },

    #[serde(rename = "timeline.segments")]
    Segments { project: PathBuf, track_id: String },

    #[serde(rename = "system.actions")]
    Actions,
}

impl Operation {
    pub const METHODS: &'static [&'static str] = &[
        "project.inspect",
        "project.validate",
        "project.diff",
        "project.snapshot",
        "project.history",
        "project.undo",
        "project.redo",
        "project.clone",
        "project.plan_edit",
        "project.edit",
        "timeline.segments",
        "system.actions",
    ];

    pub fn method(&self) -> &'static str {
        match self {
            Operation::Inspect { .. } => "project.inspect",
            Operation::Validate { .. } => "project.validate",
            Operation::Diff { .. } => "project.diff",
            Operation::Snapshot { .. } => "project.snapshot",
            Operation::History { .. } => "project.history",
            Operation::Undo { .. } => "project.undo",
            Operation::Redo { .. } => "project.redo",
            Operation::Clone { .. } => "project.clone",
            Operation::PlanEdit { .. } => "project.plan_edit",
            Operation::Edit { .. } => "project.edit",
            Operation::Segments { .. } => "timeline.segments",
            Operation::Actions => "system.actions",
        }
    }
}

/// Run an operation without a media probe
pub fn execute(operation: &Operation, config: &EditorConfig) -> Result<Value, EditorError> {
    execute_with(operation, config, &NoProbe)
}

pub fn execute_with(operation: &Operation, config: &EditorConfig, probe: &dyn MediaProbe) -> Result<Value, EditorError> {
    debug!(method = operation.method(), "executing operation");
    match operation {
        Operation::Inspect { project } => {
            let loaded = Project::load(project)?;
            let info = loaded.info(config.default_fps)?;
            Ok(json!({
                "path": project,
                "generation": info.generation,
                "version": loaded.format_version(),
                "fps": info.fps,
                "statistics": {
                    "tracks": info.tracks.len(),
                    "producers": info.producers.len(),
                    "clips": info.clips.len(),
                    "durationFrames": info.duration_frames,
                },
                "tracks": info.tracks,
                "producers": info.producers,
                "clips": info.clips,
            }))
        }

        Operation::Validate { project } => {
            let report = validate(&Project::load(project)?);
            let mut value = report.to_json();
            value["path"] = json!(project);
            Ok(value)
        }

        Operation::Diff { source, target } => {
            let report = diff(&Project::load(source)?, &Project::load(target)?)?;
            report.to_json()
        }

        Operation::Snapshot {
            project,
            description,
            metadata,
        } => {
            let mut session = EditSession::open(project, config.clone())?;
            let record = session.create_snapshot(description, metadata.clone())?;
            Ok(json!({"snapshot": record}))
        }

        Operation::History { project } => {
            let loaded = Project::load(project)?;
            let store = SnapshotStore::open(&loaded.path)?;
            Ok(json!({"project": project, "snapshots": store.history()}))
        }

        Operation::Undo { project, snapshot_id } => {
            let mut session = EditSession::open(project, config.clone())?;
            let outcome = session.undo(snapshot_id.as_deref())?;
            Ok(json!({"changed": true, "undo": outcome}))
        }

        Operation::Redo { project } => {
            let mut session = EditSession::open(project, config.clone())?;
            let outcome = session.redo()?;
            Ok(json!({"changed": true, "redo": outcome}))
        }

        Operation::Clone {
            source,
            target,
            overwrite,
        } => {
            if !source.exists() {
                return Err(EditorError::ProjectNotFound(source.clone()));
            }
            if target.exists() && !overwrite {
                return Err(EditorError::AlreadyExists(target.clone()));
            }
            if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            fs::copy(source, target)?;
            info!(source = %source.display(), target = %target.display(), "cloned project");
            Ok(json!({"source": source, "target": target, "cloned": true}))
        }

        Operation::PlanEdit { project, mutation } => {
            let source = Project::load(project)?;
            let mut planned = source.clone();
            let result = planned.apply_with(mutation, &config.apply_context(probe))?;
            let report = diff(&source, &planned)?;
            Ok(json!({
                "project": project,
                "action": mutation.action(),
                "result": result,
                "wouldChange": !report.is_empty() || result.changed,
                "previewDiff": report.to_json()?,
            }))
        }

        Operation::Edit {
            project,
            mutation,
            output,
            dry_run,
        } => {
            let mut loaded = Project::load(project)?;
            if config.validate_before_edit {
                let report = validate(&loaded);
                if !report.is_valid() {
                    let messages: Vec<String> = report.errors.iter().map(|e| e.to_string()).collect();
                    return Err(EditorError::ValidationFailed(messages.join("; ")));
                }
            }

            let result = loaded.apply_with(mutation, &config.apply_context(probe))?;
            let dry_run = *dry_run;
            let saved_to = match (dry_run, output.as_ref()) {
                (true, _) => None,
                (false, Some(output)) => Some(loaded.save_as(output)?),
                (false, None) if result.changed => Some(loaded.save()?),
                (false, None) => None,
            };

            info!(action = mutation.action(), changed = result.changed, dry_run, "edited project");
            let mut value = serde_json::to_value(&result)?;
            if let Some(map) = value.as_object_mut() {
                map.insert("action".into(), json!(mutation.action()));
                map.insert("dryRun".into(), json!(dry_run));
                map.insert("savedTo".into(), json!(saved_to));
            }
            Ok(value)
        }

        Operation::Segments { project, track_id } => {
            let loaded = Project::load(project)?;
            let segments = loaded.read_segments(track_id)?;
            Ok(json!({
                "trackId": track_id,
                "durationFrames": segments.duration(),
                "segments": segments.segments,
            }))
        }

        Operation::Actions => Ok(json!({
            "methods": Operation::METHODS,
            "actions": Mutation::ACTIONS,
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_edit_request() {
        let operation: Operation = serde_json::from_value(json!({
            "method": "project.edit",
            "params": {
                "project": "cut.kdenlive",
                "mutation": {"action": "timeline.insert_gap",
                             "params": {"track_id": "playlist0", "position": 10, "length": 3}},
                "dry_run": true
            }
        }))
        .unwrap();
        assert_eq!(operation.method(), "project.edit");
        let Operation::Edit { dry_run, output, .. } = operation else {
            panic!("expected an edit");
        };
        assert!(dry_run);
        assert!(output.is_none());
    }

    #[test]
    fn test_actions_listing() {
        let value = execute(&Operation::Actions, &EditorConfig::default()).unwrap();
        assert_eq!(value["methods"].as_array().unwrap().len(), Operation::METHODS.len());
        assert!(value["actions"]
            .as_array()
            .unwrap()
            .contains(&json!("timeline.stitch_clips")));
    }

    #[test]
    fn test_missing_project() {
        let err = execute(
            &Operation::Inspect {
                project: "/nonexistent/cut.kdenlive".into(),
            },
            &EditorConfig::default(),
        )
        .unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
    }
}
