//! # Diff Engine
//!
//! Compares two project documents clip by clip. Classification is driven
//! by instance id only:
//!
//! | source | target | same track+start | same in/out | result  |
//! |--------|--------|------------------|-------------|---------|
//! | -      | yes    |                  |             | Added   |
//! | yes    | -      |                  |             | Removed |
//! | yes    | yes    | no               | any         | Moved   |
//! | yes    | yes    | yes              | no          | Trimmed |
//!
//! A clip that reappears under another id (after a split, say) is one
//! removal plus additions, never a move.

use crate::model::{Frame, TimelineClip};
use crate::project::Project;
use crate::EditorError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Added,
    Removed,
    Moved,
    Trimmed,
}

/// One classified clip change
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipChange {
    pub change_type: ChangeType,
    pub clip_ref: String,
    pub producer_id: String,
    pub track_id: String,
    pub start: Frame,
    pub end: Frame,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_track_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_start: Option<Frame>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_end: Option<Frame>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_in: Option<Frame>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_out: Option<Frame>,
}

impl ClipChange {
    fn new(change_type: ChangeType, clip: &TimelineClip) -> Self {
        Self {
            change_type,
            clip_ref: clip.instance_id.clone(),
            producer_id: clip.producer_id.clone(),
            track_id: clip.track_id.clone(),
            start: clip.start,
            end: clip.end,
            old_track_id: None,
            old_start: None,
            old_end: None,
            old_in: None,
            old_out: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffReport {
    pub source: PathBuf,
    pub target: PathBuf,
    pub generated_at: DateTime<Utc>,
    pub added: Vec<ClipChange>,
    pub removed: Vec<ClipChange>,
    pub moved: Vec<ClipChange>,
    pub trimmed: Vec<ClipChange>,
}

impl DiffReport {
    pub fn total_changes(&self) -> usize {
        self.added.len() + self.removed.len() + self.moved.len() + self.trimmed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total_changes() == 0
    }

    /// Report as JSON, including the change count
    pub fn to_json(&self) -> Result<serde_json::Value, EditorError> {
        let mut value = serde_json::to_value(self)?;
        if let Some(map) = value.as_object_mut() {
            map.insert("totalChanges".to_string(), self.total_changes().into());
        }
        Ok(value)
    }
}

/// Compare two projects
pub fn diff(source: &Project, target: &Project) -> Result<DiffReport, EditorError> {
    let before = source.clips(None)?;
    let after = target.clips(None)?;
    Ok(diff_clips(&source.path, &target.path, &before, &after))
}

/// Compare two clip listings, each in document traversal order
pub fn diff_clips(
    source: impl Into<PathBuf>,
    target: impl Into<PathBuf>,
    before: &[TimelineClip],
    after: &[TimelineClip],
) -> DiffReport {
    let old: HashMap<&str, &TimelineClip> = before.iter().map(|c| (c.instance_id.as_str(), c)).collect();
    let new: HashMap<&str, &TimelineClip> = after.iter().map(|c| (c.instance_id.as_str(), c)).collect();

    let mut report = DiffReport {
        source: source.into(),
        target: target.into(),
        generated_at: Utc::now(),
        added: Vec::new(),
        removed: Vec::new(),
        moved: Vec::new(),
        trimmed: Vec::new(),
    };

    for clip in after {
        let Some(prev) = old.get(clip.instance_id.as_str()) else {
            report.added.push(ClipChange::new(ChangeType::Added, clip));
            continue;
        };

        if prev.track_id != clip.track_id || prev.start != clip.start {
            let mut change = ClipChange::new(ChangeType::Moved, clip);
            change.old_track_id = Some(prev.track_id.clone());
            change.old_start = Some(prev.start);
            change.old_end = Some(prev.end);
            report.moved.push(change);
        } else if prev.in_point != clip.in_point || prev.out_point != clip.out_point {
            let mut change = ClipChange::new(ChangeType::Trimmed, clip);
            change.old_end = Some(prev.end);
            change.old_in = Some(prev.in_point);
            change.old_out = prev.out_point;
            report.trimmed.push(change);
        }
    }

    report.removed = before
        .iter()
        .filter(|c| !new.contains_key(c.instance_id.as_str()))
        .map(|c| ClipChange::new(ChangeType::Removed, c))
        .collect();

    debug!(
        added = report.added.len(),
        removed = report.removed.len(),
        moved = report.moved.len(),
        trimmed = report.trimmed.len(),
        "computed diff"
    );
    report
}
