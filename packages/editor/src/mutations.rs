//! # Project Mutations
//!
//! Closed set of editing requests. Each variant maps onto one operation
//! of the timeline, track or asset layers and reports what it did.
//!
//! ## Mutation Semantics
//!
//! - **Atomic**: a failed mutation leaves the project untouched
//! - **Identity-addressed**: clips are named by instance id, tracks by
//!   playlist id
//! - **Idempotent no-ops**: moving a clip onto itself, trimming to the
//!   current bounds or adding an existing track reports
//!   `changed = false, idempotent = true` instead of failing

use crate::assets::{create_text, import_media, ApplyContext, TextAsset};
use crate::errors::ErrorKind;
use crate::model::{Frame, TrackKind};
use crate::project::Project;
use crate::timeline::{ClipMove, StitchOptions};
use crate::tracks::{add_track, remove_track, reorder_track, TrackEdit};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Editing requests, tagged by action name
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "action", content = "params")]
pub enum Mutation {
    /// Place a new clip of an existing producer
    #[serde(rename = "timeline.add_clip")]
    AddClip {
        producer_id: String,
        track_id: String,
        position: Frame,
        #[serde(default)]
        in_point: Frame,
        #[serde(default)]
        out_point: Option<Frame>,
        #[serde(default)]
        allow_overlap: bool,
    },

    #[serde(rename = "timeline.move_clip")]
    MoveClip {
        clip_ref: String,
        track_id: String,
        position: Frame,
        #[serde(default)]
        allow_overlap: bool,
    },

    /// Change source bounds; an omitted bound is kept
    #[serde(rename = "timeline.trim_clip")]
    TrimClip {
        clip_ref: String,
        #[serde(default)]
        in_point: Option<Frame>,
        #[serde(default)]
        out_point: Option<Frame>,
    },

    #[serde(rename = "timeline.remove_clip")]
    RemoveClip {
        clip_ref: String,
        #[serde(default)]
        close_gap: bool,
    },

    #[serde(rename = "timeline.split_clip")]
    SplitClip { clip_ref: String, position: Frame },

    #[serde(rename = "timeline.ripple_delete")]
    RippleDelete { clip_ref: String },

    #[serde(rename = "timeline.insert_gap")]
    InsertGap {
        track_id: String,
        position: Frame,
        length: Frame,
    },

    #[serde(rename = "timeline.remove_all_gaps")]
    RemoveAllGaps { track_id: String },

    /// Lay producers end to end
    #[serde(rename = "timeline.stitch_clips")]
    StitchClips {
        track_id: String,
        producer_ids: Vec<String>,
        #[serde(default)]
        position: Option<Frame>,
        #[serde(default)]
        gap: Frame,
        #[serde(default)]
        duration_frames: Option<Frame>,
    },

    #[serde(rename = "timeline.batch_move")]
    BatchMove { moves: Vec<ClipMove> },

    #[serde(rename = "track.add")]
    AddTrack {
        #[serde(default)]
        track_id: Option<String>,
        #[serde(default)]
        kind: TrackKind,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        index: Option<usize>,
    },

    /// Clips on the track are discarded only with `force`
    #[serde(rename = "track.remove")]
    RemoveTrack {
        track_id: String,
        #[serde(default)]
        force: bool,
    },

    #[serde(rename = "track.reorder")]
    ReorderTrack { track_id: String, index: usize },

    #[serde(rename = "asset.import")]
    ImportAsset {
        media: String,
        #[serde(default)]
        producer_id: Option<String>,
        #[serde(default)]
        duration_frames: Option<Frame>,
    },

    #[serde(rename = "asset.create_text")]
    CreateText(TextAsset),

    /// Sync tractor bounds with the last clip
    #[serde(rename = "project.recalculate_bounds")]
    RecalculateBounds,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MutationError {
    #[error("Track not found: {0}")]
    TrackNotFound(String),

    #[error("Clip not found: {0}")]
    ClipNotFound(String),

    #[error("Producer not found: {0}")]
    ProducerNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Position {position} overlaps clip '{clip}' on track '{track}'")]
    Overlap {
        track: String,
        position: Frame,
        clip: String,
    },

    #[error("Conflict: {0}")]
    Conflict(String),
}

impl MutationError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        MutationError::InvalidInput(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            MutationError::TrackNotFound(_) | MutationError::ClipNotFound(_) | MutationError::ProducerNotFound(_) => {
                ErrorKind::NotFound
            }
            MutationError::InvalidInput(_) => ErrorKind::InvalidInput,
            MutationError::Overlap { .. } => ErrorKind::Overlap,
            MutationError::Conflict(_) => ErrorKind::Conflict,
        }
    }
}

/// Outcome of an applied mutation
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationResult {
    /// Project version after the mutation
    pub version: u64,
    pub changed: bool,
    pub idempotent: bool,
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub clip_refs: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub track_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub producer_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub removed_frames: Option<Frame>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_frames: Option<Frame>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub moved: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_out: Option<Frame>,
}

impl MutationResult {
    fn changed() -> Self {
        Self {
            changed: true,
            ..Default::default()
        }
    }

    fn unchanged() -> Self {
        Self {
            idempotent: true,
            ..Default::default()
        }
    }

    fn from_flag(changed: bool) -> Self {
        if changed {
            Self::changed()
        } else {
            Self::unchanged()
        }
    }

    fn with_clips(mut self, clip_refs: Vec<String>) -> Self {
        self.clip_refs = clip_refs;
        self
    }

    fn with_track(mut self, track_id: impl Into<String>) -> Self {
        self.track_id = Some(track_id.into());
        self
    }

    fn from_track_edit(edit: TrackEdit) -> Self {
        let mut result = Self::from_flag(edit.changed).with_track(edit.track_id);
        result.index = Some(edit.index);
        result
    }
}

impl Mutation {
    /// Action name as it appears on the wire
    pub fn action(&self) -> &'static str {
        match self {
            Mutation::AddClip { .. } => "timeline.add_clip",
            Mutation::MoveClip { .. } => "timeline.move_clip",
            Mutation::TrimClip { .. } => "timeline.trim_clip",
            Mutation::RemoveClip { .. } => "timeline.remove_clip",
            Mutation::SplitClip { .. } => "timeline.split_clip",
            Mutation::RippleDelete { .. } => "timeline.ripple_delete",
            Mutation::InsertGap { .. } => "timeline.insert_gap",
            Mutation::RemoveAllGaps { .. } => "timeline.remove_all_gaps",
            Mutation::StitchClips { .. } => "timeline.stitch_clips",
            Mutation::BatchMove { .. } => "timeline.batch_move",
            Mutation::AddTrack { .. } => "track.add",
            Mutation::RemoveTrack { .. } => "track.remove",
            Mutation::ReorderTrack { .. } => "track.reorder",
            Mutation::ImportAsset { .. } => "asset.import",
            Mutation::CreateText(_) => "asset.create_text",
            Mutation::RecalculateBounds => "project.recalculate_bounds",
        }
    }

    /// Every action name, in declaration order
    pub const ACTIONS: &'static [&'static str] = &[
        "timeline.add_clip",
        "timeline.move_clip",
        "timeline.trim_clip",
        "timeline.remove_clip",
        "timeline.split_clip",
        "timeline.ripple_delete",
        "timeline.insert_gap",
        "timeline.remove_all_gaps",
        "timeline.stitch_clips",
        "timeline.batch_move",
        "track.add",
        "track.remove",
        "track.reorder",
        "asset.import",
        "asset.create_text",
        "project.recalculate_bounds",
    ];

    /// Apply to a project
    pub fn apply(&self, project: &mut Project, ctx: &ApplyContext<'_>) -> Result<MutationResult, MutationError> {
        match self {
            Mutation::AddClip {
                producer_id,
                track_id,
                position,
                in_point,
                out_point,
                allow_overlap,
            } => {
                let clip_ref = project.timeline().add_clip(
                    producer_id,
                    track_id,
                    *position,
                    *in_point,
                    *out_point,
                    *allow_overlap,
                )?;
                Ok(MutationResult::changed()
                    .with_clips(vec![clip_ref])
                    .with_track(track_id.as_str()))
            }

            Mutation::MoveClip {
                clip_ref,
                track_id,
                position,
                allow_overlap,
            } => {
                let moved = project
                    .timeline()
                    .move_clip(clip_ref, track_id, *position, *allow_overlap)?;
                Ok(MutationResult::from_flag(moved)
                    .with_clips(vec![clip_ref.clone()])
                    .with_track(track_id.as_str()))
            }

            Mutation::TrimClip {
                clip_ref,
                in_point,
                out_point,
            } => {
                let trimmed = project.timeline().trim_clip(clip_ref, *in_point, *out_point)?;
                Ok(MutationResult::from_flag(trimmed).with_clips(vec![clip_ref.clone()]))
            }

            Mutation::RemoveClip { clip_ref, close_gap } => {
                project.timeline().remove_clip(clip_ref, *close_gap)?;
                Ok(MutationResult::changed().with_clips(vec![clip_ref.clone()]))
            }

            Mutation::SplitClip { clip_ref, position } => {
                let outcome = project.timeline().split_clip(clip_ref, *position)?;
                Ok(MutationResult::changed().with_clips(vec![outcome.left, outcome.right]))
            }

            Mutation::RippleDelete { clip_ref } => {
                project.timeline().ripple_delete(clip_ref)?;
                Ok(MutationResult::changed().with_clips(vec![clip_ref.clone()]))
            }

            Mutation::InsertGap {
                track_id,
                position,
                length,
            } => {
                project.timeline().insert_gap(track_id, *position, *length)?;
                Ok(MutationResult::changed().with_track(track_id.as_str()))
            }

            Mutation::RemoveAllGaps { track_id } => {
                let version = project.version;
                let removed = project.timeline().remove_all_gaps(track_id)?;
                let mut result = MutationResult::from_flag(project.version != version).with_track(track_id.as_str());
                result.removed_frames = Some(removed);
                Ok(result)
            }

            Mutation::StitchClips {
                track_id,
                producer_ids,
                position,
                gap,
                duration_frames,
            } => {
                let options = StitchOptions {
                    position: *position,
                    gap: *gap,
                    duration: *duration_frames,
                };
                let clip_refs = project.timeline().stitch_clips(track_id, producer_ids, &options)?;
                Ok(MutationResult::changed()
                    .with_clips(clip_refs)
                    .with_track(track_id.as_str()))
            }

            Mutation::BatchMove { moves } => {
                let moved = project.timeline().batch_move(moves)?;
                let mut result = MutationResult::from_flag(moved > 0);
                result.moved = Some(moved);
                Ok(result)
            }

            Mutation::AddTrack {
                track_id,
                kind,
                name,
                index,
            } => {
                let edit = add_track(project, track_id.as_deref(), *kind, name.as_deref(), *index)?;
                Ok(MutationResult::from_track_edit(edit))
            }

            Mutation::RemoveTrack { track_id, force } => {
                let edit = remove_track(project, track_id, *force)?;
                Ok(MutationResult::from_track_edit(edit))
            }

            Mutation::ReorderTrack { track_id, index } => {
                let edit = reorder_track(project, track_id, *index)?;
                Ok(MutationResult::from_track_edit(edit))
            }

            Mutation::ImportAsset {
                media,
                producer_id,
                duration_frames,
            } => {
                let created = import_media(project, media, producer_id.as_deref(), *duration_frames, ctx)?;
                let mut result = MutationResult::changed();
                result.producer_id = Some(created.producer_id);
                result.duration_frames = Some(created.duration_frames);
                Ok(result)
            }

            Mutation::CreateText(asset) => {
                let (created, clip_ref) = create_text(project, asset)?;
                let mut result = MutationResult::changed().with_clips(clip_ref.into_iter().collect());
                result.producer_id = Some(created.producer_id);
                result.duration_frames = Some(created.duration_frames);
                result.track_id = asset.track_id.clone();
                Ok(result)
            }

            Mutation::RecalculateBounds => {
                let out = project.timeline().recalculate_bounds()?;
                let mut result = MutationResult::changed();
                result.project_out = Some(out);
                Ok(result)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_project;
    use serde_json::json;

    #[test]
    fn test_wire_format() {
        let mutation: Mutation = serde_json::from_value(json!({
            "action": "timeline.move_clip",
            "params": {"clip_ref": "clip_a", "track_id": "playlist1", "position": 30}
        }))
        .unwrap();
        assert_eq!(
            mutation,
            Mutation::MoveClip {
                clip_ref: "clip_a".into(),
                track_id: "playlist1".into(),
                position: 30,
                allow_overlap: false,
            }
        );

        let bounds: Mutation = serde_json::from_value(json!({"action": "project.recalculate_bounds"})).unwrap();
        assert_eq!(bounds, Mutation::RecalculateBounds);

        let text: Mutation = serde_json::from_value(json!({
            "action": "asset.create_text",
            "params": {"text": "Title", "track_id": "playlist1"}
        }))
        .unwrap();
        assert_eq!(text.action(), "asset.create_text");
    }

    #[test]
    fn test_actions_cover_every_variant() {
        let samples = [
            Mutation::RippleDelete { clip_ref: "x".into() },
            Mutation::RecalculateBounds,
            Mutation::ReorderTrack {
                track_id: "t".into(),
                index: 0,
            },
        ];
        for m in &samples {
            assert!(Mutation::ACTIONS.contains(&m.action()));
        }
        assert_eq!(Mutation::ACTIONS.len(), 16);
    }

    #[test]
    fn test_noop_move_is_idempotent() {
        let mut project = sample_project();
        let result = project
            .apply(&Mutation::MoveClip {
                clip_ref: "clip_a".into(),
                track_id: "playlist0".into(),
                position: 0,
                allow_overlap: false,
            })
            .unwrap();
        assert!(!result.changed);
        assert!(result.idempotent);
        assert_eq!(result.version, 0);
    }

    #[test]
    fn test_split_reports_both_ids() {
        let mut project = sample_project();
        let result = project
            .apply(&Mutation::SplitClip {
                clip_ref: "clip_a".into(),
                position: 4,
            })
            .unwrap();
        assert_eq!(result.clip_refs.len(), 2);
        assert_eq!(result.version, 1);
        assert!(project.index().track_of(&result.clip_refs[1]).is_some());
    }

    #[test]
    fn test_remove_all_gaps_reports_frames() {
        let mut project = sample_project();
        let mutation = Mutation::RemoveAllGaps {
            track_id: "playlist0".into(),
        };
        assert_eq!(project.apply(&mutation).unwrap().removed_frames, Some(5));
        let again = project.apply(&mutation).unwrap();
        assert_eq!(again.removed_frames, Some(0));
        assert!(again.idempotent);
        assert_eq!(again.version, 1);
    }

    #[test]
    fn test_remove_all_gaps_rejoin_counts_as_change() {
        let mut project = sample_project();
        project.timeline().insert_gap("playlist0", 4, 3).unwrap();
        let version = project.version;

        let result = project
            .apply(&Mutation::RemoveAllGaps {
                track_id: "playlist0".into(),
            })
            .unwrap();
        assert!(result.changed);
        assert_eq!(result.version, version + 1);
        assert_eq!(project.clips(Some("playlist0")).unwrap().len(), 2);

        let again = project
            .apply(&Mutation::RemoveAllGaps {
                track_id: "playlist0".into(),
            })
            .unwrap();
        assert!(!again.changed);
        assert_eq!(project.clips(Some("playlist0")).unwrap().len(), 2);
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(MutationError::ClipNotFound("x".into()).kind(), ErrorKind::NotFound);
        assert_eq!(MutationError::Conflict("x".into()).kind(), ErrorKind::Conflict);
        let overlap = MutationError::Overlap {
            track: "t".into(),
            position: 3,
            clip: "c".into(),
        };
        assert_eq!(overlap.kind(), ErrorKind::Overlap);
        assert_eq!(overlap.to_string(), "Position 3 overlaps clip 'c' on track 't'");
    }
}
