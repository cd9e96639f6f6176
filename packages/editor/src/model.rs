//! Read-only views over the project document

use serde::{Deserialize, Serialize};
use splice_document::NodeId;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Timeline position or length in frames
pub type Frame = i64;

/// Frame count spanned by a source range; an open range spans one frame
pub fn range_duration(in_point: Frame, out_point: Option<Frame>) -> Frame {
    match out_point {
        Some(out) => (out - in_point + 1).max(1),
        None => 1,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    #[default]
    Video,
    Audio,
}

impl TrackKind {
    /// Value of the `hide` attribute on the tractor's `track` element
    pub fn hide_attr(self) -> &'static str {
        match self {
            TrackKind::Video => "audio",
            TrackKind::Audio => "video",
        }
    }
}

/// A timeline track, backed by a playlist
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Track {
    pub index: usize,
    pub id: String,
    pub kind: TrackKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip)]
    pub playlist: NodeId,
}

/// A media source definition
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Producer {
    pub id: String,
    pub resource: Option<String>,
    pub in_point: Frame,
    pub out_point: Option<Frame>,
    #[serde(skip)]
    pub element: NodeId,
}

impl Producer {
    pub fn duration(&self) -> Frame {
        range_duration(self.in_point, self.out_point)
    }
}

/// A clip placed on a track. Derived from the segment sequence, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineClip {
    pub instance_id: String,
    pub producer_id: String,
    pub track_id: String,
    pub in_point: Frame,
    pub out_point: Option<Frame>,
    pub start: Frame,
    /// Inclusive
    pub end: Frame,
}

impl TimelineClip {
    pub fn duration(&self) -> Frame {
        self.end - self.start + 1
    }
}

/// Summary returned by `project.inspect`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectInfo {
    pub path: PathBuf,
    pub generation: u32,
    pub fps: f64,
    pub version: u64,
    pub duration_frames: Frame,
    pub tracks: Vec<Track>,
    pub producers: Vec<Producer>,
    pub clips: Vec<TimelineClip>,
    pub properties: BTreeMap<String, String>,
}
