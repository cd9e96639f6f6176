//! Instance id to track lookup

use crate::segments::TrackSegments;
use std::collections::HashMap;
use tracing::warn;

/// Maps every clip instance id in the project to the track holding it.
///
/// Rebuilt on load and on whole-content replacement, refreshed for each
/// track a mutation writes.
#[derive(Debug, Clone, Default)]
pub struct ClipIndex {
    tracks: HashMap<String, String>,
}

impl ClipIndex {
    pub fn from_tracks<'a>(tracks: impl IntoIterator<Item = &'a TrackSegments>) -> Self {
        let mut index = Self::default();
        for track in tracks {
            index.insert_track(track);
        }
        index
    }

    /// Replace the entries of one track
    pub fn update_track(&mut self, track: &TrackSegments) {
        self.tracks.retain(|_, owner| owner != &track.track_id);
        self.insert_track(track);
    }

    pub fn remove_track(&mut self, track_id: &str) {
        self.tracks.retain(|_, owner| owner != track_id);
    }

    pub fn track_of(&self, instance_id: &str) -> Option<&str> {
        self.tracks.get(instance_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    fn insert_track(&mut self, track: &TrackSegments) {
        for clip in track.clips() {
            if let Some(owner) = self.tracks.get(&clip.instance_id) {
                warn!(
                    instance_id = %clip.instance_id,
                    first = %owner,
                    duplicate = %track.track_id,
                    "duplicate clip instance id, keeping first"
                );
                continue;
            }
            self.tracks.insert(clip.instance_id.clone(), track.track_id.clone());
        }
    }
}
