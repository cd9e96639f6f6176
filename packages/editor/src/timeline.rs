//! # Timeline Operations
//!
//! Identity-addressed edits over a [`Project`]. Each call resolves the
//! tracks it touches, runs the segment algebra on their in-memory
//! sequences and only writes back once every step has succeeded.

use crate::model::Frame;
use crate::mutations::MutationError;
use crate::project::Project;
use crate::segments::{read_track, write_track, ClipSegment, Segment, SplitOutcome, TrackSegments};
use serde::{Deserialize, Serialize};
use splice_document::NodeId;
use tracing::{debug, info, warn};

/// One entry of a batch move
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipMove {
    pub clip_ref: String,
    pub track_id: String,
    pub position: Frame,
    #[serde(default)]
    pub allow_overlap: bool,
}

/// Options for [`Timeline::stitch_clips`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StitchOptions {
    /// First clip start; defaults to the end of the track
    pub position: Option<Frame>,
    /// Frames left between consecutive clips
    pub gap: Frame,
    /// Uniform clip length; defaults to each producer's length
    pub duration: Option<Frame>,
}

/// A track loaded for editing
struct Loaded {
    playlist: NodeId,
    segments: TrackSegments,
}

pub struct Timeline<'p> {
    project: &'p mut Project,
}

impl<'p> Timeline<'p> {
    pub(crate) fn new(project: &'p mut Project) -> Self {
        Self { project }
    }

    pub fn list_segments(&self, track_id: &str) -> Result<Vec<Segment>, MutationError> {
        self.project.list_segments(track_id)
    }

    /// Place a new clip of `producer_id` and return its instance id.
    ///
    /// Without an explicit out point the producer's out point is used.
    pub fn add_clip(
        &mut self,
        producer_id: &str,
        track_id: &str,
        position: Frame,
        in_point: Frame,
        out_point: Option<Frame>,
        allow_overlap: bool,
    ) -> Result<String, MutationError> {
        let producer = self
            .project
            .producer(producer_id)
            .ok_or_else(|| MutationError::ProducerNotFound(producer_id.to_string()))?;
        let out_point = out_point.or(producer.out_point);
        check_range(in_point, out_point)?;

        let mut track = self.load(track_id)?;
        let clip = ClipSegment::new(producer_id, in_point, out_point);
        let instance_id = clip.instance_id.clone();
        track.segments.insert(Segment::Clip(clip), position, allow_overlap)?;
        self.commit(&track);

        info!(clip = %instance_id, producer = producer_id, track = track_id, position, "added clip");
        Ok(instance_id)
    }

    /// Place an arbitrary segment
    pub fn insert(&mut self, track_id: &str, segment: Segment, position: Frame, allow_overlap: bool) -> Result<(), MutationError> {
        let mut track = self.load(track_id)?;
        track.segments.insert(segment, position, allow_overlap)?;
        self.commit(&track);
        Ok(())
    }

    pub fn remove_clip(&mut self, instance_id: &str, close_gap: bool) -> Result<ClipSegment, MutationError> {
        let mut track = self.locate(instance_id)?;
        let removed = track.segments.remove(instance_id, close_gap)?;
        self.commit(&track);

        info!(clip = instance_id, track = %track.segments.track_id, close_gap, "removed clip");
        Ok(removed)
    }

    /// Remove a clip and close the hole it leaves
    pub fn ripple_delete(&mut self, instance_id: &str) -> Result<ClipSegment, MutationError> {
        self.remove_clip(instance_id, true)
    }

    /// Move a clip to `position` on `target_track`.
    ///
    /// The source keeps a gap where the clip was. Returns `false` when the
    /// clip already sits there.
    pub fn move_clip(
        &mut self,
        instance_id: &str,
        target_track: &str,
        position: Frame,
        allow_overlap: bool,
    ) -> Result<bool, MutationError> {
        if position < 0 {
            return Err(MutationError::invalid(format!("position must be >= 0, got {}", position)));
        }
        let mut source = self.locate(instance_id)?;
        let source_id = source.segments.track_id.clone();

        if source_id == target_track {
            let current = source
                .segments
                .find_clip(instance_id)
                .map(|i| source.segments.position_of(i));
            if current == Some(position) {
                debug!(clip = instance_id, position, "clip already in place");
                return Ok(false);
            }
            let clip = source.segments.remove(instance_id, false)?;
            source.segments.insert(Segment::Clip(clip), position, allow_overlap)?;
            self.commit(&source);
        } else {
            let mut target = self.load(target_track)?;
            let clip = source.segments.remove(instance_id, false)?;
            target.segments.insert(Segment::Clip(clip), position, allow_overlap)?;
            self.commit(&source);
            self.commit(&target);
        }

        info!(clip = instance_id, from = %source_id, to = target_track, position, "moved clip");
        Ok(true)
    }

    /// Returns `false` when the bounds were already as requested
    pub fn trim_clip(&mut self, instance_id: &str, new_in: Option<Frame>, new_out: Option<Frame>) -> Result<bool, MutationError> {
        let mut track = self.locate(instance_id)?;
        let changed = track.segments.trim(instance_id, new_in, new_out)?;
        if changed {
            self.commit(&track);
            info!(clip = instance_id, ?new_in, ?new_out, "trimmed clip");
        }
        Ok(changed)
    }

    pub fn split_clip(&mut self, instance_id: &str, position: Frame) -> Result<SplitOutcome, MutationError> {
        let mut track = self.locate(instance_id)?;
        let outcome = track.segments.split(instance_id, position)?;
        self.commit(&track);

        info!(clip = instance_id, position, left = %outcome.left, right = %outcome.right, "split clip");
        Ok(outcome)
    }

    pub fn insert_gap(&mut self, track_id: &str, position: Frame, length: Frame) -> Result<(), MutationError> {
        let mut track = self.load(track_id)?;
        track.segments.insert_gap(position, length)?;
        self.commit(&track);

        info!(track = track_id, position, length, "inserted gap");
        Ok(())
    }

    /// Returns the number of frames removed
    pub fn remove_all_gaps(&mut self, track_id: &str) -> Result<Frame, MutationError> {
        let mut track = self.load(track_id)?;
        let before = track.segments.clone();
        let removed = track.segments.remove_all_gaps();
        if track.segments != before {
            self.commit(&track);
        }

        info!(track = track_id, removed, "removed gaps");
        Ok(removed)
    }

    /// Lay producers end to end on one track. Returns the new instance ids.
    pub fn stitch_clips(&mut self, track_id: &str, producer_ids: &[String], options: &StitchOptions) -> Result<Vec<String>, MutationError> {
        if producer_ids.is_empty() {
            return Err(MutationError::invalid("at least one producer id is required"));
        }
        if options.gap < 0 {
            return Err(MutationError::invalid("gap must be >= 0"));
        }

        let mut track = self.load(track_id)?;
        let mut cursor = match options.position {
            Some(position) => position,
            None => track
                .segments
                .timeline_clips()
                .last()
                .map_or(0, |c| c.end + 1),
        };

        let mut instance_ids = Vec::with_capacity(producer_ids.len());
        for producer_id in producer_ids {
            let producer = self
                .project
                .producer(producer_id)
                .ok_or_else(|| MutationError::ProducerNotFound(producer_id.clone()))?;
            let duration = options.duration.unwrap_or_else(|| producer.duration());
            if duration <= 0 {
                return Err(MutationError::invalid("duration must be > 0"));
            }

            let clip = ClipSegment::new(producer_id.as_str(), 0, Some(duration - 1));
            instance_ids.push(clip.instance_id.clone());
            track.segments.insert(Segment::Clip(clip), cursor, false)?;
            cursor += duration + options.gap;
        }
        self.commit(&track);

        info!(track = track_id, clips = instance_ids.len(), "stitched clips");
        Ok(instance_ids)
    }

    /// Apply several moves as one unit. Returns the number of clips moved.
    pub fn batch_move(&mut self, moves: &[ClipMove]) -> Result<usize, MutationError> {
        let checkpoint = self.project.clone();
        let mut moved = 0;
        for m in moves {
            match self.move_clip(&m.clip_ref, &m.track_id, m.position, m.allow_overlap) {
                Ok(true) => moved += 1,
                Ok(false) => {}
                Err(e) => {
                    *self.project = checkpoint;
                    return Err(e);
                }
            }
        }
        Ok(moved)
    }

    /// Last occupied frame plus one
    pub fn timeline_duration(&self) -> Result<Frame, MutationError> {
        self.project.timeline_duration()
    }

    /// Set every tractor's `out` to the last clip frame. Returns that frame.
    pub fn recalculate_bounds(&mut self) -> Result<Frame, MutationError> {
        let out = self
            .project
            .clips(None)?
            .iter()
            .map(|c| c.end)
            .max()
            .unwrap_or(0);

        let doc = self.project.document_mut();
        for tractor in doc.find_all("tractor") {
            doc.set_attr(tractor, "out", out.to_string());
            if doc.attr(tractor, "in").is_none() {
                doc.set_attr(tractor, "in", "0");
            }
        }
        self.project.touch();

        debug!(out, "recalculated timeline bounds");
        Ok(out)
    }

    fn load(&self, track_id: &str) -> Result<Loaded, MutationError> {
        let playlist = self.project.playlist_node(track_id)?;
        let segments = read_track(self.project.document(), playlist, track_id)?;
        Ok(Loaded { playlist, segments })
    }

    /// Load the track holding `instance_id`
    fn locate(&mut self, instance_id: &str) -> Result<Loaded, MutationError> {
        if let Some(track_id) = self.project.index().track_of(instance_id).map(str::to_string) {
            if let Ok(track) = self.load(&track_id) {
                if track.segments.contains_clip(instance_id) {
                    return Ok(track);
                }
            }
            warn!(clip = instance_id, track = %track_id, "stale clip index entry, rebuilding");
        }

        self.project.reindex();
        match self.project.index().track_of(instance_id).map(str::to_string) {
            Some(track_id) => self.load(&track_id),
            None => Err(MutationError::ClipNotFound(instance_id.to_string())),
        }
    }

    fn commit(&mut self, track: &Loaded) {
        let doc = self.project.document_mut();
        write_track(doc, track.playlist, &track.segments);

        let refreshed = read_track(doc, track.playlist, &track.segments.track_id);
        match refreshed {
            Ok(segments) => self.project.index_mut().update_track(&segments),
            Err(_) => self.project.index_mut().update_track(&track.segments),
        }
        self.project.touch();
    }
}

fn check_range(in_point: Frame, out_point: Option<Frame>) -> Result<(), MutationError> {
    if in_point < 0 || out_point.map_or(false, |o| o < 0) {
        return Err(MutationError::invalid("in and out points must be non-negative"));
    }
    if let Some(out) = out_point {
        if out < in_point {
            return Err(MutationError::invalid(format!("out point {} is before in point {}", out, in_point)));
        }
    }
    Ok(())
}
