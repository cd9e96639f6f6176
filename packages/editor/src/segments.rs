//! # Track Segments
//!
//! A track is an ordered sequence of [`Segment`]s: clip instances and gaps
//! laid end to end from frame 0. This module holds the position-indexed
//! algebra over that sequence and the mapping to and from a playlist's
//! `<entry>`/`<blank>` children.
//!
//! Every operation works on the in-memory sequence, validates before it
//! touches anything and re-normalizes before it returns, so a failed call
//! leaves the sequence exactly as it was. After every public operation:
//!
//! - no gap has length 0
//! - no two gaps are adjacent
//! - clip starts are the running sum of preceding durations

use crate::ids::{new_instance_id, synthesized_instance_id, CLIP_REF_PROPERTY, CONTINUES_PROPERTY};
use crate::model::{range_duration, Frame, TimelineClip};
use crate::mutations::MutationError;
use crate::project::{property_text, remove_property, set_property};
use serde::Serialize;
use splice_document::{NodeId, XmlDocument};
use std::collections::HashSet;

/// One element of a track
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Segment {
    Gap { length: Frame },
    Clip(ClipSegment),
}

/// A placed reference to a source range of a producer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipSegment {
    pub instance_id: String,
    pub producer: String,
    pub in_point: Frame,
    pub out_point: Option<Frame>,

    /// Id was synthesized from the entry's ordinal, not read from a marker
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub synthetic: bool,

    /// Left half this clip was cut from by `insert_gap`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub continues: Option<String>,

    /// Document node the clip was read from
    #[serde(skip)]
    pub origin: Option<NodeId>,
}

impl ClipSegment {
    /// New clip with a fresh instance id
    pub fn new(producer: impl Into<String>, in_point: Frame, out_point: Option<Frame>) -> Self {
        Self {
            instance_id: new_instance_id(),
            producer: producer.into(),
            in_point,
            out_point,
            synthetic: false,
            continues: None,
            origin: None,
        }
    }

    pub fn duration(&self) -> Frame {
        range_duration(self.in_point, self.out_point)
    }

    /// Cut the source range so the left part spans `offset` frames
    fn cut(&self, offset: Frame) -> (ClipSegment, ClipSegment) {
        let left_out = self.in_point + offset - 1;

        let mut left = self.clone();
        left.out_point = Some(left_out);

        let mut right = self.clone();
        right.in_point = left_out + 1;
        right.out_point = self.out_point;

        (left, right)
    }
}

impl Segment {
    pub fn gap(length: Frame) -> Self {
        Segment::Gap { length }
    }

    pub fn duration(&self) -> Frame {
        match self {
            Segment::Gap { length } => *length,
            Segment::Clip(clip) => clip.duration(),
        }
    }

    pub fn is_gap(&self) -> bool {
        matches!(self, Segment::Gap { .. })
    }

    pub fn as_clip(&self) -> Option<&ClipSegment> {
        match self {
            Segment::Clip(clip) => Some(clip),
            Segment::Gap { .. } => None,
        }
    }

    fn as_clip_mut(&mut self) -> Option<&mut ClipSegment> {
        match self {
            Segment::Clip(clip) => Some(clip),
            Segment::Gap { .. } => None,
        }
    }
}

/// Instance ids produced by a split
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SplitOutcome {
    pub left: String,
    pub right: String,
}

/// The segment sequence of one track
#[derive(Debug, Clone, PartialEq)]
pub struct TrackSegments {
    pub track_id: String,
    pub segments: Vec<Segment>,
}

impl TrackSegments {
    /// Build a normalized sequence
    pub fn new(track_id: impl Into<String>, segments: Vec<Segment>) -> Self {
        let mut track = Self {
            track_id: track_id.into(),
            segments,
        };
        track.normalize();
        track
    }

    /// Total length in frames
    pub fn duration(&self) -> Frame {
        self.segments.iter().map(Segment::duration).sum()
    }

    /// Segments paired with their start frame
    pub fn placed(&self) -> impl Iterator<Item = (Frame, &Segment)> {
        self.segments.iter().scan(0, |cursor, segment| {
            let start = *cursor;
            *cursor += segment.duration();
            Some((start, segment))
        })
    }

    /// Start frame of the segment at `index`
    pub fn position_of(&self, index: usize) -> Frame {
        self.segments[..index].iter().map(Segment::duration).sum()
    }

    pub fn find_clip(&self, instance_id: &str) -> Option<usize> {
        self.segments
            .iter()
            .position(|s| s.as_clip().map_or(false, |c| c.instance_id == instance_id))
    }

    pub fn contains_clip(&self, instance_id: &str) -> bool {
        self.find_clip(instance_id).is_some()
    }

    pub fn clips(&self) -> impl Iterator<Item = &ClipSegment> {
        self.segments.iter().filter_map(Segment::as_clip)
    }

    /// Placed clips, in track order
    pub fn timeline_clips(&self) -> Vec<TimelineClip> {
        self.placed()
            .filter_map(|(start, segment)| {
                segment.as_clip().map(|clip| TimelineClip {
                    instance_id: clip.instance_id.clone(),
                    producer_id: clip.producer.clone(),
                    track_id: self.track_id.clone(),
                    in_point: clip.in_point,
                    out_point: clip.out_point,
                    start,
                    end: start + clip.duration() - 1,
                })
            })
            .collect()
    }

    /// Drop zero-length gaps and merge adjacent ones
    pub fn normalize(&mut self) {
        let mut normalized: Vec<Segment> = Vec::with_capacity(self.segments.len());
        for segment in self.segments.drain(..) {
            match segment {
                Segment::Gap { length } if length <= 0 => {}
                Segment::Gap { length } => match normalized.last_mut() {
                    Some(Segment::Gap { length: previous }) => *previous += length,
                    _ => normalized.push(Segment::Gap { length }),
                },
                clip => normalized.push(clip),
            }
        }
        self.segments = normalized;
    }

    pub fn is_normalized(&self) -> bool {
        let no_empty = self.segments.iter().all(|s| !matches!(s, Segment::Gap { length } if *length <= 0));
        let no_adjacent = self.segments.windows(2).all(|w| !(w[0].is_gap() && w[1].is_gap()));
        no_empty && no_adjacent
    }

    /// Place `segment` at `position`.
    ///
    /// Inside a gap the gap is split around the segment and keeps its full
    /// length, so everything after shifts later by the segment's duration.
    /// At a boundary the segment goes before whatever starts there; past the
    /// end the track is padded. Inside a clip this fails with `Overlap` unless
    /// `allow_overlap` is set, in which case the segment goes right after
    /// that clip.
    pub fn insert(&mut self, segment: Segment, position: Frame, allow_overlap: bool) -> Result<(), MutationError> {
        check_position(position)?;
        if let Segment::Gap { length } = &segment {
            check_length(*length)?;
        }

        let mut cursor = 0;
        for index in 0..self.segments.len() {
            let duration = self.segments[index].duration();

            if self.segments[index].is_gap() {
                if position < cursor + duration {
                    let before = position - cursor;
                    let after = duration - before;
                    self.segments
                        .splice(index..=index, [Segment::gap(before), segment, Segment::gap(after)]);
                    self.normalize();
                    return Ok(());
                }
            } else if position == cursor {
                self.segments.insert(index, segment);
                self.normalize();
                return Ok(());
            } else if position < cursor + duration {
                if !allow_overlap {
                    return Err(MutationError::Overlap {
                        track: self.track_id.clone(),
                        position,
                        clip: self.clip_id_at(index),
                    });
                }
                self.segments.insert(index + 1, segment);
                self.normalize();
                return Ok(());
            }

            cursor += duration;
        }

        if position > cursor {
            self.segments.push(Segment::gap(position - cursor));
        }
        self.segments.push(segment);
        self.normalize();
        Ok(())
    }

    /// Take a clip out of the track.
    ///
    /// Without `close_gap` a gap of the clip's length takes its place and
    /// nothing else moves; with it, everything after shifts earlier.
    pub fn remove(&mut self, instance_id: &str, close_gap: bool) -> Result<ClipSegment, MutationError> {
        let index = self.require_clip(instance_id)?;
        let removed = if close_gap {
            self.segments.remove(index)
        } else {
            let length = self.segments[index].duration();
            std::mem::replace(&mut self.segments[index], Segment::gap(length))
        };
        self.normalize();

        match removed {
            Segment::Clip(clip) => Ok(clip),
            Segment::Gap { .. } => Err(MutationError::ClipNotFound(instance_id.to_string())),
        }
    }

    /// Change a clip's source bounds in place. Neighbours are not reflowed.
    ///
    /// An omitted bound keeps its current value. Returns whether anything
    /// changed.
    pub fn trim(&mut self, instance_id: &str, new_in: Option<Frame>, new_out: Option<Frame>) -> Result<bool, MutationError> {
        let index = self.require_clip(instance_id)?;
        if new_in.map_or(false, |v| v < 0) || new_out.map_or(false, |v| v < 0) {
            return Err(MutationError::invalid("in and out points must be non-negative"));
        }

        let clip = self.segments[index]
            .as_clip_mut()
            .ok_or_else(|| MutationError::ClipNotFound(instance_id.to_string()))?;
        let target_in = new_in.unwrap_or(clip.in_point);
        let target_out = new_out.or(clip.out_point);
        if let Some(out) = target_out {
            if out < target_in {
                return Err(MutationError::invalid(format!(
                    "out point {} is before in point {}",
                    out, target_in
                )));
            }
        }

        let changed = target_in != clip.in_point || target_out != clip.out_point;
        clip.in_point = target_in;
        clip.out_point = target_out;
        Ok(changed)
    }

    /// Cut a clip in two at a timeline position.
    ///
    /// `position` must satisfy `start < position <= end`. Both halves get
    /// fresh ids.
    pub fn split(&mut self, instance_id: &str, position: Frame) -> Result<SplitOutcome, MutationError> {
        let index = self.require_clip(instance_id)?;
        let start = self.position_of(index);
        let clip = self.segments[index]
            .as_clip()
            .ok_or_else(|| MutationError::ClipNotFound(instance_id.to_string()))?;
        let end = start + clip.duration() - 1;

        if position <= start || position > end {
            return Err(MutationError::invalid(format!(
                "split position {} is outside clip range ({}, {}]",
                position, start, end
            )));
        }

        let (mut left, mut right) = clip.cut(position - start);
        for half in [&mut left, &mut right] {
            half.instance_id = new_instance_id();
            half.synthetic = false;
            half.continues = None;
        }
        let outcome = SplitOutcome {
            left: left.instance_id.clone(),
            right: right.instance_id.clone(),
        };

        self.segments
            .splice(index..=index, [Segment::Clip(left), Segment::Clip(right)]);
        Ok(outcome)
    }

    /// Shift everything at or after `position` later by `length` frames.
    ///
    /// A clip straddling `position` is cut: the left half keeps its id, the
    /// right half gets a fresh id linked back to the left one.
    pub fn insert_gap(&mut self, position: Frame, length: Frame) -> Result<(), MutationError> {
        check_position(position)?;
        check_length(length)?;
        if self.duration().max(position).checked_add(length).is_none() {
            return Err(MutationError::invalid(format!("gap of {} frames overflows the track", length)));
        }

        let mut cursor = 0;
        for index in 0..self.segments.len() {
            let duration = self.segments[index].duration();

            if let Segment::Gap { length: existing } = &mut self.segments[index] {
                if position < cursor + duration {
                    *existing += length;
                    return Ok(());
                }
            } else if position == cursor {
                self.segments.insert(index, Segment::gap(length));
                self.normalize();
                return Ok(());
            } else if position < cursor + duration {
                if let Some(clip) = self.segments[index].as_clip() {
                    let (left, mut right) = clip.cut(position - cursor);
                    right.instance_id = new_instance_id();
                    right.synthetic = false;
                    right.continues = Some(left.instance_id.clone());
                    self.segments.splice(
                        index..=index,
                        [Segment::Clip(left), Segment::gap(length), Segment::Clip(right)],
                    );
                }
                return Ok(());
            }

            cursor += duration;
        }

        if position > cursor {
            self.segments.push(Segment::gap(position - cursor));
        }
        self.segments.push(Segment::gap(length));
        self.normalize();
        Ok(())
    }

    /// Delete every gap, pulling later clips earlier.
    ///
    /// Halves left by `insert_gap` are joined back into one clip when a gap
    /// removed here was all that separated them. Returns the number of
    /// frames removed.
    pub fn remove_all_gaps(&mut self) -> Frame {
        let removed: Frame = self
            .segments
            .iter()
            .filter(|s| s.is_gap())
            .map(Segment::duration)
            .sum();

        let mut joined: Vec<Segment> = Vec::with_capacity(self.segments.len());
        let mut gap_dropped = false;
        for segment in self.segments.drain(..) {
            let clip = match segment {
                Segment::Gap { .. } => {
                    gap_dropped = true;
                    continue;
                }
                Segment::Clip(clip) => clip,
            };
            let rejoin = gap_dropped
                && matches!(joined.last(), Some(Segment::Clip(previous)) if continues_from(previous, &clip));
            gap_dropped = false;

            if rejoin {
                if let Some(Segment::Clip(previous)) = joined.last_mut() {
                    previous.out_point = clip.out_point;
                    continue;
                }
            }
            joined.push(Segment::Clip(clip));
        }
        self.segments = joined;
        removed
    }

    fn require_clip(&self, instance_id: &str) -> Result<usize, MutationError> {
        self.find_clip(instance_id)
            .ok_or_else(|| MutationError::ClipNotFound(instance_id.to_string()))
    }

    fn clip_id_at(&self, index: usize) -> String {
        self.segments[index]
            .as_clip()
            .map(|c| c.instance_id.clone())
            .unwrap_or_default()
    }
}

fn continues_from(left: &ClipSegment, right: &ClipSegment) -> bool {
    right.continues.as_deref() == Some(left.instance_id.as_str())
        && right.producer == left.producer
        && left.out_point.map(|out| out + 1) == Some(right.in_point)
}

fn check_position(position: Frame) -> Result<(), MutationError> {
    if position < 0 {
        return Err(MutationError::invalid(format!("position must be >= 0, got {}", position)));
    }
    Ok(())
}

fn check_length(length: Frame) -> Result<(), MutationError> {
    if length <= 0 {
        return Err(MutationError::invalid(format!("length must be > 0, got {}", length)));
    }
    Ok(())
}

fn is_segment_tag(tag: &str) -> bool {
    tag == "blank" || tag == "entry"
}

fn frame_attr(doc: &XmlDocument, node: NodeId, name: &str) -> Result<Option<Frame>, MutationError> {
    match doc.attr(node, name) {
        None => Ok(None),
        Some(raw) => raw.trim().parse::<Frame>().map(Some).map_err(|_| {
            MutationError::invalid(format!(
                "<{}> has a malformed '{}' value: {:?}",
                doc.tag(node),
                name,
                raw
            ))
        }),
    }
}

/// Read a playlist's children as a normalized segment sequence.
///
/// Children other than `<blank>` and `<entry>` are skipped.
pub fn read_track(doc: &XmlDocument, playlist: NodeId, track_id: &str) -> Result<TrackSegments, MutationError> {
    let mut segments = Vec::new();
    let mut ordinal = 0;

    for &child in doc.children(playlist) {
        match doc.tag(child) {
            "blank" => {
                let length = frame_attr(doc, child, "length")?.unwrap_or(0);
                segments.push(Segment::gap(length));
            }
            "entry" => {
                let marker = property_text(doc, child, CLIP_REF_PROPERTY).map(str::to_string);
                let synthetic = marker.is_none();
                let instance_id = marker.unwrap_or_else(|| synthesized_instance_id(track_id, ordinal));
                ordinal += 1;

                segments.push(Segment::Clip(ClipSegment {
                    instance_id,
                    producer: doc.attr(child, "producer").unwrap_or_default().to_string(),
                    in_point: frame_attr(doc, child, "in")?.unwrap_or(0),
                    out_point: frame_attr(doc, child, "out")?,
                    synthetic,
                    continues: property_text(doc, child, CONTINUES_PROPERTY).map(str::to_string),
                    origin: Some(child),
                }));
            }
            _ => {}
        }
    }

    Ok(TrackSegments::new(track_id, segments))
}

/// Replace a playlist's segment children with `track`.
///
/// Clip nodes are reused so their other attributes and children survive;
/// a node that appears twice is cloned for the second use. Non-segment
/// children ahead of the first segment stay in front, the rest follow.
pub fn write_track(doc: &mut XmlDocument, playlist: NodeId, track: &TrackSegments) {
    let existing = doc.children(playlist).to_vec();
    let first_segment = existing
        .iter()
        .position(|c| is_segment_tag(doc.tag(*c)))
        .unwrap_or(existing.len());
    let (leading, trailing): (Vec<(usize, NodeId)>, Vec<(usize, NodeId)>) = existing
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, c)| !is_segment_tag(doc.tag(*c)))
        .partition(|(i, _)| *i < first_segment);

    let mut children: Vec<NodeId> = leading.into_iter().map(|(_, c)| c).collect();
    let mut used = HashSet::new();

    for segment in &track.segments {
        let node = match segment {
            Segment::Gap { length } => doc.create_element_with("blank", &[("length", &length.to_string())]),
            Segment::Clip(clip) => {
                let node = match clip.origin {
                    Some(origin) if used.insert(origin) => origin,
                    Some(origin) => doc.deep_clone(origin),
                    None => doc.create_element("entry"),
                };
                write_clip(doc, node, clip);
                node
            }
        };
        children.push(node);
    }

    children.extend(trailing.into_iter().map(|(_, c)| c));
    doc.set_children(playlist, children);
}

fn write_clip(doc: &mut XmlDocument, node: NodeId, clip: &ClipSegment) {
    doc.set_attr(node, "producer", clip.producer.as_str());
    doc.set_attr(node, "in", clip.in_point.to_string());
    match clip.out_point {
        Some(out) => doc.set_attr(node, "out", out.to_string()),
        None => {
            doc.remove_attr(node, "out");
        }
    }

    if clip.synthetic {
        remove_property(doc, node, CLIP_REF_PROPERTY);
    } else {
        set_property(doc, node, CLIP_REF_PROPERTY, &clip.instance_id);
    }
    match &clip.continues {
        Some(left) => set_property(doc, node, CONTINUES_PROPERTY, left),
        None => remove_property(doc, node, CONTINUES_PROPERTY),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn clip(id: &str, in_point: Frame, out_point: Frame) -> Segment {
        Segment::Clip(ClipSegment {
            instance_id: id.to_string(),
            producer: "producer1".to_string(),
            in_point,
            out_point: Some(out_point),
            synthetic: false,
            continues: None,
            origin: None,
        })
    }

    /// `[A(10), Gap(5), B(10)]`
    fn sample() -> TrackSegments {
        TrackSegments::new("playlist0", vec![clip("A", 0, 9), Segment::gap(5), clip("B", 0, 9)])
    }

    fn starts(track: &TrackSegments) -> Vec<(String, Frame)> {
        track
            .timeline_clips()
            .into_iter()
            .map(|c| (c.instance_id, c.start))
            .collect()
    }

    #[test]
    fn test_normalize_merges_and_drops_gaps() {
        let track = TrackSegments::new(
            "t",
            vec![Segment::gap(0), Segment::gap(3), Segment::gap(4), clip("A", 0, 1), Segment::gap(-2)],
        );
        assert_eq!(track.segments, vec![Segment::gap(7), clip("A", 0, 1)]);
        assert!(track.is_normalized());
    }

    #[test]
    fn test_insert_gap_grows_existing_gap_then_ripple_remove() {
        let mut track = sample();
        track.insert_gap(10, 3).unwrap();
        assert_eq!(track.segments, vec![clip("A", 0, 9), Segment::gap(8), clip("B", 0, 9)]);

        let removed = track.remove("A", true).unwrap();
        assert_eq!(removed.instance_id, "A");
        assert_eq!(track.segments, vec![Segment::gap(8), clip("B", 0, 9)]);
        assert_eq!(starts(&track), vec![("B".to_string(), 8)]);
    }

    #[test]
    fn test_remove_without_close_gap_keeps_positions() {
        let mut track = sample();
        track.remove("A", false).unwrap();
        assert_eq!(track.segments, vec![Segment::gap(15), clip("B", 0, 9)]);
        assert_eq!(starts(&track), vec![("B".to_string(), 15)]);
    }

    #[test]
    fn test_insert_into_gap_splits_it() {
        let mut track = sample();
        assert_eq!(starts(&track)[1], ("B".to_string(), 15));

        track.insert(clip("C", 0, 1), 12, false).unwrap();
        assert_eq!(
            track.segments,
            vec![clip("A", 0, 9), Segment::gap(2), clip("C", 0, 1), Segment::gap(3), clip("B", 0, 9)]
        );
        assert_eq!(starts(&track)[2], ("B".to_string(), 17));
    }

    #[test]
    fn test_insert_at_gap_start_pushes_gap_later() {
        let mut track = sample();
        track.insert(clip("C", 0, 4), 10, false).unwrap();
        assert_eq!(
            track.segments,
            vec![clip("A", 0, 9), clip("C", 0, 4), Segment::gap(5), clip("B", 0, 9)]
        );
        assert_eq!(starts(&track)[2], ("B".to_string(), 20));
    }

    #[test]
    fn test_insert_at_boundary_goes_before() {
        let mut track = sample();
        track.insert(clip("C", 0, 1), 0, false).unwrap();
        assert_eq!(starts(&track)[0], ("C".to_string(), 0));
        assert_eq!(starts(&track)[1], ("A".to_string(), 2));
    }

    #[test]
    fn test_insert_past_end_pads() {
        let mut track = sample();
        track.insert(clip("C", 0, 0), 40, false).unwrap();
        assert_eq!(track.segments[3], Segment::gap(15));
        assert_eq!(starts(&track)[2], ("C".to_string(), 40));
    }

    #[test]
    fn test_insert_inside_clip_overlaps() {
        let mut track = sample();
        let err = track.insert(clip("C", 0, 1), 4, false).unwrap_err();
        assert!(matches!(err, MutationError::Overlap { ref clip, position: 4, .. } if clip == "A"));
        assert_eq!(track, sample());

        track.insert(clip("C", 0, 1), 4, true).unwrap();
        assert_eq!(starts(&track)[1], ("C".to_string(), 10));
    }

    #[test]
    fn test_insert_negative_position_is_invalid() {
        let mut track = sample();
        let err = track.insert(clip("C", 0, 1), -1, false).unwrap_err();
        assert!(matches!(err, MutationError::InvalidInput(_)));
    }

    #[test]
    fn test_split_partitions_source_range() {
        let mut track = TrackSegments::new("t", vec![clip("A", 0, 19)]);
        let outcome = track.split("A", 10).unwrap();
        assert_ne!(outcome.left, "A");
        assert_ne!(outcome.right, "A");
        assert_ne!(outcome.left, outcome.right);

        let clips: Vec<_> = track.clips().map(|c| (c.in_point, c.out_point)).collect();
        assert_eq!(clips, vec![(0, Some(9)), (10, Some(19))]);
        assert_eq!(track.duration(), 20);
    }

    #[test]
    fn test_split_bounds() {
        let mut track = TrackSegments::new("t", vec![Segment::gap(5), clip("A", 0, 9)]);
        assert!(matches!(track.split("A", 5), Err(MutationError::InvalidInput(_))));
        assert!(matches!(track.split("A", 15), Err(MutationError::InvalidInput(_))));
        assert!(matches!(track.split("B", 7), Err(MutationError::ClipNotFound(_))));

        // last frame is a valid split point
        track.split("A", 14).unwrap();
        let durations: Vec<_> = track.clips().map(ClipSegment::duration).collect();
        assert_eq!(durations, vec![9, 1]);
    }

    #[test]
    fn test_trim_validates_and_reports_change() {
        let mut track = sample();
        assert!(track.trim("A", Some(2), Some(5)).unwrap());
        assert!(!track.trim("A", Some(2), Some(5)).unwrap());
        assert_eq!(track.duration(), 19);

        assert!(matches!(track.trim("A", Some(6), None), Err(MutationError::InvalidInput(_))));
        assert!(matches!(track.trim("A", Some(-1), None), Err(MutationError::InvalidInput(_))));
    }

    #[test]
    fn test_insert_gap_inside_clip_round_trips() {
        let original = TrackSegments::new("t", vec![clip("A", 0, 19), clip("B", 5, 9)]);
        let mut track = original.clone();

        track.insert_gap(7, 4).unwrap();
        assert_eq!(track.segments.len(), 4);
        assert_eq!(track.segments[0], clip("A", 0, 6));
        assert_eq!(track.segments[1], Segment::gap(4));
        let right = track.segments[2].as_clip().unwrap();
        assert_eq!((right.in_point, right.out_point), (7, Some(19)));
        assert_eq!(right.continues.as_deref(), Some("A"));

        assert_eq!(track.remove_all_gaps(), 4);
        assert_eq!(track, original);
    }

    #[test]
    fn test_insert_gap_past_end_and_invalid_length() {
        let mut track = TrackSegments::new("t", vec![clip("A", 0, 9)]);
        track.insert_gap(15, 5).unwrap();
        assert_eq!(track.segments, vec![clip("A", 0, 9), Segment::gap(10)]);

        assert!(matches!(track.insert_gap(0, 0), Err(MutationError::InvalidInput(_))));
        assert!(matches!(track.insert_gap(-3, 1), Err(MutationError::InvalidInput(_))));
    }

    #[test]
    fn test_insert_gap_rejects_overflowing_length() {
        let mut track = sample();
        assert!(matches!(track.insert_gap(12, Frame::MAX), Err(MutationError::InvalidInput(_))));
        assert!(matches!(track.insert_gap(Frame::MAX - 1, 2), Err(MutationError::InvalidInput(_))));
        assert_eq!(track, sample());
    }

    #[test]
    fn test_remove_all_gaps_is_idempotent() {
        let mut track = sample();
        assert_eq!(track.remove_all_gaps(), 5);
        assert_eq!(track.remove_all_gaps(), 0);
        assert_eq!(starts(&track), vec![("A".to_string(), 0), ("B".to_string(), 10)]);
    }

    #[test]
    fn test_remove_all_gaps_without_gaps_keeps_identities() {
        let mut track = TrackSegments::new("t", vec![clip("A", 0, 19)]);
        track.insert_gap(7, 4).unwrap();
        track.insert(clip("C", 0, 1), 7, false).unwrap();
        assert_eq!(track.remove_all_gaps(), 4);

        // the halves stay apart while C sits between them
        assert_eq!(track.clips().count(), 3);
        track.remove("C", true).unwrap();
        let before = track.clone();

        assert_eq!(track.remove_all_gaps(), 0);
        assert_eq!(track, before);
        assert_eq!(track.clips().count(), 2);
    }

    #[test]
    fn test_read_write_preserves_unknown_children() {
        let mut doc = splice_document::parse(
            r#"<mlt><playlist id="playlist0">
                <property name="kdenlive:track_name">V1</property>
                <entry producer="p1" in="0" out="9"><filter id="f1"/></entry>
                <blank length="5"/>
                <entry producer="p2" in="0" out="4"/>
                <transition id="x"/>
            </playlist></mlt>"#,
        )
        .unwrap();
        let playlist = doc.children(doc.root())[0];

        let mut track = read_track(&doc, playlist, "playlist0").unwrap();
        let ids: Vec<_> = track.clips().map(|c| c.instance_id.clone()).collect();
        assert_eq!(ids, vec!["playlist0:0", "playlist0:1"]);
        assert!(track.clips().all(|c| c.synthetic));

        track.remove("playlist0:1", true).unwrap();
        track.insert(Segment::Clip(ClipSegment::new("p3", 0, Some(2))), 0, false).unwrap();
        write_track(&mut doc, playlist, &track);

        let tags: Vec<_> = doc.children(playlist).iter().map(|c| doc.tag(*c)).collect();
        assert_eq!(tags, vec!["property", "entry", "entry", "blank", "transition"]);

        let reread = read_track(&doc, playlist, "playlist0").unwrap();
        assert_eq!(reread.duration(), 18);
        let moved = doc.children(playlist)[2];
        assert_eq!(doc.attr(moved, "producer"), Some("p1"));
        assert!(doc.find_child(moved, "filter", "id", "f1").is_some());
    }

    #[test]
    fn test_read_rejects_malformed_numbers() {
        let doc = splice_document::parse(r#"<playlist id="t"><entry producer="p" in="x" out="3"/></playlist>"#).unwrap();
        let err = read_track(&doc, doc.root(), "t").unwrap_err();
        assert!(matches!(err, MutationError::InvalidInput(_)));
    }

    #[test]
    fn test_written_markers_survive_reread() {
        let mut doc = splice_document::parse(r#"<playlist id="t"><entry producer="p" in="0" out="19"/></playlist>"#).unwrap();
        let playlist = doc.root();
        let mut track = read_track(&doc, playlist, "t").unwrap();
        let outcome = track.split("t:0", 10).unwrap();
        write_track(&mut doc, playlist, &track);

        let reread = read_track(&doc, playlist, "t").unwrap();
        let ids: Vec<_> = reread.clips().map(|c| c.instance_id.clone()).collect();
        assert_eq!(ids, vec![outcome.left, outcome.right]);
        assert_eq!(doc.children(playlist).len(), 2);
    }
}
