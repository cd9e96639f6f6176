//! # Project Handle
//!
//! A loaded MLT project document and its editing state.
//!
//! ## Lifecycle
//!
//! ```text
//! Load → Parse → Edit → Save
//!   ↓      ↓       ↓      ↓
//! File   Tree  Mutations File
//! ```
//!
//! The project owns the element tree, a version counter bumped on every
//! committed change and the [`ClipIndex`] used to resolve clip instance
//! ids to tracks.

use crate::assets::ApplyContext;
use crate::index::ClipIndex;
use crate::model::{Frame, Producer, ProjectInfo, TimelineClip, Track, TrackKind};
use crate::mutations::{Mutation, MutationError, MutationResult};
use crate::segments::{read_track, Segment, TrackSegments};
use crate::timeline::Timeline;
use crate::EditorError;
use splice_document::{parse, NodeId, XmlDocument};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Tractor holding the timeline when present
pub const PREVIEW_TRACTOR_ID: &str = "timeline_preview";

/// Playlist listing the project bin
pub const MAIN_BIN_ID: &str = "main_bin";

const GENERATION_PROPERTY: &str = "kdenlive:docproperties.generation";
const VERSION_PROPERTY: &str = "kdenlive:docproperties.version";
const DOC_PROPERTY_PREFIX: &str = "kdenlive:docproperties.";
const TRACK_NAME_PROPERTY: &str = "kdenlive:track_name";

/// Editable project document
#[derive(Debug, Clone)]
pub struct Project {
    /// Canonical location of the document
    pub path: PathBuf,

    /// Current version number (increments on each committed change)
    pub version: u64,

    doc: XmlDocument,
    index: ClipIndex,
    dirty: bool,
}

impl Project {
    /// Load project from file
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, EditorError> {
        let path = path.into();
        if !path.exists() {
            return Err(EditorError::ProjectNotFound(path));
        }
        let source = std::fs::read_to_string(&path)?;
        let project = Self::from_source(path, &source)?;
        info!(path = %project.path.display(), tracks = project.tracks().len(), "loaded project");
        Ok(project)
    }

    /// Create project from XML text
    pub fn from_source(path: impl Into<PathBuf>, source: &str) -> Result<Self, EditorError> {
        let doc = parse(source)?;
        check_root(&doc)?;

        let mut project = Self {
            path: path.into(),
            version: 0,
            doc,
            index: ClipIndex::default(),
            dirty: false,
        };
        project.reindex();
        Ok(project)
    }

    pub fn document(&self) -> &XmlDocument {
        &self.doc
    }

    pub(crate) fn document_mut(&mut self) -> &mut XmlDocument {
        &mut self.doc
    }

    pub(crate) fn index(&self) -> &ClipIndex {
        &self.index
    }

    pub(crate) fn index_mut(&mut self) -> &mut ClipIndex {
        &mut self.index
    }

    /// Check if project has unsaved changes
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Record a committed change
    pub(crate) fn touch(&mut self) {
        self.version += 1;
        self.dirty = true;
    }

    /// Write to the canonical location
    pub fn save(&mut self) -> Result<PathBuf, EditorError> {
        let path = self.path.clone();
        self.save_as(&path)?;
        self.dirty = false;
        Ok(path)
    }

    /// Write to another location. The canonical path is unchanged.
    pub fn save_as(&self, path: impl AsRef<Path>) -> Result<PathBuf, EditorError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_xml_string())?;
        debug!(path = %path.display(), version = self.version, "saved project");
        Ok(path.to_path_buf())
    }

    pub fn to_xml_string(&self) -> String {
        self.doc.to_xml_string()
    }

    /// Swap in new content, keeping the path
    pub fn replace_content(&mut self, source: &str) -> Result<(), EditorError> {
        let doc = parse(source)?;
        check_root(&doc)?;
        self.doc = doc;
        self.reindex();
        self.touch();
        Ok(())
    }

    /// Rebuild the clip index from every track
    pub fn reindex(&mut self) {
        let mut segments = Vec::new();
        for track in self.tracks() {
            match read_track(&self.doc, track.playlist, &track.id) {
                Ok(seq) => segments.push(seq),
                Err(e) => warn!(track = %track.id, error = %e, "skipping unreadable track while indexing"),
            }
        }
        self.index = ClipIndex::from_tracks(&segments);
        debug!(clips = self.index.len(), "rebuilt clip index");
    }

    /// Apply a mutation with default import settings
    pub fn apply(&mut self, mutation: &Mutation) -> Result<MutationResult, EditorError> {
        self.apply_with(mutation, &ApplyContext::default())
    }

    pub fn apply_with(&mut self, mutation: &Mutation, ctx: &ApplyContext) -> Result<MutationResult, EditorError> {
        let mut result = mutation.apply(self, ctx)?;
        result.version = self.version;
        Ok(result)
    }

    pub fn timeline(&mut self) -> Timeline<'_> {
        Timeline::new(self)
    }

    /// `timeline_preview` if present, else the last tractor
    pub fn main_tractor(&self) -> Option<NodeId> {
        let tractors = self.doc.find_all("tractor");
        tractors
            .iter()
            .copied()
            .find(|t| self.doc.attr(*t, "id") == Some(PREVIEW_TRACTOR_ID))
            .or_else(|| tractors.last().copied())
    }

    pub fn main_bin(&self) -> Option<NodeId> {
        self.doc.find_first("playlist", "id", MAIN_BIN_ID)
    }

    /// Timeline tracks, following sub-tractors
    pub fn tracks(&self) -> Vec<Track> {
        let mut tracks = Vec::new();
        if let Some(tractor) = self.main_tractor() {
            let mut visited = HashSet::new();
            self.collect_tracks(tractor, &mut tracks, &mut visited);
        }
        tracks
    }

    fn collect_tracks(&self, tractor: NodeId, tracks: &mut Vec<Track>, visited: &mut HashSet<NodeId>) {
        if !visited.insert(tractor) {
            return;
        }
        for track in self.doc.child_elements(tractor, "track") {
            let Some(producer) = self.doc.attr(track, "producer") else { continue };

            if let Some(playlist) = self.doc.find_first("playlist", "id", producer) {
                let kind = if self.doc.attr(track, "hide") == Some(TrackKind::Audio.hide_attr()) {
                    TrackKind::Audio
                } else {
                    TrackKind::Video
                };
                tracks.push(Track {
                    index: tracks.len(),
                    id: producer.to_string(),
                    kind,
                    name: property_text(&self.doc, playlist, TRACK_NAME_PROPERTY).map(str::to_string),
                    playlist,
                });
            } else if let Some(sub) = self.doc.find_first("tractor", "id", producer) {
                self.collect_tracks(sub, tracks, visited);
            }
        }
    }

    pub fn track(&self, track_id: &str) -> Option<Track> {
        self.tracks().into_iter().find(|t| t.id == track_id)
    }

    pub(crate) fn playlist_node(&self, track_id: &str) -> Result<NodeId, MutationError> {
        self.track(track_id)
            .map(|t| t.playlist)
            .ok_or_else(|| MutationError::TrackNotFound(track_id.to_string()))
    }

    /// Segment sequence of a track
    pub fn read_segments(&self, track_id: &str) -> Result<TrackSegments, MutationError> {
        let playlist = self.playlist_node(track_id)?;
        read_track(&self.doc, playlist, track_id)
    }

    pub fn list_segments(&self, track_id: &str) -> Result<Vec<Segment>, MutationError> {
        Ok(self.read_segments(track_id)?.segments)
    }

    pub fn producers(&self) -> Vec<Producer> {
        self.doc
            .find_all("producer")
            .into_iter()
            .map(|element| self.producer_from(element))
            .collect()
    }

    pub fn producer(&self, id: &str) -> Option<Producer> {
        self.doc
            .find_first("producer", "id", id)
            .map(|element| self.producer_from(element))
    }

    fn producer_from(&self, element: NodeId) -> Producer {
        let frame = |name: &str| self.doc.attr(element, name).and_then(|v| v.trim().parse::<Frame>().ok());
        Producer {
            id: self.doc.attr(element, "id").unwrap_or_default().to_string(),
            resource: property_text(&self.doc, element, "resource").map(str::to_string),
            in_point: frame("in").unwrap_or(0),
            out_point: frame("out"),
            element,
        }
    }

    /// Placed clips of one track, or of every track
    pub fn clips(&self, track_id: Option<&str>) -> Result<Vec<TimelineClip>, MutationError> {
        let mut clips = Vec::new();
        for track in self.tracks() {
            if track_id.map_or(false, |id| id != track.id) {
                continue;
            }
            clips.extend(read_track(&self.doc, track.playlist, &track.id)?.timeline_clips());
        }
        if let Some(id) = track_id {
            if clips.is_empty() && self.track(id).is_none() {
                return Err(MutationError::TrackNotFound(id.to_string()));
            }
        }
        Ok(clips)
    }

    /// Last occupied frame plus one
    pub fn timeline_duration(&self) -> Result<Frame, MutationError> {
        Ok(self.clips(None)?.iter().map(|c| c.end + 1).max().unwrap_or(0))
    }

    /// First `property[name]` anywhere in the document
    pub fn property(&self, name: &str) -> Option<&str> {
        self.doc
            .find_first("property", "name", name)
            .and_then(|p| self.doc.text(p))
    }

    pub fn generation(&self) -> u32 {
        self.property(GENERATION_PROPERTY)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(4)
    }

    pub fn format_version(&self) -> Option<&str> {
        self.property(VERSION_PROPERTY)
    }

    /// Frame rate from the profile, if it declares one
    pub fn fps(&self) -> Option<f64> {
        let profile = self.doc.find_all("profile").into_iter().next()?;
        let num: f64 = self.doc.attr(profile, "frame_rate_num")?.trim().parse().ok()?;
        let den: f64 = self
            .doc
            .attr(profile, "frame_rate_den")
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(1.0);
        (num > 0.0 && den > 0.0).then(|| num / den)
    }

    pub fn info(&self, default_fps: f64) -> Result<ProjectInfo, EditorError> {
        let mut properties = BTreeMap::new();
        for prop in self.doc.find_all("property") {
            let Some(name) = self.doc.attr(prop, "name") else { continue };
            if let Some(key) = name.strip_prefix(DOC_PROPERTY_PREFIX) {
                properties.insert(key.to_string(), self.doc.text(prop).unwrap_or_default().to_string());
            }
        }

        let clips = self.clips(None)?;
        Ok(ProjectInfo {
            path: self.path.clone(),
            generation: self.generation(),
            fps: self.fps().unwrap_or(default_fps),
            version: self.version,
            duration_frames: clips.iter().map(|c| c.end + 1).max().unwrap_or(0),
            tracks: self.tracks(),
            producers: self.producers(),
            clips,
            properties,
        })
    }
}

fn check_root(doc: &XmlDocument) -> Result<(), EditorError> {
    let tag = doc.tag(doc.root());
    if tag != "mlt" {
        return Err(EditorError::InvalidProject(format!(
            "root element must be 'mlt', found '{}'",
            tag
        )));
    }
    Ok(())
}

/// Text of the `<property name=..>` child of `node`
pub(crate) fn property_text<'a>(doc: &'a XmlDocument, node: NodeId, name: &str) -> Option<&'a str> {
    doc.find_child(node, "property", "name", name)
        .and_then(|p| doc.text(p))
}

pub(crate) fn set_property(doc: &mut XmlDocument, node: NodeId, name: &str, value: &str) {
    let prop = match doc.find_child(node, "property", "name", name) {
        Some(prop) => prop,
        None => {
            let prop = doc.create_element_with("property", &[("name", name)]);
            doc.append_child(node, prop);
            prop
        }
    };
    doc.set_text(prop, Some(value.to_string()));
}

pub(crate) fn remove_property(doc: &mut XmlDocument, node: NodeId, name: &str) {
    if let Some(prop) = doc.find_child(node, "property", "name", name) {
        doc.remove_child(node, prop);
    }
}
