//! Track management on the main tractor

use crate::model::TrackKind;
use crate::mutations::MutationError;
use crate::project::{set_property, Project};
use splice_document::{NodeId, XmlDocument};
use tracing::info;

const TRACK_NAME_PROPERTY: &str = "kdenlive:track_name";

/// Result of a track edit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackEdit {
    pub track_id: String,
    pub index: usize,
    pub changed: bool,
}

fn tractor(project: &Project) -> Result<NodeId, MutationError> {
    project
        .main_tractor()
        .ok_or_else(|| MutationError::invalid("project has no timeline tractor"))
}

fn track_elements(doc: &XmlDocument, tractor: NodeId) -> Vec<NodeId> {
    doc.child_elements(tractor, "track").collect()
}

/// Create a playlist and reference it from the main tractor.
///
/// An existing playlist with the requested id is left alone.
pub fn add_track(
    project: &mut Project,
    track_id: Option<&str>,
    kind: TrackKind,
    name: Option<&str>,
    index: Option<usize>,
) -> Result<TrackEdit, MutationError> {
    let tractor = tractor(project)?;
    let doc = project.document();
    let tracks = track_elements(doc, tractor);

    let track_id = match track_id {
        Some(id) => id.to_string(),
        None => {
            let mut n = 0;
            while doc.find_first("playlist", "id", &format!("playlist{}", n)).is_some() {
                n += 1;
            }
            format!("playlist{}", n)
        }
    };
    if doc.find_first("playlist", "id", &track_id).is_some() {
        let index = tracks
            .iter()
            .position(|t| doc.attr(*t, "producer") == Some(track_id.as_str()))
            .unwrap_or(tracks.len());
        return Ok(TrackEdit {
            track_id,
            index,
            changed: false,
        });
    }

    let index = index.unwrap_or(tracks.len());
    if index > tracks.len() {
        return Err(MutationError::invalid(format!(
            "index must be between 0 and {}",
            tracks.len()
        )));
    }

    // the playlist has to be defined before the tractor that uses it
    let root = doc.root();
    let mut top = tractor;
    while let Some(parent) = doc.parent(top).filter(|p| *p != root) {
        top = parent;
    }
    let anchor = doc.children(root).iter().position(|c| *c == top);

    let doc = project.document_mut();
    let playlist = doc.create_element_with("playlist", &[("id", &track_id)]);
    set_property(doc, playlist, TRACK_NAME_PROPERTY, name.unwrap_or(&track_id));
    match anchor {
        Some(position) => doc.insert_child(root, position, playlist),
        None => doc.append_child(root, playlist),
    }

    let track = doc.create_element_with("track", &[("producer", &track_id), ("hide", kind.hide_attr())]);
    match tracks.get(index) {
        Some(next) => {
            let position = doc.children(tractor).iter().position(|c| c == next).unwrap_or(0);
            doc.insert_child(tractor, position, track);
        }
        None => doc.append_child(tractor, track),
    }
    project.touch();

    info!(track = %track_id, ?kind, index, "added track");
    Ok(TrackEdit {
        track_id,
        index,
        changed: true,
    })
}

/// Remove a track and its playlist.
///
/// A track holding clips is only removed with `force`; an unknown track
/// is a no-op.
pub fn remove_track(project: &mut Project, track_id: &str, force: bool) -> Result<TrackEdit, MutationError> {
    let doc = project.document();
    let Some(playlist) = doc.find_first("playlist", "id", track_id) else {
        return Ok(TrackEdit {
            track_id: track_id.to_string(),
            index: 0,
            changed: false,
        });
    };

    let has_clips = doc.child_elements(playlist, "entry").next().is_some();
    if has_clips && !force {
        return Err(MutationError::Conflict(format!(
            "track '{}' is not empty; set force to remove it",
            track_id
        )));
    }

    let index = project
        .tracks()
        .iter()
        .position(|t| t.id == track_id)
        .unwrap_or(0);
    let references: Vec<NodeId> = doc
        .find_all("track")
        .into_iter()
        .filter(|t| doc.attr(*t, "producer") == Some(track_id))
        .collect();

    let doc = project.document_mut();
    for track in references {
        doc.detach(track);
    }
    doc.detach(playlist);
    project.index_mut().remove_track(track_id);
    project.touch();

    info!(track = track_id, force, "removed track");
    Ok(TrackEdit {
        track_id: track_id.to_string(),
        index,
        changed: true,
    })
}

/// Move a track to another position among the main tractor's tracks
pub fn reorder_track(project: &mut Project, track_id: &str, new_index: usize) -> Result<TrackEdit, MutationError> {
    let tractor = tractor(project)?;
    let doc = project.document();
    let tracks = track_elements(doc, tractor);

    let current_index = tracks
        .iter()
        .position(|t| doc.attr(*t, "producer") == Some(track_id))
        .ok_or_else(|| MutationError::TrackNotFound(track_id.to_string()))?;
    if new_index >= tracks.len() {
        return Err(MutationError::invalid(format!(
            "index must be between 0 and {}",
            tracks.len() - 1
        )));
    }
    if current_index == new_index {
        return Ok(TrackEdit {
            track_id: track_id.to_string(),
            index: new_index,
            changed: false,
        });
    }

    let mut order = tracks.clone();
    let moved = order.remove(current_index);
    order.insert(new_index, moved);

    // refill the track slots in the new order, other children stay put
    let mut slots = order.into_iter();
    let children: Vec<NodeId> = doc
        .children(tractor)
        .iter()
        .map(|c| if tracks.contains(c) { slots.next().unwrap_or(*c) } else { *c })
        .collect();

    project.document_mut().set_children(tractor, children);
    project.touch();

    info!(track = track_id, from = current_index, to = new_index, "reordered track");
    Ok(TrackEdit {
        track_id: track_id.to_string(),
        index: new_index,
        changed: true,
    })
}
