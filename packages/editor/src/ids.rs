//! Clip identity markers and id generation

use uuid::Uuid;

/// Property child carrying a clip's persistent instance id
pub const CLIP_REF_PROPERTY: &str = "splice:clip-ref";

/// Property child linking the right half of a gap-split clip to its left half
pub const CONTINUES_PROPERTY: &str = "splice:continues";

/// Fresh, project-unique instance id
pub fn new_instance_id() -> String {
    format!("clip_{}", Uuid::new_v4().simple())
}

/// Transient id for an entry that carries no marker.
///
/// Stable only while the track's entry order is unchanged.
pub fn synthesized_instance_id(track_id: &str, ordinal: usize) -> String {
    format!("{}:{}", track_id, ordinal)
}
