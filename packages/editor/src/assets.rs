//! Producer creation: media imports and text titles

use crate::model::Frame;
use crate::mutations::MutationError;
use crate::project::{set_property, Project, MAIN_BIN_ID};
use serde::{Deserialize, Serialize};
use splice_document::{NodeId, XmlDocument};
use std::path::Path;
use tracing::{debug, info};

/// Frames used when a media duration cannot be determined
pub const DEFAULT_FALLBACK_FRAMES: Frame = 250;

/// Frame rate assumed when the profile declares none
pub const DEFAULT_FPS: f64 = 25.0;

/// Answers "how long is this media file", or unknown
pub trait MediaProbe {
    fn duration_seconds(&self, resource: &Path) -> Option<f64>;
}

/// Probe that never knows
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProbe;

impl MediaProbe for NoProbe {
    fn duration_seconds(&self, _resource: &Path) -> Option<f64> {
        None
    }
}

impl<F> MediaProbe for F
where
    F: Fn(&Path) -> Option<f64>,
{
    fn duration_seconds(&self, resource: &Path) -> Option<f64> {
        self(resource)
    }
}

static NO_PROBE: NoProbe = NoProbe;

/// Environment for mutations that create producers
pub struct ApplyContext<'a> {
    pub probe: &'a dyn MediaProbe,
    pub fallback_frames: Frame,
    pub default_fps: f64,
}

impl Default for ApplyContext<'static> {
    fn default() -> Self {
        Self {
            probe: &NO_PROBE,
            fallback_frames: DEFAULT_FALLBACK_FRAMES,
            default_fps: DEFAULT_FPS,
        }
    }
}

/// A new producer
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedProducer {
    pub producer_id: String,
    pub duration_frames: Frame,
}

/// Parameters of a text title
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextAsset {
    pub text: String,
    #[serde(default)]
    pub producer_id: Option<String>,
    #[serde(default = "default_text_frames")]
    pub duration_frames: Frame,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default = "default_background")]
    pub background: String,
    #[serde(default = "default_font")]
    pub font: String,
    #[serde(default = "default_size")]
    pub size: u32,
    /// Also place the title on this track
    #[serde(default)]
    pub track_id: Option<String>,
    #[serde(default)]
    pub position: Frame,
}

fn default_text_frames() -> Frame {
    90
}

fn default_color() -> String {
    "#ffffff".to_string()
}

fn default_background() -> String {
    "#00000000".to_string()
}

fn default_font() -> String {
    "DejaVu Sans".to_string()
}

fn default_size() -> u32 {
    64
}

impl TextAsset {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            producer_id: None,
            duration_frames: default_text_frames(),
            name: None,
            color: default_color(),
            background: default_background(),
            font: default_font(),
            size: default_size(),
            track_id: None,
            position: 0,
        }
    }
}

/// Register a media file as a producer and list it in the bin.
///
/// Duration comes from `duration_frames`, else the probe (converted at
/// the project frame rate), else the fallback.
pub fn import_media(
    project: &mut Project,
    resource: &str,
    producer_id: Option<&str>,
    duration_frames: Option<Frame>,
    ctx: &ApplyContext<'_>,
) -> Result<CreatedProducer, MutationError> {
    if resource.trim().is_empty() {
        return Err(MutationError::invalid("media path is required"));
    }
    let producer_id = claim_producer_id(project, producer_id, "producer")?;
    let main_bin = project
        .main_bin()
        .ok_or_else(|| MutationError::invalid("project is missing the main_bin playlist"))?;

    let duration = match duration_frames {
        Some(frames) if frames <= 0 => return Err(MutationError::invalid("duration_frames must be > 0")),
        Some(frames) => frames,
        None => {
            let fps = project.fps().unwrap_or(ctx.default_fps);
            match ctx.probe.duration_seconds(Path::new(resource)) {
                Some(seconds) => ((seconds * fps).round() as Frame).max(1),
                None => {
                    debug!(resource, fallback = ctx.fallback_frames, "media duration unknown");
                    ctx.fallback_frames.max(1)
                }
            }
        }
    };

    let clip_name = Path::new(resource)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| resource.to_string());
    let kdenlive_id = next_kdenlive_id(project.document());

    let doc = project.document_mut();
    let producer = new_producer(doc, &producer_id, duration);
    for (name, value) in [
        ("resource", resource.to_string()),
        ("mlt_service", "avformat".to_string()),
        ("kdenlive:clipname", clip_name),
        ("kdenlive:id", kdenlive_id),
        ("kdenlive:duration", duration.to_string()),
        ("length", duration.to_string()),
    ] {
        set_property(doc, producer, name, &value);
    }
    append_bin_entry(doc, main_bin, &producer_id, duration);
    project.touch();

    info!(producer = %producer_id, resource, duration, "imported media");
    Ok(CreatedProducer {
        producer_id,
        duration_frames: duration,
    })
}

/// Add a `qtext` title producer, optionally placing it on a track.
///
/// Returns the producer and the placed clip's instance id.
pub fn create_text(project: &mut Project, asset: &TextAsset) -> Result<(CreatedProducer, Option<String>), MutationError> {
    if asset.text.is_empty() {
        return Err(MutationError::invalid("text is required"));
    }
    if asset.duration_frames <= 0 {
        return Err(MutationError::invalid("duration_frames must be > 0"));
    }
    if let Some(track_id) = &asset.track_id {
        project.playlist_node(track_id)?;
    }
    let generated = format!("text_{}", &uuid::Uuid::new_v4().simple().to_string()[..12]);
    let requested = asset.producer_id.as_deref().unwrap_or(generated.as_str());
    let producer_id = claim_producer_id(project, Some(requested), "text")?;
    let main_bin = project
        .main_bin()
        .ok_or_else(|| MutationError::invalid("project is missing the main_bin playlist"))?;

    let duration = asset.duration_frames;
    let checkpoint = asset.track_id.as_ref().map(|_| project.clone());
    let kdenlive_id = next_kdenlive_id(project.document());
    let doc = project.document_mut();
    let producer = new_producer(doc, &producer_id, duration);
    for (name, value) in [
        ("resource", asset.text.clone()),
        ("mlt_service", "qtext".to_string()),
        ("kdenlive:clipname", asset.name.clone().unwrap_or_else(|| "Text".to_string())),
        ("kdenlive:id", kdenlive_id),
        ("kdenlive:duration", duration.to_string()),
        ("length", duration.to_string()),
        ("fgcolour", asset.color.clone()),
        ("bgcolour", asset.background.clone()),
        ("family", asset.font.clone()),
        ("size", asset.size.to_string()),
        ("halign", "center".to_string()),
        ("valign", "center".to_string()),
    ] {
        set_property(doc, producer, name, &value);
    }
    append_bin_entry(doc, main_bin, &producer_id, duration);
    project.touch();

    let clip_ref = match (&asset.track_id, checkpoint) {
        (Some(track_id), Some(checkpoint)) => {
            let placed = project
                .timeline()
                .add_clip(&producer_id, track_id, asset.position, 0, Some(duration - 1), false);
            match placed {
                Ok(clip_ref) => Some(clip_ref),
                Err(e) => {
                    *project = checkpoint;
                    return Err(e);
                }
            }
        }
        _ => None,
    };

    info!(producer = %producer_id, duration, placed = clip_ref.is_some(), "created text");
    Ok((
        CreatedProducer {
            producer_id,
            duration_frames: duration,
        },
        clip_ref,
    ))
}

/// Use the requested id if free, else the first free `{prefix}{n}`
fn claim_producer_id(project: &Project, requested: Option<&str>, prefix: &str) -> Result<String, MutationError> {
    let doc = project.document();
    let taken = |id: &str| doc.find_first("producer", "id", id).is_some();

    if let Some(id) = requested {
        if taken(id) {
            return Err(MutationError::invalid(format!("producer '{}' already exists", id)));
        }
        return Ok(id.to_string());
    }
    let mut n = 1;
    while taken(&format!("{}{}", prefix, n)) {
        n += 1;
    }
    Ok(format!("{}{}", prefix, n))
}

fn next_kdenlive_id(doc: &XmlDocument) -> String {
    let max = doc
        .find_all("property")
        .into_iter()
        .filter(|p| doc.attr(*p, "name") == Some("kdenlive:id"))
        .filter_map(|p| doc.text(p).and_then(|t| t.trim().parse::<u64>().ok()))
        .max()
        .unwrap_or(0);
    (max + 1).to_string()
}

/// Producers go ahead of the first playlist or tractor so they are
/// defined before anything references them.
fn new_producer(doc: &mut XmlDocument, id: &str, duration: Frame) -> NodeId {
    let out = (duration - 1).to_string();
    let producer = doc.create_element_with("producer", &[("id", id), ("in", "0"), ("out", &out)]);

    let root = doc.root();
    let anchor = doc
        .children(root)
        .iter()
        .position(|c| matches!(doc.tag(*c), "playlist" | "tractor"));
    match anchor {
        Some(index) => doc.insert_child(root, index, producer),
        None => doc.append_child(root, producer),
    }
    producer
}

fn append_bin_entry(doc: &mut XmlDocument, main_bin: NodeId, producer_id: &str, duration: Frame) {
    let out = (duration - 1).max(0).to_string();
    let entry = doc.create_element_with("entry", &[("producer", producer_id), ("in", "0"), ("out", &out)]);
    doc.append_child(main_bin, entry);
    debug!(producer = producer_id, bin = MAIN_BIN_ID, "listed producer in bin");
}
