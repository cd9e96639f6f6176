//! Structural checks on a loaded project

use crate::model::TimelineClip;
use crate::project::Project;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationIssue {
    pub severity: Severity,
    pub message: String,
    pub element_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub element_id: Option<String>,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.element_id {
            Some(id) => write!(f, "{} '{}': {}", self.element_type, id, self.message),
            None => write!(f, "{}: {}", self.element_type, self.message),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, message: String, element_type: &str, element_id: Option<&str>) {
        self.errors.push(ValidationIssue {
            severity: Severity::Error,
            message,
            element_type: element_type.to_string(),
            element_id: element_id.map(str::to_string),
        });
    }

    fn warning(&mut self, message: String, element_type: &str, element_id: Option<&str>) {
        self.warnings.push(ValidationIssue {
            severity: Severity::Warning,
            message,
            element_type: element_type.to_string(),
            element_id: element_id.map(str::to_string),
        });
    }

    /// Summary as reported by `project.validate`
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "isValid": self.is_valid(),
            "errorCount": self.errors.len(),
            "warningCount": self.warnings.len(),
            "errors": self.errors,
            "warnings": self.warnings,
        })
    }
}

/// Run every check
pub fn validate(project: &Project) -> ValidationReport {
    let mut report = ValidationReport::default();

    check_structure(project, &mut report);
    let clips = collect_clips(project, &mut report);
    check_references(project, &clips, &mut report);
    check_timecodes(&clips, &mut report);
    check_generation(project, &mut report);
    check_overlaps(&clips, &mut report);
    check_duplicates(project, &clips, &mut report);
    check_gap_encoding(project, &mut report);

    debug!(
        errors = report.errors.len(),
        warnings = report.warnings.len(),
        "validated project"
    );
    report
}

fn check_structure(project: &Project, report: &mut ValidationReport) {
    let doc = project.document();
    if doc.tag(doc.root()) != "mlt" {
        report.error("Root element must be 'mlt'".into(), "root", None);
    }
    if project.main_tractor().is_none() {
        report.error("No timeline tractor found".into(), "tractor", None);
    }
}

fn collect_clips(project: &Project, report: &mut ValidationReport) -> Vec<TimelineClip> {
    let mut clips = Vec::new();
    for track in project.tracks() {
        match project.read_segments(&track.id) {
            Ok(segments) => clips.extend(segments.timeline_clips()),
            Err(e) => report.error(format!("Track cannot be read: {}", e), "track", Some(&track.id)),
        }
    }
    clips
}

fn check_references(project: &Project, clips: &[TimelineClip], report: &mut ValidationReport) {
    let producers: HashSet<String> = project.producers().into_iter().map(|p| p.id).collect();
    for clip in clips {
        if !producers.contains(&clip.producer_id) {
            report.error(
                format!("Clip references missing producer '{}'", clip.producer_id),
                "clip",
                Some(&clip.instance_id),
            );
        }
    }
}

fn check_timecodes(clips: &[TimelineClip], report: &mut ValidationReport) {
    for clip in clips {
        if clip.in_point < 0 || clip.out_point.is_some_and(|out| out < clip.in_point) {
            report.error(
                format!("Clip '{}' has invalid in/out points", clip.instance_id),
                "clip",
                Some(&clip.instance_id),
            );
        }
    }
}

fn check_generation(project: &Project, report: &mut ValidationReport) {
    let generation = project.generation();
    if generation < 4 {
        report.warning("Project generation is below 4".into(), "project", None);
    }
    if generation == 5 && project.main_bin().is_none() {
        report.warning("Generation 5 project missing main_bin playlist".into(), "playlist", None);
    }
}

fn check_overlaps(clips: &[TimelineClip], report: &mut ValidationReport) {
    let mut by_track: HashMap<&str, Vec<&TimelineClip>> = HashMap::new();
    for clip in clips {
        by_track.entry(clip.track_id.as_str()).or_default().push(clip);
    }

    let mut track_ids: Vec<_> = by_track.keys().copied().collect();
    track_ids.sort_unstable();
    for track_id in track_ids {
        let mut placed = by_track[track_id].clone();
        placed.sort_by_key(|c| c.start);
        for pair in placed.windows(2) {
            if pair[1].start <= pair[0].end {
                report.error(
                    format!(
                        "Track '{}' has overlap between '{}' and '{}'",
                        track_id, pair[0].instance_id, pair[1].instance_id
                    ),
                    "track",
                    Some(track_id),
                );
            }
        }
    }
}

fn check_duplicates(project: &Project, clips: &[TimelineClip], report: &mut ValidationReport) {
    let mut seen = HashSet::new();
    for producer in project.producers() {
        if !seen.insert(producer.id.clone()) {
            report.error("Duplicate producer id".into(), "producer", Some(&producer.id));
        }
    }

    let mut seen = HashSet::new();
    for clip in clips {
        if !seen.insert(clip.instance_id.as_str()) {
            report.error("Duplicate clip instance id".into(), "clip", Some(&clip.instance_id));
        }
    }
}

/// Gaps that reading normalizes away: empty blanks and adjacent blanks
fn check_gap_encoding(project: &Project, report: &mut ValidationReport) {
    let doc = project.document();
    for track in project.tracks() {
        let mut previous_blank = false;
        for &child in doc.children(track.playlist) {
            match doc.tag(child) {
                "blank" => {
                    let length = doc.attr(child, "length").and_then(|v| v.trim().parse::<i64>().ok());
                    if length.map_or(true, |l| l <= 0) {
                        report.warning("Empty blank".into(), "track", Some(&track.id));
                    } else if previous_blank {
                        report.warning("Adjacent blanks".into(), "track", Some(&track.id));
                    }
                    previous_blank = true;
                }
                "entry" => previous_blank = false,
                _ => {}
            }
        }
    }
}
