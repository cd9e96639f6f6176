//! Integration tests for editor crate

use pretty_assertions::assert_eq;
use serde_json::json;
use splice_editor::{
    diff, execute, execute_with, EditSession, EditorConfig, EditorError, Mutation, MutationError, Operation, Project,
    Segment, TextAsset,
};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const SAMPLE: &str = include_str!("fixtures/sample.kdenlive");

fn write_sample(dir: &TempDir, name: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, SAMPLE).unwrap();
    path
}

fn edit(project: &Path, mutation: Mutation) -> Result<serde_json::Value, EditorError> {
    execute(
        &Operation::Edit {
            project: project.to_path_buf(),
            mutation,
            output: None,
            dry_run: false,
        },
        &EditorConfig::default(),
    )
}

fn gap_lengths(segments: &[Segment]) -> Vec<String> {
    segments
        .iter()
        .map(|s| match s {
            Segment::Gap { length } => format!("gap:{}", length),
            Segment::Clip(c) => format!("{}:{}", c.instance_id, c.duration()),
        })
        .collect()
}

#[test]
fn test_document_lifecycle() {
    let mut project = Project::from_source("cut.kdenlive", SAMPLE).unwrap();
    assert_eq!(project.version, 0);
    assert!(!project.is_dirty());

    project
        .apply(&Mutation::InsertGap {
            track_id: "playlist0".into(),
            position: 10,
            length: 3,
        })
        .unwrap();
    assert_eq!(
        gap_lengths(&project.list_segments("playlist0").unwrap()),
        vec!["clip_a:10", "gap:8", "clip_b:10"]
    );

    project
        .apply(&Mutation::RemoveClip {
            clip_ref: "clip_a".into(),
            close_gap: true,
        })
        .unwrap();
    assert_eq!(gap_lengths(&project.list_segments("playlist0").unwrap()), vec!["gap:8", "clip_b:10"]);
    assert_eq!(project.clips(Some("playlist0")).unwrap()[0].start, 8);
    assert_eq!(project.version, 2);
    assert!(project.is_dirty());

    let reparsed = Project::from_source("cut.kdenlive", &project.to_xml_string()).unwrap();
    assert_eq!(
        gap_lengths(&reparsed.list_segments("playlist0").unwrap()),
        gap_lengths(&project.list_segments("playlist0").unwrap())
    );
}

#[test]
fn test_edit_saves_and_reports() {
    let dir = TempDir::new().unwrap();
    let path = write_sample(&dir, "cut.kdenlive");

    let value = edit(
        &path,
        Mutation::MoveClip {
            clip_ref: "clip_b".into(),
            track_id: "playlist1".into(),
            position: 0,
            allow_overlap: false,
        },
    )
    .unwrap();
    assert_eq!(value["changed"], true);
    assert_eq!(value["action"], "timeline.move_clip");
    assert_eq!(value["savedTo"], json!(path));

    let saved = Project::load(&path).unwrap();
    let clips = saved.clips(Some("playlist1")).unwrap();
    assert_eq!(clips.len(), 1);
    assert_eq!(clips[0].instance_id, "clip_b");

    let again = edit(
        &path,
        Mutation::MoveClip {
            clip_ref: "clip_b".into(),
            track_id: "playlist1".into(),
            position: 0,
            allow_overlap: false,
        },
    )
    .unwrap();
    assert_eq!(again["changed"], false);
    assert_eq!(again["idempotent"], true);
    assert_eq!(again["savedTo"], json!(null));
}

#[test]
fn test_dry_run_and_output() {
    let dir = TempDir::new().unwrap();
    let path = write_sample(&dir, "cut.kdenlive");
    let output = dir.path().join("out/cut_v2.kdenlive");
    let config = EditorConfig::default();

    let mutation = Mutation::RippleDelete {
        clip_ref: "clip_a".into(),
    };
    let dry = execute(
        &Operation::Edit {
            project: path.clone(),
            mutation: mutation.clone(),
            output: None,
            dry_run: true,
        },
        &config,
    )
    .unwrap();
    assert_eq!(dry["dryRun"], true);
    assert_eq!(fs::read_to_string(&path).unwrap(), SAMPLE);

    execute(
        &Operation::Edit {
            project: path.clone(),
            mutation,
            output: Some(output.clone()),
            dry_run: false,
        },
        &config,
    )
    .unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), SAMPLE);
    assert_eq!(Project::load(&output).unwrap().clips(None).unwrap().len(), 1);
}

#[test]
fn test_overlap_is_reported_without_writing() {
    let dir = TempDir::new().unwrap();
    let path = write_sample(&dir, "cut.kdenlive");

    let err = edit(
        &path,
        Mutation::AddClip {
            producer_id: "producer2".into(),
            track_id: "playlist0".into(),
            position: 3,
            in_point: 0,
            out_point: Some(4),
            allow_overlap: false,
        },
    )
    .unwrap_err();
    assert!(matches!(err, EditorError::Mutation(MutationError::Overlap { .. })));
    assert_eq!(err.code(), "OVERLAP");
    assert_eq!(fs::read_to_string(&path).unwrap(), SAMPLE);
}

#[test]
fn test_invalid_project_blocks_edits() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.kdenlive");
    fs::write(&path, SAMPLE.replace(r#"<entry producer="producer2" in="0" out="9">"#, r#"<entry producer="ghost" in="0" out="9">"#)).unwrap();

    let err = edit(&path, Mutation::RecalculateBounds).unwrap_err();
    assert_eq!(err.code(), "VALIDATION_FAILED");

    let lenient = EditorConfig {
        validate_before_edit: false,
        ..EditorConfig::default()
    };
    let value = execute(
        &Operation::Edit {
            project: path,
            mutation: Mutation::RecalculateBounds,
            output: None,
            dry_run: false,
        },
        &lenient,
    )
    .unwrap();
    assert_eq!(value["projectOut"], 24);
}

#[test]
fn test_plan_edit_previews_diff() {
    let dir = TempDir::new().unwrap();
    let path = write_sample(&dir, "cut.kdenlive");

    let plan = execute(
        &Operation::PlanEdit {
            project: path.clone(),
            mutation: Mutation::SplitClip {
                clip_ref: "clip_b".into(),
                position: 20,
            },
        },
        &EditorConfig::default(),
    )
    .unwrap();
    assert_eq!(plan["wouldChange"], true);
    assert_eq!(plan["previewDiff"]["removed"][0]["clipRef"], "clip_b");
    assert_eq!(plan["previewDiff"]["added"].as_array().unwrap().len(), 2);
    assert_eq!(fs::read_to_string(&path).unwrap(), SAMPLE);
}

#[test]
fn test_diff_between_files() {
    let dir = TempDir::new().unwrap();
    let source = write_sample(&dir, "a.kdenlive");
    let target = write_sample(&dir, "b.kdenlive");
    edit(
        &target,
        Mutation::TrimClip {
            clip_ref: "clip_b".into(),
            in_point: Some(2),
            out_point: None,
        },
    )
    .unwrap();

    let value = execute(
        &Operation::Diff {
            source: source.clone(),
            target: target.clone(),
        },
        &EditorConfig::default(),
    )
    .unwrap();
    assert_eq!(value["totalChanges"], 1);
    assert_eq!(value["trimmed"][0]["oldIn"], 0);

    let same = diff(&Project::load(&source).unwrap(), &Project::load(&source).unwrap()).unwrap();
    assert!(same.is_empty());
}

#[test]
fn test_clone_refuses_to_overwrite() {
    let dir = TempDir::new().unwrap();
    let source = write_sample(&dir, "cut.kdenlive");
    let target = dir.path().join("copies/cut.kdenlive");
    let config = EditorConfig::default();
    let clone = |overwrite| Operation::Clone {
        source: source.clone(),
        target: target.clone(),
        overwrite,
    };

    execute(&clone(false), &config).unwrap();
    assert_eq!(fs::read_to_string(&target).unwrap(), SAMPLE);

    let err = execute(&clone(false), &config).unwrap_err();
    assert_eq!(err.code(), "INVALID_INPUT");
    execute(&clone(true), &config).unwrap();
}

#[test]
fn test_snapshot_undo_redo_through_operations() {
    let dir = TempDir::new().unwrap();
    let path = write_sample(&dir, "cut.kdenlive");
    let config = EditorConfig::default();

    execute(
        &Operation::Snapshot {
            project: path.clone(),
            description: "initial".into(),
            metadata: serde_json::Map::new(),
        },
        &config,
    )
    .unwrap();
    edit(&path, Mutation::RemoveAllGaps { track_id: "playlist0".into() }).unwrap();
    let edited = fs::read_to_string(&path).unwrap();

    let undo = execute(&Operation::Undo { project: path.clone(), snapshot_id: None }, &config).unwrap();
    assert!(undo["undo"]["snapshotId"].as_str().unwrap().starts_with("snapshot_000000_"));
    assert_eq!(Project::load(&path).unwrap().timeline_duration().unwrap(), 25);

    execute(&Operation::Redo { project: path.clone() }, &config).unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), edited);

    let err = execute(&Operation::Redo { project: path.clone() }, &config).unwrap_err();
    assert_eq!(err.to_string(), "No redo entries available");

    let history = execute(&Operation::History { project: path }, &config).unwrap();
    assert_eq!(history["snapshots"].as_array().unwrap().len(), 1);
}

#[test]
fn test_session_transaction_with_assets() {
    let dir = TempDir::new().unwrap();
    let path = write_sample(&dir, "cut.kdenlive");
    let mut session = EditSession::open(&path, EditorConfig::default()).unwrap();
    let probe = |_: &Path| Some(2.0);

    let clip_ref = session
        .transaction("title and music", true, |s| {
            let mut title = TextAsset::new("Opening");
            title.track_id = Some("playlist1".into());
            let created = s.apply(&Mutation::CreateText(title))?;

            s.apply_with_probe(
                &Mutation::ImportAsset {
                    media: "/media/music.wav".into(),
                    producer_id: None,
                    duration_frames: None,
                },
                &probe,
            )?;
            Ok(created.clip_refs[0].clone())
        })
        .unwrap();

    let music = session.project.producer("producer3").unwrap();
    assert_eq!(music.duration(), 50);
    assert_eq!(session.project.clips(Some("playlist1")).unwrap()[0].instance_id, clip_ref);
    assert_eq!(session.history()[0].description, "title and music");
    session.save().unwrap();
}

#[test]
fn test_track_management_through_edits() {
    let dir = TempDir::new().unwrap();
    let path = write_sample(&dir, "cut.kdenlive");

    let added = edit(
        &path,
        Mutation::AddTrack {
            track_id: Some("titles".into()),
            kind: Default::default(),
            name: Some("Titles".into()),
            index: Some(0),
        },
    )
    .unwrap();
    assert_eq!(added["index"], 0);

    edit(&path, Mutation::ReorderTrack { track_id: "titles".into(), index: 2 }).unwrap();
    let tracks: Vec<String> = Project::load(&path).unwrap().tracks().into_iter().map(|t| t.id).collect();
    assert_eq!(tracks, vec!["playlist0", "playlist1", "titles"]);

    let err = edit(&path, Mutation::RemoveTrack { track_id: "playlist0".into(), force: false }).unwrap_err();
    assert_eq!(err.code(), "CONFLICT");
    edit(&path, Mutation::RemoveTrack { track_id: "titles".into(), force: false }).unwrap();
    assert_eq!(Project::load(&path).unwrap().tracks().len(), 2);
}

#[test]
fn test_import_with_probe_via_execute() {
    let dir = TempDir::new().unwrap();
    let path = write_sample(&dir, "cut.kdenlive");
    let probe = |_: &Path| None;

    let value = execute_with(
        &Operation::Edit {
            project: path.clone(),
            mutation: Mutation::ImportAsset {
                media: "/media/unknown.mov".into(),
                producer_id: Some("producer1".into()),
                duration_frames: None,
            },
            output: None,
            dry_run: false,
        },
        &EditorConfig::default(),
        &probe,
    )
    .unwrap_err();
    assert_eq!(value.code(), "INVALID_INPUT");

    let segments = execute(
        &Operation::Segments {
            project: path,
            track_id: "playlist0".into(),
        },
        &EditorConfig::default(),
    )
    .unwrap();
    assert_eq!(segments["durationFrames"], 25);
    assert_eq!(segments["segments"][1], json!({"type": "gap", "length": 5}));
}
