//! Shared fixtures for unit tests

use crate::Project;

/// V1: `[clip_a(10), Gap(5), clip_b(10)]`, A1: empty
pub(crate) const SAMPLE: &str = include_str!("../tests/fixtures/sample.kdenlive");

pub(crate) fn sample_project() -> Project {
    Project::from_source("sample.kdenlive", SAMPLE).unwrap()
}
