use crate::assets::{ApplyContext, MediaProbe, DEFAULT_FALLBACK_FRAMES, DEFAULT_FPS};
use crate::model::Frame;
use serde::{Deserialize, Serialize};

/// Editing policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorConfig {
    /// Write a safety backup before rolling back to a snapshot
    #[serde(default = "default_true")]
    pub auto_backup: bool,

    /// Refuse edits on projects that fail validation
    #[serde(default = "default_true")]
    pub validate_before_edit: bool,

    /// Duration given to imported media whose length is unknown
    #[serde(default = "default_fallback_frames")]
    pub fallback_frames: Frame,

    /// Frame rate assumed when the profile declares none
    #[serde(default = "default_fps")]
    pub default_fps: f64,
}

fn default_true() -> bool {
    true
}

fn default_fallback_frames() -> Frame {
    DEFAULT_FALLBACK_FRAMES
}

fn default_fps() -> f64 {
    DEFAULT_FPS
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            auto_backup: true,
            validate_before_edit: true,
            fallback_frames: DEFAULT_FALLBACK_FRAMES,
            default_fps: DEFAULT_FPS,
        }
    }
}

impl EditorConfig {
    pub fn apply_context<'a>(&self, probe: &'a dyn MediaProbe) -> ApplyContext<'a> {
        ApplyContext {
            probe,
            fallback_frames: self.fallback_frames,
            default_fps: self.default_fps,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_partial_config() {
        let config: EditorConfig = serde_json::from_str(r#"{"autoBackup": false, "fallbackFrames": 100}"#).unwrap();
        assert!(!config.auto_backup);
        assert!(config.validate_before_edit);
        assert_eq!(config.fallback_frames, 100);
        assert_eq!(config.default_fps, 25.0);
    }

    #[test]
    fn test_default_config() {
        let config: EditorConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, EditorConfig::default());
    }
}
