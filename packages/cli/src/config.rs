use splice_editor::EditorConfig;
use std::path::Path;

pub const DEFAULT_CONFIG_NAME: &str = "splice.config.json";

/// Load `splice.config.json` from a directory, or the defaults if absent
pub fn load(cwd: &Path) -> anyhow::Result<EditorConfig> {
    let config_path = cwd.join(DEFAULT_CONFIG_NAME);

    if config_path.exists() {
        let content = std::fs::read_to_string(&config_path)?;
        let config: EditorConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Invalid {}: {}", config_path.display(), e))?;
        Ok(config)
    } else {
        Ok(EditorConfig::default())
    }
}
