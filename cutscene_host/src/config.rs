use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use cutscene_core::SequenceScript;
use log::{info, warn};
use serde::{Deserialize, Serialize};

/// Locations searched, relative to the working directory, when no explicit
/// config path is given.
pub const SEARCH_PATHS: [&str; 3] = [
    "cutscene/config.json",
    "scripts/cutscene/config.json",
    "config.json",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Allow accepting actors whose model matches `candidate_models`.
    pub enable_candidate_accept: bool,
    /// Allow accepting actors whose model is listed in `generic_models`.
    pub enable_generic_accept: bool,
    pub candidate_models: Vec<String>,
    pub generic_models: Vec<String>,
    pub detection_radius: f32,
    pub sequence: SequenceScript,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            enable_candidate_accept: true,
            enable_generic_accept: false,
            candidate_models: vec!["companion".to_string()],
            generic_models: vec!["pedestrian_a".to_string(), "pedestrian_b".to_string()],
            detection_radius: 12.0,
            sequence: SequenceScript::default(),
        }
    }
}

impl HostConfig {
    /// Loads `explicit` if given (failures are fatal), otherwise the first
    /// readable file from [`SEARCH_PATHS`] under `base_dir`, falling back to
    /// defaults.
    pub fn load(explicit: Option<&Path>, base_dir: &Path) -> Result<Self> {
        if let Some(path) = explicit {
            let config = Self::from_json_file(path)?;
            info!("config.loaded {}", path.display());
            return Ok(config);
        }

        for relative in SEARCH_PATHS {
            let path = base_dir.join(relative);
            if !path.is_file() {
                continue;
            }
            match Self::from_json_file(&path) {
                Ok(config) => {
                    info!("config.loaded {}", path.display());
                    return Ok(config);
                }
                Err(err) => {
                    warn!("config.invalid {err:#}; using defaults");
                    return Ok(Self::default());
                }
            }
        }

        info!("config.defaults no config file found");
        Ok(Self::default())
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: HostConfig = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse config json: {}", path.display()))?;
        config
            .sequence
            .validate()
            .with_context(|| format!("invalid sequence in {}", path.display()))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_files_fall_back_to_defaults() -> Result<()> {
        let dir = tempdir()?;
        let config = HostConfig::load(None, dir.path())?;
        assert_eq!(config, HostConfig::default());
        Ok(())
    }

    #[test]
    fn search_prefers_nested_location() -> Result<()> {
        let dir = tempdir()?;
        fs::create_dir_all(dir.path().join("cutscene"))?;
        fs::write(
            dir.path().join("cutscene/config.json"),
            r#"{ "enable_candidate_accept": false }"#,
        )?;
        fs::write(dir.path().join("config.json"), r#"{ "detection_radius": 3.0 }"#)?;

        let config = HostConfig::load(None, dir.path())?;
        assert!(!config.enable_candidate_accept);
        assert_eq!(config.detection_radius, 12.0);
        Ok(())
    }

    #[test]
    fn unparsable_search_hit_uses_defaults() -> Result<()> {
        let dir = tempdir()?;
        fs::write(dir.path().join("config.json"), "{ not json")?;
        let config = HostConfig::load(None, dir.path())?;
        assert_eq!(config, HostConfig::default());
        Ok(())
    }

    #[test]
    fn explicit_path_errors_are_fatal() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("custom.json");
        fs::write(&path, r#"{ "sequence": { "durations": { "setup": 0 } } }"#)?;
        let err = HostConfig::load(Some(&path), dir.path()).unwrap_err();
        assert!(format!("{err:#}").contains("setup phase must last at least one frame"));

        let missing = dir.path().join("absent.json");
        assert!(HostConfig::load(Some(&missing), dir.path()).is_err());
        Ok(())
    }

    #[test]
    fn sequence_overrides_merge_with_defaults() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("custom.json");
        fs::write(
            &path,
            r#"{
                "generic_models": ["vendor"],
                "sequence": { "durations": { "camera_and_audio": 130 } }
            }"#,
        )?;
        let config = HostConfig::from_json_file(&path)?;
        assert_eq!(config.generic_models, vec!["vendor".to_string()]);
        assert_eq!(config.sequence.durations.camera_and_audio, 130);
        assert_eq!(config.sequence.cues.len(), 4);
        Ok(())
    }
}
