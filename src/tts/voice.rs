use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::error::EngineError;

#[derive(Debug, Clone, Deserialize)]
pub struct VoiceConfig {
    pub audio: AudioConfig,
    pub espeak: Option<EspeakConfig>,
    #[serde(default)]
    pub phoneme_id_map: HashMap<String, Vec<i64>>,
    #[serde(default = "default_num_speakers")]
    pub num_speakers: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioConfig {
    pub sample_rate: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EspeakConfig {
    pub voice: String,
}

fn default_num_speakers() -> u32 {
    1
}

impl VoiceConfig {
    pub fn espeak_voice(&self) -> &str {
        self.espeak
            .as_ref()
            .map(|e| e.voice.as_str())
            .unwrap_or("en")
    }

    pub fn is_multi_speaker(&self) -> bool {
        self.num_speakers > 1
    }
}

/// A voice model and its parsed config, checked to exist on disk.
#[derive(Debug)]
pub struct Voice {
    pub config: VoiceConfig,
    pub model_path: PathBuf,
}

impl Voice {
    /// Checks the artifacts itself so it also works outside `EngineHandle`.
    pub fn load(model_path: &Path, config_path: &Path) -> Result<Self, EngineError> {
        ensure_artifacts(model_path, config_path)?;

        let reader = BufReader::new(File::open(config_path)?);
        let config: VoiceConfig = serde_json::from_reader(reader)?;

        Ok(Self {
            config,
            model_path: model_path.to_path_buf(),
        })
    }
}

/// Fails with the first missing artifact, model before config.
pub fn ensure_artifacts(model_path: &Path, config_path: &Path) -> Result<(), EngineError> {
    if !model_path.exists() {
        return Err(EngineError::ModelNotFound(model_path.to_path_buf()));
    }

    if !config_path.exists() {
        return Err(EngineError::ConfigNotFound(config_path.to_path_buf()));
    }

    Ok(())
}

/// Human-facing voice name from a model file name.
///
/// `edwin.onnx` gives `edwin`; the Piper `language-name-quality` pattern
/// (`en_GB-alba-medium.onnx`) gives the capitalized name, `Alba`.
pub fn voice_name_from_model(model_path: &Path) -> String {
    let file_name = model_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let id = file_name.split('.').next().unwrap_or_default();

    let parts: Vec<&str> = id.split('-').collect();
    if parts.len() >= 2 {
        let name = parts[1];
        let mut chars = name.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => id.to_string(),
        }
    } else {
        id.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const CONFIG_JSON: &str = r#"{
        "audio": { "sample_rate": 22050 },
        "espeak": { "voice": "en-gb" },
        "num_speakers": 4,
        "phoneme_id_map": { "^": [1], "$": [2], "_": [0], "a": [14] }
    }"#;

    #[test]
    fn load_reports_missing_model_first() {
        let dir = tempfile::tempdir().unwrap();
        let model = dir.path().join("voice.onnx");
        let config = dir.path().join("voice.onnx.json");

        let err = Voice::load(&model, &config).unwrap_err();
        assert!(matches!(err, EngineError::ModelNotFound(ref p) if p == &model));
    }

    #[test]
    fn load_reports_missing_config() {
        let dir = tempfile::tempdir().unwrap();
        let model = dir.path().join("voice.onnx");
        let config = dir.path().join("voice.onnx.json");
        fs::write(&model, b"onnx").unwrap();

        let err = Voice::load(&model, &config).unwrap_err();
        assert!(matches!(err, EngineError::ConfigNotFound(ref p) if p == &config));
    }

    #[test]
    fn load_parses_config() {
        let dir = tempfile::tempdir().unwrap();
        let model = dir.path().join("voice.onnx");
        let config = dir.path().join("voice.onnx.json");
        fs::write(&model, b"onnx").unwrap();
        fs::write(&config, CONFIG_JSON).unwrap();

        let voice = Voice::load(&model, &config).unwrap();
        assert_eq!(voice.config.audio.sample_rate, 22050);
        assert_eq!(voice.config.espeak_voice(), "en-gb");
        assert!(voice.config.is_multi_speaker());
        assert_eq!(voice.config.phoneme_id_map.get("a"), Some(&vec![14]));
    }

    #[test]
    fn minimal_config_defaults() {
        let config: VoiceConfig =
            serde_json::from_str(r#"{ "audio": { "sample_rate": 16000 } }"#).unwrap();
        assert_eq!(config.espeak_voice(), "en");
        assert!(!config.is_multi_speaker());
        assert!(config.phoneme_id_map.is_empty());
    }

    #[test]
    fn malformed_config_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let model = dir.path().join("voice.onnx");
        let config = dir.path().join("voice.onnx.json");
        fs::write(&model, b"onnx").unwrap();
        fs::write(&config, b"{ not json").unwrap();

        let err = Voice::load(&model, &config).unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfig(_)));
    }

    #[test]
    fn voice_names() {
        assert_eq!(voice_name_from_model(Path::new("/app/voice/edwin.onnx")), "edwin");
        assert_eq!(
            voice_name_from_model(Path::new("voices/en_GB-alba-medium.onnx")),
            "Alba"
        );
    }
}
