pub mod handle;
pub mod piper;
pub mod voice;

use std::path::Path;
use std::sync::Arc;

use crate::error::{AppError, EngineError};

pub use handle::EngineHandle;
pub use piper::PiperLoader;

pub const DEFAULT_SPEAKER: u32 = 0;
pub const DEFAULT_NOISE_SCALE: f32 = 0.667;
pub const DEFAULT_LENGTH_SCALE: f32 = 1.0;
pub const DEFAULT_NOISE_W: f32 = 0.8;

/// Per-request knobs handed to the voice model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SynthesisParams {
    pub speaker: u32,
    pub noise_scale: f32,
    pub length_scale: f32,
    pub noise_w: f32,
}

impl Default for SynthesisParams {
    fn default() -> Self {
        Self {
            speaker: DEFAULT_SPEAKER,
            noise_scale: DEFAULT_NOISE_SCALE,
            length_scale: DEFAULT_LENGTH_SCALE,
            noise_w: DEFAULT_NOISE_W,
        }
    }
}

/// A loaded voice that turns text into mono f32 samples in [-1, 1].
pub trait Synthesizer: Send + Sync {
    fn sample_rate(&self) -> u32;

    fn synthesize(&self, text: &str, params: &SynthesisParams) -> Result<Vec<f32>, AppError>;
}

/// Builds a `Synthesizer` from model artifacts on disk.
pub trait VoiceLoader: Send + Sync {
    fn load(&self, model_path: &Path, config_path: &Path)
        -> Result<Arc<dyn Synthesizer>, EngineError>;
}

pub struct TtsService {
    engine: EngineHandle,
}

impl TtsService {
    pub fn new(engine: EngineHandle) -> Self {
        Self { engine }
    }

    pub fn model_path(&self) -> &Path {
        self.engine.model_path()
    }

    pub fn is_loaded(&self) -> bool {
        self.engine.is_loaded()
    }

    /// Synthesize `text` into a complete in-memory WAV file.
    pub fn speak(&self, text: &str, params: &SynthesisParams) -> Result<Vec<u8>, AppError> {
        // 1. Get or load engine
        let engine = self.engine.get_or_init()?;

        // 2. Synthesize
        let samples = engine.synthesize(text, params)?;

        tracing::debug!(
            chars = text.chars().count(),
            samples = samples.len(),
            "Synthesis complete"
        );

        // 3. Encode WAV
        piper::samples_to_wav(&samples, engine.sample_rate())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    /// Deterministic tone whose length and amplitude follow the inputs.
    struct Tone;

    impl Synthesizer for Tone {
        fn sample_rate(&self) -> u32 {
            22050
        }

        fn synthesize(&self, text: &str, params: &SynthesisParams) -> Result<Vec<f32>, AppError> {
            if text == "explode" {
                return Err(AppError::TtsError("Inference failed: bad input".into()));
            }
            let len = (text.len() as f32 * 10.0 * params.length_scale) as usize;
            Ok((0..len)
                .map(|i| ((i as f32) * 0.1).sin() * params.noise_scale)
                .collect())
        }
    }

    struct ToneLoader;

    impl VoiceLoader for ToneLoader {
        fn load(&self, _model: &Path, _config: &Path) -> Result<Arc<dyn Synthesizer>, EngineError> {
            Ok(Arc::new(Tone))
        }
    }

    fn service(dir: &Path) -> TtsService {
        let model = dir.join("voice.onnx");
        let config = dir.join("voice.onnx.json");
        fs::write(&model, b"onnx").unwrap();
        fs::write(&config, b"{}").unwrap();
        TtsService::new(EngineHandle::new(model, config, Box::new(ToneLoader)))
    }

    #[test]
    fn default_params() {
        let params = SynthesisParams::default();
        assert_eq!(params.speaker, 0);
        assert_eq!(params.noise_scale, 0.667);
        assert_eq!(params.length_scale, 1.0);
        assert_eq!(params.noise_w, 0.8);
    }

    #[test]
    fn speak_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let tts = service(dir.path());
        let params = SynthesisParams::default();

        let first = tts.speak("Hello, world!", &params).unwrap();
        let second = tts.speak("Hello, world!", &params).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 44 + 130 * 2);
    }

    #[test]
    fn synthesis_failure_is_not_audio() {
        let dir = tempfile::tempdir().unwrap();
        let tts = service(dir.path());

        let err = tts.speak("explode", &SynthesisParams::default()).unwrap_err();
        assert!(matches!(err, AppError::TtsError(ref m) if m.contains("bad input")));
    }

    #[test]
    fn missing_model_surfaces_engine_error() {
        let tts = TtsService::new(EngineHandle::new(
            PathBuf::from("/nonexistent/voice.onnx"),
            PathBuf::from("/nonexistent/voice.onnx.json"),
            Box::new(ToneLoader),
        ));

        let err = tts.speak("hi", &SynthesisParams::default()).unwrap_err();
        assert!(matches!(err, AppError::Engine(EngineError::ModelNotFound(_))));
    }
}
