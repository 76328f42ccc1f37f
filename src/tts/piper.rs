use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;
use std::process::Command;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use hound::{SampleFormat, WavSpec, WavWriter};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;

use crate::error::{AppError, EngineError};
use crate::tts::voice::{Voice, VoiceConfig};
use crate::tts::{SynthesisParams, Synthesizer, VoiceLoader};

/// A Piper VITS voice running on ONNX Runtime.
pub struct PiperEngine {
    session: Mutex<Session>,
    config: VoiceConfig,
}

impl PiperEngine {
    pub fn new(voice: Voice) -> Result<Self, EngineError> {
        let session = Session::builder()
            .map_err(|e| EngineError::Load(format!("Failed to create session builder: {}", e)))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| EngineError::Load(format!("Failed to set optimization level: {}", e)))?
            .with_intra_threads(4)
            .map_err(|e| EngineError::Load(format!("Failed to set threads: {}", e)))?
            .commit_from_file(&voice.model_path)
            .map_err(|e| EngineError::Load(format!("Failed to load model: {}", e)))?;

        Ok(Self {
            session: Mutex::new(session),
            config: voice.config,
        })
    }

    fn infer(&self, phoneme_ids: &[i64], params: &SynthesisParams) -> Result<Vec<f32>, AppError> {
        if phoneme_ids.is_empty() {
            return Ok(Vec::new());
        }

        let input_len = phoneme_ids.len();

        // input: [batch, sequence] = [1, phoneme_count]
        let input_value = Value::from_array((vec![1, input_len], phoneme_ids.to_vec()))
            .map_err(|e| AppError::TtsError(format!("Failed to create input tensor: {}", e)))?;

        let lengths_value = Value::from_array((vec![1], vec![input_len as i64]))
            .map_err(|e| AppError::TtsError(format!("Failed to create lengths tensor: {}", e)))?;

        let scales_value = Value::from_array((
            vec![3],
            vec![params.noise_scale, params.length_scale, params.noise_w],
        ))
        .map_err(|e| AppError::TtsError(format!("Failed to create scales tensor: {}", e)))?;

        // One run at a time per session
        let mut session = self.session.lock().unwrap_or_else(PoisonError::into_inner);
        let outputs = if self.config.is_multi_speaker() {
            let sid_value = Value::from_array((vec![1], vec![i64::from(params.speaker)]))
                .map_err(|e| {
                    AppError::TtsError(format!("Failed to create speaker tensor: {}", e))
                })?;
            session.run(ort::inputs![input_value, lengths_value, scales_value, sid_value])
        } else {
            session.run(ort::inputs![input_value, lengths_value, scales_value])
        }
        .map_err(|e| AppError::TtsError(format!("Inference failed: {}", e)))?;

        let output = outputs
            .get("output")
            .or_else(|| outputs.get("audio"))
            .ok_or_else(|| AppError::TtsError("Missing output tensor".to_string()))?;

        let output_view = output
            .try_extract_tensor::<f32>()
            .map_err(|e| AppError::TtsError(format!("Failed to extract output tensor: {}", e)))?;

        Ok(output_view.1.to_vec())
    }
}

impl Synthesizer for PiperEngine {
    fn sample_rate(&self) -> u32 {
        self.config.audio.sample_rate
    }

    fn synthesize(&self, text: &str, params: &SynthesisParams) -> Result<Vec<f32>, AppError> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let phonemes = phonemize(text, self.config.espeak_voice())?;

        // espeak-ng emits one line per clause
        let mut audio = Vec::new();
        for line in phonemes.lines().filter(|l| !l.trim().is_empty()) {
            let ids = phonemes_to_ids(line.trim(), &self.config.phoneme_id_map);
            audio.extend(self.infer(&ids, params)?);
        }

        Ok(audio)
    }
}

/// Loads Piper voices from an ONNX model plus its `.onnx.json` config.
pub struct PiperLoader;

impl VoiceLoader for PiperLoader {
    fn load(
        &self,
        model_path: &Path,
        config_path: &Path,
    ) -> Result<Arc<dyn Synthesizer>, EngineError> {
        let started = Instant::now();
        let voice = Voice::load(model_path, config_path)?;
        let engine = PiperEngine::new(voice)?;

        tracing::info!(
            sample_rate = engine.sample_rate(),
            speakers = engine.config.num_speakers,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Voice model loaded"
        );

        Ok(Arc::new(engine))
    }
}

/// Convert text to phonemes using espeak-ng
pub fn phonemize(text: &str, voice: &str) -> Result<String, AppError> {
    if text.is_empty() {
        return Ok(String::new());
    }

    let output = espeak_command(text, voice)
        .output()
        .map_err(|e| {
            AppError::TtsError(format!(
                "Failed to run espeak-ng (is it installed?): {}",
                e
            ))
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(AppError::TtsError(format!("espeak-ng failed: {}", stderr)));
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// `--` ends option parsing, so text starting with `-` is spoken, not parsed.
fn espeak_command(text: &str, voice: &str) -> Command {
    let mut command = Command::new("espeak-ng");
    command.args(["--ipa", "-q", "-v", voice, "--", text]);
    command
}

/// Convert phonemes to IDs using the voice's phoneme map
pub fn phonemes_to_ids(phonemes: &str, id_map: &HashMap<String, Vec<i64>>) -> Vec<i64> {
    let mut ids = Vec::new();

    let pad = id_map.get("_");

    // ^ _ p1 _ p2 _ ... $
    if let Some(bos) = id_map.get("^") {
        ids.extend(bos);
    } else {
        ids.push(0);
    }
    if let Some(pad) = pad {
        ids.extend(pad);
    }

    let mut buf = [0u8; 4];
    for ch in phonemes.chars() {
        let key: &str = ch.encode_utf8(&mut buf);
        if let Some(mapped) = id_map.get(key) {
            ids.extend(mapped);
            if let Some(pad) = pad {
                ids.extend(pad);
            }
        }
    }

    if let Some(eos) = id_map.get("$") {
        ids.extend(eos);
    } else {
        ids.push(0);
    }

    ids
}

/// Encode mono f32 samples as a 16-bit PCM WAV file in memory
pub fn samples_to_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>, AppError> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut buffer = Vec::with_capacity(44 + samples.len() * 2);
    {
        let cursor = Cursor::new(&mut buffer);
        let mut writer = WavWriter::new(cursor, spec)
            .map_err(|e| AppError::TtsError(format!("Failed to create WAV writer: {}", e)))?;

        for &sample in samples {
            let scaled = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
            writer
                .write_sample(scaled)
                .map_err(|e| AppError::TtsError(format!("Failed to write sample: {}", e)))?;
        }

        writer
            .finalize()
            .map_err(|e| AppError::TtsError(format!("Failed to finalize WAV: {}", e)))?;
    }

    Ok(buffer)
}
