pub mod handlers;
pub mod routes;

use serde::{Deserialize, Serialize};

use crate::tts::SynthesisParams;

/// Body of `POST /speak`.
///
/// Optional fields left out or sent as `null` take their defaults. An explicit
/// zero is a real value and is passed through.
#[derive(Debug, Deserialize)]
pub struct SpeakRequest {
    pub text: String,
    #[serde(default)]
    pub speaker: Option<u32>,
    #[serde(default)]
    pub noise_scale: Option<f32>,
    #[serde(default)]
    pub length_scale: Option<f32>,
    #[serde(default)]
    pub noise_w: Option<f32>,
}

impl SpeakRequest {
    pub fn into_parts(self) -> (String, SynthesisParams) {
        let defaults = SynthesisParams::default();
        let params = SynthesisParams {
            speaker: self.speaker.unwrap_or(defaults.speaker),
            noise_scale: self.noise_scale.unwrap_or(defaults.noise_scale),
            length_scale: self.length_scale.unwrap_or(defaults.length_scale),
            noise_w: self.noise_w.unwrap_or(defaults.noise_w),
        };
        (self.text, params)
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub model: String,
    pub voice: String,
    pub loaded: bool,
}

#[derive(Debug, Serialize)]
pub struct HelpResponse {
    pub endpoints: serde_json::Value,
    pub authentication: String,
    pub example_usage: serde_json::Value,
}
