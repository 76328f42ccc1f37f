use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;

use super::{HealthResponse, HelpResponse, SpeakRequest};
use crate::api::routes::AppState;
use crate::auth::API_KEY_HEADER;
use crate::error::AppError;

pub async fn speak(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SpeakRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(request) = payload?;
    let (text, params) = request.into_parts();

    tracing::info!(
        chars = text.chars().count(),
        speaker = params.speaker,
        "Synthesizing speech"
    );

    // Inference is CPU bound; keep it off the async workers
    let worker_state = Arc::clone(&state);
    let task = tokio::task::spawn_blocking(move || worker_state.tts.speak(&text, &params));

    let wav = match tokio::time::timeout(state.request_timeout, task).await {
        Ok(joined) => joined
            .map_err(|e| AppError::TtsError(format!("Synthesis task failed: {}", e)))??,
        Err(_) => {
            return Err(AppError::TtsError(format!(
                "Synthesis timed out after {}s",
                state.request_timeout.as_secs()
            )))
        }
    };

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "audio/wav"),
            (header::CACHE_CONTROL, "no-store"),
            (header::CONTENT_DISPOSITION, "attachment; filename=speech.wav"),
        ],
        wav,
    )
        .into_response())
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        model: state.tts.model_path().display().to_string(),
        voice: state.voice_name.clone(),
        loaded: state.tts.is_loaded(),
    })
}

pub async fn help() -> Json<HelpResponse> {
    Json(HelpResponse {
        endpoints: json!({
            "/health": {
                "method": "GET",
                "description": "Health check endpoint",
                "auth_required": false
            },
            "/help": {
                "method": "GET",
                "description": "API documentation and usage information",
                "auth_required": false
            },
            "/speak": {
                "method": "POST",
                "description": "Convert text to speech, returns a WAV file",
                "auth_required": true,
                "parameters": {
                    "text": "Text to convert to speech (required)",
                    "speaker": "Speaker ID (optional, default: 0)",
                    "noise_scale": "Noise scale for variability (optional, default: 0.667)",
                    "length_scale": "Length scale for speed (optional, default: 1.0)",
                    "noise_w": "Noise width (optional, default: 0.8)"
                },
                "responses": {
                    "200": "audio/wav attachment (speech.wav)",
                    "401": "Missing or unknown API key",
                    "400": "Malformed JSON body",
                    "422": "Missing or mistyped fields",
                    "500": "Speech generation failed"
                }
            }
        }),
        authentication: format!(
            "Requires {} header matching one of the configured API_KEYS",
            API_KEY_HEADER
        ),
        example_usage: json!({
            "minimal": {
                "method": "POST",
                "url": "http://localhost:8000/speak",
                "headers": {
                    "x-api-key": "your-api-key",
                    "content-type": "application/json"
                },
                "body": {
                    "text": "Hello, world!"
                }
            },
            "full": {
                "method": "POST",
                "url": "http://localhost:8000/speak",
                "headers": {
                    "x-api-key": "your-api-key",
                    "content-type": "application/json"
                },
                "body": {
                    "text": "Hello, world!",
                    "speaker": 0,
                    "noise_scale": 0.667,
                    "length_scale": 1.0,
                    "noise_w": 0.8
                }
            }
        }),
    })
}
