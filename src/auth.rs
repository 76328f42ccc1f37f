use std::collections::HashSet;
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use lazy_static::lazy_static;
use regex::Regex;

use crate::api::routes::AppState;
use crate::error::AppError;

pub const API_KEY_HEADER: &str = "x-api-key";

lazy_static! {
    static ref KEY_SEPARATORS: Regex = Regex::new(r"[,;\n ]").unwrap();
}

/// The set of API keys accepted on protected routes. Fixed at startup.
#[derive(Debug, Clone, Default)]
pub struct KeyStore {
    keys: HashSet<String>,
}

impl KeyStore {
    /// Parse a key list separated by commas, semicolons, newlines or spaces.
    pub fn parse(raw: &str) -> Self {
        let normalized = KEY_SEPARATORS.replace_all(raw.trim(), ",");
        let keys = normalized
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .collect();

        Self { keys }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn authorize(&self, presented: Option<&str>) -> Result<(), AppError> {
        match presented {
            Some(key) if !key.is_empty() && self.keys.contains(key) => Ok(()),
            _ => Err(AppError::Unauthorized),
        }
    }
}

/// Rejects requests whose `x-api-key` header is not a configured key.
pub async fn require_api_key(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let presented = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok());

    if let Err(e) = state.keys.authorize(presented) {
        tracing::warn!(
            path = %request.uri().path(),
            header_present = presented.is_some(),
            "API key rejected"
        );
        return Err(e);
    }

    Ok(next.run(request).await)
}
