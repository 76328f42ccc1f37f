use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::auth::KeyStore;
use crate::tts::voice::voice_name_from_model;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_VOICE_MODEL: &str = "/app/voice/edwin.onnx";
const DEFAULT_VOICE_CONFIG: &str = "/app/voice/edwin.onnx.json";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("{var}={value:?} is invalid: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Process configuration, read once from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub api_keys: KeyStore,
    pub voice_model: PathBuf,
    pub voice_config: PathBuf,
    pub voice_name: String,
    pub request_timeout: Duration,
    pub log_format: LogFormat,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let host = var("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = match var("PORT") {
            Some(raw) => raw.trim().parse::<u16>().map_err(|e| ConfigError::Invalid {
                var: "PORT",
                value: raw.clone(),
                reason: e.to_string(),
            })?,
            None => DEFAULT_PORT,
        };
        let addr: SocketAddr =
            format!("{}:{}", host, port)
                .parse()
                .map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                    var: "HOST",
                    value: host.clone(),
                    reason: e.to_string(),
                })?;

        let request_timeout = match var("REQUEST_TIMEOUT_SECS") {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(0) => {
                    return Err(ConfigError::Invalid {
                        var: "REQUEST_TIMEOUT_SECS",
                        value: raw.clone(),
                        reason: "must be greater than zero".to_string(),
                    })
                }
                Ok(secs) => Duration::from_secs(secs),
                Err(e) => {
                    return Err(ConfigError::Invalid {
                        var: "REQUEST_TIMEOUT_SECS",
                        value: raw.clone(),
                        reason: e.to_string(),
                    })
                }
            },
            None => Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        };

        let log_format = match var("LOG_FORMAT").as_deref().map(str::trim) {
            None | Some("text") => LogFormat::Text,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: "LOG_FORMAT",
                    value: other.to_string(),
                    reason: "expected `text` or `json`".to_string(),
                })
            }
        };

        let voice_model = PathBuf::from(
            var("VOICE_MODEL").unwrap_or_else(|| DEFAULT_VOICE_MODEL.to_string()),
        );
        let voice_config = PathBuf::from(
            var("VOICE_CONFIG").unwrap_or_else(|| DEFAULT_VOICE_CONFIG.to_string()),
        );
        let voice_name = var("VOICE_NAME").unwrap_or_else(|| voice_name_from_model(&voice_model));

        Ok(Self {
            addr,
            api_keys: KeyStore::parse(&lookup("API_KEYS").unwrap_or_default()),
            voice_model,
            voice_config,
            voice_name,
            request_timeout,
            log_format,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let env: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| env.get(name).cloned())
    }

    #[test]
    fn defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config.addr, "0.0.0.0:8000".parse::<SocketAddr>().unwrap());
        assert!(config.api_keys.is_empty());
        assert_eq!(config.voice_model, PathBuf::from("/app/voice/edwin.onnx"));
        assert_eq!(config.voice_config, PathBuf::from("/app/voice/edwin.onnx.json"));
        assert_eq!(config.voice_name, "edwin");
        assert_eq!(config.request_timeout, Duration::from_secs(60));
        assert_eq!(config.log_format, LogFormat::Text);
    }

    #[test]
    fn overrides() {
        let config = config(&[
            ("HOST", "127.0.0.1"),
            ("PORT", "9100"),
            ("API_KEYS", "one;two three"),
            ("VOICE_MODEL", "/voices/en_GB-alba-medium.onnx"),
            ("VOICE_CONFIG", "/voices/en_GB-alba-medium.onnx.json"),
            ("REQUEST_TIMEOUT_SECS", "5"),
            ("LOG_FORMAT", "json"),
        ])
        .unwrap();

        assert_eq!(config.addr, "127.0.0.1:9100".parse::<SocketAddr>().unwrap());
        assert_eq!(config.api_keys.len(), 3);
        assert_eq!(config.voice_name, "Alba");
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn explicit_voice_name_wins() {
        let config = config(&[("VOICE_NAME", "Narrator")]).unwrap();
        assert_eq!(config.voice_name, "Narrator");
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let config = config(&[("PORT", ""), ("VOICE_MODEL", "  ")]).unwrap();
        assert_eq!(config.addr.port(), 8000);
        assert_eq!(config.voice_model, PathBuf::from("/app/voice/edwin.onnx"));
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            config(&[("PORT", "eighty")]),
            Err(ConfigError::Invalid { var: "PORT", .. })
        ));
        assert!(matches!(
            config(&[("HOST", "not a host")]),
            Err(ConfigError::Invalid { var: "HOST", .. })
        ));
        assert!(matches!(
            config(&[("REQUEST_TIMEOUT_SECS", "0")]),
            Err(ConfigError::Invalid { var: "REQUEST_TIMEOUT_SECS", .. })
        ));
        assert!(matches!(
            config(&[("LOG_FORMAT", "xml")]),
            Err(ConfigError::Invalid { var: "LOG_FORMAT", .. })
        ));
    }
}
