use serde::{Deserialize, Serialize};

use crate::GenerationError;

/// Which completion service to call and with which knobs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GenerationConfig {
    /// `"api"` (remote HTTP) or `"fast"` (deterministic offline skeleton).
    pub mode: String,
    /// Model identifier sent with every request.
    pub model_name: String,
    pub api_url: Option<String>,
    /// Authorization header (e.g., `"Bearer sk-xxx"`).
    pub api_auth_header: Option<String>,
    /// `"openai"` (chat completions) or `"custom"` (default).
    pub api_provider: Option<String>,
    pub api_timeout_secs: Option<u64>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            mode: "api".into(),
            model_name: "snowflake-arctic".into(),
            api_url: None,
            api_auth_header: None,
            api_provider: None,
            api_timeout_secs: Some(60),
            temperature: None,
            max_tokens: None,
        }
    }
}

impl GenerationConfig {
    pub fn fast() -> Self {
        Self {
            mode: "fast".into(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), GenerationError> {
        match self.mode.as_str() {
            "fast" => {}
            "api" => {
                if self.api_url.as_deref().unwrap_or("").trim().is_empty() {
                    return Err(GenerationError::InvalidConfig(
                        "api_url is required for api mode".into(),
                    ));
                }
            }
            other => {
                return Err(GenerationError::InvalidConfig(format!(
                    "unknown generation mode '{other}'"
                )))
            }
        }
        if self.model_name.trim().is_empty() {
            return Err(GenerationError::InvalidConfig(
                "model_name must not be empty".into(),
            ));
        }
        if self.api_timeout_secs == Some(0) {
            return Err(GenerationError::InvalidConfig(
                "api_timeout_secs must be greater than zero".into(),
            ));
        }
        if let Some(t) = self.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(GenerationError::InvalidConfig(format!(
                    "temperature must be in [0.0, 2.0], got {t}"
                )));
            }
        }
        if self.max_tokens == Some(0) {
            return Err(GenerationError::InvalidConfig(
                "max_tokens must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = GenerationConfig::default();
        assert_eq!(cfg.mode, "api");
        assert_eq!(cfg.model_name, "snowflake-arctic");
        assert_eq!(cfg.api_timeout_secs, Some(60));
    }

    #[test]
    fn api_mode_requires_url() {
        assert!(GenerationConfig::default().validate().is_err());
        let cfg = GenerationConfig {
            api_url: Some("http://localhost:9000/complete".into()),
            ..Default::default()
        };
        assert!(cfg.validate().is_ok());
        assert!(GenerationConfig::fast().validate().is_ok());
    }

    #[test]
    fn bad_knobs_rejected() {
        let hot = GenerationConfig {
            temperature: Some(3.5),
            ..GenerationConfig::fast()
        };
        assert!(hot.validate().unwrap_err().to_string().contains("temperature"));

        let zero = GenerationConfig {
            max_tokens: Some(0),
            ..GenerationConfig::fast()
        };
        assert!(zero.validate().is_err());

        let mode = GenerationConfig {
            mode: "local".into(),
            ..Default::default()
        };
        assert!(mode.validate().unwrap_err().to_string().contains("local"));
    }
}
