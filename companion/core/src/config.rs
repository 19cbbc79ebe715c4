//! TOML Configuration File Support
//!
//! Centralized configuration loading for the companion, supporting a TOML
//! file at `~/.config/study-companion/companion.toml`.
//!
//! # Configuration Priority
//!
//! Values are loaded with the following priority (highest first):
//! 1. CLI arguments (applied by the caller through [`ConfigOverrides`])
//! 2. Environment variables
//! 3. TOML configuration file
//! 4. Default values
//!
//! # Example Configuration
//!
//! ```toml
//! [gateway]
//! base_url = "https://generativelanguage.googleapis.com/v1beta"
//! text_model = "gemini-3-flash-preview"
//! speech_model = "gemini-2.5-flash-preview-tts"
//! voice = "Kore"
//! request_timeout_secs = 60
//!
//! [prompts]
//! explain_temperature = 0.7
//! tutor_temperature = 0.8
//!
//! [chat]
//! greeting = "你好！我是你的助教。"
//! reset_greeting = "对话已重置。有什么我可以帮你的吗？"
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::backend::{EXPLAIN_TEMPERATURE, TUTOR_TEMPERATURE};
use crate::chat::{DEFAULT_GREETING, DEFAULT_RESET_GREETING};

/// Default Gemini REST endpoint
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default model for explanations and tutoring
pub const DEFAULT_TEXT_MODEL: &str = "gemini-3-flash-preview";

/// Default model for narration
pub const DEFAULT_SPEECH_MODEL: &str = "gemini-2.5-flash-preview-tts";

/// Default prebuilt narration voice
pub const DEFAULT_VOICE: &str = "Kore";

/// Default per-request deadline
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

const MAX_TEMPERATURE: f32 = 2.0;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

// =============================================================================
// Configuration Source Tracking
// =============================================================================

/// Tracks where the configuration came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Value from command-line argument
    Cli,
    /// Value from environment variable
    Env,
    /// Value from TOML configuration file
    File,
    /// Default value
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// Gateway section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayToml {
    /// REST endpoint root
    pub base_url: Option<String>,
    /// Model used for text generation
    pub text_model: Option<String>,
    /// Model used for speech synthesis
    pub speech_model: Option<String>,
    /// Prebuilt voice name
    pub voice: Option<String>,
    /// API key (prefer the environment)
    pub api_key: Option<String>,
    /// Per-request deadline in seconds
    pub request_timeout_secs: Option<u64>,
}

/// Prompts section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptsToml {
    /// Sampling temperature for explanations
    pub explain_temperature: Option<f32>,
    /// Sampling temperature for tutoring
    pub tutor_temperature: Option<f32>,
}

/// Chat section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatToml {
    /// First assistant message of a fresh session
    pub greeting: Option<String>,
    /// Assistant message seeded by a reset
    pub reset_greeting: Option<String>,
}

/// Top-level TOML configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CompanionToml {
    /// Gateway configuration section
    pub gateway: GatewayToml,
    /// Prompt configuration section
    pub prompts: PromptsToml,
    /// Chat configuration section
    pub chat: ChatToml,
}

// =============================================================================
// Main Configuration Structs
// =============================================================================

/// Settings for the remote generative service
#[derive(Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    /// REST endpoint root
    pub base_url: String,
    /// Model used for text generation
    pub text_model: String,
    /// Model used for speech synthesis
    pub speech_model: String,
    /// Prebuilt voice name
    pub voice: String,
    /// API key
    pub api_key: Option<String>,
    /// Deadline applied to every remote call
    pub request_timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            text_model: DEFAULT_TEXT_MODEL.to_string(),
            speech_model: DEFAULT_SPEECH_MODEL.to_string(),
            voice: DEFAULT_VOICE.to_string(),
            api_key: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("base_url", &self.base_url)
            .field("text_model", &self.text_model)
            .field("speech_model", &self.speech_model)
            .field("voice", &self.voice)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

/// Centralized configuration for the companion
///
/// Use [`load_config`] to load with proper priority handling, then apply
/// [`ConfigOverrides`] and call [`CompanionConfig::validate`].
#[derive(Clone, Debug)]
pub struct CompanionConfig {
    /// Remote service settings
    pub gateway: GatewayConfig,

    /// Sampling temperature for explanations
    pub explain_temperature: f32,

    /// Sampling temperature for tutoring
    pub tutor_temperature: f32,

    /// First assistant message of a fresh chat session
    pub greeting: String,

    /// Assistant message seeded by a chat reset
    pub reset_greeting: String,

    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,

    source: ConfigSource,
}

impl Default for CompanionConfig {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig::default(),
            explain_temperature: EXPLAIN_TEMPERATURE,
            tutor_temperature: TUTOR_TEMPERATURE,
            greeting: DEFAULT_GREETING.to_string(),
            reset_greeting: DEFAULT_RESET_GREETING.to_string(),
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl CompanionConfig {
    /// Create a new configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the highest-priority source that contributed a value
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Check value ranges
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] naming the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("explain_temperature", self.explain_temperature),
            ("tutor_temperature", self.tutor_temperature),
        ] {
            if !(0.0..=MAX_TEMPERATURE).contains(&value) {
                return Err(ConfigError::ValidationError(format!(
                    "{name} must be within [0.0, {MAX_TEMPERATURE}], got {value}"
                )));
            }
        }
        if self.gateway.request_timeout.is_zero() {
            return Err(ConfigError::ValidationError(
                "request timeout must be greater than zero".to_string(),
            ));
        }
        if self.gateway.text_model.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "text model must not be empty".to_string(),
            ));
        }
        if self.gateway.speech_model.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "speech model must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/study-companion/companion.toml` or
/// `~/.config/study-companion/companion.toml` if `XDG_CONFIG_HOME` is not set.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("study-companion").join("companion.toml"))
}

/// Load configuration from the default path, then the environment
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be parsed. A
/// missing config file is not an error. Values are not range-checked here;
/// call [`CompanionConfig::validate`] once overrides have been applied.
pub fn load_config() -> Result<CompanionConfig, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific path, then the environment
///
/// # Errors
///
/// Returns an error if the specified config file cannot be read or parsed.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<CompanionConfig, ConfigError> {
    load_config_with_env(path, |key| std::env::var(key).ok())
}

/// Load configuration resolving environment variables through `lookup`
///
/// # Errors
///
/// Same as [`load_config_from_path`].
pub fn load_config_with_env<F>(
    path: Option<PathBuf>,
    lookup: F,
) -> Result<CompanionConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = CompanionConfig::default();

    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.clone(),
                    source: e,
                })?;

            let toml_config: CompanionToml = toml::from_str(&toml_content)?;
            apply_toml_config(&mut config, &toml_config);
            config.config_file_path = Some(config_path.clone());
            config.source = ConfigSource::File;

            tracing::info!(
                path = %config_path.display(),
                "Loaded configuration from file"
            );
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config file not found, using defaults"
            );
        }
    }

    apply_env_config(&mut config, lookup);

    Ok(config)
}

fn apply_toml_config(config: &mut CompanionConfig, toml: &CompanionToml) {
    let gateway = &toml.gateway;
    if let Some(ref url) = gateway.base_url {
        config.gateway.base_url.clone_from(url);
    }
    if let Some(ref model) = gateway.text_model {
        config.gateway.text_model.clone_from(model);
    }
    if let Some(ref model) = gateway.speech_model {
        config.gateway.speech_model.clone_from(model);
    }
    if let Some(ref voice) = gateway.voice {
        config.gateway.voice.clone_from(voice);
    }
    if gateway.api_key.is_some() {
        config.gateway.api_key.clone_from(&gateway.api_key);
    }
    if let Some(secs) = gateway.request_timeout_secs {
        config.gateway.request_timeout = Duration::from_secs(secs);
    }

    if let Some(temperature) = toml.prompts.explain_temperature {
        config.explain_temperature = temperature;
    }
    if let Some(temperature) = toml.prompts.tutor_temperature {
        config.tutor_temperature = temperature;
    }

    if let Some(ref greeting) = toml.chat.greeting {
        config.greeting.clone_from(greeting);
    }
    if let Some(ref greeting) = toml.chat.reset_greeting {
        config.reset_greeting.clone_from(greeting);
    }
}

fn apply_env_config<F>(config: &mut CompanionConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    // GEMINI_API_KEY wins over the generic name
    if let Some(key) = lookup("GEMINI_API_KEY").or_else(|| lookup("API_KEY")) {
        config.gateway.api_key = Some(key);
        config.source = ConfigSource::Env;
    }
    if let Some(url) = lookup("COMPANION_BASE_URL") {
        config.gateway.base_url = url;
        config.source = ConfigSource::Env;
    }
    if let Some(model) = lookup("COMPANION_TEXT_MODEL") {
        config.gateway.text_model = model;
        config.source = ConfigSource::Env;
    }
    if let Some(model) = lookup("COMPANION_SPEECH_MODEL") {
        config.gateway.speech_model = model;
        config.source = ConfigSource::Env;
    }
    if let Some(voice) = lookup("COMPANION_VOICE") {
        config.gateway.voice = voice;
        config.source = ConfigSource::Env;
    }
    if let Some(timeout) = lookup("COMPANION_REQUEST_TIMEOUT") {
        if let Ok(secs) = timeout.parse::<u64>() {
            config.gateway.request_timeout = Duration::from_secs(secs);
            config.source = ConfigSource::Env;
        } else {
            tracing::warn!(value = %timeout, "Ignoring unparsable COMPANION_REQUEST_TIMEOUT");
        }
    }
}

// =============================================================================
// CLI Override Support
// =============================================================================

/// Builder for applying CLI overrides to configuration
///
/// Use this after [`load_config`] to apply command-line argument overrides.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// API key override
    pub api_key: Option<String>,

    /// Endpoint override
    pub base_url: Option<String>,

    /// Text model override
    pub text_model: Option<String>,

    /// Speech model override
    pub speech_model: Option<String>,

    /// Request timeout override (seconds)
    pub request_timeout_secs: Option<u64>,
}

impl ConfigOverrides {
    /// Create a new empty set of overrides
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set API key override
    #[must_use]
    pub fn with_api_key(mut self, key: String) -> Self {
        self.api_key = Some(key);
        self
    }

    /// Set endpoint override
    #[must_use]
    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = Some(url);
        self
    }

    /// Set text model override
    #[must_use]
    pub fn with_text_model(mut self, model: String) -> Self {
        self.text_model = Some(model);
        self
    }

    /// Set speech model override
    #[must_use]
    pub fn with_speech_model(mut self, model: String) -> Self {
        self.speech_model = Some(model);
        self
    }

    /// Set request timeout override
    #[must_use]
    pub fn with_request_timeout_secs(mut self, secs: u64) -> Self {
        self.request_timeout_secs = Some(secs);
        self
    }

    /// Apply overrides to a configuration
    pub fn apply(&self, config: &mut CompanionConfig) {
        if self.api_key.is_some()
            || self.base_url.is_some()
            || self.text_model.is_some()
            || self.speech_model.is_some()
            || self.request_timeout_secs.is_some()
        {
            config.source = ConfigSource::Cli;
        }

        if let Some(ref key) = self.api_key {
            config.gateway.api_key = Some(key.clone());
        }
        if let Some(ref url) = self.base_url {
            config.gateway.base_url.clone_from(url);
        }
        if let Some(ref model) = self.text_model {
            config.gateway.text_model.clone_from(model);
        }
        if let Some(ref model) = self.speech_model {
            config.gateway.speech_model.clone_from(model);
        }
        if let Some(secs) = self.request_timeout_secs {
            config.gateway.request_timeout = Duration::from_secs(secs);
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    // =========================================================================
    // Default Configuration Tests
    // =========================================================================

    #[test]
    fn test_default_config() {
        let config = CompanionConfig::default();

        assert_eq!(config.gateway.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.gateway.text_model, "gemini-3-flash-preview");
        assert_eq!(config.gateway.speech_model, "gemini-2.5-flash-preview-tts");
        assert_eq!(config.gateway.voice, "Kore");
        assert_eq!(config.gateway.api_key, None);
        assert_eq!(config.gateway.request_timeout, Duration::from_secs(60));
        assert!((config.explain_temperature - 0.7).abs() < f32::EPSILON);
        assert!((config.tutor_temperature - 0.8).abs() < f32::EPSILON);
        assert_eq!(config.source(), ConfigSource::Default);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_config_path() {
        if let Some(path) = default_config_path() {
            assert!(path.ends_with("study-companion/companion.toml"));
        }
    }

    // =========================================================================
    // File Loading Tests
    // =========================================================================

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = load_config_with_env(
            Some(PathBuf::from("/nonexistent/companion.toml")),
            no_env,
        )
        .unwrap();

        assert_eq!(config.source(), ConfigSource::Default);
        assert_eq!(config.config_file_path, None);
    }

    #[test]
    fn test_load_full_file() {
        let file = write_config(
            r#"
[gateway]
base_url = "http://localhost:8080"
text_model = "text-m"
speech_model = "speech-m"
voice = "Puck"
api_key = "from-file"
request_timeout_secs = 5

[prompts]
explain_temperature = 0.2
tutor_temperature = 1.1

[chat]
greeting = "hello"
reset_greeting = "again"
"#,
        );

        let config = load_config_with_env(Some(file.path().to_path_buf()), no_env).unwrap();

        assert_eq!(config.gateway.base_url, "http://localhost:8080");
        assert_eq!(config.gateway.text_model, "text-m");
        assert_eq!(config.gateway.speech_model, "speech-m");
        assert_eq!(config.gateway.voice, "Puck");
        assert_eq!(config.gateway.api_key.as_deref(), Some("from-file"));
        assert_eq!(config.gateway.request_timeout, Duration::from_secs(5));
        assert!((config.explain_temperature - 0.2).abs() < f32::EPSILON);
        assert!((config.tutor_temperature - 1.1).abs() < f32::EPSILON);
        assert_eq!(config.greeting, "hello");
        assert_eq!(config.reset_greeting, "again");
        assert_eq!(config.source(), ConfigSource::File);
        assert_eq!(config.config_file_path, Some(file.path().to_path_buf()));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let file = write_config("[prompts]\ntutor_temperature = 0.3\n");

        let config = load_config_with_env(Some(file.path().to_path_buf()), no_env).unwrap();

        assert!((config.tutor_temperature - 0.3).abs() < f32::EPSILON);
        assert!((config.explain_temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(config.gateway.voice, "Kore");
    }

    #[test]
    fn test_invalid_toml() {
        let file = write_config("[gateway\nbase_url = ");

        let result = load_config_with_env(Some(file.path().to_path_buf()), no_env);
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_out_of_range_temperature_rejected() {
        let file = write_config("[prompts]\nexplain_temperature = 3.5\n");

        let config = load_config_with_env(Some(file.path().to_path_buf()), no_env).unwrap();
        match config.validate() {
            Err(ConfigError::ValidationError(msg)) => {
                assert!(msg.contains("explain_temperature"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let file = write_config("[gateway]\nrequest_timeout_secs = 0\n");

        let config = load_config_with_env(Some(file.path().to_path_buf()), no_env).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_cli_timeout_repairs_file_value() {
        let file = write_config("[gateway]\nrequest_timeout_secs = 0\n");

        let mut config = load_config_with_env(Some(file.path().to_path_buf()), no_env).unwrap();
        ConfigOverrides::new()
            .with_request_timeout_secs(30)
            .apply(&mut config);

        assert!(config.validate().is_ok());
        assert_eq!(config.gateway.request_timeout, Duration::from_secs(30));
        assert_eq!(config.source(), ConfigSource::Cli);
    }

    // =========================================================================
    // Environment Tests
    // =========================================================================

    #[test]
    fn test_env_overrides_file() {
        let file = write_config("[gateway]\ntext_model = \"from-file\"\n");
        let env: HashMap<&str, &str> = HashMap::from([
            ("COMPANION_TEXT_MODEL", "from-env"),
            ("COMPANION_REQUEST_TIMEOUT", "12"),
            ("API_KEY", "generic"),
        ]);

        let config = load_config_with_env(Some(file.path().to_path_buf()), |key| {
            env.get(key).map(ToString::to_string)
        })
        .unwrap();

        assert_eq!(config.gateway.text_model, "from-env");
        assert_eq!(config.gateway.request_timeout, Duration::from_secs(12));
        assert_eq!(config.gateway.api_key.as_deref(), Some("generic"));
        assert_eq!(config.source(), ConfigSource::Env);
    }

    #[test]
    fn test_gemini_key_preferred() {
        let env: HashMap<&str, &str> =
            HashMap::from([("GEMINI_API_KEY", "gemini"), ("API_KEY", "generic")]);

        let config =
            load_config_with_env(None, |key| env.get(key).map(ToString::to_string)).unwrap();

        assert_eq!(config.gateway.api_key.as_deref(), Some("gemini"));
    }

    #[test]
    fn test_unparsable_env_timeout_ignored() {
        let config = load_config_with_env(None, |key| {
            (key == "COMPANION_REQUEST_TIMEOUT").then(|| "soon".to_string())
        })
        .unwrap();

        assert_eq!(config.gateway.request_timeout, DEFAULT_REQUEST_TIMEOUT);
        assert_eq!(config.source(), ConfigSource::Default);
    }

    // =========================================================================
    // CLI Override Tests
    // =========================================================================

    #[test]
    fn test_cli_overrides() {
        let mut config = CompanionConfig::default();
        ConfigOverrides::new()
            .with_api_key("cli-key".to_string())
            .with_base_url("http://cli".to_string())
            .with_text_model("cli-model".to_string())
            .with_speech_model("cli-speech".to_string())
            .with_request_timeout_secs(7)
            .apply(&mut config);

        assert_eq!(config.gateway.api_key.as_deref(), Some("cli-key"));
        assert_eq!(config.gateway.base_url, "http://cli");
        assert_eq!(config.gateway.text_model, "cli-model");
        assert_eq!(config.gateway.speech_model, "cli-speech");
        assert_eq!(config.gateway.request_timeout, Duration::from_secs(7));
        assert_eq!(config.source(), ConfigSource::Cli);
    }

    #[test]
    fn test_empty_overrides_keep_source() {
        let mut config = CompanionConfig::default();
        ConfigOverrides::new().apply(&mut config);
        assert_eq!(config.source(), ConfigSource::Default);
    }

    #[test]
    fn test_blank_model_rejected() {
        let mut config = CompanionConfig::default();
        ConfigOverrides::new()
            .with_text_model("  ".to_string())
            .apply(&mut config);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_debug_redacts_key() {
        let gateway = GatewayConfig {
            api_key: Some("secret".to_string()),
            ..GatewayConfig::default()
        };
        let rendered = format!("{gateway:?}");
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_source_display() {
        assert_eq!(ConfigSource::Cli.to_string(), "CLI");
        assert_eq!(ConfigSource::Env.to_string(), "environment");
        assert_eq!(ConfigSource::File.to_string(), "config file");
        assert_eq!(ConfigSource::Default.to_string(), "default");
    }
}
