//! Pipeline configuration.
//!
//! A [`Config`] is an explicit value handed to the pipeline at construction.
//! Settings are layered, lowest precedence first:
//! 1. Built-in defaults
//! 2. A TOML file (`--config`, `NEWSCAST_CONFIG`, or `~/.newscast/config.toml`)
//! 3. A `.env` file in the working directory (never overrides real variables)
//! 4. Environment variables

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::retry::RetryConfig;
use crate::upstream::{Credential, Provider};

/// Substring marking a value copied from a template but never filled in.
pub const PLACEHOLDER_MARKER: &str = "your_";

/// Voice used when no voice selector is configured.
pub const DEFAULT_VOICE_ID: &str = "21m00Tcm4TlvDq8ikWAM";

/// Environment variable overriding the voice.
pub const VOICE_ID_ENV: &str = "ELEVENLABS_VOICE_ID";

/// Environment variable overriding the output directory.
pub const OUTPUT_DIR_ENV: &str = "NEWSCAST_OUTPUT_DIR";

/// Environment variable pointing at a configuration file.
pub const CONFIG_PATH_ENV: &str = "NEWSCAST_CONFIG";

/// Whether `value` counts as absent: blank, or an unfilled template value.
#[must_use]
pub fn is_placeholder(value: &str) -> bool {
    let value = value.trim();
    value.is_empty() || value.to_ascii_lowercase().contains(PLACEHOLDER_MARKER)
}

/// Get the default config directory path.
#[must_use]
pub fn default_config_dir() -> PathBuf {
    dirs_next::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".newscast")
}

/// Get the default config file path.
#[must_use]
pub fn default_config_path() -> PathBuf {
    default_config_dir().join("config.toml")
}

/// Root configuration.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// NewsAPI key.
    pub news_api_key: Option<String>,
    /// OpenAI key.
    pub openai_api_key: Option<String>,
    /// ElevenLabs key.
    pub elevenlabs_api_key: Option<String>,
    /// ElevenLabs voice identifier; [`DEFAULT_VOICE_ID`] when unset.
    pub voice_id: Option<String>,
    /// Directory receiving the script and audio artifacts.
    pub output_dir: PathBuf,
    /// Per-request timeout. Unset keeps the HTTP client's default.
    pub timeout_secs: Option<u64>,
    /// Headline query parameters.
    pub news: NewsSettings,
    /// Script generation parameters.
    pub script: ScriptSettings,
    /// Speech synthesis parameters.
    pub speech: SpeechSettings,
    /// Upstream base URLs.
    pub endpoints: Endpoints,
    /// Backoff policy for upstream requests.
    pub retry: RetryConfig,
}

/// Headline query parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewsSettings {
    /// Two-letter region code.
    pub country: String,
    /// Headline category.
    pub category: String,
    /// Number of articles requested.
    pub page_size: u32,
}

impl Default for NewsSettings {
    fn default() -> Self {
        Self {
            country: "us".to_owned(),
            category: "technology".to_owned(),
            page_size: 5,
        }
    }
}

/// Script generation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptSettings {
    /// Chat model identifier.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Maximum completion length in tokens.
    pub max_tokens: u32,
    /// Target spoken length of the script.
    pub target_words: u32,
    /// Name of the show the host presents.
    pub show_name: String,
    /// Name of the host persona.
    pub host_name: String,
    /// File name of the persisted script artifact.
    pub artifact_name: String,
}

impl Default for ScriptSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_owned(),
            temperature: 0.7,
            max_tokens: 1000,
            target_words: 400,
            show_name: "Tech News Today".to_owned(),
            host_name: "Alex".to_owned(),
            artifact_name: "podcast_script.txt".to_owned(),
        }
    }
}

/// Speech synthesis parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechSettings {
    /// Synthesis model identifier.
    pub model_id: String,
    /// Voice stability, 0.0 to 1.0.
    pub stability: f32,
    /// Similarity boost, 0.0 to 1.0.
    pub similarity_boost: f32,
    /// Prefix of generated audio file names.
    pub file_prefix: String,
    /// Extension of generated audio file names.
    pub extension: String,
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self {
            model_id: "eleven_monolingual_v1".to_owned(),
            stability: 0.5,
            similarity_boost: 0.5,
            file_prefix: "podcast_".to_owned(),
            extension: "mp3".to_owned(),
        }
    }
}

/// Upstream base URLs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    /// NewsAPI base URL.
    pub news: String,
    /// OpenAI base URL.
    pub openai: String,
    /// ElevenLabs base URL.
    pub elevenlabs: String,
}

impl Endpoints {
    /// Base URL for `provider`, without a trailing slash.
    #[must_use]
    pub fn base_url(&self, provider: Provider) -> &str {
        let url = match provider {
            Provider::NewsApi => &self.news,
            Provider::OpenAi => &self.openai,
            Provider::ElevenLabs => &self.elevenlabs,
        };
        url.trim_end_matches('/')
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            news: Provider::NewsApi.default_base_url().to_owned(),
            openai: Provider::OpenAi.default_base_url().to_owned(),
            elevenlabs: Provider::ElevenLabs.default_base_url().to_owned(),
        }
    }
}

/// Outcome of checking the required settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    /// True when nothing is missing.
    pub valid: bool,
    /// Offending setting names, in declaration order.
    pub missing: Vec<String>,
}

impl ValidationResult {
    /// Convert into a [`Error::Configuration`] when invalid.
    pub fn into_result(self) -> Result<()> {
        if self.valid {
            Ok(())
        } else {
            Err(Error::Configuration {
                missing: self.missing,
            })
        }
    }
}

impl Config {
    /// Parse a TOML document, rejecting unusable retry settings.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.retry.validate()?;
        Ok(config)
    }

    /// Load a TOML file.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await?;
        let config = Self::from_toml_str(&content)?;
        debug!(path = %path.display(), "loaded config file");
        Ok(config)
    }

    /// Build from defaults plus values found through `lookup`.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::default().with_lookup(lookup)
    }

    /// Build from defaults, `.env` and the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().with_env()
    }

    /// Load the full layered configuration.
    ///
    /// An explicit `path` must exist; the default path is used only if present.
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        let base = match path {
            Some(path) => Self::from_file(path).await?,
            None => {
                let default = default_config_path();
                if tokio::fs::try_exists(&default).await.unwrap_or(false) {
                    Self::from_file(&default).await?
                } else {
                    debug!(path = %default.display(), "config file not found, using defaults");
                    Self::default()
                }
            }
        };

        Ok(base.with_env())
    }

    /// Overlay values found through `lookup`, keyed by environment variable name.
    #[must_use]
    pub fn with_lookup<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        for provider in Provider::ALL {
            if let Some(value) = lookup(provider.env_key()) {
                *self.api_key_slot(provider) = Some(value);
            }
        }
        if let Some(voice) = lookup(VOICE_ID_ENV) {
            self.voice_id = Some(voice);
        }
        if let Some(dir) = lookup(OUTPUT_DIR_ENV) {
            self.output_dir = PathBuf::from(dir);
        }
        self
    }

    /// Overlay `.env` and the process environment.
    #[must_use]
    pub fn with_env(self) -> Self {
        match dotenvy::dotenv() {
            Ok(path) => info!(path = %path.display(), "loaded .env file"),
            Err(e) if e.not_found() => {}
            Err(e) => warn!(error = %e, "ignoring unreadable .env file"),
        }
        self.with_lookup(|key| std::env::var(key).ok())
    }

    /// Set the output directory.
    #[must_use]
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Point `provider` at another base URL.
    #[must_use]
    pub fn with_base_url(mut self, provider: Provider, url: impl Into<String>) -> Self {
        let url = url.into();
        match provider {
            Provider::NewsApi => self.endpoints.news = url,
            Provider::OpenAi => self.endpoints.openai = url,
            Provider::ElevenLabs => self.endpoints.elevenlabs = url,
        }
        self
    }

    /// The raw credential for `provider`, placeholders included.
    #[must_use]
    pub fn api_key(&self, provider: Provider) -> Option<&str> {
        match provider {
            Provider::NewsApi => self.news_api_key.as_deref(),
            Provider::OpenAi => self.openai_api_key.as_deref(),
            Provider::ElevenLabs => self.elevenlabs_api_key.as_deref(),
        }
    }

    fn api_key_slot(&mut self, provider: Provider) -> &mut Option<String> {
        match provider {
            Provider::NewsApi => &mut self.news_api_key,
            Provider::OpenAi => &mut self.openai_api_key,
            Provider::ElevenLabs => &mut self.elevenlabs_api_key,
        }
    }

    /// A usable credential for `provider`.
    ///
    /// Fails with a configuration error naming the variable when the value is
    /// missing or a placeholder.
    pub fn credential(&self, provider: Provider) -> Result<Credential> {
        match self.api_key(provider) {
            Some(key) if !is_placeholder(key) => Ok(self.unchecked_credential(provider)),
            _ => Err(Error::configuration([provider.env_key()])),
        }
    }

    /// The trimmed credential for `provider` without the placeholder check.
    ///
    /// A missing key yields an empty secret.
    #[must_use]
    pub fn unchecked_credential(&self, provider: Provider) -> Credential {
        Credential::new(provider, self.api_key(provider).map_or("", str::trim))
    }

    /// The voice to synthesize with, falling back to [`DEFAULT_VOICE_ID`].
    #[must_use]
    pub fn voice_id(&self) -> &str {
        self.voice_id
            .as_deref()
            .map(str::trim)
            .filter(|voice| !is_placeholder(voice))
            .unwrap_or(DEFAULT_VOICE_ID)
    }

    /// Check every required credential.
    #[must_use]
    pub fn validate(&self) -> ValidationResult {
        self.validate_for(&Provider::ALL)
    }

    /// Check only the credentials of `providers`.
    #[must_use]
    pub fn validate_for(&self, providers: &[Provider]) -> ValidationResult {
        let missing: Vec<String> = providers
            .iter()
            .filter(|provider| self.api_key(**provider).is_none_or(is_placeholder))
            .map(|provider| provider.env_key().to_owned())
            .collect();

        ValidationResult {
            valid: missing.is_empty(),
            missing,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            news_api_key: None,
            openai_api_key: None,
            elevenlabs_api_key: None,
            voice_id: None,
            output_dir: PathBuf::from("output"),
            timeout_secs: None,
            news: NewsSettings::default(),
            script: ScriptSettings::default(),
            speech: SpeechSettings::default(),
            endpoints: Endpoints::default(),
            retry: RetryConfig::default(),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |key: &Option<String>| key.as_ref().map(|_| "<redacted>");
        f.debug_struct("Config")
            .field("news_api_key", &redact(&self.news_api_key))
            .field("openai_api_key", &redact(&self.openai_api_key))
            .field("elevenlabs_api_key", &redact(&self.elevenlabs_api_key))
            .field("voice_id", &self.voice_id)
            .field("output_dir", &self.output_dir)
            .field("timeout_secs", &self.timeout_secs)
            .field("news", &self.news)
            .field("script", &self.script)
            .field("speech", &self.speech)
            .field("endpoints", &self.endpoints)
            .field("retry", &self.retry)
            .finish()
    }
}
