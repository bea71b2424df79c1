//! Text-to-speech synthesis through ElevenLabs.

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Method};
use serde::Serialize;
use tracing::{debug, info};
use url::Url;

use crate::config::{Config, SpeechSettings};
use crate::error::{Error, Result};
use crate::retry::RetryConfig;
use crate::upstream::{self, Credential, Provider, UpstreamError};

/// Encoded audio exactly as returned by the synthesizer.
///
/// Provides no `Display` or string conversion.
#[derive(Clone, PartialEq, Eq)]
pub struct AudioBytes(Bytes);

impl AudioBytes {
    /// Wrap encoded audio.
    #[must_use]
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    /// The raw bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Number of bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no audio was returned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Unwrap into the underlying buffer.
    #[must_use]
    pub fn into_bytes(self) -> Bytes {
        self.0
    }
}

impl From<Bytes> for AudioBytes {
    fn from(bytes: Bytes) -> Self {
        Self(bytes)
    }
}

impl From<Vec<u8>> for AudioBytes {
    fn from(bytes: Vec<u8>) -> Self {
        Self(Bytes::from(bytes))
    }
}

impl AsRef<[u8]> for AudioBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for AudioBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AudioBytes({} bytes)", self.0.len())
    }
}

/// Turns narration text into encoded audio.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize `text` into audio bytes.
    async fn synthesize(&self, text: &str) -> Result<AudioBytes>;
}

#[derive(Debug, Serialize)]
struct SynthesisRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: VoiceSettings,
}

#[derive(Debug, Serialize)]
struct VoiceSettings {
    stability: f32,
    similarity_boost: f32,
}

/// ElevenLabs text-to-speech client.
#[derive(Debug, Clone)]
pub struct ElevenLabs {
    client: Client,
    credential: Credential,
    base_url: String,
    voice_id: String,
    settings: SpeechSettings,
    retry: RetryConfig,
}

impl ElevenLabs {
    /// Create a client from its parts.
    pub fn new(
        credential: Credential,
        base_url: impl Into<String>,
        voice_id: impl Into<String>,
        settings: SpeechSettings,
        timeout_secs: Option<u64>,
    ) -> Result<Self> {
        Ok(Self {
            client: upstream::build_client(Provider::ElevenLabs, timeout_secs)?,
            credential,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            voice_id: voice_id.into(),
            settings,
            retry: RetryConfig::default(),
        })
    }

    /// Create a client from the pipeline configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(
            config.credential(Provider::ElevenLabs)?,
            config.endpoints.base_url(Provider::ElevenLabs),
            config.voice_id(),
            config.speech.clone(),
            config.timeout_secs,
        )?
        .with_retry(config.retry.clone()))
    }

    /// Set the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// The voice this client speaks with.
    #[must_use]
    pub fn voice_id(&self) -> &str {
        &self.voice_id
    }

    /// The synthesis URL for the configured voice.
    pub fn synthesis_url(&self) -> Result<Url> {
        let mut url = Url::parse(&format!("{}/", self.base_url))?;
        url.path_segments_mut()
            .map_err(|()| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .pop_if_empty()
            .extend(["text-to-speech", self.voice_id.as_str()]);
        Ok(url)
    }
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabs {
    async fn synthesize(&self, text: &str) -> Result<AudioBytes> {
        if text.trim().is_empty() {
            return Err(Error::empty("narration text"));
        }

        let url = self.synthesis_url()?;
        let body = SynthesisRequest {
            text,
            model_id: &self.settings.model_id,
            voice_settings: VoiceSettings {
                stability: self.settings.stability,
                similarity_boost: self.settings.similarity_boost,
            },
        };

        info!(
            voice = %self.voice_id,
            model = %self.settings.model_id,
            chars = text.chars().count(),
            "synthesizing speech"
        );
        debug!(%url, "POST");

        let response = upstream::execute(Provider::ElevenLabs, &self.retry, || {
            self.credential
                .authorize(&self.client, Method::POST, url.clone())
                .header(ACCEPT, "audio/mpeg")
                .json(&body)
        })
        .await?;

        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("application/json"));
        if is_json {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::response_format(
                Provider::ElevenLabs,
                "audio/mpeg",
                format!("a JSON document: {}", body.trim()),
            )
            .into());
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| UpstreamError::from_reqwest(Provider::ElevenLabs, &e))?;

        info!(bytes = audio.len(), "received audio");
        Ok(AudioBytes::from(audio))
    }
}
