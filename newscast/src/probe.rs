//! Connectivity probes that exercise one upstream at a time.

use std::fmt;
use std::path::PathBuf;

use tracing::info;

use crate::artifact::ArtifactStore;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::news::{HeadlineSource, NewsApi};
use crate::pipeline::Stage;
use crate::script::ScriptGenerator;
use crate::speech::{ElevenLabs, SpeechSynthesizer};
use crate::upstream::Provider;

/// Prompt sent by the LLM probe.
pub const PROBE_PROMPT: &str = "Reply with one short sentence confirming you can hear me.";

/// Sentence spoken by the TTS probe.
pub const PROBE_SENTENCE: &str = "Hello, this is a test of the newscast speech pipeline.";

/// Audio file prefix used by the TTS probe.
pub const PROBE_AUDIO_PREFIX: &str = "probe_";

/// A single upstream check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Probe {
    /// Fetch a page of headlines.
    News,
    /// Request a short completion.
    Llm,
    /// Synthesize a short sentence and save it.
    Tts,
}

impl Probe {
    /// Every probe, in run order.
    pub const ALL: [Self; 3] = [Self::News, Self::Llm, Self::Tts];

    /// The upstream this probe talks to.
    #[must_use]
    pub const fn provider(self) -> Provider {
        match self {
            Self::News => Provider::NewsApi,
            Self::Llm => Provider::OpenAi,
            Self::Tts => Provider::ElevenLabs,
        }
    }

    /// The pipeline stage this probe stands in for.
    #[must_use]
    pub const fn stage(self) -> Stage {
        match self {
            Self::News => Stage::Fetch,
            Self::Llm => Stage::Generate,
            Self::Tts => Stage::Synthesize,
        }
    }
}

impl fmt::Display for Probe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::News => "news",
            Self::Llm => "llm",
            Self::Tts => "tts",
        })
    }
}

/// What a passing probe observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeReport {
    /// Headlines fetched.
    News {
        /// Titles returned after filtering.
        titles: Vec<String>,
    },
    /// Completion received.
    Llm {
        /// The completion text.
        reply: String,
    },
    /// Audio synthesized and saved.
    Tts {
        /// Saved file.
        path: PathBuf,
        /// Audio size in bytes.
        size: usize,
    },
}

impl fmt::Display for ProbeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::News { titles } => {
                write!(f, "fetched {} headline(s)", titles.len())?;
                for (index, title) in titles.iter().enumerate() {
                    write!(f, "\n  {}. {title}", index + 1)?;
                }
                Ok(())
            }
            Self::Llm { reply } => write!(f, "model replied: {}", reply.trim()),
            Self::Tts { path, size } => {
                write!(f, "saved {size} bytes of audio to {}", path.display())
            }
        }
    }
}

/// Run one probe.
///
/// Only the credential of the probed upstream is validated.
pub async fn run_probe(config: &Config, probe: Probe) -> Result<ProbeReport> {
    config
        .validate_for(&[probe.provider()])
        .into_result()?;

    info!(%probe, provider = %probe.provider(), "running probe");
    let report = match probe {
        Probe::News => probe_news(config).await,
        Probe::Llm => probe_llm(config).await,
        Probe::Tts => probe_tts(config).await,
    };
    report.map_err(|e| e.in_stage(probe.stage()))
}

async fn probe_news(config: &Config) -> Result<ProbeReport> {
    let articles = NewsApi::from_config(config)?.headlines().await?;
    Ok(ProbeReport::News {
        titles: articles.into_iter().map(|a| a.title).collect(),
    })
}

async fn probe_llm(config: &Config) -> Result<ProbeReport> {
    let generator = ScriptGenerator::new(
        config.credential(Provider::OpenAi)?,
        config.endpoints.base_url(Provider::OpenAi),
        config.script.clone(),
        config.timeout_secs,
    )?
    .with_retry(config.retry.clone());
    let reply = generator.complete(PROBE_PROMPT).await?;
    Ok(ProbeReport::Llm { reply })
}

async fn probe_tts(config: &Config) -> Result<ProbeReport> {
    let audio = ElevenLabs::from_config(config)?
        .synthesize(PROBE_SENTENCE)
        .await?;
    if audio.is_empty() {
        return Err(Error::empty("audio"));
    }

    let artifact = ArtifactStore::new(&config.output_dir)
        .write_audio(PROBE_AUDIO_PREFIX, &config.speech.extension, &audio)
        .await?;
    Ok(ProbeReport::Tts {
        path: artifact.path,
        size: artifact.size,
    })
}
