//! The linear fetch → generate → synthesize pipeline.
//!
//! ```text
//! Init → ValidatingConfig → Fetching → Scripting → Synthesizing → Done
//!              ╰──────────────┴───────────┴────────────┴──→ Aborted
//! ```
//!
//! Every stage runs at most once per [`Pipeline::run`]. A failure in any
//! stage aborts the run; nothing is retried at this level.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{error, info};

use crate::artifact::ArtifactStore;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::news::{Article, HeadlineSource, NewsApi};
use crate::script::{Script, ScriptGenerator, ScriptWriter};
use crate::speech::{ElevenLabs, SpeechSynthesizer};
use crate::upstream::Provider;

/// One of the three remote stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Headline fetching.
    Fetch,
    /// Script generation.
    Generate,
    /// Speech synthesis and audio persistence.
    Synthesize,
}

impl Stage {
    /// Stage name used in diagnostics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fetch => "fetch",
            Self::Generate => "generate",
            Self::Synthesize => "synthesize",
        }
    }

    /// The pipeline state this stage runs in.
    #[must_use]
    pub const fn state(self) -> PipelineState {
        match self {
            Self::Fetch => PipelineState::Fetching,
            Self::Generate => PipelineState::Scripting,
            Self::Synthesize => PipelineState::Synthesizing,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// States of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PipelineState {
    /// Not started.
    Init,
    /// Checking required configuration.
    ValidatingConfig,
    /// Fetching headlines.
    Fetching,
    /// Generating the script.
    Scripting,
    /// Synthesizing and saving audio.
    Synthesizing,
    /// Finished successfully.
    Done,
    /// Stopped by a failure.
    Aborted,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::ValidatingConfig => "validating-config",
            Self::Fetching => "fetching",
            Self::Scripting => "scripting",
            Self::Synthesizing => "synthesizing",
            Self::Done => "done",
            Self::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// Outcome of a successful run.
#[derive(Debug, Clone)]
pub struct PipelineResult {
    success: bool,
    article_count: usize,
    script: Script,
    audio_path: PathBuf,
}

impl PipelineResult {
    /// Whether the run completed. Failed runs return an error instead, so
    /// this is true for every constructed result.
    #[must_use]
    pub const fn success(&self) -> bool {
        self.success
    }

    /// Number of headlines the script was written from.
    #[must_use]
    pub const fn article_count(&self) -> usize {
        self.article_count
    }

    /// The generated script.
    #[must_use]
    pub const fn script(&self) -> &Script {
        &self.script
    }

    /// Script length in characters.
    #[must_use]
    pub fn script_length(&self) -> usize {
        self.script.len()
    }

    /// Where the audio was written.
    #[must_use]
    pub fn audio_path(&self) -> &Path {
        &self.audio_path
    }

    /// Where the script was written, if it was persisted.
    #[must_use]
    pub fn script_path(&self) -> Option<&Path> {
        self.script.saved_to()
    }
}

/// Runs the three stages in order against one configuration.
pub struct Pipeline {
    config: Config,
    source: Box<dyn HeadlineSource>,
    writer: Box<dyn ScriptWriter>,
    synthesizer: Box<dyn SpeechSynthesizer>,
    store: ArtifactStore,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Assemble a pipeline from arbitrary stage implementations.
    pub fn new(
        config: Config,
        source: impl HeadlineSource + 'static,
        writer: impl ScriptWriter + 'static,
        synthesizer: impl SpeechSynthesizer + 'static,
    ) -> Self {
        let store = ArtifactStore::new(&config.output_dir);
        Self {
            config,
            source: Box::new(source),
            writer: Box::new(writer),
            synthesizer: Box::new(synthesizer),
            store,
        }
    }

    /// Wire the NewsAPI, OpenAI and ElevenLabs clients from `config`.
    ///
    /// Credentials are not checked here; [`Pipeline::run`] validates them
    /// before the first request.
    pub fn from_config(config: Config) -> Result<Self> {
        let source = NewsApi::new(
            config.unchecked_credential(Provider::NewsApi),
            config.endpoints.base_url(Provider::NewsApi),
            config.news.clone(),
            config.timeout_secs,
        )?
        .with_retry(config.retry.clone());
        let writer = ScriptGenerator::new(
            config.unchecked_credential(Provider::OpenAi),
            config.endpoints.base_url(Provider::OpenAi),
            config.script.clone(),
            config.timeout_secs,
        )?
        .with_store(ArtifactStore::new(&config.output_dir))
        .with_retry(config.retry.clone());
        let synthesizer = ElevenLabs::new(
            config.unchecked_credential(Provider::ElevenLabs),
            config.endpoints.base_url(Provider::ElevenLabs),
            config.voice_id(),
            config.speech.clone(),
            config.timeout_secs,
        )?
        .with_retry(config.retry.clone());

        Ok(Self::new(config, source, writer, synthesizer))
    }

    /// The configuration this pipeline runs with.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Run every stage once.
    ///
    /// On failure the returned error reports the state the run aborted in
    /// through [`Error::aborted_at`].
    pub async fn run(&self) -> Result<PipelineResult> {
        transition(PipelineState::Init, PipelineState::ValidatingConfig);
        let checked = self
            .config
            .validate()
            .into_result()
            .and_then(|()| self.config.retry.validate());
        if let Err(e) = checked {
            return Err(abort(e));
        }

        transition(PipelineState::ValidatingConfig, PipelineState::Fetching);
        let articles = self
            .fetch()
            .await
            .map_err(|e| abort(e.in_stage(Stage::Fetch)))?;

        transition(PipelineState::Fetching, PipelineState::Scripting);
        let script = self
            .writer
            .write(&articles)
            .await
            .map_err(|e| abort(e.in_stage(Stage::Generate)))?;

        transition(PipelineState::Scripting, PipelineState::Synthesizing);
        let audio_path = self
            .synthesize(&script)
            .await
            .map_err(|e| abort(e.in_stage(Stage::Synthesize)))?;

        transition(PipelineState::Synthesizing, PipelineState::Done);
        info!(
            articles = articles.len(),
            script_chars = script.len(),
            audio = %audio_path.display(),
            "pipeline finished"
        );

        Ok(PipelineResult {
            success: true,
            article_count: articles.len(),
            script,
            audio_path,
        })
    }

    async fn fetch(&self) -> Result<Vec<Article>> {
        let articles = self.source.headlines().await?;
        if articles.is_empty() {
            return Err(Error::empty("headline list"));
        }
        Ok(articles)
    }

    async fn synthesize(&self, script: &Script) -> Result<PathBuf> {
        let audio = self.synthesizer.synthesize(script.as_str()).await?;
        if audio.is_empty() {
            return Err(Error::empty("audio"));
        }

        let speech = &self.config.speech;
        let artifact = self
            .store
            .write_audio(&speech.file_prefix, &speech.extension, &audio)
            .await?;
        if !tokio::fs::try_exists(&artifact.path).await? {
            return Err(Error::empty("audio file"));
        }
        info!(path = %artifact.path.display(), bytes = artifact.size, "saved audio");
        Ok(artifact.path)
    }
}

fn transition(from: PipelineState, to: PipelineState) {
    info!(%from, %to, "pipeline state");
}

fn abort(err: Error) -> Error {
    let at = err.aborted_at().unwrap_or(PipelineState::Init);
    error!(state = %at, error = %err, "pipeline {}", PipelineState::Aborted);
    err
}
