//! Podcast script generation through an OpenAI chat model.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use reqwest::{Client, Method};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use crate::artifact::ArtifactStore;
use crate::config::{Config, ScriptSettings};
use crate::error::{Error, Result};
use crate::news::Article;
use crate::retry::RetryConfig;
use crate::upstream::{self, Credential, Provider, UpstreamError};

/// Generated narration text. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    text: String,
    saved_to: Option<PathBuf>,
}

impl Script {
    /// Wrap generated text, or `None` if it is blank.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Option<Self> {
        let text = text.into();
        if text.trim().is_empty() {
            None
        } else {
            Some(Self {
                text,
                saved_to: None,
            })
        }
    }

    /// Record where the script was persisted.
    #[must_use]
    pub fn with_artifact(mut self, path: PathBuf) -> Self {
        self.saved_to = Some(path);
        self
    }

    /// The script text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Length in characters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    /// Whether the text is empty. Never true for a constructed script.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Path of the persisted copy, if one was written.
    #[must_use]
    pub fn saved_to(&self) -> Option<&Path> {
        self.saved_to.as_deref()
    }
}

/// Writes a script about a set of headlines.
#[async_trait]
pub trait ScriptWriter: Send + Sync {
    /// Produce a script covering `articles`.
    async fn write(&self, articles: &[Article]) -> Result<Script>;
}

/// Render articles as a numbered list for the prompt.
#[must_use]
pub fn format_articles(articles: &[Article]) -> String {
    let mut out = String::new();
    for (index, article) in articles.iter().enumerate() {
        let _ = writeln!(out, "{}. Title: {}", index + 1, article.title);
        if let Some(description) = &article.description {
            let _ = writeln!(out, "   Description: {description}");
        }
        let _ = writeln!(out, "   Source: {}", article.source_name);
        out.push('\n');
    }
    out
}

/// Embed the formatted articles in the script-writing instructions.
#[must_use]
pub fn build_prompt(articles: &[Article], settings: &ScriptSettings) -> String {
    format!(
        "You are {host}, the host of \"{show}\", a short daily podcast about technology.\n\
         Write a podcast script of about {words} words covering the headlines below.\n\
         \n\
         Tone: conversational, upbeat and clear, as if speaking to a curious listener.\n\
         \n\
         Structure:\n\
         - Open with a brief welcome that introduces yourself and the show.\n\
         - Cover every story in order, with a smooth transition between stories.\n\
         - Explain why each story matters in one or two sentences.\n\
         - Close with a short sign-off inviting listeners back tomorrow.\n\
         \n\
         Write only the words to be spoken. Do not include stage directions, \
         sound cues, speaker labels or markdown.\n\
         \n\
         Today's headlines:\n\
         \n\
         {list}",
        host = settings.host_name,
        show = settings.show_name,
        words = settings.target_words,
        list = format_articles(articles),
    )
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI chat-completion script writer.
#[derive(Debug, Clone)]
pub struct ScriptGenerator {
    client: Client,
    credential: Credential,
    base_url: String,
    settings: ScriptSettings,
    store: Option<ArtifactStore>,
    retry: RetryConfig,
}

impl ScriptGenerator {
    /// Create a generator from its parts. Scripts are not persisted until
    /// [`ScriptGenerator::with_store`] is called.
    pub fn new(
        credential: Credential,
        base_url: impl Into<String>,
        settings: ScriptSettings,
        timeout_secs: Option<u64>,
    ) -> Result<Self> {
        Ok(Self {
            client: upstream::build_client(Provider::OpenAi, timeout_secs)?,
            credential,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            settings,
            store: None,
            retry: RetryConfig::default(),
        })
    }

    /// Create a generator from the pipeline configuration, persisting scripts
    /// into the configured output directory.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(
            config.credential(Provider::OpenAi)?,
            config.endpoints.base_url(Provider::OpenAi),
            config.script.clone(),
            config.timeout_secs,
        )?
        .with_store(ArtifactStore::new(&config.output_dir))
        .with_retry(config.retry.clone()))
    }

    /// Persist every generated script through `store`.
    #[must_use]
    pub fn with_store(mut self, store: ArtifactStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    fn chat_url(&self) -> Result<Url> {
        Ok(Url::parse(&format!("{}/chat/completions", self.base_url))?)
    }

    /// Send `prompt` as a single user message and return the first
    /// completion's text.
    pub async fn complete(&self, prompt: &str) -> Result<String> {
        let url = self.chat_url()?;
        let body = ChatRequest {
            model: &self.settings.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        };
        debug!(%url, model = %self.settings.model, "POST");

        let response = upstream::execute(Provider::OpenAi, &self.retry, || {
            self.credential
                .authorize(&self.client, Method::POST, url.clone())
                .json(&body)
        })
        .await?;

        let text = response
            .text()
            .await
            .map_err(|e| UpstreamError::from_reqwest(Provider::OpenAi, &e))?;
        Self::parse_completion(&text)
    }

    fn parse_completion(body: &str) -> Result<String> {
        let parsed: ChatResponse = serde_json::from_str(body).map_err(|e| {
            UpstreamError::response_format(Provider::OpenAi, "a chat completion", e)
        })?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| Error::empty("completion choices"))?;

        debug!(
            model = parsed.model.as_deref().unwrap_or("unknown"),
            finish_reason = choice.finish_reason.as_deref().unwrap_or("unknown"),
            "completion received"
        );

        match choice.message.content {
            Some(content) if !content.trim().is_empty() => Ok(content),
            _ => Err(Error::empty("completion text")),
        }
    }
}

#[async_trait]
impl ScriptWriter for ScriptGenerator {
    async fn write(&self, articles: &[Article]) -> Result<Script> {
        if articles.is_empty() {
            return Err(Error::empty("article list"));
        }

        info!(
            articles = articles.len(),
            model = %self.settings.model,
            "generating script"
        );
        let prompt = build_prompt(articles, &self.settings);
        let text = self.complete(&prompt).await?;
        let mut script = Script::new(text).ok_or_else(|| Error::empty("completion text"))?;

        if let Some(store) = &self.store {
            let path = store
                .write_text(&self.settings.artifact_name, script.as_str())
                .await?;
            info!(path = %path.display(), "saved script");
            script = script.with_artifact(path);
        }

        info!(chars = script.len(), "generated script");
        Ok(script)
    }
}
