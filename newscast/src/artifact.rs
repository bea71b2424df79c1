//! On-disk artifacts produced by a run.
//!
//! The script is written under a fixed name and replaced on every run; audio
//! files carry a timestamp and accumulate. An audio name that is already taken
//! gets a numeric suffix, so existing audio is never replaced.

use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::Result;
use crate::speech::AudioBytes;

/// `strftime` pattern for artifact timestamps. Colons are replaced by dashes
/// so the name is valid on every filesystem.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H-%M-%S";

/// How many suffixed names are tried before giving up on a taken audio name.
const MAX_NAME_SUFFIX: u32 = 100;

/// Render `{prefix}{timestamp}.{extension}` at second precision.
#[must_use]
pub fn audio_filename(prefix: &str, at: DateTime<Utc>, extension: &str) -> String {
    let extension = extension.trim_start_matches('.');
    format!("{prefix}{}.{extension}", at.format(TIMESTAMP_FORMAT))
}

/// `podcast_X.mp3` becomes `podcast_X_{n}.mp3`.
fn with_suffix(filename: &str, n: u32) -> String {
    match filename.rsplit_once('.') {
        Some((stem, extension)) => format!("{stem}_{n}.{extension}"),
        None => format!("{filename}_{n}"),
    }
}

/// A persisted audio file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioArtifact {
    /// File name inside the output directory.
    pub filename: String,
    /// Full path of the written file.
    pub path: PathBuf,
    /// Number of bytes written.
    pub size: usize,
}

/// Writes artifacts into one output directory, creating it on first use.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    /// Create a store rooted at `dir`. Nothing is touched until the first write.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The output directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write a text artifact, replacing any previous file of that name.
    pub async fn write_text(&self, name: &str, text: &str) -> Result<PathBuf> {
        self.write(name, text.as_bytes()).await
    }

    /// Write audio bytes verbatim under a timestamped name.
    ///
    /// Never replaces an existing file: a taken name gets a numeric suffix.
    pub async fn write_audio(
        &self,
        prefix: &str,
        extension: &str,
        audio: &AudioBytes,
    ) -> Result<AudioArtifact> {
        self.write_audio_at(prefix, Utc::now(), extension, audio).await
    }

    async fn write_audio_at(
        &self,
        prefix: &str,
        at: DateTime<Utc>,
        extension: &str,
        audio: &AudioBytes,
    ) -> Result<AudioArtifact> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let base = audio_filename(prefix, at, extension);

        for n in 0..=MAX_NAME_SUFFIX {
            let filename = if n == 0 {
                base.clone()
            } else {
                with_suffix(&base, n)
            };
            let path = self.dir.join(&filename);
            match create_new(&path, audio.as_bytes()).await {
                Ok(()) => {
                    debug!(path = %path.display(), bytes = audio.len(), "wrote audio");
                    return Ok(AudioArtifact {
                        filename,
                        path,
                        size: audio.len(),
                    });
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    debug!(path = %path.display(), "audio name taken");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("every name derived from {base} is taken"),
        )
        .into())
    }

    async fn write(&self, name: &str, bytes: &[u8]) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(name);
        tokio::fs::write(&path, bytes).await?;
        debug!(path = %path.display(), bytes = bytes.len(), "wrote artifact");
        Ok(path)
    }
}

async fn create_new(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await?;
    file.write_all(bytes).await?;
    file.flush().await
}
