//! Prelude module for convenient imports.
//!
//! ```rust,ignore
//! use newscast::prelude::*;
//! ```

pub use crate::artifact::{ArtifactStore, AudioArtifact, audio_filename};
pub use crate::config::{Config, NewsSettings, ScriptSettings, SpeechSettings, ValidationResult};
pub use crate::error::{Error, Result, UpstreamError, UpstreamErrorKind};
pub use crate::news::{Article, HeadlineSource, NewsApi};
pub use crate::pipeline::{Pipeline, PipelineResult, PipelineState, Stage};
pub use crate::probe::{Probe, ProbeReport, run_probe};
pub use crate::retry::RetryConfig;
pub use crate::script::{Script, ScriptGenerator, ScriptWriter};
pub use crate::speech::{AudioBytes, ElevenLabs, SpeechSynthesizer};
pub use crate::upstream::{AuthScheme, Credential, Provider};
