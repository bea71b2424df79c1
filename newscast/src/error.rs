//! Unified error types for the newscast pipeline.
//!
//! The taxonomy mirrors how a run can fail:
//! - [`Error::Configuration`]: required settings absent or still placeholders
//! - [`Error::InvalidSetting`]: a setting present with an unusable value
//! - [`Error::Upstream`]: one of the three HTTP services failed
//! - [`Error::EmptyResult`]: a stage produced a well-formed but empty value
//! - [`Error::Stage`]: any of the above, tagged with the stage it aborted

use crate::pipeline::{PipelineState, Stage};

pub use crate::upstream::{UpstreamError, UpstreamErrorKind};

/// Result type alias for newscast operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for the newscast crate.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Required configuration is missing or holds a placeholder value.
    #[error("missing or placeholder configuration: {}", missing.join(", "))]
    Configuration {
        /// Every offending setting name, in declaration order.
        missing: Vec<String>,
    },

    /// A setting is present but holds an unusable value.
    #[error("invalid setting {name}: {reason}")]
    InvalidSetting {
        /// Dotted path of the setting.
        name: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// Upstream service error.
    #[error("upstream error: {0}")]
    Upstream(#[from] UpstreamError),

    /// A stage returned a structurally valid but empty result.
    #[error("{what} is empty")]
    EmptyResult {
        /// What came back empty.
        what: String,
    },

    /// A pipeline stage failed.
    #[error("{stage} stage failed: {source}")]
    Stage {
        /// The stage that failed.
        stage: Stage,
        /// The underlying failure.
        source: Box<Error>,
    },

    /// I/O error while persisting artifacts or reading configuration.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration file could not be parsed.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// An endpoint URL could not be built.
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl Error {
    /// Create a configuration error for the given setting names.
    #[must_use]
    pub fn configuration<I, S>(missing: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Configuration {
            missing: missing.into_iter().map(Into::into).collect(),
        }
    }

    /// Create an error for a setting with an unusable value.
    #[must_use]
    pub fn invalid_setting(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidSetting {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create an empty-result error.
    #[must_use]
    pub fn empty(what: impl Into<String>) -> Self {
        Self::EmptyResult { what: what.into() }
    }

    /// Tag this error with the stage it happened in.
    ///
    /// Errors already tagged keep their original stage.
    #[must_use]
    pub fn in_stage(self, stage: Stage) -> Self {
        match self {
            Self::Stage { .. } => self,
            other => Self::Stage {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// The stage this error was tagged with, if any.
    #[must_use]
    pub const fn stage(&self) -> Option<Stage> {
        match self {
            Self::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// The innermost cause, with stage tags peeled off.
    #[must_use]
    pub fn root(&self) -> &Self {
        match self {
            Self::Stage { source, .. } => source.root(),
            other => other,
        }
    }

    /// The upstream failure at the root of this error, if there is one.
    #[must_use]
    pub fn upstream(&self) -> Option<&UpstreamError> {
        match self.root() {
            Self::Upstream(err) => Some(err),
            _ => None,
        }
    }

    /// The pipeline state a run was in when this error aborted it.
    #[must_use]
    pub const fn aborted_at(&self) -> Option<PipelineState> {
        match self {
            Self::Configuration { .. } | Self::InvalidSetting { .. } => {
                Some(PipelineState::ValidatingConfig)
            }
            Self::Stage { stage, .. } => Some(stage.state()),
            _ => None,
        }
    }
}
