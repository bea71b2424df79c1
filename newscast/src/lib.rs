//! Newscast - turn today's headlines into a narrated podcast episode.
//!
//! The crate chains three upstream HTTP services into one linear pipeline:
//!
//! 1. [`news`] fetches a page of top headlines from NewsAPI.
//! 2. [`script`] asks an OpenAI chat model to write a podcast script about them.
//! 3. [`speech`] sends the script to ElevenLabs and keeps the returned audio bytes.
//!
//! [`pipeline::Pipeline`] validates the [`config::Config`], runs the stages in
//! order, checks every intermediate result, and persists the artifacts through
//! [`artifact::ArtifactStore`].

pub mod artifact;
pub mod config;
pub mod error;
pub mod news;
pub mod pipeline;
pub mod prelude;
pub mod probe;
pub mod retry;
pub mod script;
pub mod speech;
pub mod upstream;

pub use error::{Error, Result, UpstreamError};
