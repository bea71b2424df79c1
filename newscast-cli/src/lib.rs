//! Newscast CLI - shared pieces of the `newscast` and `newscast-probe` binaries.

pub mod logging;
pub mod report;
