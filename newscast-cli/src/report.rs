//! Console rendering of run outcomes.

use std::fmt::Write as _;

use newscast::pipeline::PipelineResult;
use newscast::{Error, UpstreamError};

const RULE: &str = "============================================================";

/// Summary printed after a successful run.
#[must_use]
pub fn render_summary(result: &PipelineResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out, "Podcast generated");
    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out, "articles:      {}", result.article_count());
    let _ = writeln!(out, "script length: {} characters", result.script_length());
    if let Some(path) = result.script_path() {
        let _ = writeln!(out, "script:        {}", path.display());
    }
    let _ = writeln!(out, "audio:         {}", result.audio_path().display());
    let _ = write!(out, "{RULE}");
    out
}

/// Delimited diagnostic block for a failed run.
#[must_use]
pub fn render_failure(err: &Error) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out, "Run failed");
    let _ = writeln!(out, "{RULE}");

    match (err.stage(), err.aborted_at()) {
        (Some(stage), _) => {
            let _ = writeln!(out, "stage:   {stage}");
        }
        (None, Some(state)) => {
            let _ = writeln!(out, "stage:   {state}");
        }
        (None, None) => {}
    }
    let _ = writeln!(out, "cause:   {}", err.root());

    if let Error::Configuration { missing } = err.root() {
        let _ = writeln!(out, "missing:");
        for name in missing {
            let _ = writeln!(out, "  - {name}");
        }
        let _ = writeln!(
            out,
            "hint:    set these in the environment or a .env file; values containing \
             \"your_\" are treated as unset"
        );
    }

    if let Some(upstream) = err.upstream() {
        write_upstream(&mut out, upstream);
    }

    let _ = write!(out, "{RULE}");
    out
}

fn write_upstream(out: &mut String, upstream: &UpstreamError) {
    let _ = writeln!(out, "service: {}", upstream.provider);
    if let Some(status) = upstream.status {
        let _ = writeln!(out, "status:  {status}");
    }
    if let Some(hint) = upstream.hint() {
        let _ = writeln!(out, "hint:    {hint}");
    }
}
