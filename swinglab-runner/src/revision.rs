//! Code revision discovery for provenance.
//!
//! Order: explicit override, then `SWINGLAB_CODE_REVISION`, then
//! `git rev-parse HEAD`. `None` means provenance will fail closed.

use std::process::Command;
use tracing::debug;

pub const REVISION_ENV: &str = "SWINGLAB_CODE_REVISION";

pub fn resolve_code_revision(override_value: Option<&str>) -> Option<String> {
    non_empty(override_value.map(str::to_string))
        .or_else(|| non_empty(std::env::var(REVISION_ENV).ok()))
        .or_else(git_head)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn git_head() -> Option<String> {
    let output = Command::new("git").args(["rev-parse", "HEAD"]).output();
    match output {
        Ok(out) if out.status.success() => {
            non_empty(String::from_utf8(out.stdout).ok())
        }
        Ok(out) => {
            debug!(status = %out.status, "git rev-parse HEAD failed");
            None
        }
        Err(err) => {
            debug!(error = %err, "git not available");
            None
        }
    }
}
