//! Invocation of the [semgrep](https://semgrep.dev/) CLI.
//!
//! Semgrep's `ci` subcommand exits non-zero when findings are present,
//! so a failing exit with a JSON body is a normal scan result, not a
//! crash. Output is buffered in full before parsing; no timeout is
//! imposed here.

use std::path::Path;

use semgrep_app_core::config::ScanMode;
use tokio::process::Command;

use crate::{error::ScanError, report::SemgrepReport};

/// Normalized result of one semgrep invocation.
#[derive(Debug)]
pub enum ScanOutcome {
    /// Exit 0: no blocking findings.
    Clean(SemgrepReport),
    /// Non-zero exit with a parseable report: findings are present.
    Findings(SemgrepReport),
    /// Non-zero exit without a report: the tool itself failed.
    Crashed { code: Option<i32>, stderr: String },
}

impl ScanOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(self, Self::Clean(_))
    }

    pub fn report(&self) -> Option<&SemgrepReport> {
        match self {
            Self::Clean(report) | Self::Findings(report) => Some(report),
            Self::Crashed { .. } => None,
        }
    }
}

/// Rule configuration for each scanner profile.
fn semgrep_config(mode: ScanMode) -> &'static str {
    match mode {
        ScanMode::Pro => "auto",
        ScanMode::Oss => "p/ci",
    }
}

/// Run `semgrep ci` against a cloned repository.
///
/// The app token, when configured, is exported to the child process;
/// everything else of the environment passes through unchanged.
pub async fn run_semgrep(
    mode: ScanMode,
    app_token: Option<&str>,
    repo_dir: &Path,
) -> Result<ScanOutcome, ScanError> {
    let mut command = Command::new("semgrep");
    command.args(["ci", "--config", semgrep_config(mode), "--json"]).current_dir(repo_dir);
    if let Some(token) = app_token {
        command.env("SEMGREP_APP_TOKEN", token);
    }
    tracing::debug!(
        "Running semgrep ci --config {} in {}",
        semgrep_config(mode),
        repo_dir.display()
    );
    let output = command
        .output()
        .await
        .map_err(|source| ScanError::Spawn { command: "semgrep", source })?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    normalize_output(output.status.success(), output.status.code(), &stdout, &stderr)
}

/// Map raw process output to a [`ScanOutcome`].
///
/// A JSON parse failure on a successful exit propagates as an error; on
/// a failing exit, stdout that does not look like JSON at all means the
/// tool crashed before producing a report.
fn normalize_output(
    exited_ok: bool,
    code: Option<i32>,
    stdout: &str,
    stderr: &str,
) -> Result<ScanOutcome, ScanError> {
    if exited_ok {
        let report = SemgrepReport::parse(stdout).map_err(ScanError::MalformedReport)?;
        return Ok(ScanOutcome::Clean(report));
    }
    let trimmed = stdout.trim();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        let report = SemgrepReport::parse(trimmed).map_err(ScanError::MalformedReport)?;
        return Ok(ScanOutcome::Findings(report));
    }
    Ok(ScanOutcome::Crashed { code, stderr: stderr.trim().to_string() })
}
