use thiserror::Error;

/// Errors from the clone-and-scan steps. Each step surfaces its own
/// kind so the orchestrator can branch without inspecting strings.
#[derive(Debug, Error)]
pub enum ScanError {
    /// Temporary workspace creation failed
    #[error("Failed to create scan workspace: {0}")]
    Workspace(#[source] std::io::Error),

    /// Clone URL was not a well-formed HTTPS URL
    #[error("Invalid HTTPS clone URL: {0}")]
    InvalidCloneUrl(String),

    /// An external process could not be started
    #[error("Failed to run {command}: {source}")]
    Spawn {
        command: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// `git clone` exited non-zero
    #[error("Clone of branch {branch} failed: {stderr}")]
    CloneFailed { branch: String, stderr: String },

    /// Semgrep claimed success but its report did not parse
    #[error("Failed to parse semgrep output: {0}")]
    MalformedReport(#[source] serde_json::Error),
}
