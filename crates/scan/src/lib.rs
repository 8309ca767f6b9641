//! Clone-and-scan pipeline: ephemeral workspaces, shallow branch
//! clones, and normalized `semgrep ci` invocations.

pub mod clone;
pub mod error;
pub mod report;
pub mod semgrep;

pub use clone::{Workspace, authenticated_clone_url, clone_branch};
pub use error::ScanError;
pub use report::{Finding, SemgrepReport};
pub use semgrep::{ScanOutcome, run_semgrep};
