//! Check-run API calls.
//!
//! octocrab has no typed surface for check-run output annotations, so
//! requests go through its generic `post`/`patch` methods with our own
//! serde bodies, matching the REST API's field names.

use anyhow::{Context, Result};
use octocrab::{Octocrab, models::CheckRunId};
use serde::{Deserialize, Serialize};

/// Name shown on the PR checks tab.
pub const CHECK_NAME: &str = "Semgrep";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    InProgress,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckConclusion {
    Success,
    Failure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationLevel {
    Notice,
    Warning,
    Failure,
}

/// One inline annotation attached to the check run output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Annotation {
    pub path: String,
    pub start_line: u64,
    pub end_line: u64,
    pub annotation_level: AnnotationLevel,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckOutput {
    pub title: String,
    pub summary: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<Annotation>,
}

#[derive(Serialize)]
struct CreateCheckRun<'a> {
    name: &'a str,
    head_sha: &'a str,
    status: CheckStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    conclusion: Option<CheckConclusion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<&'a CheckOutput>,
}

#[derive(Serialize)]
struct UpdateCheckRun<'a> {
    status: CheckStatus,
    conclusion: CheckConclusion,
    output: &'a CheckOutput,
}

#[derive(Debug, Deserialize)]
struct CheckRunResponse {
    id: CheckRunId,
}

/// Check-run operations for one repository, using an
/// installation-scoped client.
pub struct ChecksClient<'octo> {
    client: &'octo Octocrab,
    owner: String,
    repo: String,
}

impl<'octo> ChecksClient<'octo> {
    pub fn new(client: &'octo Octocrab, owner: &str, repo: &str) -> Self {
        Self { client, owner: owner.to_string(), repo: repo.to_string() }
    }

    fn create_route(&self) -> String {
        format!("/repos/{}/{}/check-runs", self.owner, self.repo)
    }

    /// Create the check run in `in_progress` state and return its ID.
    pub async fn create_in_progress(&self, head_sha: &str) -> Result<CheckRunId> {
        let body = CreateCheckRun {
            name: CHECK_NAME,
            head_sha,
            status: CheckStatus::InProgress,
            conclusion: None,
            output: None,
        };
        let response: CheckRunResponse = self
            .client
            .post(self.create_route(), Some(&body))
            .await
            .context("Failed to create check run")?;
        Ok(response.id)
    }

    /// Create a check run directly in its terminal `completed`/`failure`
    /// state. Used when the in-progress run could not be created.
    pub async fn create_completed_failure(
        &self,
        head_sha: &str,
        output: &CheckOutput,
    ) -> Result<CheckRunId> {
        let body = CreateCheckRun {
            name: CHECK_NAME,
            head_sha,
            status: CheckStatus::Completed,
            conclusion: Some(CheckConclusion::Failure),
            output: Some(output),
        };
        let response: CheckRunResponse = self
            .client
            .post(self.create_route(), Some(&body))
            .await
            .context("Failed to create completed check run")?;
        Ok(response.id)
    }

    /// Move an existing check run to `completed` with the given
    /// conclusion and output.
    pub async fn complete(
        &self,
        check_run_id: CheckRunId,
        conclusion: CheckConclusion,
        output: &CheckOutput,
    ) -> Result<()> {
        let body = UpdateCheckRun { status: CheckStatus::Completed, conclusion, output };
        let _: CheckRunResponse = self
            .client
            .patch(
                format!("/repos/{}/{}/check-runs/{check_run_id}", self.owner, self.repo),
                Some(&body),
            )
            .await
            .with_context(|| format!("Failed to update check run {check_run_id}"))?;
        Ok(())
    }
}
