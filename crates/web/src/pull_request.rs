//! Pull-request scan pipeline: check-run lifecycle, branch clone,
//! semgrep invocation, and result reporting.

use anyhow::{Context, Result};
use octocrab::models::{
    CheckRunId, InstallationId, pulls::PullRequest, webhook_events::WebhookEvent,
};
use semgrep_app_core::config::ScanMode;
use semgrep_app_github::checks::{
    Annotation, AnnotationLevel, CheckConclusion, CheckOutput, ChecksClient,
};
use semgrep_app_scan::{
    Finding, ScanOutcome, Workspace, authenticated_clone_url, clone_branch, run_semgrep,
};

use crate::AppState;

/// GitHub accepts at most 50 annotations per check-run update; findings
/// beyond that are dropped in scanner order.
const MAX_ANNOTATIONS: usize = 50;

/// Everything the pipeline needs from one pull_request delivery.
#[derive(Debug, Clone)]
pub struct PullRequestContext {
    pub installation_id: InstallationId,
    pub owner: String,
    pub repo: String,
    pub clone_url: String,
    pub head_sha: String,
    pub head_branch: String,
}

impl PullRequestContext {
    /// Pull the fields the pipeline needs out of the webhook payload.
    /// Returns `None` when the repository or owner is missing.
    pub fn from_event(
        event: &WebhookEvent,
        pull_request: &PullRequest,
        installation_id: InstallationId,
    ) -> Option<Self> {
        let repository = event.repository.as_ref()?;
        let owner = repository.owner.as_ref()?.login.clone();
        let clone_url = repository.clone_url.as_ref()?.to_string();
        Some(Self {
            installation_id,
            owner,
            repo: repository.name.clone(),
            clone_url,
            head_sha: pull_request.head.sha.clone(),
            head_branch: pull_request.head.ref_field.clone(),
        })
    }
}

/// Run the scan pipeline for one pull-request event.
///
/// Whatever happens along the way, the check run ends up `completed`:
/// on an error the run is completed as a failure, or created directly
/// in that terminal state when creation itself was the failing step.
pub async fn process_pull_request(state: AppState, context: PullRequestContext) {
    let client = match state.github.installation_client(context.installation_id) {
        Ok(client) => client,
        Err(e) => {
            // Without an API client there is no way to report anything.
            tracing::error!("Failed to create installation client: {e:?}");
            return;
        }
    };
    let checks = ChecksClient::new(&client, &context.owner, &context.repo);

    let mut check_run_id = None;
    if let Err(e) = run_scan(&state, &context, &checks, &mut check_run_id).await {
        tracing::error!("Scan of {}/{} failed: {e:?}", context.owner, context.repo);
        let result = match failure_report(check_run_id, &e) {
            FailureReport::Update(id, output) => {
                checks.complete(id, CheckConclusion::Failure, &output).await
            }
            FailureReport::Create(output) => {
                checks.create_completed_failure(&context.head_sha, &output).await.map(|_| ())
            }
        };
        if let Err(e) = result {
            tracing::error!("Failed to report scan failure: {e:?}");
        }
    }
}

/// How a scan failure gets reported: by completing the existing check
/// run, or by creating one directly in its terminal state when
/// creation was the failing step and no ID was ever captured.
#[derive(Debug)]
enum FailureReport {
    Update(CheckRunId, CheckOutput),
    Create(CheckOutput),
}

fn failure_report(check_run_id: Option<CheckRunId>, error: &anyhow::Error) -> FailureReport {
    let output = CheckOutput {
        title: "Semgrep failed".to_string(),
        summary: error.to_string(),
        annotations: Vec::new(),
    };
    match check_run_id {
        Some(id) => FailureReport::Update(id, output),
        None => FailureReport::Create(output),
    }
}

async fn run_scan(
    state: &AppState,
    context: &PullRequestContext,
    checks: &ChecksClient<'_>,
    check_run_id: &mut Option<CheckRunId>,
) -> Result<()> {
    let id = checks.create_in_progress(&context.head_sha).await?;
    *check_run_id = Some(id);

    let token = state.github.create_installation_token(context.installation_id).await?;

    let workspace = Workspace::create()?;
    let clone_url = authenticated_clone_url(&context.clone_url, &token)?;
    clone_branch(&clone_url, &context.head_branch, workspace.path()).await?;

    let mode = state.config.scanner.mode();
    let outcome = run_semgrep(mode, state.config.scanner.token(), workspace.path()).await?;

    let (conclusion, output) = report_outcome(mode, &outcome);
    tracing::info!(
        "Scan of {}/{} ({}) completed: {} annotations",
        context.owner,
        context.repo,
        context.head_sha,
        output.annotations.len()
    );
    checks.complete(id, conclusion, &output).await.context("Failed to complete check run")?;
    Ok(())
}

/// Map a scan outcome to the check run's terminal conclusion and output.
fn report_outcome(mode: ScanMode, outcome: &ScanOutcome) -> (CheckConclusion, CheckOutput) {
    let (title, summary) = match mode {
        ScanMode::Pro => ("Semgrep Pro Scan", "Semgrep Pro ran."),
        ScanMode::Oss => ("Semgrep OSS Scan", "Semgrep OSS ran."),
    };
    match outcome {
        ScanOutcome::Clean(report) => (
            CheckConclusion::Success,
            CheckOutput {
                title: title.to_string(),
                summary: summary.to_string(),
                annotations: annotations_for(&report.results),
            },
        ),
        ScanOutcome::Findings(report) => (
            CheckConclusion::Failure,
            CheckOutput {
                title: title.to_string(),
                summary: summary.to_string(),
                annotations: annotations_for(&report.results),
            },
        ),
        ScanOutcome::Crashed { code, stderr } => (
            CheckConclusion::Failure,
            CheckOutput {
                title: title.to_string(),
                summary: crash_summary(*code, stderr),
                annotations: Vec::new(),
            },
        ),
    }
}

fn crash_summary(code: Option<i32>, stderr: &str) -> String {
    let mut summary = match code {
        Some(code) => format!("Semgrep exited with status {code} without producing a report."),
        None => "Semgrep was terminated by a signal without producing a report.".to_string(),
    };
    if !stderr.is_empty() {
        summary.push_str("\n\n```\n");
        summary.push_str(stderr);
        summary.push_str("\n```");
    }
    summary
}

fn annotations_for(findings: &[Finding]) -> Vec<Annotation> {
    findings
        .iter()
        .take(MAX_ANNOTATIONS)
        .map(|finding| Annotation {
            path: finding.path.clone(),
            start_line: finding.start.line,
            end_line: finding.end.line,
            annotation_level: AnnotationLevel::Failure,
            message: format!("[{}] {}", finding.check_id, finding.extra.message),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use semgrep_app_scan::SemgrepReport;

    use super::*;

    fn finding(check_id: &str, line: u64) -> Finding {
        serde_json::from_value::<Finding>(serde_json::json!({
            "check_id": check_id,
            "path": "a.py",
            "start": {"line": line},
            "end": {"line": line + 1},
            "extra": {"message": "m"},
        }))
        .unwrap()
    }

    #[test]
    fn test_annotation_mapping() {
        let annotations = annotations_for(&[finding("r1", 1)]);
        assert_eq!(annotations.len(), 1);
        let annotation = &annotations[0];
        assert_eq!(annotation.path, "a.py");
        assert_eq!(annotation.start_line, 1);
        assert_eq!(annotation.end_line, 2);
        assert_eq!(annotation.annotation_level, AnnotationLevel::Failure);
        assert_eq!(annotation.message, "[r1] m");
    }

    #[test]
    fn test_annotations_capped_at_50_in_order() {
        let findings: Vec<Finding> =
            (0..80).map(|i| finding(&format!("rule-{i}"), i + 1)).collect();
        let annotations = annotations_for(&findings);
        assert_eq!(annotations.len(), 50);
        assert_eq!(annotations[0].message, "[rule-0] m");
        assert_eq!(annotations[49].message, "[rule-49] m");
    }

    #[test]
    fn test_clean_outcome_reports_success() {
        let outcome = ScanOutcome::Clean(SemgrepReport::default());
        let (conclusion, output) = report_outcome(ScanMode::Oss, &outcome);
        assert_eq!(conclusion, CheckConclusion::Success);
        assert_eq!(output.title, "Semgrep OSS Scan");
        assert_eq!(output.summary, "Semgrep OSS ran.");
        assert!(output.annotations.is_empty());
    }

    #[test]
    fn test_findings_outcome_reports_failure() {
        let outcome = ScanOutcome::Findings(SemgrepReport { results: vec![finding("r1", 1)] });
        let (conclusion, output) = report_outcome(ScanMode::Pro, &outcome);
        assert_eq!(conclusion, CheckConclusion::Failure);
        assert_eq!(output.title, "Semgrep Pro Scan");
        assert_eq!(output.summary, "Semgrep Pro ran.");
        assert_eq!(output.annotations.len(), 1);
    }

    #[test]
    fn test_crashed_outcome_reports_failure_without_annotations() {
        let outcome = ScanOutcome::Crashed { code: Some(2), stderr: "no rules".to_string() };
        let (conclusion, output) = report_outcome(ScanMode::Oss, &outcome);
        assert_eq!(conclusion, CheckConclusion::Failure);
        assert!(output.annotations.is_empty());
        assert!(output.summary.contains("status 2"));
        assert!(output.summary.contains("no rules"));
    }

    #[test]
    fn test_crash_summary_without_code() {
        let summary = crash_summary(None, "");
        assert!(summary.contains("signal"));
    }

    #[test]
    fn test_failure_with_check_run_id_updates() {
        let error = anyhow::anyhow!("Failed to create installation access token");
        match failure_report(Some(CheckRunId(7)), &error) {
            FailureReport::Update(id, output) => {
                assert_eq!(id, CheckRunId(7));
                assert_eq!(output.title, "Semgrep failed");
                assert_eq!(output.summary, "Failed to create installation access token");
                assert!(output.annotations.is_empty());
            }
            other => panic!("expected update, got {other:?}"),
        }
    }

    #[test]
    fn test_failure_before_id_captured_creates() {
        // Check-run creation itself failed, so no ID was captured; the
        // failure must be reported by creating a completed run.
        let error = anyhow::anyhow!("Failed to create check run");
        match failure_report(None, &error) {
            FailureReport::Create(output) => {
                assert_eq!(output.title, "Semgrep failed");
                assert_eq!(output.summary, "Failed to create check run");
                assert!(output.annotations.is_empty());
            }
            other => panic!("expected create, got {other:?}"),
        }
    }
}
