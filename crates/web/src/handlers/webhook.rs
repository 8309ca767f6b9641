use axum::{
    http::StatusCode,
    extract::State,
    response::{IntoResponse, Response},
};
use octocrab::models::webhook_events::{EventInstallation, WebhookEventPayload};
use semgrep_app_core::AppError;
use semgrep_app_github::webhook::GitHubEvent;

use crate::{AppState, pull_request::PullRequestContext};

/// Webhook handler. Acknowledges the delivery immediately and runs the
/// scan pipeline in a detached task.
pub async fn webhook(
    State(state): State<AppState>,
    GitHubEvent { event }: GitHubEvent,
) -> Result<Response, AppError> {
    // Log the event source
    if let Some(repository) = &event.repository {
        if let Some(full_name) = &repository.full_name {
            tracing::info!("Received webhook event {:?} from repository {}", event.kind, full_name);
        } else {
            tracing::info!(
                "Received webhook event {:?} from repository ID {}",
                event.kind,
                repository.id.0
            );
        }
    } else if let Some(sender) = &event.sender {
        tracing::info!("Received webhook event {:?} from @{}", event.kind, sender.login);
    } else {
        tracing::info!("Received webhook event {:?} from unknown source", event.kind);
    }

    let installation_id = match &event.installation {
        Some(EventInstallation::Full(installation)) => Some(installation.id),
        Some(EventInstallation::Minimal(installation)) => Some(installation.id),
        None => None,
    };

    if let WebhookEventPayload::PullRequest(inner) = &event.specific {
        let Some(installation_id) = installation_id else {
            tracing::warn!("Received pull_request event with no installation ID");
            return Ok((StatusCode::OK, "No installation ID").into_response());
        };
        let Some(context) =
            PullRequestContext::from_event(&event, &inner.pull_request, installation_id)
        else {
            tracing::warn!("Received pull_request event with incomplete payload");
            return Ok((StatusCode::OK, "Incomplete payload").into_response());
        };
        tracing::info!(
            "Scanning {}/{} branch {} ({})",
            context.owner,
            context.repo,
            context.head_branch,
            context.head_sha
        );
        tokio::spawn(crate::pull_request::process_pull_request(state, context));
    }

    Ok((StatusCode::OK, "Event processed").into_response())
}
