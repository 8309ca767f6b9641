use std::{fmt::Display, sync::Arc};

use axum::{
    body::Bytes,
    extract::{FromRef, FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use hmac::{Hmac, Mac};
use octocrab::models::webhook_events::WebhookEvent;
use semgrep_app_core::config::Config;
use sha2::Sha256;

/// Verify and extract GitHub Event Payload.
#[derive(Clone)]
#[must_use]
pub struct GitHubEvent {
    pub event: WebhookEvent,
}

/// Check a request body against its `X-Hub-Signature-256` HMAC.
pub fn verify_signature(secret: &str, signature: &[u8], body: &[u8]) -> bool {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(body);
    mac.verify_slice(signature).is_ok()
}

impl<S> FromRequest<S> for GitHubEvent
where
    Arc<Config>: FromRef<S>,
    S: Send + Sync + Clone,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        fn err(m: impl Display) -> Response {
            tracing::error!("{m}");
            (StatusCode::BAD_REQUEST, m.to_string()).into_response()
        }
        let event = req
            .headers()
            .get("X-GitHub-Event")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| err("X-GitHub-Event header missing"))?
            .to_string();
        let signature_sha256 = req
            .headers()
            .get("X-Hub-Signature-256")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| err("X-Hub-Signature-256 missing"))?
            .strip_prefix("sha256=")
            .ok_or_else(|| err("X-Hub-Signature-256 sha256= prefix missing"))?;
        let signature =
            hex::decode(signature_sha256).map_err(|_| err("X-Hub-Signature-256 malformed"))?;
        let config = <Arc<Config>>::from_ref(state);
        let body = Bytes::from_request(req, state).await.map_err(|_| err("error reading body"))?;
        if !verify_signature(&config.github.webhook_secret, &signature, &body) {
            return Err(err("signature mismatch"));
        }
        let value = WebhookEvent::try_from_header_and_body(&event, &body)
            .map_err(|_| err("error parsing body"))?;
        Ok(GitHubEvent { event: value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(secret: &str, body: &[u8]) -> Vec<u8> {
        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body);
        mac.finalize().into_bytes().to_vec()
    }

    #[test]
    fn test_verify_signature() {
        let body = br#"{"action":"opened"}"#;
        let signature = sign("secret", body);
        assert!(verify_signature("secret", &signature, body));
    }

    #[test]
    fn test_verify_signature_wrong_secret() {
        let body = br#"{"action":"opened"}"#;
        let signature = sign("other", body);
        assert!(!verify_signature("secret", &signature, body));
    }

    #[test]
    fn test_verify_signature_tampered_body() {
        let signature = sign("secret", br#"{"action":"opened"}"#);
        assert!(!verify_signature("secret", &signature, br#"{"action":"closed"}"#));
    }
}
