//! C11 Webhook Intake: validate → fingerprint → C4 idempotency gate → C5
//! enqueue, returning `{status, requestId}` — grounded on
//! `api/src/routes/check_mr/trigger_mr_route.rs`'s handler shape (secret
//! check, `#[instrument]`, structured logging) minus the axum/transport
//! parts, which stay in `api`.

pub mod errors;

use broker::{Broker, SeenState};
use chrono::Utc;
use review_model::{Provider, ReviewRequest};
use tracing::{info, instrument, warn};

pub use errors::{IntakeError, IntakeResult};

/// Raw fields lifted from a provider webhook body, before they become a
/// `ReviewRequest`. Transport-specific parsing (GitHub/GitLab/Bitbucket
/// payload shapes) happens in `api`; this is the provider-neutral result.
#[derive(Debug, Clone)]
pub struct WebhookPayload {
    pub provider: String,
    pub repository_id: String,
    pub change_request_id: i64,
    pub head_sha: Option<String>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct AcceptedResponse {
    pub status: &'static str,
    pub request_id: String,
}

fn parse_provider(raw: &str) -> IntakeResult<Provider> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "github" => Ok(Provider::Github),
        "gitlab" => Ok(Provider::Gitlab),
        "bitbucket" => Ok(Provider::Bitbucket),
        other => Err(IntakeError::Validation(format!("unsupported provider: {other}"))),
    }
}

fn validate(payload: &WebhookPayload) -> IntakeResult<Provider> {
    let provider = parse_provider(&payload.provider)?;
    if payload.repository_id.trim().is_empty() {
        return Err(IntakeError::Validation("repositoryId must not be blank".into()));
    }
    if payload.change_request_id < 1 {
        return Err(IntakeError::Validation(format!(
            "changeRequestId must be >= 1, got {}",
            payload.change_request_id
        )));
    }
    Ok(provider)
}

/// §6: a non-blank `Idempotency-Key` header overrides the computed
/// fingerprint entirely; otherwise falls back to `review_model::fingerprint`.
fn resolve_fingerprint(provider: Provider, payload: &WebhookPayload, idempotency_key_header: Option<&str>) -> String {
    match idempotency_key_header.map(str::trim) {
        Some(key) if !key.is_empty() => key.to_string(),
        _ => review_model::fingerprint(provider, &payload.repository_id, payload.change_request_id, payload.head_sha.as_deref()),
    }
}

/// Validates the payload, computes the fingerprint (§3), checks C4, and on
/// first-seen appends a fresh `ReviewRequest` to C5. A duplicate fingerprint
/// returns `AlreadyProcessed`, which callers map to `409 Conflict` at the
/// transport edge.
///
/// `idempotency_key_header` is the caller's `Idempotency-Key` header value,
/// if any (§6): when non-blank it overrides the computed fingerprint
/// entirely, letting a caller force (or suppress) dedup independent of the
/// payload's own fields.
#[instrument(skip(broker, payload), fields(repository_id = %payload.repository_id, change_request_id = payload.change_request_id))]
pub async fn accept_webhook(
    broker: &Broker,
    payload: WebhookPayload,
    idempotency_key_header: Option<&str>,
) -> IntakeResult<AcceptedResponse> {
    let provider = validate(&payload)?;

    let fingerprint = resolve_fingerprint(provider, &payload, idempotency_key_header);

    match broker.gate.check_and_mark(&fingerprint).await? {
        SeenState::Duplicate => {
            warn!(%fingerprint, "duplicate webhook delivery rejected");
            Err(IntakeError::AlreadyProcessed)
        }
        SeenState::FirstSeen => {
            let request = ReviewRequest {
                request_id: uuid::Uuid::new_v4().to_string(),
                provider,
                repository_id: payload.repository_id,
                change_request_id: payload.change_request_id,
                created_at: Utc::now(),
            };

            broker.queue.append(&request).await?;
            info!(request_id = %request.request_id, %fingerprint, "webhook accepted and enqueued");

            Ok(AcceptedResponse { status: "accepted", request_id: request.request_id })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_payload() -> WebhookPayload {
        WebhookPayload {
            provider: "GitHub".into(),
            repository_id: "owner/repo".into(),
            change_request_id: 42,
            head_sha: Some("abc123".into()),
        }
    }

    #[test]
    fn accepts_known_providers_case_insensitively() {
        assert!(matches!(parse_provider("github"), Ok(Provider::Github)));
        assert!(matches!(parse_provider("GitLab"), Ok(Provider::Gitlab)));
        assert!(matches!(parse_provider("BITBUCKET"), Ok(Provider::Bitbucket)));
    }

    #[test]
    fn rejects_unknown_provider() {
        assert!(parse_provider("perforce").is_err());
    }

    #[test]
    fn rejects_blank_repository_id() {
        let mut payload = valid_payload();
        payload.repository_id = "   ".into();
        assert!(validate(&payload).is_err());
    }

    #[test]
    fn rejects_non_positive_change_request_id() {
        let mut payload = valid_payload();
        payload.change_request_id = 0;
        assert!(validate(&payload).is_err());
    }

    #[test]
    fn accepts_valid_payload() {
        assert!(validate(&valid_payload()).is_ok());
    }

    #[test]
    fn idempotency_key_header_overrides_computed_fingerprint() {
        let payload = valid_payload();
        let computed = resolve_fingerprint(Provider::Github, &payload, None);
        let overridden = resolve_fingerprint(Provider::Github, &payload, Some("caller-supplied-key"));
        assert_ne!(computed, overridden);
        assert_eq!(overridden, "caller-supplied-key");
    }

    #[test]
    fn blank_idempotency_key_header_falls_back_to_computed_fingerprint() {
        let payload = valid_payload();
        let computed = resolve_fingerprint(Provider::Github, &payload, None);
        let blank = resolve_fingerprint(Provider::Github, &payload, Some("   "));
        assert_eq!(computed, blank);
    }
}
