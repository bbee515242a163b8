use serde::Deserialize;

/// Transport-neutral webhook body for `POST /webhooks/change-request`.
///
/// This is the provider-agnostic shape the caller (a forwarding proxy in
/// front of the real GitHub/GitLab/Bitbucket webhook) is expected to send;
/// translating each provider's native payload into this shape is outside
/// this crate's scope.
#[derive(Debug, Deserialize)]
pub struct WebhookRequest {
    pub provider: String,
    pub repository_id: String,
    pub change_request_id: i64,
    pub head_sha: Option<String>,
    /// Shared secret used to protect the endpoint from unauthorized calls.
    pub secret: String,
}
