//! Request Executor - Vault sys API client
//!
//! Issues single namespace-create / mount-create requests against the
//! remote service and classifies the HTTP status into an [`Outcome`].
//! Each request is issued exactly once: no retry, no backoff, no timeout.
//! The tool exists to put the service under immediate, unthrottled load,
//! so softening failures here would change what it measures.

use crate::error::Result;
use crate::model::{BuildState, Outcome};
use async_trait::async_trait;
use serde_json::json;
use tracing::{error, info, warn};

/// Header carrying the client token
const TOKEN_HEADER: &str = "X-Vault-Token";
/// Header scoping a request to a namespace
const NAMESPACE_HEADER: &str = "X-Vault-Namespace";

// =============================================================================
// Provisioning API
// =============================================================================

/// Boundary for issuing creation requests
///
/// Both calls return a classified [`Outcome`] and never fail: a non-2xx
/// response and a request that could not be sent at all are both outcomes,
/// not errors. Implementations must be safe to share across workers.
#[async_trait]
pub trait ProvisionApi: Send + Sync {
    /// Create a namespace, authorized under `parent_scope`
    async fn create_namespace(&self, name: &str, parent_scope: &str) -> Outcome;

    /// Create a KV v2 mount inside the namespace at `namespace_scope`
    async fn create_mount(&self, namespace_scope: &str, mount_name: &str) -> Outcome;
}

// =============================================================================
// Vault Client
// =============================================================================

/// Configuration for the Vault client
#[derive(Debug, Clone)]
pub struct VaultClientConfig {
    /// Base address, e.g. `https://vault.example.com:8200`
    pub address: String,
    /// Client token sent with every request
    pub token: String,
    /// Skip TLS certificate validation
    pub insecure: bool,
}

/// HTTP client for the Vault sys API
pub struct VaultClient {
    http: reqwest::Client,
    address: String,
    token: String,
}

impl VaultClient {
    /// Build the client
    ///
    /// Failure here is the one transport-level condition that aborts the
    /// whole run (exit code 1); per-request failures are classified instead.
    pub fn new(config: VaultClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(config.insecure)
            .build()?;

        Ok(Self {
            http,
            address: config.address.trim_end_matches('/').to_string(),
            token: config.token,
        })
    }

    async fn post(&self, request: reqwest::RequestBuilder) -> Outcome {
        match request.send().await {
            Ok(response) => Outcome::classify(response.status().as_u16()),
            Err(_) => Outcome::transport_failure(),
        }
    }
}

#[async_trait]
impl ProvisionApi for VaultClient {
    async fn create_namespace(&self, name: &str, parent_scope: &str) -> Outcome {
        let url = format!("{}/v1/sys/namespaces/{}", self.address, name);

        let request = self
            .http
            .post(&url)
            .header(TOKEN_HEADER, &self.token)
            .header(NAMESPACE_HEADER, parent_scope);

        let outcome = self.post(request).await;
        log_outcome("namespace", &format!("{parent_scope}/{name}"), outcome);
        outcome
    }

    async fn create_mount(&self, namespace_scope: &str, mount_name: &str) -> Outcome {
        let url = format!("{}/v1/sys/mounts/{}", self.address, mount_name);

        let request = self
            .http
            .post(&url)
            .header(TOKEN_HEADER, &self.token)
            .header(NAMESPACE_HEADER, namespace_scope)
            .json(&json!({ "type": "kv", "options": { "version": "2" } }));

        let outcome = self.post(request).await;
        log_outcome("kv mount", &format!("{namespace_scope}/{mount_name}"), outcome);
        outcome
    }
}

/// One line per request, at a level matching the classification
///
/// The tracing subscriber serializes writers, so lines from concurrent
/// workers interleave but never corrupt each other.
fn log_outcome(operation: &str, target: &str, outcome: Outcome) {
    match outcome.state {
        BuildState::Created => {
            info!("{operation} created: {target} (HTTP {})", outcome.status);
        }
        BuildState::AlreadyExists => {
            info!("{operation} already present: {target} (HTTP 409)");
        }
        BuildState::Rejected => {
            warn!(
                "{operation} create returned 400 for {target} \
                 (possibly already present or invalid name)"
            );
        }
        BuildState::Failed => {
            error!(
                "{operation} create failed: {target} (HTTP {}); continuing",
                outcome.status
            );
        }
    }
}

// =============================================================================
// Test Support
// =============================================================================
