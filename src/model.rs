//! Data model for provisioning runs
//!
//! Classified request outcomes, namespace/mount identities, and the
//! per-unit / per-tree result aggregates the orchestrator collects.

use serde::Serialize;

// =============================================================================
// Outcome Classification
// =============================================================================

/// Build state classified from an HTTP status code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BuildState {
    /// 200, 201 or 204 - the resource was created
    Created,
    /// 409 - the resource is already present
    AlreadyExists,
    /// 400 - possibly already present or an invalid name; non-fatal
    Rejected,
    /// Any other status, or no status at all (transport-level failure)
    Failed,
}

/// Classified result of a single creation request
///
/// Produced exactly once per request and never mutated; `status` keeps the
/// raw HTTP code (0 when the request never yielded a status).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Outcome {
    pub state: BuildState,
    pub status: u16,
}

impl Outcome {
    /// Classify an HTTP status code into a build state
    pub fn classify(status: u16) -> Self {
        let state = match status {
            200 | 201 | 204 => BuildState::Created,
            409 => BuildState::AlreadyExists,
            400 => BuildState::Rejected,
            _ => BuildState::Failed,
        };
        Self { state, status }
    }

    /// Outcome for a request that never produced an HTTP status
    pub fn transport_failure() -> Self {
        Self {
            state: BuildState::Failed,
            status: 0,
        }
    }

    pub fn is_failed(&self) -> bool {
        self.state == BuildState::Failed
    }
}

// =============================================================================
// Identities
// =============================================================================

/// Identity of one namespace to be provisioned
///
/// Immutable once computed by the orchestrator. `parent_scope` is the value
/// sent in the namespace-authorization header of the creation request:
/// literally `root` for top-level namespaces, or the parent's relative path
/// for children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceIdentity {
    /// Leaf name, e.g. `ns-001`
    pub name: String,
    /// Full display path from the root, e.g. `root/ns-001`
    pub full_path: String,
    /// Authorization scope for the creation request
    pub parent_scope: String,
}

impl NamespaceIdentity {
    pub fn new(
        name: impl Into<String>,
        full_path: impl Into<String>,
        parent_scope: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            full_path: full_path.into(),
            parent_scope: parent_scope.into(),
        }
    }

    /// Authorization scope for mount operations inside this namespace
    ///
    /// Mount headers address namespaces relative to the root, so a literal
    /// leading `root/` is stripped from the display path.
    pub fn mount_scope(&self) -> &str {
        self.full_path
            .strip_prefix("root/")
            .unwrap_or(&self.full_path)
    }
}

// =============================================================================
// Results
// =============================================================================

/// Result of one mount-creation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountResult {
    pub name: String,
    pub outcome: Outcome,
}

/// Aggregated result for one namespace and its mounts
#[derive(Debug, Clone)]
pub struct UnitResult {
    pub namespace: NamespaceIdentity,
    pub outcome: Outcome,
    pub mounts: Vec<MountResult>,
}

/// Aggregated result for one parent namespace and all of its children
#[derive(Debug, Clone)]
pub struct TreeResult {
    pub parent: UnitResult,
    pub children: Vec<UnitResult>,
}

// =============================================================================
// Naming
// =============================================================================

/// Zero-padding width for a naming tier
///
/// Wide enough for the largest index in the tier, with a floor of three
/// digits so small runs still produce `ns-001` style names.
pub fn index_width(start_index: u64, count: u64) -> usize {
    if count == 0 {
        return 3;
    }
    let last = start_index + count - 1;
    last.to_string().len().max(3)
}

/// Format an index with the given zero-padding width
pub fn padded(index: u64, width: usize) -> String {
    format!("{index:0width$}")
}
