//! Namespace Unit Builder
//!
//! Builds one unit: a single namespace followed by its KV mounts, strictly
//! in sequence. The builder never short-circuits - a namespace create that
//! comes back Rejected or Failed still gets its mounts attempted, because
//! a rejected-but-already-existing namespace is the expected case when the
//! same configuration is run twice.

use crate::client::ProvisionApi;
use crate::model::{padded, MountResult, NamespaceIdentity, UnitResult};

/// Everything needed to build one namespace and its mounts
#[derive(Debug, Clone)]
pub struct UnitSpec {
    pub namespace: NamespaceIdentity,
    /// Mount name prefix, e.g. `kv` for `kv-001`
    pub mount_prefix: String,
    /// First mount index
    pub start_index: u64,
    /// Number of mounts to create
    pub mount_count: u64,
    /// Zero-padding width for mount indices
    pub index_width: usize,
}

/// Create the namespace, then each of its mounts in ascending index order
///
/// Mounts inside one namespace are created one at a time; parallelism lives
/// a level up, across units. Every outcome is recorded in the returned
/// [`UnitResult`] and none is escalated.
pub async fn build_unit(api: &dyn ProvisionApi, spec: &UnitSpec) -> UnitResult {
    let outcome = api
        .create_namespace(&spec.namespace.name, &spec.namespace.parent_scope)
        .await;

    let scope = spec.namespace.mount_scope();
    let mut mounts = Vec::with_capacity(spec.mount_count as usize);

    for index in spec.start_index..spec.start_index + spec.mount_count {
        let name = format!("{}-{}", spec.mount_prefix, padded(index, spec.index_width));
        let outcome = api.create_mount(scope, &name).await;
        mounts.push(MountResult { name, outcome });
    }

    UnitResult {
        namespace: spec.namespace.clone(),
        outcome,
        mounts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock::{Call, RecordingApi};
    use crate::model::{BuildState, Outcome};

    fn spec(mount_count: u64) -> UnitSpec {
        UnitSpec {
            namespace: NamespaceIdentity::new("ns-001", "root/ns-001", "root"),
            mount_prefix: "kv".into(),
            start_index: 1,
            mount_count,
            index_width: 3,
        }
    }

    #[tokio::test]
    async fn test_namespace_precedes_mounts() {
        let api = RecordingApi::new();

        let result = build_unit(api.as_ref(), &spec(3)).await;

        let calls = api.recorded();
        assert_eq!(calls.len(), 4);
        assert_eq!(
            calls[0],
            Call::Namespace {
                name: "ns-001".into(),
                parent_scope: "root".into()
            }
        );
        for (i, expected) in ["kv-001", "kv-002", "kv-003"].iter().enumerate() {
            assert_eq!(
                calls[i + 1],
                Call::Mount {
                    scope: "ns-001".into(),
                    name: (*expected).into()
                }
            );
        }

        assert_eq!(result.outcome.state, BuildState::Created);
        assert_eq!(result.mounts.len(), 3);
    }

    #[tokio::test]
    async fn test_rejected_namespace_still_gets_mounts() {
        let api = RecordingApi::new();
        api.set_outcome("ns-001", Outcome::classify(400));

        let result = build_unit(api.as_ref(), &spec(2)).await;

        assert_eq!(result.outcome.state, BuildState::Rejected);
        assert_eq!(api.mount_calls().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_namespace_still_gets_mounts() {
        let api = RecordingApi::new();
        api.set_outcome("ns-001", Outcome::classify(500));

        let result = build_unit(api.as_ref(), &spec(1)).await;

        assert_eq!(result.outcome.state, BuildState::Failed);
        assert_eq!(result.outcome.status, 500);
        assert_eq!(api.mount_calls().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_mount_is_recorded_not_escalated() {
        let api = RecordingApi::new();
        api.set_outcome("kv-002", Outcome::classify(503));

        let result = build_unit(api.as_ref(), &spec(3)).await;

        assert_eq!(result.mounts[1].outcome.state, BuildState::Failed);
        // The third mount is still attempted after the second fails
        assert_eq!(result.mounts[2].outcome.state, BuildState::Created);
    }

    #[tokio::test]
    async fn test_zero_mounts() {
        let api = RecordingApi::new();

        let result = build_unit(api.as_ref(), &spec(0)).await;

        assert!(result.mounts.is_empty());
        assert_eq!(api.recorded().len(), 1);
    }

    #[tokio::test]
    async fn test_child_namespace_mount_scope() {
        let api = RecordingApi::new();
        let spec = UnitSpec {
            namespace: NamespaceIdentity::new("p001-002", "root/p001/p001-002", "p001"),
            mount_prefix: "kv".into(),
            start_index: 1,
            mount_count: 1,
            index_width: 3,
        };

        build_unit(api.as_ref(), &spec).await;

        // Mount headers address the namespace relative to root
        assert_eq!(
            api.mount_calls()[0],
            Call::Mount {
                scope: "p001/p001-002".into(),
                name: "kv-001".into()
            }
        );
    }
}
