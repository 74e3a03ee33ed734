//! Tree Orchestrator
//!
//! Enumerates the top-level work items for the selected topology, dispatches
//! them across a bounded worker pool, and collects results in completion
//! order. The concurrency unit is one whole top-level namespace (flat) or
//! one whole parent tree (hierarchical): a worker owns its tree end-to-end,
//! which preserves parent-before-child ordering without any cross-worker
//! coordination.

use crate::builder::{build_unit, UnitSpec};
use crate::client::ProvisionApi;
use crate::error::{Error, Result};
use crate::model::{index_width, padded, NamespaceIdentity, Outcome, TreeResult, UnitResult};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info};

// =============================================================================
// Run Configuration
// =============================================================================

/// Topology shape for a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Depth {
    /// Depth 2: namespaces directly under root
    Flat,
    /// Depth 3: parent namespaces under root, each with child namespaces
    Hierarchical,
}

impl Depth {
    /// Map the CLI depth level (2 or 3) to a topology
    pub fn from_level(level: u8) -> Option<Self> {
        match level {
            2 => Some(Depth::Flat),
            3 => Some(Depth::Hierarchical),
            _ => None,
        }
    }
}

/// Configuration for one provisioning run
///
/// Counts are signed so that out-of-range values arriving from the outside
/// are rejected by [`RunConfig::validate`] rather than by a parse failure.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub depth: Depth,
    /// Number of top-level namespaces (flat) or parent trees (hierarchical)
    pub namespaces: i64,
    /// Number of KV mounts per namespace
    pub mounts_per_namespace: i64,
    /// Children per parent; only meaningful for hierarchical runs
    pub children_per_parent: i64,
    /// Namespace name prefix
    pub ns_prefix: String,
    /// Mount name prefix
    pub mount_prefix: String,
    /// First index for every naming tier
    pub start_index: u64,
    /// Worker pool size
    pub workers: usize,
}

impl RunConfig {
    /// Validate counts before any request is issued
    pub fn validate(&self) -> Result<()> {
        if self.namespaces <= 0 {
            return Err(Error::Configuration(
                "namespace count must be greater than zero".into(),
            ));
        }
        if self.mounts_per_namespace < 0 {
            return Err(Error::Configuration(
                "mount count must not be negative".into(),
            ));
        }
        if self.depth == Depth::Hierarchical && self.children_per_parent < 0 {
            return Err(Error::Configuration(
                "children per parent must not be negative".into(),
            ));
        }
        if self.workers == 0 {
            return Err(Error::Configuration(
                "worker pool size must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Run Summary
// =============================================================================

/// Counts of classified outcomes for one kind of resource
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OutcomeCounts {
    pub created: u64,
    pub already_exists: u64,
    pub rejected: u64,
    pub failed: u64,
}

impl OutcomeCounts {
    fn absorb(&mut self, outcome: Outcome) {
        use crate::model::BuildState::*;
        match outcome.state {
            Created => self.created += 1,
            AlreadyExists => self.already_exists += 1,
            Rejected => self.rejected += 1,
            Failed => self.failed += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.created + self.already_exists + self.rejected + self.failed
    }
}

/// Aggregate totals for a completed run
///
/// Any number of Failed outcomes still counts as a successful run; only
/// `incomplete` units (ones whose worker did not finish at all) indicate
/// the orchestrator lost track of work, and even those never fail the run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub namespaces: OutcomeCounts,
    pub mounts: OutcomeCounts,
    /// Units or trees whose worker panicked before producing a result
    pub incomplete: u64,
}

impl RunSummary {
    fn absorb_unit(&mut self, unit: &UnitResult) {
        self.namespaces.absorb(unit.outcome);
        for mount in &unit.mounts {
            self.mounts.absorb(mount.outcome);
        }
    }

    fn absorb_tree(&mut self, tree: &TreeResult) {
        self.absorb_unit(&tree.parent);
        for child in &tree.children {
            self.absorb_unit(child);
        }
    }
}

// =============================================================================
// Orchestration
// =============================================================================

/// Execute a full provisioning run
///
/// Validates the configuration, fans the top-level units out across the
/// worker pool, and drains every submitted unit before returning. Per-unit
/// failures are folded into the summary, never escalated.
pub async fn run(api: Arc<dyn ProvisionApi>, config: RunConfig) -> Result<RunSummary> {
    config.validate()?;

    match config.depth {
        Depth::Flat => run_flat(api, &config).await,
        Depth::Hierarchical => run_hierarchical(api, &config).await,
    }
}

/// Depth 2: `n` independent namespaces under root, all submitted at once
async fn run_flat(api: Arc<dyn ProvisionApi>, config: &RunConfig) -> Result<RunSummary> {
    let n = config.namespaces as u64;
    let mounts = config.mounts_per_namespace as u64;
    let width_ns = index_width(config.start_index, n);
    let width_kv = index_width(config.start_index, mounts);

    info!(
        "creating {n} namespaces under root (depth=2) with {mounts} KV v2 mounts each, \
         {} workers",
        config.workers
    );

    let pool = Arc::new(Semaphore::new(config.workers));
    let mut tasks: JoinSet<UnitResult> = JoinSet::new();
    let mut names: HashMap<tokio::task::Id, String> = HashMap::new();

    for index in config.start_index..config.start_index + n {
        let name = format!("{}-{}", config.ns_prefix, padded(index, width_ns));
        let full_path = format!("root/{name}");
        let spec = UnitSpec {
            namespace: NamespaceIdentity::new(name, full_path.clone(), "root"),
            mount_prefix: config.mount_prefix.clone(),
            start_index: config.start_index,
            mount_count: mounts,
            index_width: width_kv,
        };

        let api = api.clone();
        let pool = pool.clone();
        let handle = tasks.spawn(async move {
            let _permit = pool.acquire_owned().await.expect("worker pool closed");
            build_unit(api.as_ref(), &spec).await
        });
        names.insert(handle.id(), full_path);
    }

    let mut summary = RunSummary::default();
    let mut completed = 0u64;

    while let Some(joined) = tasks.join_next_with_id().await {
        completed += 1;
        match joined {
            Ok((_, unit)) => {
                summary.absorb_unit(&unit);
                info!("progress: {completed}/{n} namespaces processed");
            }
            Err(err) => {
                let name = names
                    .get(&err.id())
                    .map(String::as_str)
                    .unwrap_or("<unknown>");
                error!("unit {name} did not complete: {err}");
                summary.incomplete += 1;
            }
        }
    }

    log_summary(&summary);
    Ok(summary)
}

/// Depth 3: `n` parent trees, each owned end-to-end by one worker
async fn run_hierarchical(api: Arc<dyn ProvisionApi>, config: &RunConfig) -> Result<RunSummary> {
    let n = config.namespaces as u64;
    let children = config.children_per_parent as u64;
    let mounts = config.mounts_per_namespace as u64;
    let width_parent = index_width(config.start_index, n);
    let width_child = index_width(config.start_index, children);
    let width_kv = index_width(config.start_index, mounts);

    info!(
        "creating {n} parent trees under root (depth=3), each with {children} children \
         and {mounts} KV v2 mounts per namespace, {} workers",
        config.workers
    );

    let pool = Arc::new(Semaphore::new(config.workers));
    let mut tasks: JoinSet<TreeResult> = JoinSet::new();
    let mut names: HashMap<tokio::task::Id, String> = HashMap::new();

    for index in config.start_index..config.start_index + n {
        // Parents are named without a separator so child names stay readable
        let parent_name = format!("{}{}", config.ns_prefix, padded(index, width_parent));
        let tree = TreeSpec {
            parent_name: parent_name.clone(),
            mount_prefix: config.mount_prefix.clone(),
            start_index: config.start_index,
            mount_count: mounts,
            child_count: children,
            width_child,
            width_kv,
        };

        let api = api.clone();
        let pool = pool.clone();
        let handle = tasks.spawn(async move {
            let _permit = pool.acquire_owned().await.expect("worker pool closed");
            build_tree(api.as_ref(), &tree).await
        });
        names.insert(handle.id(), parent_name);
    }

    let mut summary = RunSummary::default();
    let mut completed = 0u64;

    while let Some(joined) = tasks.join_next_with_id().await {
        completed += 1;
        match joined {
            Ok((_, tree)) => {
                summary.absorb_tree(&tree);
                info!(
                    "progress: {completed}/{n} parent trees processed - {} with {} children",
                    tree.parent.namespace.name,
                    tree.children.len()
                );
            }
            Err(err) => {
                let name = names
                    .get(&err.id())
                    .map(String::as_str)
                    .unwrap_or("<unknown>");
                error!("parent tree {name} did not complete: {err}");
                summary.incomplete += 1;
            }
        }
    }

    log_summary(&summary);
    Ok(summary)
}

/// Everything one worker needs to build a parent tree
#[derive(Debug, Clone)]
struct TreeSpec {
    parent_name: String,
    mount_prefix: String,
    start_index: u64,
    mount_count: u64,
    child_count: u64,
    width_child: usize,
    width_kv: usize,
}

/// Build one parent tree depth-first: the parent unit, then each child unit
/// sequentially in index order
///
/// The parent's own outcome never gates its children; a Rejected or Failed
/// parent that already exists from a previous run is the common case, and
/// its children must still be attempted.
async fn build_tree(api: &dyn ProvisionApi, tree: &TreeSpec) -> TreeResult {
    let parent_path = format!("root/{}", tree.parent_name);

    let parent_spec = UnitSpec {
        namespace: NamespaceIdentity::new(tree.parent_name.clone(), parent_path.clone(), "root"),
        mount_prefix: tree.mount_prefix.clone(),
        start_index: tree.start_index,
        mount_count: tree.mount_count,
        index_width: tree.width_kv,
    };
    let parent = build_unit(api, &parent_spec).await;

    let mut children = Vec::with_capacity(tree.child_count as usize);
    for index in tree.start_index..tree.start_index + tree.child_count {
        let child_name = format!("{}-{}", tree.parent_name, padded(index, tree.width_child));
        let child_path = format!("{parent_path}/{child_name}");
        let child_spec = UnitSpec {
            namespace: NamespaceIdentity::new(child_name, child_path, tree.parent_name.clone()),
            mount_prefix: tree.mount_prefix.clone(),
            start_index: tree.start_index,
            mount_count: tree.mount_count,
            index_width: tree.width_kv,
        };
        children.push(build_unit(api, &child_spec).await);
    }

    TreeResult { parent, children }
}

fn log_summary(summary: &RunSummary) {
    info!(
        "run complete: {} namespaces ({} created, {} existing, {} rejected, {} failed), \
         {} mounts ({} created, {} existing, {} rejected, {} failed), {} incomplete",
        summary.namespaces.total(),
        summary.namespaces.created,
        summary.namespaces.already_exists,
        summary.namespaces.rejected,
        summary.namespaces.failed,
        summary.mounts.total(),
        summary.mounts.created,
        summary.mounts.already_exists,
        summary.mounts.rejected,
        summary.mounts.failed,
        summary.incomplete,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock::{Call, RecordingApi};
    use crate::model::Outcome;
    use assert_matches::assert_matches;
    use std::time::Duration;

    fn flat_config(n: i64, mounts: i64) -> RunConfig {
        RunConfig {
            depth: Depth::Flat,
            namespaces: n,
            mounts_per_namespace: mounts,
            children_per_parent: 1,
            ns_prefix: "ns".into(),
            mount_prefix: "kv".into(),
            start_index: 1,
            workers: 20,
        }
    }

    fn tree_config(n: i64, children: i64, mounts: i64) -> RunConfig {
        RunConfig {
            depth: Depth::Hierarchical,
            children_per_parent: children,
            ..flat_config(n, mounts)
        }
    }

    #[test]
    fn test_depth_from_level() {
        assert_eq!(Depth::from_level(2), Some(Depth::Flat));
        assert_eq!(Depth::from_level(3), Some(Depth::Hierarchical));
        assert_eq!(Depth::from_level(4), None);
    }

    #[tokio::test]
    async fn test_flat_names_and_counts() {
        let api = RecordingApi::new();

        let summary = run(api.clone(), flat_config(5, 2)).await.unwrap();

        let ns_calls = api.namespace_calls();
        assert_eq!(ns_calls.len(), 5);

        let mut names: Vec<String> = ns_calls
            .iter()
            .map(|c| match c {
                Call::Namespace { name, parent_scope } => {
                    assert_eq!(parent_scope, "root");
                    name.clone()
                }
                _ => unreachable!(),
            })
            .collect();
        names.sort();
        assert_eq!(names, ["ns-001", "ns-002", "ns-003", "ns-004", "ns-005"]);

        // Two mounts per namespace, named from the start index
        let mount_calls = api.mount_calls();
        assert_eq!(mount_calls.len(), 10);
        for scope in &names {
            let for_ns: Vec<_> = mount_calls
                .iter()
                .filter_map(|c| match c {
                    Call::Mount { scope: s, name } if s == scope => Some(name.clone()),
                    _ => None,
                })
                .collect();
            assert_eq!(for_ns, ["kv-001", "kv-002"]);
        }

        assert_eq!(summary.namespaces.created, 5);
        assert_eq!(summary.mounts.created, 10);
        assert_eq!(summary.incomplete, 0);
    }

    #[tokio::test]
    async fn test_flat_width_grows_with_indices() {
        let api = RecordingApi::new();
        let config = RunConfig {
            start_index: 998,
            ..flat_config(5, 0)
        };

        run(api.clone(), config).await.unwrap();

        let mut names: Vec<String> = api
            .namespace_calls()
            .iter()
            .map(|c| match c {
                Call::Namespace { name, .. } => name.clone(),
                _ => unreachable!(),
            })
            .collect();
        names.sort();
        assert_eq!(
            names,
            ["ns-0998", "ns-0999", "ns-1000", "ns-1001", "ns-1002"]
        );
    }

    #[tokio::test]
    async fn test_hierarchical_counts_and_ordering() {
        let api = RecordingApi::new();

        let summary = run(api.clone(), tree_config(2, 3, 1)).await.unwrap();

        let calls = api.recorded();
        let ns_calls = api.namespace_calls();
        let parents: Vec<&Call> = ns_calls
            .iter()
            .filter(|c| matches!(c, Call::Namespace { parent_scope, .. } if parent_scope == "root"))
            .collect();
        assert_eq!(parents.len(), 2);
        assert_eq!(ns_calls.len(), 2 + 2 * 3);
        assert_eq!(api.mount_calls().len(), 8);

        // Parents are named without a separator; children carry the parent
        // name plus a separated index, scoped under the parent
        for parent in &parents {
            let parent_name = match parent {
                Call::Namespace { name, .. } => name.clone(),
                _ => unreachable!(),
            };
            assert!(parent_name == "ns001" || parent_name == "ns002");

            let parent_pos = calls.iter().position(|c| *c == **parent).unwrap();
            let child_positions: Vec<usize> = calls
                .iter()
                .enumerate()
                .filter_map(|(i, c)| match c {
                    Call::Namespace { parent_scope, name } if *parent_scope == parent_name => {
                        assert!(name.starts_with(&format!("{parent_name}-")));
                        Some(i)
                    }
                    _ => None,
                })
                .collect();
            assert_eq!(child_positions.len(), 3);
            // Every child create is issued strictly after its parent's
            for pos in child_positions {
                assert!(pos > parent_pos);
            }
        }

        assert_eq!(summary.namespaces.created, 8);
        assert_eq!(summary.mounts.created, 8);
    }

    #[tokio::test]
    async fn test_rejected_parent_does_not_gate_children() {
        let api = RecordingApi::new();
        api.set_outcome("ns001", Outcome::classify(400));

        let summary = run(api.clone(), tree_config(1, 2, 1)).await.unwrap();

        assert_eq!(summary.namespaces.rejected, 1);
        assert_eq!(summary.namespaces.created, 2);
        // Parent's own mount and both children's mounts were all attempted
        assert_eq!(api.mount_calls().len(), 3);
    }

    #[tokio::test]
    async fn test_rerun_idempotence() {
        // A second run over the same tree sees 409s everywhere; the run
        // still succeeds and every request is still issued
        let api = RecordingApi::with_outcome(Outcome::classify(409));

        let summary = run(api.clone(), flat_config(3, 2)).await.unwrap();

        assert_eq!(api.namespace_calls().len(), 3);
        assert_eq!(api.mount_calls().len(), 6);
        assert_eq!(summary.namespaces.already_exists, 3);
        assert_eq!(summary.mounts.already_exists, 6);
        assert_eq!(summary.namespaces.failed, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_worker_pool_bound() {
        let gate = Arc::new(Semaphore::new(0));
        let api = RecordingApi::gated(gate.clone());

        let config = RunConfig {
            workers: 2,
            ..flat_config(6, 0)
        };
        let handle = tokio::spawn(run(api.clone(), config));

        // Give the pool time to saturate against the closed gate
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(
            api.max_in_flight.load(std::sync::atomic::Ordering::SeqCst),
            2
        );

        gate.add_permits(6);
        let summary = handle.await.unwrap().unwrap();
        assert_eq!(summary.namespaces.created, 6);
        assert_eq!(
            api.max_in_flight.load(std::sync::atomic::Ordering::SeqCst),
            2
        );
    }

    #[tokio::test]
    async fn test_panicking_unit_leaves_siblings_intact() {
        let api = RecordingApi::new();
        api.panic_on("ns-002");

        let summary = run(api.clone(), flat_config(3, 1)).await.unwrap();

        assert_eq!(summary.incomplete, 1);
        assert_eq!(summary.namespaces.created, 2);
        assert_eq!(summary.mounts.created, 2);
    }

    #[tokio::test]
    async fn test_invalid_counts_issue_no_requests() {
        let api = RecordingApi::new();

        let err = run(api.clone(), flat_config(0, 1)).await.unwrap_err();
        assert_matches!(err, Error::Configuration(_));
        assert_eq!(err.exit_code(), 2);

        let err = run(api.clone(), flat_config(5, -1)).await.unwrap_err();
        assert_matches!(err, Error::Configuration(_));

        let err = run(api.clone(), tree_config(1, -1, 0)).await.unwrap_err();
        assert_matches!(err, Error::Configuration(_));

        assert!(api.recorded().is_empty());
    }

    #[tokio::test]
    async fn test_zero_workers_rejected() {
        let api = RecordingApi::new();
        let config = RunConfig {
            workers: 0,
            ..flat_config(1, 0)
        };

        let err = run(api.clone(), config).await.unwrap_err();
        assert_matches!(err, Error::Configuration(_));
        assert!(api.recorded().is_empty());
    }
}
