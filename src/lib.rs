//! Vault Namespace Stress Tool
//!
//! Provisions a hierarchical tree of Vault namespaces and, within each, a
//! configurable number of KV v2 secret-engine mounts, in parallel, for load
//! testing the namespace subsystem.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                    Tree Orchestrator                     │
//! │   topology enumeration · bounded worker pool · summary   │
//! ├──────────────────────────────────────────────────────────┤
//! │                 Namespace Unit Builder                   │
//! │        one namespace + its mounts, strictly sequential   │
//! ├──────────────────────────────────────────────────────────┤
//! │                    Request Executor                      │
//! │     single POST per resource · status classification     │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`orchestrator`]: topology shapes, worker pool, run summary
//! - [`builder`]: per-namespace provisioning
//! - [`client`]: Vault sys API executor and the [`ProvisionApi`] seam
//! - [`model`]: outcomes, identities, results, index naming
//! - [`error`]: error types and exit-code policy

pub mod builder;
pub mod client;
pub mod error;
pub mod model;
pub mod orchestrator;

pub use builder::{build_unit, UnitSpec};
pub use client::{ProvisionApi, VaultClient, VaultClientConfig};
pub use error::{Error, Result};
pub use model::{
    BuildState, MountResult, NamespaceIdentity, Outcome, TreeResult, UnitResult,
};
pub use orchestrator::{run, Depth, OutcomeCounts, RunConfig, RunSummary};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
