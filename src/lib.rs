// ============================================================================
// cluster-converge
// ============================================================================
//
// Issue a mutation against a region-based storage cluster, then poll the
// cluster's own reports until the change is visible or the retry budget runs
// out.

pub mod admin;
pub mod config;
pub mod context;
pub mod core;
pub mod placement;
pub mod poller;
pub mod session;
pub mod verify;

// Re-export main types for convenience
pub use admin::{ClusterAdminClient, InMemoryCluster, InMemoryClusterConfig};
pub use config::RetryBudget;
pub use context::ClusterContext;
pub use crate::core::{
    ClusterStatus, ConvergeError, MoveDiagnostic, OperationOutcome, Probe, RegionDescriptor,
    RegionLoad, Result, ServerDescriptor, ServerLoad, SplitDiagnostic, StateDiagnostic,
    TableState,
};
pub use placement::{PlacementObserver, PlacementSnapshot};
pub use poller::{ConvergencePoller, Sleeper, ThreadSleeper};
pub use session::ClusterSession;
pub use verify::{BalancerToggle, MoveVerifier, SplitVerifier, StateVerifier};
