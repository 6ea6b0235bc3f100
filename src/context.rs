use crate::admin::ClusterAdminClient;
use crate::config::RetryBudget;
use crate::core::{RegionDescriptor, Result, ServerDescriptor};
use crate::placement::PlacementObserver;
use crate::poller::{ConvergencePoller, Sleeper};
use crate::verify::{BalancerToggle, MoveVerifier, SplitVerifier, StateVerifier};
use std::fmt;
use std::sync::Arc;

/// Everything a verification needs, built once and passed by reference.
///
/// # Examples
///
/// ```
/// use cluster_converge::{ClusterContext, InMemoryCluster, RetryBudget};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let cluster = Arc::new(InMemoryCluster::default());
/// cluster.add_server("rs1", 16020, 1)?;
/// cluster.add_table("users", &[])?;
///
/// let budget = RetryBudget::default().interval(Duration::from_millis(1));
/// let ctx = ClusterContext::new(cluster, budget)?;
/// ctx.split_table("users", b"m")?;
/// assert_eq!(ctx.placement().actual_placement("users")?.region_count(), 2);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ClusterContext {
    admin: Arc<dyn ClusterAdminClient>,
    poller: ConvergencePoller,
}

impl fmt::Debug for ClusterContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClusterContext")
            .field("poller", &self.poller)
            .finish_non_exhaustive()
    }
}

impl ClusterContext {
    /// Creates a context that sleeps on the calling thread between probes.
    pub fn new(admin: Arc<dyn ClusterAdminClient>, budget: RetryBudget) -> Result<Self> {
        Ok(Self {
            admin,
            poller: ConvergencePoller::new(budget)?,
        })
    }

    /// Replaces how the poller waits between probes.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.poller = self.poller.sleeping_with(sleeper);
        self
    }

    pub fn admin(&self) -> &dyn ClusterAdminClient {
        self.admin.as_ref()
    }

    pub fn budget(&self) -> &RetryBudget {
        self.poller.budget()
    }

    pub fn poller(&self) -> &ConvergencePoller {
        &self.poller
    }

    pub fn placement(&self) -> PlacementObserver<'_> {
        PlacementObserver::new(self.admin())
    }

    pub fn splits(&self) -> SplitVerifier<'_> {
        SplitVerifier::new(self.admin(), &self.poller)
    }

    pub fn moves(&self) -> MoveVerifier<'_> {
        MoveVerifier::new(self.admin(), &self.poller)
    }

    pub fn tables(&self) -> StateVerifier<'_> {
        StateVerifier::new(self.admin(), &self.poller)
    }

    pub fn balancer(&self) -> BalancerToggle<'_> {
        BalancerToggle::new(self.admin())
    }

    /// Splits and fails hard unless the extra region shows up in time.
    pub fn split_table(&self, table: &str, split_point: &[u8]) -> Result<()> {
        self.splits().split_table(table, split_point)?.into_result()?;
        Ok(())
    }

    /// Moves and fails hard unless the target reports the region in time.
    pub fn move_region(&self, region: &RegionDescriptor, target: &ServerDescriptor) -> Result<()> {
        self.moves().move_region(region, target)?.into_result()?;
        Ok(())
    }

    pub fn drop_table(&self, table: &str) -> Result<()> {
        self.tables().drop_table(table)
    }
}
