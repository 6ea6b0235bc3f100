pub mod in_memory;

use crate::core::{ClusterStatus, RegionDescriptor, Result, ServerDescriptor};

pub use in_memory::{InMemoryCluster, InMemoryClusterConfig};

/// Administrative surface of a region-based storage cluster.
///
/// Calls block until the cluster answers. Mutating commands are
/// fire-and-forget: returning `Ok(())` only means the command was accepted
/// for delivery, not that it took effect.
pub trait ClusterAdminClient: Send + Sync {
    fn table_exists(&self, table: &str) -> Result<bool>;

    fn is_table_enabled(&self, table: &str) -> Result<bool>;

    fn is_table_disabled(&self, table: &str) -> Result<bool>;

    /// Requests a split of the region of `table` containing `split_point`.
    fn split(&self, table: &str, split_point: &[u8]) -> Result<()>;

    /// Requests relocation of a region, addressed by encoded name.
    ///
    /// The cluster may drop this command without any error.
    fn move_region(&self, encoded_region_name: &str, destination: &ServerDescriptor) -> Result<()>;

    /// Fresh status of every live server and its region loads.
    fn cluster_status(&self) -> Result<ClusterStatus>;

    /// Regions of `table` as listed by the cluster's region catalog, ordered by start key.
    fn table_regions(&self, table: &str) -> Result<Vec<RegionDescriptor>>;

    /// Switches the balancer and returns its previous state.
    ///
    /// With `synchronous` set, the call waits for any running balance round.
    fn set_balancer_running(&self, running: bool, synchronous: bool) -> Result<bool>;

    /// Fails with `TableNotDisabled` if the table is not disabled.
    fn enable_table(&self, table: &str) -> Result<()>;

    /// Fails with `TableNotEnabled` if the table is not enabled.
    fn disable_table(&self, table: &str) -> Result<()>;

    /// Fails with `TableNotDisabled` unless the table is disabled.
    fn delete_table(&self, table: &str) -> Result<()>;
}
