use crate::admin::ClusterAdminClient;
use crate::core::{RegionDescriptor, RegionLoad, Result, ServerDescriptor};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Which server reports hosting which region of one table, at one instant.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PlacementSnapshot {
    table: String,
    servers: BTreeMap<ServerDescriptor, BTreeSet<RegionDescriptor>>,
}

impl PlacementSnapshot {
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Total regions of the table reported across all servers.
    pub fn region_count(&self) -> usize {
        self.servers.values().map(BTreeSet::len).sum()
    }

    /// Live servers in their total order, including ones hosting nothing of this table.
    pub fn servers(&self) -> impl Iterator<Item = &ServerDescriptor> {
        self.servers.keys()
    }

    pub fn regions_on(&self, server: &ServerDescriptor) -> Option<&BTreeSet<RegionDescriptor>> {
        self.servers.get(server)
    }

    /// First server (in server order) reporting the region.
    pub fn server_of(&self, region: &RegionDescriptor) -> Option<&ServerDescriptor> {
        self.servers
            .iter()
            .find(|(_, regions)| regions.contains(region))
            .map(|(server, _)| server)
    }

    /// Servers paired with the regions of this table they report.
    pub fn iter(
        &self,
    ) -> impl Iterator<Item = (&ServerDescriptor, &BTreeSet<RegionDescriptor>)> {
        self.servers.iter()
    }
}

/// Derives region placement from what servers themselves report.
///
/// Every call fetches a fresh cluster status; nothing is cached between calls.
#[derive(Clone, Copy)]
pub struct PlacementObserver<'a> {
    admin: &'a dyn ClusterAdminClient,
}

impl<'a> PlacementObserver<'a> {
    pub fn new(admin: &'a dyn ClusterAdminClient) -> Self {
        Self { admin }
    }

    /// Cross-references each server's region loads against the table's
    /// known regions by exact region-name bytes.
    pub fn actual_placement(&self, table: &str) -> Result<PlacementSnapshot> {
        let regions = self.admin.table_regions(table)?;
        let status = self.admin.cluster_status()?;

        let by_name: HashMap<&[u8], &RegionDescriptor> = regions
            .iter()
            .map(|region| (region.region_name(), region))
            .collect();

        let mut servers = BTreeMap::new();
        for (server, load) in &status.servers {
            let hosted: BTreeSet<RegionDescriptor> = load
                .region_names()
                .filter_map(|name| by_name.get(name).map(|region| (*region).clone()))
                .collect();
            servers.insert(server.clone(), hosted);
        }

        Ok(PlacementSnapshot {
            table: table.to_string(),
            servers,
        })
    }

    /// Regions of `table` currently reported by `server`, in region-name order.
    pub fn online_regions(
        &self,
        server: &ServerDescriptor,
        table: &str,
    ) -> Result<Vec<RegionDescriptor>> {
        let snapshot = self.actual_placement(table)?;
        Ok(snapshot
            .regions_on(server)
            .map(|regions| regions.iter().cloned().collect())
            .unwrap_or_default())
    }

    /// The load `server` reports for exactly this region, if any.
    pub fn region_load(
        &self,
        region: &RegionDescriptor,
        server: &ServerDescriptor,
    ) -> Result<Option<RegionLoad>> {
        let status = self.admin.cluster_status()?;
        Ok(status
            .load(server)
            .and_then(|load| load.load_for(region.region_name()))
            .cloned())
    }

    /// Live servers, sorted.
    pub fn servers(&self) -> Result<Vec<ServerDescriptor>> {
        Ok(self.admin.cluster_status()?.server_names())
    }

    /// Regions the catalog lists for `table`. May lag behind server reports.
    pub fn region_count(&self, table: &str) -> Result<usize> {
        Ok(self.admin.table_regions(table)?.len())
    }

    /// Catalog regions of `table`, sorted by region name.
    pub fn regions(&self, table: &str) -> Result<Vec<RegionDescriptor>> {
        let mut regions = self.admin.table_regions(table)?;
        regions.sort();
        regions.dedup();
        Ok(regions)
    }
}
