use super::ClusterAdminClient;
use crate::core::{
    ClusterStatus, ConvergeError, RegionDescriptor, RegionLoad, Result, ServerDescriptor,
    ServerLoad,
};
use log::debug;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

/// Fault and latency settings for [`InMemoryCluster`].
///
/// Delays are counted in observation ticks: every read call (`cluster_status`,
/// `table_regions`, `table_exists`, `is_table_enabled`, `is_table_disabled`)
/// advances the simulated clock by one tick.
#[derive(Debug, Clone)]
pub struct InMemoryClusterConfig {
    /// Ticks before an accepted split shows up; `None` means splits never land.
    pub split_delay: Option<u64>,
    /// Ticks before an accepted move shows up.
    pub move_delay: u64,
    /// Number of upcoming move commands to drop silently.
    pub dropped_moves: u32,
    /// Servers that silently ignore every move addressed to them.
    pub refusing_servers: BTreeSet<ServerDescriptor>,
    /// Ticks an enable, disable or delete stays in transition.
    pub state_delay: u64,
    /// Number of upcoming `cluster_status` calls that fail.
    pub failing_status_calls: u32,
    /// Initial balancer state.
    pub balancer_running: bool,
}

impl Default for InMemoryClusterConfig {
    fn default() -> Self {
        Self {
            split_delay: Some(0),
            move_delay: 0,
            dropped_moves: 0,
            refusing_servers: BTreeSet::new(),
            state_delay: 0,
            failing_status_calls: 0,
            balancer_running: true,
        }
    }
}

impl InMemoryClusterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn split_delay(mut self, ticks: u64) -> Self {
        self.split_delay = Some(ticks);
        self
    }

    /// Accept split commands but never apply them.
    pub fn splits_never_land(mut self) -> Self {
        self.split_delay = None;
        self
    }

    pub fn move_delay(mut self, ticks: u64) -> Self {
        self.move_delay = ticks;
        self
    }

    pub fn dropped_moves(mut self, count: u32) -> Self {
        self.dropped_moves = count;
        self
    }

    pub fn refusing_server(mut self, server: ServerDescriptor) -> Self {
        self.refusing_servers.insert(server);
        self
    }

    pub fn state_delay(mut self, ticks: u64) -> Self {
        self.state_delay = ticks;
        self
    }

    pub fn failing_status_calls(mut self, count: u32) -> Self {
        self.failing_status_calls = count;
        self
    }

    pub fn balancer_running(mut self, running: bool) -> Self {
        self.balancer_running = running;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TableMode {
    Enabled,
    Disabling,
    Disabled,
    Enabling,
    Deleting,
}

#[derive(Debug, Clone)]
struct TableEntry {
    mode: TableMode,
    /// Region catalog, ordered by start key.
    regions: Vec<RegionDescriptor>,
}

#[derive(Debug, Clone)]
enum Change {
    Split {
        table: String,
        parent: RegionDescriptor,
        daughters: [RegionDescriptor; 2],
    },
    Move {
        region: RegionDescriptor,
        destination: ServerDescriptor,
    },
    Mode {
        table: String,
        mode: TableMode,
    },
    Delete {
        table: String,
    },
}

#[derive(Debug, Clone)]
struct Pending {
    due: u64,
    change: Change,
}

#[derive(Debug, Default)]
struct ClusterState {
    tick: u64,
    next_region_id: u64,
    servers: BTreeMap<ServerDescriptor, ServerLoad>,
    tables: BTreeMap<String, TableEntry>,
    pending: Vec<Pending>,
    balancer_running: bool,
    dropped_moves_left: u32,
    failing_status_left: u32,
    /// Live servers left out of status reports.
    hidden_servers: BTreeSet<ServerDescriptor>,
    move_requests: u64,
    split_requests: u64,
}

impl ClusterState {
    /// Advances the clock one tick and applies every change that is due.
    fn observe(&mut self) {
        self.tick += 1;
        let now = self.tick;
        let (due, waiting): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.pending).into_iter().partition(|p| p.due <= now);
        self.pending = waiting;
        for pending in due {
            self.apply(pending.change);
        }
    }

    fn schedule(&mut self, delay: u64, change: Change) {
        self.pending.push(Pending {
            due: self.tick + delay,
            change,
        });
    }

    fn allocate_region_id(&mut self) -> u64 {
        self.next_region_id += 1;
        self.next_region_id
    }

    fn hosting_server(&self, region_name: &[u8]) -> Option<ServerDescriptor> {
        self.servers
            .iter()
            .find(|(_, load)| load.regions_load.contains_key(region_name))
            .map(|(server, _)| server.clone())
    }

    fn catalog_region_by_encoded_name(&self, encoded_name: &str) -> Option<RegionDescriptor> {
        self.tables
            .values()
            .flat_map(|entry| entry.regions.iter())
            .find(|region| region.encoded_name() == encoded_name)
            .cloned()
    }

    fn table(&self, table: &str) -> Result<&TableEntry> {
        self.tables
            .get(table)
            .ok_or_else(|| ConvergeError::TableNotFound(table.to_string()))
    }

    /// Spreads regions round-robin over the live servers.
    fn assign(&mut self, regions: &[RegionDescriptor]) {
        let servers: Vec<ServerDescriptor> = self.servers.keys().cloned().collect();
        if servers.is_empty() {
            return;
        }
        for (idx, region) in regions.iter().enumerate() {
            let server = &servers[idx % servers.len()];
            if let Some(load) = self.servers.get_mut(server) {
                load.regions_load.insert(
                    region.region_name().to_vec(),
                    RegionLoad::new(region.region_name()),
                );
            }
        }
    }

    fn unassign(&mut self, regions: &[RegionDescriptor]) {
        for load in self.servers.values_mut() {
            for region in regions {
                load.regions_load.remove(region.region_name());
            }
        }
    }

    fn apply(&mut self, change: Change) {
        match change {
            Change::Split {
                table,
                parent,
                daughters,
            } => {
                let Some(entry) = self.tables.get_mut(&table) else {
                    return;
                };
                let Some(pos) = entry.regions.iter().position(|r| *r == parent) else {
                    return;
                };
                entry.regions.remove(pos);
                entry.regions.insert(pos, daughters[1].clone());
                entry.regions.insert(pos, daughters[0].clone());

                let host = self
                    .hosting_server(parent.region_name())
                    .or_else(|| self.servers.keys().next().cloned());
                if let Some(host) = host {
                    if let Some(load) = self.servers.get_mut(&host) {
                        let parent_load = load
                            .regions_load
                            .remove(parent.region_name())
                            .unwrap_or_default();
                        for daughter in &daughters {
                            load.regions_load.insert(
                                daughter.region_name().to_vec(),
                                RegionLoad {
                                    region_name: daughter.region_name().to_vec(),
                                    stores: parent_load.stores,
                                    store_file_size_mb: parent_load.store_file_size_mb / 2,
                                    read_request_count: 0,
                                    write_request_count: 0,
                                },
                            );
                        }
                    }
                }
            }
            Change::Move {
                region,
                destination,
            } => {
                if !self.servers.contains_key(&destination) {
                    return;
                }
                let Some(source) = self.hosting_server(region.region_name()) else {
                    return;
                };
                if source == destination {
                    return;
                }
                let moved = self
                    .servers
                    .get_mut(&source)
                    .and_then(|load| load.regions_load.remove(region.region_name()));
                if let (Some(moved), Some(load)) = (moved, self.servers.get_mut(&destination)) {
                    load.regions_load.insert(region.region_name().to_vec(), moved);
                }
            }
            Change::Mode { table, mode } => {
                let Some(entry) = self.tables.get_mut(&table) else {
                    return;
                };
                entry.mode = mode;
                let regions = entry.regions.clone();
                match mode {
                    TableMode::Disabled => self.unassign(&regions),
                    TableMode::Enabled => self.assign(&regions),
                    _ => {}
                }
            }
            Change::Delete { table } => {
                if let Some(entry) = self.tables.remove(&table) {
                    self.unassign(&entry.regions);
                }
            }
        }
    }
}

/// A single-process stand-in for a region-based storage cluster.
///
/// Implements [`ClusterAdminClient`] with eventually-consistent behavior:
/// commands are accepted immediately and take effect after a configurable
/// number of observation ticks, or never.
pub struct InMemoryCluster {
    config: InMemoryClusterConfig,
    state: Mutex<ClusterState>,
}

impl Default for InMemoryCluster {
    fn default() -> Self {
        Self::new(InMemoryClusterConfig::default())
    }
}

impl InMemoryCluster {
    /// Creates an empty cluster with no servers and no tables.
    pub fn new(config: InMemoryClusterConfig) -> Self {
        let state = ClusterState {
            balancer_running: config.balancer_running,
            dropped_moves_left: config.dropped_moves,
            failing_status_left: config.failing_status_calls,
            ..ClusterState::default()
        };
        Self {
            config,
            state: Mutex::new(state),
        }
    }

    pub fn config(&self) -> &InMemoryClusterConfig {
        &self.config
    }

    /// Registers a live region server.
    pub fn add_server(&self, host: &str, port: u16, start_code: u64) -> Result<ServerDescriptor> {
        if host.trim().is_empty() {
            return Err(ConvergeError::ServerNotFound(
                "server host must not be empty".to_string(),
            ));
        }
        let server = ServerDescriptor::new(host, port, start_code);
        let mut state = self.state.lock()?;
        state.servers.entry(server.clone()).or_default();
        Ok(server)
    }

    /// Creates an enabled table pre-split at `split_keys`, assigning regions round-robin.
    pub fn add_table(&self, table: &str, split_keys: &[&[u8]]) -> Result<Vec<RegionDescriptor>> {
        let mut state = self.state.lock()?;
        if state.servers.is_empty() {
            return Err(ConvergeError::ServerNotFound(
                "no live servers to host regions".to_string(),
            ));
        }
        if state.tables.contains_key(table) {
            return Err(ConvergeError::InvalidTable(
                table.to_string(),
                "table already exists".to_string(),
            ));
        }

        let mut keys: Vec<&[u8]> = split_keys.iter().copied().filter(|k| !k.is_empty()).collect();
        keys.sort();
        keys.dedup();

        let mut bounds: Vec<&[u8]> = Vec::with_capacity(keys.len() + 2);
        bounds.push(b"");
        bounds.extend(keys);
        bounds.push(b"");

        let mut regions = Vec::with_capacity(bounds.len() - 1);
        for window in bounds.windows(2) {
            let id = state.allocate_region_id();
            regions.push(RegionDescriptor::for_range(table, window[0], window[1], id));
        }

        state.assign(&regions);
        state.tables.insert(
            table.to_string(),
            TableEntry {
                mode: TableMode::Enabled,
                regions: regions.clone(),
            },
        );
        Ok(regions)
    }

    /// Takes `server` out of the cluster, reassigning its catalog regions
    /// round-robin over the servers that remain.
    pub fn remove_server(&self, server: &ServerDescriptor) -> Result<()> {
        let mut state = self.state.lock()?;
        let load = state
            .servers
            .remove(server)
            .ok_or_else(|| ConvergeError::ServerNotFound(server.server_name()))?;
        state.hidden_servers.remove(server);
        let orphans: Vec<RegionDescriptor> = state
            .tables
            .values()
            .flat_map(|entry| entry.regions.iter())
            .filter(|region| load.regions_load.contains_key(region.region_name()))
            .cloned()
            .collect();
        state.assign(&orphans);
        Ok(())
    }

    /// Keeps `server` live but leaves it out of `cluster_status` until
    /// [`reveal_in_status`](Self::reveal_in_status) is called.
    pub fn hide_from_status(&self, server: &ServerDescriptor) -> Result<()> {
        let mut state = self.state.lock()?;
        if !state.servers.contains_key(server) {
            return Err(ConvergeError::ServerNotFound(server.server_name()));
        }
        state.hidden_servers.insert(server.clone());
        Ok(())
    }

    pub fn reveal_in_status(&self, server: &ServerDescriptor) -> Result<()> {
        self.state.lock()?.hidden_servers.remove(server);
        Ok(())
    }

    /// Makes `server` report a region load under an arbitrary name.
    ///
    /// The region is not added to any table's catalog.
    pub fn plant_region_load(&self, server: &ServerDescriptor, region_name: &[u8]) -> Result<()> {
        let mut state = self.state.lock()?;
        let load = state
            .servers
            .get_mut(server)
            .ok_or_else(|| ConvergeError::ServerNotFound(server.server_name()))?;
        load.regions_load
            .insert(region_name.to_vec(), RegionLoad::new(region_name));
        Ok(())
    }

    /// Server currently reporting the region, without advancing the clock.
    pub fn hosting_server(&self, region: &RegionDescriptor) -> Result<Option<ServerDescriptor>> {
        let state = self.state.lock()?;
        Ok(state.hosting_server(region.region_name()))
    }

    /// Number of move commands received, including dropped ones.
    pub fn move_requests(&self) -> Result<u64> {
        Ok(self.state.lock()?.move_requests)
    }

    /// Number of split commands accepted.
    pub fn split_requests(&self) -> Result<u64> {
        Ok(self.state.lock()?.split_requests)
    }

    pub fn balancer_running(&self) -> Result<bool> {
        Ok(self.state.lock()?.balancer_running)
    }

    /// Current logical time.
    pub fn tick(&self) -> Result<u64> {
        Ok(self.state.lock()?.tick)
    }

    /// Makes the next `count` status calls fail.
    pub fn fail_next_status_calls(&self, count: u32) -> Result<()> {
        self.state.lock()?.failing_status_left = count;
        Ok(())
    }
}

impl ClusterAdminClient for InMemoryCluster {
    fn table_exists(&self, table: &str) -> Result<bool> {
        let mut state = self.state.lock()?;
        state.observe();
        Ok(state.tables.contains_key(table))
    }

    fn is_table_enabled(&self, table: &str) -> Result<bool> {
        let mut state = self.state.lock()?;
        state.observe();
        Ok(state.table(table)?.mode == TableMode::Enabled)
    }

    fn is_table_disabled(&self, table: &str) -> Result<bool> {
        let mut state = self.state.lock()?;
        state.observe();
        Ok(state.table(table)?.mode == TableMode::Disabled)
    }

    fn split(&self, table: &str, split_point: &[u8]) -> Result<()> {
        let mut state = self.state.lock()?;
        let entry = state.table(table)?;
        if entry.mode != TableMode::Enabled {
            return Err(ConvergeError::TableNotEnabled(table.to_string()));
        }
        if split_point.is_empty() {
            return Err(ConvergeError::InvalidSplitPoint(
                table.to_string(),
                "split point must not be empty".to_string(),
            ));
        }
        let parent = entry
            .regions
            .iter()
            .find(|region| region.contains_key(split_point))
            .cloned()
            .ok_or_else(|| {
                ConvergeError::InvalidSplitPoint(
                    table.to_string(),
                    "no region contains the split point".to_string(),
                )
            })?;
        if parent.start_key() == split_point {
            return Err(ConvergeError::InvalidSplitPoint(
                table.to_string(),
                "split point is already a region boundary".to_string(),
            ));
        }

        state.split_requests += 1;
        let Some(delay) = self.config.split_delay else {
            debug!("split of '{}' accepted but will never land", parent);
            return Ok(());
        };

        let lower_id = state.allocate_region_id();
        let upper_id = state.allocate_region_id();
        let daughters = [
            RegionDescriptor::for_range(table, parent.start_key(), split_point, lower_id),
            RegionDescriptor::for_range(table, split_point, parent.end_key(), upper_id),
        ];
        state.schedule(
            delay,
            Change::Split {
                table: table.to_string(),
                parent,
                daughters,
            },
        );
        Ok(())
    }

    fn move_region(&self, encoded_region_name: &str, destination: &ServerDescriptor) -> Result<()> {
        let mut state = self.state.lock()?;
        let region = state
            .catalog_region_by_encoded_name(encoded_region_name)
            .ok_or_else(|| ConvergeError::RegionNotFound(encoded_region_name.to_string()))?;
        if !state.servers.contains_key(destination) {
            return Err(ConvergeError::ServerNotFound(destination.server_name()));
        }

        state.move_requests += 1;
        if state.dropped_moves_left > 0 {
            state.dropped_moves_left -= 1;
            debug!("dropping move of '{}' to {}", region, destination);
            return Ok(());
        }
        if self.config.refusing_servers.contains(destination) {
            debug!("{} refuses move of '{}'", destination, region);
            return Ok(());
        }

        state.schedule(
            self.config.move_delay,
            Change::Move {
                region,
                destination: destination.clone(),
            },
        );
        Ok(())
    }

    fn cluster_status(&self) -> Result<ClusterStatus> {
        let mut state = self.state.lock()?;
        if state.failing_status_left > 0 {
            state.failing_status_left -= 1;
            return Err(ConvergeError::Rpc(
                "cluster status call failed: connection reset".to_string(),
            ));
        }
        state.observe();
        let servers = state
            .servers
            .iter()
            .filter(|(server, _)| !state.hidden_servers.contains(*server))
            .map(|(server, load)| (server.clone(), load.clone()))
            .collect();
        Ok(ClusterStatus { servers })
    }

    fn table_regions(&self, table: &str) -> Result<Vec<RegionDescriptor>> {
        let mut state = self.state.lock()?;
        state.observe();
        Ok(state.table(table)?.regions.clone())
    }

    fn set_balancer_running(&self, running: bool, _synchronous: bool) -> Result<bool> {
        let mut state = self.state.lock()?;
        let previous = state.balancer_running;
        state.balancer_running = running;
        Ok(previous)
    }

    fn enable_table(&self, table: &str) -> Result<()> {
        let mut state = self.state.lock()?;
        if state.table(table)?.mode != TableMode::Disabled {
            return Err(ConvergeError::TableNotDisabled(table.to_string()));
        }
        if let Some(entry) = state.tables.get_mut(table) {
            entry.mode = TableMode::Enabling;
        }
        state.schedule(
            self.config.state_delay,
            Change::Mode {
                table: table.to_string(),
                mode: TableMode::Enabled,
            },
        );
        Ok(())
    }

    fn disable_table(&self, table: &str) -> Result<()> {
        let mut state = self.state.lock()?;
        if state.table(table)?.mode != TableMode::Enabled {
            return Err(ConvergeError::TableNotEnabled(table.to_string()));
        }
        if let Some(entry) = state.tables.get_mut(table) {
            entry.mode = TableMode::Disabling;
        }
        state.schedule(
            self.config.state_delay,
            Change::Mode {
                table: table.to_string(),
                mode: TableMode::Disabled,
            },
        );
        Ok(())
    }

    fn delete_table(&self, table: &str) -> Result<()> {
        let mut state = self.state.lock()?;
        if state.table(table)?.mode != TableMode::Disabled {
            return Err(ConvergeError::TableNotDisabled(table.to_string()));
        }
        if let Some(entry) = state.tables.get_mut(table) {
            entry.mode = TableMode::Deleting;
        }
        state.schedule(
            self.config.state_delay,
            Change::Delete {
                table: table.to_string(),
            },
        );
        Ok(())
    }
}
