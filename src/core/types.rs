use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Identity of a single region of a table.
///
/// Two descriptors are the same region exactly when their region names are
/// byte-for-byte equal. The encoded name is a derived short form used to
/// address the region in admin commands and plays no part in identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionDescriptor {
    region_name: Vec<u8>,
    encoded_name: String,
    table: String,
    start_key: Vec<u8>,
    end_key: Vec<u8>,
}

impl RegionDescriptor {
    /// Creates a descriptor from already-known parts.
    pub fn new(
        region_name: impl Into<Vec<u8>>,
        encoded_name: impl Into<String>,
        table: impl Into<String>,
        start_key: impl Into<Vec<u8>>,
        end_key: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            region_name: region_name.into(),
            encoded_name: encoded_name.into(),
            table: table.into(),
            start_key: start_key.into(),
            end_key: end_key.into(),
        }
    }

    /// Builds a descriptor in the `table,start_key,region_id.encoded.` naming scheme.
    pub fn for_range(table: &str, start_key: &[u8], end_key: &[u8], region_id: u64) -> Self {
        let encoded_name = encode_region_name(table, start_key, region_id);
        let mut region_name = Vec::with_capacity(table.len() + start_key.len() + 48);
        region_name.extend_from_slice(table.as_bytes());
        region_name.push(b',');
        region_name.extend_from_slice(start_key);
        region_name.push(b',');
        region_name.extend_from_slice(region_id.to_string().as_bytes());
        region_name.push(b'.');
        region_name.extend_from_slice(encoded_name.as_bytes());
        region_name.push(b'.');

        Self {
            region_name,
            encoded_name,
            table: table.to_string(),
            start_key: start_key.to_vec(),
            end_key: end_key.to_vec(),
        }
    }

    pub fn region_name(&self) -> &[u8] {
        &self.region_name
    }

    /// Lossy UTF-8 rendering of the region name, for diagnostics only.
    pub fn region_name_string(&self) -> String {
        String::from_utf8_lossy(&self.region_name).into_owned()
    }

    pub fn encoded_name(&self) -> &str {
        &self.encoded_name
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn start_key(&self) -> &[u8] {
        &self.start_key
    }

    /// Exclusive end key; empty means the region extends to the end of the table.
    pub fn end_key(&self) -> &[u8] {
        &self.end_key
    }

    /// Returns true if `key` falls inside `[start_key, end_key)`.
    pub fn contains_key(&self, key: &[u8]) -> bool {
        key >= self.start_key.as_slice()
            && (self.end_key.is_empty() || key < self.end_key.as_slice())
    }

    /// Byte-exact comparison against a reported region name.
    pub fn is_named(&self, region_name: &[u8]) -> bool {
        self.region_name == region_name
    }
}

impl PartialEq for RegionDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.region_name == other.region_name
    }
}

impl Eq for RegionDescriptor {}

impl Hash for RegionDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.region_name.hash(state);
    }
}

impl PartialOrd for RegionDescriptor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RegionDescriptor {
    fn cmp(&self, other: &Self) -> Ordering {
        self.region_name.cmp(&other.region_name)
    }
}

impl fmt::Display for RegionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.region_name_string())
    }
}

/// Computes the encoded region name using FNV-1a over the region's identity parts.
pub fn encode_region_name(table: &str, start_key: &[u8], region_id: u64) -> String {
    let mut hash = 14695981039346656037u64;
    for byte in table.as_bytes() {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(1099511628211);
    }
    hash ^= 0xff;
    hash = hash.wrapping_mul(1099511628211);
    for byte in start_key {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(1099511628211);
    }
    hash ^= 0xff;
    hash = hash.wrapping_mul(1099511628211);
    for byte in region_id.to_be_bytes() {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(1099511628211);
    }
    format!("{:016x}", hash)
}

/// Identity of a region server process.
///
/// Ordered by host, then port, then start code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ServerDescriptor {
    host: String,
    port: u16,
    start_code: u64,
}

impl ServerDescriptor {
    pub fn new(host: impl Into<String>, port: u16, start_code: u64) -> Self {
        Self {
            host: host.into(),
            port,
            start_code,
        }
    }

    /// Parses a `host,port,startcode` server name.
    pub fn parse(server_name: &str) -> Option<Self> {
        let mut parts = server_name.split(',');
        let host = parts.next()?.trim();
        let port = parts.next()?.trim().parse().ok()?;
        let start_code = parts.next()?.trim().parse().ok()?;
        if host.is_empty() || parts.next().is_some() {
            return None;
        }
        Some(Self::new(host, port, start_code))
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn start_code(&self) -> u64 {
        self.start_code
    }

    /// Canonical `host,port,startcode` name used when addressing the server.
    pub fn server_name(&self) -> String {
        format!("{},{},{}", self.host, self.port, self.start_code)
    }
}

impl fmt::Display for ServerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.host, self.port, self.start_code)
    }
}

/// A server's self-reported load for one hosted region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RegionLoad {
    pub region_name: Vec<u8>,
    pub stores: u32,
    pub store_file_size_mb: u64,
    pub read_request_count: u64,
    pub write_request_count: u64,
}

impl RegionLoad {
    /// Creates an empty load report for the named region.
    pub fn new(region_name: impl Into<Vec<u8>>) -> Self {
        Self {
            region_name: region_name.into(),
            ..Self::default()
        }
    }
}

/// All region loads reported by one server, keyed by region name bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ServerLoad {
    pub regions_load: BTreeMap<Vec<u8>, RegionLoad>,
}

impl ServerLoad {
    pub fn region_names(&self) -> impl Iterator<Item = &[u8]> {
        self.regions_load.keys().map(|name| name.as_slice())
    }

    pub fn region_count(&self) -> usize {
        self.regions_load.len()
    }

    /// Byte-exact lookup of one region's load.
    pub fn load_for(&self, region_name: &[u8]) -> Option<&RegionLoad> {
        self.regions_load.get(region_name)
    }
}

/// Point-in-time view of every live server and the regions it reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ClusterStatus {
    pub servers: BTreeMap<ServerDescriptor, ServerLoad>,
}

impl ClusterStatus {
    /// Live servers in their total order.
    pub fn server_names(&self) -> Vec<ServerDescriptor> {
        self.servers.keys().cloned().collect()
    }

    pub fn load(&self, server: &ServerDescriptor) -> Option<&ServerLoad> {
        self.servers.get(server)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn region_identity_ignores_encoded_name() {
        let whole_table = |name: &[u8], encoded: &str| {
            RegionDescriptor::new(name.to_vec(), encoded, "t", Vec::<u8>::new(), Vec::<u8>::new())
        };
        let a = whole_table(b"t,,1.aaaa.", "aaaa");
        let b = whole_table(b"t,,1.aaaa.", "bbbb");
        let c = whole_table(b"t,,2.aaaa.", "aaaa");

        assert_eq!(a, b);
        assert_ne!(a, c);

        let set: HashSet<_> = [a, b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn for_range_embeds_encoded_name() {
        let region = RegionDescriptor::for_range("users", b"m", b"", 7);
        let name = region.region_name_string();
        assert!(name.starts_with("users,m,7."));
        assert!(name.ends_with(&format!("{}.", region.encoded_name())));
        assert_eq!(region.encoded_name().len(), 16);
    }

    #[test]
    fn contains_key_respects_open_end() {
        let head = RegionDescriptor::for_range("t", b"", b"m", 1);
        let tail = RegionDescriptor::for_range("t", b"m", b"", 2);

        assert!(head.contains_key(b"a"));
        assert!(!head.contains_key(b"m"));
        assert!(tail.contains_key(b"m"));
        assert!(tail.contains_key(b"zzz"));
    }

    #[test]
    fn server_order_is_host_port_start_code() {
        let mut servers = vec![
            ServerDescriptor::new("rs2", 16020, 1),
            ServerDescriptor::new("rs1", 16021, 1),
            ServerDescriptor::new("rs1", 16020, 9),
            ServerDescriptor::new("rs1", 16020, 3),
        ];
        servers.sort();

        let names: Vec<String> = servers.iter().map(|s| s.server_name()).collect();
        assert_eq!(
            names,
            vec!["rs1,16020,3", "rs1,16020,9", "rs1,16021,1", "rs2,16020,1"]
        );
    }

    #[test]
    fn server_name_parses_back() {
        let server = ServerDescriptor::new("host-a", 60020, 1700000000);
        assert_eq!(ServerDescriptor::parse(&server.server_name()), Some(server));
        assert_eq!(ServerDescriptor::parse("host-a,notaport,1"), None);
        assert_eq!(ServerDescriptor::parse("host-a,1,2,3"), None);
    }
}
