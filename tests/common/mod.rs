#![allow(dead_code)]

use cluster_converge::{
    ClusterContext, InMemoryCluster, InMemoryClusterConfig, RetryBudget, ServerDescriptor, Sleeper,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Records requested sleeps instead of blocking.
#[derive(Default)]
pub struct RecordingSleeper {
    naps: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn count(&self) -> usize {
        self.naps.lock().unwrap().len()
    }

    pub fn total(&self) -> Duration {
        self.naps.lock().unwrap().iter().sum()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.naps.lock().unwrap().push(duration);
    }
}

pub fn rs1() -> ServerDescriptor {
    ServerDescriptor::new("rs1.example.com", 16020, 1_700_000_000)
}

pub fn rs2() -> ServerDescriptor {
    ServerDescriptor::new("rs2.example.com", 16020, 1_700_000_001)
}

/// Two servers, `rs1` sorted before `rs2`.
pub fn two_servers(
    config: InMemoryClusterConfig,
) -> (Arc<InMemoryCluster>, ServerDescriptor, ServerDescriptor) {
    let cluster = Arc::new(InMemoryCluster::new(config));
    let a = rs1();
    let b = rs2();
    cluster.add_server(a.host(), a.port(), a.start_code()).unwrap();
    cluster.add_server(b.host(), b.port(), b.start_code()).unwrap();
    (cluster, a, b)
}

pub fn context(
    cluster: &Arc<InMemoryCluster>,
    max_iterations: u32,
) -> (ClusterContext, Arc<RecordingSleeper>) {
    let sleeper = Arc::new(RecordingSleeper::default());
    let budget = RetryBudget::new(max_iterations, Duration::from_millis(100)).unwrap();
    let ctx = ClusterContext::new(cluster.clone(), budget)
        .unwrap()
        .with_sleeper(sleeper.clone());
    (ctx, sleeper)
}
