use crate::admin::ClusterAdminClient;
use crate::core::Result;
use log::info;

/// Switches the cluster-wide balancer.
///
/// Setting the value it already has changes nothing, and the call still
/// reports the true previous value. Whoever flips the balancer must put the
/// previous value back when done.
#[derive(Clone, Copy)]
pub struct BalancerToggle<'a> {
    admin: &'a dyn ClusterAdminClient,
}

impl<'a> BalancerToggle<'a> {
    pub fn new(admin: &'a dyn ClusterAdminClient) -> Self {
        Self { admin }
    }

    /// Sets the balancer to `enable` and returns its previous state.
    pub fn toggle_balancer(&self, enable: bool) -> Result<bool> {
        let previous = self.admin.set_balancer_running(enable, true)?;
        if previous != enable {
            info!("balancer switched from {} to {}", previous, enable);
        }
        Ok(previous)
    }

    /// Puts the balancer back to a value returned by an earlier toggle.
    pub fn restore(&self, previous: bool) -> Result<()> {
        self.toggle_balancer(previous).map(|_| ())
    }
}
