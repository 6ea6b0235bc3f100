use crate::admin::ClusterAdminClient;
use crate::core::{
    MoveDiagnostic, OperationOutcome, Probe, RegionDescriptor, Result, ServerDescriptor,
};
use crate::poller::ConvergencePoller;
use log::info;

/// Drives a region move until the target server reports the region.
///
/// Move commands have no acknowledgement and may be dropped by the cluster,
/// so every unsatisfied probe re-issues the move before the next sleep. The
/// number of re-issues is bounded by the retry budget.
#[derive(Clone, Copy)]
pub struct MoveVerifier<'a> {
    admin: &'a dyn ClusterAdminClient,
    poller: &'a ConvergencePoller,
}

impl<'a> MoveVerifier<'a> {
    pub fn new(admin: &'a dyn ClusterAdminClient, poller: &'a ConvergencePoller) -> Self {
        Self { admin, poller }
    }

    /// Waits until `target` reports a region whose name equals `region`'s
    /// name byte for byte, re-sending the move on every miss.
    pub fn verify_move(
        &self,
        region: &RegionDescriptor,
        target: &ServerDescriptor,
    ) -> Result<OperationOutcome<MoveDiagnostic>> {
        let tag = format!("verify_move:{}", region.encoded_name());
        self.poller.wait_until(&tag, || {
            let status = self.admin.cluster_status()?;
            // A target missing from the report is treated as hosting nothing.
            let reported: Vec<&[u8]> = status
                .load(target)
                .map(|load| load.region_names().collect())
                .unwrap_or_default();

            if reported.iter().any(|name| region.is_named(name)) {
                return Ok(Probe::Satisfied);
            }

            self.admin.move_region(region.encoded_name(), target)?;
            Ok(Probe::Unsatisfied(MoveDiagnostic {
                region: region.region_name_string(),
                target: target.clone(),
                observed_on_target: reported
                    .iter()
                    .map(|name| String::from_utf8_lossy(name).into_owned())
                    .collect(),
            }))
        })
    }

    /// Moves `region` to `target` and waits for the target to report it.
    pub fn move_region(
        &self,
        region: &RegionDescriptor,
        target: &ServerDescriptor,
    ) -> Result<OperationOutcome<MoveDiagnostic>> {
        self.admin.move_region(region.encoded_name(), target)?;
        info!("move requested for '{}' to {}", region, target);
        self.verify_move(region, target)
    }
}
