use crate::admin::ClusterAdminClient;
use crate::core::{OperationOutcome, Probe, Result, SplitDiagnostic};
use crate::placement::PlacementObserver;
use crate::poller::ConvergencePoller;
use log::info;

/// Drives a region split to the point where servers report the new regions.
///
/// Right after a split the catalog and client-side location caches are
/// stale, so completion is judged only from server-reported region loads.
#[derive(Clone, Copy)]
pub struct SplitVerifier<'a> {
    admin: &'a dyn ClusterAdminClient,
    poller: &'a ConvergencePoller,
}

impl<'a> SplitVerifier<'a> {
    pub fn new(admin: &'a dyn ClusterAdminClient, poller: &'a ConvergencePoller) -> Self {
        Self { admin, poller }
    }

    /// Waits until servers report exactly `expected_region_count` regions of `table`.
    pub fn verify_split(
        &self,
        table: &str,
        expected_region_count: usize,
    ) -> Result<OperationOutcome<SplitDiagnostic>> {
        let observer = PlacementObserver::new(self.admin);
        let tag = format!("verify_split:{}", table);
        self.poller.wait_until(&tag, || {
            let actual = observer.actual_placement(table)?.region_count();
            if actual == expected_region_count {
                Ok(Probe::Satisfied)
            } else {
                Ok(Probe::Unsatisfied(SplitDiagnostic {
                    table: table.to_string(),
                    expected: expected_region_count,
                    actual,
                }))
            }
        })
    }

    /// Splits `table` at `split_point` and waits for one additional region.
    pub fn split_table(
        &self,
        table: &str,
        split_point: &[u8],
    ) -> Result<OperationOutcome<SplitDiagnostic>> {
        let before = PlacementObserver::new(self.admin).region_count(table)?;
        self.admin.split(table, split_point)?;
        info!(
            "split requested for '{}' at '{}', expecting {} regions",
            table,
            String::from_utf8_lossy(split_point),
            before + 1
        );
        self.verify_split(table, before + 1)
    }
}
