use crate::admin::ClusterAdminClient;
use crate::core::{ConvergeError, OperationOutcome, Probe, Result, StateDiagnostic, TableState};
use crate::poller::ConvergencePoller;
use log::{info, warn};

/// Waits for tables to reach enabled, disabled or deleted state.
///
/// Table state commands are assumed to be delivered once; nothing is re-sent.
#[derive(Clone, Copy)]
pub struct StateVerifier<'a> {
    admin: &'a dyn ClusterAdminClient,
    poller: &'a ConvergencePoller,
}

impl<'a> StateVerifier<'a> {
    pub fn new(admin: &'a dyn ClusterAdminClient, poller: &'a ConvergencePoller) -> Self {
        Self { admin, poller }
    }

    pub fn verify_enabled(&self, table: &str) -> Result<OperationOutcome<StateDiagnostic>> {
        self.wait_for(table, TableState::Enabled, "is_table_enabled", true, || {
            self.admin.is_table_enabled(table)
        })
    }

    pub fn verify_disabled(&self, table: &str) -> Result<OperationOutcome<StateDiagnostic>> {
        self.wait_for(table, TableState::Disabled, "is_table_disabled", true, || {
            self.admin.is_table_disabled(table)
        })
    }

    pub fn verify_deleted(&self, table: &str) -> Result<OperationOutcome<StateDiagnostic>> {
        self.wait_for(table, TableState::Deleted, "table_exists", false, || {
            self.admin.table_exists(table)
        })
    }

    /// Polls `ask` until it answers `expected`.
    fn wait_for<F>(
        &self,
        table: &str,
        wanted: TableState,
        query: &'static str,
        expected: bool,
        mut ask: F,
    ) -> Result<OperationOutcome<StateDiagnostic>>
    where
        F: FnMut() -> Result<bool>,
    {
        let tag = format!("verify_{}:{}", wanted, table);
        self.poller.wait_until(&tag, || {
            let answer = ask()?;
            if answer == expected {
                Ok(Probe::Satisfied)
            } else {
                Ok(Probe::Unsatisfied(StateDiagnostic {
                    table: table.to_string(),
                    wanted,
                    query,
                    answer,
                }))
            }
        })
    }

    /// Checks that `table` exists and is enabled.
    pub fn validate_table(&self, table: &str) -> Result<()> {
        if !self.admin.table_exists(table)? {
            return Err(ConvergeError::TableNotFound(table.to_string()));
        }
        if !self.admin.is_table_enabled(table)? {
            return Err(ConvergeError::InvalidTable(
                table.to_string(),
                "table is not enabled".to_string(),
            ));
        }
        Ok(())
    }

    /// Enables `table` and waits for it; an already-enabled table is fine.
    pub fn enable_table(&self, table: &str) -> Result<OperationOutcome<StateDiagnostic>> {
        match self.admin.enable_table(table) {
            Ok(()) => {}
            Err(ConvergeError::TableNotDisabled(_)) => {
                info!("table '{}' is not disabled, skipping enable", table);
            }
            Err(err) => return Err(err),
        }
        self.verify_enabled(table)
    }

    /// Disables `table` and waits for it; an already-disabled table is fine.
    pub fn disable_table(&self, table: &str) -> Result<OperationOutcome<StateDiagnostic>> {
        match self.admin.disable_table(table) {
            Ok(()) => {}
            Err(ConvergeError::TableNotEnabled(_)) => {
                info!("table '{}' is not enabled, skipping disable", table);
            }
            Err(err) => return Err(err),
        }
        self.verify_disabled(table)
    }

    /// Disables and deletes `table` if it exists, waiting for each step.
    pub fn drop_table(&self, table: &str) -> Result<()> {
        if !self.admin.table_exists(table)? {
            return Ok(());
        }
        self.disable_table(table)?.into_result()?;
        self.admin.delete_table(table).inspect_err(|err| {
            warn!("delete of table '{}' failed: {}", table, err);
        })?;
        self.verify_deleted(table)?.into_result()?;
        info!("table '{}' dropped", table);
        Ok(())
    }
}
