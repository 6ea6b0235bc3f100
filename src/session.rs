use crate::context::ClusterContext;
use crate::core::Result;
use log::{info, warn};

/// Setup and teardown scope for a run of manual placement operations.
///
/// Beginning a session pauses the balancer so it cannot undo manual moves.
/// Finishing it drops every tracked table and puts the balancer back the
/// way it was. A session dropped without `finish` still restores the
/// balancer, but leaves tracked tables in place.
pub struct ClusterSession<'a> {
    ctx: &'a ClusterContext,
    previous_balancer: bool,
    tables: Vec<String>,
    finished: bool,
}

impl<'a> ClusterSession<'a> {
    pub fn begin(ctx: &'a ClusterContext) -> Result<Self> {
        let previous_balancer = ctx.balancer().toggle_balancer(false)?;
        info!(
            "cluster session started, balancer paused (was running: {})",
            previous_balancer
        );
        Ok(Self {
            ctx,
            previous_balancer,
            tables: Vec::new(),
            finished: false,
        })
    }

    pub fn context(&self) -> &'a ClusterContext {
        self.ctx
    }

    /// Balancer state observed when the session began.
    pub fn previous_balancer(&self) -> bool {
        self.previous_balancer
    }

    /// Registers a table to drop on `finish`. Registering twice is a no-op.
    pub fn track_table(&mut self, table: impl Into<String>) {
        let table = table.into();
        if !self.tables.contains(&table) {
            self.tables.push(table);
        }
    }

    pub fn tracked_tables(&self) -> &[String] {
        &self.tables
    }

    /// Drops tracked tables in registration order, then restores the balancer.
    ///
    /// Every step is attempted; the first error is returned.
    pub fn finish(mut self) -> Result<()> {
        self.finished = true;
        let mut first_error = None;

        for table in std::mem::take(&mut self.tables) {
            if let Err(err) = self.ctx.drop_table(&table) {
                warn!("teardown could not drop table '{}': {}", table, err);
                if first_error.is_none() {
                    first_error = Some(err);
                }
            }
        }

        if let Err(err) = self.ctx.balancer().restore(self.previous_balancer) {
            warn!("teardown could not restore balancer: {}", err);
            if first_error.is_none() {
                first_error = Some(err);
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl Drop for ClusterSession<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if let Err(err) = self.ctx.balancer().restore(self.previous_balancer) {
            warn!("cluster session dropped, balancer restore failed: {}", err);
        }
    }
}
