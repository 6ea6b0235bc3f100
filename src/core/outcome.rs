use super::error::{ConvergeError, Result};
use super::types::ServerDescriptor;
use serde::Serialize;
use std::fmt;

/// Result of a single probe evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe<D> {
    /// The awaited condition holds.
    Satisfied,
    /// Not there yet; carries what was observed.
    Unsatisfied(D),
}

/// Final result of a convergence wait.
///
/// A timeout is a value, not a panic: callers decide whether it is fatal,
/// usually through [`OperationOutcome::into_result`].
#[must_use = "a timed out verification must be handled"]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationOutcome<D> {
    Converged {
        attempts: u32,
    },
    TimedOut {
        tag: String,
        attempts: u32,
        last_observed: D,
    },
}

impl<D> OperationOutcome<D> {
    pub fn is_converged(&self) -> bool {
        matches!(self, Self::Converged { .. })
    }

    /// Number of probe evaluations performed.
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Converged { attempts } | Self::TimedOut { attempts, .. } => *attempts,
        }
    }

    /// The last observed state, if the wait timed out.
    pub fn last_observed(&self) -> Option<&D> {
        match self {
            Self::Converged { .. } => None,
            Self::TimedOut { last_observed, .. } => Some(last_observed),
        }
    }

    pub fn map_observed<E>(self, f: impl FnOnce(D) -> E) -> OperationOutcome<E> {
        match self {
            Self::Converged { attempts } => OperationOutcome::Converged { attempts },
            Self::TimedOut {
                tag,
                attempts,
                last_observed,
            } => OperationOutcome::TimedOut {
                tag,
                attempts,
                last_observed: f(last_observed),
            },
        }
    }
}

impl<D: fmt::Display> OperationOutcome<D> {
    /// Turns a timeout into [`ConvergeError::ConvergenceTimeout`].
    ///
    /// Returns the attempt count on convergence.
    pub fn into_result(self) -> Result<u32> {
        match self {
            Self::Converged { attempts } => Ok(attempts),
            Self::TimedOut {
                tag,
                attempts,
                last_observed,
            } => Err(ConvergeError::ConvergenceTimeout {
                tag,
                attempts,
                detail: last_observed.to_string(),
            }),
        }
    }
}

/// Region count mismatch observed while waiting for a split.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SplitDiagnostic {
    pub table: String,
    pub expected: usize,
    pub actual: usize,
}

impl fmt::Display for SplitDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "table '{}' expected {} regions, observed {}",
            self.table, self.expected, self.actual
        )
    }
}

/// What the target server reported while a region move was pending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MoveDiagnostic {
    pub region: String,
    pub target: ServerDescriptor,
    /// Region names last reported by the target, lossily decoded.
    pub observed_on_target: Vec<String>,
}

impl fmt::Display for MoveDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "region '{}' not reported by {}; target reports [{}]",
            self.region,
            self.target,
            self.observed_on_target.join(", ")
        )
    }
}

/// Table state a verifier was waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TableState {
    Enabled,
    Disabled,
    Deleted,
}

impl fmt::Display for TableState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TableState::Enabled => "enabled",
            TableState::Disabled => "disabled",
            TableState::Deleted => "deleted",
        };
        f.write_str(name)
    }
}

/// Table state wanted versus the last answer the cluster gave.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateDiagnostic {
    pub table: String,
    pub wanted: TableState,
    /// Admin query that was polled, e.g. `is_table_enabled`.
    pub query: &'static str,
    /// Its answer on the last poll.
    pub answer: bool,
}

impl fmt::Display for StateDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "table '{}' never became {}; last {} answered {}",
            self.table, self.wanted, self.query, self.answer
        )
    }
}
