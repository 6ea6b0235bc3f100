pub mod error;
pub mod outcome;
pub mod types;

pub use error::{ConvergeError, Result};
pub use outcome::{
    MoveDiagnostic, OperationOutcome, Probe, SplitDiagnostic, StateDiagnostic, TableState,
};
pub use types::{
    ClusterStatus, RegionDescriptor, RegionLoad, ServerDescriptor, ServerLoad, encode_region_name,
};
