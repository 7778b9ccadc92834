//! Domain model (resource names, entities, eviction policy, reports, errors).

pub mod entities;
pub mod errors;
pub mod names;
pub mod policy;
pub mod report;
pub mod state;

pub use entities::{Database, Instance, Page, Session};
pub use errors::{ControlPlaneError, ErrorKind, SweepError};
pub use names::{DatabaseName, InstanceName, NameError, ProjectId, ResourceName, SessionName};
pub use policy::{EvictionPolicy, Verdict};
pub use report::{LoopSummary, SweepReport};
pub use state::LoopState;
