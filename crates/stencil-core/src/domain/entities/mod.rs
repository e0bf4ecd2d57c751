pub mod operation;
pub mod plan;

pub use crate::domain::DomainError;
pub use operation::{BackupRecord, Operation};
pub use plan::BatchPlan;
