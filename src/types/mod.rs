//! Type definitions

pub mod customer;
pub mod device;
pub mod import;
pub mod import_job;
pub mod job;
pub mod measurement;
pub mod messages;
pub mod stats;

pub use customer::*;
pub use device::*;
pub use import::*;
pub use import_job::*;
pub use job::*;
pub use measurement::*;
pub use messages::*;
pub use stats::*;
