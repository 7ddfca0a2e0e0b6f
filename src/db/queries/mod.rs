//! Database queries

pub mod customer;
pub mod device;
pub mod import_log;
pub mod job;
pub mod measurement;
pub mod report;
pub mod stats;
