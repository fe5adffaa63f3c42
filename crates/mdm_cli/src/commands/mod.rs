//! CLI command implementations.

pub mod device;
pub mod query;
pub mod serve;
