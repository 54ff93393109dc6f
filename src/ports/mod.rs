//! Port traits at the I/O seams of the core.

pub mod config_port;
pub mod data_port;
pub mod report_port;
