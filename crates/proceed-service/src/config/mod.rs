//! Machine-configuration aggregates and their parameter trees.

pub mod service;
pub mod tree;

pub use service::{ConfigService, MACHINE_CONFIG_COLLECTION};
