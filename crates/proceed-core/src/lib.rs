//! # proceed-core
//!
//! Core crate for the PROCEED folder and machine-configuration hierarchy.
//! Contains the collaborator traits (persistence store, permission oracle,
//! leaf removal), configuration schemas, typed identifiers, and the unified
//! error system.
//!
//! This crate has **no** internal dependencies on other PROCEED crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
