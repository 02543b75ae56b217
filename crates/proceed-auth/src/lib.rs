//! # proceed-auth
//!
//! Permission oracles for the hierarchy core. Authentication and session
//! handling live outside this workspace; what arrives here is an already
//! resolved set of rules describing what the current subject may do.
//!
//! ## Modules
//!
//! - `ability`: rule-based and allow-all implementations of
//!   [`proceed_core::traits::Ability`]

pub mod ability;

pub use ability::{AllowAll, Rule, RuleAbility};
