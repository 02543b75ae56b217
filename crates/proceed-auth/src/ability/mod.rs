//! Ability implementations.

pub mod allow;
pub mod rules;

pub use allow::AllowAll;
pub use rules::{Rule, RuleAbility};
