//! Domain model types

pub mod review;
pub mod rules;

pub use review::ReviewConfig;
pub use rules::RuleConfig;
