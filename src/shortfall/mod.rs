//! Shortfall Aggregation
//!
//! Need/have/left per material for module upgrades, next-level upgrades
//! and open trader quests.

pub mod aggregate;
pub mod report;

pub use aggregate::{costs_between, quest_costs};
