//! Catalog
//!
//! Static game data (materials, module levels, traders and their quests)
//! defined in TOML and seeded into the store at startup.

pub mod definition;
pub mod registry;

pub use definition::Cost;
pub use registry::Catalog;
