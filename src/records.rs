//! Typed Store Records
//!
//! One struct per table row, plus the inventory and progress maps that
//! every query and transaction reads through.

use serde::Serialize;
use std::collections::HashMap;

/// Cost of one material at one level of a module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleRequirement {
    pub module_name: String,
    pub level: i64,
    pub item_name: String,
    pub item_image: String,
    pub quantity: i64,
}

/// A material the player holds
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InventoryEntry {
    pub item_name: String,
    pub item_image: String,
    pub have: i64,
}

/// Recorded level of a module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEntry {
    pub module_name: String,
    pub current_level: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trader {
    pub id: i64,
    pub name: String,
    pub is_hidden: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quest {
    pub id: i64,
    pub trader_id: i64,
    pub name: String,
    pub is_completed: bool,
}

/// Material needed to turn in a quest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestRequirement {
    pub quest_id: i64,
    pub item_name: String,
    pub item_image: String,
    pub quantity: i64,
}

// ============================================================================
// Lookup Maps
// ============================================================================

/// Inventory keyed by material name. Absent materials count as zero.
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    entries: HashMap<String, InventoryEntry>,
}

impl Inventory {
    pub fn new(entries: impl IntoIterator<Item = InventoryEntry>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|e| (e.item_name.clone(), e))
                .collect(),
        }
    }

    /// Quantity on hand, 0 when the material has no record
    pub fn have(&self, material: &str) -> i64 {
        self.entries.get(material).map_or(0, |e| e.have)
    }
}

/// Module levels keyed by module name. Absent modules are at level 0.
#[derive(Debug, Clone, Default)]
pub struct Progress {
    levels: HashMap<String, i64>,
}

impl Progress {
    pub fn new(entries: impl IntoIterator<Item = ProgressEntry>) -> Self {
        Self {
            levels: entries
                .into_iter()
                .map(|e| (e.module_name, e.current_level))
                .collect(),
        }
    }

    /// Current level, 0 when nothing is recorded
    pub fn level(&self, module: &str) -> i64 {
        self.levels.get(module).copied().unwrap_or(0)
    }

    /// Recorded modules, sorted by name
    pub fn recorded(&self) -> Vec<(&str, i64)> {
        let mut out: Vec<(&str, i64)> = self
            .levels
            .iter()
            .map(|(name, level)| (name.as_str(), *level))
            .collect();
        out.sort_by(|a, b| a.0.cmp(b.0));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_records_default_to_zero() {
        let inventory = Inventory::new(vec![InventoryEntry {
            item_name: "Wood".to_string(),
            item_image: "wood.png".to_string(),
            have: 20,
        }]);
        assert_eq!(inventory.have("Wood"), 20);
        assert_eq!(inventory.have("Iron"), 0);

        let progress = Progress::new(vec![ProgressEntry {
            module_name: "Workshop".to_string(),
            current_level: 2,
        }]);
        assert_eq!(progress.level("Workshop"), 2);
        assert_eq!(progress.level("Generator"), 0);
        assert_eq!(progress.recorded(), vec![("Workshop", 2)]);
    }
}
