//! Catalog Definitions
//!
//! Static game data as it appears in TOML (Raw*) and the resolved form
//! seeded into the store. Duplicate materials within a level or quest are
//! merged on resolve.

use serde::{Deserialize, Serialize};

// ============================================================================
// Raw TOML Structures
// ============================================================================

/// Raw material entry, keyed by material name
#[derive(Debug, Clone, Deserialize)]
pub struct RawMaterial {
    pub image: String,
}

/// A (material, quantity) pair as written in TOML
#[derive(Debug, Clone, Deserialize)]
pub struct RawCost {
    pub material: String,
    pub quantity: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawLevel {
    pub level: u32,
    #[serde(default)]
    pub costs: Vec<RawCost>,
}

/// Raw module definition, keyed by module name
#[derive(Debug, Clone, Deserialize)]
pub struct RawModuleDefinition {
    #[serde(default)]
    pub levels: Vec<RawLevel>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawQuest {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub requirements: Vec<RawCost>,
}

/// Raw trader definition, keyed by a slug
#[derive(Debug, Clone, Deserialize)]
pub struct RawTraderDefinition {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub quests: Vec<RawQuest>,
}

// ============================================================================
// Resolved Structures
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cost {
    pub material: String,
    pub quantity: i64,
}

#[derive(Debug, Clone)]
pub struct LevelDefinition {
    pub level: i64,
    pub costs: Vec<Cost>,
}

#[derive(Debug, Clone)]
pub struct ModuleDefinition {
    pub name: String,
    /// Sorted by level, one entry per level
    pub levels: Vec<LevelDefinition>,
}

impl ModuleDefinition {
    pub fn from_raw(name: &str, raw: &RawModuleDefinition) -> Self {
        let mut levels: Vec<LevelDefinition> = Vec::new();
        for raw_level in &raw.levels {
            let level = i64::from(raw_level.level);
            match levels.iter_mut().find(|l| l.level == level) {
                Some(existing) => merge_costs(&mut existing.costs, &raw_level.costs),
                None => {
                    let mut costs = Vec::new();
                    merge_costs(&mut costs, &raw_level.costs);
                    levels.push(LevelDefinition { level, costs });
                }
            }
        }
        levels.sort_by_key(|l| l.level);

        Self {
            name: name.to_string(),
            levels,
        }
    }

    /// Highest level with at least one cost, 0 if none
    pub fn max_level(&self) -> i64 {
        self.levels
            .iter()
            .filter(|l| !l.costs.is_empty())
            .map(|l| l.level)
            .max()
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone)]
pub struct QuestDefinition {
    pub id: i64,
    pub name: String,
    pub requirements: Vec<Cost>,
}

#[derive(Debug, Clone)]
pub struct TraderDefinition {
    pub id: i64,
    pub slug: String,
    pub name: String,
    pub hidden: bool,
    pub quests: Vec<QuestDefinition>,
}

impl TraderDefinition {
    pub fn from_raw(slug: &str, raw: &RawTraderDefinition) -> Self {
        Self {
            id: raw.id,
            slug: slug.to_string(),
            name: raw.name.clone(),
            hidden: raw.hidden,
            quests: raw
                .quests
                .iter()
                .map(|q| {
                    let mut requirements = Vec::new();
                    merge_costs(&mut requirements, &q.requirements);
                    QuestDefinition {
                        id: q.id,
                        name: q.name.clone(),
                        requirements,
                    }
                })
                .collect(),
        }
    }
}

/// Append raw costs, summing quantities of materials already present
fn merge_costs(into: &mut Vec<Cost>, raw: &[RawCost]) {
    for cost in raw {
        let quantity = i64::from(cost.quantity);
        match into.iter_mut().find(|c| c.material == cost.material) {
            Some(existing) => existing.quantity += quantity,
            None => into.push(Cost {
                material: cost.material.clone(),
                quantity,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_parse_module() {
        let toml_str = r#"
            [Workshop]
            [[Workshop.levels]]
            level = 2
            costs = [{ material = "Wood", quantity = 15 }, { material = "Iron", quantity = 5 }]

            [[Workshop.levels]]
            level = 1
            costs = [{ material = "Wood", quantity = 10 }]
        "#;

        let parsed: HashMap<String, RawModuleDefinition> = toml::from_str(toml_str).unwrap();
        let module = ModuleDefinition::from_raw("Workshop", &parsed["Workshop"]);

        assert_eq!(module.levels.len(), 2);
        assert_eq!(module.levels[0].level, 1);
        assert_eq!(module.levels[1].costs.len(), 2);
        assert_eq!(module.max_level(), 2);
    }

    #[test]
    fn test_duplicate_costs_are_merged() {
        let toml_str = r#"
            [Generator]
            [[Generator.levels]]
            level = 1
            costs = [{ material = "Wire", quantity = 2 }, { material = "Wire", quantity = 3 }]

            [[Generator.levels]]
            level = 1
            costs = [{ material = "Wire", quantity = 1 }, { material = "Fuse", quantity = 1 }]
        "#;

        let parsed: HashMap<String, RawModuleDefinition> = toml::from_str(toml_str).unwrap();
        let module = ModuleDefinition::from_raw("Generator", &parsed["Generator"]);

        assert_eq!(module.levels.len(), 1);
        assert_eq!(
            module.levels[0].costs,
            vec![
                Cost {
                    material: "Wire".to_string(),
                    quantity: 6
                },
                Cost {
                    material: "Fuse".to_string(),
                    quantity: 1
                },
            ]
        );
    }

    #[test]
    fn test_negative_quantity_is_rejected() {
        let toml_str = r#"
            [Workshop]
            [[Workshop.levels]]
            level = 1
            costs = [{ material = "Wood", quantity = -3 }]
        "#;

        let parsed: Result<HashMap<String, RawModuleDefinition>, _> = toml::from_str(toml_str);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_trader_defaults() {
        let toml_str = r#"
            [mechanic]
            id = 1
            name = "Mechanic"

            [[mechanic.quests]]
            id = 10
            name = "Loose Ends"
            requirements = [{ material = "Bolts", quantity = 3 }]
        "#;

        let parsed: HashMap<String, RawTraderDefinition> = toml::from_str(toml_str).unwrap();
        let trader = TraderDefinition::from_raw("mechanic", &parsed["mechanic"]);

        assert!(!trader.hidden);
        assert_eq!(trader.quests.len(), 1);
        assert_eq!(trader.quests[0].requirements[0].quantity, 3);
    }
}
