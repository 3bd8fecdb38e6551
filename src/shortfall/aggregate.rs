//! Material Aggregation
//!
//! Pure grouped summation over store records. Every query reports
//! `need`, `have` and `left = max(0, need - have)` per material, sorted by
//! lower-cased material name.

use serde::Serialize;
use std::collections::{HashMap, HashSet};

use crate::catalog::Cost;
use crate::records::{Inventory, ModuleRequirement, Progress, Quest, QuestRequirement, Trader};

// ============================================================================
// Result Structures
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MaterialNeed {
    pub material: String,
    pub image: String,
    pub need: i64,
    pub have: i64,
    pub left: i64,
}

impl MaterialNeed {
    fn new(material: String, image: String, need: i64, inventory: &Inventory) -> Self {
        let have = inventory.have(&material);
        Self {
            material,
            image,
            need,
            have,
            left: (need - have).max(0),
        }
    }
}

/// One module level contributing to a next-level need
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NeedEntry {
    pub module: String,
    pub level: i64,
    pub quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NextLevelNeed {
    #[serde(flatten)]
    pub total: MaterialNeed,
    pub entries: Vec<NeedEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepCost {
    pub material: String,
    pub image: String,
    pub quantity: i64,
}

/// What a single module's next level costs
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleStep {
    pub module: String,
    pub next_level: i64,
    pub items: Vec<StepCost>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct NextLevelReport {
    pub items: Vec<NextLevelNeed>,
    pub modules: Vec<ModuleStep>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleSummary {
    pub name: String,
    pub max_level: i64,
    pub current_level: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestSummary {
    pub id: i64,
    pub name: String,
    pub is_completed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraderSummary {
    pub id: i64,
    pub name: String,
    pub is_hidden: bool,
    pub quests: Vec<QuestSummary>,
}

// ============================================================================
// Tally
// ============================================================================

struct TallyRow {
    material: String,
    image: String,
    need: i64,
    entries: Vec<NeedEntry>,
}

/// Per-material sums in first-seen order
#[derive(Default)]
struct MaterialTally {
    index: HashMap<String, usize>,
    rows: Vec<TallyRow>,
}

impl MaterialTally {
    fn add(&mut self, material: &str, image: &str, quantity: i64) -> &mut TallyRow {
        let slot = match self.index.get(material) {
            Some(&slot) => slot,
            None => {
                self.index.insert(material.to_string(), self.rows.len());
                self.rows.push(TallyRow {
                    material: material.to_string(),
                    image: image.to_string(),
                    need: 0,
                    entries: Vec::new(),
                });
                self.rows.len() - 1
            }
        };
        let row = &mut self.rows[slot];
        row.need += quantity;
        row
    }

    fn into_rows(mut self) -> Vec<TallyRow> {
        // Stable: equal keys keep first-seen order
        self.rows.sort_by_cached_key(|row| row.material.to_lowercase());
        self.rows
    }

    fn into_needs(self, inventory: &Inventory) -> Vec<MaterialNeed> {
        self.into_rows()
            .into_iter()
            .map(|row| MaterialNeed::new(row.material, row.image, row.need, inventory))
            .collect()
    }

    fn into_costs(self) -> Vec<Cost> {
        self.rows
            .into_iter()
            .map(|row| Cost {
                material: row.material,
                quantity: row.need,
            })
            .collect()
    }
}

/// Highest level with any recorded requirement, per module
fn max_levels(requirements: &[ModuleRequirement]) -> HashMap<&str, i64> {
    let mut out: HashMap<&str, i64> = HashMap::new();
    for req in requirements {
        let max = out.entry(req.module_name.as_str()).or_insert(0);
        *max = (*max).max(req.level);
    }
    out
}

// ============================================================================
// Queries
// ============================================================================

/// Everything still needed to max every module from its current level.
///
/// Lists every material any module references, even when nothing is left
/// to build with it.
pub fn module_shortfall(
    requirements: &[ModuleRequirement],
    progress: &Progress,
    inventory: &Inventory,
) -> Vec<MaterialNeed> {
    let mut tally = MaterialTally::default();
    for req in requirements {
        let remaining = if req.level > progress.level(&req.module_name) {
            req.quantity
        } else {
            0
        };
        tally.add(&req.item_name, &req.item_image, remaining);
    }
    tally.into_needs(inventory)
}

/// Materials for exactly one more level of every module with recorded
/// progress, with a per-material breakdown of contributing modules.
pub fn next_level_shortfall(
    requirements: &[ModuleRequirement],
    progress: &Progress,
    inventory: &Inventory,
) -> NextLevelReport {
    let max_levels = max_levels(requirements);
    let mut tally = MaterialTally::default();
    let mut modules = Vec::new();

    for (module, current_level) in progress.recorded() {
        let max_level = max_levels.get(module).copied().unwrap_or(0);
        let next_level = match current_level.checked_add(1) {
            Some(next) if next <= max_level => next,
            _ => continue,
        };

        let items: Vec<StepCost> = requirements
            .iter()
            .filter(|r| r.module_name == module && r.level == next_level)
            .map(|r| {
                tally
                    .add(&r.item_name, &r.item_image, r.quantity)
                    .entries
                    .push(NeedEntry {
                        module: module.to_string(),
                        level: next_level,
                        quantity: r.quantity,
                    });
                StepCost {
                    material: r.item_name.clone(),
                    image: r.item_image.clone(),
                    quantity: r.quantity,
                }
            })
            .collect();

        if !items.is_empty() {
            modules.push(ModuleStep {
                module: module.to_string(),
                next_level,
                items,
            });
        }
    }

    let items = tally
        .into_rows()
        .into_iter()
        .map(|row| NextLevelNeed {
            total: MaterialNeed::new(row.material, row.image, row.need, inventory),
            entries: row.entries,
        })
        .collect();

    NextLevelReport { items, modules }
}

/// Materials for every incomplete quest of every visible trader
pub fn quest_shortfall(
    traders: &[Trader],
    quests: &[Quest],
    requirements: &[QuestRequirement],
    inventory: &Inventory,
) -> Vec<MaterialNeed> {
    let visible: HashSet<i64> = traders
        .iter()
        .filter(|t| !t.is_hidden)
        .map(|t| t.id)
        .collect();
    let open: HashSet<i64> = quests
        .iter()
        .filter(|q| !q.is_completed && visible.contains(&q.trader_id))
        .map(|q| q.id)
        .collect();

    let mut tally = MaterialTally::default();
    for req in requirements.iter().filter(|r| open.contains(&r.quest_id)) {
        tally.add(&req.item_name, &req.item_image, req.quantity);
    }
    tally.into_needs(inventory)
}

// ============================================================================
// Transaction Costs
// ============================================================================

/// Summed cost of a module's levels in `(from, to]`
pub fn costs_between(requirements: &[ModuleRequirement], module: &str, from: i64, to: i64) -> Vec<Cost> {
    let mut tally = MaterialTally::default();
    for req in requirements
        .iter()
        .filter(|r| r.module_name == module && r.level > from && r.level <= to)
    {
        tally.add(&req.item_name, &req.item_image, req.quantity);
    }
    tally.into_costs()
}

/// Summed cost of a quest's requirements
pub fn quest_costs(requirements: &[QuestRequirement], quest_id: i64) -> Vec<Cost> {
    let mut tally = MaterialTally::default();
    for req in requirements.iter().filter(|r| r.quest_id == quest_id) {
        tally.add(&req.item_name, &req.item_image, req.quantity);
    }
    tally.into_costs()
}

// ============================================================================
// Summaries
// ============================================================================

/// Every module with requirements, sorted by name
pub fn module_summaries(requirements: &[ModuleRequirement], progress: &Progress) -> Vec<ModuleSummary> {
    let mut modules: Vec<ModuleSummary> = max_levels(requirements)
        .into_iter()
        .map(|(name, max_level)| ModuleSummary {
            name: name.to_string(),
            max_level,
            current_level: progress.level(name),
        })
        .collect();
    modules.sort_by(|a, b| a.name.cmp(&b.name));
    modules
}

/// Traders in the given order, each with its quests sorted by id
pub fn trader_summaries(traders: &[Trader], quests: &[Quest]) -> Vec<TraderSummary> {
    traders
        .iter()
        .map(|trader| {
            let mut trader_quests: Vec<QuestSummary> = quests
                .iter()
                .filter(|q| q.trader_id == trader.id)
                .map(|q| QuestSummary {
                    id: q.id,
                    name: q.name.clone(),
                    is_completed: q.is_completed,
                })
                .collect();
            trader_quests.sort_by_key(|q| q.id);

            TraderSummary {
                id: trader.id,
                name: trader.name.clone(),
                is_hidden: trader.is_hidden,
                quests: trader_quests,
            }
        })
        .collect()
}
