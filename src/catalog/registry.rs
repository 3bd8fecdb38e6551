//! Catalog Registry
//!
//! Loads materials, modules and traders from TOML files under a data
//! directory.

use std::collections::HashMap;
use std::path::Path;
use serde::de::DeserializeOwned;
use tracing::{info, warn};

use super::definition::{
    ModuleDefinition, RawMaterial, RawModuleDefinition, RawTraderDefinition, TraderDefinition,
};

/// Registry for all static game data
pub struct Catalog {
    materials: HashMap<String, String>,
    modules: HashMap<String, ModuleDefinition>,
    traders: HashMap<i64, TraderDefinition>,
}

impl Catalog {
    pub fn new() -> Self {
        Self {
            materials: HashMap::new(),
            modules: HashMap::new(),
            traders: HashMap::new(),
        }
    }

    /// Load `materials/`, `modules/` and `traders/` from a data directory
    pub fn load_from_directory(&mut self, data_dir: &Path) -> Result<(), String> {
        for (name, raw) in read_tables::<RawMaterial>(&data_dir.join("materials"))? {
            self.materials.insert(name, raw.image);
        }

        for (name, raw) in read_tables::<RawModuleDefinition>(&data_dir.join("modules"))? {
            if self.modules.contains_key(&name) {
                warn!("Duplicate module '{}', overwriting", name);
            }
            let module = ModuleDefinition::from_raw(&name, &raw);
            info!(
                "Loaded module: {} - {} levels (max {})",
                name,
                module.levels.len(),
                module.max_level()
            );
            self.modules.insert(name, module);
        }

        for (slug, raw) in read_tables::<RawTraderDefinition>(&data_dir.join("traders"))? {
            let trader = TraderDefinition::from_raw(&slug, &raw);
            if let Some(previous) = self.traders.get(&trader.id) {
                warn!(
                    "Duplicate trader ID {} ('{}' and '{}'), overwriting",
                    trader.id, previous.slug, slug
                );
            }
            info!("Loaded trader: {} - {} quests", trader.name, trader.quests.len());
            self.traders.insert(trader.id, trader);
        }

        for (quest_id, first, second) in self.duplicate_quests() {
            warn!(
                "Quest ID {} is declared by traders '{}' and '{}'; only the first is stored",
                quest_id, first, second
            );
        }

        info!(
            "Loaded {} materials, {} modules, {} traders",
            self.materials.len(),
            self.modules.len(),
            self.traders.len()
        );

        Ok(())
    }

    /// Image registered for a material
    pub fn image(&self, material: &str) -> Option<&str> {
        self.materials.get(material).map(String::as_str)
    }

    /// Modules sorted by name
    pub fn modules(&self) -> Vec<&ModuleDefinition> {
        let mut modules: Vec<&ModuleDefinition> = self.modules.values().collect();
        modules.sort_by(|a, b| a.name.cmp(&b.name));
        modules
    }

    /// Traders sorted by id
    pub fn traders(&self) -> Vec<&TraderDefinition> {
        let mut traders: Vec<&TraderDefinition> = self.traders.values().collect();
        traders.sort_by_key(|t| t.id);
        traders
    }

    /// Quest ids claimed by more than one trader, as (id, first slug, later slug)
    fn duplicate_quests(&self) -> Vec<(i64, &str, &str)> {
        let mut owners: HashMap<i64, &str> = HashMap::new();
        let mut duplicates = Vec::new();
        for trader in self.traders() {
            for quest in &trader.quests {
                match owners.get(&quest.id) {
                    Some(first) => duplicates.push((quest.id, *first, trader.slug.as_str())),
                    None => {
                        owners.insert(quest.id, trader.slug.as_str());
                    }
                }
            }
        }
        duplicates
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty() && self.traders.is_empty()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse every `*.toml` file in `dir` as a table of `T`, in file name order
fn read_tables<T: DeserializeOwned>(dir: &Path) -> Result<Vec<(String, T)>, String> {
    if !dir.exists() {
        warn!("Catalog directory does not exist: {:?}", dir);
        return Ok(Vec::new());
    }

    let mut paths = Vec::new();
    let entries =
        std::fs::read_dir(dir).map_err(|e| format!("Failed to read {:?}: {}", dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| format!("Failed to read entry: {}", e))?;
        let path = entry.path();
        if path.extension().map_or(false, |ext| ext == "toml") {
            paths.push(path);
        }
    }
    paths.sort();

    let mut out = Vec::new();
    for path in paths {
        let content = std::fs::read_to_string(&path)
            .map_err(|e| format!("Failed to read {:?}: {}", path, e))?;

        let table: HashMap<String, T> = toml::from_str(&content)
            .map_err(|e| format!("Failed to parse {:?}: {}", path, e))?;

        let mut table: Vec<(String, T)> = table.into_iter().collect();
        table.sort_by(|a, b| a.0.cmp(&b.0));
        out.extend(table);
    }

    Ok(out)
}
