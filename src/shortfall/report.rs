//! Store-backed reports.
//!
//! Each report reads everything it needs on one pooled connection, which
//! goes back to the pool when the report returns.

use serde::Serialize;

use super::aggregate::{
    module_shortfall, module_summaries, next_level_shortfall, quest_shortfall, trader_summaries,
    MaterialNeed, ModuleSummary, NextLevelReport, TraderSummary,
};
use crate::db::{self, Database};
use crate::error::TrackerError;

#[derive(Debug, Clone, Serialize)]
pub struct ModuleOverview {
    pub modules: Vec<ModuleSummary>,
    pub items: Vec<MaterialNeed>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestOverview {
    pub traders: Vec<TraderSummary>,
    pub items: Vec<MaterialNeed>,
}

/// Module list with the overall shortfall to max every module
pub async fn module_overview(db: &Database) -> Result<ModuleOverview, TrackerError> {
    let mut conn = db.acquire().await?;
    let requirements = db::fetch_module_requirements(&mut conn).await?;
    let progress = db::fetch_progress(&mut conn).await?;
    let inventory = db::fetch_inventory(&mut conn).await?;

    Ok(ModuleOverview {
        modules: module_summaries(&requirements, &progress),
        items: module_shortfall(&requirements, &progress, &inventory),
    })
}

/// Overall module shortfall only
pub async fn module_items(db: &Database) -> Result<Vec<MaterialNeed>, TrackerError> {
    Ok(module_overview(db).await?.items)
}

pub async fn next_level_items(db: &Database) -> Result<NextLevelReport, TrackerError> {
    let mut conn = db.acquire().await?;
    let requirements = db::fetch_module_requirements(&mut conn).await?;
    let progress = db::fetch_progress(&mut conn).await?;
    let inventory = db::fetch_inventory(&mut conn).await?;

    Ok(next_level_shortfall(&requirements, &progress, &inventory))
}

/// Traders with their quests and the shortfall for open, visible quests
pub async fn quest_overview(db: &Database) -> Result<QuestOverview, TrackerError> {
    let mut conn = db.acquire().await?;
    let traders = db::fetch_traders(&mut conn).await?;
    let quests = db::fetch_quests(&mut conn).await?;
    let requirements = db::fetch_quest_requirements(&mut conn).await?;
    let inventory = db::fetch_inventory(&mut conn).await?;

    Ok(QuestOverview {
        traders: trader_summaries(&traders, &quests),
        items: quest_shortfall(&traders, &quests, &requirements, &inventory),
    })
}
