//! Quest turn-in and reopening.

use serde::Serialize;
use tracing::info;

use super::consume;
use crate::catalog::Cost;
use crate::db::{self, Database};
use crate::error::TrackerError;
use crate::shortfall::quest_costs;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "change", rename_all = "snake_case")]
pub enum QuestChange {
    /// Requirements were deducted and the quest marked complete
    Completed { consumed: Vec<Cost> },
    /// Quest was already complete; nothing deducted
    AlreadyCompleted,
    /// Quest marked incomplete; inventory is not refunded
    Reopened,
}

/// Mark a quest complete or incomplete.
///
/// Completing deducts the quest's summed requirements once, failing with
/// every shortfall listed when stock is short. Reopening never touches
/// inventory.
pub async fn set_quest_completed(
    db: &Database,
    quest_id: i64,
    completed: bool,
) -> Result<QuestChange, TrackerError> {
    let mut tx = db.begin_write().await?;
    let quest = db::fetch_quest(tx.conn(), quest_id)
        .await?
        .ok_or_else(|| TrackerError::NotFound(format!("Quest {} does not exist", quest_id)))?;

    let change = if !completed {
        QuestChange::Reopened
    } else if quest.is_completed {
        // Completing twice must not pay twice
        return Ok(QuestChange::AlreadyCompleted);
    } else {
        let requirements = db::fetch_requirements_for_quest(tx.conn(), quest_id).await?;
        let costs = quest_costs(&requirements, quest_id);
        consume(tx.conn(), &costs).await?;
        QuestChange::Completed { consumed: costs }
    };

    db::update_quest_completed(tx.conn(), quest_id, completed).await?;
    tx.commit().await?;

    info!("Quest {} ({}) completed = {}", quest.id, quest.name, completed);
    Ok(change)
}
