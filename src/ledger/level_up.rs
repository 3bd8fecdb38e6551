//! Module level changes.

use serde::Serialize;
use tracing::info;

use super::consume;
use crate::catalog::Cost;
use crate::db::{self, Database};
use crate::error::TrackerError;
use crate::shortfall::costs_between;

/// What a level change did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "change", rename_all = "snake_case")]
pub enum LevelChange {
    /// Target equals the recorded level
    Unchanged { level: i64 },
    /// Levels in `(from, to]` were paid for
    Raised { from: i64, to: i64, consumed: Vec<Cost> },
    /// Level-downs are recorded without refunds
    Lowered { from: i64, to: i64 },
}

/// Set a module's level, paying for every level gained.
///
/// Raising checks the summed cost of levels `(current, target]` against
/// inventory and fails with every shortfall listed; nothing changes on
/// failure. Lowering only records the new level.
pub async fn apply_level(
    db: &Database,
    module: &str,
    target: i64,
) -> Result<LevelChange, TrackerError> {
    let module = module.trim();
    if module.is_empty() {
        return Err(TrackerError::invalid("Module name cannot be empty"));
    }
    if target < 0 {
        return Err(TrackerError::invalid("Level cannot be negative"));
    }

    let mut tx = db.begin_write().await?;
    let current = db::fetch_progress(tx.conn()).await?.level(module);

    if target == current {
        return Ok(LevelChange::Unchanged { level: current });
    }

    let change = if target > current {
        let requirements = db::fetch_requirements_for_module(tx.conn(), module).await?;
        let costs = costs_between(&requirements, module, current, target);
        consume(tx.conn(), &costs).await?;
        LevelChange::Raised {
            from: current,
            to: target,
            consumed: costs,
        }
    } else {
        LevelChange::Lowered {
            from: current,
            to: target,
        }
    };

    db::upsert_progress(tx.conn(), module, target).await?;
    tx.commit().await?;

    info!("Module {} level {} -> {}", module, current, target);
    Ok(change)
}
