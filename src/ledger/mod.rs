//! Inventory Ledger
//!
//! Mutations that consume or set materials. Level-ups and quest turn-ins
//! check every cost first and deduct only when all of them are covered,
//! inside one write transaction.

pub mod inventory;
pub mod level_up;
pub mod quest;

pub use inventory::set_inventory_have;
pub use level_up::apply_level;
pub use quest::set_quest_completed;

use sqlx::sqlite::SqliteConnection;

use crate::catalog::Cost;
use crate::db;
use crate::error::{Shortfall, TrackerError};
use crate::records::Inventory;

/// Every cost the inventory cannot cover
pub fn find_shortfalls(costs: &[Cost], inventory: &Inventory) -> Vec<Shortfall> {
    costs
        .iter()
        .filter_map(|cost| {
            let available = inventory.have(&cost.material);
            (available < cost.quantity).then(|| Shortfall {
                material: cost.material.clone(),
                required: cost.quantity,
                available,
            })
        })
        .collect()
}

/// Check all costs against stock, then deduct them. Deducts nothing on failure.
async fn consume(conn: &mut SqliteConnection, costs: &[Cost]) -> Result<(), TrackerError> {
    let inventory = db::fetch_inventory(conn).await?;
    let missing = find_shortfalls(costs, &inventory);
    if !missing.is_empty() {
        return Err(TrackerError::InsufficientResources(missing));
    }

    for cost in costs {
        db::deduct_inventory(conn, &cost.material, cost.quantity).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::InventoryEntry;

    #[test]
    fn test_find_shortfalls_reports_each_missing_material() {
        let inventory = Inventory::new(vec![InventoryEntry {
            item_name: "wood".to_string(),
            item_image: "wood.png".to_string(),
            have: 10,
        }]);
        let costs = vec![
            Cost {
                material: "wood".to_string(),
                quantity: 15,
            },
            Cost {
                material: "iron".to_string(),
                quantity: 5,
            },
            Cost {
                material: "rope".to_string(),
                quantity: 0,
            },
        ];

        let missing = find_shortfalls(&costs, &inventory);
        assert_eq!(
            missing,
            vec![
                Shortfall {
                    material: "wood".to_string(),
                    required: 15,
                    available: 10
                },
                Shortfall {
                    material: "iron".to_string(),
                    required: 5,
                    available: 0
                },
            ]
        );
    }
}
