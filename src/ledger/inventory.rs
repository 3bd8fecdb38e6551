use tracing::info;

use crate::db::{self, Database};
use crate::error::TrackerError;
use crate::records::InventoryEntry;

/// Set a material's stock directly. Negative values clamp to 0; unknown
/// materials get `fallback_image`.
pub async fn set_inventory_have(
    db: &Database,
    material: &str,
    have: i64,
    fallback_image: &str,
) -> Result<InventoryEntry, TrackerError> {
    let material = material.trim();
    if material.is_empty() {
        return Err(TrackerError::invalid("Item name cannot be empty"));
    }

    let mut tx = db.begin_write().await?;
    let item_image = db::lookup_material_image(tx.conn(), material)
        .await?
        .unwrap_or_else(|| fallback_image.to_string());

    let entry = InventoryEntry {
        item_name: material.to_string(),
        item_image,
        have: have.max(0),
    };
    db::upsert_inventory(tx.conn(), &entry).await?;
    tx.commit().await?;

    info!("Inventory {} set to {}", entry.item_name, entry.have);
    Ok(entry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::fixtures::*;

    #[tokio::test]
    async fn test_unknown_material_gets_fallback_image() {
        let db = memory_db().await;

        let entry = set_inventory_have(&db, "Gizmo", 5, "unknown.png").await.unwrap();

        assert_eq!(
            entry,
            InventoryEntry {
                item_name: "Gizmo".to_string(),
                item_image: "unknown.png".to_string(),
                have: 5,
            }
        );
        assert_eq!(have(&db, "Gizmo").await, 5);
    }

    #[tokio::test]
    async fn test_known_material_uses_requirement_image() {
        let db = memory_db().await;
        add_module_cost(&db, "Workshop", 1, "Wood", 10).await;

        let entry = set_inventory_have(&db, " Wood ", 12, "unknown.png").await.unwrap();

        assert_eq!(entry.item_name, "Wood");
        assert_eq!(entry.item_image, "wood.png");
    }

    #[tokio::test]
    async fn test_negative_clamps_and_overwrites() {
        let db = memory_db().await;
        set_inventory_have(&db, "Wood", 8, "unknown.png").await.unwrap();

        let entry = set_inventory_have(&db, "Wood", -4, "unknown.png").await.unwrap();

        assert_eq!(entry.have, 0);
        assert_eq!(have(&db, "Wood").await, 0);
    }

    #[tokio::test]
    async fn test_empty_name_is_invalid() {
        let db = memory_db().await;
        assert!(matches!(
            set_inventory_have(&db, "  ", 1, "unknown.png").await,
            Err(TrackerError::InvalidInput(_))
        ));
    }
}
