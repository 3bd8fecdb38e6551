//! SQLite store: pool, migrations, catalog seeding and typed row access.
//!
//! Row functions take a `&mut SqliteConnection` so the same query runs on a
//! pooled connection for reads and inside a write transaction for mutations.

use sqlx::pool::PoolConnection;
use sqlx::sqlite::{Sqlite, SqliteConnection, SqlitePool, SqlitePoolOptions};
use sqlx::{Row, Transaction};
use tokio::sync::{Mutex, MutexGuard};

use crate::catalog::{Catalog, Cost};
use crate::records::{
    Inventory, InventoryEntry, ModuleRequirement, Progress, ProgressEntry, Quest,
    QuestRequirement, Trader,
};

pub struct Database {
    pool: SqlitePool,
    /// Serializes check-then-apply mutations across concurrent requests
    write_lock: Mutex<()>,
}

/// A write transaction holding the store's write lock.
///
/// Dropping it without `commit` rolls back, then releases the lock.
pub struct WriteTx<'a> {
    tx: Transaction<'static, Sqlite>,
    _guard: MutexGuard<'a, ()>,
}

impl WriteTx<'_> {
    pub fn conn(&mut self) -> &mut SqliteConnection {
        &mut *self.tx
    }

    pub async fn commit(self) -> Result<(), sqlx::Error> {
        let WriteTx { tx, _guard } = self;
        tx.commit().await
    }
}

impl Database {
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let mut options = SqlitePoolOptions::new().max_connections(max_connections);

        // Every connection to an in-memory database is a separate database
        if database_url.contains(":memory:") || database_url.contains("mode=memory") {
            options = options
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }

        let pool = options.connect(database_url).await?;

        // Run migrations
        Self::migrate(&pool).await?;

        Ok(Self {
            pool,
            write_lock: Mutex::new(()),
        })
    }

    async fn migrate(pool: &SqlitePool) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS module_requirements (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                module_name TEXT NOT NULL,
                level INTEGER NOT NULL CHECK (level >= 1),
                item_name TEXT NOT NULL,
                item_image TEXT NOT NULL,
                quantity INTEGER NOT NULL CHECK (quantity >= 0),
                UNIQUE(module_name, level, item_name)
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS inventory (
                item_name TEXT PRIMARY KEY,
                item_image TEXT NOT NULL,
                have INTEGER NOT NULL DEFAULT 0
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS player_progress (
                module_name TEXT PRIMARY KEY,
                current_level INTEGER NOT NULL DEFAULT 0
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS traders (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                is_hidden INTEGER NOT NULL DEFAULT 0
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS quests (
                id INTEGER PRIMARY KEY,
                trader_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                is_completed INTEGER NOT NULL DEFAULT 0,
                FOREIGN KEY(trader_id) REFERENCES traders(id)
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS quest_requirements (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                quest_id INTEGER NOT NULL,
                item_name TEXT NOT NULL,
                item_image TEXT NOT NULL,
                quantity INTEGER NOT NULL CHECK (quantity >= 0),
                FOREIGN KEY(quest_id) REFERENCES quests(id),
                UNIQUE(quest_id, item_name)
            )
            "#,
        )
        .execute(pool)
        .await?;

        tracing::info!("Database migrations complete");
        Ok(())
    }

    /// Insert catalog rows that are not stored yet. Existing rows, including
    /// quest completion flags, are left alone.
    pub async fn seed_catalog(
        &self,
        catalog: &Catalog,
        fallback_image: &str,
    ) -> Result<(), sqlx::Error> {
        let mut tx = self.begin_write().await?;
        let image = |cost: &Cost| {
            catalog
                .image(&cost.material)
                .unwrap_or(fallback_image)
                .to_string()
        };

        let mut requirement_rows = 0u64;
        for module in catalog.modules() {
            for level in &module.levels {
                for cost in &level.costs {
                    let result = sqlx::query(
                        r#"INSERT OR IGNORE INTO module_requirements
                            (module_name, level, item_name, item_image, quantity)
                        VALUES (?, ?, ?, ?, ?)"#,
                    )
                    .bind(&module.name)
                    .bind(level.level)
                    .bind(&cost.material)
                    .bind(image(cost))
                    .bind(cost.quantity)
                    .execute(tx.conn())
                    .await?;
                    requirement_rows += result.rows_affected();
                }
            }
        }

        let mut quest_rows = 0u64;
        for trader in catalog.traders() {
            sqlx::query("INSERT OR IGNORE INTO traders (id, name, is_hidden) VALUES (?, ?, ?)")
                .bind(trader.id)
                .bind(&trader.name)
                .bind(trader.hidden)
                .execute(tx.conn())
                .await?;

            for quest in &trader.quests {
                let result = sqlx::query(
                    "INSERT OR IGNORE INTO quests (id, trader_id, name) VALUES (?, ?, ?)",
                )
                .bind(quest.id)
                .bind(trader.id)
                .bind(&quest.name)
                .execute(tx.conn())
                .await?;
                quest_rows += result.rows_affected();

                for cost in &quest.requirements {
                    sqlx::query(
                        r#"INSERT OR IGNORE INTO quest_requirements
                            (quest_id, item_name, item_image, quantity)
                        VALUES (?, ?, ?, ?)"#,
                    )
                    .bind(quest.id)
                    .bind(&cost.material)
                    .bind(image(cost))
                    .bind(cost.quantity)
                    .execute(tx.conn())
                    .await?;
                }
            }
        }

        tx.commit().await?;
        tracing::info!(
            "Seeded catalog: {} new module requirements, {} new quests",
            requirement_rows,
            quest_rows
        );
        Ok(())
    }

    /// Pooled connection for reads, returned to the pool on drop
    pub async fn acquire(&self) -> Result<PoolConnection<Sqlite>, sqlx::Error> {
        self.pool.acquire().await
    }

    /// Take the write lock and open a transaction
    pub async fn begin_write(&self) -> Result<WriteTx<'_>, sqlx::Error> {
        let guard = self.write_lock.lock().await;
        let tx = self.pool.begin().await?;
        Ok(WriteTx { tx, _guard: guard })
    }
}

// ============================================================================
// Module Requirements & Progress
// ============================================================================

fn module_requirement_from_row(r: &sqlx::sqlite::SqliteRow) -> ModuleRequirement {
    ModuleRequirement {
        module_name: r.get("module_name"),
        level: r.get("level"),
        item_name: r.get("item_name"),
        item_image: r.get("item_image"),
        quantity: r.get("quantity"),
    }
}

pub async fn fetch_module_requirements(
    conn: &mut SqliteConnection,
) -> Result<Vec<ModuleRequirement>, sqlx::Error> {
    let rows = sqlx::query(
        "SELECT module_name, level, item_name, item_image, quantity FROM module_requirements ORDER BY id",
    )
    .fetch_all(conn)
    .await?;

    Ok(rows.iter().map(module_requirement_from_row).collect())
}

pub async fn fetch_requirements_for_module(
    conn: &mut SqliteConnection,
    module: &str,
) -> Result<Vec<ModuleRequirement>, sqlx::Error> {
    let rows = sqlx::query(
        r#"SELECT module_name, level, item_name, item_image, quantity
        FROM module_requirements
        WHERE module_name = ?
        ORDER BY level, id"#,
    )
    .bind(module)
    .fetch_all(conn)
    .await?;

    Ok(rows.iter().map(module_requirement_from_row).collect())
}

pub async fn fetch_progress(conn: &mut SqliteConnection) -> Result<Progress, sqlx::Error> {
    let rows = sqlx::query("SELECT module_name, current_level FROM player_progress")
        .fetch_all(conn)
        .await?;

    Ok(Progress::new(rows.iter().map(|r| ProgressEntry {
        module_name: r.get("module_name"),
        current_level: r.get("current_level"),
    })))
}

/// Record a module's level, replacing any previous entry
pub async fn upsert_progress(
    conn: &mut SqliteConnection,
    module: &str,
    level: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT OR REPLACE INTO player_progress (module_name, current_level) VALUES (?, ?)")
        .bind(module)
        .bind(level)
        .execute(conn)
        .await?;

    Ok(())
}

// ============================================================================
// Inventory
// ============================================================================

pub async fn fetch_inventory(conn: &mut SqliteConnection) -> Result<Inventory, sqlx::Error> {
    let rows = sqlx::query("SELECT item_name, item_image, have FROM inventory")
        .fetch_all(conn)
        .await?;

    Ok(Inventory::new(rows.iter().map(|r| InventoryEntry {
        item_name: r.get("item_name"),
        item_image: r.get("item_image"),
        have: r.get("have"),
    })))
}

pub async fn upsert_inventory(
    conn: &mut SqliteConnection,
    entry: &InventoryEntry,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT OR REPLACE INTO inventory (item_name, item_image, have) VALUES (?, ?, ?)")
        .bind(&entry.item_name)
        .bind(&entry.item_image)
        .bind(entry.have)
        .execute(conn)
        .await?;

    Ok(())
}

/// Subtract from a material's stock. Callers check sufficiency first.
pub async fn deduct_inventory(
    conn: &mut SqliteConnection,
    material: &str,
    quantity: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE inventory SET have = have - ? WHERE item_name = ?")
        .bind(quantity)
        .bind(material)
        .execute(conn)
        .await?;

    Ok(())
}

/// First image recorded for a material in module or quest requirements
pub async fn lookup_material_image(
    conn: &mut SqliteConnection,
    material: &str,
) -> Result<Option<String>, sqlx::Error> {
    let row = sqlx::query(
        r#"SELECT item_image FROM (
            SELECT item_image, 0 AS source, id FROM module_requirements WHERE item_name = ?
            UNION ALL
            SELECT item_image, 1 AS source, id FROM quest_requirements WHERE item_name = ?
        )
        ORDER BY source, id
        LIMIT 1"#,
    )
    .bind(material)
    .bind(material)
    .fetch_optional(conn)
    .await?;

    Ok(row.map(|r| r.get("item_image")))
}

// ============================================================================
// Traders & Quests
// ============================================================================

/// Traders sorted by name
pub async fn fetch_traders(conn: &mut SqliteConnection) -> Result<Vec<Trader>, sqlx::Error> {
    let rows = sqlx::query("SELECT id, name, is_hidden FROM traders ORDER BY name, id")
        .fetch_all(conn)
        .await?;

    Ok(rows
        .iter()
        .map(|r| Trader {
            id: r.get("id"),
            name: r.get("name"),
            is_hidden: r.get::<i64, _>("is_hidden") != 0,
        })
        .collect())
}

fn quest_from_row(r: &sqlx::sqlite::SqliteRow) -> Quest {
    Quest {
        id: r.get("id"),
        trader_id: r.get("trader_id"),
        name: r.get("name"),
        is_completed: r.get::<i64, _>("is_completed") != 0,
    }
}

/// Quests sorted by id
pub async fn fetch_quests(conn: &mut SqliteConnection) -> Result<Vec<Quest>, sqlx::Error> {
    let rows = sqlx::query("SELECT id, trader_id, name, is_completed FROM quests ORDER BY id")
        .fetch_all(conn)
        .await?;

    Ok(rows.iter().map(quest_from_row).collect())
}

pub async fn fetch_quest(
    conn: &mut SqliteConnection,
    quest_id: i64,
) -> Result<Option<Quest>, sqlx::Error> {
    let row = sqlx::query("SELECT id, trader_id, name, is_completed FROM quests WHERE id = ?")
        .bind(quest_id)
        .fetch_optional(conn)
        .await?;

    Ok(row.as_ref().map(quest_from_row))
}

pub async fn update_quest_completed(
    conn: &mut SqliteConnection,
    quest_id: i64,
    completed: bool,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE quests SET is_completed = ? WHERE id = ?")
        .bind(completed)
        .bind(quest_id)
        .execute(conn)
        .await?;

    Ok(())
}

fn quest_requirement_from_row(r: &sqlx::sqlite::SqliteRow) -> QuestRequirement {
    QuestRequirement {
        quest_id: r.get("quest_id"),
        item_name: r.get("item_name"),
        item_image: r.get("item_image"),
        quantity: r.get("quantity"),
    }
}

pub async fn fetch_quest_requirements(
    conn: &mut SqliteConnection,
) -> Result<Vec<QuestRequirement>, sqlx::Error> {
    let rows = sqlx::query(
        "SELECT quest_id, item_name, item_image, quantity FROM quest_requirements ORDER BY id",
    )
    .fetch_all(conn)
    .await?;

    Ok(rows.iter().map(quest_requirement_from_row).collect())
}

pub async fn fetch_requirements_for_quest(
    conn: &mut SqliteConnection,
    quest_id: i64,
) -> Result<Vec<QuestRequirement>, sqlx::Error> {
    let rows = sqlx::query(
        "SELECT quest_id, item_name, item_image, quantity FROM quest_requirements WHERE quest_id = ? ORDER BY id",
    )
    .bind(quest_id)
    .fetch_all(conn)
    .await?;

    Ok(rows.iter().map(quest_requirement_from_row).collect())
}

// ============================================================================
// Test Fixtures
// ============================================================================


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use std::path::Path;
    use tempfile::TempDir;

    fn write_catalog(dir: &Path) {
        std::fs::create_dir_all(dir.join("materials")).unwrap();
        std::fs::create_dir_all(dir.join("modules")).unwrap();
        std::fs::create_dir_all(dir.join("traders")).unwrap();
        std::fs::write(
            dir.join("materials/materials.toml"),
            "[Wood]\nimage = \"wood.png\"\n",
        )
        .unwrap();
        std::fs::write(
            dir.join("modules/workshop.toml"),
            r#"
[Workshop]
[[Workshop.levels]]
level = 1
costs = [{ material = "Wood", quantity = 10 }, { material = "Nails", quantity = 4 }]
"#,
        )
        .unwrap();
        std::fs::write(
            dir.join("traders/traders.toml"),
            r#"
[mechanic]
id = 1
name = "Mechanic"

[[mechanic.quests]]
id = 10
name = "Loose Ends"
requirements = [{ material = "Bolts", quantity = 3 }]
"#,
        )
        .unwrap();
    }

    #[tokio::test]
    async fn test_seed_catalog_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        write_catalog(temp_dir.path());
        let mut catalog = Catalog::new();
        catalog.load_from_directory(temp_dir.path()).unwrap();

        let db = memory_db().await;
        db.seed_catalog(&catalog, "unknown.png").await.unwrap();
        update_quest_completed(&mut db.acquire().await.unwrap(), 10, true)
            .await
            .unwrap();

        // Second seed must not duplicate rows or reset completion
        db.seed_catalog(&catalog, "unknown.png").await.unwrap();

        let mut conn = db.acquire().await.unwrap();
        let requirements = fetch_module_requirements(&mut conn).await.unwrap();
        assert_eq!(requirements.len(), 2);
        assert_eq!(requirements[0].item_image, "wood.png");
        assert_eq!(requirements[1].item_image, "unknown.png");

        let quests = fetch_quests(&mut conn).await.unwrap();
        assert_eq!(quests.len(), 1);
        assert!(quests[0].is_completed);
        assert_eq!(fetch_quest_requirements(&mut conn).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_dropped_write_rolls_back() {
        let db = memory_db().await;
        set_have(&db, "Wood", 20).await;

        {
            let mut tx = db.begin_write().await.unwrap();
            deduct_inventory(tx.conn(), "Wood", 5).await.unwrap();
            // Dropped without commit
        }

        assert_eq!(have(&db, "Wood").await, 20);

        let mut tx = db.begin_write().await.unwrap();
        deduct_inventory(tx.conn(), "Wood", 5).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(have(&db, "Wood").await, 15);
    }

    #[tokio::test]
    async fn test_lookup_material_image_prefers_modules() {
        let db = memory_db().await;
        add_trader(&db, 1, "Mechanic", false).await;
        add_quest(&db, 10, 1, "Loose Ends", false).await;
        add_quest_cost(&db, 10, "Bolts", 3).await;
        add_quest_cost(&db, 10, "Wood", 1).await;
        add_module_cost(&db, "Workshop", 1, "Wood", 10).await;

        let mut conn = db.acquire().await.unwrap();
        assert_eq!(
            lookup_material_image(&mut conn, "Bolts").await.unwrap(),
            Some("bolts.png".to_string())
        );
        assert_eq!(
            lookup_material_image(&mut conn, "Wood").await.unwrap(),
            Some("wood.png".to_string())
        );
        assert_eq!(lookup_material_image(&mut conn, "Gizmo").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_upsert_progress_replaces_entry() {
        let db = memory_db().await;
        let mut conn = db.acquire().await.unwrap();
        upsert_progress(&mut conn, "Workshop", 1).await.unwrap();
        upsert_progress(&mut conn, "Workshop", 3).await.unwrap();

        let progress = fetch_progress(&mut conn).await.unwrap();
        assert_eq!(progress.level("Workshop"), 3);
        assert_eq!(progress.recorded().len(), 1);
    }
}
