// =============================================================================
// DATABASE MODULE
// =============================================================================
// PostgreSQL access for the entity snapshots this service classifies.
//
// Products, materials and batches are owned by the backend and only read here
// (apart from seeding an empty development database). The one write path is
// the notification lifecycle: unread -> read / dismissed.
// =============================================================================

use anyhow::{Context, Result};
use sqlx::{postgres::PgPoolOptions, postgres::PgRow, PgPool, Row};
use uuid::Uuid;

use crate::models::{
    Notification, NotificationStatus, Product, ProductionBatch, RawMaterial, RelatedData,
};

const PRODUCT_COLUMNS: &str = "id, sku, name, current_stock, min_stock_level, status";

const MATERIAL_COLUMNS: &str =
    "id, name, unit, current_stock, min_threshold, reorder_point, max_capacity";

const BATCH_COLUMNS: &str = "id, batch_number, product_id, status, planned_quantity, created_at";

const NOTIFICATION_COLUMNS: &str =
    "id, type, module, title, message, status, related_data, created_at";

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    // -------------------------------------------------------------------------
    // CONNECTION
    // -------------------------------------------------------------------------
    /// Create a new database connection pool
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .min_connections(2)
            .acquire_timeout(std::time::Duration::from_secs(5))
            .idle_timeout(std::time::Duration::from_secs(300))
            .connect(database_url)
            .await
            .context("Failed to connect to PostgreSQL")?;

        Ok(Self { pool })
    }

    // -------------------------------------------------------------------------
    // MIGRATIONS
    // -------------------------------------------------------------------------
    /// Create tables and indexes if they don't exist. Safe to run repeatedly.
    pub async fn run_migrations(&self) -> Result<()> {
        let statements = [
            (
                "products",
                r#"
                CREATE TABLE IF NOT EXISTS products (
                    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                    sku VARCHAR(50) UNIQUE NOT NULL,
                    name VARCHAR(255) NOT NULL,
                    current_stock DOUBLE PRECISION NOT NULL DEFAULT 0,
                    min_stock_level DOUBLE PRECISION NOT NULL DEFAULT 0,
                    -- in-stock, low-stock, out-of-stock, active, inactive, discontinued
                    status VARCHAR(20),
                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                )
                "#,
            ),
            (
                "raw_materials",
                r#"
                CREATE TABLE IF NOT EXISTS raw_materials (
                    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                    name VARCHAR(255) UNIQUE NOT NULL,
                    unit VARCHAR(20) NOT NULL DEFAULT '',
                    current_stock DOUBLE PRECISION NOT NULL DEFAULT 0,
                    min_threshold DOUBLE PRECISION NOT NULL DEFAULT 0,
                    reorder_point DOUBLE PRECISION NOT NULL DEFAULT 0,
                    max_capacity DOUBLE PRECISION NOT NULL DEFAULT 0,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                )
                "#,
            ),
            (
                "production_batches",
                r#"
                CREATE TABLE IF NOT EXISTS production_batches (
                    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                    batch_number VARCHAR(50) UNIQUE NOT NULL,
                    product_id UUID REFERENCES products(id) ON DELETE SET NULL,
                    status VARCHAR(20) NOT NULL DEFAULT 'planned',
                    planned_quantity DOUBLE PRECISION NOT NULL DEFAULT 0,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                )
                "#,
            ),
            (
                "notifications",
                r#"
                CREATE TABLE IF NOT EXISTS notifications (
                    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                    type VARCHAR(50) NOT NULL DEFAULT '',
                    module VARCHAR(50) NOT NULL DEFAULT '',
                    title VARCHAR(255) NOT NULL DEFAULT '',
                    message TEXT NOT NULL DEFAULT '',
                    status VARCHAR(20) NOT NULL DEFAULT 'unread',
                    related_data JSONB,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    CONSTRAINT valid_status CHECK (status IN ('unread', 'read', 'dismissed'))
                )
                "#,
            ),
            (
                "notifications status index",
                "CREATE INDEX IF NOT EXISTS idx_notifications_status ON notifications(status)",
            ),
            (
                "notifications created_at index",
                "CREATE INDEX IF NOT EXISTS idx_notifications_created_at ON notifications(created_at DESC)",
            ),
            (
                "batches status index",
                "CREATE INDEX IF NOT EXISTS idx_batches_status ON production_batches(status)",
            ),
        ];

        for (name, sql) in statements {
            sqlx::query(sql)
                .execute(&self.pool)
                .await
                .with_context(|| format!("Failed to create {}", name))?;
        }

        Ok(())
    }

    /// Seed sample rows into empty tables
    pub async fn seed_sample_data(&self) -> Result<()> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        if count.0 > 0 {
            return Ok(());
        }

        let products = [
            ("PRD-BREAD-001", "Sourdough Loaf", 120.0, 40.0, Some("active")),
            ("PRD-BREAD-002", "Rye Loaf", 15.0, 30.0, Some("active")),
            ("PRD-CAKE-001", "Carrot Cake", 0.0, 10.0, None),
            ("PRD-CAKE-002", "Lemon Tart", 25.0, 25.0, None),
            ("PRD-COOKIE-001", "Oat Cookie Box", 60.0, 20.0, Some("discontinued")),
        ];

        for (sku, name, stock, min, status) in products {
            sqlx::query(
                r#"
                INSERT INTO products (sku, name, current_stock, min_stock_level, status)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (sku) DO NOTHING
                "#,
            )
            .bind(sku)
            .bind(name)
            .bind(stock)
            .bind(min)
            .bind(status)
            .execute(&self.pool)
            .await?;
        }

        let materials = [
            ("Wheat Flour", "kg", 450.0, 100.0, 200.0, 1000.0),
            ("Rye Flour", "kg", 80.0, 100.0, 150.0, 500.0),
            ("Butter", "kg", 0.0, 20.0, 40.0, 200.0),
            ("Sugar", "kg", 120.0, 50.0, 150.0, 400.0),
            ("Eggs", "pcs", 2400.0, 300.0, 600.0, 2000.0),
        ];

        for (name, unit, stock, min, reorder, max) in materials {
            sqlx::query(
                r#"
                INSERT INTO raw_materials
                    (name, unit, current_stock, min_threshold, reorder_point, max_capacity)
                VALUES ($1, $2, $3, $4, $5, $6)
                ON CONFLICT (name) DO NOTHING
                "#,
            )
            .bind(name)
            .bind(unit)
            .bind(stock)
            .bind(min)
            .bind(reorder)
            .bind(max)
            .execute(&self.pool)
            .await?;
        }

        let batches = [
            ("BATCH-0001", "PRD-BREAD-001", "completed", 200.0),
            ("BATCH-0002", "PRD-BREAD-002", "in_production", 150.0),
            ("BATCH-0003", "PRD-CAKE-001", "planned", 40.0),
        ];

        for (number, sku, status, quantity) in batches {
            sqlx::query(
                r#"
                INSERT INTO production_batches (batch_number, product_id, status, planned_quantity)
                SELECT $1, id, $3, $4 FROM products WHERE sku = $2
                ON CONFLICT (batch_number) DO NOTHING
                "#,
            )
            .bind(number)
            .bind(sku)
            .bind(status)
            .bind(quantity)
            .execute(&self.pool)
            .await?;
        }

        let notifications = [
            ("order_alert", "orders", "New order received", "unread", None),
            ("low_stock", "materials", "Rye Flour below minimum", "unread", None),
            ("out_of_stock", "materials", "Butter is out of stock", "unread", None),
            ("production_request", "production", "Restock Carrot Cake", "read", None),
            (
                "activity",
                "orders",
                "Purchase order created",
                "unread",
                Some(serde_json::json!({
                    "activity_log_id": 1,
                    "action": "PURCHASE_ORDER_CREATE",
                    "action_category": "PURCHASE_ORDER"
                })),
            ),
            (
                "activity",
                "production",
                "Recipe updated",
                "read",
                Some(serde_json::json!({
                    "activity_log_id": 2,
                    "action": "RECIPE_UPDATE",
                    "action_category": "RECIPE"
                })),
            ),
        ];

        for (kind, module, title, status, related) in notifications {
            sqlx::query(
                r#"
                INSERT INTO notifications (type, module, title, status, related_data)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(kind)
            .bind(module)
            .bind(title)
            .bind(status)
            .bind(related)
            .execute(&self.pool)
            .await?;
        }

        Ok(())
    }

    // -------------------------------------------------------------------------
    // PRODUCTS & MATERIALS
    // -------------------------------------------------------------------------

    pub async fn list_products(&self) -> Result<Vec<Product>> {
        let sql = format!("SELECT {} FROM products ORDER BY sku ASC", PRODUCT_COLUMNS);
        let products = sqlx::query_as::<_, Product>(&sql)
            .fetch_all(&self.pool)
            .await
            .context("Failed to fetch products")?;

        Ok(products)
    }

    pub async fn get_product(&self, id: Uuid) -> Result<Option<Product>> {
        let sql = format!("SELECT {} FROM products WHERE id = $1", PRODUCT_COLUMNS);
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch product")?;

        Ok(product)
    }

    pub async fn list_materials(&self) -> Result<Vec<RawMaterial>> {
        let sql = format!("SELECT {} FROM raw_materials ORDER BY name ASC", MATERIAL_COLUMNS);
        let materials = sqlx::query_as::<_, RawMaterial>(&sql)
            .fetch_all(&self.pool)
            .await
            .context("Failed to fetch raw materials")?;

        Ok(materials)
    }

    // -------------------------------------------------------------------------
    // PRODUCTION BATCHES
    // -------------------------------------------------------------------------

    pub async fn list_batches(&self) -> Result<Vec<ProductionBatch>> {
        let sql = format!(
            "SELECT {} FROM production_batches ORDER BY created_at DESC",
            BATCH_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .context("Failed to fetch production batches")?;

        Ok(skip_malformed("production_batch", rows.iter().map(batch_from_row)))
    }

    pub async fn get_batch(&self, id: Uuid) -> Result<Option<ProductionBatch>> {
        let sql = format!("SELECT {} FROM production_batches WHERE id = $1", BATCH_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch production batch")?;

        row.as_ref().map(batch_from_row).transpose()
    }

    // -------------------------------------------------------------------------
    // NOTIFICATIONS
    // -------------------------------------------------------------------------

    /// Newest first. Dismissed notifications are skipped unless asked for.
    pub async fn list_notifications(&self, include_dismissed: bool) -> Result<Vec<Notification>> {
        let sql = format!(
            r#"
            SELECT {}
            FROM notifications
            WHERE $1 OR status <> 'dismissed'
            ORDER BY created_at DESC
            "#,
            NOTIFICATION_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(include_dismissed)
            .fetch_all(&self.pool)
            .await
            .context("Failed to fetch notifications")?;

        Ok(skip_malformed("notification", rows.iter().map(notification_from_row)))
    }

    pub async fn get_notification(&self, id: Uuid) -> Result<Option<Notification>> {
        let sql = format!("SELECT {} FROM notifications WHERE id = $1", NOTIFICATION_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch notification")?;

        row.as_ref().map(notification_from_row).transpose()
    }

    /// Unread notifications in the given modules, or in all modules when
    /// `modules` is `None`. Rows without a module always count.
    pub async fn count_unread(&self, modules: Option<&[String]>) -> Result<i64> {
        let count: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*)
            FROM notifications
            WHERE status = 'unread'
              AND ($1::TEXT[] IS NULL OR module = '' OR module = ANY($1))
            "#,
        )
        .bind(modules.map(|m| m.to_vec()))
        .fetch_one(&self.pool)
        .await
        .context("Failed to count unread notifications")?;

        Ok(count.0)
    }

    /// Set a notification's status. Returns the updated record, or `None`
    /// when the id does not exist.
    pub async fn set_notification_status(
        &self,
        id: Uuid,
        status: NotificationStatus,
    ) -> Result<Option<Notification>> {
        let sql = format!(
            "UPDATE notifications SET status = $1 WHERE id = $2 RETURNING {}",
            NOTIFICATION_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(status.as_str())
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to update notification status")?;

        row.as_ref().map(notification_from_row).transpose()
    }

    // -------------------------------------------------------------------------
    // HEALTH CHECK
    // -------------------------------------------------------------------------

    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .is_ok()
    }
}

// -----------------------------------------------------------------------------
// ROW MAPPING
// -----------------------------------------------------------------------------
// Status columns are plain VARCHAR; they are parsed into enums here.

/// Keep the rows that mapped cleanly. One bad row (say a batch status added
/// upstream before this service knows it) must not fail the whole list.
fn skip_malformed<T>(kind: &str, rows: impl IntoIterator<Item = Result<T>>) -> Vec<T> {
    rows.into_iter()
        .filter_map(|row| match row {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(kind = kind, error = %format!("{:#}", e), "Skipping malformed row");
                None
            }
        })
        .collect()
}

fn batch_from_row(row: &PgRow) -> Result<ProductionBatch> {
    let status: String = row.try_get("status")?;
    let batch_number: String = row.try_get("batch_number")?;

    Ok(ProductionBatch {
        id: row.try_get("id")?,
        status: status
            .parse()
            .map_err(|e: String| anyhow::anyhow!("batch {}: {}", batch_number, e))?,
        batch_number,
        product_id: row.try_get("product_id")?,
        planned_quantity: row.try_get("planned_quantity")?,
        created_at: row.try_get("created_at")?,
    })
}

fn notification_from_row(row: &PgRow) -> Result<Notification> {
    let status: String = row.try_get("status")?;
    let related: Option<serde_json::Value> = row.try_get("related_data")?;

    Ok(Notification {
        id: row.try_get("id")?,
        kind: row.try_get("type")?,
        module: row.try_get("module")?,
        title: row.try_get("title")?,
        message: row.try_get("message")?,
        // the CHECK constraint keeps this parseable
        status: status.parse().ok(),
        related_data: related.and_then(RelatedData::from_value),
        created_at: row.try_get("created_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BatchStatus;

    #[test]
    fn test_skip_malformed_keeps_good_rows() {
        let rows: Vec<Result<&str>> = vec![
            Ok("B-001"),
            Err(anyhow::anyhow!("batch B-002: unknown batch status: on_hold")),
            Ok("B-003"),
        ];

        assert_eq!(skip_malformed("production_batch", rows), vec!["B-001", "B-003"]);
    }

    #[test]
    fn test_unknown_batch_status_is_a_row_error() {
        let rows = ["planned", "on_hold", "in_production"]
            .into_iter()
            .map(|s| s.parse::<BatchStatus>().map_err(anyhow::Error::msg));

        assert_eq!(
            skip_malformed("production_batch", rows),
            vec![BatchStatus::Planned, BatchStatus::InProgress]
        );
    }
}
