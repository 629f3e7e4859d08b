use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::{Row, Sqlite, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::domain::{
    MovementKind, Product, ProductId, Quantity, SalesFile, StockMovement, validate_sale,
};

use super::MIGRATION_001_INITIAL;

/// Repository for persisting and querying products and their stock movements.
pub struct Repository {
    pool: SqlitePool,
}

/// Timestamps are stored with a fixed width so that string order is time order.
fn encode_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_timestamp(s: &str, what: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)
        .with_context(|| format!("Invalid {} timestamp", what))?
        .with_timezone(&Utc))
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database at the given URL.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        debug!("migrations applied");
        Ok(())
    }

    /// Initialize a new database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    // ========================
    // Product operations
    // ========================

    /// Save a new product.
    pub async fn save_product(&self, product: &Product) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO products (id, name, price, description, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(product.id.to_string())
        .bind(&product.name)
        .bind(product.price)
        .bind(&product.description)
        .bind(encode_timestamp(product.created_at))
        .execute(&self.pool)
        .await
        .context("Failed to save product")?;

        debug!(product = %product.name, id = %product.id, "saved product");
        Ok(())
    }

    /// Overwrite the mutable fields of an existing product.
    pub async fn update_product(&self, product: &Product) -> Result<()> {
        sqlx::query("UPDATE products SET name = ?, price = ?, description = ? WHERE id = ?")
            .bind(&product.name)
            .bind(product.price)
            .bind(&product.description)
            .bind(product.id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to update product")?;

        debug!(product = %product.name, id = %product.id, "updated product");
        Ok(())
    }

    /// Delete a product together with its purchase and sale history.
    pub async fn delete_product(&self, id: ProductId) -> Result<()> {
        let id_str = id.to_string();
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        for statement in [
            "DELETE FROM sales WHERE product_id = ?",
            "DELETE FROM purchases WHERE product_id = ?",
            "DELETE FROM products WHERE id = ?",
        ] {
            sqlx::query(statement)
                .bind(&id_str)
                .execute(&mut *tx)
                .await
                .context("Failed to delete product")?;
        }

        tx.commit().await.context("Failed to commit product deletion")?;
        debug!(id = %id, "deleted product");
        Ok(())
    }

    /// Get a product by name.
    pub async fn get_product_by_name(&self, name: &str) -> Result<Option<Product>> {
        let row = sqlx::query(
            "SELECT id, name, price, description, created_at FROM products WHERE name = ?",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch product by name")?;

        row.as_ref().map(Self::row_to_product).transpose()
    }

    /// List all products, ordered by name.
    pub async fn list_products(&self) -> Result<Vec<Product>> {
        let rows = sqlx::query(
            "SELECT id, name, price, description, created_at FROM products ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list products")?;

        rows.iter().map(Self::row_to_product).collect()
    }

    fn row_to_product(row: &sqlx::sqlite::SqliteRow) -> Result<Product> {
        let id_str: String = row.get("id");
        let created_at_str: String = row.get("created_at");

        Ok(Product {
            id: Uuid::parse_str(&id_str).context("Invalid product ID")?,
            name: row.get("name"),
            price: row.get("price"),
            description: row.get("description"),
            created_at: decode_timestamp(&created_at_str, "created_at")?,
        })
    }

    // ========================
    // Movement operations
    // ========================

    /// Save a purchase or sale.
    pub async fn save_movement(&self, movement: &StockMovement) -> Result<()> {
        Self::insert_movement(&self.pool, movement).await?;
        debug!(
            product_id = %movement.product_id,
            kind = %movement.kind,
            quantity = movement.quantity,
            "saved movement"
        );
        Ok(())
    }

    async fn insert_movement<'e, E>(executor: E, movement: &StockMovement) -> Result<()>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        let query = match movement.kind {
            MovementKind::Inbound => sqlx::query::<Sqlite>(
                r#"
                INSERT INTO purchases (id, product_id, quantity, purchase_date, recorded_at)
                VALUES (?, ?, ?, ?, ?)
                "#,
            ),
            MovementKind::Outbound => sqlx::query::<Sqlite>(
                r#"
                INSERT INTO sales (id, product_id, quantity, sales_date, recorded_at, sales_file_id)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            ),
        };

        let mut query = query
            .bind(movement.id.to_string())
            .bind(movement.product_id.to_string())
            .bind(movement.quantity)
            .bind(encode_timestamp(movement.date))
            .bind(encode_timestamp(movement.recorded_at));
        if movement.kind == MovementKind::Outbound {
            query = query.bind(movement.sales_file_id.map(|id| id.to_string()));
        }

        query
            .execute(executor)
            .await
            .context("Failed to save movement")?;
        Ok(())
    }

    /// List every purchase and sale of a product in chronological order.
    pub async fn list_movements_for_product(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<StockMovement>> {
        let id_str = product_id.to_string();

        let rows = sqlx::query(
            r#"
            SELECT id, product_id, 1 AS kind, quantity, purchase_date AS date, recorded_at,
                   NULL AS sales_file_id
            FROM purchases
            WHERE product_id = ?
            UNION ALL
            SELECT id, product_id, 2 AS kind, quantity, sales_date AS date, recorded_at,
                   sales_file_id
            FROM sales
            WHERE product_id = ?
            ORDER BY date, recorded_at
            "#,
        )
        .bind(&id_str)
        .bind(&id_str)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list movements for product")?;

        rows.iter().map(Self::row_to_movement).collect()
    }

    /// Save a sale, checking it against the stock on hand in the same transaction.
    /// Fails with [`StockError`] when the sale exceeds that stock.
    pub async fn save_sale(&self, sale: &StockMovement) -> Result<()> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        let on_hand = Self::query_stock_on_hand(&mut *tx, sale.product_id).await?;
        validate_sale(on_hand, sale.quantity)?;
        Self::insert_movement(&mut *tx, sale).await?;

        tx.commit().await.context("Failed to commit sale")?;
        debug!(
            product_id = %sale.product_id,
            quantity = sale.quantity,
            on_hand,
            "saved sale"
        );
        Ok(())
    }

    /// Compute stock on hand using SQL aggregation.
    pub async fn stock_on_hand(&self, product_id: ProductId) -> Result<Quantity> {
        Self::query_stock_on_hand(&self.pool, product_id).await
    }

    async fn query_stock_on_hand<'e, E>(executor: E, product_id: ProductId) -> Result<Quantity>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        let id_str = product_id.to_string();

        let row = sqlx::query::<Sqlite>(
            r#"
            SELECT
                (SELECT COALESCE(SUM(quantity), 0) FROM purchases WHERE product_id = ?) -
                (SELECT COALESCE(SUM(quantity), 0) FROM sales WHERE product_id = ?) AS on_hand
            "#,
        )
        .bind(&id_str)
        .bind(&id_str)
        .fetch_one(executor)
        .await
        .context("Failed to compute stock on hand")?;

        Ok(row.get("on_hand"))
    }

    /// Count purchases and sales for a product.
    pub async fn count_movements_for_product(&self, product_id: ProductId) -> Result<(i64, i64)> {
        let id_str = product_id.to_string();

        let row = sqlx::query(
            r#"
            SELECT
                (SELECT COUNT(*) FROM purchases WHERE product_id = ?) AS purchases,
                (SELECT COUNT(*) FROM sales WHERE product_id = ?) AS sales
            "#,
        )
        .bind(&id_str)
        .bind(&id_str)
        .fetch_one(&self.pool)
        .await
        .context("Failed to count movements")?;

        Ok((row.get("purchases"), row.get("sales")))
    }

    fn row_to_movement(row: &sqlx::sqlite::SqliteRow) -> Result<StockMovement> {
        let id_str: String = row.get("id");
        let product_id_str: String = row.get("product_id");
        let kind_code: i64 = row.get("kind");
        let date_str: String = row.get("date");
        let recorded_at_str: String = row.get("recorded_at");
        let sales_file_str: Option<String> = row.get("sales_file_id");

        Ok(StockMovement {
            id: Uuid::parse_str(&id_str).context("Invalid movement ID")?,
            product_id: Uuid::parse_str(&product_id_str).context("Invalid product ID")?,
            kind: MovementKind::from_code(kind_code)?,
            quantity: row.get("quantity"),
            date: decode_timestamp(&date_str, "movement date")?,
            recorded_at: decode_timestamp(&recorded_at_str, "recorded_at")?,
            sales_file_id: sales_file_str
                .map(|s| Uuid::parse_str(&s))
                .transpose()
                .context("Invalid sales file ID")?,
        })
    }

    // ========================
    // Sales file operations
    // ========================

    /// Save an imported sales file and all of its sales atomically.
    pub async fn save_sales_import(
        &self,
        sales_file: &SalesFile,
        sales: &[StockMovement],
    ) -> Result<()> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        sqlx::query(
            r#"
            INSERT INTO sales_files (id, file_name, row_count, imported_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(sales_file.id.to_string())
        .bind(&sales_file.file_name)
        .bind(sales_file.row_count)
        .bind(encode_timestamp(sales_file.imported_at))
        .execute(&mut *tx)
        .await
        .context("Failed to save sales file")?;

        for sale in sales {
            Self::insert_movement(&mut *tx, sale).await?;
        }

        tx.commit().await.context("Failed to commit sales import")?;
        debug!(file = %sales_file.file_name, rows = sales.len(), "saved sales import");
        Ok(())
    }

    /// List imported sales files, most recent first.
    pub async fn list_sales_files(&self) -> Result<Vec<SalesFile>> {
        let rows = sqlx::query(
            r#"
            SELECT id, file_name, row_count, imported_at
            FROM sales_files
            ORDER BY imported_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list sales files")?;

        rows.iter()
            .map(|row| {
                let id_str: String = row.get("id");
                let imported_at_str: String = row.get("imported_at");
                Ok(SalesFile {
                    id: Uuid::parse_str(&id_str).context("Invalid sales file ID")?,
                    file_name: row.get("file_name"),
                    row_count: row.get("row_count"),
                    imported_at: decode_timestamp(&imported_at_str, "imported_at")?,
                })
            })
            .collect()
    }
}
