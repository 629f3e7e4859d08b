// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use stockbook::application::InventoryService;
use tempfile::TempDir;

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(InventoryService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = InventoryService::init(db_path.to_str().unwrap()).await?;
    Ok((service, temp_dir))
}

/// Helper to parse a date string into DateTime<Utc>
pub fn parse_date(date_str: &str) -> DateTime<Utc> {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        .and_utc()
}

/// Test fixture: Standard product catalogue
pub struct StandardProducts;

impl StandardProducts {
    /// Create a small catalogue: Green Tea, Notebook, Stapler
    pub async fn create_basic(service: &InventoryService) -> Result<()> {
        service
            .create_product("Green Tea", 150, Some("500ml bottle".into()))
            .await?;
        service.create_product("Notebook", 320, None).await?;
        service.create_product("Stapler", 1200, None).await?;
        Ok(())
    }

    /// Stock a product with an initial purchase
    pub async fn stock(
        service: &InventoryService,
        product: &str,
        quantity: i64,
        date: DateTime<Utc>,
    ) -> Result<()> {
        service.record_purchase(product, quantity, date).await?;
        Ok(())
    }
}
