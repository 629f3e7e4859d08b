use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::Write;

use crate::application::{InventoryService, ProductLedger};
use crate::domain::{LedgerEntry, Product, Quantity};

/// Ledger snapshot for JSON export
#[derive(Debug, Clone, Serialize)]
pub struct LedgerSnapshot {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub product: Product,
    pub on_hand: Quantity,
    pub entries: Vec<LedgerEntry>,
}

/// Exporter for converting inventory data to various formats
pub struct Exporter<'a> {
    service: &'a InventoryService,
}

impl LedgerSnapshot {
    /// Snapshot an already reloaded ledger
    pub fn new(ledger: ProductLedger) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: Utc::now(),
            product: ledger.product,
            on_hand: ledger.on_hand,
            entries: ledger.entries,
        }
    }

    /// Write the snapshot as pretty-printed JSON
    pub fn write_json<W: Write>(&self, mut writer: W) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        writer.write_all(json.as_bytes())?;
        writer.flush()?;
        Ok(())
    }
}

impl<'a> Exporter<'a> {
    pub fn new(service: &'a InventoryService) -> Self {
        Self { service }
    }

    /// Export a product's ledger (most recent first) to CSV format
    pub async fn export_ledger_csv<W: Write>(
        &self,
        product_name: &str,
        writer: W,
    ) -> Result<usize> {
        let ledger = self.service.reload_ledger(product_name).await?;
        write_ledger_csv(&ledger.entries, writer)
    }

    /// Export a product's ledger as a JSON snapshot
    pub async fn export_ledger_json<W: Write>(
        &self,
        product_name: &str,
        writer: W,
    ) -> Result<LedgerSnapshot> {
        let ledger = self.service.reload_ledger(product_name).await?;
        let snapshot = LedgerSnapshot::new(ledger);
        snapshot.write_json(writer)?;
        Ok(snapshot)
    }

    /// Export the product catalogue with stock on hand to CSV format
    pub async fn export_products_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let products = self.service.list_products().await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record(["name", "price", "on_hand", "description"])?;

        let mut count = 0;
        for product in &products {
            let on_hand = self.service.stock_on_hand(&product.name).await?;
            csv_writer.write_record([
                &product.name,
                &product.price.to_string(),
                &on_hand.to_string(),
                &product.description.clone().unwrap_or_default(),
            ])?;
            count += 1;
        }

        csv_writer.flush()?;
        Ok(count)
    }
}

/// Write ledger entries to CSV in the order given
pub fn write_ledger_csv<W: Write>(entries: &[LedgerEntry], writer: W) -> Result<usize> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    csv_writer.write_record([
        "id",
        "kind",
        "date",
        "unit_price",
        "quantity",
        "line_value",
        "balance",
    ])?;

    for entry in entries {
        csv_writer.write_record([
            entry.id.to_string(),
            entry.kind.to_string(),
            entry.date.to_rfc3339(),
            entry.unit_price.to_string(),
            entry.quantity.to_string(),
            entry.line_value.to_string(),
            entry.balance.to_string(),
        ])?;
    }

    csv_writer.flush()?;
    Ok(entries.len())
}
