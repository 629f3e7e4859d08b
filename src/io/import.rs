use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::io::Read;
use tracing::warn;

use crate::application::{InventoryService, check_stock};
use crate::domain::{Product, ProductId, Quantity, SalesFile, StockMovement, parse_date};

/// Result of an import operation
#[derive(Debug, Clone)]
pub struct ImportResult {
    /// Rows imported (or that would be imported, for dry runs)
    pub imported: usize,
    pub errors: Vec<ImportError>,
    /// Provenance record, set once sales were actually written
    pub sales_file: Option<SalesFile>,
}

impl ImportResult {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Error that occurred during import
#[derive(Debug, Clone)]
pub struct ImportError {
    pub line: usize,
    pub field: Option<String>,
    pub error: String,
}

/// Options for import operations
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    pub dry_run: bool,
    pub validate_only: bool,
}

/// One row of a sales CSV file: `product,date,quantity`.
#[derive(Debug, Deserialize)]
struct SalesRow {
    product: String,
    date: String,
    quantity: Quantity,
}

/// Importer for loading sales into the inventory
pub struct Importer<'a> {
    service: &'a InventoryService,
}

impl<'a> Importer<'a> {
    pub fn new(service: &'a InventoryService) -> Self {
        Self { service }
    }

    /// Import sales from CSV.
    /// The file is all-or-nothing: if any row fails, nothing is written.
    pub async fn import_sales_csv<R: Read>(
        &self,
        file_name: &str,
        mut reader: R,
        options: ImportOptions,
    ) -> Result<ImportResult> {
        let mut input = String::new();
        reader
            .read_to_string(&mut input)
            .context("Failed to read sales CSV")?;

        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(input.as_bytes());
        let headers = csv_reader.headers()?.clone();
        let mut sales_file = SalesFile::new(file_name);
        let mut sales = Vec::new();
        let mut errors = Vec::new();

        let mut products: HashMap<String, Product> = HashMap::new();
        // Stock on hand per product, including the sales accepted so far
        let mut on_hand: HashMap<ProductId, Quantity> = HashMap::new();

        for result in csv_reader.records() {
            let (line, row) = match result {
                Ok(record) => {
                    let line = record.position().map_or(0, |pos| physical_line(&input, pos));
                    (line, record.deserialize::<SalesRow>(Some(&headers)))
                }
                Err(e) => {
                    let line = e.position().map_or(0, |pos| physical_line(&input, pos));
                    (line, Err(e))
                }
            };

            let row = match row {
                Ok(r) => r,
                Err(e) => {
                    errors.push(ImportError {
                        line,
                        field: None,
                        error: format!("CSV parse error: {}", e),
                    });
                    continue;
                }
            };

            let product = match products.get(&row.product) {
                Some(product) => product.clone(),
                None => match self.service.get_product(&row.product).await {
                    Ok(product) => {
                        let stock = self.service.stock_on_hand(&product.name).await?;
                        on_hand.insert(product.id, stock);
                        products.insert(row.product.clone(), product.clone());
                        product
                    }
                    Err(e) => {
                        errors.push(ImportError {
                            line,
                            field: Some("product".to_string()),
                            error: e.to_string(),
                        });
                        continue;
                    }
                },
            };

            let date = match parse_date(&row.date) {
                Ok(date) => date,
                Err(e) => {
                    errors.push(ImportError {
                        line,
                        field: Some("date".to_string()),
                        error: e.to_string(),
                    });
                    continue;
                }
            };

            let sale = match StockMovement::sale(product.id, row.quantity, date) {
                Ok(sale) => sale.with_sales_file(sales_file.id),
                Err(e) => {
                    errors.push(ImportError {
                        line,
                        field: Some("quantity".to_string()),
                        error: e.to_string(),
                    });
                    continue;
                }
            };

            let stock = on_hand.entry(product.id).or_insert(0);
            if let Err(e) = check_stock(&product, *stock, sale.quantity) {
                errors.push(ImportError {
                    line,
                    field: Some("quantity".to_string()),
                    error: e.to_string(),
                });
                continue;
            }
            *stock -= sale.quantity;

            sales.push(sale);
        }

        if !errors.is_empty() {
            warn!(file = file_name, errors = errors.len(), "sales import rejected");
            return Ok(ImportResult {
                imported: 0,
                errors,
                sales_file: None,
            });
        }

        // Skip actual import if dry run or validate only
        if options.dry_run || options.validate_only {
            return Ok(ImportResult {
                imported: sales.len(),
                errors,
                sales_file: None,
            });
        }

        sales_file.row_count = sales.len() as i64;
        self.service
            .record_sales_import(&sales_file, &sales)
            .await?;

        Ok(ImportResult {
            imported: sales.len(),
            errors,
            sales_file: Some(sales_file),
        })
    }
}

/// Line a record starts on. Record positions point just past the previous
/// terminator, so blank lines skipped before the record are added here.
fn physical_line(input: &str, position: &csv::Position) -> usize {
    let start = (position.byte() as usize).min(input.len());
    let skipped = input.as_bytes()[start..]
        .iter()
        .take_while(|&&b| b == b'\r' || b == b'\n')
        .filter(|&&b| b == b'\n')
        .count();
    position.line() as usize + skipped
}
