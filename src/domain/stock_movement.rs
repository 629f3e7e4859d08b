use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{
    MovementKind, ProductId, Quantity, SalesFileId, Transaction, UnitPrice, ValidationError,
    validate_quantity,
};

pub type MovementId = Uuid;

/// A recorded purchase or sale of a product.
/// Movements are immutable; stock levels are always derived from them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockMovement {
    pub id: MovementId,
    pub product_id: ProductId,
    pub kind: MovementKind,
    /// Always positive; direction comes from `kind`
    pub quantity: Quantity,
    /// When the purchase or sale happened
    pub date: DateTime<Utc>,
    /// When we recorded it
    pub recorded_at: DateTime<Utc>,
    /// Set for sales loaded from an imported sales file
    pub sales_file_id: Option<SalesFileId>,
}

impl StockMovement {
    pub fn new(
        product_id: ProductId,
        kind: MovementKind,
        quantity: Quantity,
        date: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        validate_quantity(quantity)?;
        Ok(Self {
            id: Uuid::new_v4(),
            product_id,
            kind,
            quantity,
            date,
            recorded_at: Utc::now(),
            sales_file_id: None,
        })
    }

    pub fn purchase(
        product_id: ProductId,
        quantity: Quantity,
        date: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        Self::new(product_id, MovementKind::Inbound, quantity, date)
    }

    pub fn sale(
        product_id: ProductId,
        quantity: Quantity,
        date: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        Self::new(product_id, MovementKind::Outbound, quantity, date)
    }

    pub fn with_sales_file(mut self, sales_file_id: SalesFileId) -> Self {
        self.sales_file_id = Some(sales_file_id);
        self
    }

    /// Raw ledger transaction for this movement, priced at `unit_price`.
    pub fn to_transaction(&self, unit_price: UnitPrice) -> Result<Transaction, ValidationError> {
        Transaction::new(self.kind, self.date, unit_price, self.quantity)
    }
}
