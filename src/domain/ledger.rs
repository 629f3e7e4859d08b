use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{MovementKind, Quantity, Transaction, UnitPrice};

/// A transaction enriched with its position, line value and the stock balance
/// right after it was applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerEntry {
    /// 1-based position in chronological order, assigned per computation
    pub id: u64,
    pub kind: MovementKind,
    pub date: DateTime<Utc>,
    pub unit_price: UnitPrice,
    pub quantity: Quantity,
    /// unit_price * quantity
    pub line_value: i64,
    /// Stock on hand after this transaction
    pub balance: Quantity,
}

/// Compute the inventory ledger from chronologically ordered transactions.
/// The result is most-recent-first: entry ids run from N down to 1.
pub fn compute_ledger(transactions: &[Transaction]) -> Vec<LedgerEntry> {
    let mut balance: Quantity = 0;

    let mut entries: Vec<LedgerEntry> = transactions
        .iter()
        .zip(1..)
        .map(|(tx, id)| {
            balance += tx.signed_quantity();
            LedgerEntry {
                id,
                kind: tx.kind(),
                date: tx.date(),
                unit_price: tx.unit_price(),
                quantity: tx.quantity(),
                line_value: tx.line_value(),
                balance,
            }
        })
        .collect();

    entries.reverse();
    entries
}

/// Stock on hand after all transactions.
/// Stock = sum of inbound quantities - sum of outbound quantities
pub fn stock_on_hand(transactions: &[Transaction]) -> Quantity {
    transactions
        .iter()
        .fold(0, |balance, tx| balance + tx.signed_quantity())
}

/// Validate that a sale doesn't take more stock than is on hand.
pub fn validate_sale(on_hand: Quantity, requested: Quantity) -> Result<(), StockError> {
    if requested > on_hand {
        return Err(StockError::ExceedsStockOnHand { on_hand, requested });
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StockError {
    ExceedsStockOnHand { on_hand: Quantity, requested: Quantity },
}

impl std::fmt::Display for StockError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StockError::ExceedsStockOnHand { on_hand, requested } => {
                write!(
                    f,
                    "Selling {} units would exceed stock on hand ({} units)",
                    requested, on_hand
                )
            }
        }
    }
}

impl std::error::Error for StockError {}
