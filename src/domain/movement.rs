use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::ValidationError;

pub type Quantity = i64;

/// Direction of a stock movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MovementKind {
    /// Purchases and receipts - stock increases
    #[serde(rename = "purchase")]
    Inbound,
    /// Sales and shipments - stock decreases
    #[serde(rename = "sale")]
    Outbound,
}

impl MovementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementKind::Inbound => "purchase",
            MovementKind::Outbound => "sale",
        }
    }

    /// Numeric marker used by the inventory backend (1 = purchase, 2 = sale).
    pub fn code(&self) -> i64 {
        match self {
            MovementKind::Inbound => 1,
            MovementKind::Outbound => 2,
        }
    }

    pub fn from_code(code: i64) -> Result<Self, ValidationError> {
        match code {
            1 => Ok(MovementKind::Inbound),
            2 => Ok(MovementKind::Outbound),
            other => Err(ValidationError::UnknownMovementKind(other.to_string())),
        }
    }

    /// Quantity with the sign this movement applies to the stock balance.
    pub fn signed(&self, quantity: Quantity) -> Quantity {
        match self {
            MovementKind::Inbound => quantity,
            MovementKind::Outbound => -quantity,
        }
    }
}

impl FromStr for MovementKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "1" | "purchase" | "inbound" => Ok(MovementKind::Inbound),
            "2" | "sale" | "sales" | "outbound" => Ok(MovementKind::Outbound),
            _ => Err(ValidationError::UnknownMovementKind(s.to_string())),
        }
    }
}

impl std::fmt::Display for MovementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
