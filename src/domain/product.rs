use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{UnitPrice, ValidationError, validate_unit_price};

pub type ProductId = Uuid;

pub const MAX_NAME_LEN: usize = 100;
pub const MAX_DESCRIPTION_LEN: usize = 1000;

/// A product in the catalogue. Its price is the unit price applied to every
/// movement of the product when the ledger is computed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: UnitPrice,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Requested edits to a product. `None` leaves a field untouched;
/// `Some(None)` on the description clears it.
#[derive(Debug, Clone, Default)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub price: Option<UnitPrice>,
    pub description: Option<Option<String>>,
}

impl Product {
    pub fn new(
        name: impl Into<String>,
        price: UnitPrice,
        description: Option<String>,
    ) -> Result<Self, ValidationError> {
        let name = validate_product_name(&name.into())?;
        validate_unit_price(price)?;
        let description = validate_description(description)?;

        Ok(Self {
            id: Uuid::new_v4(),
            name,
            price,
            description,
            created_at: Utc::now(),
        })
    }

    /// Return a copy of this product with the update applied and re-validated.
    pub fn with_changes(&self, update: ProductUpdate) -> Result<Self, ValidationError> {
        let name = match update.name {
            Some(name) => validate_product_name(&name)?,
            None => self.name.clone(),
        };
        let price = update.price.unwrap_or(self.price);
        validate_unit_price(price)?;
        let description = match update.description {
            Some(description) => validate_description(description)?,
            None => self.description.clone(),
        };

        Ok(Self {
            name,
            price,
            description,
            ..self.clone()
        })
    }
}

fn validate_product_name(name: &str) -> Result<String, ValidationError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: MAX_NAME_LEN,
        });
    }
    Ok(name.to_string())
}

fn validate_description(description: Option<String>) -> Result<Option<String>, ValidationError> {
    let Some(description) = description else {
        return Ok(None);
    };
    let description = description.trim();
    if description.is_empty() {
        return Ok(None);
    }
    if description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(ValidationError::TooLong {
            field: "description".to_string(),
            max: MAX_DESCRIPTION_LEN,
        });
    }
    Ok(Some(description.to_string()))
}
