use thiserror::Error;

use crate::domain::{Quantity, ValidationError};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    #[error("Product already exists: {0}")]
    ProductAlreadyExists(String),

    #[error("Insufficient stock for {product}: on hand {on_hand}, requested {requested}")]
    InsufficientStock {
        product: String,
        on_hand: Quantity,
        requested: Quantity,
    },

    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationError),

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}
