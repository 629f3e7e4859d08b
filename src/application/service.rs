use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::domain::{
    LedgerEntry, Product, ProductUpdate, Quantity, SalesFile, StockError, StockMovement,
    Transaction, UnitPrice, compute_ledger, stock_on_hand, validate_sale,
};
use crate::storage::Repository;

use super::AppError;

/// Application service providing high-level operations for the inventory.
/// This is the primary interface for any client (CLI, API, TUI, etc.).
pub struct InventoryService {
    repo: Repository,
}

/// Detailed product information
pub struct ProductInfo {
    pub product: Product,
    pub on_hand: Quantity,
    pub purchase_count: i64,
    pub sale_count: i64,
}

/// A product's inventory ledger, freshly computed from its movement history.
pub struct ProductLedger {
    pub product: Product,
    /// Most recent first
    pub entries: Vec<LedgerEntry>,
    pub on_hand: Quantity,
}

impl InventoryService {
    /// Create a new inventory service with the given repository.
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Initialize a new database at the given path.
    pub async fn init(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let repo = Repository::init(&db_url).await?;
        Ok(Self::new(repo))
    }

    /// Connect to an existing database.
    pub async fn connect(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}", database_path);
        let repo = Repository::connect(&db_url).await?;
        Ok(Self::new(repo))
    }

    // ========================
    // Product operations
    // ========================

    /// Create a new product.
    pub async fn create_product(
        &self,
        name: &str,
        price: UnitPrice,
        description: Option<String>,
    ) -> Result<Product, AppError> {
        let product = Product::new(name, price, description)?;

        if self.repo.get_product_by_name(&product.name).await?.is_some() {
            return Err(AppError::ProductAlreadyExists(product.name));
        }

        self.repo.save_product(&product).await?;
        info!(product = %product.name, price = product.price, "created product");
        Ok(product)
    }

    /// Get a product by name. Surrounding whitespace is ignored, as on create.
    pub async fn get_product(&self, name: &str) -> Result<Product, AppError> {
        let name = name.trim();
        self.repo
            .get_product_by_name(name)
            .await?
            .ok_or_else(|| AppError::ProductNotFound(name.to_string()))
    }

    /// Get detailed product information.
    pub async fn get_product_info(&self, name: &str) -> Result<ProductInfo, AppError> {
        let product = self.get_product(name).await?;
        let on_hand = self.repo.stock_on_hand(product.id).await?;
        let (purchase_count, sale_count) =
            self.repo.count_movements_for_product(product.id).await?;

        Ok(ProductInfo {
            product,
            on_hand,
            purchase_count,
            sale_count,
        })
    }

    /// List all products.
    pub async fn list_products(&self) -> Result<Vec<Product>, AppError> {
        Ok(self.repo.list_products().await?)
    }

    /// Edit a product's name, price or description.
    pub async fn update_product(
        &self,
        name: &str,
        update: ProductUpdate,
    ) -> Result<Product, AppError> {
        let current = self.get_product(name).await?;
        let updated = current.with_changes(update)?;

        if updated.name != current.name {
            if let Some(other) = self.repo.get_product_by_name(&updated.name).await? {
                return Err(AppError::ProductAlreadyExists(other.name));
            }
        }

        self.repo.update_product(&updated).await?;
        info!(product = %updated.name, price = updated.price, "updated product");
        Ok(updated)
    }

    /// Delete a product and its movement history.
    pub async fn delete_product(&self, name: &str) -> Result<Product, AppError> {
        let product = self.get_product(name).await?;
        self.repo.delete_product(product.id).await?;
        info!(product = %product.name, "deleted product");
        Ok(product)
    }

    // ========================
    // Movement operations
    // ========================

    /// Record a purchase (stock comes in).
    pub async fn record_purchase(
        &self,
        product_name: &str,
        quantity: Quantity,
        date: DateTime<Utc>,
    ) -> Result<StockMovement, AppError> {
        let product = self.get_product(product_name).await?;
        let movement = StockMovement::purchase(product.id, quantity, date)?;

        self.repo.save_movement(&movement).await?;
        info!(product = %product.name, quantity, "recorded purchase");
        Ok(movement)
    }

    /// Record a sale (stock goes out). A sale may not exceed the stock on hand.
    pub async fn record_sale(
        &self,
        product_name: &str,
        quantity: Quantity,
        date: DateTime<Utc>,
    ) -> Result<StockMovement, AppError> {
        let product = self.get_product(product_name).await?;
        let movement = StockMovement::sale(product.id, quantity, date)?;

        self.repo
            .save_sale(&movement)
            .await
            .map_err(|e| match e.downcast::<StockError>() {
                Ok(stock) => stock_rejected(&product, stock),
                Err(e) => AppError::Database(e),
            })?;
        info!(product = %product.name, quantity, "recorded sale");
        Ok(movement)
    }

    /// Stock on hand for a product.
    pub async fn stock_on_hand(&self, product_name: &str) -> Result<Quantity, AppError> {
        let product = self.get_product(product_name).await?;
        Ok(self.repo.stock_on_hand(product.id).await?)
    }

    /// Raw ledger transactions for a product, oldest first.
    /// Every movement is priced at the product's current unit price.
    pub async fn list_transactions(
        &self,
        product_name: &str,
    ) -> Result<Vec<Transaction>, AppError> {
        let product = self.get_product(product_name).await?;
        self.transactions_for(&product).await
    }

    async fn transactions_for(&self, product: &Product) -> Result<Vec<Transaction>, AppError> {
        let movements = self.repo.list_movements_for_product(product.id).await?;
        movements
            .iter()
            .map(|m| m.to_transaction(product.price).map_err(AppError::from))
            .collect()
    }

    /// Re-read a product's movement history and recompute its ledger from scratch.
    /// Hosts call this after any mutation they want reflected.
    pub async fn reload_ledger(&self, product_name: &str) -> Result<ProductLedger, AppError> {
        let product = self.get_product(product_name).await?;
        let transactions = self.transactions_for(&product).await?;

        let on_hand = stock_on_hand(&transactions);
        let entries = compute_ledger(&transactions);

        Ok(ProductLedger {
            product,
            entries,
            on_hand,
        })
    }

    // ========================
    // Sales imports
    // ========================

    /// Persist a sales file and its sales in one transaction.
    pub async fn record_sales_import(
        &self,
        sales_file: &SalesFile,
        sales: &[StockMovement],
    ) -> Result<(), AppError> {
        self.repo.save_sales_import(sales_file, sales).await?;
        info!(file = %sales_file.file_name, rows = sales.len(), "imported sales file");
        Ok(())
    }

    /// List imported sales files, most recent first.
    pub async fn list_sales_files(&self) -> Result<Vec<SalesFile>, AppError> {
        Ok(self.repo.list_sales_files().await?)
    }
}

/// Reject a sale that would take more than `on_hand` units of `product`.
pub fn check_stock(
    product: &Product,
    on_hand: Quantity,
    requested: Quantity,
) -> Result<(), AppError> {
    validate_sale(on_hand, requested).map_err(|e| stock_rejected(product, e))
}

fn stock_rejected(product: &Product, error: StockError) -> AppError {
    let StockError::ExceedsStockOnHand { on_hand, requested } = error;
    warn!(product = %product.name, on_hand, requested, "rejected sale");
    AppError::InsufficientStock {
        product: product.name.clone(),
        on_hand,
        requested,
    }
}
