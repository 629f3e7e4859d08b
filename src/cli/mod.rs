use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use std::fs::File;
use std::io::{Read, Write, stdin, stdout};

use crate::application::{InventoryService, ProductLedger};
use crate::domain::{ProductUpdate, Quantity, UnitPrice, parse_date};
use crate::io::{
    Exporter, ImportOptions, Importer, LedgerSnapshot, ledger_from_json, write_ledger_csv,
    write_ledger_json,
};

/// Stockbook - Product Inventory Ledger
#[derive(Parser)]
#[command(name = "stockbook")]
#[command(about = "A local-first product inventory tool based on a purchase/sale ledger")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, env = "STOCKBOOK_DB", default_value = "stockbook.db")]
    pub database: String,

    /// Enable verbose (debug) logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Product catalogue commands
    #[command(subcommand)]
    Product(ProductCommands),

    /// Record a purchase (stock in)
    Purchase {
        /// Product name
        product: String,

        /// Number of units purchased
        quantity: Quantity,

        /// Date of the purchase (YYYY-MM-DD or RFC 3339, defaults to now)
        #[arg(long)]
        date: Option<String>,
    },

    /// Record a sale (stock out)
    Sell {
        /// Product name
        product: String,

        /// Number of units sold
        quantity: Quantity,

        /// Date of the sale (YYYY-MM-DD or RFC 3339, defaults to now)
        #[arg(long)]
        date: Option<String>,
    },

    /// Show a product's inventory ledger, most recent first
    Ledger {
        /// Product name
        product: String,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = LedgerFormat::Table)]
        format: LedgerFormat,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Compute a ledger from backend JSON transaction records
    Compute {
        /// Input file with a JSON array of records (stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Import sales from a CSV file with columns product,date,quantity
    Import {
        /// Input CSV file
        input: String,

        /// Preview without importing
        #[arg(long)]
        dry_run: bool,

        /// Validate without importing
        #[arg(long)]
        validate: bool,
    },

    /// List imported sales files
    Imports,
}

#[derive(Subcommand)]
pub enum ProductCommands {
    /// Create a new product
    Create {
        /// Product name (must be unique)
        name: String,

        /// Unit price
        #[arg(short, long)]
        price: UnitPrice,

        /// Description
        #[arg(short, long)]
        description: Option<String>,
    },

    /// List all products
    List {
        /// Print as CSV with stock on hand
        #[arg(long)]
        csv: bool,
    },

    /// Show detailed product information
    Show {
        /// Product name
        name: String,
    },

    /// Edit a product
    Update {
        /// Current product name
        name: String,

        /// New name
        #[arg(long = "name")]
        new_name: Option<String>,

        /// New unit price
        #[arg(short, long)]
        price: Option<UnitPrice>,

        /// New description (empty string clears it)
        #[arg(short, long)]
        description: Option<String>,
    },

    /// Delete a product and its purchase/sale history
    Delete {
        /// Product name
        name: String,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LedgerFormat {
    Table,
    Json,
    Csv,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Commands::Init => {
                InventoryService::init(&self.database).await?;
                println!("Database initialized: {}", self.database);
            }

            Commands::Product(product_cmd) => {
                let service = InventoryService::connect(&self.database).await?;
                run_product_command(&service, product_cmd).await?;
            }

            Commands::Purchase {
                product,
                quantity,
                date,
            } => {
                let service = InventoryService::connect(&self.database).await?;
                let date = parse_date_arg(date.as_deref())?;
                service.record_purchase(&product, quantity, date).await?;

                let ledger = service.reload_ledger(&product).await?;
                println!(
                    "Purchased {} x {} (on hand: {})",
                    quantity, ledger.product.name, ledger.on_hand
                );
            }

            Commands::Sell {
                product,
                quantity,
                date,
            } => {
                let service = InventoryService::connect(&self.database).await?;
                let date = parse_date_arg(date.as_deref())?;
                service.record_sale(&product, quantity, date).await?;

                let ledger = service.reload_ledger(&product).await?;
                println!(
                    "Sold {} x {} (on hand: {})",
                    quantity, ledger.product.name, ledger.on_hand
                );
            }

            Commands::Ledger {
                product,
                format,
                output,
            } => {
                let service = InventoryService::connect(&self.database).await?;
                run_ledger_command(&service, &product, format, output.as_deref()).await?;
            }

            Commands::Compute { input, output } => {
                let mut raw = String::new();
                open_input(input.as_deref())?
                    .read_to_string(&mut raw)
                    .context("Failed to read transaction input")?;

                // Only touch the output once the input is known to be valid
                let entries = ledger_from_json(&raw)?;
                write_ledger_json(&entries, open_output(output.as_deref())?)?;
                if output.is_some() {
                    eprintln!("Computed {} ledger entries", entries.len());
                }
            }

            Commands::Import {
                input,
                dry_run,
                validate,
            } => {
                let service = InventoryService::connect(&self.database).await?;
                run_import_command(&service, &input, dry_run, validate).await?;
            }

            Commands::Imports => {
                let service = InventoryService::connect(&self.database).await?;
                let files = service.list_sales_files().await?;
                if files.is_empty() {
                    println!("No sales files imported.");
                } else {
                    println!("{:<20} {:>6}  FILE", "IMPORTED", "ROWS");
                    println!("{}", "-".repeat(50));
                    for file in files {
                        println!(
                            "{:<20} {:>6}  {}",
                            file.imported_at.format("%Y-%m-%d %H:%M:%S"),
                            file.row_count,
                            file.file_name
                        );
                    }
                }
            }
        }

        Ok(())
    }
}

async fn run_product_command(service: &InventoryService, cmd: ProductCommands) -> Result<()> {
    match cmd {
        ProductCommands::Create {
            name,
            price,
            description,
        } => {
            let product = service.create_product(&name, price, description).await?;
            println!("Created product: {} (price {})", product.name, product.price);
        }

        ProductCommands::List { csv } => {
            if csv {
                Exporter::new(service).export_products_csv(stdout()).await?;
                return Ok(());
            }

            let products = service.list_products().await?;
            if products.is_empty() {
                println!("No products found.");
            } else {
                println!("{:<30} {:>10}  DESCRIPTION", "NAME", "PRICE");
                println!("{}", "-".repeat(60));
                for product in products {
                    println!(
                        "{:<30} {:>10}  {}",
                        truncate(&product.name, 30),
                        product.price,
                        truncate(product.description.as_deref().unwrap_or(""), 40)
                    );
                }
            }
        }

        ProductCommands::Show { name } => {
            let info = service.get_product_info(&name).await?;
            let product = &info.product;

            println!("Product: {}", product.name);
            println!("  ID:          {}", product.id);
            println!("  Price:       {}", product.price);
            if let Some(desc) = &product.description {
                println!("  Description: {}", desc);
            }
            println!(
                "  Created:     {}",
                product.created_at.format("%Y-%m-%d %H:%M:%S")
            );
            println!();
            println!("  On hand:     {}", info.on_hand);
            println!(
                "  Movements:   {} ({} purchases, {} sales)",
                info.purchase_count + info.sale_count,
                info.purchase_count,
                info.sale_count
            );
        }

        ProductCommands::Update {
            name,
            new_name,
            price,
            description,
        } => {
            let update = ProductUpdate {
                name: new_name,
                price,
                description: description.map(Some),
            };
            let product = service.update_product(&name, update).await?;
            println!("Updated product: {} (price {})", product.name, product.price);
        }

        ProductCommands::Delete { name } => {
            let product = service.delete_product(&name).await?;
            println!("Deleted product: {}", product.name);
        }
    }
    Ok(())
}

async fn run_ledger_command(
    service: &InventoryService,
    product: &str,
    format: LedgerFormat,
    output: Option<&str>,
) -> Result<()> {
    let ledger = service.reload_ledger(product).await?;
    let writer = open_output(output)?;

    let count = match format {
        LedgerFormat::Table => {
            print_ledger_table(&ledger, writer)?;
            return Ok(());
        }
        LedgerFormat::Json => {
            let snapshot = LedgerSnapshot::new(ledger);
            snapshot.write_json(writer)?;
            snapshot.entries.len()
        }
        LedgerFormat::Csv => write_ledger_csv(&ledger.entries, writer)?,
    };

    if output.is_some() {
        eprintln!("Exported {} ledger entries", count);
    }
    Ok(())
}

fn print_ledger_table(ledger: &ProductLedger, mut out: Box<dyn Write>) -> Result<()> {
    writeln!(
        out,
        "{} (price {}, on hand {})",
        ledger.product.name, ledger.product.price, ledger.on_hand
    )?;
    writeln!(out)?;

    if ledger.entries.is_empty() {
        writeln!(out, "No purchases or sales recorded.")?;
        return Ok(());
    }

    writeln!(
        out,
        "{:>4}  {:<8}  {:<16}  {:>10}  {:>8}  {:>12}  {:>8}",
        "#", "KIND", "DATE", "UNIT", "QTY", "VALUE", "STOCK"
    )?;
    writeln!(out, "{}", "-".repeat(78))?;
    for entry in &ledger.entries {
        writeln!(
            out,
            "{:>4}  {:<8}  {:<16}  {:>10}  {:>8}  {:>12}  {:>8}",
            entry.id,
            entry.kind.as_str(),
            entry.date.format("%Y-%m-%d %H:%M").to_string(),
            entry.unit_price,
            entry.quantity,
            entry.line_value,
            entry.balance
        )?;
    }
    out.flush()?;
    Ok(())
}

async fn run_import_command(
    service: &InventoryService,
    input: &str,
    dry_run: bool,
    validate: bool,
) -> Result<()> {
    let file =
        File::open(input).with_context(|| format!("Failed to open input file: {}", input))?;

    let options = ImportOptions {
        dry_run,
        validate_only: validate,
    };
    let result = Importer::new(service)
        .import_sales_csv(input, file, options)
        .await?;

    if !result.is_ok() {
        eprintln!("Import failed, nothing was imported:");
        for error in &result.errors {
            match &error.field {
                Some(field) => eprintln!("  line {} ({}): {}", error.line, field, error.error),
                None => eprintln!("  line {}: {}", error.line, error.error),
            }
        }
        anyhow::bail!("{} invalid row(s) in {}", result.errors.len(), input);
    }

    if dry_run || validate {
        println!("{} sale(s) would be imported from {}", result.imported, input);
    } else {
        println!("Imported {} sale(s) from {}", result.imported, input);
    }
    Ok(())
}

fn open_input(path: Option<&str>) -> Result<Box<dyn Read>> {
    Ok(match path {
        Some(path) => Box::new(
            File::open(path).with_context(|| format!("Failed to open input file: {}", path))?,
        ),
        None => Box::new(stdin()),
    })
}

fn open_output(path: Option<&str>) -> Result<Box<dyn Write>> {
    Ok(match path {
        Some(path) => Box::new(
            File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path))?,
        ),
        None => Box::new(stdout()),
    })
}

fn parse_date_arg(date: Option<&str>) -> Result<DateTime<Utc>> {
    match date {
        Some(date_str) => parse_date(date_str).with_context(|| {
            format!("Invalid date format '{}'. Use YYYY-MM-DD", date_str)
        }),
        None => Ok(Utc::now()),
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_len - 3).collect();
        format!("{}...", cut)
    }
}
