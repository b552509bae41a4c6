use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde::Serialize;

use crate::application::{AppError, InvoiceService};
use crate::domain::{LineItemInput, format_cents, parse_cents};
use crate::storage::StoreConfig;

/// InvoiceHub - GST invoicing ledger
#[derive(Parser)]
#[command(name = "invoicehub")]
#[command(about = "Manage clients, items and GST invoices in a local SQLite ledger")]
#[command(version)]
pub struct Cli {
    /// Database file path (overrides INVOICEHUB_DB, default invoicehub.db)
    #[arg(short, long)]
    pub database: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Client commands
    #[command(subcommand)]
    Client(ClientCommands),

    /// Item commands
    #[command(subcommand)]
    Item(ItemCommands),

    /// Invoice commands
    #[command(subcommand)]
    Invoice(InvoiceCommands),

    /// List the most recent invoices
    Invoices {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show an invoice with its line items
    Show {
        /// Invoice id
        id: i64,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Show dashboard totals
    Dashboard {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Verify invoice totals against their line items
    Check,
}

#[derive(Subcommand)]
pub enum ClientCommands {
    /// Register a client (reuses an existing one with the same name)
    Add { name: String },

    /// List all clients
    List {
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum ItemCommands {
    /// Register an item (an existing item keeps its GST rate)
    Add {
        name: String,

        /// GST percentage
        #[arg(short, long)]
        gst: f64,
    },

    /// List all items
    List {
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum InvoiceCommands {
    /// Create an invoice
    Create {
        /// Client name
        #[arg(short, long)]
        client: String,

        /// Line item as NAME:QTY:PRICE:GST (repeatable), e.g. "Widget:2:10.00:18"
        #[arg(short, long = "item", required = true)]
        items: Vec<String>,

        /// Invoice date (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<String>,

        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    fn store_config(&self) -> Result<StoreConfig> {
        let mut config = StoreConfig::from_env()?;
        if let Some(path) = &self.database {
            config.database_path = path.into();
        }
        Ok(config)
    }

    pub async fn run(self) -> Result<()> {
        let config = self.store_config()?;

        let service = match self.command {
            Commands::Init => {
                let service = InvoiceService::init(&config).await?;
                println!("Database initialized: {}", config.database_path.display());
                service
            }
            _ => InvoiceService::connect(&config).await?,
        };

        let result = match self.command {
            Commands::Init => Ok(()),
            Commands::Client(cmd) => run_client_command(&service, cmd).await,
            Commands::Item(cmd) => run_item_command(&service, cmd).await,
            Commands::Invoice(cmd) => run_invoice_command(&service, cmd).await,
            Commands::Invoices { json } => run_invoices_command(&service, json).await,
            Commands::Show { id, json } => run_show_command(&service, id, json).await,
            Commands::Dashboard { json } => run_dashboard_command(&service, json).await,
            Commands::Check => run_check_command(&service).await,
        };

        service.close().await;
        result
    }
}

async fn run_client_command(service: &InvoiceService, cmd: ClientCommands) -> Result<()> {
    match cmd {
        ClientCommands::Add { name } => {
            let id = service.get_or_create_client(&name).await?;
            println!("Client: {} (id {})", name, id);
        }
        ClientCommands::List { json } => {
            let clients = service.list_clients().await?;
            if json {
                return print_json(&clients);
            }
            if clients.is_empty() {
                println!("No clients found.");
            } else {
                println!("{:<6} {:<30} {:<10}", "ID", "NAME", "CREATED");
                println!("{}", "-".repeat(48));
                for client in clients {
                    println!(
                        "{:<6} {:<30} {:<10}",
                        client.id,
                        client.name,
                        client.created_at.format("%Y-%m-%d")
                    );
                }
            }
        }
    }
    Ok(())
}

async fn run_item_command(service: &InvoiceService, cmd: ItemCommands) -> Result<()> {
    match cmd {
        ItemCommands::Add { name, gst } => {
            let id = service.get_or_create_item(&name, gst).await?;
            if let Some(item) = service.get_item(&name).await? {
                if item.gst_percentage != gst {
                    eprintln!(
                        "Note: '{}' already exists with GST {}%; rate left unchanged",
                        item.name, item.gst_percentage
                    );
                }
            }
            println!("Item: {} (id {})", name, id);
        }
        ItemCommands::List { json } => {
            let items = service.list_items().await?;
            if json {
                return print_json(&items);
            }
            if items.is_empty() {
                println!("No items found.");
            } else {
                println!("{:<6} {:<30} {:>6}", "ID", "NAME", "GST %");
                println!("{}", "-".repeat(44));
                for item in items {
                    println!("{:<6} {:<30} {:>6}", item.id, item.name, item.gst_percentage);
                }
            }
        }
    }
    Ok(())
}

async fn run_invoice_command(service: &InvoiceService, cmd: InvoiceCommands) -> Result<()> {
    match cmd {
        InvoiceCommands::Create {
            client,
            items,
            date,
            json,
        } => {
            let line_items = items
                .iter()
                .map(|spec| parse_line_item(spec))
                .collect::<Result<Vec<_>, _>>()?;

            let summary = match date {
                Some(date_str) => {
                    let date = parse_date(&date_str)?;
                    service.create_invoice_on(&client, &line_items, date).await?
                }
                None => service.create_invoice(&client, &line_items).await?,
            };

            if json {
                return print_json(&summary);
            }
            println!(
                "Created invoice {} for {}: subtotal {}, GST {}, total {} (id {})",
                summary.invoice_number,
                client,
                format_cents(summary.subtotal),
                format_cents(summary.total_gst),
                format_cents(summary.grand_total),
                summary.id
            );
        }
    }
    Ok(())
}

async fn run_invoices_command(service: &InvoiceService, json: bool) -> Result<()> {
    let invoices = service.list_recent_invoices().await?;
    if json {
        return print_json(&invoices);
    }
    if invoices.is_empty() {
        println!("No invoices found.");
        return Ok(());
    }

    println!(
        "{:<6} {:<10} {:<10} {:<24} {:>12} {:<8}",
        "ID", "NUMBER", "DATE", "CLIENT", "TOTAL", "STATUS"
    );
    println!("{}", "-".repeat(75));
    for entry in invoices {
        let invoice = &entry.invoice;
        println!(
            "{:<6} {:<10} {:<10} {:<24} {:>12} {:<8}",
            invoice.id,
            invoice.invoice_number,
            invoice.invoice_date,
            entry.client_name,
            format_cents(invoice.grand_total),
            invoice.status
        );
    }
    Ok(())
}

async fn run_show_command(service: &InvoiceService, id: i64, json: bool) -> Result<()> {
    let detail = service.require_invoice(id).await?;
    if json {
        return print_json(&detail);
    }

    let invoice = &detail.invoice;
    println!("Invoice: {}", invoice.invoice_number);
    println!("  Client:  {}", detail.client_name);
    println!("  Date:    {}", invoice.invoice_date);
    println!("  Status:  {}", invoice.status);
    println!();
    println!(
        "  {:<24} {:>8} {:>12} {:>6} {:>12}",
        "ITEM", "QTY", "PRICE", "GST %", "TOTAL"
    );
    for line in &detail.items {
        println!(
            "  {:<24} {:>8} {:>12} {:>6} {:>12}",
            line.item_name,
            line.quantity,
            format_cents(line.unit_price),
            line.gst_percentage,
            format_cents(line.item_total)
        );
    }
    println!();
    println!("  {:<20} {:>12}", "Subtotal:", format_cents(invoice.subtotal));
    println!("  {:<20} {:>12}", "GST:", format_cents(invoice.total_gst));
    println!("  {:<20} {:>12}", "Grand total:", format_cents(invoice.grand_total));
    Ok(())
}

async fn run_dashboard_command(service: &InvoiceService, json: bool) -> Result<()> {
    let stats = service.dashboard_stats().await?;
    if json {
        return print_json(&stats);
    }
    println!("Invoices:       {}", stats.total_invoices);
    println!("Total revenue:  {}", format_cents(stats.total_revenue));
    println!("Pending amount: {}", format_cents(stats.pending_amount));
    Ok(())
}

async fn run_check_command(service: &InvoiceService) -> Result<()> {
    println!("Checking invoice integrity...\n");

    let report = service.check_integrity().await?;

    println!("Clients:    {}", report.client_count);
    println!("Items:      {}", report.item_count);
    println!("Invoices:   {}", report.invoice_count);
    println!("Line items: {}", report.line_item_count);
    println!();

    if report.is_healthy() {
        println!("Invoices are consistent.");
    } else {
        println!("Issues found:");
        for issue in &report.issues {
            println!("  - {}", issue);
        }
        anyhow::bail!("Invoice integrity check failed");
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Parse `NAME:QTY:PRICE:GST` into a line item with computed totals.
/// The name may itself contain colons.
pub fn parse_line_item(spec: &str) -> Result<LineItemInput, AppError> {
    let invalid = || AppError::InvalidLineItem(spec.to_string());

    let mut parts = spec.rsplitn(4, ':');
    let gst = parts.next().ok_or_else(invalid)?;
    let price = parts.next().ok_or_else(invalid)?;
    let quantity = parts.next().ok_or_else(invalid)?;
    let name = parts.next().ok_or_else(invalid)?.trim();

    if name.is_empty() {
        return Err(invalid());
    }
    let quantity: f64 = quantity.trim().parse().map_err(|_| invalid())?;
    let unit_price = parse_cents(price).map_err(|_| invalid())?;
    let gst_percentage: f64 = gst.trim().trim_end_matches('%').parse().map_err(|_| invalid())?;

    Ok(LineItemInput::compute(name, gst_percentage, quantity, unit_price))
}

fn parse_date(date_str: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .with_context(|| format!("Invalid date format '{}'. Use YYYY-MM-DD", date_str))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line_item() {
        let line = parse_line_item("Widget:2:10.00:18").unwrap();
        assert_eq!(line.name, "Widget");
        assert_eq!(line.quantity, 2.0);
        assert_eq!(line.unit_price, 1000);
        assert_eq!(line.gst_percentage, 18.0);
        assert_eq!(line.item_total, 2000);
        assert_eq!(line.gst_amount, 360);
    }

    #[test]
    fn test_parse_line_item_name_with_colon() {
        let line = parse_line_item("Support: hourly:1.5:40:18%").unwrap();
        assert_eq!(line.name, "Support: hourly");
        assert_eq!(line.item_total, 6000);
        assert_eq!(line.gst_amount, 1080);
    }

    #[test]
    fn test_parse_line_item_invalid() {
        assert!(matches!(
            parse_line_item("Widget:2:10.00"),
            Err(AppError::InvalidLineItem(_))
        ));
        assert!(parse_line_item(":2:10:18").is_err());
        assert!(parse_line_item("Widget:two:10:18").is_err());
        assert!(parse_line_item("Widget:2:ten:18").is_err());
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date("2025-12-19").unwrap(),
            NaiveDate::from_ymd_opt(2025, 12, 19).unwrap()
        );
        assert!(parse_date("19/12/2025").is_err());
    }
}
