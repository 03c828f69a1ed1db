use std::str::FromStr;

use chrono::{NaiveDate, Utc};
use clap::Subcommand;
use rust_decimal::Decimal;
use serde_json::json;

use super::open_store;
use crate::cli::api_client::{InvoiceRequest, LineRequest};
use crate::cli::render::render_invoice;
use crate::cli::store::{ClientStore, SyncState};
use crate::cli::utils::*;
use crate::cli::OutputFormat;
use crate::database::models::Invoice;
use crate::totals::{MAX_AMOUNT, MAX_QUANTITY, MAX_TAX_RATE, MAX_UNIT_PRICE};
use crate::types::InvoiceStatus;

#[derive(Subcommand)]
pub enum InvoiceCommands {
    #[command(about = "List invoices, newest first")]
    List {
        #[arg(long, help = "unpaid, paid or overdue")]
        status: Option<InvoiceStatus>,
    },

    #[command(about = "Create an invoice")]
    Create {
        #[arg(long, help = "Invoice number, unique within the tenant")]
        number: String,
        #[arg(long, help = "Client ID (or its first characters)")]
        client: String,
        #[arg(long, help = "Issue date YYYY-MM-DD (default today)")]
        date: Option<NaiveDate>,
        #[arg(long, help = "Due date YYYY-MM-DD (default 30 days after the issue date)")]
        due: Option<NaiveDate>,
        #[arg(long, default_value = "0", help = "Tax rate in percent")]
        tax_rate: Decimal,
        #[arg(long, default_value = "0", help = "Discount amount")]
        discount: Decimal,
        #[arg(long)]
        notes: Option<String>,
        #[arg(long = "item", required = true, help = "Line item as DESCRIPTION:QTY:UNIT_PRICE (repeatable)")]
        items: Vec<LineArg>,
    },

    #[command(about = "Show one invoice")]
    Show {
        #[arg(help = "Invoice ID or number")]
        invoice: String,
        #[arg(long, help = "Print the plain-text invoice for sending")]
        export: bool,
    },

    #[command(about = "Change an invoice's status")]
    Mark {
        #[arg(help = "Invoice ID or number")]
        invoice: String,
        #[arg(help = "unpaid, paid or overdue")]
        status: InvoiceStatus,
    },

    #[command(about = "Delete an invoice")]
    Delete {
        #[arg(help = "Invoice ID or number")]
        invoice: String,
    },
}

/// `DESCRIPTION:QTY:UNIT_PRICE`. The description may itself contain colons.
#[derive(Debug, Clone, PartialEq)]
pub struct LineArg(pub LineRequest);

impl FromStr for LineArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.rsplitn(3, ':');
        let (Some(price), Some(quantity), Some(description)) = (parts.next(), parts.next(), parts.next()) else {
            return Err(format!("expected DESCRIPTION:QTY:UNIT_PRICE, got '{}'", s));
        };

        let description = description.trim();
        if description.is_empty() {
            return Err("line item description is empty".to_string());
        }
        let quantity: i64 = quantity
            .trim()
            .parse()
            .map_err(|_| format!("invalid quantity '{}'", quantity))?;
        if !(1..=MAX_QUANTITY).contains(&quantity) {
            return Err(format!("quantity must be between 1 and {}", MAX_QUANTITY));
        }
        let unit_price = Decimal::from_str(price.trim()).map_err(|_| format!("invalid unit price '{}'", price))?;
        if unit_price.is_sign_negative() {
            return Err("unit price cannot be negative".to_string());
        }
        if unit_price > MAX_UNIT_PRICE {
            return Err(format!("unit price must be at most {}", MAX_UNIT_PRICE));
        }

        Ok(LineArg(LineRequest {
            description: description.to_string(),
            quantity,
            unit_price,
        }))
    }
}

pub async fn handle(cmd: InvoiceCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        InvoiceCommands::List { status } => {
            let store = open_store().await?;
            let rows: Vec<_> = store
                .invoices()
                .iter()
                .filter(|t| status.map_or(true, |s| t.record.status == s))
                .collect();

            if rows.is_empty() {
                return output_empty_collection(&output_format, "invoices", "No invoices found");
            }

            match output_format {
                OutputFormat::Json => print_json(&json!({ "invoices": rows }))?,
                OutputFormat::Text => {
                    println!(
                        " {:<14} {:<22} {:<11} {:<11} {:<8} {:>12}",
                        "NUMBER", "CLIENT", "DATE", "DUE", "STATUS", "TOTAL"
                    );
                    println!("{}", "-".repeat(84));
                    for row in rows {
                        let invoice = &row.record;
                        let client = store.client(invoice.client_id).map(|c| c.name.as_str()).unwrap_or("?");
                        println!(
                            "{}{:<14} {:<22} {:<11} {:<11} {:<8} {:>12}",
                            sync_marker(row.state),
                            invoice.invoice_number,
                            client,
                            invoice.date.format("%Y-%m-%d").to_string(),
                            invoice.due_date.format("%Y-%m-%d").to_string(),
                            invoice.status.as_str(),
                            format!("{:.2}", invoice.total)
                        );
                    }
                }
            }
            Ok(())
        }
        InvoiceCommands::Create { number, client, date, due, tax_rate, discount, notes, items } => {
            anyhow::ensure!(
                !tax_rate.is_sign_negative() && tax_rate <= MAX_TAX_RATE,
                "--tax-rate must be between 0 and {}",
                MAX_TAX_RATE
            );
            anyhow::ensure!(
                !discount.is_sign_negative() && discount <= MAX_AMOUNT,
                "--discount must be between 0 and {}",
                MAX_AMOUNT
            );

            let mut store = open_store().await?;
            let client_id = store
                .clients()
                .iter()
                .map(|t| &t.record)
                .find(|c| c.id.to_string() == client || c.id.simple().to_string().starts_with(&client.to_lowercase()))
                .map(|c| c.id)
                .ok_or_else(|| anyhow::anyhow!("Client '{}' not found", client))?;

            let request = InvoiceRequest {
                invoice_number: number,
                client_id,
                date: date.unwrap_or_else(|| Utc::now().date_naive()),
                due_date: due,
                tax_rate,
                discount,
                notes,
                line_items: items.into_iter().map(|LineArg(line)| line).collect(),
            };
            let created = store.create_invoice(request).await?;

            match created.state {
                SyncState::Failed => output_sync_failure(
                    &output_format,
                    &format!("Invoice {} saved locally but not on the server", created.record.invoice_number),
                    created.error.as_deref(),
                ),
                _ => output_success(
                    &output_format,
                    &format!(
                        "Invoice {} created, total {:.2}",
                        created.record.invoice_number, created.record.total
                    ),
                    Some(json!({ "invoice": created.record })),
                ),
            }
        }
        InvoiceCommands::Show { invoice, export } => {
            let store = open_store().await?;
            let invoice = find_invoice(&store, &invoice)?;

            if export {
                let client = store
                    .client(invoice.client_id)
                    .ok_or_else(|| anyhow::anyhow!("Client for invoice {} is not available", invoice.invoice_number))?;
                print!("{}", render_invoice(invoice, client));
                return Ok(());
            }

            match output_format {
                OutputFormat::Json => print_json(invoice),
                OutputFormat::Text => {
                    print_summary(&store, invoice);
                    Ok(())
                }
            }
        }
        InvoiceCommands::Mark { invoice, status } => {
            let mut store = open_store().await?;
            let id = find_invoice(&store, &invoice)?.id;
            let Some(marked) = store.mark_invoice(id, status).await? else {
                anyhow::bail!("Invoice '{}' not found", invoice);
            };

            match marked.state {
                SyncState::Failed => output_sync_failure(
                    &output_format,
                    &format!("Invoice {} marked {} locally only", marked.record.invoice_number, status),
                    marked.error.as_deref(),
                ),
                _ => output_success(
                    &output_format,
                    &format!("Invoice {} marked {}", marked.record.invoice_number, status),
                    Some(json!({ "invoice": marked.record })),
                ),
            }
        }
        InvoiceCommands::Delete { invoice } => {
            let mut store = open_store().await?;
            let target = find_invoice(&store, &invoice)?;
            let (id, number) = (target.id, target.invoice_number.clone());

            match store.delete_invoice(id).await? {
                SyncState::Failed => output_sync_failure(
                    &output_format,
                    &format!("Invoice {} removed locally but the server refused the deletion", number),
                    store.notifications().entries().first().map(|n| n.message.as_str()),
                ),
                _ => output_success(
                    &output_format,
                    &format!("Invoice {} deleted", number),
                    Some(json!({ "id": id })),
                ),
            }
        }
    }
}

fn find_invoice<'a>(store: &'a ClientStore, key: &str) -> anyhow::Result<&'a Invoice> {
    store
        .invoice(key)
        .ok_or_else(|| anyhow::anyhow!("Invoice '{}' not found", key))
}

fn print_summary(store: &ClientStore, invoice: &Invoice) {
    let client = store.client(invoice.client_id).map(|c| c.name.as_str()).unwrap_or("?");
    println!("Invoice:  {}", invoice.invoice_number);
    println!("Client:   {}", client);
    println!("Status:   {}", invoice.status);
    println!("Date:     {}   Due: {}", invoice.date, invoice.due_date);
    for item in &invoice.line_items {
        println!("  {} x {} @ {:.2} = {:.2}", item.quantity, item.description, item.unit_price, item.total);
    }
    println!("Subtotal: {:.2}", invoice.subtotal);
    println!("Tax:      {:.2} ({}%)", invoice.tax, invoice.tax_rate.normalize());
    if !invoice.discount.is_zero() {
        println!("Discount: {:.2}", invoice.discount);
    }
    println!("Total:    {:.2}", invoice.total);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_arg_splits_from_the_right() {
        let LineArg(line) = "Consulting: phase 1:3:99.50".parse().unwrap();
        assert_eq!(line.description, "Consulting: phase 1");
        assert_eq!(line.quantity, 3);
        assert_eq!(line.unit_price, Decimal::new(9950, 2));
    }

    #[test]
    fn line_arg_rejects_bad_numbers() {
        assert!("Design:0:10".parse::<LineArg>().is_err());
        assert!("Design:two:10".parse::<LineArg>().is_err());
        assert!("Design:1:-5".parse::<LineArg>().is_err());
        assert!("Design".parse::<LineArg>().is_err());
        assert!("Design:9000000000000000000:10000000000".parse::<LineArg>().is_err());
        assert!("Design:1:1000000001".parse::<LineArg>().is_err());
    }
}
