use std::fmt::Write;

use rust_decimal::Decimal;

use crate::database::models::{Client, Invoice, LineItem};
use crate::totals::{self, LineInput};

const WIDTH: usize = 64;

fn money(value: Decimal) -> String {
    format!("{:.2}", value.round_dp(2))
}

/// Plain-text invoice for `invoicer invoices show --export`.
///
/// Figures come from [`totals::compute`] over the line items, not from the
/// stored totals, so the printout always adds up.
pub fn render_invoice(invoice: &Invoice, client: &Client) -> String {
    let lines: Vec<LineInput> = invoice.line_items.iter().map(LineItem::input).collect();
    let figures = totals::compute(&lines, invoice.tax_rate, invoice.discount);

    let mut out = String::new();
    let rule = "=".repeat(WIDTH);
    let thin = "-".repeat(WIDTH);

    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "{:<32}{:>32}", "INVOICE", invoice.invoice_number);
    let _ = writeln!(out, "{:<32}{:>32}", "", invoice.status.as_str().to_uppercase());
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "Issue Date: {}", invoice.date.format("%Y-%m-%d"));
    let _ = writeln!(out, "Due Date:   {}", invoice.due_date.format("%Y-%m-%d"));
    let _ = writeln!(out);

    let _ = writeln!(out, "Bill To:");
    let _ = writeln!(out, "  {}", client.name);
    let details = [
        client.company.as_deref(),
        Some(client.email.as_str()),
        client.phone.as_deref(),
        client.address.as_deref(),
    ];
    for detail in details.into_iter().flatten() {
        let _ = writeln!(out, "  {}", detail);
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "{:<34}{:>6}{:>12}{:>12}", "Description", "Qty", "Price", "Total");
    let _ = writeln!(out, "{thin}");
    for (item, line_total) in invoice.line_items.iter().zip(&figures.line_totals) {
        let _ = writeln!(
            out,
            "{:<34}{:>6}{:>12}{:>12}",
            truncate(&item.description, 33),
            item.quantity,
            money(item.unit_price),
            money(*line_total)
        );
    }
    let _ = writeln!(out, "{thin}");

    let _ = writeln!(out, "{:>52}{:>12}", "Subtotal:", money(figures.subtotal));
    let _ = writeln!(out, "{:>52}{:>12}", format!("Tax ({}%):", invoice.tax_rate.normalize()), money(figures.tax_amount));
    if !invoice.discount.is_zero() {
        let _ = writeln!(out, "{:>52}{:>12}", "Discount:", format!("-{}", money(invoice.discount)));
    }
    let _ = writeln!(out, "{:>52}{:>12}", "Total:", money(figures.total));

    if let Some(notes) = invoice.notes.as_deref().filter(|n| !n.trim().is_empty()) {
        let _ = writeln!(out);
        let _ = writeln!(out, "Notes:");
        let _ = writeln!(out, "  {}", notes);
    }

    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "Thank you for your business!");
    out
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let mut cut: String = text.chars().take(max.saturating_sub(1)).collect();
        cut.push('~');
        cut
    }
}
