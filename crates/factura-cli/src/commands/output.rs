//! Output formats shared by `process` and `batch`.

use factura_core::invoice::rules::format_amount;
use factura_core::models::invoice::FinalInvoice;

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output, one row per line item
    Csv,
    /// Plain text summary
    Text,
}

impl OutputFormat {
    /// File extension used when writing to a directory.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
            OutputFormat::Text => "txt",
        }
    }
}

pub fn format_invoice(invoice: &FinalInvoice, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string(invoice)?),
        OutputFormat::Csv => format_csv(invoice),
        OutputFormat::Text => Ok(format_text(invoice)),
    }
}

fn format_csv(invoice: &FinalInvoice) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "internal_id",
        "document_kind",
        "issue_date",
        "customer_document",
        "customer_name",
        "line",
        "description",
        "quantity",
        "unit_price",
        "amount",
        "net",
        "tax",
        "total",
        "currency",
    ])?;

    for line in &invoice.items {
        wtr.write_record([
            invoice.header.internal_id.as_str(),
            invoice.header.document_kind.label(),
            &invoice.header.issue_date.to_string(),
            &invoice.customer.document_number,
            &invoice.customer.name,
            &line.index.to_string(),
            &line.description,
            &line.quantity.to_string(),
            &line.unit_price.to_string(),
            &line.amount.to_string(),
            &invoice.totals.net.to_string(),
            &invoice.totals.tax.to_string(),
            &invoice.totals.total.to_string(),
            &invoice.header.currency,
        ])?;
    }

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_text(invoice: &FinalInvoice) -> String {
    let currency = &invoice.header.currency;
    let mut output = String::new();

    output.push_str(&format!(
        "{} {}-{} ({})\n",
        invoice.header.document_kind.label(),
        invoice.header.series,
        invoice.header.number,
        invoice.header.internal_id
    ));
    output.push_str(&format!("Date: {}\n", invoice.header.issue_date));
    output.push('\n');

    output.push_str("Issuer:\n");
    output.push_str(&format!("  {}\n", invoice.issuer.legal_name));
    output.push_str(&format!("  RUC: {}\n", invoice.issuer.ruc));
    output.push_str(&format!("  {}\n", invoice.issuer.address));
    output.push('\n');

    output.push_str("Customer:\n");
    output.push_str(&format!("  {}\n", invoice.customer.name));
    output.push_str(&format!(
        "  {}: {}\n",
        invoice.customer.document_type, invoice.customer.document_number
    ));
    if let Some(address) = &invoice.customer.address {
        output.push_str(&format!("  {}\n", address));
    }
    output.push('\n');

    output.push_str("Items:\n");
    for line in &invoice.items {
        output.push_str(&format!(
            "  {}. {} x {} @ {} = {}\n",
            line.index,
            line.description,
            line.quantity,
            line.unit_price,
            format_amount(line.amount)
        ));
    }
    output.push('\n');

    output.push_str("Totals:\n");
    output.push_str(&format!("  Net:   {} {}\n", format_amount(invoice.totals.net), currency));
    output.push_str(&format!(
        "  IGV:   {} {} ({}%)\n",
        format_amount(invoice.totals.tax),
        currency,
        (invoice.totals.tax_rate * rust_decimal::Decimal::ONE_HUNDRED).normalize()
    ));
    output.push_str(&format!("  Total: {} {}\n", format_amount(invoice.totals.total), currency));

    output
}
