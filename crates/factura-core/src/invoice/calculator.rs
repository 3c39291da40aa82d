//! Invoice calculation with exact decimal arithmetic.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::models::config::{BillingConfig, FacturaConfig};
use crate::models::draft::RequestOptions;
use crate::models::invoice::{
    DocumentKind, FinalInvoice, InvoiceHeader, InvoiceLine, InvoiceMetadata, InvoiceTotals,
    Issuer, NormalizedDraft,
};

use super::ids::IdentifierSource;
use super::rules::amounts::round2;
use super::rules::document::is_tax_id_type;

/// Prices normalized drafts into final invoices.
#[derive(Debug, Clone)]
pub struct InvoiceCalculator {
    billing: BillingConfig,
    issuer: Issuer,
}

impl InvoiceCalculator {
    /// Create a calculator with the given configuration.
    pub fn new(config: &FacturaConfig) -> Self {
        Self {
            billing: config.billing.clone(),
            issuer: config.issuer.clone(),
        }
    }

    /// Build the final invoice.
    ///
    /// `warnings` is stored as the invoice audit trail. Amounts that cannot be
    /// represented are set to zero and warned about at the end of it.
    pub fn build_invoice<S>(
        &self,
        normalized: &NormalizedDraft,
        source_text: &str,
        mut warnings: Vec<String>,
        options: &RequestOptions,
        ids: &mut S,
    ) -> FinalInvoice
    where
        S: IdentifierSource + ?Sized,
    {
        let tax_rate = options.tax_rate.unwrap_or(self.billing.tax_rate);

        let number = format!("{:06}", ids.invoice_number());
        let issue_date = options
            .issue_date
            .unwrap_or_else(|| Utc::now().date_naive());
        let internal_id = internal_id(&self.billing.id_prefix, issue_date, &number);

        let document_kind = if is_tax_id_type(&normalized.customer.document_type) {
            DocumentKind::Invoice
        } else {
            DocumentKind::Receipt
        };

        let items: Vec<InvoiceLine> = normalized
            .items
            .iter()
            .enumerate()
            .map(|(idx, item)| {
                let index = idx as u32 + 1;
                let amount = line_amount(item.quantity, item.unit_price).unwrap_or_else(|| {
                    warn!("Line {} amount overflows; set to 0", index);
                    warnings.push(line_out_of_range_warning(index));
                    round2(Decimal::ZERO)
                });
                InvoiceLine {
                    index,
                    description: item.description.clone(),
                    quantity: item.quantity,
                    unit_price: item.unit_price,
                    amount,
                }
            })
            .collect();

        let totals = compute_totals(&items, tax_rate).unwrap_or_else(|| {
            warn!("Invoice totals overflow; set to 0");
            warnings.push(WARN_TOTALS_OUT_OF_RANGE.to_string());
            InvoiceTotals {
                net: round2(Decimal::ZERO),
                tax_rate,
                tax: round2(Decimal::ZERO),
                total: round2(Decimal::ZERO),
            }
        });

        debug!(
            "Built {} {} with {} lines, total {} {}",
            document_kind.label(),
            internal_id,
            items.len(),
            totals.total,
            normalized.currency
        );

        FinalInvoice {
            header: InvoiceHeader {
                internal_id,
                document_kind,
                series: self.billing.series.clone(),
                number,
                issue_date,
                currency: normalized.currency.clone(),
            },
            issuer: self.issuer.clone(),
            customer: normalized.customer.clone(),
            items,
            totals,
            metadata: InvoiceMetadata {
                source_text: source_text.to_string(),
                warnings,
            },
        }
    }
}

/// `{prefix}-{YYYYMMDD}-{number}`.
fn internal_id(prefix: &str, issue_date: NaiveDate, number: &str) -> String {
    format!("{}-{}-{}", prefix, issue_date.format("%Y%m%d"), number)
}

/// Warning recorded when the invoice totals could not be represented.
pub const WARN_TOTALS_OUT_OF_RANGE: &str = "Invoice totals are out of range; set to 0.";

/// Warning recorded when a line amount could not be represented.
pub fn line_out_of_range_warning(index: u32) -> String {
    format!("Amount of line {} is out of range; set to 0.", index)
}

/// `round2(quantity * unit_price)`, or `None` on overflow.
pub fn line_amount(quantity: Decimal, unit_price: Decimal) -> Option<Decimal> {
    quantity.checked_mul(unit_price).map(round2)
}

/// Sum already rounded line amounts into the totals block.
///
/// `None` when the sum or the tax overflows.
pub fn compute_totals(lines: &[InvoiceLine], tax_rate: Decimal) -> Option<InvoiceTotals> {
    let net_sum = lines
        .iter()
        .try_fold(Decimal::ZERO, |acc, line| acc.checked_add(line.amount))?;
    totals_from_net_sum(net_sum, tax_rate)
}

/// Totals for an unrounded net sum.
///
/// The tax base is the unrounded sum, not the displayed net; the two only
/// differ if a line amount ever carries more than two decimals.
pub fn totals_from_net_sum(net_sum: Decimal, tax_rate: Decimal) -> Option<InvoiceTotals> {
    let net = round2(net_sum);
    let tax = round2(net_sum.checked_mul(tax_rate)?);

    Some(InvoiceTotals {
        net,
        tax_rate,
        tax,
        total: net.checked_add(round2(tax))?,
    })
}
