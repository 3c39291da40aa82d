//! Normalized drafts and final invoice records.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::draft::{Draft, DraftCustomer, DraftItem};
use crate::invoice::rules::amounts::round2;

/// A draft after validation, repair and fallback extraction.
///
/// Every numeric field satisfies its bound: quantities are strictly positive
/// and unit prices are non-negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedDraft {
    /// Resolved currency code.
    pub currency: String,

    /// Fully populated customer.
    pub customer: Customer,

    /// Validated line items, in draft order.
    pub items: Vec<NormalizedItem>,

    /// Inconsistencies reported by the draft, carried through unchanged.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inconsistencies: Vec<String>,

    /// Observations, carried through unchanged.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observations: Option<String>,
}

impl NormalizedDraft {
    /// Turn the normalized structure back into a draft with every field set.
    pub fn to_draft(&self, raw_text: impl Into<String>) -> Draft {
        Draft {
            raw_text: raw_text.into(),
            customer: DraftCustomer {
                name: Some(self.customer.name.clone()),
                document_type: Some(self.customer.document_type.clone()),
                document_number: Some(self.customer.document_number.clone()),
                address: self.customer.address.clone(),
            },
            suggested_kind: None,
            currency: Some(self.currency.clone()),
            items: self
                .items
                .iter()
                .map(|item| DraftItem::new(item.description.clone(), item.quantity, item.unit_price))
                .collect(),
            observations: self.observations.clone(),
            inconsistencies: self.inconsistencies.clone(),
        }
    }
}

/// The customer an invoice is issued to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    /// Identifier type (RUC, DNI, ...).
    pub document_type: String,

    /// Identifier value.
    pub document_number: String,

    /// Display / legal name.
    pub name: String,

    pub address: Option<String>,
}

/// A validated line item, not yet priced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedItem {
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
}

impl NormalizedItem {
    pub fn new(description: impl Into<String>, quantity: Decimal, unit_price: Decimal) -> Self {
        Self {
            description: description.into(),
            quantity,
            unit_price,
        }
    }
}

/// The fully priced invoice record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalInvoice {
    /// Invoice header information.
    pub header: InvoiceHeader,

    /// Issuer (seller), taken from configuration.
    pub issuer: Issuer,

    /// Customer (buyer).
    pub customer: Customer,

    /// Priced line items.
    pub items: Vec<InvoiceLine>,

    /// Invoice totals.
    pub totals: InvoiceTotals,

    /// Source text and warnings.
    pub metadata: InvoiceMetadata,
}

/// Invoice header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceHeader {
    /// Internal identifier, `{prefix}-{YYYYMMDD}-{number}`.
    pub internal_id: String,

    pub document_kind: DocumentKind,

    pub series: String,

    /// Zero-padded document number.
    pub number: String,

    pub issue_date: NaiveDate,

    pub currency: String,
}

/// Type of document issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentKind {
    /// Tax invoice, issued to customers identified by RUC.
    #[serde(rename = "FACTURA")]
    Invoice,
    /// Sales receipt, for any other customer.
    #[serde(rename = "BOLETA")]
    Receipt,
}

impl DocumentKind {
    /// Label printed on the document.
    pub fn label(&self) -> &'static str {
        match self {
            DocumentKind::Invoice => "FACTURA",
            DocumentKind::Receipt => "BOLETA",
        }
    }
}

/// The issuing company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Issuer {
    pub ruc: String,
    pub legal_name: String,
    pub address: String,
}

impl Default for Issuer {
    fn default() -> Self {
        Self {
            ruc: "20123456789".to_string(),
            legal_name: "Mi Empresa SAC".to_string(),
            address: "Av. Ficticia 123, Lima".to_string(),
        }
    }
}

/// A priced line on the invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceLine {
    /// 1-based position.
    pub index: u32,
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    /// `round2(quantity * unit_price)`.
    pub amount: Decimal,
}

/// Invoice totals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvoiceTotals {
    pub net: Decimal,
    pub tax_rate: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

/// Provenance of the invoice.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvoiceMetadata {
    /// Original request text, verbatim.
    pub source_text: String,

    /// Every automatic correction, in the order it was applied.
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl FinalInvoice {
    /// Check the invoice for internal consistency and return any issues found.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.header.internal_id.is_empty() {
            issues.push("Missing internal identifier".to_string());
        }

        if self.items.is_empty() {
            issues.push("No line items".to_string());
        }

        for (position, line) in self.items.iter().enumerate() {
            let expected_index = position as u32 + 1;
            if line.index != expected_index {
                issues.push(format!(
                    "Line {} has index {}",
                    expected_index, line.index
                ));
            }

            if line.quantity <= Decimal::ZERO {
                issues.push(format!("Line {} has a non-positive quantity", line.index));
            }

            if line.unit_price < Decimal::ZERO {
                issues.push(format!("Line {} has a negative unit price", line.index));
            }

            match line.quantity.checked_mul(line.unit_price).map(round2) {
                Some(expected_amount) if line.amount != expected_amount => {
                    issues.push(format!(
                        "Line {} amount ({}) differs from quantity x price ({})",
                        line.index, line.amount, expected_amount
                    ));
                }
                Some(_) => {}
                None => issues.push(format!(
                    "Line {} quantity x price is out of range",
                    line.index
                )),
            }
        }

        let line_sum = self
            .items
            .iter()
            .try_fold(Decimal::ZERO, |acc, line| acc.checked_add(line.amount));
        match line_sum.map(round2) {
            Some(calculated_net) if calculated_net != self.totals.net => {
                issues.push(format!(
                    "Line item net total ({}) differs from totals ({})",
                    calculated_net, self.totals.net
                ));
            }
            Some(_) => {}
            None => issues.push("Line item net total is out of range".to_string()),
        }

        match self.totals.net.checked_add(self.totals.tax) {
            Some(expected_total) if expected_total != self.totals.total => {
                issues.push(format!(
                    "Total ({}) differs from net plus tax ({})",
                    self.totals.total, expected_total
                ));
            }
            Some(_) => {}
            None => issues.push("Net plus tax is out of range".to_string()),
        }

        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_invoice() -> FinalInvoice {
        FinalInvoice {
            header: InvoiceHeader {
                internal_id: "INV-20240115-000042".to_string(),
                document_kind: DocumentKind::Invoice,
                series: "F001".to_string(),
                number: "000042".to_string(),
                issue_date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
                currency: "PEN".to_string(),
            },
            issuer: Issuer::default(),
            customer: Customer {
                document_type: "RUC".to_string(),
                document_number: "20987654321".to_string(),
                name: "ACME SAC".to_string(),
                address: None,
            },
            items: vec![InvoiceLine {
                index: 1,
                description: "Consultoria".to_string(),
                quantity: Decimal::from(2),
                unit_price: Decimal::new(10000, 2),
                amount: Decimal::new(20000, 2),
            }],
            totals: InvoiceTotals {
                net: Decimal::new(20000, 2),
                tax_rate: Decimal::new(18, 2),
                tax: Decimal::new(3600, 2),
                total: Decimal::new(23600, 2),
            },
            metadata: InvoiceMetadata::default(),
        }
    }

    #[test]
    fn test_validate_consistent_invoice() {
        assert!(sample_invoice().validate().is_empty());
    }

    #[test]
    fn test_validate_reports_tampered_totals() {
        let mut invoice = sample_invoice();
        invoice.items[0].amount = Decimal::new(19999, 2);
        invoice.totals.total = Decimal::new(23700, 2);

        let issues = invoice.validate();
        assert_eq!(issues.len(), 3);
        assert!(issues[0].starts_with("Line 1 amount"));
    }

    #[test]
    fn test_validate_reports_unrepresentable_line() {
        let mut invoice = sample_invoice();
        invoice.items[0].quantity = Decimal::from(1_000_000_000_000_000_i64);
        invoice.items[0].unit_price = Decimal::from(1_000_000_000_000_000_i64);

        let issues = invoice.validate();
        assert_eq!(issues, vec!["Line 1 quantity x price is out of range".to_string()]);
    }

    #[test]
    fn test_document_kind_serializes_as_label() {
        assert_eq!(
            serde_json::to_string(&DocumentKind::Receipt).unwrap(),
            "\"BOLETA\""
        );
        assert_eq!(DocumentKind::Invoice.label(), "FACTURA");
    }

    #[test]
    fn test_to_draft_keeps_every_field() {
        let normalized = NormalizedDraft {
            currency: "PEN".to_string(),
            customer: sample_invoice().customer,
            items: vec![NormalizedItem::new("Soporte", Decimal::ONE, Decimal::from(50))],
            inconsistencies: vec!["ambiguo".to_string()],
            observations: Some("urgente".to_string()),
        };

        let draft = normalized.to_draft("texto");
        assert_eq!(draft.raw_text, "texto");
        assert_eq!(draft.currency.as_deref(), Some("PEN"));
        assert_eq!(draft.items.len(), 1);
        assert_eq!(draft.inconsistencies, normalized.inconsistencies);
        assert_eq!(draft.observations, normalized.observations);
    }
}
