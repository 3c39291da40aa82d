//! Draft-to-invoice pipeline: normalize, then price.

use serde::Serialize;
use tracing::info;

use crate::error::Result;
use crate::models::config::FacturaConfig;
use crate::models::draft::{Draft, InvoiceRequest, RequestOptions};
use crate::models::invoice::{FinalInvoice, NormalizedDraft};

use super::calculator::InvoiceCalculator;
use super::ids::{IdentifierSource, RandomSource};
use super::normalizer::DraftNormalizer;

/// Everything produced for one draft.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessedInvoice {
    /// The draft as received.
    pub draft: Draft,
    /// The draft after normalization.
    pub normalized: NormalizedDraft,
    /// The priced invoice.
    pub invoice: FinalInvoice,
    /// Same list as `invoice.metadata.warnings`.
    pub warnings: Vec<String>,
}

/// Runs the normalizer and the calculator with a shared identifier source.
pub struct InvoicePipeline<S = RandomSource> {
    normalizer: DraftNormalizer,
    calculator: InvoiceCalculator,
    ids: S,
}

impl InvoicePipeline<RandomSource> {
    /// Create a pipeline with random identifiers.
    pub fn new(config: &FacturaConfig) -> Self {
        Self {
            normalizer: DraftNormalizer::new(config),
            calculator: InvoiceCalculator::new(config),
            ids: RandomSource::new(),
        }
    }
}

impl<S: IdentifierSource> InvoicePipeline<S> {
    /// Replace the identifier source.
    pub fn with_source<T: IdentifierSource>(self, ids: T) -> InvoicePipeline<T> {
        InvoicePipeline {
            normalizer: self.normalizer,
            calculator: self.calculator,
            ids,
        }
    }

    /// Process a draft, using its raw text as the invoice source text.
    pub fn process(&mut self, draft: Draft, options: &RequestOptions) -> ProcessedInvoice {
        let source_text = draft.raw_text.clone();
        self.run(draft, &source_text, options)
    }

    /// Process the draft the upstream model produced for `request`.
    pub fn process_request(&mut self, request: &InvoiceRequest, draft: Draft) -> Result<ProcessedInvoice> {
        request.validate()?;
        Ok(self.run(draft, &request.text, &request.options))
    }

    /// Process a request without a model: the text extractor prices it alone.
    pub fn process_text(&mut self, request: &InvoiceRequest) -> Result<ProcessedInvoice> {
        request.validate()?;
        let draft = Draft::from_text(request.text.clone());
        Ok(self.run(draft, &request.text, &request.options))
    }

    fn run(&mut self, draft: Draft, source_text: &str, options: &RequestOptions) -> ProcessedInvoice {
        info!(
            "Processing draft with {} items from {} characters of text",
            draft.items.len(),
            source_text.len()
        );

        let (normalized, mut warnings) = self.normalizer.normalize(&draft, options, &mut self.ids);
        warnings.extend(draft.inconsistencies.iter().cloned());

        let invoice = self.calculator.build_invoice(
            &normalized,
            source_text,
            warnings,
            options,
            &mut self.ids,
        );
        let warnings = invoice.metadata.warnings.clone();

        info!(
            "Issued {} {} with {} warnings",
            invoice.header.document_kind.label(),
            invoice.header.internal_id,
            warnings.len()
        );

        ProcessedInvoice {
            draft,
            normalized,
            invoice,
            warnings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FacturaError;
    use crate::invoice::ids::FixedSource;
    use crate::invoice::normalizer::{
        amount_out_of_range_warning, non_canonical_document_warning, invalid_price_warning,
        WARN_DETERMINISTIC_EXTRACTION, WARN_SIMULATED_DOCUMENT,
    };
    use crate::models::draft::{DraftCustomer, DraftItem};
    use crate::models::invoice::DocumentKind;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn pipeline() -> InvoicePipeline<FixedSource> {
        InvoicePipeline::new(&FacturaConfig::default()).with_source(FixedSource::new("0000000001", 7))
    }

    fn options() -> RequestOptions {
        RequestOptions::default().with_issue_date(NaiveDate::from_ymd_opt(2025, 3, 9).unwrap())
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_fallback_end_to_end() {
        let request = InvoiceRequest::new("2 horas a 150 soles y 1 licencia a 800").with_options(options());

        let processed = pipeline().process_text(&request).unwrap();
        let invoice = &processed.invoice;

        assert_eq!(
            processed.warnings,
            vec![
                WARN_SIMULATED_DOCUMENT.to_string(),
                WARN_DETERMINISTIC_EXTRACTION.to_string(),
            ]
        );
        assert_eq!(invoice.header.internal_id, "INV-20250309-000007");
        assert_eq!(invoice.header.document_kind, DocumentKind::Invoice);
        assert_eq!(invoice.items.len(), 2);
        assert_eq!(invoice.items[0].index, 1);
        assert_eq!(invoice.items[1].index, 2);
        assert_eq!(invoice.items[0].amount, dec("300.00"));
        assert_eq!(invoice.items[1].amount, dec("800.00"));
        assert_eq!(invoice.totals.net, dec("1100.00"));
        assert_eq!(invoice.totals.tax, dec("198.00"));
        assert_eq!(invoice.totals.total, dec("1298.00"));
        assert_eq!(invoice.metadata.source_text, request.text);
        assert!(invoice.validate().is_empty());
    }

    #[test]
    fn test_inconsistencies_follow_normalizer_warnings() {
        let draft = Draft {
            raw_text: "Factura a ACME por 1 licencia".to_string(),
            customer: DraftCustomer {
                document_number: Some("123456789".to_string()),
                document_type: Some("DNI".to_string()),
                ..DraftCustomer::default()
            },
            items: vec![
                DraftItem::new("Licencia", Decimal::ONE, dec("120")),
                DraftItem::new("Soporte", Decimal::ONE, dec("-5")),
            ],
            inconsistencies: vec!["Precio de soporte ambiguo".to_string(), "Sin moneda".to_string()],
            ..Draft::default()
        };

        let processed = pipeline().process(draft, &options());

        assert_eq!(
            processed.warnings,
            vec![
                non_canonical_document_warning(),
                invalid_price_warning(2),
                "Precio de soporte ambiguo".to_string(),
                "Sin moneda".to_string(),
            ]
        );
        assert_eq!(processed.invoice.metadata.warnings, processed.warnings);
        assert_eq!(processed.invoice.header.document_kind, DocumentKind::Receipt);
        assert_eq!(processed.invoice.metadata.source_text, "Factura a ACME por 1 licencia");
        assert_eq!(processed.invoice.totals.total, dec("141.60"));
    }

    #[test]
    fn test_process_request_uses_request_text() {
        let request = InvoiceRequest::new("Dos licencias para ACME").with_options(options());
        let draft = Draft {
            raw_text: "texto reescrito por el modelo".to_string(),
            customer: DraftCustomer {
                document_number: Some("20987654321".to_string()),
                ..DraftCustomer::default()
            },
            items: vec![DraftItem::new("Licencia", dec("2"), dec("45.5"))],
            ..Draft::default()
        };

        let processed = pipeline().process_request(&request, draft).unwrap();

        assert!(processed.warnings.is_empty());
        assert_eq!(processed.invoice.metadata.source_text, "Dos licencias para ACME");
        assert_eq!(processed.invoice.totals.net, dec("91.00"));
    }

    #[test]
    fn test_short_request_is_rejected() {
        let result = pipeline().process_text(&InvoiceRequest::new(" hi "));
        assert!(matches!(result, Err(FacturaError::InvalidRequest(_))));
    }

    #[test]
    fn test_request_options_reach_both_stages() {
        let request = InvoiceRequest::new("4 items a 25").with_options(
            options()
                .with_tax_rate(dec("0.10"))
                .with_default_currency("USD"),
        );

        let processed = pipeline().process_text(&request).unwrap();

        assert_eq!(processed.invoice.header.currency, "USD");
        assert_eq!(processed.invoice.totals.tax_rate, dec("0.10"));
        assert_eq!(processed.invoice.totals.total, dec("110.00"));
    }

    #[test]
    fn test_huge_amounts_do_not_panic() {
        let huge = Decimal::from(1_000_000_000_000_000_i64);
        let draft = Draft {
            customer: DraftCustomer {
                document_number: Some("20987654321".to_string()),
                ..DraftCustomer::default()
            },
            items: vec![
                DraftItem::new("big", huge, huge),
                DraftItem::new("Soporte", dec("3"), dec("10")),
            ],
            ..Draft::default()
        };

        let processed = pipeline().process(draft, &options());

        assert_eq!(processed.warnings, vec![amount_out_of_range_warning(1)]);
        assert_eq!(processed.invoice.items[0].amount, Decimal::ZERO);
        assert_eq!(processed.invoice.totals.net, dec("30.00"));
        assert_eq!(processed.invoice.totals.total, dec("35.40"));
        assert!(processed.invoice.validate().is_empty());
    }
}
