//! Draft normalization.
//!
//! Turns an untrusted [`Draft`] into a [`NormalizedDraft`] whose every field
//! is populated and within bounds. Nothing here fails: each invalid field is
//! replaced by a default and the replacement is recorded as a warning, in the
//! order it happened.

use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::models::config::{BillingConfig, FacturaConfig};
use crate::models::draft::{Draft, DraftCustomer, DraftItem, DraftNumber, RequestOptions};
use crate::models::invoice::{Customer, NormalizedDraft, NormalizedItem};

use super::calculator::{line_amount, totals_from_net_sum};
use super::ids::IdentifierSource;
use super::rules::document::{
    has_canonical_length, is_usable_document_number, simulated_document_number,
    CANONICAL_DOCUMENT_LENGTH,
};
use super::rules::{FieldExtractor, LineItemExtractor};

/// Warning recorded when the customer document number had to be invented.
pub const WARN_SIMULATED_DOCUMENT: &str =
    "Customer document number was simulated because it was missing or invalid.";

/// Warning recorded when the text extractor replaced the draft items.
pub const WARN_DETERMINISTIC_EXTRACTION: &str =
    "Deterministic extraction was used to recover quantities and prices from the text.";

/// Warning recorded when a kept document number is not canonical.
pub fn non_canonical_document_warning() -> String {
    format!(
        "Customer document number does not match the canonical length of {} digits; the provided value was kept unvalidated.",
        CANONICAL_DOCUMENT_LENGTH
    )
}

/// Warning recorded when an item quantity was forced to 1.
pub fn invalid_quantity_warning(position: usize) -> String {
    format!("Invalid quantity in item {}; forced to 1.", position)
}

/// Warning recorded when an item unit price was forced to 0.
pub fn invalid_price_warning(position: usize) -> String {
    format!("Invalid unit price in item {}; forced to 0.", position)
}

/// Warning recorded when an item amount would overflow; its price is forced to 0.
pub fn amount_out_of_range_warning(position: usize) -> String {
    format!(
        "Amount of item {} is out of range; unit price forced to 0.",
        position
    )
}

/// Repairs and validates drafts.
pub struct DraftNormalizer {
    billing: BillingConfig,
    extractor: LineItemExtractor,
}

impl DraftNormalizer {
    /// Create a normalizer with the given configuration.
    pub fn new(config: &FacturaConfig) -> Self {
        Self {
            billing: config.billing.clone(),
            extractor: LineItemExtractor::new(),
        }
    }

    /// Set the extractor used when the draft has no usable prices.
    pub fn with_extractor(mut self, extractor: LineItemExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    /// Normalize a draft, returning the repaired structure and the warnings
    /// describing every correction.
    pub fn normalize<S>(
        &self,
        draft: &Draft,
        options: &RequestOptions,
        ids: &mut S,
    ) -> (NormalizedDraft, Vec<String>)
    where
        S: IdentifierSource + ?Sized,
    {
        let mut warnings = Vec::new();

        let currency = non_blank(draft.currency.as_deref())
            .or_else(|| non_blank(options.default_currency.as_deref()))
            .unwrap_or(&self.billing.default_currency)
            .to_string();

        let customer = self.normalize_customer(&draft.customer, ids, &mut warnings);

        let tax_rate = options.tax_rate.unwrap_or(self.billing.tax_rate);

        let mut items = self.normalize_items(&draft.items, &mut warnings);
        bound_amounts(&mut items, tax_rate, &mut warnings);

        let has_usable_price = items.iter().any(|item| item.unit_price > Decimal::ZERO);
        if (items.is_empty() || !has_usable_price) && !draft.raw_text.is_empty() {
            let mut extracted = self.extract_items(&draft.raw_text);
            if extracted.is_empty() {
                debug!("Deterministic extraction found no items; keeping draft items");
            } else {
                warn!(
                    "Draft had no usable prices; extracted {} items from text",
                    extracted.len()
                );
                warnings.push(WARN_DETERMINISTIC_EXTRACTION.to_string());
                bound_amounts(&mut extracted, tax_rate, &mut warnings);
                items = extracted;
            }
        }

        let normalized = NormalizedDraft {
            currency,
            customer,
            items,
            inconsistencies: draft.inconsistencies.clone(),
            observations: draft.observations.clone(),
        };

        (normalized, warnings)
    }

    fn normalize_customer<S>(
        &self,
        customer: &DraftCustomer,
        ids: &mut S,
        warnings: &mut Vec<String>,
    ) -> Customer
    where
        S: IdentifierSource + ?Sized,
    {
        let document_type = non_blank(customer.document_type.as_deref())
            .unwrap_or(&self.billing.default_document_type)
            .to_string();

        let mut document_number = customer.document_number.clone().unwrap_or_default();
        if !is_usable_document_number(&document_number) {
            document_number = simulated_document_number(&ids.document_digits());
            debug!("Simulated customer document number {}", document_number);
            warnings.push(WARN_SIMULATED_DOCUMENT.to_string());
        }
        // Checked independently of the branch above.
        if !has_canonical_length(&document_number) {
            debug!("Customer document number {} is not canonical", document_number);
            warnings.push(non_canonical_document_warning());
        }

        let name = non_blank(customer.name.as_deref())
            .unwrap_or(&self.billing.default_customer_name)
            .to_string();

        Customer {
            document_type,
            document_number,
            name,
            address: customer.address.clone(),
        }
    }

    fn normalize_items(&self, items: &[DraftItem], warnings: &mut Vec<String>) -> Vec<NormalizedItem> {
        items
            .iter()
            .enumerate()
            .map(|(idx, item)| {
                let position = idx + 1;

                let quantity = match coerce(item.quantity.as_ref()) {
                    Some(q) if q > Decimal::ZERO => q,
                    _ => {
                        debug!("Item {} has invalid quantity {:?}", position, item.quantity);
                        warnings.push(invalid_quantity_warning(position));
                        Decimal::ONE
                    }
                };

                let unit_price = match coerce(item.unit_price.as_ref()) {
                    Some(p) if p >= Decimal::ZERO => p,
                    _ => {
                        debug!("Item {} has invalid unit price {:?}", position, item.unit_price);
                        warnings.push(invalid_price_warning(position));
                        Decimal::ZERO
                    }
                };

                let description = match non_blank(item.description.as_deref()) {
                    Some(d) => d.to_string(),
                    None => format!("Item {}", position),
                };

                NormalizedItem {
                    description,
                    quantity,
                    unit_price,
                }
            })
            .collect()
    }

    fn extract_items(&self, raw_text: &str) -> Vec<NormalizedItem> {
        self.extractor
            .extract_all(raw_text)
            .into_iter()
            .map(|m| NormalizedItem {
                description: m.value.description,
                quantity: m.value.quantity,
                unit_price: m.value.unit_price,
            })
            .collect()
    }
}

/// Force to zero the price of every item whose amount, or whose share of the
/// running totals, cannot be represented.
fn bound_amounts(items: &mut [NormalizedItem], tax_rate: Decimal, warnings: &mut Vec<String>) {
    let mut net_sum = Decimal::ZERO;

    for (idx, item) in items.iter_mut().enumerate() {
        let next = line_amount(item.quantity, item.unit_price)
            .and_then(|amount| net_sum.checked_add(amount))
            .filter(|sum| totals_from_net_sum(*sum, tax_rate).is_some());

        match next {
            Some(sum) => net_sum = sum,
            None => {
                debug!(
                    "Item {} amount {} x {} is out of range",
                    idx + 1,
                    item.quantity,
                    item.unit_price
                );
                warnings.push(amount_out_of_range_warning(idx + 1));
                item.unit_price = Decimal::ZERO;
            }
        }
    }
}

/// A missing number counts as zero.
fn coerce(number: Option<&DraftNumber>) -> Option<Decimal> {
    match number {
        Some(n) => n.coerce(),
        None => Some(Decimal::ZERO),
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoice::ids::FixedSource;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    fn normalizer() -> DraftNormalizer {
        DraftNormalizer::new(&FacturaConfig::default())
    }

    fn ids() -> FixedSource {
        FixedSource::new("0000000001", 1)
    }

    fn customer(number: &str) -> DraftCustomer {
        DraftCustomer {
            name: Some("ACME SAC".to_string()),
            document_type: Some("RUC".to_string()),
            document_number: Some(number.to_string()),
            address: Some("Jr. Union 100".to_string()),
        }
    }

    fn priced_draft() -> Draft {
        Draft {
            raw_text: "2 horas a 999".to_string(),
            customer: customer("20987654321"),
            currency: Some("USD".to_string()),
            items: vec![DraftItem::new("Consultoria", Decimal::from(2), Decimal::from(100))],
            ..Draft::default()
        }
    }

    #[test]
    fn test_valid_draft_has_no_warnings() {
        let (normalized, warnings) =
            normalizer().normalize(&priced_draft(), &RequestOptions::default(), &mut ids());

        assert!(warnings.is_empty());
        assert_eq!(normalized.currency, "USD");
        assert_eq!(normalized.customer.document_number, "20987654321");
        assert_eq!(normalized.customer.address.as_deref(), Some("Jr. Union 100"));
        assert_eq!(
            normalized.items,
            vec![NormalizedItem::new("Consultoria", Decimal::from(2), Decimal::from(100))]
        );
    }

    #[test]
    fn test_renormalizing_is_idempotent() {
        let mut draft = priced_draft();
        draft.customer = DraftCustomer::default();
        draft.currency = None;
        draft.items.push(DraftItem {
            description: None,
            quantity: Some(DraftNumber::from("abc")),
            unit_price: Some(DraftNumber::from(-3_i64)),
        });

        let (first, first_warnings) =
            normalizer().normalize(&draft, &RequestOptions::default(), &mut ids());
        assert!(!first_warnings.is_empty());

        let again = first.to_draft(draft.raw_text.clone());
        let (second, second_warnings) =
            normalizer().normalize(&again, &RequestOptions::default(), &mut ids());

        assert!(second_warnings.is_empty());
        assert_eq!(second, first);
    }

    #[test]
    fn test_currency_resolution_order() {
        let mut draft = priced_draft();
        draft.currency = None;

        let options = RequestOptions::default().with_default_currency("EUR");
        let (normalized, warnings) = normalizer().normalize(&draft, &options, &mut ids());
        assert_eq!(normalized.currency, "EUR");
        assert!(warnings.is_empty());

        let (normalized, _) = normalizer().normalize(&draft, &RequestOptions::default(), &mut ids());
        assert_eq!(normalized.currency, "PEN");

        draft.currency = Some(String::new());
        let (normalized, _) = normalizer().normalize(&draft, &RequestOptions::default(), &mut ids());
        assert_eq!(normalized.currency, "PEN");
    }

    #[test]
    fn test_missing_customer_gets_defaults() {
        let mut draft = priced_draft();
        draft.customer = DraftCustomer::default();

        let (normalized, warnings) =
            normalizer().normalize(&draft, &RequestOptions::default(), &mut ids());

        assert_eq!(normalized.customer.document_type, "RUC");
        assert_eq!(normalized.customer.document_number, "20000000001");
        assert_eq!(normalized.customer.name, "Cliente");
        assert_eq!(normalized.customer.address, None);
        assert_eq!(warnings, vec![WARN_SIMULATED_DOCUMENT.to_string()]);
    }

    #[test]
    fn test_short_document_number_is_simulated() {
        let mut draft = priced_draft();
        draft.customer = customer("12345");

        let (normalized, warnings) =
            normalizer().normalize(&draft, &RequestOptions::default(), &mut ids());

        assert_eq!(normalized.customer.document_number, "20000000001");
        assert_eq!(normalized.customer.document_number.len(), 11);
        assert_eq!(warnings, vec![WARN_SIMULATED_DOCUMENT.to_string()]);
    }

    #[test]
    fn test_non_canonical_document_number_is_kept() {
        let mut draft = priced_draft();
        draft.customer = customer("123456789");

        let (normalized, warnings) =
            normalizer().normalize(&draft, &RequestOptions::default(), &mut ids());

        assert_eq!(normalized.customer.document_number, "123456789");
        assert_eq!(warnings, vec![non_canonical_document_warning()]);
    }

    #[test]
    fn test_both_document_warnings_when_simulation_is_not_canonical() {
        // A source that yields too few digits must still trip the length check.
        let mut short_ids = FixedSource::new("123", 1);
        let mut draft = priced_draft();
        draft.customer = customer("");

        let (normalized, warnings) =
            normalizer().normalize(&draft, &RequestOptions::default(), &mut short_ids);

        assert_eq!(normalized.customer.document_number, "2123");
        assert_eq!(
            warnings,
            vec![WARN_SIMULATED_DOCUMENT.to_string(), non_canonical_document_warning()]
        );
    }

    #[test]
    fn test_invalid_item_fields_are_forced() {
        let mut draft = priced_draft();
        draft.items = vec![
            DraftItem::new("Soporte", Decimal::from(2), Decimal::from(50)),
            DraftItem {
                description: Some("  ".to_string()),
                quantity: Some(DraftNumber::from(f64::NAN)),
                unit_price: Some(DraftNumber::from(-5_i64)),
            },
            DraftItem {
                description: None,
                quantity: Some(DraftNumber::from(0_i64)),
                unit_price: None,
            },
        ];

        let (normalized, warnings) =
            normalizer().normalize(&draft, &RequestOptions::default(), &mut ids());

        assert_eq!(
            normalized.items,
            vec![
                NormalizedItem::new("Soporte", Decimal::from(2), Decimal::from(50)),
                NormalizedItem::new("Item 2", Decimal::ONE, Decimal::ZERO),
                NormalizedItem::new("Item 3", Decimal::ONE, Decimal::ZERO),
            ]
        );
        assert_eq!(
            warnings,
            vec![
                invalid_quantity_warning(2),
                invalid_price_warning(2),
                invalid_quantity_warning(3),
            ]
        );
    }

    #[test]
    fn test_fallback_on_empty_items() {
        let draft = Draft {
            raw_text: "2 horas a 150 soles y 1 licencia a 800".to_string(),
            customer: customer("20987654321"),
            ..Draft::default()
        };

        let (normalized, warnings) =
            normalizer().normalize(&draft, &RequestOptions::default(), &mut ids());

        let pairs: Vec<_> = normalized
            .items
            .iter()
            .map(|i| (i.quantity, i.unit_price))
            .collect();
        assert_eq!(
            pairs,
            vec![
                (Decimal::from(2), Decimal::from(150)),
                (Decimal::ONE, Decimal::from(800)),
            ]
        );
        assert_eq!(warnings, vec![WARN_DETERMINISTIC_EXTRACTION.to_string()]);
    }

    #[test]
    fn test_fallback_after_negative_price() {
        let mut draft = priced_draft();
        draft.raw_text = "3 licencias a 45,50".to_string();
        draft.items = vec![DraftItem::new("Licencia", Decimal::from(3), Decimal::from(-5))];

        let (normalized, warnings) =
            normalizer().normalize(&draft, &RequestOptions::default(), &mut ids());

        assert_eq!(
            normalized.items,
            vec![NormalizedItem::new(
                "3 licencias a 45,50",
                Decimal::from(3),
                Decimal::from_str("45.50").unwrap()
            )]
        );
        assert_eq!(
            warnings,
            vec![invalid_price_warning(1), WARN_DETERMINISTIC_EXTRACTION.to_string()]
        );
    }

    #[test]
    fn test_no_fallback_when_a_price_is_usable() {
        let mut draft = priced_draft();
        draft.raw_text = "10 horas a 1 y 20 licencias a 2".to_string();

        let (normalized, warnings) =
            normalizer().normalize(&draft, &RequestOptions::default(), &mut ids());

        assert_eq!(normalized.items.len(), 1);
        assert_eq!(normalized.items[0].description, "Consultoria");
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_fallback_without_matches_keeps_items() {
        let mut draft = priced_draft();
        draft.raw_text = "Servicio de mantenimiento".to_string();
        draft.items = vec![DraftItem {
            description: Some("Mantenimiento".to_string()),
            quantity: Some(DraftNumber::from(1_i64)),
            unit_price: Some(DraftNumber::from(0_i64)),
        }];

        let (normalized, warnings) =
            normalizer().normalize(&draft, &RequestOptions::default(), &mut ids());

        assert_eq!(
            normalized.items,
            vec![NormalizedItem::new("Mantenimiento", Decimal::ONE, Decimal::ZERO)]
        );
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_no_fallback_without_raw_text() {
        let mut draft = priced_draft();
        draft.raw_text = String::new();
        draft.items.clear();

        let (normalized, warnings) =
            normalizer().normalize(&draft, &RequestOptions::default(), &mut ids());

        assert!(normalized.items.is_empty());
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_inconsistencies_and_observations_carried() {
        let mut draft = priced_draft();
        draft.inconsistencies = vec!["b".to_string(), "a".to_string(), "b".to_string()];
        draft.observations = Some("pagar en 30 dias".to_string());

        let (normalized, _) =
            normalizer().normalize(&draft, &RequestOptions::default(), &mut ids());

        assert_eq!(normalized.inconsistencies, draft.inconsistencies);
        assert_eq!(normalized.observations, draft.observations);
    }

    #[test]
    fn test_overflowing_amount_forces_price_to_zero() {
        let mut draft = priced_draft();
        let huge = Decimal::from(1_000_000_000_000_000_i64);
        draft.raw_text = String::new();
        draft.items = vec![
            DraftItem::new("Big", huge, huge),
            DraftItem::new("Small", Decimal::from(2), Decimal::from(10)),
        ];

        let (normalized, warnings) =
            normalizer().normalize(&draft, &RequestOptions::default(), &mut ids());

        assert_eq!(warnings, vec![amount_out_of_range_warning(1)]);
        assert_eq!(normalized.items[0].quantity, huge);
        assert_eq!(normalized.items[0].unit_price, Decimal::ZERO);
        assert_eq!(normalized.items[1].unit_price, Decimal::from(10));
    }

    #[test]
    fn test_running_totals_stay_in_range() {
        let half_max = Decimal::from_str("50000000000000000000000000000").unwrap();
        let mut draft = priced_draft();
        draft.items = vec![
            DraftItem::new("A", Decimal::ONE, half_max),
            DraftItem::new("B", Decimal::ONE, half_max),
        ];

        let (normalized, warnings) =
            normalizer().normalize(&draft, &RequestOptions::default(), &mut ids());

        assert_eq!(warnings, vec![amount_out_of_range_warning(2)]);
        assert_eq!(normalized.items[0].unit_price, half_max);
        assert_eq!(normalized.items[1].unit_price, Decimal::ZERO);
    }

    #[test]
    fn test_tax_counts_toward_range() {
        let mut draft = priced_draft();
        draft.raw_text = String::new();
        draft.items = vec![DraftItem::new(
            "A",
            Decimal::ONE,
            Decimal::from_str("70000000000000000000000000000").unwrap(),
        )];

        let (_, warnings) = normalizer().normalize(&draft, &RequestOptions::default(), &mut ids());
        assert_eq!(warnings, vec![amount_out_of_range_warning(1)]);

        let options = RequestOptions::default().with_tax_rate(Decimal::ZERO);
        let (_, warnings) = normalizer().normalize(&draft, &options, &mut ids());
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_custom_extractor_is_used_for_fallback() {
        let normalizer =
            normalizer().with_extractor(LineItemExtractor::new().with_max_description_len(7));
        let draft = Draft {
            raw_text: "2 horas a 150 soles".to_string(),
            customer: customer("20987654321"),
            ..Draft::default()
        };

        let (normalized, warnings) =
            normalizer.normalize(&draft, &RequestOptions::default(), &mut ids());

        assert_eq!(warnings, vec![WARN_DETERMINISTIC_EXTRACTION.to_string()]);
        assert_eq!(
            normalized.items,
            vec![NormalizedItem::new("2 horas", Decimal::from(2), Decimal::from(150))]
        );
    }

    #[test]
    fn test_out_of_range_draft_numbers_are_forced() {
        let json = r#"{
            "raw_text": "",
            "cliente": { "numero_documento": "20987654321" },
            "items": [
                { "descripcion": "a", "cantidad": 1e30, "precio_unitario": 5 },
                { "descripcion": "b", "cantidad": true, "precio_unitario": 2 }
            ]
        }"#;
        let draft = Draft::from_json(json).unwrap();

        let (normalized, warnings) =
            normalizer().normalize(&draft, &RequestOptions::default(), &mut ids());

        assert_eq!(
            warnings,
            vec![invalid_quantity_warning(1), invalid_quantity_warning(2)]
        );
        assert_eq!(normalized.items[0].quantity, Decimal::ONE);
        assert_eq!(normalized.items[0].unit_price, Decimal::from(5));
        assert_eq!(normalized.items[1].quantity, Decimal::ONE);
    }
}
