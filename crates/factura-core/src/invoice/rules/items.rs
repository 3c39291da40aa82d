//! Deterministic line item extraction from free text.
//!
//! Only used as a fallback, when a draft carries no usable prices.

use rust_decimal::Decimal;

use super::amounts::parse_amount;
use super::patterns::LINE_ITEM;
use super::{ExtractionMatch, FieldExtractor};

/// Maximum length, in characters, of an extracted description.
pub const MAX_DESCRIPTION_LEN: usize = 120;

/// A quantity/price pair recovered from text.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedItem {
    pub description: String,
    /// Strictly positive.
    pub quantity: Decimal,
    /// Non-negative.
    pub unit_price: Decimal,
    /// Currency token written next to the price, as it appeared.
    pub currency: Option<String>,
}

/// Line item extractor.
pub struct LineItemExtractor {
    max_description_len: usize,
}

impl LineItemExtractor {
    pub fn new() -> Self {
        Self {
            max_description_len: MAX_DESCRIPTION_LEN,
        }
    }

    /// Set the maximum description length.
    pub fn with_max_description_len(mut self, len: usize) -> Self {
        self.max_description_len = len;
        self
    }

    fn truncate(&self, s: &str) -> String {
        s.chars().take(self.max_description_len).collect()
    }
}

impl Default for LineItemExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for LineItemExtractor {
    type Output = ExtractionMatch<ExtractedItem>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        self.extract_all(text).into_iter().next()
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        let mut results = Vec::new();

        for caps in LINE_ITEM.captures_iter(text) {
            let Some(full_match) = caps.get(0) else {
                continue;
            };

            let quantity = caps
                .name("qty")
                .and_then(|m| parse_amount(m.as_str()))
                .filter(|q| *q > Decimal::ZERO)
                .unwrap_or(Decimal::ONE);

            let unit_price = caps
                .name("price")
                .and_then(|m| parse_amount(m.as_str()))
                .filter(|p| *p >= Decimal::ZERO)
                .unwrap_or(Decimal::ZERO);

            let matched = full_match.as_str().trim();
            let description = if matched.is_empty() {
                self.truncate(text)
            } else {
                self.truncate(matched)
            };

            let item = ExtractedItem {
                description,
                quantity,
                unit_price,
                currency: caps.name("currency").map(|m| m.as_str().to_string()),
            };

            results.push(
                ExtractionMatch::new(item, full_match.as_str())
                    .with_position(full_match.start(), full_match.end()),
            );
        }

        results
    }
}

/// Extract every line item from text, in order of appearance.
pub fn extract_line_items(text: &str) -> Vec<ExtractedItem> {
    LineItemExtractor::new()
        .extract_all(text)
        .into_iter()
        .map(|m| m.value)
        .collect()
}
