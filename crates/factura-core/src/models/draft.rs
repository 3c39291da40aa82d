//! Untrusted invoice drafts and per-request options.
//!
//! Drafts come from the upstream language model, whose JSON uses Spanish keys
//! (`cliente`, `cantidad`, `precio_unitario`, ...). Both those keys and the
//! English field names are accepted.

use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{FacturaError, Result};

/// Minimum length (after trimming) of the free text of a request.
pub const MIN_REQUEST_TEXT_LEN: usize = 5;

/// A best-effort structured guess produced from raw text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Draft {
    /// Original raw input text.
    #[serde(deserialize_with = "null_as_default")]
    pub raw_text: String,

    /// Customer as understood by the model.
    #[serde(alias = "cliente", deserialize_with = "null_as_default")]
    pub customer: DraftCustomer,

    /// Document type suggested by the model (FACTURA / BOLETA).
    ///
    /// Informational only; the issued type is derived from the customer.
    #[serde(alias = "tipo_comprobante", skip_serializing_if = "Option::is_none")]
    pub suggested_kind: Option<String>,

    /// Currency code, if the text mentioned one.
    #[serde(alias = "moneda", skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,

    /// Line items in the order the model produced them.
    #[serde(deserialize_with = "null_as_default")]
    pub items: Vec<DraftItem>,

    /// Free-text observations.
    #[serde(alias = "observaciones", skip_serializing_if = "Option::is_none")]
    pub observations: Option<String>,

    /// Inconsistencies the model itself detected in the text.
    #[serde(alias = "inconsistencias_detectadas", deserialize_with = "null_as_default")]
    pub inconsistencies: Vec<String>,
}

impl Draft {
    /// A draft with nothing but raw text, for running without a model.
    ///
    /// Normalizing it always goes through the deterministic extractor.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            raw_text: text.into(),
            ..Self::default()
        }
    }

    /// Decode a draft from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Customer fields of a draft; every one may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DraftCustomer {
    #[serde(alias = "nombre_razon_social")]
    pub name: Option<String>,

    #[serde(alias = "tipo_documento")]
    pub document_type: Option<String>,

    #[serde(alias = "numero_documento")]
    pub document_number: Option<String>,

    #[serde(alias = "direccion")]
    pub address: Option<String>,
}

/// A draft line item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DraftItem {
    #[serde(alias = "descripcion")]
    pub description: Option<String>,

    #[serde(alias = "cantidad")]
    pub quantity: Option<DraftNumber>,

    #[serde(alias = "precio_unitario")]
    pub unit_price: Option<DraftNumber>,
}

impl DraftItem {
    /// Convenience constructor with exact values.
    pub fn new(description: impl Into<String>, quantity: Decimal, unit_price: Decimal) -> Self {
        Self {
            description: Some(description.into()),
            quantity: Some(DraftNumber::Value(quantity)),
            unit_price: Some(DraftNumber::Value(unit_price)),
        }
    }
}

/// A numeric draft field as it arrived: a number, text that may or may not
/// hold one, or any other JSON value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DraftNumber {
    Value(Decimal),
    Text(String),
    /// Booleans, arrays, objects, and numbers a `Decimal` cannot hold (`1e30`).
    Other(serde_json::Value),
}

impl DraftNumber {
    /// Coerce to an exact decimal.
    ///
    /// Blank text counts as zero; anything unparseable (including NaN and
    /// infinities) yields `None`, i.e. "not finite".
    pub fn coerce(&self) -> Option<Decimal> {
        match self {
            DraftNumber::Value(value) => Some(*value),
            DraftNumber::Text(text) => {
                let text = text.trim();
                if text.is_empty() {
                    return Some(Decimal::ZERO);
                }
                Decimal::from_str(text)
                    .or_else(|_| Decimal::from_scientific(text))
                    .ok()
            }
            DraftNumber::Other(_) => None,
        }
    }
}

impl From<Decimal> for DraftNumber {
    fn from(value: Decimal) -> Self {
        DraftNumber::Value(value)
    }
}

impl From<f64> for DraftNumber {
    fn from(value: f64) -> Self {
        Decimal::from_f64(value)
            .map(DraftNumber::Value)
            .unwrap_or_else(|| DraftNumber::Text(value.to_string()))
    }
}

impl From<i64> for DraftNumber {
    fn from(value: i64) -> Self {
        DraftNumber::Value(Decimal::from(value))
    }
}

impl From<&str> for DraftNumber {
    fn from(value: &str) -> Self {
        DraftNumber::Text(value.to_string())
    }
}

/// Per-invocation options supplied by the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestOptions {
    /// Tax rate as a fraction (0.18 for 18%).
    #[serde(alias = "tasa_igv", skip_serializing_if = "Option::is_none")]
    pub tax_rate: Option<Decimal>,

    /// Currency to use when the draft names none.
    #[serde(alias = "moneda_default", skip_serializing_if = "Option::is_none")]
    pub default_currency: Option<String>,

    /// Issue date override; today (UTC) when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_date: Option<NaiveDate>,
}

impl RequestOptions {
    pub fn with_tax_rate(mut self, rate: Decimal) -> Self {
        self.tax_rate = Some(rate);
        self
    }

    pub fn with_default_currency(mut self, currency: impl Into<String>) -> Self {
        self.default_currency = Some(currency.into());
        self
    }

    pub fn with_issue_date(mut self, date: NaiveDate) -> Self {
        self.issue_date = Some(date);
        self
    }
}

/// A free-text invoice request as received from the outside.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InvoiceRequest {
    #[serde(alias = "texto")]
    pub text: String,

    #[serde(alias = "config")]
    pub options: RequestOptions,
}

impl InvoiceRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            options: RequestOptions::default(),
        }
    }

    pub fn with_options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }

    /// Reject requests whose text is too short to describe anything.
    pub fn validate(&self) -> Result<()> {
        if self.text.trim().chars().count() < MIN_REQUEST_TEXT_LEN {
            return Err(FacturaError::InvalidRequest(format!(
                "text is required and must have at least {} characters",
                MIN_REQUEST_TEXT_LEN
            )));
        }
        Ok(())
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
