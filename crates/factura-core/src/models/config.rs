//! Configuration structures for the invoice pipeline.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::invoice::Issuer;
use crate::error::{FacturaError, Result};

/// Environment variable overriding [`BillingConfig::default_currency`].
pub const ENV_DEFAULT_CURRENCY: &str = "FACTURA_DEFAULT_CURRENCY";
/// Environment variable overriding [`BillingConfig::tax_rate`].
pub const ENV_TAX_RATE: &str = "FACTURA_TAX_RATE";
pub const ENV_ISSUER_RUC: &str = "FACTURA_ISSUER_RUC";
pub const ENV_ISSUER_NAME: &str = "FACTURA_ISSUER_NAME";
pub const ENV_ISSUER_ADDRESS: &str = "FACTURA_ISSUER_ADDRESS";

/// Main configuration for the factura pipeline.
///
/// Fixed for the life of the process and passed explicitly to the
/// normalizer and the calculator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FacturaConfig {
    /// Defaults applied while normalizing and pricing drafts.
    pub billing: BillingConfig,

    /// Identity of the issuing company.
    pub issuer: Issuer,
}

/// Billing defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BillingConfig {
    /// Currency used when neither the draft nor the request names one.
    pub default_currency: String,

    /// Tax rate as a fraction, used when the request carries none.
    pub tax_rate: Decimal,

    /// Document series printed on every invoice.
    pub series: String,

    /// Prefix of the internal invoice identifier.
    pub id_prefix: String,

    /// Customer document type assumed when the draft has none.
    pub default_document_type: String,

    /// Customer name used when the draft has none.
    pub default_customer_name: String,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            default_currency: "PEN".to_string(),
            tax_rate: Decimal::new(18, 2),
            series: "F001".to_string(),
            id_prefix: "INV".to_string(),
            default_document_type: "RUC".to_string(),
            default_customer_name: "Cliente".to_string(),
        }
    }
}

impl FacturaConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| FacturaError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Apply `FACTURA_*` environment variables on top of this configuration.
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(currency) = lookup(ENV_DEFAULT_CURRENCY) {
            self.billing.default_currency = currency;
        }
        if let Some(rate) = lookup(ENV_TAX_RATE) {
            self.billing.tax_rate = Decimal::from_str(rate.trim()).map_err(|_| {
                FacturaError::Config(format!("{} is not a decimal: {}", ENV_TAX_RATE, rate))
            })?;
        }
        if let Some(ruc) = lookup(ENV_ISSUER_RUC) {
            self.issuer.ruc = ruc;
        }
        if let Some(name) = lookup(ENV_ISSUER_NAME) {
            self.issuer.legal_name = name;
        }
        if let Some(address) = lookup(ENV_ISSUER_ADDRESS) {
            self.issuer.address = address;
        }

        self.validate()?;
        Ok(self)
    }

    /// Reject values the pipeline cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.billing.default_currency.trim().is_empty() {
            return Err(FacturaError::Config("default currency is empty".to_string()));
        }
        if self.billing.tax_rate < Decimal::ZERO || self.billing.tax_rate > Decimal::ONE {
            return Err(FacturaError::Config(format!(
                "tax rate must be a fraction between 0 and 1, got {}",
                self.billing.tax_rate
            )));
        }
        if self.billing.series.trim().is_empty() {
            return Err(FacturaError::Config("series is empty".to_string()));
        }
        Ok(())
    }
}
