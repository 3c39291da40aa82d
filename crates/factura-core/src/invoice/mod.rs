//! Draft normalization and invoice calculation.

pub mod calculator;
pub mod ids;
pub mod normalizer;
pub mod pipeline;
pub mod rules;

pub use calculator::{compute_totals, InvoiceCalculator};
pub use ids::{FixedSource, IdentifierSource, RandomSource};
pub use normalizer::DraftNormalizer;
pub use pipeline::{InvoicePipeline, ProcessedInvoice};
