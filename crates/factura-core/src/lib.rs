//! Core library for turning free-text billing requests into priced invoices.
//!
//! This crate provides:
//! - Draft models tolerant of the Spanish keys used upstream
//! - Draft normalization with a deterministic text extractor as fallback
//! - Exact decimal invoice calculation (line amounts, IGV, totals)
//! - Configuration with file and environment overrides

pub mod error;
pub mod invoice;
pub mod models;

pub use error::{FacturaError, Result};
pub use invoice::{
    DraftNormalizer, FixedSource, IdentifierSource, InvoiceCalculator, InvoicePipeline,
    ProcessedInvoice, RandomSource,
};
pub use models::config::{BillingConfig, FacturaConfig};
pub use models::draft::{Draft, DraftCustomer, DraftItem, DraftNumber, InvoiceRequest, RequestOptions};
pub use models::invoice::{
    Customer, DocumentKind, FinalInvoice, InvoiceHeader, InvoiceLine, InvoiceMetadata,
    InvoiceTotals, Issuer, NormalizedDraft, NormalizedItem,
};
