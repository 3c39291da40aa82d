//! Data models: untrusted drafts, normalized drafts, final invoices and
//! configuration.

pub mod config;
pub mod draft;
pub mod invoice;
