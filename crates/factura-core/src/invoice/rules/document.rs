//! Customer document (tax identifier) rules.

/// Length of a canonical RUC.
pub const CANONICAL_DOCUMENT_LENGTH: usize = 11;

/// Document numbers shorter than this are replaced by a simulated one.
pub const MIN_DOCUMENT_LENGTH: usize = 8;

/// Leading digit of simulated RUCs (company taxpayers).
pub const SIMULATED_DOCUMENT_PREFIX: char = '2';

/// The canonical tax identifier document type.
pub const TAX_ID_DOCUMENT_TYPE: &str = "RUC";

/// Whether a document number is long enough to be kept.
pub fn is_usable_document_number(number: &str) -> bool {
    number.chars().count() >= MIN_DOCUMENT_LENGTH
}

/// Whether a document number has the canonical RUC length.
///
/// Only the length is checked; no checksum or tax-authority rules.
pub fn has_canonical_length(number: &str) -> bool {
    number.chars().count() == CANONICAL_DOCUMENT_LENGTH
}

/// Whether a document type denotes the canonical tax identifier.
pub fn is_tax_id_type(document_type: &str) -> bool {
    document_type.trim().eq_ignore_ascii_case(TAX_ID_DOCUMENT_TYPE)
}

/// Build a simulated RUC from ten random digits.
pub fn simulated_document_number(digits: &str) -> String {
    let mut number = String::with_capacity(CANONICAL_DOCUMENT_LENGTH);
    number.push(SIMULATED_DOCUMENT_PREFIX);
    number.push_str(digits);
    number
}
