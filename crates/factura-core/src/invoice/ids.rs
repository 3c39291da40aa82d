//! Sources of the only nondeterministic values in the pipeline: simulated
//! customer document numbers and invoice numbers.

/// Upper bound (exclusive) of generated invoice numbers.
pub const INVOICE_NUMBER_LIMIT: u32 = 100_000;

/// Number of random digits after the leading digit of a simulated RUC.
pub const SIMULATED_DIGITS: usize = 10;

/// Trait for identifier generation.
pub trait IdentifierSource {
    /// Ten decimal digits for a simulated customer document number.
    fn document_digits(&mut self) -> String;

    /// An invoice number below [`INVOICE_NUMBER_LIMIT`].
    fn invoice_number(&mut self) -> u32;
}

impl<S: IdentifierSource + ?Sized> IdentifierSource for &mut S {
    fn document_digits(&mut self) -> String {
        (**self).document_digits()
    }

    fn invoice_number(&mut self) -> u32 {
        (**self).invoice_number()
    }
}

/// Random identifiers, the production source.
#[derive(Debug)]
pub struct RandomSource {
    rng: fastrand::Rng,
}

impl RandomSource {
    /// Create a source seeded from the environment.
    pub fn new() -> Self {
        Self {
            rng: fastrand::Rng::new(),
        }
    }

    /// Create a reproducible source.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: fastrand::Rng::with_seed(seed),
        }
    }
}

impl Default for RandomSource {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentifierSource for RandomSource {
    fn document_digits(&mut self) -> String {
        (0..SIMULATED_DIGITS).map(|_| self.rng.digit(10)).collect()
    }

    fn invoice_number(&mut self) -> u32 {
        self.rng.u32(0..INVOICE_NUMBER_LIMIT)
    }
}

/// Fixed identifiers, for tests and reproducible output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedSource {
    pub document_digits: String,
    pub invoice_number: u32,
}

impl FixedSource {
    pub fn new(document_digits: impl Into<String>, invoice_number: u32) -> Self {
        Self {
            document_digits: document_digits.into(),
            invoice_number,
        }
    }
}

impl IdentifierSource for FixedSource {
    fn document_digits(&mut self) -> String {
        self.document_digits.clone()
    }

    fn invoice_number(&mut self) -> u32 {
        self.invoice_number
    }
}
