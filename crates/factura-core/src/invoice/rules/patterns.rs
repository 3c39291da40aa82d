//! Regex patterns for free-text invoice requests.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // "<qty> [unit] [de <filler>] a|@ <price> [currency]", e.g.
    // "2 horas a 150 soles", "3 licencias de antivirus @ 45,50 USD"
    pub static ref LINE_ITEM: Regex = Regex::new(
        r"(?i)(?P<qty>\d+(?:[.,]\d+)?)\s*(?:horas?|licencias?|unidad(?:es)?|u\.?|items?)?(?:\s+de\s+[\w\s/-]{0,50}?)?\s*(?:a|@)\s*(?P<price>\d+(?:[.,]\d+)?)(?:\s*(?P<currency>USD|S/|PEN|sol(?:es)?))?"
    ).unwrap();
}
