//! Phone normalization - capability layer
//!
//! Turns a scraped phone string into a dialable `+<country><number>` form.
//! The calling code comes from the country of the query that produced the
//! number, never from the number itself.

use serde::Deserialize;

/// Fewest digits (calling code included) a dialable number can have
pub const MIN_DIGITS: usize = 9;

/// What to do with numbers that carry neither a trunk `0` nor a `+`
///
/// Such numbers are ambiguous: they may already include a calling code or be
/// a local number written without its trunk prefix.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BareNumberPolicy {
    /// Keep the digits as scraped
    #[default]
    Keep,
    /// Treat them as belonging to the query's country
    AssumeQueryCountry,
}

/// Query-country-scoped phone normalizer
#[derive(Debug, Clone, Copy, Default)]
pub struct PhoneNormalizer {
    policy: BareNumberPolicy,
}

impl PhoneNormalizer {
    pub fn new(policy: BareNumberPolicy) -> Self {
        Self { policy }
    }

    /// Normalize `raw` for a query targeting the country with `calling_code`
    ///
    /// Returns `None` when fewer than [`MIN_DIGITS`] digits remain.
    pub fn normalize(&self, raw: &str, calling_code: &str) -> Option<String> {
        let raw = raw.trim();
        let has_plus = raw.starts_with('+');
        let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
        let calling_code: String = calling_code.chars().filter(|c| c.is_ascii_digit()).collect();

        let normalized = if raw.starts_with('0') {
            format!("+{}{}", calling_code, &digits[1..])
        } else if has_plus {
            format!("+{}", digits)
        } else {
            match self.policy {
                BareNumberPolicy::Keep => digits,
                BareNumberPolicy::AssumeQueryCountry if digits.starts_with(&calling_code) => {
                    format!("+{}", digits)
                }
                BareNumberPolicy::AssumeQueryCountry => format!("+{}{}", calling_code, digits),
            }
        };

        (digit_count(&normalized) >= MIN_DIGITS).then_some(normalized)
    }
}

/// Count of ASCII digits in `s`
pub fn digit_count(s: &str) -> usize {
    s.chars().filter(|c| c.is_ascii_digit()).count()
}
