//! Fixed-point money primitives and currency codes.
//!
//! Amounts and rates are integers carrying four implied decimal digits, so
//! `12345` represents `1.2345`. Rates are expressed as the price of one unit
//! of a currency in the configured base currency; the base currency itself
//! always has the unit rate [`Rate::UNIT`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Number of fixed-point units in one whole unit.
pub const FIXED_POINT_SCALE: i64 = 10_000;

const FIXED_POINT_DIGITS: usize = 4;

/// Errors raised while validating currency codes or fixed-point values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoneyValidationError {
    /// Currency codes must be three ASCII letters.
    #[error("currency code must be three ASCII letters, got {value:?}")]
    InvalidCurrencyCode { value: String },
    /// The decimal string could not be parsed.
    #[error("invalid decimal value {value:?}")]
    InvalidDecimal { value: String },
    /// The decimal value does not fit into the fixed-point representation.
    #[error("decimal value {value:?} is out of range")]
    OutOfRange { value: String },
    /// Rates must be strictly positive.
    #[error("rate must be positive, got {value}")]
    NonPositiveRate { value: i64 },
}

/// ISO-4217 style currency code, normalised to upper case.
///
/// # Examples
/// ```
/// use spendbot::domain::CurrencyCode;
///
/// let code: CurrencyCode = "usd".parse().expect("valid code");
/// assert_eq!(code.as_str(), "USD");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// Validate and normalise a currency code.
    pub fn new(value: impl AsRef<str>) -> Result<Self, MoneyValidationError> {
        let raw = value.as_ref().trim();
        if raw.len() != 3 || !raw.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(MoneyValidationError::InvalidCurrencyCode {
                value: raw.to_owned(),
            });
        }
        Ok(Self(raw.to_ascii_uppercase()))
    }

    /// Borrow the normalised code.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for CurrencyCode {
    type Err = MoneyValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = MoneyValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CurrencyCode> for String {
    fn from(value: CurrencyCode) -> Self {
        value.0
    }
}

/// Monetary amount with four implied decimal digits.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Amount(i64);

impl Amount {
    /// Zero amount.
    pub const ZERO: Self = Self(0);

    /// Wrap a raw fixed-point value.
    pub const fn from_fixed(value: i64) -> Self {
        Self(value)
    }

    /// Raw fixed-point value.
    pub const fn fixed(self) -> i64 {
        self.0
    }

    /// Add two amounts, returning `None` on overflow.
    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_fixed(f, self.0)
    }
}

/// Exchange rate relative to the base currency, four implied decimal digits.
///
/// ## Invariants
/// - The wrapped value is strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Rate(i64);

impl Rate {
    /// Rate of the base currency against itself (`1.0000`).
    pub const UNIT: Self = Self(FIXED_POINT_SCALE);

    /// Validate a raw fixed-point rate.
    pub fn from_fixed(value: i64) -> Result<Self, MoneyValidationError> {
        if value <= 0 {
            return Err(MoneyValidationError::NonPositiveRate { value });
        }
        Ok(Self(value))
    }

    /// Parse a decimal string such as `"60.1234"`.
    ///
    /// Digits beyond the fourth decimal place are truncated.
    ///
    /// # Examples
    /// ```
    /// use spendbot::domain::Rate;
    ///
    /// let rate = Rate::parse_decimal("60.12345").expect("valid rate");
    /// assert_eq!(rate.fixed(), 601_234);
    /// ```
    pub fn parse_decimal(value: &str) -> Result<Self, MoneyValidationError> {
        Self::from_fixed(parse_fixed_point(value)?)
    }

    /// Raw fixed-point value.
    pub const fn fixed(self) -> i64 {
        self.0
    }
}

impl TryFrom<i64> for Rate {
    type Error = MoneyValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::from_fixed(value)
    }
}

impl From<Rate> for i64 {
    fn from(value: Rate) -> Self {
        value.0
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_fixed(f, self.0)
    }
}

/// Parse a decimal string into a fixed-point integer with four digits.
///
/// Accepts an optional leading sign, an integer part, and an optional
/// fractional part separated by `.`. Exponent notation is rejected.
pub fn parse_fixed_point(value: &str) -> Result<i64, MoneyValidationError> {
    let invalid = || MoneyValidationError::InvalidDecimal {
        value: value.to_owned(),
    };
    let out_of_range = || MoneyValidationError::OutOfRange {
        value: value.to_owned(),
    };

    let trimmed = value.trim();
    let (negative, unsigned) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let (whole, fraction) = unsigned.split_once('.').unwrap_or((unsigned, ""));
    if whole.is_empty() && fraction.is_empty() {
        return Err(invalid());
    }
    if !whole.chars().chain(fraction.chars()).all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }

    let whole_value = if whole.is_empty() {
        0
    } else {
        whole.parse::<i64>().map_err(|_| out_of_range())?
    };
    let fraction_digits = fraction
        .chars()
        .take(FIXED_POINT_DIGITS)
        .collect::<String>();
    let padded = format!("{fraction_digits:0<width$}", width = FIXED_POINT_DIGITS);
    let fraction_value = padded.parse::<i64>().map_err(|_| invalid())?;

    let magnitude = whole_value
        .checked_mul(FIXED_POINT_SCALE)
        .and_then(|scaled| scaled.checked_add(fraction_value))
        .ok_or_else(out_of_range)?;
    Ok(if negative { -magnitude } else { magnitude })
}

fn write_fixed(f: &mut fmt::Formatter<'_>, value: i64) -> fmt::Result {
    let sign = if value < 0 { "-" } else { "" };
    let magnitude = value.unsigned_abs();
    let scale = FIXED_POINT_SCALE.unsigned_abs();
    write!(
        f,
        "{sign}{}.{:04}",
        magnitude / scale,
        magnitude % scale
    )
}

#[cfg(test)]
mod tests {
    //! Regression coverage for fixed-point parsing and validation.
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("1", 10_000)]
    #[case("1.2345", 12_345)]
    #[case("60.1", 601_000)]
    #[case("0.02", 200)]
    #[case(".5", 5_000)]
    #[case("3.99999", 39_999)]
    #[case("-2.5", -25_000)]
    fn parses_decimal_strings(#[case] raw: &str, #[case] expected: i64) {
        assert_eq!(parse_fixed_point(raw).expect("parse"), expected);
    }

    #[rstest]
    #[case("")]
    #[case(".")]
    #[case("1e5")]
    #[case("12,5")]
    #[case("abc")]
    fn rejects_malformed_decimals(#[case] raw: &str) {
        let err = parse_fixed_point(raw).expect_err("should reject");
        assert!(matches!(err, MoneyValidationError::InvalidDecimal { .. }));
    }

    #[test]
    fn rejects_overflowing_decimals() {
        let err = parse_fixed_point("922337203685477580").expect_err("overflow");
        assert!(matches!(err, MoneyValidationError::OutOfRange { .. }));
    }

    #[rstest]
    #[case(0)]
    #[case(-1)]
    fn rate_must_be_positive(#[case] raw: i64) {
        assert_eq!(
            Rate::from_fixed(raw),
            Err(MoneyValidationError::NonPositiveRate { value: raw })
        );
    }

    #[rstest]
    #[case("rub", "RUB")]
    #[case(" Eur ", "EUR")]
    fn currency_codes_are_normalised(#[case] raw: &str, #[case] expected: &str) {
        let code = CurrencyCode::new(raw).expect("valid code");
        assert_eq!(code.as_str(), expected);
    }

    #[rstest]
    #[case("RU")]
    #[case("RUBL")]
    #[case("R1B")]
    fn invalid_currency_codes_are_rejected(#[case] raw: &str) {
        assert!(CurrencyCode::new(raw).is_err());
    }

    #[test]
    fn currency_code_deserialisation_validates() {
        let err = serde_json::from_str::<CurrencyCode>("\"dollars\"");
        assert!(err.is_err());
        let code: CurrencyCode = serde_json::from_str("\"usd\"").expect("decode");
        assert_eq!(code.as_str(), "USD");
    }

    #[rstest]
    #[case(12_345, "1.2345")]
    #[case(-5, "-0.0005")]
    #[case(0, "0.0000")]
    fn amounts_render_with_four_digits(#[case] raw: i64, #[case] expected: &str) {
        assert_eq!(Amount::from_fixed(raw).to_string(), expected);
    }
}
