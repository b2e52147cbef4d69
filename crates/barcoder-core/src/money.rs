//! # Money Module
//!
//! Provides the `Money` type for catalog prices and the locale rules used to
//! display them.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  The catalog sends prices as JSON numbers:  "price": 1234.5             │
//! │  Read as f64 and multiplied by 100 that can land on 123449.99999        │
//! │                                                                         │
//! │  OUR SOLUTION: parse the decimal TEXT into integer cents                │
//! │    "1234.5"  → 123450 cents                                             │
//! │    "19.999"  → 2000 cents (third digit rounds half-up)                  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use barcoder_core::money::{Money, NumberLocale, Price};
//!
//! let amount = Money::from_decimal_str("1234.5").unwrap();
//! assert_eq!(amount.cents(), 123450);
//!
//! let price = Price::new(amount, "ARS");
//! assert_eq!(price.display(NumberLocale::EsAr), "$1.234,50");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (cents).
///
/// ## Design Decisions
/// - **i64 (signed)**: catalogs occasionally publish negative adjustments
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **Always two fraction digits**: the result grid shows `1.234,50`
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS,
)]
#[ts(export)]
pub struct Money(#[ts(type = "number")] i64);

impl Money {
    /// Creates a Money value from cents.
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Parses a decimal amount such as `"1234.5"` into cents.
    ///
    /// ## Rules
    /// - Optional leading `-`, digits, optional `.` and fraction digits
    /// - An `e`/`E` exponent shifts the decimal point (`1e16`, `25e-3`)
    /// - The third fraction digit rounds half-up, later digits are ignored
    /// - Grouping separators are rejected
    ///
    /// ## Example
    /// ```rust
    /// use barcoder_core::money::Money;
    ///
    /// assert_eq!(Money::from_decimal_str("19.99").unwrap().cents(), 1999);
    /// assert_eq!(Money::from_decimal_str("19.995").unwrap().cents(), 2000);
    /// assert_eq!(Money::from_decimal_str("-3").unwrap().cents(), -300);
    /// assert_eq!(Money::from_decimal_str("1.5e3").unwrap().cents(), 150_000);
    /// assert!(Money::from_decimal_str("12,50").is_err());
    /// ```
    pub fn from_decimal_str(input: &str) -> CoreResult<Self> {
        let text = input.trim();
        let invalid = |reason: &str| CoreError::InvalidPrice {
            value: input.to_string(),
            reason: reason.to_string(),
        };

        let (negative, unsigned) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text),
        };
        let unsigned = expand_exponent(unsigned).map_err(invalid)?;
        let (int_part, frac_part) = unsigned.split_once('.').unwrap_or((&unsigned, ""));

        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid("no digits"));
        }
        if let Some(bad) = int_part
            .chars()
            .chain(frac_part.chars())
            .find(|c| !c.is_ascii_digit())
        {
            return Err(invalid(&format!("unexpected character '{}'", bad)));
        }

        let major: i64 = if int_part.is_empty() {
            0
        } else {
            int_part.parse().map_err(|_| invalid("amount too large"))?
        };

        let mut frac = frac_part.bytes().map(|b| i64::from(b - b'0'));
        let tenths = frac.next().unwrap_or(0);
        let hundredths = frac.next().unwrap_or(0);
        let round_up = frac.next().unwrap_or(0) >= 5;

        let cents = major
            .checked_mul(100)
            .and_then(|c| c.checked_add(tenths * 10 + hundredths + i64::from(round_up)))
            .ok_or_else(|| invalid("amount too large"))?;

        Ok(Money(if negative { -cents } else { cents }))
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion (truncated toward zero).
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn minor(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Checks if the value is negative.
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Formats the amount with the grouping and decimal marks of `locale`.
    ///
    /// ```rust
    /// use barcoder_core::money::{Money, NumberLocale};
    ///
    /// let amount = Money::from_cents(123_456_789);
    /// assert_eq!(amount.format(NumberLocale::EsAr), "1.234.567,89");
    /// assert_eq!(amount.format(NumberLocale::EnUs), "1,234,567.89");
    /// ```
    pub fn format(&self, locale: NumberLocale) -> String {
        let sign = if self.is_negative() { "-" } else { "" };
        format!(
            "{}{}{}{:02}",
            sign,
            group_digits(self.major().unsigned_abs(), locale.grouping()),
            locale.decimal(),
            self.minor()
        )
    }
}

/// Rewrites `mantissa e exponent` as plain decimal text.
///
/// serde_json prints large and tiny floats in exponent form (`1e16`,
/// `1e-5`), so the catalog reader sees them even when the server sent
/// plain digits.
fn expand_exponent(text: &str) -> Result<String, &'static str> {
    let Some((mantissa, exponent)) = text.split_once(['e', 'E']) else {
        return Ok(text.to_string());
    };
    if !mantissa.bytes().all(|b| b.is_ascii_digit() || b == b'.') {
        return Err("unexpected character");
    }
    let exponent: i32 = exponent
        .strip_prefix('+')
        .unwrap_or(exponent)
        .parse()
        .map_err(|_| "invalid exponent")?;
    if exponent.unsigned_abs() > 30 {
        return Err("exponent out of range");
    }

    let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    if int_part.is_empty() && frac_part.is_empty() {
        return Err("no digits");
    }
    let digits = format!("{}{}", int_part, frac_part);
    let point = int_part.len() as i32 + exponent;

    Ok(if point <= 0 {
        format!("0.{}{}", "0".repeat(point.unsigned_abs() as usize), digits)
    } else if point as usize >= digits.len() {
        format!("{}{}", digits, "0".repeat(point as usize - digits.len()))
    } else {
        let (whole, fraction) = digits.split_at(point as usize);
        format!("{}.{}", whole, fraction)
    })
}

/// Inserts `separator` every three digits from the right.
fn group_digits(value: u64, separator: char) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(separator);
        }
        out.push(ch);
    }
    out
}

/// Locale-neutral rendering (`-5.50`), for logs only.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.major().abs(), self.minor())
    }
}

// =============================================================================
// Number Locale
// =============================================================================

/// Number formatting rules keyed by BCP-47 tag.
///
/// ```text
/// ┌──────────┬──────────┬─────────┬──────────────┐
/// │ Tag      │ Grouping │ Decimal │ 1234.5       │
/// ├──────────┼──────────┼─────────┼──────────────┤
/// │ es-AR    │    .     │    ,    │ 1.234,50     │
/// │ pt-BR    │    .     │    ,    │ 1.234,50     │
/// │ de-DE    │    .     │    ,    │ 1.234,50     │
/// │ en-US    │    ,     │    .    │ 1,234.50     │
/// │ es-MX    │    ,     │    .    │ 1,234.50     │
/// │ fr-FR    │  space   │    ,    │ 1 234,50     │
/// └──────────┴──────────┴─────────┴──────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum NumberLocale {
    #[default]
    EsAr,
    PtBr,
    DeDe,
    EnUs,
    EsMx,
    FrFr,
}

impl NumberLocale {
    /// The canonical BCP-47 tag.
    pub const fn tag(&self) -> &'static str {
        match self {
            NumberLocale::EsAr => "es-AR",
            NumberLocale::PtBr => "pt-BR",
            NumberLocale::DeDe => "de-DE",
            NumberLocale::EnUs => "en-US",
            NumberLocale::EsMx => "es-MX",
            NumberLocale::FrFr => "fr-FR",
        }
    }

    /// Thousands separator.
    pub const fn grouping(&self) -> char {
        match self {
            NumberLocale::EsAr | NumberLocale::PtBr | NumberLocale::DeDe => '.',
            NumberLocale::EnUs | NumberLocale::EsMx => ',',
            NumberLocale::FrFr => ' ',
        }
    }

    /// Decimal mark.
    pub const fn decimal(&self) -> char {
        match self {
            NumberLocale::EnUs | NumberLocale::EsMx => '.',
            _ => ',',
        }
    }
}

impl fmt::Display for NumberLocale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for NumberLocale {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().replace('_', "-").to_lowercase().as_str() {
            "es-ar" => Ok(NumberLocale::EsAr),
            "pt-br" => Ok(NumberLocale::PtBr),
            "de-de" => Ok(NumberLocale::DeDe),
            "en-us" => Ok(NumberLocale::EnUs),
            "es-mx" => Ok(NumberLocale::EsMx),
            "fr-fr" => Ok(NumberLocale::FrFr),
            _ => Err(CoreError::UnknownLocale(s.to_string())),
        }
    }
}

impl TryFrom<String> for NumberLocale {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<NumberLocale> for String {
    fn from(locale: NumberLocale) -> Self {
        locale.tag().to_string()
    }
}

// =============================================================================
// Price
// =============================================================================

/// A listing price: amount plus ISO 4217 currency code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Price {
    pub amount: Money,
    pub currency: String,
}

impl Price {
    pub fn new(amount: Money, currency: impl Into<String>) -> Self {
        Price {
            amount,
            currency: currency.into().to_uppercase(),
        }
    }

    /// The prefix shown before the amount.
    ///
    /// Dollar-style currencies share `$`, the way Latin American storefronts
    /// print them; unknown codes fall back to `"XYZ "`.
    pub fn symbol(&self) -> String {
        match self.currency.as_str() {
            "ARS" | "USD" | "MXN" | "CLP" | "COP" => "$".to_string(),
            "BRL" => "R$".to_string(),
            "EUR" => "€".to_string(),
            other => format!("{} ", other),
        }
    }

    /// Full display string, e.g. `$1.234,50`.
    pub fn display(&self, locale: NumberLocale) -> String {
        format!("{}{}", self.symbol(), self.amount.format(locale))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
