//! Type-safe monetary value with embedded currency.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::DomainError;

/// Currencies supported by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    BRL,
    IDR,
    PHP,
    USD,
}

impl Currency {
    /// Returns the number of decimal places for this currency.
    pub fn decimal_places(&self) -> u8 {
        match self {
            Currency::BRL | Currency::IDR | Currency::PHP | Currency::USD => 2,
        }
    }

    /// Returns the ISO 4217 numeric code, zero-padded to three digits.
    ///
    /// This is the form QR payloads carry in their currency field.
    pub fn iso_numeric(&self) -> &'static str {
        match self {
            Currency::BRL => "986",
            Currency::IDR => "360",
            Currency::PHP => "608",
            Currency::USD => "840",
        }
    }

    /// Returns the currency symbol.
    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::BRL => "R$",
            Currency::IDR => "Rp",
            Currency::PHP => "₱",
            Currency::USD => "$",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::str::FromStr for Currency {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "BRL" => Ok(Currency::BRL),
            "IDR" => Ok(Currency::IDR),
            "PHP" => Ok(Currency::PHP),
            "USD" => Ok(Currency::USD),
            other => Err(DomainError::Validation(format!(
                "Unknown currency: {other}"
            ))),
        }
    }
}

/// Type-safe money representation with embedded currency.
///
/// Amount is stored in the smallest unit of the currency (centavos, sen,
/// cents) to avoid floating-point precision issues. Provider APIs that
/// speak decimal major units convert at the adapter boundary via
/// [`Money::to_decimal_string`] and [`Money::from_decimal_str`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    amount: i64,
    currency: Currency,
}

impl Money {
    /// Creates a new Money value.
    pub fn new(amount: i64, currency: Currency) -> Result<Self, DomainError> {
        if amount < 0 {
            return Err(DomainError::NegativeAmount);
        }
        Ok(Self { amount, currency })
    }

    /// Creates a zero-value Money for the given currency.
    pub fn zero(currency: Currency) -> Self {
        Self {
            amount: 0,
            currency,
        }
    }

    /// Returns the amount in smallest currency unit.
    pub fn amount(&self) -> i64 {
        self.amount
    }

    /// Returns the currency.
    pub fn currency(&self) -> Currency {
        self.currency
    }

    /// Checked addition - returns error if currencies don't match.
    pub fn checked_add(&self, other: Money) -> Result<Money, DomainError> {
        if self.currency != other.currency {
            return Err(DomainError::CurrencyMismatch {
                expected: self.currency,
                got: other.currency,
            });
        }
        Ok(Money {
            amount: self.amount.saturating_add(other.amount),
            currency: self.currency,
        })
    }

    /// Checked subtraction - returns error if currencies don't match or
    /// the result would be negative.
    pub fn checked_sub(&self, other: Money) -> Result<Money, DomainError> {
        if self.currency != other.currency {
            return Err(DomainError::CurrencyMismatch {
                expected: self.currency,
                got: other.currency,
            });
        }
        if self.amount < other.amount {
            return Err(DomainError::InsufficientFunds {
                available: self.amount,
                requested: other.amount,
            });
        }
        Ok(Money {
            amount: self.amount - other.amount,
            currency: self.currency,
        })
    }

    /// Returns true if this Money is greater than or equal to the other.
    pub fn gte(&self, other: &Money) -> bool {
        assert_eq!(
            self.currency, other.currency,
            "Cannot compare Money with different currencies"
        );
        self.amount >= other.amount
    }

    /// Renders the amount as a bare decimal string in major units with
    /// exactly two fraction digits, e.g. `10000 -> "100.00"`.
    ///
    /// This is the wire form instant-payment charge APIs expect.
    pub fn to_decimal_string(&self) -> String {
        let major = self.amount / 100;
        let minor = (self.amount % 100).abs();
        format!("{}.{:02}", major, minor)
    }

    /// Parses a decimal major-unit string (`"100.00"`, `"7"`, `"0.5"`)
    /// back into minor units.
    pub fn from_decimal_str(s: &str, currency: Currency) -> Result<Self, DomainError> {
        let s = s.trim();
        let (major_str, frac_str) = match s.split_once('.') {
            Some((m, f)) => (m, f),
            None => (s, ""),
        };
        if major_str.is_empty() || !major_str.chars().all(|c| c.is_ascii_digit()) {
            return Err(DomainError::Validation(format!("Invalid amount: {s:?}")));
        }
        if frac_str.len() > 2 || !frac_str.chars().all(|c| c.is_ascii_digit()) {
            return Err(DomainError::Validation(format!("Invalid amount: {s:?}")));
        }
        let major: i64 = major_str
            .parse()
            .map_err(|_| DomainError::Validation(format!("Invalid amount: {s:?}")))?;
        let mut frac: i64 = if frac_str.is_empty() {
            0
        } else {
            frac_str
                .parse()
                .map_err(|_| DomainError::Validation(format!("Invalid amount: {s:?}")))?
        };
        if frac_str.len() == 1 {
            frac *= 10;
        }
        let amount = major
            .checked_mul(100)
            .and_then(|cents| cents.checked_add(frac))
            .ok_or_else(|| DomainError::Validation(format!("Amount out of range: {s:?}")))?;
        Money::new(amount, currency)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.currency.symbol(), self.to_decimal_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_creation() {
        let money = Money::new(1000, Currency::BRL).unwrap();
        assert_eq!(money.amount(), 1000);
        assert_eq!(money.currency(), Currency::BRL);
    }

    #[test]
    fn test_negative_money_fails() {
        let result = Money::new(-100, Currency::BRL);
        assert!(matches!(result, Err(DomainError::NegativeAmount)));
    }

    #[test]
    fn test_money_addition() {
        let a = Money::new(100, Currency::BRL).unwrap();
        let b = Money::new(50, Currency::BRL).unwrap();
        let sum = a.checked_add(b).unwrap();
        assert_eq!(sum.amount(), 150);
    }

    #[test]
    fn test_currency_mismatch() {
        let brl = Money::new(100, Currency::BRL).unwrap();
        let idr = Money::new(50, Currency::IDR).unwrap();
        let result = brl.checked_add(idr);
        assert!(matches!(result, Err(DomainError::CurrencyMismatch { .. })));
    }

    #[test]
    fn test_decimal_string() {
        let money = Money::new(10000, Currency::BRL).unwrap();
        assert_eq!(money.to_decimal_string(), "100.00");

        let money = Money::new(1050, Currency::BRL).unwrap();
        assert_eq!(money.to_decimal_string(), "10.50");

        let money = Money::new(7, Currency::BRL).unwrap();
        assert_eq!(money.to_decimal_string(), "0.07");
    }

    #[test]
    fn test_from_decimal_str_roundtrip() {
        for raw in [0, 1, 99, 100, 10000, 123456789] {
            let money = Money::new(raw, Currency::BRL).unwrap();
            let parsed =
                Money::from_decimal_str(&money.to_decimal_string(), Currency::BRL).unwrap();
            assert_eq!(parsed, money);
        }
    }

    #[test]
    fn test_from_decimal_str_short_fraction() {
        let money = Money::from_decimal_str("0.5", Currency::BRL).unwrap();
        assert_eq!(money.amount(), 50);

        let money = Money::from_decimal_str("7", Currency::BRL).unwrap();
        assert_eq!(money.amount(), 700);
    }

    #[test]
    fn test_from_decimal_str_rejects_garbage() {
        assert!(Money::from_decimal_str("abc", Currency::BRL).is_err());
        assert!(Money::from_decimal_str("1.234", Currency::BRL).is_err());
        assert!(Money::from_decimal_str("", Currency::BRL).is_err());
        assert!(Money::from_decimal_str("-5.00", Currency::BRL).is_err());
    }

    #[test]
    fn test_from_decimal_str_rejects_out_of_range() {
        // One centavo past i64::MAX once scaled to minor units.
        let result = Money::from_decimal_str("92233720368547758.08", Currency::BRL);
        assert!(matches!(result, Err(DomainError::Validation(_))));
        // Overflows during the major-unit scaling itself.
        let result = Money::from_decimal_str("999999999999999999.99", Currency::BRL);
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[test]
    fn test_iso_numeric() {
        assert_eq!(Currency::BRL.iso_numeric(), "986");
        assert_eq!(Currency::IDR.iso_numeric(), "360");
    }

    #[test]
    fn test_money_display() {
        let money = Money::new(1050, Currency::USD).unwrap();
        assert_eq!(format!("{}", money), "$10.50");
    }
}
