//! Value types for Yuho's domain literals: currencies, money amounts and
//! calendar durations.

use std::fmt::Display;

use bigdecimal::BigDecimal;

/// Currencies reachable from the fixed symbol table of the language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Currency {
    SGD,
    USD,
    EUR,
    GBP,
    JPY,
    INR,
    AUD,
    CAD,
    CHF,
}

impl Currency {
    /// Map a concrete currency symbol to its tag. The bare `$` is USD.
    pub fn from_symbol(symbol: &str) -> Option<Currency> {
        match symbol {
            "$" | "US$" => Some(Currency::USD),
            "S$" => Some(Currency::SGD),
            "€" => Some(Currency::EUR),
            "£" => Some(Currency::GBP),
            "¥" => Some(Currency::JPY),
            "₹" => Some(Currency::INR),
            "A$" => Some(Currency::AUD),
            "C$" => Some(Currency::CAD),
            "CHF" => Some(Currency::CHF),
            _ => None,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::SGD => "S$",
            Currency::USD => "US$",
            Currency::EUR => "€",
            Currency::GBP => "£",
            Currency::JPY => "¥",
            Currency::INR => "₹",
            Currency::AUD => "A$",
            Currency::CAD => "C$",
            Currency::CHF => "CHF",
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Currency::SGD => "SGD",
            Currency::USD => "USD",
            Currency::EUR => "EUR",
            Currency::GBP => "GBP",
            Currency::JPY => "JPY",
            Currency::INR => "INR",
            Currency::AUD => "AUD",
            Currency::CAD => "CAD",
            Currency::CHF => "CHF",
        }
    }

    pub fn all() -> &'static [Currency] {
        &[
            Currency::SGD,
            Currency::USD,
            Currency::EUR,
            Currency::GBP,
            Currency::JPY,
            Currency::INR,
            Currency::AUD,
            Currency::CAD,
            Currency::CHF,
        ]
    }
}

impl Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Render a money amount the way statutes print it: symbol, thousand
/// separators, two decimal places (`S$10,000.00`).
pub fn format_money(currency: Currency, amount: &BigDecimal) -> String {
    let rounded = amount.with_scale(2);
    let text = rounded.to_string();
    let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), "00"));
    let (sign, digits) = match int_part.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", int_part),
    };

    let mut grouped = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    format!("{sign}{}{grouped}.{frac_part}", currency.symbol())
}

/// Signed per-unit counts of a duration literal. Units never normalise into
/// each other; `18 months` stays 18 months.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct DurationValue {
    pub years: i64,
    pub months: i64,
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
}

impl DurationValue {
    pub fn is_zero(&self) -> bool {
        *self == DurationValue::default()
    }

    /// Approximate total length in days, used when a single ordered scalar
    /// is needed (SMT penalty bounds).
    pub fn total_days(&self) -> i64 {
        self.years * 365
            + self.months * 30
            + self.days
            + (self.hours * 3600 + self.minutes * 60 + self.seconds) / 86_400
    }

    fn units(&self) -> [(i64, &'static str); 6] {
        [
            (self.years, "year"),
            (self.months, "month"),
            (self.days, "day"),
            (self.hours, "hour"),
            (self.minutes, "minute"),
            (self.seconds, "second"),
        ]
    }
}

impl Display for DurationValue {
    /// Long form: `2 years and 3 days`.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .units()
            .iter()
            .filter(|(count, _)| *count != 0)
            .map(|(count, unit)| {
                if count.abs() == 1 {
                    format!("{count} {unit}")
                } else {
                    format!("{count} {unit}s")
                }
            })
            .collect();

        match parts.len() {
            0 => f.write_str("0 days"),
            1 => f.write_str(&parts[0]),
            _ => {
                let (last, init) = parts.split_last().unwrap();
                write!(f, "{} and {last}", init.join(", "))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_currency_symbol_table() {
        assert_eq!(Currency::from_symbol("$"), Some(Currency::USD));
        assert_eq!(Currency::from_symbol("S$"), Some(Currency::SGD));
        assert_eq!(Currency::from_symbol("CHF"), Some(Currency::CHF));
        assert_eq!(Currency::from_symbol("??"), None);
    }

    #[test]
    fn test_format_money_grouping() {
        let amount = BigDecimal::from_str("10000").unwrap();
        assert_eq!(format_money(Currency::SGD, &amount), "S$10,000.00");

        let amount = BigDecimal::from_str("1234567.5").unwrap();
        assert_eq!(format_money(Currency::USD, &amount), "US$1,234,567.50");
    }

    #[test]
    fn test_duration_long_form() {
        let duration = DurationValue {
            years: 2,
            days: 3,
            ..Default::default()
        };
        assert_eq!(duration.to_string(), "2 years and 3 days");

        let duration = DurationValue {
            years: 1,
            months: 2,
            days: 15,
            ..Default::default()
        };
        assert_eq!(duration.to_string(), "1 year, 2 months and 15 days");

        assert_eq!(DurationValue::default().to_string(), "0 days");
    }

    #[test]
    fn test_duration_total_days() {
        let duration = DurationValue {
            years: 1,
            months: 2,
            days: 5,
            ..Default::default()
        };
        assert_eq!(duration.total_days(), 365 + 60 + 5);
    }
}
