//! Money formatting for minor-unit (cents) amounts.
//!
//! Patterns follow the storefront `money_format` convention: free text around a
//! single `{{ token }}` placeholder, e.g. `${{amount}}` or `{{amount_with_comma_separator}} €`.
//!
//! | Token                                     | 150000       |
//! |-------------------------------------------|--------------|
//! | `amount`                                  | `1,500.00`   |
//! | `amount_no_decimals`                      | `1,500`      |
//! | `amount_with_comma_separator`             | `1.500,00`   |
//! | `amount_no_decimals_with_comma_separator` | `1.500`      |
//!
//! Formatting never fails: malformed input renders as the pattern's zero.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::Value;

/// Pattern used when none is configured.
pub const DEFAULT_MONEY_FORMAT: &str = "${{amount}}";

/// The figure style selected by the placeholder token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AmountStyle {
    /// `1,134.65`
    #[default]
    Amount,
    /// `1,135`
    NoDecimals,
    /// `1.134,65`
    WithCommaSeparator,
    /// `1.135`
    NoDecimalsWithCommaSeparator,
}

impl AmountStyle {
    /// Look up a style by its placeholder token.
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim() {
            "amount" => Some(Self::Amount),
            "amount_no_decimals" => Some(Self::NoDecimals),
            "amount_with_comma_separator" => Some(Self::WithCommaSeparator),
            "amount_no_decimals_with_comma_separator" => Some(Self::NoDecimalsWithCommaSeparator),
            _ => None,
        }
    }

    const fn decimals(self) -> u32 {
        match self {
            Self::Amount | Self::WithCommaSeparator => 2,
            Self::NoDecimals | Self::NoDecimalsWithCommaSeparator => 0,
        }
    }

    /// `(thousands, decimal)` separators.
    const fn separators(self) -> (char, char) {
        match self {
            Self::Amount | Self::NoDecimals => (',', '.'),
            Self::WithCommaSeparator | Self::NoDecimalsWithCommaSeparator => ('.', ','),
        }
    }
}

/// A parsed money pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoneyFormat {
    prefix: String,
    style: AmountStyle,
    suffix: String,
}

impl Default for MoneyFormat {
    fn default() -> Self {
        Self::parse(DEFAULT_MONEY_FORMAT)
    }
}

impl MoneyFormat {
    /// Parse a pattern.
    ///
    /// Only the first `{{ ... }}` placeholder is honoured. An unknown token
    /// falls back to [`AmountStyle::Amount`]. A pattern with no placeholder is
    /// treated as a bare token when it names one (`"amount"`), otherwise the
    /// figure is rendered on its own.
    #[must_use]
    pub fn parse(pattern: &str) -> Self {
        if let Some(open) = pattern.find("{{")
            && let Some(close) = pattern[open + 2..].find("}}")
        {
            let token = &pattern[open + 2..open + 2 + close];
            return Self {
                prefix: pattern[..open].to_string(),
                style: AmountStyle::from_token(token).unwrap_or_default(),
                suffix: pattern[open + 2 + close + 2..].to_string(),
            };
        }

        Self {
            prefix: String::new(),
            style: AmountStyle::from_token(pattern).unwrap_or_default(),
            suffix: String::new(),
        }
    }

    /// The style selected by this pattern's placeholder.
    #[must_use]
    pub const fn style(&self) -> AmountStyle {
        self.style
    }

    /// Render an amount given in cents.
    ///
    /// Negative amounts get a single leading minus in front of the whole
    /// rendering, symbol included (`-$5.00`).
    #[must_use]
    pub fn format(&self, cents: i64) -> String {
        let rendered = format!(
            "{}{}{}",
            self.prefix,
            figure(cents.unsigned_abs(), self.style),
            self.suffix
        );
        if cents < 0 {
            format!("-{rendered}")
        } else {
            rendered
        }
    }

    /// The rendering of zero for this pattern.
    #[must_use]
    pub fn zero(&self) -> String {
        self.format(0)
    }

    /// Render a loosely typed amount (JSON number or numeric string).
    ///
    /// Fractional cents are rounded half away from zero. Anything that is not
    /// a finite number renders as [`MoneyFormat::zero`].
    #[must_use]
    pub fn format_value(&self, value: &Value) -> String {
        cents_from_value(value).map_or_else(|| self.zero(), |cents| self.format(cents))
    }
}

/// Format `cents` with `pattern`.
///
/// ```
/// use theme_cart_core::format_money;
///
/// assert_eq!(format_money(150_000, "${{amount}}"), "$1,500.00");
/// assert_eq!(format_money(-500, "${{amount}}"), "-$5.00");
/// assert_eq!(format_money(0, "amount"), "0.00");
/// ```
#[must_use]
pub fn format_money(cents: i64, pattern: &str) -> String {
    MoneyFormat::parse(pattern).format(cents)
}

/// Format a loosely typed amount with `pattern`, degrading to zero.
#[must_use]
pub fn format_money_value(value: &Value, pattern: &str) -> String {
    MoneyFormat::parse(pattern).format_value(value)
}

fn cents_from_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().and_then(round_cents)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(round_cents))
        }
        _ => None,
    }
}

fn round_cents(value: f64) -> Option<i64> {
    if !value.is_finite() {
        return None;
    }
    Decimal::from_f64_retain(value)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
}

fn figure(abs_cents: u64, style: AmountStyle) -> String {
    let (thousands, decimal) = style.separators();
    let amount = Decimal::from_i128_with_scale(i128::from(abs_cents), 2)
        .round_dp_with_strategy(style.decimals(), RoundingStrategy::MidpointAwayFromZero);

    let whole = amount.trunc().to_u64().unwrap_or(0);
    let grouped = group_thousands(whole, thousands);

    if style.decimals() == 0 {
        return grouped;
    }

    let fraction = (amount.fract() * Decimal::ONE_HUNDRED).to_u64().unwrap_or(0);
    format!("{grouped}{decimal}{fraction:02}")
}

fn group_thousands(whole: u64, separator: char) -> String {
    let digits = whole.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(separator);
        }
        out.push(ch);
    }
    out
}
