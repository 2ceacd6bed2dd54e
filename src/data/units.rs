use crate::scaled_number::ScaledNumber;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Write};
use strum::Display as StrumDisplay;

/// Exact `numerator / denominator` value, in seconds (timebases) or volts (vertical scales)
/// per division.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Rational(pub u64, pub u64);

impl Rational {
    pub const fn numerator(self) -> u64 {
        self.0
    }

    pub const fn denominator(self) -> u64 {
        self.1
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0 || self.1 == 0
    }

    pub fn as_f64(self) -> f64 {
        self.0 as f64 / self.1 as f64
    }

    /// Exact comparison against an instrument reply such as `"2.000E-03"`.
    pub fn matches_text(self, text: &str) -> bool {
        let Some(decimal) = Decimal::parse(text) else {
            return false;
        };
        if decimal.negative && decimal.digits != 0 {
            return false;
        }

        let p = u128::from(self.0);
        let q = u128::from(self.1);
        let shift = decimal.exponent.unsigned_abs();

        let lhs_rhs = if decimal.exponent >= 0 {
            pow10(shift)
                .and_then(|scale| decimal.digits.checked_mul(scale))
                .and_then(|value| value.checked_mul(q))
                .map(|lhs| (lhs, p))
        } else {
            pow10(shift)
                .and_then(|scale| p.checked_mul(scale))
                .and_then(|rhs| decimal.digits.checked_mul(q).map(|lhs| (lhs, rhs)))
        };

        matches!(lhs_rhs, Some((lhs, rhs)) if lhs == rhs)
    }

    /// Relative comparison against a float reply.
    pub fn approx_eq(self, value: f64) -> bool {
        let own = self.as_f64();
        (own - value).abs() <= own.abs() * 1e-6
    }
}

impl Display for Rational {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        ScaledNumber::from(self.as_f64()).fmt(f)
    }
}

fn pow10(exp: u32) -> Option<u128> {
    10u128.checked_pow(exp)
}

/// Decimal in scientific notation, `digits * 10^exponent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Decimal {
    negative: bool,
    digits: u128,
    exponent: i32,
}

impl Decimal {
    fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let (mantissa, exponent) = match text.find(['e', 'E']) {
            Some(pos) => (&text[..pos], text[pos + 1..].parse::<i32>().ok()?),
            None => (text, 0),
        };

        let (negative, mantissa) = match mantissa.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, mantissa.strip_prefix('+').unwrap_or(mantissa)),
        };

        let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));
        if int_part.is_empty() && frac_part.is_empty() {
            return None;
        }

        let mut digits = 0u128;
        for c in int_part.chars().chain(frac_part.chars()) {
            let d = c.to_digit(10)?;
            digits = digits.checked_mul(10)?.checked_add(u128::from(d))?;
        }

        Some(Self {
            negative,
            digits,
            exponent: exponent.checked_sub(i32::try_from(frac_part.len()).ok()?)?,
        })
    }
}

/// Physical quantity measured by an analog channel's probe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, StrumDisplay, Serialize, Deserialize)]
pub enum ProbeUnit {
    #[default]
    #[strum(serialize = "V")]
    Volt,
    #[strum(serialize = "A")]
    Ampere,
}

impl ProbeUnit {
    /// Instruments answer with the unit name; anything not starting with `A` is a voltage probe.
    pub fn from_reply(reply: &str) -> Self {
        if reply.trim_start().starts_with(['A', 'a']) {
            ProbeUnit::Ampere
        } else {
            ProbeUnit::Volt
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SampleRate(pub u64);

impl Display for SampleRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        ScaledNumber::from(self.0 as f64).fmt(f)?;
        f.write_str("Sa/s")
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Voltage(pub f64);

impl Display for Voltage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        ScaledNumber::from(self.0).fmt(f)?;
        f.write_char('V')
    }
}
