use derive_more::From;
use std::fmt::{Display, Write};
use strum::FromRepr;

/// A value printed with an SI prefix, e.g. `2.000m` or `1.250G`.
///
/// The formatter precision sets the number of significant decimals (default 3);
/// the alternate flag prints `u` instead of `µ`.
#[derive(Debug, Clone, Copy, From, PartialEq)]
pub struct ScaledNumber(pub f64);

impl Display for ScaledNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (mantissa, prefix) = unscale(self.0);
        let decimals = f.precision().unwrap_or(3);

        // 12.34 and 123.4 keep the same number of digits as 1.234
        let prec = if mantissa == 0.0 || !mantissa.is_finite() {
            decimals
        } else {
            decimals.saturating_sub(mantissa.abs().log10().floor().max(0.0) as usize)
        };

        if f.sign_plus() {
            write!(f, "{mantissa:+.prec$}")?;
        } else {
            write!(f, "{mantissa:.prec$}")?;
        }

        match prefix.symbol(f.alternate()) {
            Some(c) => f.write_char(c),
            None => Ok(()),
        }
    }
}

/// Splits `value` into a mantissa in `[1, 1000)` and the matching SI prefix.
///
/// Magnitudes outside the prefix range are clamped to pico / giga.
pub fn unscale(value: f64) -> (f64, SiPrefix) {
    if value == 0.0 || !value.is_finite() {
        return (value, SiPrefix::None);
    }

    let exp = ((value.abs().log10() / 3.0).floor() as i32 * 3)
        .clamp(SiPrefix::Pico as i32, SiPrefix::Giga as i32);

    let prefix = SiPrefix::from_repr(exp as i8).unwrap_or_default();
    (value * 10.0f64.powi(-exp), prefix)
}

#[derive(Debug, Default, FromRepr, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(i8)]
pub enum SiPrefix {
    Pico = -12,
    Nano = -9,
    Micro = -6,
    Milli = -3,
    #[default]
    None = 0,
    Kilo = 3,
    Mega = 6,
    Giga = 9,
}

impl SiPrefix {
    pub fn exponent(self) -> i32 {
        self as i8 as i32
    }

    /// `ascii` selects `u` over `µ` for micro.
    pub fn symbol(self, ascii: bool) -> Option<char> {
        Some(match self {
            SiPrefix::Pico => 'p',
            SiPrefix::Nano => 'n',
            SiPrefix::Micro if ascii => 'u',
            SiPrefix::Micro => 'µ',
            SiPrefix::Milli => 'm',
            SiPrefix::None => return None,
            SiPrefix::Kilo => 'k',
            SiPrefix::Mega => 'M',
            SiPrefix::Giga => 'G',
        })
    }
}
