use crate::data::units::Rational;

/// Supported vertical scales (volts per division) at 1X probe attenuation.
pub const VERTICAL_SCALES: [Rational; 13] = [
    Rational(1, 1000),
    Rational(2, 1000),
    Rational(5, 1000),
    Rational(10, 1000),
    Rational(20, 1000),
    Rational(50, 1000),
    Rational(100, 1000),
    Rational(200, 1000),
    Rational(500, 1000),
    Rational(1, 1),
    Rational(2, 1),
    Rational(5, 1),
    Rational(10, 1),
];
