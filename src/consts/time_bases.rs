use crate::data::units::Rational;

const NS: u64 = 1_000_000_000;
const US: u64 = 1_000_000;
const MS: u64 = 1_000;

/// Supported horizontal scales (seconds per division) on the HMO series.
pub const TIME_BASES: [Rational; 31] = [
    Rational(2, NS),
    Rational(5, NS),
    Rational(10, NS),
    Rational(20, NS),
    Rational(50, NS),
    Rational(100, NS),
    Rational(200, NS),
    Rational(500, NS),
    Rational(1, US),
    Rational(2, US),
    Rational(5, US),
    Rational(10, US),
    Rational(20, US),
    Rational(50, US),
    Rational(100, US),
    Rational(200, US),
    Rational(500, US),
    Rational(1, MS),
    Rational(2, MS),
    Rational(5, MS),
    Rational(10, MS),
    Rational(20, MS),
    Rational(50, MS),
    Rational(100, MS),
    Rational(200, MS),
    Rational(500, MS),
    Rational(1, 1),
    Rational(2, 1),
    Rational(5, 1),
    Rational(10, 1),
    Rational(20, 1),
];

/// RTB/RTM/RTC series reach down to 1 ns/div and up to 50 s/div.
pub const RT_TIME_BASES: [Rational; 33] = [
    Rational(1, NS),
    Rational(2, NS),
    Rational(5, NS),
    Rational(10, NS),
    Rational(20, NS),
    Rational(50, NS),
    Rational(100, NS),
    Rational(200, NS),
    Rational(500, NS),
    Rational(1, US),
    Rational(2, US),
    Rational(5, US),
    Rational(10, US),
    Rational(20, US),
    Rational(50, US),
    Rational(100, US),
    Rational(200, US),
    Rational(500, US),
    Rational(1, MS),
    Rational(2, MS),
    Rational(5, MS),
    Rational(10, MS),
    Rational(20, MS),
    Rational(50, MS),
    Rational(100, MS),
    Rational(200, MS),
    Rational(500, MS),
    Rational(1, 1),
    Rational(2, 1),
    Rational(5, 1),
    Rational(10, 1),
    Rational(20, 1),
    Rational(50, 1),
];
