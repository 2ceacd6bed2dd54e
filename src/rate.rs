use crate::{data::units::Rational, state::SessionState};
use log::debug;
use snafu::{ensure, OptionExt, Snafu};

#[derive(Debug, Snafu)]
pub enum RateError {
    #[snafu(display("timebase {timebase:?} is zero seconds per division"))]
    InvalidTimebase { timebase: Rational },
    #[snafu(display("horizontal division count is zero"))]
    InvalidDivisions,
    #[snafu(display("{setting} is unknown"))]
    UnknownSetting { setting: &'static str },
}

/// Samples per second when `samples` span `divisions` divisions of `timebase` seconds each.
///
/// Exact integer arithmetic, rounded down.
pub fn sample_rate(timebase: Rational, divisions: u8, samples: u64) -> Result<u64, RateError> {
    ensure!(!timebase.is_zero(), InvalidTimebaseSnafu { timebase });
    ensure!(divisions > 0, InvalidDivisionsSnafu);

    let numerator = u128::from(samples) * u128::from(timebase.denominator());
    let denominator = u128::from(timebase.numerator()) * u128::from(divisions);
    Ok(u64::try_from(numerator / denominator).unwrap_or(u64::MAX))
}

impl SessionState {
    /// Rate implied by the selected timebase, the live division count and the record length.
    ///
    /// Always computed from the current values; call again after any mode change.
    pub fn derive_sample_rate(&self) -> Result<u64, RateError> {
        let timebase = self
            .timebase_value()
            .context(UnknownSettingSnafu { setting: "timebase" })?;
        sample_rate(timebase, self.xdivs(), self.samples_per_screen())
    }

    /// Re-derives and stores the sample rate. On failure the stored rate is cleared.
    pub fn update_sample_rate(&mut self) -> Result<u64, RateError> {
        let derived = self.derive_sample_rate();
        self.sample_rate = derived.as_ref().ok().copied();
        if let Some(rate) = self.sample_rate {
            debug!("sample rate now {rate} Sa/s");
        }
        derived
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::{HMO_COMPACT2, RTB2000};

    #[test]
    fn test_sample_rate_exact() {
        assert_eq!(sample_rate(Rational(1, 1000), 10, 10_000).unwrap(), 1_000_000);
        assert_eq!(sample_rate(Rational(2, 1_000_000_000), 12, 6000).unwrap(), 250_000_000_000);
        // 1000 / (3 * 1) rounds down
        assert_eq!(sample_rate(Rational(3, 1), 1, 1000).unwrap(), 333);
    }

    #[test]
    fn test_sample_rate_scale_invariant() {
        let base = sample_rate(Rational(2, 1000), 10, 5000).unwrap();
        assert_eq!(sample_rate(Rational(4, 2000), 10, 5000).unwrap(), base);
        // twice the time per screen with twice the samples
        assert_eq!(sample_rate(Rational(4, 1000), 10, 10_000).unwrap(), base);
        assert_eq!(sample_rate(Rational(2, 1000), 20, 10_000).unwrap(), base);
    }

    #[test]
    fn test_zero_timebase_fails() {
        assert!(matches!(
            sample_rate(Rational(0, 1000), 10, 100),
            Err(RateError::InvalidTimebase { .. })
        ));
        assert!(matches!(
            sample_rate(Rational(1, 0), 10, 100),
            Err(RateError::InvalidTimebase { .. })
        ));
        assert!(matches!(
            sample_rate(Rational(1, 1), 0, 100),
            Err(RateError::InvalidDivisions)
        ));
    }

    #[test]
    fn test_saturates() {
        assert_eq!(sample_rate(Rational(1, u64::MAX), 1, u64::MAX).unwrap(), u64::MAX);
    }

    #[test]
    fn test_derive_from_state() {
        let mut state = SessionState::new(&RTB2000);
        assert!(matches!(
            state.derive_sample_rate(),
            Err(RateError::UnknownSetting { setting: "timebase" })
        ));

        let ms = RTB2000.timebases.position_text("1e-3").unwrap();
        state.set_timebase(ms).unwrap();
        // descriptor defaults: 10_000 samples over 10 divisions
        assert_eq!(state.update_sample_rate().unwrap(), 1_000_000);
        assert_eq!(state.sample_rate, Some(1_000_000));

        // idempotent with unchanged inputs
        assert_eq!(state.derive_sample_rate().unwrap(), 1_000_000);
    }

    #[test]
    fn test_division_change_requires_rederive() {
        let mut state = SessionState::new(&HMO_COMPACT2);
        let ms = HMO_COMPACT2.timebases.position_text("1e-3").unwrap();
        state.set_timebase(ms).unwrap();
        state.set_record_length(12_000).unwrap();
        assert_eq!(state.update_sample_rate().unwrap(), 1_000_000);

        state.set_horizontal_divisions(15).unwrap();
        assert_eq!(state.sample_rate, None);
        assert_eq!(state.update_sample_rate().unwrap(), 800_000);
    }
}
