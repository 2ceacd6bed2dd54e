//! Live mirror of an instrument's settings.

use crate::{
    consts::MAX_TRIGGER_PATTERN_LENGTH,
    data::units::{ProbeUnit, Rational, SampleRate, Voltage},
    exchange::{ExchangeAdapter, ExchangeError, Query, Response},
    model::{OptionTable, ScopeModel},
};
use arrayvec::ArrayString;
use derive_more::Display;
use log::{debug, info, warn};
use serde::Serialize;
use snafu::{ensure, OptionExt, Snafu};

/// Settings of one analog channel. `None` means not yet read from the instrument.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnalogChannelState {
    pub enabled: Option<bool>,
    /// Index into the descriptor's coupling table.
    pub coupling: Option<usize>,
    /// Index into the descriptor's vertical scale table.
    pub vscale: Option<usize>,
    pub vertical_offset: Option<f32>,
    pub probe_unit: Option<ProbeUnit>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DigitalPodState {
    pub enabled: Option<bool>,
    /// Index into the descriptor's logic threshold table.
    pub threshold: Option<usize>,
    /// Level in volts, meaningful only while a user-defined preset is selected.
    pub user_threshold: Option<f32>,
}

pub type TriggerPattern = ArrayString<MAX_TRIGGER_PATTERN_LENGTH>;

/// Mutable settings of one connected instrument, sized once from its descriptor.
///
/// The per-channel and per-pod arrays are only reachable as slices, so their
/// lengths stay what [`SessionState::new`] made them.
#[derive(Debug, Clone, Serialize)]
pub struct SessionState {
    #[serde(skip)]
    model: &'static ScopeModel,

    analog_channels: Box<[AnalogChannelState]>,
    digital_channels: Box<[Option<bool>]>,
    digital_pods: Box<[DigitalPodState]>,

    pub timebase: Option<usize>,
    /// Live horizontal division count, which some acquisition modes widen.
    pub horizontal_divisions: Option<u8>,
    /// Samples the instrument returns per screen.
    pub record_length: Option<u64>,
    pub sample_rate: Option<u64>,
    pub waveform_sample_rate: Option<usize>,
    pub interpolation_mode: Option<usize>,
    /// Fraction of the screen, 0.5 being the center.
    pub horiz_triggerpos: Option<f64>,
    pub trigger_source: Option<usize>,
    pub trigger_slope: Option<usize>,
    pub trigger_pattern: Option<TriggerPattern>,
    pub high_resolution: Option<bool>,
    pub peak_detection: Option<bool>,
}

#[derive(Debug, Snafu)]
pub enum SettingError {
    #[snafu(display("{what} index {index} out of range for {model} ({len} entries)"))]
    OutOfRange {
        what: &'static str,
        index: usize,
        len: usize,
        model: &'static str,
    },
    #[snafu(display("{value} is not a valid {what}"))]
    InvalidValue { what: &'static str, value: String },
}

/// Why a single setting could not be refreshed.
#[derive(Debug, Snafu)]
pub enum FieldError {
    #[snafu(context(false), display("{source}"))]
    Exchange { source: ExchangeError },
    #[snafu(display("reply {reply:?} does not match any table entry"))]
    NotInTable { reply: String },
    #[snafu(display("reply {value} is out of range"))]
    ReplyOutOfRange { value: i64 },
    #[snafu(display("depends on {needs}, which is unknown"))]
    Unresolvable { needs: Query },
}

#[derive(Debug, Display)]
#[display(fmt = "{}: {}", query, error)]
pub struct FieldFailure {
    pub query: Query,
    pub error: FieldError,
}

#[derive(Debug, Snafu)]
#[snafu(display("{} of {} settings could not be refreshed", failures.len(), attempted))]
pub struct RefreshError {
    pub failures: Vec<FieldFailure>,
    pub attempted: usize,
}

impl RefreshError {
    /// Nothing answered at all.
    pub fn is_total(&self) -> bool {
        self.failures.len() == self.attempted
    }
}

impl SessionState {
    pub fn new(model: &'static ScopeModel) -> Self {
        Self {
            model,
            analog_channels: vec![AnalogChannelState::default(); model.analog_channels as usize]
                .into_boxed_slice(),
            digital_channels: vec![None; model.digital_channels as usize].into_boxed_slice(),
            digital_pods: vec![DigitalPodState::default(); model.digital_pods()].into_boxed_slice(),
            timebase: None,
            horizontal_divisions: None,
            record_length: None,
            sample_rate: None,
            waveform_sample_rate: None,
            interpolation_mode: None,
            horiz_triggerpos: None,
            trigger_source: None,
            trigger_slope: None,
            trigger_pattern: None,
            high_resolution: None,
            peak_detection: None,
        }
    }

    pub fn model(&self) -> &'static ScopeModel {
        self.model
    }

    pub fn analog_channels(&self) -> &[AnalogChannelState] {
        &self.analog_channels
    }

    pub fn analog_channels_mut(&mut self) -> &mut [AnalogChannelState] {
        &mut self.analog_channels
    }

    pub fn digital_channels(&self) -> &[Option<bool>] {
        &self.digital_channels
    }

    pub fn digital_channels_mut(&mut self) -> &mut [Option<bool>] {
        &mut self.digital_channels
    }

    pub fn digital_pods(&self) -> &[DigitalPodState] {
        &self.digital_pods
    }

    pub fn digital_pods_mut(&mut self) -> &mut [DigitalPodState] {
        &mut self.digital_pods
    }

    /// Live division count, or the descriptor's until the instrument has reported one.
    pub fn xdivs(&self) -> u8 {
        self.horizontal_divisions.unwrap_or(self.model.num_xdivs)
    }

    pub fn samples_per_screen(&self) -> u64 {
        self.record_length.unwrap_or(self.model.default_record_length)
    }

    pub fn timebase_value(&self) -> Option<Rational> {
        self.timebase.and_then(|i| self.model.timebases.get(i)).copied()
    }

    /// Reads every tracked setting from the instrument.
    ///
    /// Each query stands alone: a failed one keeps the previous value and is
    /// listed in the returned error, the rest are still applied.
    pub fn refresh<A: ExchangeAdapter>(&mut self, adapter: &mut A) -> Result<(), RefreshError> {
        let model = self.model;
        let mut r = Refresher {
            adapter,
            model,
            attempted: 0,
            failures: Vec::new(),
        };

        for (i, ch) in self.analog_channels.iter_mut().enumerate() {
            r.update(&mut ch.enabled, Query::AnalogChannelState(i), |resp| {
                Ok(resp.into_bool()?)
            });
            r.update(&mut ch.vscale, Query::VerticalScale(i), |resp| {
                lookup_rational(model.vscales, resp)
            });
            r.update(&mut ch.vertical_offset, Query::VerticalOffset(i), |resp| {
                Ok(resp.into_f64()? as f32)
            });
            if !model.coupling_options.is_empty() {
                r.update(&mut ch.coupling, Query::Coupling(i), |resp| {
                    lookup_option(model.coupling_options, resp)
                });
            }
            r.update(&mut ch.probe_unit, Query::ProbeUnit(i), |resp| {
                Ok(ProbeUnit::from_reply(&resp.into_text()?))
            });
        }

        for (i, enabled) in self.digital_channels.iter_mut().enumerate() {
            r.update(enabled, Query::DigitalChannelState(i), |resp| {
                Ok(resp.into_bool()?)
            });
        }

        for (i, pod) in self.digital_pods.iter_mut().enumerate() {
            r.update(&mut pod.enabled, Query::PodState(i), |resp| Ok(resp.into_bool()?));
            if model.logic_thresholds.is_empty() {
                continue;
            }
            r.update(&mut pod.threshold, Query::PodThreshold(i), |resp| {
                let reply = resp.into_text()?;
                lookup_threshold(model.logic_thresholds, &reply).context(NotInTableSnafu { reply })
            });
            if pod.threshold.is_some_and(|t| model.is_user_threshold(t)) {
                r.update(&mut pod.user_threshold, Query::PodUserThreshold(i), |resp| {
                    Ok(resp.into_f64()? as f32)
                });
            }
        }

        r.update(&mut self.timebase, Query::Timebase, |resp| {
            lookup_rational(model.timebases, resp)
        });
        r.update(&mut self.horizontal_divisions, Query::HorizontalDivisions, |resp| {
            let value = resp.into_i64()?;
            u8::try_from(value)
                .ok()
                .filter(|&n| n > 0)
                .context(ReplyOutOfRangeSnafu { value })
        });
        r.update(&mut self.record_length, Query::RecordLength, |resp| {
            let value = resp.into_i64()?;
            u64::try_from(value)
                .ok()
                .filter(|&n| n > 0)
                .context(ReplyOutOfRangeSnafu { value })
        });

        if !model.waveform_sample_rates.is_empty() {
            r.update(&mut self.waveform_sample_rate, Query::WaveformSampleRate, |resp| {
                lookup_option(model.waveform_sample_rates, resp)
            });
        }
        if !model.interpolation_modes.is_empty() {
            r.update(&mut self.interpolation_mode, Query::InterpolationMode, |resp| {
                lookup_option(model.interpolation_modes, resp)
            });
        }

        // The instrument reports seconds from the screen center; convert to a screen fraction.
        let screen = self
            .timebase
            .and_then(|i| model.timebases.get(i))
            .map(|tb| tb.as_f64() * f64::from(self.horizontal_divisions.unwrap_or(model.num_xdivs)));
        match screen {
            Some(screen) => r.update(&mut self.horiz_triggerpos, Query::HorizTriggerPos, |resp| {
                Ok(-(resp.into_f64()? / screen - 0.5))
            }),
            None => r.unresolvable(Query::HorizTriggerPos, Query::Timebase),
        }

        r.update(&mut self.trigger_source, Query::TriggerSource, |resp| {
            lookup_option(model.trigger_sources, resp)
        });
        r.update(&mut self.trigger_slope, Query::TriggerSlope, |resp| {
            lookup_option(model.trigger_slopes, resp)
        });
        r.update(&mut self.trigger_pattern, Query::TriggerPattern, |resp| {
            Ok(parse_pattern(&resp.into_text()?))
        });
        r.update(&mut self.high_resolution, Query::HighResolution, parse_mode_flag);
        r.update(&mut self.peak_detection, Query::PeakDetection, parse_mode_flag);

        let Refresher {
            attempted,
            failures,
            ..
        } = r;

        if let Err(e) = self.update_sample_rate() {
            debug!("sample rate not derived: {e}");
        }
        self.log_state();

        if failures.is_empty() {
            Ok(())
        } else {
            for failure in &failures {
                warn!("could not refresh {failure}");
            }
            Err(RefreshError {
                failures,
                attempted,
            })
        }
    }

    pub fn set_timebase(&mut self, index: usize) -> Result<(), SettingError> {
        self.check_index("timebase", index, self.model.timebases.len())?;
        self.timebase = Some(index);
        // Rate depends on the timebase; stale until re-derived.
        self.sample_rate = None;
        Ok(())
    }

    /// Records a mode change that alters the screen width. Invalidates the sample rate.
    pub fn set_horizontal_divisions(&mut self, divisions: u8) -> Result<(), SettingError> {
        ensure!(
            divisions > 0,
            InvalidValueSnafu {
                what: "horizontal division count",
                value: divisions.to_string(),
            }
        );
        self.horizontal_divisions = Some(divisions);
        self.sample_rate = None;
        Ok(())
    }

    pub fn set_record_length(&mut self, samples: u64) -> Result<(), SettingError> {
        ensure!(
            samples > 0,
            InvalidValueSnafu {
                what: "record length",
                value: samples.to_string(),
            }
        );
        self.record_length = Some(samples);
        self.sample_rate = None;
        Ok(())
    }

    pub fn set_vscale(&mut self, channel: usize, index: usize) -> Result<(), SettingError> {
        self.check_index("vertical scale", index, self.model.vscales.len())?;
        self.analog_channel_mut(channel)?.vscale = Some(index);
        Ok(())
    }

    pub fn set_coupling(&mut self, channel: usize, index: usize) -> Result<(), SettingError> {
        self.check_index("coupling", index, self.model.coupling_options.len())?;
        self.analog_channel_mut(channel)?.coupling = Some(index);
        Ok(())
    }

    pub fn set_vertical_offset(&mut self, channel: usize, offset: f32) -> Result<(), SettingError> {
        ensure!(
            offset.is_finite(),
            InvalidValueSnafu {
                what: "vertical offset",
                value: offset.to_string(),
            }
        );
        self.analog_channel_mut(channel)?.vertical_offset = Some(offset);
        Ok(())
    }

    pub fn set_analog_enabled(&mut self, channel: usize, enabled: bool) -> Result<(), SettingError> {
        self.analog_channel_mut(channel)?.enabled = Some(enabled);
        Ok(())
    }

    pub fn set_digital_enabled(&mut self, channel: usize, enabled: bool) -> Result<(), SettingError> {
        let len = self.digital_channels.len();
        self.check_index("digital channel", channel, len)?;
        self.digital_channels[channel] = Some(enabled);
        Ok(())
    }

    pub fn set_pod_enabled(&mut self, pod: usize, enabled: bool) -> Result<(), SettingError> {
        self.pod_mut(pod)?.enabled = Some(enabled);
        Ok(())
    }

    /// Selects a threshold preset; `user_level` is kept only for user-defined presets.
    pub fn set_pod_threshold(
        &mut self,
        pod: usize,
        index: usize,
        user_level: Option<f32>,
    ) -> Result<(), SettingError> {
        self.check_index("logic threshold", index, self.model.logic_thresholds.len())?;
        let user = self.model.is_user_threshold(index);
        let state = self.pod_mut(pod)?;
        state.threshold = Some(index);
        if user {
            if let Some(level) = user_level {
                state.user_threshold = Some(level);
            }
        }
        Ok(())
    }

    pub fn set_trigger_source(&mut self, index: usize) -> Result<(), SettingError> {
        self.check_index("trigger source", index, self.model.trigger_sources.len())?;
        self.trigger_source = Some(index);
        Ok(())
    }

    pub fn set_trigger_slope(&mut self, index: usize) -> Result<(), SettingError> {
        self.check_index("trigger slope", index, self.model.trigger_slopes.len())?;
        self.trigger_slope = Some(index);
        Ok(())
    }

    pub fn set_trigger_pattern(&mut self, pattern: &str) -> Result<(), SettingError> {
        let parsed = TriggerPattern::from(pattern).ok().context(InvalidValueSnafu {
            what: "trigger pattern",
            value: pattern,
        })?;
        self.trigger_pattern = Some(parsed);
        Ok(())
    }

    pub fn set_waveform_sample_rate(&mut self, index: usize) -> Result<(), SettingError> {
        self.check_index("waveform sample rate", index, self.model.waveform_sample_rates.len())?;
        self.waveform_sample_rate = Some(index);
        Ok(())
    }

    pub fn set_interpolation_mode(&mut self, index: usize) -> Result<(), SettingError> {
        self.check_index("interpolation mode", index, self.model.interpolation_modes.len())?;
        self.interpolation_mode = Some(index);
        Ok(())
    }

    fn check_index(&self, what: &'static str, index: usize, len: usize) -> Result<(), SettingError> {
        ensure!(
            index < len,
            OutOfRangeSnafu {
                what,
                index,
                len,
                model: self.model.primary_name(),
            }
        );
        Ok(())
    }

    fn analog_channel_mut(&mut self, channel: usize) -> Result<&mut AnalogChannelState, SettingError> {
        let (len, model) = (self.analog_channels.len(), self.model.primary_name());
        self.analog_channels
            .get_mut(channel)
            .context(OutOfRangeSnafu {
                what: "analog channel",
                index: channel,
                len,
                model,
            })
    }

    fn pod_mut(&mut self, pod: usize) -> Result<&mut DigitalPodState, SettingError> {
        let (len, model) = (self.digital_pods.len(), self.model.primary_name());
        self.digital_pods.get_mut(pod).context(OutOfRangeSnafu {
            what: "digital pod",
            index: pod,
            len,
            model,
        })
    }

    fn log_state(&self) {
        let model = self.model;
        info!("State of {}:", model.primary_name());

        for (i, ch) in self.analog_channels.iter().enumerate() {
            let coupling = ch.coupling.and_then(|c| model.coupling_options.get(c));
            let vscale = ch.vscale.and_then(|v| model.vscales.get(v));
            info!(
                "  {}: {} coupling {} scale {}/div offset {}",
                model.analog_names.get(i).copied().unwrap_or("CH?"),
                on_off(ch.enabled),
                coupling.copied().unwrap_or("?"),
                vscale.map_or_else(|| "?".to_owned(), |v| Voltage(v.as_f64()).to_string()),
                ch.vertical_offset
                    .map_or_else(|| "?".to_owned(), |o| format!("{o:.2e}")),
            );
        }

        for (i, enabled) in self.digital_channels.iter().enumerate() {
            debug!("  D{i}: {}", on_off(*enabled));
        }

        for (i, pod) in self.digital_pods.iter().enumerate() {
            let threshold = match pod.threshold {
                Some(t) if model.is_user_threshold(t) => pod
                    .user_threshold
                    .map_or_else(|| "user ?".to_owned(), |l| format!("{l:E}")),
                Some(t) => model.logic_thresholds.get(t).copied().unwrap_or("?").to_owned(),
                None => "?".to_owned(),
            };
            info!("  POD{}: {} threshold {threshold}", i + 1, on_off(pod.enabled));
        }

        match self.timebase_value() {
            Some(tb) => info!("  timebase {tb}s/div over {} divisions", self.xdivs()),
            None => info!("  timebase unknown"),
        }
        match self.sample_rate {
            Some(rate) => info!("  sample rate {}", SampleRate(rate)),
            None => info!("  sample rate unknown"),
        }

        let source = self.trigger_source.and_then(|s| model.trigger_sources.get(s)).copied();
        let position = self
            .horiz_triggerpos
            .map_or_else(|| "?".to_owned(), |p| format!("{p:.2}"));
        if source.is_some_and(|s| s.eq_ignore_ascii_case("PATT")) {
            let pattern = self.trigger_pattern.as_ref().map_or("?", |p| p.as_str());
            info!("  trigger {pattern} (pattern), {position} (offset)");
        } else {
            let slope = self.trigger_slope.and_then(|s| model.trigger_slopes.get(s)).copied();
            info!(
                "  trigger {} (source), {} (slope), {position} (offset)",
                source.unwrap_or("?"),
                slope.unwrap_or("?"),
            );
        }
    }
}

fn on_off(flag: Option<bool>) -> &'static str {
    match flag {
        Some(true) => "On",
        Some(false) => "Off",
        None => "?",
    }
}

struct Refresher<'a, A> {
    adapter: &'a mut A,
    model: &'static ScopeModel,
    attempted: usize,
    failures: Vec<FieldFailure>,
}

impl<A: ExchangeAdapter> Refresher<'_, A> {
    fn update<T>(
        &mut self,
        slot: &mut Option<T>,
        query: Query,
        parse: impl FnOnce(Response) -> Result<T, FieldError>,
    ) {
        self.attempted += 1;
        let result = self
            .adapter
            .query(self.model.dialect, query)
            .map_err(FieldError::from)
            .and_then(parse);
        match result {
            Ok(value) => *slot = Some(value),
            Err(error) => {
                debug!("{query} failed: {error}");
                self.failures.push(FieldFailure { query, error });
            }
        }
    }

    fn unresolvable(&mut self, query: Query, needs: Query) {
        self.attempted += 1;
        self.failures.push(FieldFailure {
            query,
            error: FieldError::Unresolvable { needs },
        });
    }
}

fn lookup_option(table: OptionTable<&'static str>, resp: Response) -> Result<usize, FieldError> {
    let reply = resp.into_text()?;
    table.position(&reply).context(NotInTableSnafu { reply })
}

/// Like [`OptionTable::position`], except a bare `USER` reply selects `USER1`.
fn lookup_threshold(table: OptionTable<&'static str>, reply: &str) -> Option<usize> {
    table.position(reply).or_else(|| {
        if reply.trim().eq_ignore_ascii_case("USER") {
            table.position("USER1")
        } else {
            None
        }
    })
}

fn lookup_rational(table: OptionTable<Rational>, resp: Response) -> Result<usize, FieldError> {
    let found = match resp {
        Response::Text(ref text) => table.position_text(text),
        Response::Float(value) => table.position_approx(value),
        Response::Int(value) => table.position_approx(value as f64),
        Response::Block(_) => return Err(resp.malformed("a number").into()),
    };
    found.with_context(|| NotInTableSnafu {
        reply: format!("{resp:?}"),
    })
}

/// High resolution and peak detection answer with a mode name; anything but `OFF` means on.
fn parse_mode_flag(resp: Response) -> Result<bool, FieldError> {
    match resp {
        Response::Text(mode) => Ok(!mode.trim().eq_ignore_ascii_case("OFF")),
        other => Ok(other.into_bool()?),
    }
}

fn parse_pattern(reply: &str) -> TriggerPattern {
    let reply = reply.trim();
    let unquoted = reply
        .strip_prefix('"')
        .and_then(|r| r.strip_suffix('"'))
        .unwrap_or(reply);

    let mut pattern = TriggerPattern::new();
    for c in unquoted.chars() {
        if pattern.try_push(c).is_err() {
            break;
        }
    }
    pattern
}
