//! Capability descriptors: one immutable table set per instrument variant.
//!
//! Every variant shares the same operations and differs only in data, so a
//! variant is a [`ScopeModel`] value rather than a type. Option tables carry
//! their own length, so a count can never disagree with its table.

use crate::{
    consts::DIGITAL_CHANNELS_PER_POD,
    data::{
        options::{
            AnalogGroupOption, ConfigKey, DeviceOption, DigitalFetch, DigitalGroupOption,
            ScpiDialect, ThresholdScope,
        },
        units::Rational,
    },
};
use serde::Serialize;
use snafu::{OptionExt, Snafu};

mod variants;

pub use variants::*;

/// Read-only table of options with its length built in.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(transparent)]
pub struct OptionTable<T: 'static>(&'static [T]);

impl<T: 'static> OptionTable<T> {
    pub const fn new(items: &'static [T]) -> Self {
        Self(items)
    }

    /// The first `len` entries of `items`, for variants that expose a prefix of a shared table.
    pub const fn prefix(items: &'static [T], len: usize) -> Self {
        Self(items.split_at(len).0)
    }

    pub const fn len(&self) -> usize {
        self.0.len()
    }

    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&'static T> {
        self.0.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'static, T> {
        self.0.iter()
    }

    pub const fn as_slice(&self) -> &'static [T] {
        self.0
    }
}

impl OptionTable<&'static str> {
    /// Index of the entry equal to `reply`, ignoring ASCII case and surrounding whitespace.
    pub fn position(&self, reply: &str) -> Option<usize> {
        let reply = reply.trim();
        self.0.iter().position(|opt| opt.eq_ignore_ascii_case(reply))
    }
}

impl OptionTable<Rational> {
    pub fn position_text(&self, reply: &str) -> Option<usize> {
        self.0.iter().position(|r| r.matches_text(reply))
    }

    pub fn position_approx(&self, value: f64) -> Option<usize> {
        self.0.iter().position(|r| r.approx_eq(value))
    }
}

/// Input pins shared between a digital pod and an analog channel; both cannot be acquired at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PodConflict {
    pub pod: usize,
    pub analog: usize,
}

/// Everything a given instrument variant supports.
#[derive(Debug, Clone, Serialize)]
pub struct ScopeModel {
    /// Firmware-reported model names this descriptor answers to.
    pub names: &'static [&'static str],

    pub analog_channels: u8,
    pub digital_channels: u8,

    pub analog_names: OptionTable<&'static str>,
    pub digital_names: OptionTable<&'static str>,

    pub devopts: OptionTable<ConfigKey<DeviceOption>>,
    pub devopts_cg_analog: OptionTable<ConfigKey<AnalogGroupOption>>,
    pub devopts_cg_digital: OptionTable<ConfigKey<DigitalGroupOption>>,

    pub waveform_sample_rates: OptionTable<&'static str>,
    pub interpolation_modes: OptionTable<&'static str>,
    pub coupling_options: OptionTable<&'static str>,

    pub logic_thresholds: OptionTable<&'static str>,
    pub logic_threshold_scope: ThresholdScope,

    pub trigger_sources: OptionTable<&'static str>,
    pub trigger_slopes: OptionTable<&'static str>,

    pub timebases: OptionTable<Rational>,
    pub vscales: OptionTable<Rational>,

    /// Horizontal divisions in the default acquisition mode. The live value is
    /// tracked per session, since some acquisition modes widen the screen.
    pub num_xdivs: u8,
    pub num_ydivs: u8,

    pub dialect: ScpiDialect,
    pub digital_fetch: DigitalFetch,
    pub pod_conflicts: &'static [PodConflict],

    /// Samples per screen assumed until the instrument reports its record length.
    pub default_record_length: u64,
}

impl ScopeModel {
    pub const fn digital_pods(&self) -> usize {
        (self.digital_channels as usize).div_ceil(DIGITAL_CHANNELS_PER_POD)
    }

    /// Whether this descriptor lists `model`. Exact match, ASCII case ignored.
    pub fn answers_to(&self, model: &str) -> bool {
        self.names.iter().any(|n| n.eq_ignore_ascii_case(model))
    }

    /// Whether the threshold preset at `index` is user-defined, with its level set separately.
    pub fn is_user_threshold(&self, index: usize) -> bool {
        self.logic_thresholds.get(index).is_some_and(|name| {
            let upper = name.to_ascii_uppercase();
            upper.starts_with("USER") || upper == "MAN"
        })
    }

    pub fn supports(&self, option: DeviceOption) -> bool {
        self.devopts.iter().any(|k| k.option == option)
    }

    pub fn primary_name(&self) -> &'static str {
        self.names.first().copied().unwrap_or("unknown")
    }
}

#[derive(Debug, Snafu)]
pub enum ResolveError {
    #[snafu(display("unsupported model {model:?}"))]
    UnsupportedModel { model: String },
}

/// Finds the built-in descriptor that lists `model`.
pub fn resolve(model: &str) -> Result<&'static ScopeModel, ResolveError> {
    resolve_in(&MODELS, model)
}

/// Finds the descriptor in `models` that lists `model`; membership only, no prefix matching.
pub fn resolve_in<'a>(models: &'a [ScopeModel], model: &str) -> Result<&'a ScopeModel, ResolveError> {
    models
        .iter()
        .find(|m| m.answers_to(model))
        .context(UnsupportedModelSnafu { model })
}
