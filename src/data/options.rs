use serde::Serialize;
use strum::Display;

/// How a host may use a configuration key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum Access {
    #[strum(serialize = "get")]
    Get,
    #[strum(serialize = "get/set")]
    GetSet,
    #[strum(serialize = "get/set/list")]
    GetSetList,
}

impl Access {
    pub fn settable(self) -> bool {
        !matches!(self, Access::Get)
    }

    pub fn listable(self) -> bool {
        matches!(self, Access::GetSetList)
    }
}

/// A configuration key a variant supports, paired with its access mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConfigKey<O> {
    pub option: O,
    pub access: Access,
}

impl<O> ConfigKey<O> {
    pub const fn new(option: O, access: Access) -> Self {
        Self { option, access }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DeviceOption {
    LimitFrames,
    LimitSamples,
    Samplerate,
    Timebase,
    NumHdiv,
    NumVdiv,
    HorizTriggerPos,
    TriggerSource,
    TriggerSlope,
    TriggerPattern,
    WaveformSampleRate,
    InterpolationMode,
    HighResolution,
    PeakDetection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AnalogGroupOption {
    NumVdiv,
    Vdiv,
    Coupling,
    Offset,
    ProbeUnit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DigitalGroupOption {
    LogicThreshold,
    LogicThresholdCustom,
}

/// Query/response conventions the exchange adapter applies for a variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
pub enum ScpiDialect {
    /// HMO series: digital data and thresholds addressed per pod.
    #[strum(serialize = "hameg")]
    Hameg,
    /// RTB/RTM/RTC series: digital channels fetched one at a time.
    #[strum(serialize = "rohde-schwarz-log-not-pod")]
    RohdeSchwarzLogNotPod,
}

/// Granularity of one digital data exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
pub enum DigitalFetch {
    /// One exchange per pod; each response byte is a whole pod sample.
    PerPod,
    /// One exchange per digital channel; each response byte is one sample, non-zero = high.
    PerChannel,
}

/// Whether logic threshold presets apply to a whole pod or to individual channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
pub enum ThresholdScope {
    PerPod,
    PerChannel,
}
