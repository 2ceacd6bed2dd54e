use super::{OptionTable, PodConflict, ScopeModel};
use crate::{
    consts::*,
    data::options::{
        Access::{Get, GetSet, GetSetList},
        AnalogGroupOption, ConfigKey, DeviceOption, DigitalFetch, DigitalGroupOption,
        ScpiDialect, ThresholdScope,
    },
};

const DEVOPTS: [ConfigKey<DeviceOption>; 14] = [
    ConfigKey::new(DeviceOption::LimitFrames, GetSet),
    ConfigKey::new(DeviceOption::LimitSamples, GetSet),
    ConfigKey::new(DeviceOption::Samplerate, Get),
    ConfigKey::new(DeviceOption::Timebase, GetSetList),
    ConfigKey::new(DeviceOption::NumHdiv, Get),
    ConfigKey::new(DeviceOption::NumVdiv, Get),
    ConfigKey::new(DeviceOption::HorizTriggerPos, GetSet),
    ConfigKey::new(DeviceOption::TriggerSource, GetSetList),
    ConfigKey::new(DeviceOption::TriggerSlope, GetSetList),
    ConfigKey::new(DeviceOption::TriggerPattern, GetSet),
    ConfigKey::new(DeviceOption::WaveformSampleRate, GetSetList),
    ConfigKey::new(DeviceOption::InterpolationMode, GetSetList),
    ConfigKey::new(DeviceOption::HighResolution, GetSet),
    ConfigKey::new(DeviceOption::PeakDetection, GetSet),
];

// RTC1002 has neither the waveform rate selector nor interpolation modes.
const DEVOPTS_RTC: [ConfigKey<DeviceOption>; 12] = [
    ConfigKey::new(DeviceOption::LimitFrames, GetSet),
    ConfigKey::new(DeviceOption::LimitSamples, GetSet),
    ConfigKey::new(DeviceOption::Samplerate, Get),
    ConfigKey::new(DeviceOption::Timebase, GetSetList),
    ConfigKey::new(DeviceOption::NumHdiv, Get),
    ConfigKey::new(DeviceOption::NumVdiv, Get),
    ConfigKey::new(DeviceOption::HorizTriggerPos, GetSet),
    ConfigKey::new(DeviceOption::TriggerSource, GetSetList),
    ConfigKey::new(DeviceOption::TriggerSlope, GetSetList),
    ConfigKey::new(DeviceOption::TriggerPattern, GetSet),
    ConfigKey::new(DeviceOption::HighResolution, GetSet),
    ConfigKey::new(DeviceOption::PeakDetection, GetSet),
];

const DEVOPTS_CG_ANALOG: [ConfigKey<AnalogGroupOption>; 5] = [
    ConfigKey::new(AnalogGroupOption::NumVdiv, Get),
    ConfigKey::new(AnalogGroupOption::Vdiv, GetSetList),
    ConfigKey::new(AnalogGroupOption::Coupling, GetSetList),
    ConfigKey::new(AnalogGroupOption::Offset, GetSet),
    ConfigKey::new(AnalogGroupOption::ProbeUnit, Get),
];

const DEVOPTS_CG_DIGITAL: [ConfigKey<DigitalGroupOption>; 2] = [
    ConfigKey::new(DigitalGroupOption::LogicThreshold, GetSetList),
    ConfigKey::new(DigitalGroupOption::LogicThresholdCustom, GetSet),
];

// On the four channel HMOs, POD1 shares its inputs with CH3 and POD2 with CH4.
const HMO_POD_CONFLICTS: [PodConflict; 2] = [
    PodConflict { pod: 0, analog: 2 },
    PodConflict { pod: 1, analog: 3 },
];

pub const HMO_COMPACT2: ScopeModel = ScopeModel {
    names: &["HMO722", "HMO1022", "HMO1522", "HMO2022"],
    analog_channels: 2,
    digital_channels: 8,
    analog_names: OptionTable::prefix(&ANALOG_NAMES, 2),
    digital_names: OptionTable::prefix(&DIGITAL_NAMES, 8),
    devopts: OptionTable::new(&DEVOPTS),
    devopts_cg_analog: OptionTable::new(&DEVOPTS_CG_ANALOG),
    devopts_cg_digital: OptionTable::new(&DEVOPTS_CG_DIGITAL),
    waveform_sample_rates: OptionTable::new(&WAVEFORM_SAMPLE_RATES),
    interpolation_modes: OptionTable::new(&INTERPOLATION_MODES),
    coupling_options: OptionTable::new(&COUPLING_OPTIONS),
    logic_thresholds: OptionTable::new(&LOGIC_THRESHOLDS),
    logic_threshold_scope: ThresholdScope::PerPod,
    trigger_sources: OptionTable::new(&TRIGGER_SOURCES_2CH_8DIG),
    trigger_slopes: OptionTable::new(&TRIGGER_SLOPES),
    timebases: OptionTable::new(&TIME_BASES),
    vscales: OptionTable::new(&VERTICAL_SCALES),
    num_xdivs: 12,
    num_ydivs: GRID_DIV_COUNT_VERTICAL,
    dialect: ScpiDialect::Hameg,
    digital_fetch: DigitalFetch::PerPod,
    pod_conflicts: &[],
    default_record_length: 6000,
};

pub const HMO_COMPACT4: ScopeModel = ScopeModel {
    names: &[
        "HMO724", "HMO1024", "HMO1524", "HMO2024", "HMO3034", "HMO3044", "HMO3054",
    ],
    analog_channels: 4,
    digital_channels: 16,
    analog_names: OptionTable::new(&ANALOG_NAMES),
    digital_names: OptionTable::new(&DIGITAL_NAMES),
    devopts: OptionTable::new(&DEVOPTS),
    devopts_cg_analog: OptionTable::new(&DEVOPTS_CG_ANALOG),
    devopts_cg_digital: OptionTable::new(&DEVOPTS_CG_DIGITAL),
    waveform_sample_rates: OptionTable::new(&WAVEFORM_SAMPLE_RATES),
    interpolation_modes: OptionTable::new(&INTERPOLATION_MODES),
    coupling_options: OptionTable::new(&COUPLING_OPTIONS),
    logic_thresholds: OptionTable::new(&LOGIC_THRESHOLDS),
    logic_threshold_scope: ThresholdScope::PerPod,
    trigger_sources: OptionTable::new(&TRIGGER_SOURCES_4CH_16DIG),
    trigger_slopes: OptionTable::new(&TRIGGER_SLOPES),
    timebases: OptionTable::new(&TIME_BASES),
    vscales: OptionTable::new(&VERTICAL_SCALES),
    num_xdivs: 12,
    num_ydivs: GRID_DIV_COUNT_VERTICAL,
    dialect: ScpiDialect::Hameg,
    digital_fetch: DigitalFetch::PerPod,
    pod_conflicts: &HMO_POD_CONFLICTS,
    default_record_length: 6000,
};

pub const HMO2524: ScopeModel = ScopeModel {
    names: &["HMO2524", "HMO3032", "HMO3042", "HMO3052"],
    analog_channels: 2,
    digital_channels: 16,
    analog_names: OptionTable::prefix(&ANALOG_NAMES, 2),
    digital_names: OptionTable::new(&DIGITAL_NAMES),
    devopts: OptionTable::new(&DEVOPTS),
    devopts_cg_analog: OptionTable::new(&DEVOPTS_CG_ANALOG),
    devopts_cg_digital: OptionTable::new(&DEVOPTS_CG_DIGITAL),
    waveform_sample_rates: OptionTable::new(&WAVEFORM_SAMPLE_RATES),
    interpolation_modes: OptionTable::new(&INTERPOLATION_MODES),
    coupling_options: OptionTable::new(&COUPLING_OPTIONS),
    logic_thresholds: OptionTable::new(&LOGIC_THRESHOLDS),
    logic_threshold_scope: ThresholdScope::PerPod,
    trigger_sources: OptionTable::new(&TRIGGER_SOURCES_2CH_16DIG),
    trigger_slopes: OptionTable::new(&TRIGGER_SLOPES),
    timebases: OptionTable::new(&TIME_BASES),
    vscales: OptionTable::new(&VERTICAL_SCALES),
    num_xdivs: 12,
    num_ydivs: GRID_DIV_COUNT_VERTICAL,
    dialect: ScpiDialect::Hameg,
    digital_fetch: DigitalFetch::PerPod,
    pod_conflicts: &[],
    default_record_length: 6000,
};

pub const RTC1002: ScopeModel = ScopeModel {
    names: &["RTC1002", "HMO1002", "HMO1202"],
    analog_channels: 2,
    digital_channels: 8,
    analog_names: OptionTable::prefix(&ANALOG_NAMES, 2),
    digital_names: OptionTable::prefix(&DIGITAL_NAMES, 8),
    devopts: OptionTable::new(&DEVOPTS_RTC),
    devopts_cg_analog: OptionTable::new(&DEVOPTS_CG_ANALOG),
    devopts_cg_digital: OptionTable::new(&DEVOPTS_CG_DIGITAL),
    waveform_sample_rates: OptionTable::new(&[]),
    interpolation_modes: OptionTable::new(&[]),
    coupling_options: OptionTable::new(&COUPLING_OPTIONS),
    logic_thresholds: OptionTable::new(&LOGIC_THRESHOLDS),
    logic_threshold_scope: ThresholdScope::PerPod,
    trigger_sources: OptionTable::new(&TRIGGER_SOURCES_2CH_8DIG),
    trigger_slopes: OptionTable::new(&TRIGGER_SLOPES),
    timebases: OptionTable::new(&TIME_BASES),
    vscales: OptionTable::new(&VERTICAL_SCALES),
    num_xdivs: 12,
    num_ydivs: GRID_DIV_COUNT_VERTICAL,
    dialect: ScpiDialect::RohdeSchwarzLogNotPod,
    digital_fetch: DigitalFetch::PerChannel,
    pod_conflicts: &[],
    default_record_length: 2000,
};

pub const RTB2002: ScopeModel = ScopeModel {
    names: &["RTB2002", "RTM3002"],
    analog_channels: 2,
    digital_channels: 16,
    analog_names: OptionTable::prefix(&ANALOG_NAMES, 2),
    digital_names: OptionTable::new(&DIGITAL_NAMES),
    devopts: OptionTable::new(&DEVOPTS),
    devopts_cg_analog: OptionTable::new(&DEVOPTS_CG_ANALOG),
    devopts_cg_digital: OptionTable::new(&DEVOPTS_CG_DIGITAL),
    waveform_sample_rates: OptionTable::new(&WAVEFORM_SAMPLE_RATES),
    interpolation_modes: OptionTable::new(&INTERPOLATION_MODES),
    coupling_options: OptionTable::new(&RT_COUPLING_OPTIONS),
    logic_thresholds: OptionTable::new(&RT_LOGIC_THRESHOLDS),
    logic_threshold_scope: ThresholdScope::PerChannel,
    trigger_sources: OptionTable::new(&RT_TRIGGER_SOURCES_2CH_16DIG),
    trigger_slopes: OptionTable::new(&TRIGGER_SLOPES),
    timebases: OptionTable::new(&RT_TIME_BASES),
    vscales: OptionTable::new(&VERTICAL_SCALES),
    num_xdivs: 10,
    num_ydivs: GRID_DIV_COUNT_VERTICAL,
    dialect: ScpiDialect::RohdeSchwarzLogNotPod,
    digital_fetch: DigitalFetch::PerChannel,
    pod_conflicts: &[],
    default_record_length: 10_000,
};

pub const RTB2000: ScopeModel = ScopeModel {
    names: &["RTB2004", "RTM3004", "RTA4004"],
    analog_channels: 4,
    digital_channels: 16,
    analog_names: OptionTable::new(&ANALOG_NAMES),
    digital_names: OptionTable::new(&DIGITAL_NAMES),
    devopts: OptionTable::new(&DEVOPTS),
    devopts_cg_analog: OptionTable::new(&DEVOPTS_CG_ANALOG),
    devopts_cg_digital: OptionTable::new(&DEVOPTS_CG_DIGITAL),
    waveform_sample_rates: OptionTable::new(&WAVEFORM_SAMPLE_RATES),
    interpolation_modes: OptionTable::new(&INTERPOLATION_MODES),
    coupling_options: OptionTable::new(&RT_COUPLING_OPTIONS),
    logic_thresholds: OptionTable::new(&RT_LOGIC_THRESHOLDS),
    logic_threshold_scope: ThresholdScope::PerChannel,
    trigger_sources: OptionTable::new(&RT_TRIGGER_SOURCES_4CH_16DIG),
    trigger_slopes: OptionTable::new(&TRIGGER_SLOPES),
    timebases: OptionTable::new(&RT_TIME_BASES),
    vscales: OptionTable::new(&VERTICAL_SCALES),
    num_xdivs: 10,
    num_ydivs: GRID_DIV_COUNT_VERTICAL,
    dialect: ScpiDialect::RohdeSchwarzLogNotPod,
    digital_fetch: DigitalFetch::PerChannel,
    pod_conflicts: &[],
    default_record_length: 10_000,
};

/// All built-in variants, searched in order by [`resolve`](super::resolve).
pub static MODELS: [ScopeModel; 6] = [
    HMO_COMPACT2,
    HMO_COMPACT4,
    HMO2524,
    RTC1002,
    RTB2002,
    RTB2000,
];
