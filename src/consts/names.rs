pub const ANALOG_NAMES: [&str; 4] = ["CH1", "CH2", "CH3", "CH4"];

pub const DIGITAL_NAMES: [&str; 16] = [
    "D0", "D1", "D2", "D3", "D4", "D5", "D6", "D7", "D8", "D9", "D10", "D11", "D12", "D13",
    "D14", "D15",
];

pub const COUPLING_OPTIONS: [&str; 5] = ["AC", "ACL", "DC", "DCL", "GND"];
pub const RT_COUPLING_OPTIONS: [&str; 3] = ["ACLimit", "DCLimit", "GND"];

pub const LOGIC_THRESHOLDS: [&str; 5] = ["TTL", "ECL", "CMOS", "USER1", "USER2"];
pub const RT_LOGIC_THRESHOLDS: [&str; 4] = ["TTL", "ECL", "CMOS", "MAN"];

pub const TRIGGER_SLOPES: [&str; 3] = ["POS", "NEG", "EITH"];

pub const WAVEFORM_SAMPLE_RATES: [&str; 3] = ["AUTomatic", "MWAVeform", "MSAMples"];
pub const INTERPOLATION_MODES: [&str; 3] = ["LINear", "SINX", "SMHD"];

pub const TRIGGER_SOURCES_2CH_8DIG: [&str; 15] = [
    "CH1", "CH2", "LINE", "EXT", "PATT", "BUS1", "BUS2", "D0", "D1", "D2", "D3", "D4", "D5",
    "D6", "D7",
];

pub const TRIGGER_SOURCES_2CH_16DIG: [&str; 23] = [
    "CH1", "CH2", "LINE", "EXT", "PATT", "BUS1", "BUS2", "D0", "D1", "D2", "D3", "D4", "D5",
    "D6", "D7", "D8", "D9", "D10", "D11", "D12", "D13", "D14", "D15",
];

pub const TRIGGER_SOURCES_4CH_16DIG: [&str; 24] = [
    "CH1", "CH2", "CH3", "CH4", "LINE", "PATT", "BUS1", "BUS2", "D0", "D1", "D2", "D3", "D4",
    "D5", "D6", "D7", "D8", "D9", "D10", "D11", "D12", "D13", "D14", "D15",
];

pub const RT_TRIGGER_SOURCES_2CH_16DIG: [&str; 20] = [
    "CH1", "CH2", "EXT", "LINE", "D0", "D1", "D2", "D3", "D4", "D5", "D6", "D7", "D8", "D9",
    "D10", "D11", "D12", "D13", "D14", "D15",
];

pub const RT_TRIGGER_SOURCES_4CH_16DIG: [&str; 22] = [
    "CH1", "CH2", "CH3", "CH4", "EXT", "LINE", "D0", "D1", "D2", "D3", "D4", "D5", "D6", "D7",
    "D8", "D9", "D10", "D11", "D12", "D13", "D14", "D15",
];
