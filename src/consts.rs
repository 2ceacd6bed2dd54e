mod names;
mod time_bases;
mod vscale;

pub use names::*;
pub use time_bases::{RT_TIME_BASES, TIME_BASES};
pub use vscale::VERTICAL_SCALES;

pub const DIGITAL_CHANNELS_PER_POD: usize = 8;

pub const MAX_ANALOG_CHANNEL_COUNT: usize = 4;
pub const MAX_DIGITAL_CHANNEL_COUNT: usize = 16;
pub const MAX_DIGITAL_GROUP_COUNT: usize = MAX_DIGITAL_CHANNEL_COUNT / DIGITAL_CHANNELS_PER_POD;

/// One symbol per analog and digital channel of the largest variant.
pub const MAX_TRIGGER_PATTERN_LENGTH: usize = MAX_ANALOG_CHANNEL_COUNT + MAX_DIGITAL_CHANNEL_COUNT;

/// Vertical grid divisions, identical across the family.
pub const GRID_DIV_COUNT_VERTICAL: u8 = 8;
