use acquisition::{FrameData, Limits, RunState};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds};
use snafu::{ResultExt, Snafu};
use std::time::Duration;

pub mod acquisition;
pub mod consts;
pub mod data;
pub mod device;
pub mod exchange;
pub mod model;
pub mod rate;
pub mod scaled_number;
pub mod state;

pub use device::{run_acquisition, Readiness, Session};
pub use model::{resolve, ScopeModel};

/// A channel by kind and zero-based index. Digital channel `d` lives in pod `d / 8`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
pub enum ChannelRef {
    #[display(fmt = "CH{}", "_0 + 1")]
    Analog(usize),
    #[display(fmt = "D{}", _0)]
    Digital(usize),
}

impl ChannelRef {
    pub fn pod(self) -> Option<usize> {
        match self {
            ChannelRef::Analog(_) => None,
            ChannelRef::Digital(d) => Some(d / consts::DIGITAL_CHANNELS_PER_POD),
        }
    }
}

#[derive(Debug)]
pub enum AcquisitionMessage {
    FrameComplete(FrameMessage),
    Finished(RunSummary),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameMessage {
    pub data: FrameData,
    pub acquisition_duration: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub state: RunState,
    pub frames: u64,
    pub samples: u64,
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AcquisitionConfig {
    /// Stop after this many samples; 0 for no limit.
    pub samples_limit: u64,
    /// Stop after this many frames; 0 for no limit.
    pub frame_limit: u64,
    /// How long to wait for the transport between exchanges.
    #[serde(rename = "event_timeout_ms")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub event_timeout: Duration,
    /// Further attempts at a failed channel before the run is aborted.
    pub max_retries: u32,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            samples_limit: 0,
            frame_limit: 0,
            event_timeout: Duration::from_millis(2000),
            max_retries: 2,
        }
    }
}

#[derive(Debug, Snafu)]
#[snafu(display("invalid acquisition config"))]
pub struct ConfigError {
    source: serde_json::Error,
}

impl AcquisitionConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).context(ConfigSnafu)
    }

    pub fn limits(&self) -> Limits {
        Limits::new(self.samples_limit, self.frame_limit)
    }
}
