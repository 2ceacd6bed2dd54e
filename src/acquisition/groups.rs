use super::{AcquisitionError, ChannelConflictSnafu, NoChannelsEnabledSnafu};
use crate::{
    consts::DIGITAL_CHANNELS_PER_POD,
    data::options::DigitalFetch,
    model::ScopeModel,
    state::SessionState,
    ChannelRef,
};
use serde::Serialize;
use snafu::ensure;
use strum::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
pub enum GroupKind {
    Analog,
    Digital,
}

/// A named set of channels configured together: one analog channel, or one pod.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelGroup {
    pub name: String,
    pub kind: GroupKind,
    pub channels: Vec<ChannelRef>,
}

/// Lookup tables from groups to their channels and back. Holds no channel data.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ChannelGroups {
    analog: Vec<ChannelGroup>,
    digital: Vec<ChannelGroup>,
}

impl ChannelGroups {
    pub fn new(model: &ScopeModel) -> Self {
        let analog = model
            .analog_names
            .iter()
            .enumerate()
            .map(|(i, name)| ChannelGroup {
                name: (*name).to_owned(),
                kind: GroupKind::Analog,
                channels: vec![ChannelRef::Analog(i)],
            })
            .collect();

        let digital_channels = model.digital_channels as usize;
        let digital = (0..model.digital_pods())
            .map(|pod| {
                let first = pod * DIGITAL_CHANNELS_PER_POD;
                let last = (first + DIGITAL_CHANNELS_PER_POD).min(digital_channels);
                ChannelGroup {
                    name: format!("POD{}", pod + 1),
                    kind: GroupKind::Digital,
                    channels: (first..last).map(ChannelRef::Digital).collect(),
                }
            })
            .collect();

        Self { analog, digital }
    }

    pub fn analog(&self) -> &[ChannelGroup] {
        &self.analog
    }

    pub fn digital(&self) -> &[ChannelGroup] {
        &self.digital
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChannelGroup> {
        self.analog.iter().chain(&self.digital)
    }

    /// Case-insensitive lookup, e.g. `"ch2"` or `"POD1"`.
    pub fn by_name(&self, name: &str) -> Option<&ChannelGroup> {
        self.iter().find(|g| g.name.eq_ignore_ascii_case(name))
    }

    pub fn group_of(&self, channel: ChannelRef) -> Option<&ChannelGroup> {
        match channel {
            ChannelRef::Analog(i) => self.analog.get(i),
            ChannelRef::Digital(d) => self.digital.get(d / DIGITAL_CHANNELS_PER_POD),
        }
    }
}

/// Channels to acquire, in order: analog by index, then digital.
///
/// When the model fetches whole pods, a pod appears once, as its first
/// enabled channel. Channels whose state is unknown are left out.
pub fn enabled_sequence(
    model: &ScopeModel,
    state: &SessionState,
) -> Result<Vec<ChannelRef>, AcquisitionError> {
    let analog_on = |i: usize| {
        state
            .analog_channels()
            .get(i)
            .is_some_and(|c| c.enabled == Some(true))
    };
    let digital_on: Vec<usize> = state
        .digital_channels()
        .iter()
        .enumerate()
        .filter(|(_, enabled)| **enabled == Some(true))
        .map(|(d, _)| d)
        .collect();

    for conflict in model.pod_conflicts {
        let pod_on = digital_on
            .iter()
            .any(|d| d / DIGITAL_CHANNELS_PER_POD == conflict.pod);
        ensure!(
            !(pod_on && analog_on(conflict.analog)),
            ChannelConflictSnafu {
                pod: conflict.pod,
                analog: conflict.analog,
            }
        );
    }

    let mut sequence: Vec<ChannelRef> = (0..state.analog_channels().len())
        .filter(|&i| analog_on(i))
        .map(ChannelRef::Analog)
        .collect();

    match model.digital_fetch {
        DigitalFetch::PerChannel => {
            sequence.extend(digital_on.iter().copied().map(ChannelRef::Digital));
        }
        DigitalFetch::PerPod => {
            let mut last_pod = None;
            for d in digital_on {
                let pod = d / DIGITAL_CHANNELS_PER_POD;
                if last_pod != Some(pod) {
                    sequence.push(ChannelRef::Digital(d));
                    last_pod = Some(pod);
                }
            }
        }
    }

    ensure!(!sequence.is_empty(), NoChannelsEnabledSnafu);
    Ok(sequence)
}
