//! The channel-by-channel acquisition loop.
//!
//! A run walks the enabled channels in order with one exchange outstanding at
//! a time: [`AcquisitionContext::request_next`] starts the exchange for the
//! channel under the cursor, and [`AcquisitionContext::receive_next`] consumes
//! its response once the transport reports readiness.

use crate::{
    consts::DIGITAL_CHANNELS_PER_POD,
    data::options::DigitalFetch,
    exchange::{
        ExchangeAdapter, ExchangeError, ExchangeErrorKind, ExchangeHandle, MalformedResponseSnafu,
        Query, Response,
    },
    model::ScopeModel,
    ChannelRef,
};
use derive_more::Display;
use log::{debug, warn};
use serde::Serialize;
use snafu::{ensure, Snafu};

mod groups;
mod logic;

pub use groups::{enabled_sequence, ChannelGroup, ChannelGroups, GroupKind};
pub use logic::{channel_mask, LogicBuffer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
pub enum RunState {
    Idle,
    Armed,
    #[display(fmt = "RunningChannel({})", _0)]
    RunningChannel(usize),
    /// The last exchange failed; the run waits for `retry`, `skip` or `abort`.
    #[display(fmt = "Faulted({})", _0)]
    Faulted(ExchangeErrorKind),
    Complete,
    LimitReached,
    Aborted,
}

impl RunState {
    pub fn is_active(self) -> bool {
        matches!(
            self,
            RunState::Armed | RunState::RunningChannel(_) | RunState::Faulted(_)
        )
    }
}

/// What a step of the loop achieved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum StepOutcome {
    /// Readiness fired but the response has not fully arrived.
    Pending,
    ChannelAdvanced,
    FrameComplete,
    RunComplete,
    LimitReached,
    #[display(fmt = "Error({})", _0)]
    Error(ExchangeErrorKind),
}

/// Run limits. `None` is unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Limits {
    pub samples: Option<u64>,
    pub frames: Option<u64>,
}

impl Limits {
    /// Zero means unbounded.
    pub fn new(samples: u64, frames: u64) -> Self {
        Self {
            samples: (samples > 0).then_some(samples),
            frames: (frames > 0).then_some(frames),
        }
    }
}

#[derive(Debug, Snafu)]
pub enum AcquisitionError {
    #[snafu(display("no channels enabled"))]
    NoChannelsEnabled,
    #[snafu(display("a run is already active ({state})"))]
    RunAlreadyActive { state: RunState },
    #[snafu(display("not armed ({state})"))]
    NotArmed { state: RunState },
    #[snafu(display("no exchange in flight ({state})"))]
    NoExchangeInFlight { state: RunState },
    #[snafu(display("no failed exchange to recover from ({state})"))]
    NotFaulted { state: RunState },
    #[snafu(display("no run in progress ({state})"))]
    NoRunInProgress { state: RunState },
    #[snafu(display("POD{} shares its inputs with CH{}", pod + 1, analog + 1))]
    ChannelConflict { pod: usize, analog: usize },
    #[snafu(display("{channel} does not exist on this model"))]
    UnknownChannel { channel: ChannelRef },
    #[snafu(display("{channel} is fetched by {query}, which is already in the run"))]
    AlreadyInRun { channel: ChannelRef, query: Query },
    #[snafu(context(false), display("{source}"))]
    Exchange { source: ExchangeError },
}

/// Copy of one frame's samples.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameData {
    /// Zero-based frame index within the run.
    pub frame: u64,
    pub analog: Vec<(usize, Vec<f32>)>,
    /// Interleaved pod bytes, see [`LogicBuffer`].
    pub logic: Vec<u8>,
    pub logic_unit_size: usize,
}

/// Per-connection acquisition state, reused across runs.
#[derive(Debug)]
pub struct AcquisitionContext {
    model: &'static ScopeModel,
    groups: ChannelGroups,

    sequence: Vec<ChannelRef>,
    cursor: Option<usize>,
    state: RunState,
    in_flight: Option<ExchangeHandle>,

    limits: Limits,
    num_samples: u64,
    num_frames: u64,

    analog: Box<[Vec<f32>]>,
    logic: LogicBuffer,
    frame_open: bool,
    analog_frame_start: Box<[usize]>,
}

impl AcquisitionContext {
    pub fn new(model: &'static ScopeModel) -> Self {
        let analog_channels = model.analog_channels as usize;
        Self {
            model,
            groups: ChannelGroups::new(model),
            sequence: Vec::new(),
            cursor: None,
            state: RunState::Idle,
            in_flight: None,
            limits: Limits::default(),
            num_samples: 0,
            num_frames: 0,
            analog: vec![Vec::new(); analog_channels].into_boxed_slice(),
            logic: LogicBuffer::new(model.digital_pods()),
            frame_open: false,
            analog_frame_start: vec![0; analog_channels].into_boxed_slice(),
        }
    }

    pub fn model(&self) -> &'static ScopeModel {
        self.model
    }

    pub fn groups(&self) -> &ChannelGroups {
        &self.groups
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    pub fn sequence(&self) -> &[ChannelRef] {
        &self.sequence
    }

    /// Index into [`sequence`](Self::sequence) of the channel being acquired; `None` outside a run.
    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn current_channel(&self) -> Option<ChannelRef> {
        self.cursor.map(|i| self.sequence[i])
    }

    pub fn in_flight(&self) -> Option<ExchangeHandle> {
        self.in_flight
    }

    pub fn limits(&self) -> Limits {
        self.limits
    }

    pub fn set_limits(&mut self, limits: Limits) -> Result<(), AcquisitionError> {
        ensure!(!self.is_active(), RunAlreadyActiveSnafu { state: self.state });
        self.limits = limits;
        Ok(())
    }

    pub fn num_samples(&self) -> u64 {
        self.num_samples
    }

    pub fn num_frames(&self) -> u64 {
        self.num_frames
    }

    /// Everything acquired on analog channel `channel` during the current or last run.
    pub fn analog(&self, channel: usize) -> Option<&[f32]> {
        self.analog.get(channel).map(Vec::as_slice)
    }

    pub fn logic(&self) -> &LogicBuffer {
        &self.logic
    }

    /// Prepares a run over `sequence`, clearing the buffers and counters of the previous one.
    pub fn arm(&mut self, sequence: Vec<ChannelRef>) -> Result<(), AcquisitionError> {
        ensure!(!self.is_active(), RunAlreadyActiveSnafu { state: self.state });
        ensure!(!sequence.is_empty(), NoChannelsEnabledSnafu);
        for (i, &channel) in sequence.iter().enumerate() {
            ensure!(self.has_channel(channel), UnknownChannelSnafu { channel });
            let query = self.data_query(channel);
            ensure!(
                !sequence[..i].iter().any(|&c| self.data_query(c) == query),
                AlreadyInRunSnafu { channel, query }
            );
        }

        debug!("arming {} channel(s): {sequence:?}", sequence.len());
        self.sequence = sequence;
        self.cursor = Some(0);
        self.in_flight = None;
        self.num_samples = 0;
        self.num_frames = 0;
        self.analog.iter_mut().for_each(Vec::clear);
        self.analog_frame_start.iter_mut().for_each(|s| *s = 0);
        self.logic.clear();
        self.frame_open = false;
        self.state = RunState::Armed;
        Ok(())
    }

    /// Sends the data request for the channel under the cursor and returns without waiting.
    ///
    /// A send failure faults the run like a failed response would.
    pub fn request_next<A: ExchangeAdapter>(&mut self, adapter: &mut A) -> Result<(), AcquisitionError> {
        ensure!(self.state == RunState::Armed, NotArmedSnafu { state: self.state });
        let index = self.cursor_index();
        if !self.frame_open {
            self.begin_frame();
        }

        let channel = self.sequence[index];
        let query = self.data_query(channel);
        match adapter.send_query(self.model.dialect, query) {
            Ok(handle) => {
                debug!("requested {query} as {handle}");
                self.in_flight = Some(handle);
                self.state = RunState::RunningChannel(index);
                Ok(())
            }
            Err(source) => {
                self.fault(channel, &source);
                Err(AcquisitionError::Exchange { source })
            }
        }
    }

    /// Consumes the response for the channel in flight, if it has arrived.
    pub fn receive_next<A: ExchangeAdapter>(
        &mut self,
        adapter: &mut A,
    ) -> Result<StepOutcome, AcquisitionError> {
        let (index, handle) = match (self.state, self.in_flight) {
            (RunState::RunningChannel(index), Some(handle)) => (index, handle),
            _ => return NoExchangeInFlightSnafu { state: self.state }.fail(),
        };
        assert_eq!(self.cursor, Some(index), "cursor out of step with running channel");
        let channel = self.sequence[index];

        let stored = match adapter.try_receive(handle) {
            Ok(None) => return Ok(StepOutcome::Pending),
            Ok(Some(response)) => {
                self.in_flight = None;
                self.store(channel, response)
            }
            Err(e) => {
                self.in_flight = None;
                Err(e)
            }
        };

        match stored {
            Ok(()) => Ok(self.advance(index)),
            Err(e) => Ok(self.fault(channel, &e)),
        }
    }

    /// Faults the exchange in flight with an error raised outside the adapter, such as a timeout.
    ///
    /// The handle is forgotten; cancelling it on the adapter is up to the caller.
    pub fn fail_in_flight(&mut self, error: &ExchangeError) -> Result<StepOutcome, AcquisitionError> {
        let RunState::RunningChannel(index) = self.state else {
            return NoExchangeInFlightSnafu { state: self.state }.fail();
        };
        self.in_flight = None;
        Ok(self.fault(self.sequence[index], error))
    }

    /// Re-arms the faulted channel so the next `request_next` asks for it again.
    pub fn retry(&mut self) -> Result<(), AcquisitionError> {
        ensure!(
            matches!(self.state, RunState::Faulted(_)),
            NotFaultedSnafu { state: self.state }
        );
        self.state = RunState::Armed;
        Ok(())
    }

    /// Moves past the faulted channel as though it had returned no samples.
    pub fn skip(&mut self) -> Result<StepOutcome, AcquisitionError> {
        ensure!(
            matches!(self.state, RunState::Faulted(_)),
            NotFaultedSnafu { state: self.state }
        );
        let index = self.cursor_index();
        debug!("skipping {}", self.sequence[index]);
        Ok(self.advance(index))
    }

    /// Ends the run early. Samples already stored are kept.
    ///
    /// Returns the exchange that was in flight, which the caller must cancel on the adapter.
    pub fn abort(&mut self) -> Result<Option<ExchangeHandle>, AcquisitionError> {
        ensure!(self.is_active(), NoRunInProgressSnafu { state: self.state });
        let in_flight = self.in_flight.take();
        debug!("aborting run during {}", self.state);
        self.finish(RunState::Aborted);
        Ok(in_flight)
    }

    /// Samples of the frame in progress, or of the frame that just completed.
    pub fn current_frame(&self) -> FrameData {
        let frame = if self.frame_open {
            self.num_frames
        } else {
            self.num_frames.saturating_sub(1)
        };

        let analog = self
            .sequence
            .iter()
            .filter_map(|channel| match *channel {
                ChannelRef::Analog(i) => Some((i, self.analog[i][self.analog_frame_start[i]..].to_vec())),
                ChannelRef::Digital(_) => None,
            })
            .collect();

        let has_logic = self
            .sequence
            .iter()
            .any(|c| matches!(c, ChannelRef::Digital(_)));
        let logic = if has_logic {
            let start = self.logic.frame_start() * self.logic.unit_size();
            self.logic.as_bytes()[start..].to_vec()
        } else {
            Vec::new()
        };

        FrameData {
            frame,
            analog,
            logic,
            logic_unit_size: self.logic.unit_size(),
        }
    }

    fn has_channel(&self, channel: ChannelRef) -> bool {
        match channel {
            ChannelRef::Analog(i) => i < self.model.analog_channels as usize,
            ChannelRef::Digital(d) => d < self.model.digital_channels as usize,
        }
    }

    fn cursor_index(&self) -> usize {
        match self.cursor {
            Some(i) if i < self.sequence.len() => i,
            other => panic!("cursor {other:?} invalid for a {} channel run", self.sequence.len()),
        }
    }

    fn data_query(&self, channel: ChannelRef) -> Query {
        match (channel, self.model.digital_fetch) {
            (ChannelRef::Analog(i), _) => Query::AnalogData(i),
            (ChannelRef::Digital(d), DigitalFetch::PerPod) => {
                Query::DigitalPodData(d / DIGITAL_CHANNELS_PER_POD)
            }
            (ChannelRef::Digital(d), DigitalFetch::PerChannel) => Query::DigitalChannelData(d),
        }
    }

    fn begin_frame(&mut self) {
        for (start, samples) in self.analog_frame_start.iter_mut().zip(self.analog.iter()) {
            *start = samples.len();
        }
        self.logic.end_frame();
        self.frame_open = true;
    }

    fn remaining(&self) -> usize {
        match self.limits.samples {
            Some(limit) => usize::try_from(limit.saturating_sub(self.num_samples)).unwrap_or(usize::MAX),
            None => usize::MAX,
        }
    }

    fn store(&mut self, channel: ChannelRef, response: Response) -> Result<(), ExchangeError> {
        let block = response.into_block()?;
        let budget = self.remaining();

        let (available, taken, counted) = match channel {
            ChannelRef::Analog(ch) => {
                ensure!(
                    block.len() % 4 == 0,
                    MalformedResponseSnafu {
                        detail: format!("{} bytes is not a whole number of f32 samples", block.len()),
                    }
                );
                let available = block.len() / 4;
                let taken = available.min(budget);
                self.analog[ch].extend(
                    block
                        .chunks_exact(4)
                        .take(taken)
                        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]])),
                );
                (available, taken, taken)
            }
            ChannelRef::Digital(d) => {
                // instants already counted in this frame are shared by every digital channel
                let instants = self.logic.instants();
                let in_frame = instants - self.logic.frame_start();
                let available = block.len();
                let taken = available.min(in_frame.saturating_add(budget));
                match self.model.digital_fetch {
                    DigitalFetch::PerPod => self
                        .logic
                        .write_pod(d / DIGITAL_CHANNELS_PER_POD, &block[..taken]),
                    DigitalFetch::PerChannel => self.logic.write_channel(d, &block[..taken]),
                }
                (available, taken, self.logic.instants() - instants)
            }
        };

        if taken < available {
            warn!("{channel}: kept {taken} of {available} samples, sample limit reached");
        }
        debug!("{channel}: {taken} samples");
        self.num_samples += counted as u64;
        Ok(())
    }

    fn advance(&mut self, index: usize) -> StepOutcome {
        let last = index + 1 == self.sequence.len();
        if last {
            self.num_frames += 1;
            self.frame_open = false;
        }

        let limit_hit = self.limits.samples.is_some_and(|limit| self.num_samples >= limit);
        if limit_hit && !self.logic_pending(index) {
            debug!("sample limit reached after {} samples", self.num_samples);
            self.finish(RunState::LimitReached);
            return StepOutcome::LimitReached;
        }

        if !last {
            self.cursor = Some(index + 1);
            self.state = RunState::Armed;
            return StepOutcome::ChannelAdvanced;
        }

        if self.limits.frames.is_some_and(|limit| self.num_frames >= limit) {
            debug!("frame limit reached after {} frames", self.num_frames);
            self.finish(RunState::Complete);
            StepOutcome::RunComplete
        } else {
            self.cursor = Some(0);
            self.state = RunState::Armed;
            StepOutcome::FrameComplete
        }
    }

    /// Whether digital entries after `index` still have to fill the instants this frame already has.
    fn logic_pending(&self, index: usize) -> bool {
        self.logic.instants() > self.logic.frame_start()
            && self.sequence[index + 1..]
                .iter()
                .any(|c| matches!(c, ChannelRef::Digital(_)))
    }

    fn fault(&mut self, channel: ChannelRef, error: &ExchangeError) -> StepOutcome {
        let kind = error.kind();
        warn!("{channel}: {error}");
        self.state = RunState::Faulted(kind);
        StepOutcome::Error(kind)
    }

    fn finish(&mut self, state: RunState) {
        self.state = state;
        self.cursor = None;
        self.in_flight = None;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        exchange::ScriptedAdapter,
        model::{HMO_COMPACT2, HMO_COMPACT4, RTB2000},
    };

    fn samples(values: &[f32]) -> Response {
        Response::Block(values.iter().flat_map(|v| v.to_le_bytes()).collect())
    }

    fn ramp(len: usize) -> Vec<f32> {
        (0..len).map(|i| i as f32).collect()
    }

    fn step<A: ExchangeAdapter>(ctx: &mut AcquisitionContext, adapter: &mut A) -> StepOutcome {
        ctx.request_next(adapter).unwrap();
        ctx.receive_next(adapter).unwrap()
    }

    #[test]
    fn test_frames_advance_per_channel() {
        let mut adapter = ScriptedAdapter::new();
        for ch in 0..3 {
            adapter.reply_always(Query::AnalogData(ch), samples(&[1.0, 2.0]));
        }
        let mut ctx = AcquisitionContext::new(&HMO_COMPACT4);
        ctx.arm((0..3).map(ChannelRef::Analog).collect()).unwrap();

        for frame in 1..=2 {
            assert_eq!(step(&mut ctx, &mut adapter), StepOutcome::ChannelAdvanced);
            assert_eq!(step(&mut ctx, &mut adapter), StepOutcome::ChannelAdvanced);
            assert_eq!(step(&mut ctx, &mut adapter), StepOutcome::FrameComplete);
            assert_eq!(ctx.num_frames(), frame);
            assert_eq!(ctx.cursor(), Some(0));
        }
        assert_eq!(ctx.state(), RunState::Armed);
        assert_eq!(ctx.num_samples(), 12);
        assert_eq!(ctx.analog(2).unwrap(), &[1.0, 2.0, 1.0, 2.0]);
    }

    #[test]
    fn test_empty_arm_leaves_counters() {
        let mut adapter = ScriptedAdapter::new();
        adapter.reply_always(Query::AnalogData(0), samples(&[0.5]));
        let mut ctx = AcquisitionContext::new(&HMO_COMPACT2);
        ctx.set_limits(Limits::new(0, 1)).unwrap();
        ctx.arm(vec![ChannelRef::Analog(0)]).unwrap();
        assert_eq!(step(&mut ctx, &mut adapter), StepOutcome::RunComplete);

        assert!(matches!(ctx.arm(Vec::new()), Err(AcquisitionError::NoChannelsEnabled)));
        assert_eq!(ctx.num_samples(), 1);
        assert_eq!(ctx.num_frames(), 1);
        assert_eq!(ctx.state(), RunState::Complete);
    }

    #[test]
    fn test_sample_limit_exact() {
        let mut adapter = ScriptedAdapter::new();
        adapter
            .reply_always(Query::AnalogData(0), samples(&ramp(6)))
            .reply_always(Query::AnalogData(1), samples(&ramp(6)));
        let mut ctx = AcquisitionContext::new(&HMO_COMPACT2);
        ctx.set_limits(Limits::new(10, 0)).unwrap();
        ctx.arm(vec![ChannelRef::Analog(0), ChannelRef::Analog(1)]).unwrap();

        assert_eq!(step(&mut ctx, &mut adapter), StepOutcome::ChannelAdvanced);
        assert_eq!(step(&mut ctx, &mut adapter), StepOutcome::LimitReached);

        assert_eq!(ctx.num_samples(), 10);
        assert_eq!(ctx.analog(0).unwrap().len(), 6);
        assert_eq!(ctx.analog(1).unwrap(), &ramp(4)[..]);
        assert_eq!(ctx.state(), RunState::LimitReached);
        assert_eq!(ctx.cursor(), None);
    }

    #[test]
    fn test_sample_limit_mid_frame() {
        let mut adapter = ScriptedAdapter::new();
        adapter
            .reply_always(Query::AnalogData(0), samples(&ramp(10)))
            .reply_always(Query::AnalogData(1), samples(&ramp(10)));
        let mut ctx = AcquisitionContext::new(&HMO_COMPACT2);
        ctx.set_limits(Limits::new(10, 0)).unwrap();
        ctx.arm(vec![ChannelRef::Analog(0), ChannelRef::Analog(1)]).unwrap();

        assert_eq!(step(&mut ctx, &mut adapter), StepOutcome::LimitReached);
        assert_eq!(ctx.num_samples(), 10);
        assert_eq!(ctx.num_frames(), 0);
        assert_eq!(ctx.analog(0).unwrap().len(), 10);
        assert!(ctx.analog(1).unwrap().is_empty());
        assert_eq!(ctx.current_frame().analog[0].1.len(), 10);
    }

    #[test]
    fn test_sample_limit_beats_frame_limit() {
        let mut adapter = ScriptedAdapter::new();
        adapter.reply_always(Query::AnalogData(0), samples(&ramp(5)));
        let mut ctx = AcquisitionContext::new(&HMO_COMPACT2);
        ctx.set_limits(Limits::new(5, 1)).unwrap();
        ctx.arm(vec![ChannelRef::Analog(0)]).unwrap();

        assert_eq!(step(&mut ctx, &mut adapter), StepOutcome::LimitReached);
        assert_eq!(ctx.num_frames(), 1);
    }

    #[test]
    fn test_frame_limit() {
        let mut adapter = ScriptedAdapter::new();
        adapter.reply_always(Query::AnalogData(1), samples(&[3.0]));
        let mut ctx = AcquisitionContext::new(&HMO_COMPACT2);
        ctx.set_limits(Limits::new(0, 2)).unwrap();
        ctx.arm(vec![ChannelRef::Analog(1)]).unwrap();

        assert_eq!(step(&mut ctx, &mut adapter), StepOutcome::FrameComplete);
        assert_eq!(step(&mut ctx, &mut adapter), StepOutcome::RunComplete);
        assert_eq!(ctx.state(), RunState::Complete);
        assert!(matches!(
            ctx.request_next(&mut adapter),
            Err(AcquisitionError::NotArmed { .. })
        ));
    }

    #[test]
    fn test_digital_channels_zero_and_nine() {
        let mut adapter = ScriptedAdapter::new();
        adapter
            .reply(Query::DigitalChannelData(0), Response::Block(vec![1]))
            .reply(Query::DigitalChannelData(9), Response::Block(vec![0]));
        let mut ctx = AcquisitionContext::new(&RTB2000);
        ctx.arm(vec![ChannelRef::Digital(0), ChannelRef::Digital(9)]).unwrap();

        assert_eq!(step(&mut ctx, &mut adapter), StepOutcome::ChannelAdvanced);
        assert_eq!(step(&mut ctx, &mut adapter), StepOutcome::FrameComplete);

        let pods = ctx.logic().as_bytes();
        assert_eq!(pods.len(), 2);
        assert_eq!(pods[0] & channel_mask(0), 0x80);
        assert_eq!(pods[1] & channel_mask(9), 0);
        // both channels sample the same instant
        assert_eq!(ctx.num_samples(), 1);
    }

    #[test]
    fn test_sample_limit_shared_by_pods() {
        let mut adapter = ScriptedAdapter::new();
        adapter
            .reply(Query::DigitalPodData(0), Response::Block(vec![0xFF; 12]))
            .reply(Query::DigitalPodData(1), Response::Block(vec![0xFF; 12]));
        let mut ctx = AcquisitionContext::new(&HMO_COMPACT4);
        ctx.set_limits(Limits::new(10, 0)).unwrap();
        ctx.arm(vec![ChannelRef::Digital(0), ChannelRef::Digital(8)]).unwrap();

        assert_eq!(step(&mut ctx, &mut adapter), StepOutcome::ChannelAdvanced);
        assert_eq!(ctx.num_samples(), 10);
        assert_eq!(step(&mut ctx, &mut adapter), StepOutcome::LimitReached);

        assert_eq!(ctx.num_samples(), 10);
        assert_eq!(ctx.num_frames(), 1);
        assert_eq!(ctx.logic().instants(), 10);
        assert_eq!(ctx.logic().as_bytes(), &[0xFF; 20]);
    }

    #[test]
    fn test_sample_limit_shared_by_channels() {
        let mut adapter = ScriptedAdapter::new();
        adapter
            .reply(Query::DigitalChannelData(1), Response::Block(vec![1; 10]))
            .reply(Query::DigitalChannelData(9), Response::Block(vec![1; 10]));
        let mut ctx = AcquisitionContext::new(&RTB2000);
        ctx.set_limits(Limits::new(10, 0)).unwrap();
        ctx.arm(vec![ChannelRef::Digital(1), ChannelRef::Digital(9)]).unwrap();

        assert_eq!(step(&mut ctx, &mut adapter), StepOutcome::ChannelAdvanced);
        assert_eq!(step(&mut ctx, &mut adapter), StepOutcome::LimitReached);

        assert_eq!(ctx.num_samples(), 10);
        let high = channel_mask(1);
        assert_eq!(ctx.logic().as_bytes(), &[high; 20]);
    }

    #[test]
    fn test_one_fetch_per_pod() {
        let mut ctx = AcquisitionContext::new(&HMO_COMPACT4);
        assert!(matches!(
            ctx.arm(vec![ChannelRef::Digital(0), ChannelRef::Digital(3)]),
            Err(AcquisitionError::AlreadyInRun {
                channel: ChannelRef::Digital(3),
                query: Query::DigitalPodData(0),
            })
        ));
        assert!(matches!(
            ctx.arm(vec![ChannelRef::Analog(1), ChannelRef::Analog(1)]),
            Err(AcquisitionError::AlreadyInRun { .. })
        ));
        assert_eq!(ctx.state(), RunState::Idle);

        let mut ctx = AcquisitionContext::new(&RTB2000);
        assert!(ctx.arm(vec![ChannelRef::Digital(0), ChannelRef::Digital(3)]).is_ok());
    }

    #[test]
    fn test_pod_fetch_stores_whole_bytes() {
        let mut adapter = ScriptedAdapter::new();
        adapter
            .reply(Query::DigitalPodData(0), Response::Block(vec![0xF0, 0x0F]))
            .reply(Query::DigitalPodData(1), Response::Block(vec![0xAA, 0x55]));
        let mut ctx = AcquisitionContext::new(&HMO_COMPACT4);
        ctx.arm(vec![ChannelRef::Digital(3), ChannelRef::Digital(8)]).unwrap();

        step(&mut ctx, &mut adapter);
        step(&mut ctx, &mut adapter);

        assert_eq!(adapter.sent(), &[Query::DigitalPodData(0), Query::DigitalPodData(1)]);
        assert_eq!(ctx.logic().as_bytes(), &[0xF0, 0xAA, 0x0F, 0x55]);
        assert_eq!(ctx.current_frame().logic_unit_size, 2);
    }

    #[test]
    fn test_abort_keeps_earlier_channels() {
        let mut adapter = ScriptedAdapter::new();
        for ch in 0..3 {
            adapter.reply_always(Query::AnalogData(ch), samples(&[ch as f32; 4]));
        }
        let mut ctx = AcquisitionContext::new(&HMO_COMPACT4);
        ctx.arm((0..3).map(ChannelRef::Analog).collect()).unwrap();

        step(&mut ctx, &mut adapter);
        step(&mut ctx, &mut adapter);
        ctx.request_next(&mut adapter).unwrap();
        assert_eq!(ctx.state(), RunState::RunningChannel(2));
        assert!(matches!(
            ctx.arm(vec![ChannelRef::Analog(3)]),
            Err(AcquisitionError::RunAlreadyActive {
                state: RunState::RunningChannel(2),
            })
        ));
        assert!(matches!(
            ctx.set_limits(Limits::new(1, 0)),
            Err(AcquisitionError::RunAlreadyActive { .. })
        ));

        let in_flight = ctx.abort().unwrap();
        assert_eq!(in_flight, adapter.in_flight());
        assert!(in_flight.is_some());
        assert_eq!(ctx.state(), RunState::Aborted);
        assert_eq!(ctx.analog(0).unwrap(), &[0.0; 4]);
        assert_eq!(ctx.analog(1).unwrap(), &[1.0; 4]);
        assert!(ctx.analog(2).unwrap().is_empty());
        assert_eq!(ctx.num_samples(), 8);
        assert!(matches!(ctx.abort(), Err(AcquisitionError::NoRunInProgress { .. })));
    }

    #[test]
    fn test_empty_response_advances() {
        let mut adapter = ScriptedAdapter::new();
        adapter
            .reply(Query::DigitalPodData(0), Response::Block(Vec::new()))
            .reply(Query::AnalogData(0), samples(&[1.0]));
        let mut ctx = AcquisitionContext::new(&HMO_COMPACT2);
        ctx.arm(vec![ChannelRef::Analog(0), ChannelRef::Digital(0)]).unwrap();

        assert_eq!(step(&mut ctx, &mut adapter), StepOutcome::ChannelAdvanced);
        assert_eq!(step(&mut ctx, &mut adapter), StepOutcome::FrameComplete);
        assert!(ctx.logic().as_bytes().is_empty());
    }

    #[test]
    fn test_pending_keeps_running() {
        let mut adapter = ScriptedAdapter::new();
        adapter.reply(Query::AnalogData(0), samples(&[1.0])).stall(2);
        let mut ctx = AcquisitionContext::new(&HMO_COMPACT2);
        ctx.arm(vec![ChannelRef::Analog(0)]).unwrap();
        ctx.request_next(&mut adapter).unwrap();

        assert_eq!(ctx.receive_next(&mut adapter).unwrap(), StepOutcome::Pending);
        assert_eq!(ctx.receive_next(&mut adapter).unwrap(), StepOutcome::Pending);
        assert_eq!(ctx.state(), RunState::RunningChannel(0));
        assert_eq!(ctx.receive_next(&mut adapter).unwrap(), StepOutcome::FrameComplete);
    }

    #[test]
    fn test_error_then_retry() {
        let mut adapter = ScriptedAdapter::new();
        adapter
            .fail(Query::AnalogData(0), ExchangeErrorKind::Timeout)
            .reply(Query::AnalogData(0), samples(&[7.0]));
        let mut ctx = AcquisitionContext::new(&HMO_COMPACT2);
        ctx.arm(vec![ChannelRef::Analog(0)]).unwrap();

        let outcome = step(&mut ctx, &mut adapter);
        assert_eq!(outcome, StepOutcome::Error(ExchangeErrorKind::Timeout));
        assert_eq!(ctx.state(), RunState::Faulted(ExchangeErrorKind::Timeout));
        assert_eq!(ctx.cursor(), Some(0));
        assert!(matches!(
            ctx.arm(vec![ChannelRef::Analog(1)]),
            Err(AcquisitionError::RunAlreadyActive { .. })
        ));

        ctx.retry().unwrap();
        assert_eq!(step(&mut ctx, &mut adapter), StepOutcome::FrameComplete);
        assert_eq!(ctx.analog(0).unwrap(), &[7.0]);
    }

    #[test]
    fn test_retry_only_when_faulted() {
        let mut adapter = ScriptedAdapter::new();
        adapter
            .reply(Query::AnalogData(0), Response::Block(vec![0; 5]))
            .reply(Query::AnalogData(1), samples(&[2.0]));
        let mut ctx = AcquisitionContext::new(&HMO_COMPACT2);
        ctx.arm(vec![ChannelRef::Analog(0), ChannelRef::Analog(1)]).unwrap();

        assert_eq!(
            step(&mut ctx, &mut adapter),
            StepOutcome::Error(ExchangeErrorKind::MalformedResponse)
        );
        assert!(matches!(ctx.retry().and(ctx.retry()), Err(AcquisitionError::NotFaulted { .. })));
    }

    #[test]
    fn test_skip_moves_on() {
        let mut adapter = ScriptedAdapter::new();
        adapter
            .reply(Query::AnalogData(0), Response::Text("nope".into()))
            .reply(Query::AnalogData(1), samples(&[2.0]));
        let mut ctx = AcquisitionContext::new(&HMO_COMPACT2);
        ctx.arm(vec![ChannelRef::Analog(0), ChannelRef::Analog(1)]).unwrap();

        assert_eq!(
            step(&mut ctx, &mut adapter),
            StepOutcome::Error(ExchangeErrorKind::MalformedResponse)
        );
        assert_eq!(ctx.skip().unwrap(), StepOutcome::ChannelAdvanced);
        assert_eq!(step(&mut ctx, &mut adapter), StepOutcome::FrameComplete);
        assert!(ctx.analog(0).unwrap().is_empty());
        assert_eq!(ctx.num_samples(), 1);
    }

    #[test]
    fn test_external_timeout() {
        let mut adapter = ScriptedAdapter::new();
        let mut ctx = AcquisitionContext::new(&HMO_COMPACT2);
        ctx.arm(vec![ChannelRef::Analog(0)]).unwrap();
        assert!(ctx.fail_in_flight(&ExchangeErrorKind::Timeout.into_error()).is_err());

        ctx.request_next(&mut adapter).unwrap();
        let outcome = ctx
            .fail_in_flight(&ExchangeErrorKind::Timeout.into_error())
            .unwrap();
        assert_eq!(outcome, StepOutcome::Error(ExchangeErrorKind::Timeout));
        assert_eq!(ctx.in_flight(), None);
    }

    #[test]
    fn test_receive_without_request() {
        let mut adapter = ScriptedAdapter::new();
        let mut ctx = AcquisitionContext::new(&HMO_COMPACT2);
        assert!(matches!(
            ctx.receive_next(&mut adapter),
            Err(AcquisitionError::NoExchangeInFlight { .. })
        ));
        assert!(matches!(
            ctx.arm(vec![ChannelRef::Digital(8)]),
            Err(AcquisitionError::UnknownChannel { .. })
        ));
    }

    #[test]
    fn test_current_frame_is_last_completed() {
        let mut adapter = ScriptedAdapter::new();
        adapter
            .reply(Query::AnalogData(0), samples(&[1.0, 1.0]))
            .reply(Query::AnalogData(0), samples(&[2.0, 2.0]))
            .reply(Query::DigitalPodData(0), Response::Block(vec![0x11, 0x12]))
            .reply(Query::DigitalPodData(0), Response::Block(vec![0x21, 0x22]));
        let mut ctx = AcquisitionContext::new(&HMO_COMPACT2);
        ctx.arm(vec![ChannelRef::Analog(0), ChannelRef::Digital(0)]).unwrap();

        step(&mut ctx, &mut adapter);
        assert_eq!(step(&mut ctx, &mut adapter), StepOutcome::FrameComplete);
        step(&mut ctx, &mut adapter);
        assert_eq!(step(&mut ctx, &mut adapter), StepOutcome::FrameComplete);

        let frame = ctx.current_frame();
        assert_eq!(frame.frame, 1);
        assert_eq!(frame.analog, vec![(0, vec![2.0, 2.0])]);
        assert_eq!(frame.logic, vec![0x21, 0x22]);
        assert_eq!(ctx.logic().as_bytes(), &[0x11, 0x12, 0x21, 0x22]);
    }

    #[test]
    fn test_limits_zero_is_unbounded() {
        assert_eq!(Limits::new(0, 0), Limits::default());
        assert_eq!(Limits::new(3, 0).samples, Some(3));
    }
}
