use crate::{
    acquisition::{
        enabled_sequence, AcquisitionContext, AcquisitionError, Limits, RunState, StepOutcome,
    },
    exchange::{ExchangeAdapter, ExchangeErrorKind},
    model::{resolve, ResolveError, ScopeModel},
    state::{RefreshError, SessionState},
    AcquisitionConfig, AcquisitionMessage, ChannelRef, FrameMessage, RunSummary,
};
use log::{debug, info, warn};
use snafu::{ResultExt, Snafu};
use tokio::{
    sync::mpsc,
    time::{timeout, Instant},
};

/// The transport has data for the outstanding exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Readiness;

#[derive(Debug, Snafu)]
pub enum OpenError {
    #[snafu(context(false))]
    Resolve { source: ResolveError },
    #[snafu(display("{model} did not answer a single settings query"))]
    Unresponsive {
        model: &'static str,
        source: RefreshError,
    },
}

#[derive(Debug, Snafu)]
pub enum RunError {
    #[snafu(context(false))]
    Acquisition { source: AcquisitionError },
    #[snafu(display("gave up on {channel} after {attempts} attempts ({kind})"))]
    ExchangeFailed {
        channel: ChannelRef,
        kind: ExchangeErrorKind,
        attempts: u32,
    },
    #[snafu(display("readiness notifications stopped"))]
    EventSourceClosed,
}

/// One connected instrument: its descriptor, live settings, acquisition state and transport.
#[derive(Debug)]
pub struct Session<A> {
    state: SessionState,
    acquisition: AcquisitionContext,
    adapter: A,
}

impl<A: ExchangeAdapter> Session<A> {
    /// Matches `model` to a descriptor and reads the instrument's current settings.
    ///
    /// A refresh where only some queries fail still opens the session.
    pub fn open(model: &str, mut adapter: A) -> Result<Self, OpenError> {
        let model = resolve(model)?;
        info!("opening {}", model.primary_name());

        let mut state = SessionState::new(model);
        match state.refresh(&mut adapter) {
            Ok(()) => {}
            Err(e) if e.is_total() => {
                return Err(e).context(UnresponsiveSnafu {
                    model: model.primary_name(),
                })
            }
            Err(e) => warn!("opened with a partial refresh: {e}"),
        }

        Ok(Self {
            state,
            acquisition: AcquisitionContext::new(model),
            adapter,
        })
    }

    pub fn model(&self) -> &'static ScopeModel {
        self.state.model()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut SessionState {
        &mut self.state
    }

    pub fn acquisition(&self) -> &AcquisitionContext {
        &self.acquisition
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn adapter_mut(&mut self) -> &mut A {
        &mut self.adapter
    }

    pub fn into_adapter(self) -> A {
        self.adapter
    }

    pub fn refresh(&mut self) -> Result<(), RefreshError> {
        self.state.refresh(&mut self.adapter)
    }

    /// Arms a run over the enabled channels and requests the first one.
    ///
    /// `Some` carries the failure of that first request.
    pub fn start(&mut self, limits: Limits) -> Result<Option<StepOutcome>, AcquisitionError> {
        let sequence = enabled_sequence(self.state.model(), &self.state)?;
        self.acquisition.set_limits(limits)?;
        self.acquisition.arm(sequence)?;
        self.resume()
    }

    /// Collects the response to the outstanding exchange.
    pub fn on_readiness(&mut self) -> Result<StepOutcome, AcquisitionError> {
        self.acquisition.receive_next(&mut self.adapter)
    }

    /// Gives up waiting on the outstanding exchange.
    pub fn on_timeout(&mut self) -> Result<StepOutcome, AcquisitionError> {
        let in_flight = self.acquisition.in_flight();
        let outcome = self
            .acquisition
            .fail_in_flight(&ExchangeErrorKind::Timeout.into_error())?;
        if let Some(handle) = in_flight {
            self.adapter.cancel(handle);
        }
        Ok(outcome)
    }

    /// Requests the channel now under the cursor. `Some` carries a send failure.
    pub fn resume(&mut self) -> Result<Option<StepOutcome>, AcquisitionError> {
        match self.acquisition.request_next(&mut self.adapter) {
            Ok(()) => Ok(None),
            Err(AcquisitionError::Exchange { source }) => Ok(Some(StepOutcome::Error(source.kind()))),
            Err(e) => Err(e),
        }
    }

    pub fn retry(&mut self) -> Result<Option<StepOutcome>, AcquisitionError> {
        self.acquisition.retry()?;
        self.resume()
    }

    /// Aborts the run if one is active and cancels its outstanding exchange.
    pub fn stop(&mut self) {
        if !self.acquisition.is_active() {
            return;
        }
        if let Ok(Some(handle)) = self.acquisition.abort() {
            self.adapter.cancel(handle);
        }
    }

    fn summary(&self) -> RunSummary {
        RunSummary {
            state: self.acquisition.state(),
            frames: self.acquisition.num_frames(),
            samples: self.acquisition.num_samples(),
        }
    }
}

/// Drives one run to its end, waiting on `readiness_rx` between exchanges.
///
/// Every completed frame is published on `message_tx`, followed by a final
/// [`AcquisitionMessage::Finished`]. A failed exchange is retried up to
/// `config.max_retries` times before the run is aborted. Dropping the
/// receiving end of `message_tx` aborts the run.
pub async fn run_acquisition<A: ExchangeAdapter>(
    session: &mut Session<A>,
    mut readiness_rx: mpsc::Receiver<Readiness>,
    message_tx: mpsc::Sender<AcquisitionMessage>,
    config: &AcquisitionConfig,
    mut notify_updated: impl FnMut(),
) -> Result<RunSummary, RunError> {
    let mut next = session.start(config.limits())?;
    let mut retries = 0;
    let mut frame_started = Instant::now();

    'main: loop {
        let outcome = match next.take() {
            Some(outcome) => outcome,
            None => match timeout(config.event_timeout, readiness_rx.recv()).await {
                Ok(Some(Readiness)) => match session.on_readiness() {
                    Err(AcquisitionError::NoExchangeInFlight { state }) => {
                        debug!("ignoring readiness while {state}");
                        continue 'main;
                    }
                    other => other?,
                },
                Ok(None) => {
                    session.stop();
                    let _ = message_tx
                        .send(AcquisitionMessage::Finished(session.summary()))
                        .await;
                    return EventSourceClosedSnafu.fail();
                }
                Err(_elapsed) => session.on_timeout()?,
            },
        };

        match outcome {
            StepOutcome::Pending => {}
            StepOutcome::ChannelAdvanced => {
                retries = 0;
                next = session.resume()?;
            }
            StepOutcome::FrameComplete => {
                retries = 0;
                let frame = FrameMessage {
                    data: session.acquisition().current_frame(),
                    acquisition_duration: frame_started.elapsed(),
                };
                frame_started = Instant::now();

                notify_updated();
                if message_tx
                    .send(AcquisitionMessage::FrameComplete(frame))
                    .await
                    .is_err()
                {
                    session.stop();
                    break 'main;
                }
                next = session.resume()?;
            }
            StepOutcome::RunComplete | StepOutcome::LimitReached => {
                let frame = FrameMessage {
                    data: session.acquisition().current_frame(),
                    acquisition_duration: frame_started.elapsed(),
                };
                notify_updated();
                let _ = message_tx.send(AcquisitionMessage::FrameComplete(frame)).await;
                break 'main;
            }
            StepOutcome::Error(kind) => {
                let channel = session.acquisition().current_channel();
                if retries < config.max_retries {
                    retries += 1;
                    warn!(
                        "retrying {} ({kind}), attempt {} of {}",
                        channel.map_or_else(|| "?".to_owned(), |c| c.to_string()),
                        retries + 1,
                        config.max_retries + 1,
                    );
                    next = session.retry()?;
                    continue 'main;
                }

                session.stop();
                let _ = message_tx
                    .send(AcquisitionMessage::Finished(session.summary()))
                    .await;
                let Some(channel) = channel else {
                    return Ok(session.summary());
                };
                return ExchangeFailedSnafu {
                    channel,
                    kind,
                    attempts: retries + 1,
                }
                .fail();
            }
        }
    }

    let summary = session.summary();
    debug!("run ended: {summary:?}");
    if summary.state != RunState::Aborted {
        let _ = message_tx.send(AcquisitionMessage::Finished(summary)).await;
    }
    Ok(summary)
}
