//! The seam to the instrument transport.
//!
//! Command encoding and byte-level I/O live behind [`ExchangeAdapter`]; this
//! crate only names the logical [`Query`] and consumes typed [`Response`]s.

use crate::data::options::ScpiDialect;
use derive_more::Display;
use serde::Serialize;
use snafu::{Location, Snafu};
use strum::Display as StrumDisplay;

mod scripted;

pub use scripted::ScriptedAdapter;

/// One logical exchange with the instrument. Channel and pod numbers are zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Query {
    #[display(fmt = "CH{} state", "_0 + 1")]
    AnalogChannelState(usize),
    #[display(fmt = "CH{} vertical scale", "_0 + 1")]
    VerticalScale(usize),
    #[display(fmt = "CH{} vertical offset", "_0 + 1")]
    VerticalOffset(usize),
    #[display(fmt = "CH{} coupling", "_0 + 1")]
    Coupling(usize),
    #[display(fmt = "CH{} probe unit", "_0 + 1")]
    ProbeUnit(usize),
    #[display(fmt = "D{} state", _0)]
    DigitalChannelState(usize),
    #[display(fmt = "POD{} state", "_0 + 1")]
    PodState(usize),
    #[display(fmt = "POD{} threshold", "_0 + 1")]
    PodThreshold(usize),
    #[display(fmt = "POD{} user threshold", "_0 + 1")]
    PodUserThreshold(usize),
    #[display(fmt = "timebase")]
    Timebase,
    #[display(fmt = "horizontal divisions")]
    HorizontalDivisions,
    #[display(fmt = "record length")]
    RecordLength,
    #[display(fmt = "waveform sample rate")]
    WaveformSampleRate,
    #[display(fmt = "interpolation mode")]
    InterpolationMode,
    #[display(fmt = "horizontal trigger position")]
    HorizTriggerPos,
    #[display(fmt = "trigger source")]
    TriggerSource,
    #[display(fmt = "trigger slope")]
    TriggerSlope,
    #[display(fmt = "trigger pattern")]
    TriggerPattern,
    #[display(fmt = "high resolution")]
    HighResolution,
    #[display(fmt = "peak detection")]
    PeakDetection,
    #[display(fmt = "CH{} waveform data", "_0 + 1")]
    AnalogData(usize),
    #[display(fmt = "POD{} logic data", "_0 + 1")]
    DigitalPodData(usize),
    #[display(fmt = "D{} logic data", _0)]
    DigitalChannelData(usize),
}

/// A parsed reply.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Int(i64),
    Float(f64),
    Text(String),
    /// Definite-length binary block, header already stripped.
    Block(Vec<u8>),
}

impl Response {
    pub fn into_bool(self) -> Result<bool, ExchangeError> {
        match self {
            Response::Int(0) => Ok(false),
            Response::Int(1) => Ok(true),
            Response::Text(ref s) => match s.trim().to_ascii_uppercase().as_str() {
                "1" | "ON" | "TRUE" => Ok(true),
                "0" | "OFF" | "FALSE" => Ok(false),
                _ => Err(self.malformed("a boolean")),
            },
            other => Err(other.malformed("a boolean")),
        }
    }

    pub fn into_f64(self) -> Result<f64, ExchangeError> {
        match self {
            Response::Float(f) => Ok(f),
            Response::Int(i) => Ok(i as f64),
            Response::Text(ref s) => s.trim().parse().map_err(|_| self.malformed("a float")),
            other => Err(other.malformed("a float")),
        }
    }

    pub fn into_i64(self) -> Result<i64, ExchangeError> {
        match self {
            Response::Int(i) => Ok(i),
            Response::Text(ref s) => s.trim().parse().map_err(|_| self.malformed("an integer")),
            other => Err(other.malformed("an integer")),
        }
    }

    pub fn into_text(self) -> Result<String, ExchangeError> {
        match self {
            Response::Text(s) => Ok(s),
            other => Err(other.malformed("a string")),
        }
    }

    pub fn into_block(self) -> Result<Vec<u8>, ExchangeError> {
        match self {
            Response::Block(data) => Ok(data),
            other => Err(other.malformed("a binary block")),
        }
    }

    #[track_caller]
    pub(crate) fn malformed(&self, expected: &str) -> ExchangeError {
        MalformedResponseSnafu {
            detail: format!("expected {expected}, got {self:?}"),
        }
        .build()
    }
}

/// Identifies an exchange started with [`ExchangeAdapter::send_query`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[display(fmt = "#{}", _0)]
pub struct ExchangeHandle(pub u64);

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ExchangeError {
    #[snafu(display("no response before the timeout"))]
    Timeout {
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("transport closed"))]
    TransportClosed {
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("malformed response: {detail}"))]
    MalformedResponse {
        detail: String,
        #[snafu(implicit)]
        location: Location,
    },
}

impl ExchangeError {
    pub fn kind(&self) -> ExchangeErrorKind {
        match self {
            ExchangeError::Timeout { .. } => ExchangeErrorKind::Timeout,
            ExchangeError::TransportClosed { .. } => ExchangeErrorKind::TransportClosed,
            ExchangeError::MalformedResponse { .. } => ExchangeErrorKind::MalformedResponse,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, StrumDisplay)]
pub enum ExchangeErrorKind {
    Timeout,
    TransportClosed,
    MalformedResponse,
}

impl ExchangeErrorKind {
    #[track_caller]
    pub fn into_error(self) -> ExchangeError {
        match self {
            ExchangeErrorKind::Timeout => TimeoutSnafu.build(),
            ExchangeErrorKind::TransportClosed => TransportClosedSnafu.build(),
            ExchangeErrorKind::MalformedResponse => MalformedResponseSnafu {
                detail: "unparseable reply",
            }
            .build(),
        }
    }
}

/// Transport-side collaborator performing the actual command/response round trips.
///
/// At most one data exchange is outstanding at a time; responses are consumed
/// in the order the requests were sent.
pub trait ExchangeAdapter {
    /// Blocking round trip, used for settings queries.
    fn query(&mut self, dialect: ScpiDialect, query: Query) -> Result<Response, ExchangeError>;

    /// Sends a request and returns without waiting for the response.
    fn send_query(
        &mut self,
        dialect: ScpiDialect,
        query: Query,
    ) -> Result<ExchangeHandle, ExchangeError>;

    /// Collects the response to `handle`, `Ok(None)` if it has not fully arrived yet.
    fn try_receive(&mut self, handle: ExchangeHandle) -> Result<Option<Response>, ExchangeError>;

    /// Drops an exchange whose response will never be collected. Any partially
    /// received bytes must be discarded so the next command starts clean.
    fn cancel(&mut self, handle: ExchangeHandle) {
        let _ = handle;
    }
}

impl<A: ExchangeAdapter + ?Sized> ExchangeAdapter for &mut A {
    fn query(&mut self, dialect: ScpiDialect, query: Query) -> Result<Response, ExchangeError> {
        (**self).query(dialect, query)
    }

    fn send_query(
        &mut self,
        dialect: ScpiDialect,
        query: Query,
    ) -> Result<ExchangeHandle, ExchangeError> {
        (**self).send_query(dialect, query)
    }

    fn try_receive(&mut self, handle: ExchangeHandle) -> Result<Option<Response>, ExchangeError> {
        (**self).try_receive(handle)
    }

    fn cancel(&mut self, handle: ExchangeHandle) {
        (**self).cancel(handle)
    }
}
