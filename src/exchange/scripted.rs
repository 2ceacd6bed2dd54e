use super::{ExchangeAdapter, ExchangeError, ExchangeErrorKind, ExchangeHandle, Query, Response};
use crate::data::options::ScpiDialect;
use log::{debug, trace};
use std::collections::{HashMap, VecDeque};

/// In-memory [`ExchangeAdapter`] answering from a per-query script.
///
/// Queued replies are consumed first, then the standing reply for the query if
/// one is set. A query with nothing scripted times out. Everything sent is
/// recorded so callers can check ordering afterwards.
#[derive(Debug, Default)]
pub struct ScriptedAdapter {
    queued: HashMap<Query, VecDeque<Result<Response, ExchangeErrorKind>>>,
    standing: HashMap<Query, Response>,
    in_flight: Option<(ExchangeHandle, Query)>,
    next_handle: u64,
    stalls: usize,
    sent: Vec<Query>,
    cancelled: Vec<ExchangeHandle>,
}

impl ScriptedAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a one-shot reply for `query`.
    pub fn reply(&mut self, query: Query, response: Response) -> &mut Self {
        self.queued.entry(query).or_default().push_back(Ok(response));
        self
    }

    /// Queues a one-shot failure for `query`.
    pub fn fail(&mut self, query: Query, kind: ExchangeErrorKind) -> &mut Self {
        self.queued.entry(query).or_default().push_back(Err(kind));
        self
    }

    /// Answers `query` with `response` whenever nothing is queued for it.
    pub fn reply_always(&mut self, query: Query, response: Response) -> &mut Self {
        self.standing.insert(query, response);
        self
    }

    /// The next `polls` calls to `try_receive` report the response as not yet arrived.
    pub fn stall(&mut self, polls: usize) -> &mut Self {
        self.stalls += polls;
        self
    }

    /// Every query sent so far, settings and data alike, in order.
    pub fn sent(&self) -> &[Query] {
        &self.sent
    }

    pub fn cancelled(&self) -> &[ExchangeHandle] {
        &self.cancelled
    }

    pub fn in_flight(&self) -> Option<ExchangeHandle> {
        self.in_flight.map(|(handle, _)| handle)
    }

    fn next_reply(&mut self, query: Query) -> Result<Response, ExchangeError> {
        let queued = self.queued.get_mut(&query).and_then(VecDeque::pop_front);
        match queued {
            Some(Ok(response)) => Ok(response),
            Some(Err(kind)) => Err(kind.into_error()),
            None => match self.standing.get(&query) {
                Some(response) => Ok(response.clone()),
                None => Err(ExchangeErrorKind::Timeout.into_error()),
            },
        }
    }
}

impl ExchangeAdapter for ScriptedAdapter {
    fn query(&mut self, dialect: ScpiDialect, query: Query) -> Result<Response, ExchangeError> {
        trace!("{dialect} query: {query}");
        self.sent.push(query);
        self.next_reply(query)
    }

    fn send_query(
        &mut self,
        dialect: ScpiDialect,
        query: Query,
    ) -> Result<ExchangeHandle, ExchangeError> {
        if let Some((stale, _)) = self.in_flight.take() {
            debug!("exchange {stale} replaced before it was collected");
        }
        let handle = ExchangeHandle(self.next_handle);
        self.next_handle += 1;
        trace!("{dialect} request {handle}: {query}");
        self.sent.push(query);
        self.in_flight = Some((handle, query));
        Ok(handle)
    }

    fn try_receive(&mut self, handle: ExchangeHandle) -> Result<Option<Response>, ExchangeError> {
        let query = match self.in_flight {
            Some((current, query)) if current == handle => query,
            _ => return Err(ExchangeErrorKind::TransportClosed.into_error()),
        };
        if self.stalls > 0 {
            self.stalls -= 1;
            return Ok(None);
        }
        self.in_flight = None;
        self.next_reply(query).map(Some)
    }

    fn cancel(&mut self, handle: ExchangeHandle) {
        if self.in_flight.is_some_and(|(current, _)| current == handle) {
            self.in_flight = None;
        }
        self.cancelled.push(handle);
    }
}
