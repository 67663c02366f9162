//! Protocol-tap codecs
//!
//! `TracingCodec` sits between a connection and its real codec. Bytes pass
//! through untouched; on the side it correlates each outgoing application
//! request with the reply that answers it and publishes the pair as an
//! `Operation` event.
//!
//! ## Correlation
//!
//! Replies arrive in request order on one connection, so pending requests are
//! kept in a FIFO. A reply is attributed only when its xid matches the head;
//! anything else is left alone so the head still reaches a terminal event.
//!
//! ## Timeouts
//!
//! When the connection closes or fails, or the session-close reply is seen,
//! every request still pending is published as a timeout `Operation` and the
//! tap detaches: later state changes and traffic are passed through without
//! correlation. Raw message capture is not affected by detaching, so a capture
//! with messages enabled still records whatever crosses the connection.
//!
//! A reply that never arrives leaves its request at the head for good. Every
//! later reply then mismatches, the queue keeps growing, and all of it is
//! published as timeouts once the connection closes.

use crate::error::CodecResult;
use bytes::BytesMut;
use std::collections::VecDeque;
use types::{
    Clock, MonotonicClock, Request, Response, TraceEvent, TracePublisher, TIMEOUT_SENTINEL,
};

/// Request / response codec of the session client
pub trait ClientCodec: Send {
    fn encode(&mut self, request: &Request, dst: &mut BytesMut) -> CodecResult<()>;

    /// Decode one reply from the front of `src`, `None` while incomplete
    fn decode(&mut self, src: &mut BytesMut) -> CodecResult<Option<Response>>;
}

impl<C: ClientCodec + ?Sized> ClientCodec for Box<C> {
    fn encode(&mut self, request: &Request, dst: &mut BytesMut) -> CodecResult<()> {
        (**self).encode(request, dst)
    }

    fn decode(&mut self, src: &mut BytesMut) -> CodecResult<Option<Response>> {
        (**self).decode(src)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Connected,
    Closed,
    Error,
}

impl ConnectionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Closed | Self::Error)
    }
}

/// What a completed correlation publishes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TapMode {
    /// `Operation` only; latency is derived downstream
    #[default]
    Operations,
    /// `Operation` followed by a bare `LatencyMeasurement`
    Latency,
}

/// A request waiting for its reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRequest {
    pub request: Request,
    pub sent_nanos: i64,
}

pub struct TracingCodec<C, P, K = MonotonicClock> {
    inner: C,
    publisher: P,
    clock: K,
    mode: TapMode,
    session_id: i64,
    capture_messages: bool,
    pending: VecDeque<PendingRequest>,
    detached: bool,
}

impl<C: ClientCodec, P: TracePublisher> TracingCodec<C, P> {
    pub fn new(inner: C, publisher: P, mode: TapMode) -> Self {
        Self::with_clock(inner, publisher, mode, MonotonicClock)
    }
}

impl<C: ClientCodec, P: TracePublisher, K: Clock> TracingCodec<C, P, K> {
    pub fn with_clock(inner: C, publisher: P, mode: TapMode, clock: K) -> Self {
        Self {
            inner,
            publisher,
            clock,
            mode,
            session_id: 0,
            capture_messages: false,
            pending: VecDeque::new(),
            detached: false,
        }
    }

    /// Also publish every request and reply as raw message events
    pub fn capture_messages(mut self, enabled: bool) -> Self {
        self.capture_messages = enabled;
        self
    }

    /// Session id stamped on published events; known once the handshake completes
    pub fn bind_session(&mut self, session_id: i64) {
        self.session_id = session_id;
    }

    pub fn session_id(&self) -> i64 {
        self.session_id
    }

    pub fn mode(&self) -> TapMode {
        self.mode
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_detached(&self) -> bool {
        self.detached
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    pub fn into_inner(self) -> C {
        self.inner
    }

    pub fn encode(&mut self, request: &Request, dst: &mut BytesMut) -> CodecResult<()> {
        let sent_nanos = self.clock.now_nanos();
        self.inner.encode(request, dst)?;

        if self.capture_messages {
            self.publisher.publish(TraceEvent::ProtocolRequest {
                session_id: self.session_id,
                request: request.clone(),
            });
        }
        if !self.detached && request.is_correlated() {
            self.pending.push_back(PendingRequest {
                request: request.clone(),
                sent_nanos,
            });
        }
        Ok(())
    }

    pub fn decode(&mut self, src: &mut BytesMut) -> CodecResult<Option<Response>> {
        let Some(response) = self.inner.decode(src)? else {
            return Ok(None);
        };
        let received_nanos = self.clock.now_nanos();

        if self.capture_messages {
            self.publisher.publish(TraceEvent::ProtocolResponse {
                session_id: self.session_id,
                response: response.clone(),
            });
        }
        if self.detached {
            return Ok(Some(response));
        }
        if response.is_correlated() {
            self.correlate(&response, received_nanos);
        }
        if response.is_session_close() {
            self.drain("session closed");
        }
        Ok(Some(response))
    }

    pub fn on_connection_state(&mut self, state: ConnectionState) {
        if self.detached {
            return;
        }
        tracing::debug!(session_id = self.session_id, ?state, "Connection state changed");
        if state.is_terminal() {
            self.drain("connection lost");
        }
    }

    fn correlate(&mut self, response: &Response, received_nanos: i64) {
        match self.pending.front() {
            Some(head) if head.request.xid == response.xid => {}
            head => {
                tracing::debug!(
                    session_id = self.session_id,
                    xid = response.xid,
                    expected = ?head.map(|p| p.request.xid),
                    "Reply not attributed"
                );
                return;
            }
        }
        let Some(pending) = self.pending.pop_front() else {
            return;
        };

        let event = TraceEvent::operation(
            self.session_id,
            pending.request,
            pending.sent_nanos,
            response.clone(),
            received_nanos,
        );
        let micros = event.latency_nanos().map(|nanos| nanos / 1_000);
        self.publisher.publish(event);

        if let (TapMode::Latency, Some(micros)) = (self.mode, micros) {
            self.publisher.publish(TraceEvent::latency(micros));
        }
    }

    fn drain(&mut self, reason: &'static str) {
        if !self.pending.is_empty() {
            tracing::debug!(
                session_id = self.session_id,
                pending = self.pending.len(),
                reason,
                "Publishing timeouts for unanswered requests"
            );
        }
        for pending in self.pending.drain(..) {
            self.publisher.publish(TraceEvent::timeout(
                self.session_id,
                pending.request,
                pending.sent_nanos,
            ));
            if self.mode == TapMode::Latency {
                self.publisher.publish(TraceEvent::latency(TIMEOUT_SENTINEL));
            }
        }
        self.detached = true;
    }
}

impl<C: ClientCodec, P: TracePublisher, K: Clock> ClientCodec for TracingCodec<C, P, K> {
    fn encode(&mut self, request: &Request, dst: &mut BytesMut) -> CodecResult<()> {
        TracingCodec::encode(self, request, dst)
    }

    fn decode(&mut self, src: &mut BytesMut) -> CodecResult<Option<Response>> {
        TracingCodec::decode(self, src)
    }
}
