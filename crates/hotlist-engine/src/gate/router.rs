use std::sync::Arc;

use chrono::{DateTime, Utc};
use hotlist_core::errors::SinkError;
use hotlist_core::event::decode;
use hotlist_core::traits::{HoldRequest, HoldSink};
use serde::Serialize;
use tracing::{debug, info};

use super::route_gate::HotlistGate;

/// Route chosen for an in-flight event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "route", rename_all = "lowercase")]
pub enum RouteDecision {
    Continue,
    Hold { request: HoldRequest },
}

impl RouteDecision {
    pub fn is_hold(&self) -> bool {
        matches!(self, RouteDecision::Hold { .. })
    }
}

/// Sink that drops hold requests (dry runs).
pub struct DiscardSink;

impl HoldSink for DiscardSink {
    fn submit(&self, _request: &HoldRequest) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Bus routing step: picks "hold" or "continue" from the gate decision and
/// hands holds to the pause/resume scheduler.
pub struct HoldRouter {
    gate: HotlistGate,
    sink: Arc<dyn HoldSink>,
    clock: fn() -> DateTime<Utc>,
}

impl HoldRouter {
    pub fn new(gate: HotlistGate, sink: Arc<dyn HoldSink>) -> Self {
        Self {
            gate,
            sink,
            clock: Utc::now,
        }
    }

    /// Replace the wall clock used for hold timestamps.
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    /// Route one message body received on `channel`.
    ///
    /// A sink failure is returned so the transport can redeliver; routing
    /// the same message again is safe.
    pub fn route(&self, raw: &[u8], channel: &str) -> Result<RouteDecision, SinkError> {
        let event = match decode(raw) {
            Ok(event) => event,
            Err(e) => {
                debug!(channel, error = %e, "undecodable event continues");
                return Ok(RouteDecision::Continue);
            }
        };

        let Some(rule) = self.gate.matches_event(&event, channel).into_rule() else {
            return Ok(RouteDecision::Continue);
        };

        let request = HoldRequest::from_rule(&event.record_id, &rule, (self.clock)());
        self.sink.submit(&request)?;
        info!(
            rid = %request.rid,
            channel,
            reason = %request.reason,
            pause_for = request.pause_for,
            resume = %request.default_resume_action,
            "record held"
        );
        Ok(RouteDecision::Hold { request })
    }
}
