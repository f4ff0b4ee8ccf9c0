//! Time navigation state machine
//!
//! Holds the authoritative time range of a session. Two states: `Live`
//! (a trailing window re-evaluated on every tick) and `Fixed`. Every accepted
//! transition publishes `NavEvent::RangeChanged` to subscribers and returns
//! the same event to the caller. Rejected input is a silent no-op.

use crossbeam::channel::Receiver;

use super::clock::{Clock, SystemClock};
use super::range::{Preset, TimeRange};
use crate::config::ViewConfig;
use crate::event::{EventBus, SubscriberId};

pub const DEFAULT_SPAN_SECS: f64 = 3600.0;
/// Live ticks never fire more often than this.
pub const MIN_LIVE_TICK_SECS: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NavEvent {
    RangeChanged { start: f64, end: f64 },
}

impl NavEvent {
    pub fn bounds(&self) -> (f64, f64) {
        match *self {
            NavEvent::RangeChanged { start, end } => (start, end),
        }
    }
}

#[derive(Debug)]
pub struct TimeNavigator<C: Clock = SystemClock> {
    clock: C,
    range: TimeRange,
    default_span: f64,
    live_tick: f64,
    last_emit: Option<f64>,
    bus: EventBus<NavEvent>,
}

impl TimeNavigator<SystemClock> {
    pub fn system() -> Self {
        Self::new(SystemClock)
    }
}

impl<C: Clock> TimeNavigator<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            range: TimeRange::Live,
            default_span: DEFAULT_SPAN_SECS,
            live_tick: MIN_LIVE_TICK_SECS,
            last_emit: None,
            bus: EventBus::new(),
        }
    }

    pub fn with_config(clock: C, config: &ViewConfig) -> Self {
        Self::new(clock)
            .with_default_span(config.default_span_secs)
            .with_live_tick(config.live_tick_secs)
    }

    /// Length of the live window. Non-positive or non-finite spans are ignored.
    #[must_use]
    pub fn with_default_span(mut self, secs: f64) -> Self {
        if secs.is_finite() && secs > 0.0 {
            self.default_span = secs;
        }
        self
    }

    #[must_use]
    pub fn with_live_tick(mut self, secs: f64) -> Self {
        self.live_tick = if secs.is_finite() {
            secs.max(MIN_LIVE_TICK_SECS)
        } else {
            MIN_LIVE_TICK_SECS
        };
        self
    }

    pub fn subscribe(&mut self) -> (SubscriberId, Receiver<NavEvent>) {
        self.bus.subscribe()
    }

    pub fn unsubscribe(&mut self, id: SubscriberId) {
        self.bus.unsubscribe(id);
    }

    pub fn range(&self) -> TimeRange {
        self.range
    }

    pub fn is_live(&self) -> bool {
        self.range.is_live()
    }

    pub fn default_span(&self) -> f64 {
        self.default_span
    }

    pub fn live_tick(&self) -> f64 {
        self.live_tick
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Concrete `[start, end]` at this instant.
    pub fn effective_range(&self) -> (f64, f64) {
        self.range.resolve(self.clock.now(), self.default_span)
    }

    pub fn set_preset(&mut self, preset: Preset) -> NavEvent {
        match preset.span() {
            None => self.reset_to_live(),
            Some(span) => {
                let now = self.clock.now();
                self.transition(TimeRange::Fixed {
                    start: now - span,
                    end: now,
                })
            }
        }
    }

    /// Fixes the window to `[min, max]`. Ignored unless both are finite and
    /// `max > min`.
    pub fn zoom_to(&mut self, min: f64, max: f64) -> Option<NavEvent> {
        match TimeRange::fixed(min, max) {
            Ok(range) => Some(self.transition(range)),
            Err(err) => {
                tracing::trace!(%err, "zoom ignored");
                None
            }
        }
    }

    /// Shifts the effective window by `delta` seconds. A live window is first
    /// pinned at the current time, so panning always leaves `Live`.
    pub fn pan_by(&mut self, delta: f64) -> Option<NavEvent> {
        if !delta.is_finite() {
            tracing::trace!(delta, "pan ignored");
            return None;
        }
        let (start, end) = self.effective_range();
        match TimeRange::fixed(start + delta, end + delta) {
            Ok(range) => Some(self.transition(range)),
            Err(err) => {
                tracing::trace!(%err, "pan ignored");
                None
            }
        }
    }

    pub fn reset_to_live(&mut self) -> NavEvent {
        self.transition(TimeRange::Live)
    }

    /// Re-emits the moving live window when at least one tick interval has
    /// passed since the last emission. Does nothing in `Fixed`.
    pub fn tick(&mut self) -> Option<NavEvent> {
        if !self.range.is_live() {
            return None;
        }
        let now = self.clock.now();
        if let Some(last) = self.last_emit {
            if now - last < self.live_tick {
                return None;
            }
        }
        Some(self.emit(now))
    }

    fn transition(&mut self, range: TimeRange) -> NavEvent {
        tracing::debug!(from = ?self.range, to = ?range, "time range transition");
        self.range = range;
        self.emit(self.clock.now())
    }

    fn emit(&mut self, now: f64) -> NavEvent {
        let (start, end) = self.range.resolve(now, self.default_span);
        let event = NavEvent::RangeChanged { start, end };
        self.last_emit = Some(now);
        self.bus.publish(&event);
        event
    }
}
