//! Session wiring
//!
//! Ties a navigator, a series selection and a loader together. Range changes
//! and selection changes both turn into one loader request for the current
//! window; when several range events queue up only the last one is fetched.

use std::sync::Arc;

use crossbeam::channel::Receiver;

use super::address::SessionAddress;
use super::catalog::SensorCatalog;
use super::selection::Selection;
use crate::config::ViewConfig;
use crate::data::AlignedSeriesBuffer;
use crate::event::{EventBus, SubscriberId};
use crate::nav::{Clock, NavEvent, SystemClock, TimeNavigator, TimeRange};
use crate::source::{DataSource, LoadStatus, Loader, QueryRequest};

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    SelectionChanged(Selection),
}

pub struct Session<C: Clock = SystemClock> {
    config: ViewConfig,
    navigator: TimeNavigator<C>,
    nav_events: Receiver<NavEvent>,
    loader: Loader,
    selection: Selection,
    catalog: SensorCatalog,
    bus: EventBus<SessionEvent>,
}

impl<C: Clock> Session<C> {
    pub fn new(source: impl DataSource + 'static, clock: C, config: ViewConfig) -> Self {
        let mut navigator = TimeNavigator::with_config(clock, &config);
        let (_, nav_events) = navigator.subscribe();
        Self {
            config,
            navigator,
            nav_events,
            loader: Loader::new(source),
            selection: Selection::All,
            catalog: SensorCatalog::default(),
            bus: EventBus::new(),
        }
    }

    #[must_use]
    pub fn with_catalog(mut self, catalog: SensorCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn config(&self) -> &ViewConfig {
        &self.config
    }

    pub fn catalog(&self) -> &SensorCatalog {
        &self.catalog
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn navigator(&self) -> &TimeNavigator<C> {
        &self.navigator
    }

    /// Transitions made here are picked up by the next [`Session::pump`].
    pub fn navigator_mut(&mut self) -> &mut TimeNavigator<C> {
        &mut self.navigator
    }

    pub fn loader(&self) -> &Loader {
        &self.loader
    }

    pub fn loader_mut(&mut self) -> &mut Loader {
        &mut self.loader
    }

    pub fn current(&self) -> Arc<AlignedSeriesBuffer> {
        self.loader.current()
    }

    pub fn status(&self) -> &LoadStatus {
        self.loader.status()
    }

    pub fn subscribe(&mut self) -> (SubscriberId, Receiver<SessionEvent>) {
        self.bus.subscribe()
    }

    pub fn set_selection(&mut self, selection: Selection) {
        if selection == self.selection {
            return;
        }
        tracing::debug!(?selection, "selection changed");
        self.selection = selection;
        self.bus
            .publish(&SessionEvent::SelectionChanged(self.selection.clone()));
        let (start, end) = self.navigator.effective_range();
        self.load(start, end);
    }

    pub fn toggle_sensor(&mut self, id: &str) {
        let mut selection = self.selection.clone();
        selection.toggle(id, &self.catalog);
        self.set_selection(selection);
    }

    /// The request the current state maps to, or `None` when nothing is
    /// selected.
    pub fn query_for(&self, start: f64, end: f64) -> Option<QueryRequest> {
        let ids = self.selection.query_ids()?;
        Some(
            QueryRequest::new(self.config.display_width)
                .with_series(ids)
                .with_range(start, end),
        )
    }

    /// Requests the current window regardless of pending events.
    pub fn refresh(&mut self) {
        let (start, end) = self.navigator.effective_range();
        self.load(start, end);
    }

    /// Drives the live tick, turns queued range events into a request and
    /// applies finished loads. Returns the load status if it changed.
    pub fn pump(&mut self) -> Option<LoadStatus> {
        self.navigator.tick();
        if let Some(event) = self.nav_events.try_iter().last() {
            let (start, end) = event.bounds();
            self.load(start, end);
        }
        self.loader.poll()
    }

    pub fn address(&self) -> String {
        SessionAddress::new(self.selection.clone(), self.navigator.range())
            .encode(self.config.address_selection_limit)
    }

    /// Restores selection and range from a session address.
    pub fn apply_address(&mut self, query: &str) {
        let address = SessionAddress::decode(query);
        match address.range {
            TimeRange::Live => {
                self.navigator.reset_to_live();
            }
            TimeRange::Fixed { start, end } => {
                self.navigator.zoom_to(start, end);
            }
        }
        if address.selection != self.selection {
            self.selection = address.selection;
            self.bus
                .publish(&SessionEvent::SelectionChanged(self.selection.clone()));
        }
    }

    fn load(&mut self, start: f64, end: f64) {
        match self.query_for(start, end) {
            Some(request) => {
                self.loader.request(request);
            }
            None => {
                tracing::debug!("empty selection, clearing buffer");
                self.loader.replace(AlignedSeriesBuffer::empty());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{align, Sample, Series};
    use crate::nav::ManualClock;
    use crate::source::MemorySource;
    use std::time::Duration;

    const NOW: f64 = 10_000.0;

    fn session() -> (Session<ManualClock>, ManualClock) {
        let series: Vec<Series> = ["a", "b"]
            .iter()
            .map(|id| {
                Series::with_samples(
                    *id,
                    (0..=100).map(|i| Sample::new(NOW - 100.0 + i as f64, 1.0)).collect(),
                )
            })
            .collect();
        let clock = ManualClock::new(NOW);
        let config = ViewConfig {
            default_span_secs: 50.0,
            ..ViewConfig::default()
        };
        let session = Session::new(MemorySource::new(align(&series)), clock.clone(), config);
        (session, clock)
    }

    fn settle(session: &mut Session<ManualClock>) {
        session.pump();
        session.loader_mut().wait(Duration::from_secs(5));
    }

    #[test]
    fn live_window_loads_all_series() {
        let (mut s, _) = session();
        settle(&mut s);
        let buf = s.current();
        assert_eq!(buf.series_count(), 2);
        assert_eq!(buf.time_span(), Some((NOW - 50.0, NOW)));
    }

    #[test]
    fn last_range_event_wins() {
        let (mut s, _) = session();
        s.navigator_mut().zoom_to(NOW - 100.0, NOW - 90.0);
        s.navigator_mut().zoom_to(NOW - 10.0, NOW);
        settle(&mut s);
        assert_eq!(s.current().time_span(), Some((NOW - 10.0, NOW)));
    }

    #[test]
    fn selection_changes_notify_and_reload() {
        let (mut s, _) = session();
        let (_, rx) = s.subscribe();
        s.set_selection(Selection::ids(["b"]));
        assert_eq!(
            rx.try_recv(),
            Ok(SessionEvent::SelectionChanged(Selection::ids(["b"])))
        );
        s.loader_mut().wait(Duration::from_secs(5));
        assert_eq!(s.current().series_ids().collect::<Vec<_>>(), vec!["b"]);

        s.set_selection(Selection::None);
        assert!(s.current().is_empty());
        assert_eq!(s.current().series_count(), 0);
    }

    #[test]
    fn address_round_trip() {
        let (mut s, _) = session();
        s.set_selection(Selection::ids(["a"]));
        s.navigator_mut().zoom_to(NOW - 20.0, NOW - 10.0);
        let address = s.address();
        assert_eq!(address, "sensors=a&start=9980&end=9990");

        let (mut other, _) = session();
        other.apply_address(&address);
        assert_eq!(other.selection(), &Selection::ids(["a"]));
        assert_eq!(other.navigator().effective_range(), (NOW - 20.0, NOW - 10.0));
        settle(&mut other);
        assert_eq!(other.current().len(), 11);
    }
}
