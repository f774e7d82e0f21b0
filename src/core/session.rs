//! One page lifetime: the dwell tracker and preference reporter behind a
//! single event handler.

use super::clock::{Clock, SystemClock};
use super::dwell::{DwellTracker, FlushOutcome, TrackerState};
use super::preference::{PreferenceReporter, PreferenceSink, ReportOutcome};
use crate::api::{ApiConfig, ApiError, PreferenceClient};
use crate::config::Config;
use crate::delivery::{select_delivery, Capabilities, Delivery, DeliveryError, DeliverySettings};
use crate::feedback::FeedbackSurface;
use crate::page::{PageContext, PageEvent};
use crate::transparency::SharedSignalLog;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;

/// What dispatching one event did.
#[derive(Debug)]
pub enum Dispatched {
    /// Hidden or unload flushed the dwell session
    Flushed(FlushOutcome),
    /// The page became visible again
    Rearmed,
    /// Visible while dwell tracking is off; nothing changed
    Ignored,
    /// A preference report is in flight
    Reporting,
}

/// State owned by a page from load to teardown.
///
/// Built once at page init; every host event goes through [`dispatch`],
/// which never waits on the network.
///
/// [`dispatch`]: PageSession::dispatch
pub struct PageSession<S> {
    tracker: DwellTracker,
    reporter: Arc<PreferenceReporter<S>>,
    in_flight: Vec<JoinHandle<ReportOutcome>>,
}

impl<S: PreferenceSink> PageSession<S> {
    pub fn new(tracker: DwellTracker, reporter: PreferenceReporter<S>) -> Self {
        Self {
            tracker,
            reporter: Arc::new(reporter),
            in_flight: Vec::new(),
        }
    }

    /// Page load: arm dwell tracking if the page has a tracked job.
    pub fn start(&mut self) -> bool {
        self.tracker.start()
    }

    pub fn tracker(&self) -> &DwellTracker {
        &self.tracker
    }

    /// Handle one page event. Must be called inside a tokio runtime.
    ///
    /// Preference reports run as independent tasks, so several clicks may be
    /// in flight at once and complete in any order.
    pub fn dispatch(&mut self, event: PageEvent) -> Dispatched {
        match event {
            PageEvent::Visibility { state } => match self.tracker.on_visibility(state) {
                Some(outcome) => Dispatched::Flushed(outcome),
                None if matches!(self.tracker.state(), TrackerState::Armed(_)) => {
                    Dispatched::Rearmed
                }
                None => Dispatched::Ignored,
            },
            PageEvent::Unload => Dispatched::Flushed(self.tracker.on_unload()),
            PageEvent::Control(control) => {
                let reporter = Arc::clone(&self.reporter);
                self.in_flight.retain(|task| !task.is_finished());
                self.in_flight
                    .push(tokio::spawn(async move { reporter.report(control).await }));
                Dispatched::Reporting
            }
        }
    }

    /// Wait for every preference report dispatched so far.
    pub async fn settle(&mut self) -> Vec<ReportOutcome> {
        let mut outcomes = Vec::with_capacity(self.in_flight.len());
        for handle in self.in_flight.drain(..) {
            match handle.await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => tracing::error!("Preference report task failed: {e}"),
            }
        }
        outcomes
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}

/// Wires a [`PageSession`] to the real backend for one page.
pub struct SessionBuilder {
    context: PageContext,
    config: Config,
    capabilities: Capabilities,
    clock: Arc<dyn Clock>,
    signal_log: Option<SharedSignalLog>,
}

impl SessionBuilder {
    pub fn new(context: PageContext, config: Config) -> Self {
        let capabilities = Capabilities::new(config.prefer_beacon);
        Self {
            context,
            config,
            capabilities,
            clock: Arc::new(SystemClock),
            signal_log: None,
        }
    }

    pub fn capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn signal_log(mut self, log: SharedSignalLog) -> Self {
        self.signal_log = Some(log);
        self
    }

    /// Build the session and return the chosen delivery so the host can
    /// shut it down at exit.
    pub fn build(
        self,
        surface: Arc<dyn FeedbackSurface>,
        runtime: tokio::runtime::Handle,
    ) -> Result<(PageSession<PreferenceClient>, Arc<dyn Delivery>), SessionError> {
        let api = ApiConfig::for_page(&self.context);
        let csrf_token = self.context.csrf_token();

        let settings = DeliverySettings {
            endpoint: api.track_view_url(),
            csrf_token: csrf_token.clone(),
            timeout: self.config.request_timeout,
            beacon_queue_capacity: self.config.beacon_queue_capacity,
        };
        let delivery = select_delivery(self.capabilities, &settings, runtime)?;
        tracing::debug!("View delivery via {}", delivery.strategy());

        let client = PreferenceClient::new(&api, csrf_token, self.config.request_timeout)?;
        let context = self.context.with_default_source(self.config.default_source.clone());

        let mut tracker = DwellTracker::new(Arc::new(context), self.clock, Arc::clone(&delivery));
        let mut reporter = PreferenceReporter::new(client, surface, self.config.feedback);
        if let Some(log) = self.signal_log {
            tracker = tracker.with_signal_log(log.clone());
            reporter = reporter.with_signal_log(log);
        }

        Ok((PageSession::new(tracker, reporter), delivery))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FeedbackTimings;
    use crate::core::dwell::tests::RecordingDelivery;
    use crate::core::preference::tests::ScriptedSink;
    use crate::core::ManualClock;
    use crate::feedback::tests::RecordingSurface;
    use crate::page::{ControlAction, PageContext, PreferenceControl, TrackedItem};

    fn session(
        item: Option<&str>,
    ) -> (
        PageSession<ScriptedSink>,
        Arc<ManualClock>,
        Arc<RecordingDelivery>,
        Arc<RecordingSurface>,
    ) {
        let context =
            PageContext::new("http://jobs.test/jobs/42/", "", TrackedItem::from_attribute(item))
                .unwrap();
        let clock = Arc::new(ManualClock::default());
        let delivery = Arc::new(RecordingDelivery::default());
        let surface = Arc::new(RecordingSurface::default());

        let tracker = DwellTracker::new(Arc::new(context), clock.clone(), delivery.clone());
        let reporter = PreferenceReporter::new(
            ScriptedSink::answering(true),
            surface.clone(),
            FeedbackTimings::default(),
        );
        (PageSession::new(tracker, reporter), clock, delivery, surface)
    }

    #[tokio::test]
    async fn test_dispatch_routes_page_events() {
        let (mut session, clock, delivery, _surface) = session(Some("42"));
        assert!(session.start());

        clock.advance_ms(12_000);
        assert!(matches!(
            session.dispatch(PageEvent::hidden()),
            Dispatched::Flushed(FlushOutcome::Sent { .. })
        ));
        assert!(matches!(
            session.dispatch(PageEvent::visible()),
            Dispatched::Rearmed
        ));
        clock.advance_ms(1_000);
        assert!(matches!(
            session.dispatch(PageEvent::Unload),
            Dispatched::Flushed(FlushOutcome::Discarded { dwell_seconds: 1 })
        ));

        assert_eq!(delivery.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_preferences_work_without_tracked_item() {
        let (mut session, _clock, delivery, surface) = session(None);
        assert!(!session.start());

        session.dispatch(PageEvent::Control(PreferenceControl::new(
            ControlAction::Save,
            "5",
        )));
        session.dispatch(PageEvent::Control(PreferenceControl::new(
            ControlAction::Ignore,
            "6",
        )));
        session.dispatch(PageEvent::Unload);

        let outcomes = session.settle().await;
        assert_eq!(outcomes, vec![ReportOutcome::Confirmed; 2]);
        assert_eq!(surface.toasts_shown().len(), 2);
        assert!(delivery.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_visible_without_tracked_item_is_ignored() {
        let (mut session, _clock, _delivery, _surface) = session(None);
        assert!(matches!(
            session.dispatch(PageEvent::visible()),
            Dispatched::Ignored
        ));

        assert!(!session.start());
        assert!(matches!(
            session.dispatch(PageEvent::visible()),
            Dispatched::Ignored
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_finished_reports_are_released() {
        let (mut session, _clock, _delivery, surface) = session(Some("42"));
        session.start();

        for n in 0..50 {
            session.dispatch(PageEvent::Control(PreferenceControl::new(
                ControlAction::Save,
                n.to_string(),
            )));
            assert!(session.in_flight.len() <= 1);
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }

        assert_eq!(session.settle().await.len(), 1);
        assert_eq!(surface.toasts_shown().len(), 50);
    }
}
