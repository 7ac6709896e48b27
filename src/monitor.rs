/// Air-quality monitor for one screen.
///
/// Owns the screen state and the reading history and reacts to four kinds of
/// input: the initial location fix, address edits (debounced), address
/// submits (immediate) and the periodic re-check. Every air-quality fetch
/// runs on its own task and reports back over a channel; outcomes are applied
/// in arrival order, so the last fetch to finish wins even if it was issued
/// first. Only the monitor loop touches the history, so nothing is locked.

use crate::alert::dispatch::{NotificationDispatcher, Notifier};
use crate::alert::thresholds::{self, TimeOfDay};
use crate::analysis::history::ReadingHistory;
use crate::analysis::sampling::{ReadingDisplay, Sampler};
use crate::debounce::{Debouncer, Settled};
use crate::ingest::geocode::Geocoder;
use crate::ingest::open_meteo::AirQualitySource;
use crate::location::LocationProvider;
use crate::logging::{self, DataSource};
use crate::model::{AirQualityError, Coordinate, GeocodeError, HourlySeries, LocationError, AQI_LABEL};
use chrono::{Local, Timelike, Utc};
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::{interval_at, Instant, MissedTickBehavior};

pub const DETECTING_LOCATION: &str = "Detecting location...";

/// Edits this short are not geocoded.
const MIN_GEOCODE_LENGTH: usize = 3;

// ---------------------------------------------------------------------------
// Events and state
// ---------------------------------------------------------------------------

/// Input from the user-facing side.
#[derive(Debug, Clone, PartialEq)]
pub enum MonitorEvent {
    /// The address field changed (one keystroke or paste).
    AddressEdited(String),
    /// The user confirmed the address field.
    AddressSubmitted(String),
    /// Fetch again for the current coordinate now.
    Recheck,
    Shutdown,
}

/// Completion report of one spawned fetch.
#[derive(Debug)]
pub struct FetchOutcome {
    pub request_id: u64,
    pub coordinate: Coordinate,
    pub result: Result<HourlySeries, AirQualityError>,
}

/// Everything the screen shows.
#[derive(Debug, Clone, PartialEq)]
pub struct ScreenState {
    pub address: String,
    pub coordinate: Option<Coordinate>,
    pub error_message: Option<String>,
    pub reading: ReadingDisplay,
}

impl Default for ScreenState {
    fn default() -> Self {
        ScreenState {
            address: DETECTING_LOCATION.to_string(),
            coordinate: None,
            error_message: None,
            reading: ReadingDisplay::Loading,
        }
    }
}

impl ScreenState {
    /// Plain-text rendering of the screen.
    pub fn render(&self) -> Vec<String> {
        let mut lines = Vec::new();
        match &self.reading {
            ReadingDisplay::Available(r) => {
                lines.push(format!("Current Air Quality: {} ({}) [{}]", r.index, r.tier, r.color));
                lines.push(format!("  {}", AQI_LABEL));
                lines.push(format!("  Measured at {}", r.observed_at.with_timezone(&Local).format("%Y-%m-%d %H:%M")));
                lines.push(format!("Health Recommendations: {}", r.recommendation));
            }
            ReadingDisplay::Loading => {
                lines.push("Current Air Quality: Loading...".to_string());
                lines.push(format!("Health Recommendations: {}", thresholds::NO_DATA_RECOMMENDATION));
            }
            ReadingDisplay::Unavailable => {
                lines.push("Current Air Quality: unavailable".to_string());
                lines.push(format!("Health Recommendations: {}", thresholds::NO_DATA_RECOMMENDATION));
            }
        }
        lines.push(format!("Your Location: {}", self.address));
        if let Some(c) = self.coordinate {
            lines.push(format!("  Lat: {:.4}, Long: {:.4}", c.latitude, c.longitude));
        }
        if let Some(err) = &self.error_message {
            lines.push(format!("  {}", err));
        }
        lines
    }
}

// ---------------------------------------------------------------------------
// Monitor
// ---------------------------------------------------------------------------

pub struct AirQualityMonitor<S, G, L, N> {
    source: S,
    geocoder: G,
    location: L,
    dispatcher: NotificationDispatcher<N>,
    sampler: Sampler,
    recheck_interval: Duration,

    screen: ScreenState,
    history: Option<ReadingHistory>,

    debouncer: Debouncer,
    settled_tx: UnboundedSender<Settled<String>>,
    settled_rx: UnboundedReceiver<Settled<String>>,
    outcome_tx: UnboundedSender<FetchOutcome>,
    outcome_rx: UnboundedReceiver<FetchOutcome>,
    next_request_id: u64,
    in_flight: usize,
    notifications_sent: usize,
}

impl<S, G, L, N> AirQualityMonitor<S, G, L, N>
where
    S: AirQualitySource,
    G: Geocoder,
    L: LocationProvider,
    N: Notifier,
{
    pub fn new(
        source: S,
        geocoder: G,
        location: L,
        dispatcher: NotificationDispatcher<N>,
        sampler: Sampler,
        debounce: Duration,
        recheck_interval: Duration,
    ) -> Self {
        let (settled_tx, settled_rx) = mpsc::unbounded_channel();
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
        AirQualityMonitor {
            source,
            geocoder,
            location,
            dispatcher,
            sampler,
            recheck_interval,
            screen: ScreenState::default(),
            history: None,
            debouncer: Debouncer::new(debounce),
            settled_tx,
            settled_rx,
            outcome_tx,
            outcome_rx,
            next_request_id: 0,
            in_flight: 0,
            notifications_sent: 0,
        }
    }

    pub fn screen(&self) -> &ScreenState {
        &self.screen
    }

    pub fn history(&self) -> Option<&ReadingHistory> {
        self.history.as_ref()
    }

    pub fn dispatcher(&self) -> &NotificationDispatcher<N> {
        &self.dispatcher
    }

    pub fn notifications_sent(&self) -> usize {
        self.notifications_sent
    }

    /// True while a geocode-triggered or scheduled fetch has not reported.
    pub fn is_loading(&self) -> bool {
        self.in_flight > 0
    }

    pub fn has_pending_edit(&self) -> bool {
        self.debouncer.is_pending()
    }

    // --- Triggers -------------------------------------------------------------

    /// Initial location fix: resolve the device position, label it, fetch.
    pub async fn start(&mut self) {
        let coordinate = match self.location.current_coordinate().await {
            Ok(c) => c,
            Err(LocationError::PermissionDenied) => {
                logging::warn(DataSource::Location, None, "Location permission denied");
                self.screen.error_message = Some(LocationError::PermissionDenied.to_string());
                self.screen.address = "Location access denied".to_string();
                return;
            }
            Err(LocationError::PositionUnavailable) => {
                logging::warn(DataSource::Location, None, "Current position unavailable");
                self.screen.error_message = Some("Error getting location".to_string());
                self.screen.address = "Location unavailable".to_string();
                return;
            }
        };

        self.screen.coordinate = Some(coordinate);
        let context = coordinate.to_string();
        match self.geocoder.reverse_geocode(coordinate).await {
            Ok(address) => self.screen.address = address,
            Err(e) => logging::log_geocode_failure(&context, "reverse geocode", &e),
        }
        self.request_fetch(coordinate);
    }

    /// Keystroke in the address field. Restarts the quiet period; short
    /// text only cancels the pending lookup.
    pub fn edit_address(&mut self, text: &str) {
        self.screen.address = text.to_string();
        self.debouncer.cancel();
        if text.chars().count() >= MIN_GEOCODE_LENGTH {
            self.debouncer.schedule(text.to_string(), self.settled_tx.clone());
        }
    }

    /// Geocodes an address right away and fetches for the result.
    pub async fn submit_address(&mut self, text: &str) {
        self.debouncer.cancel();
        self.update_location(text).await;
    }

    /// Fetches again for the current coordinate, if there is one.
    pub fn recheck(&mut self) {
        if let Some(coordinate) = self.screen.coordinate {
            self.request_fetch(coordinate);
        }
    }

    async fn update_location(&mut self, text: &str) {
        if text.trim().is_empty() {
            return;
        }
        self.screen.address = text.to_string();

        match self.geocoder.geocode(text).await {
            Ok(coordinate) => {
                self.screen.coordinate = Some(coordinate);
                self.screen.error_message = None;
                self.request_fetch(coordinate);
            }
            Err(e) => {
                logging::log_geocode_failure(text, "geocode", &e);
                self.screen.error_message = Some(match e {
                    GeocodeError::NotFound(_) => "Location not found".to_string(),
                    _ => "Error finding location".to_string(),
                });
            }
        }
    }

    fn request_fetch(&mut self, coordinate: Coordinate) {
        let request_id = self.next_request_id;
        self.next_request_id += 1;
        self.in_flight += 1;

        logging::debug(
            DataSource::AirQuality,
            Some(&coordinate.to_string()),
            &format!("fetch #{} requested", request_id),
        );

        let source = self.source.clone();
        let outcome_tx = self.outcome_tx.clone();
        tokio::spawn(async move {
            let result = source.fetch_series(coordinate).await;
            let _ = outcome_tx.send(FetchOutcome {
                request_id,
                coordinate,
                result,
            });
        });
    }

    // --- Outcomes --------------------------------------------------------------

    /// Runs one fetch outcome through the sampler and dispatches any
    /// resulting notification.
    pub async fn apply_outcome(&mut self, outcome: FetchOutcome) {
        self.in_flight = self.in_flight.saturating_sub(1);
        let context = outcome.coordinate.to_string();
        if let Err(e) = &outcome.result {
            logging::log_fetch_failure(&context, "air-quality fetch", e);
        }

        let now = Utc::now();
        let time_of_day = TimeOfDay::from_hour(Local::now().hour());
        let step = self.sampler.apply(self.history.take(), outcome.result, now, time_of_day);

        self.history = step.history;
        match &step.display {
            ReadingDisplay::Available(r) => logging::info(
                DataSource::AirQuality,
                Some(&context),
                &format!("AQI {} ({}) from fetch #{}", r.index, r.tier, outcome.request_id),
            ),
            ReadingDisplay::Unavailable => logging::warn(
                DataSource::AirQuality,
                Some(&context),
                &format!("no reading available from fetch #{}", outcome.request_id),
            ),
            ReadingDisplay::Loading => {}
        }
        self.screen.reading = step.display;

        if step.decision.should_notify() && self.dispatcher.dispatch(&step.decision).await {
            self.notifications_sent += 1;
        }
    }

    /// Waits for every outstanding fetch and applies it.
    pub async fn settle(&mut self) {
        while self.in_flight > 0 {
            match self.outcome_rx.recv().await {
                Some(outcome) => self.apply_outcome(outcome).await,
                None => break,
            }
        }
    }

    async fn handle_event(&mut self, event: MonitorEvent) {
        match event {
            MonitorEvent::AddressEdited(text) => self.edit_address(&text),
            MonitorEvent::AddressSubmitted(text) => self.submit_address(&text).await,
            MonitorEvent::Recheck => self.recheck(),
            MonitorEvent::Shutdown => {}
        }
    }

    /// Main loop: initial fix, then events, settled edits, fetch outcomes and
    /// the periodic re-check until `Shutdown` or the event channel closes.
    pub async fn run(&mut self, mut events: UnboundedReceiver<MonitorEvent>) {
        self.start().await;

        let mut ticker = interval_at(Instant::now() + self.recheck_interval, self.recheck_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    None | Some(MonitorEvent::Shutdown) => break,
                    Some(event) => self.handle_event(event).await,
                },
                Some(settled) = self.settled_rx.recv() => {
                    if let Some(text) = self.debouncer.accept(settled) {
                        self.update_location(&text).await;
                    }
                }
                Some(outcome) = self.outcome_rx.recv() => self.apply_outcome(outcome).await,
                _ = ticker.tick() => {
                    logging::debug(DataSource::System, None, "periodic re-check");
                    self.recheck();
                }
            }
        }

        self.debouncer.cancel();
    }
}
