//! Ties tab events, the course registry and the session together.

use crate::indicator::{Indicator, IndicatorState, LogIndicator};
use crate::registry::CourseRegistry;
use crate::reporter::StatusSink;
use crate::session::{Clock, SessionStore, SystemClock, Transition, TransitionKind};
use crate::source::{TabEvent, TabSource};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, mpsc};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(6);
const DEFAULT_WAKE_GAP_FACTOR: u32 = 3;

pub struct TabObserver {
    registry: Arc<CourseRegistry>,
    session: Arc<SessionStore>,
    source: Arc<dyn TabSource>,
    sink: Arc<dyn StatusSink>,
    indicator: Arc<dyn Indicator>,
    clock: Arc<dyn Clock>,
    tick_interval: Duration,
    wake_gap_factor: u32,
    refreshed: Arc<Notify>,
}

impl TabObserver {
    pub fn new(
        registry: Arc<CourseRegistry>,
        session: Arc<SessionStore>,
        source: Arc<dyn TabSource>,
        sink: Arc<dyn StatusSink>,
    ) -> Self {
        Self {
            registry,
            session,
            source,
            sink,
            indicator: Arc::new(LogIndicator::new()),
            clock: Arc::new(SystemClock),
            tick_interval: DEFAULT_TICK_INTERVAL,
            wake_gap_factor: DEFAULT_WAKE_GAP_FACTOR,
            refreshed: Arc::new(Notify::new()),
        }
    }

    pub fn with_indicator(mut self, indicator: Arc<dyn Indicator>) -> Self {
        self.indicator = indicator;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// A tick arriving more than `factor` intervals after the previous one is
    /// treated as a wake from sleep. 0 disables the check.
    pub fn with_wake_gap_factor(mut self, factor: u32) -> Self {
        self.wake_gap_factor = factor;
        self
    }

    /// Test the active tab against the registry and feed the session.
    ///
    /// Safe to call concurrently: the only await is the tab query, which
    /// happens before the session is read.
    pub async fn observe(&self) -> Option<Transition> {
        let tab = match self.source.active_tab().await {
            Ok(tab) => tab,
            Err(e) => {
                warn!("Failed to query active tab: {}", e);
                return None;
            }
        };

        let url = tab
            .as_ref()
            .and_then(|tab| tab.usable_url())
            .map(str::to_string);
        let matched = url
            .as_deref()
            .and_then(|url| self.registry.match_first(url));

        let now = self.clock.now();
        let transition = self
            .session
            .observe(matched.as_ref(), url.as_deref().unwrap_or(""), now);

        match &transition.kind {
            TransitionKind::Started => {
                info!("Started studying {}", transition.state.current_course_id().unwrap_or("?"))
            }
            TransitionKind::Switched { from } => info!(
                "Switched course {} -> {}",
                from,
                transition.state.current_course_id().unwrap_or("?")
            ),
            TransitionKind::Stopped => info!("Stopped studying"),
            TransitionKind::Heartbeat | TransitionKind::Debounced | TransitionKind::Unchanged => {
                debug!("Observation: {:?}", transition.kind)
            }
        }

        if let Some(event) = &transition.report {
            self.sink.report(event.clone());
        }
        self.indicator
            .update(&IndicatorState::from_match(matched.as_ref()));

        Some(transition)
    }

    pub async fn handle_event(&self, event: TabEvent) {
        match event {
            TabEvent::Activated | TabEvent::NavigationCompleted { active: true } => {
                self.observe().await;
            }
            TabEvent::NavigationCompleted { active: false } => {
                debug!("Ignoring navigation in a background tab");
            }
            TabEvent::Resumed => {
                self.observe().await;
                self.spawn_refresh();
            }
        }
    }

    /// Refresh the registry off the observation path. `run` observes again
    /// once the new list is in.
    fn spawn_refresh(&self) {
        let registry = self.registry.clone();
        let refreshed = self.refreshed.clone();
        tokio::spawn(async move {
            registry.refresh().await;
            refreshed.notify_one();
        });
    }

    fn is_wake_gap(&self, gap_secs: u64) -> bool {
        if self.wake_gap_factor == 0 {
            return false;
        }
        let threshold = self.tick_interval.as_secs_f64() * f64::from(self.wake_gap_factor);
        gap_secs as f64 > threshold
    }

    /// Observe on every tick and every event until the event channel closes.
    pub async fn run(&self, mut events: mpsc::Receiver<TabEvent>) {
        let mut ticker = tokio::time::interval(self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_tick_at = self.clock.now();

        info!(
            "Observer running (tick every {:?})",
            self.tick_interval
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let now = self.clock.now();
                    let gap = now.saturating_sub(last_tick_at);
                    last_tick_at = now;
                    if self.is_wake_gap(gap) {
                        info!("Resumed after {}s, refreshing courses", gap);
                        self.handle_event(TabEvent::Resumed).await;
                    } else {
                        self.observe().await;
                    }
                }
                _ = self.refreshed.notified() => {
                    debug!("Course list refreshed, observing again");
                    self.observe().await;
                }
                event = events.recv() => match event {
                    Some(event) => self.handle_event(event).await,
                    None => {
                        info!("Tab event channel closed, observer stopping");
                        break;
                    }
                },
            }
        }
    }
}
