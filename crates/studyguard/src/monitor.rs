use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;
use studyguard_engine::cache::CourseCache;
use studyguard_engine::collector::CollectorClient;
use studyguard_engine::config::StudyGuardConfig;
use studyguard_engine::control::Controller;
use studyguard_engine::indicator::Indicator;
use studyguard_engine::observer::TabObserver;
use studyguard_engine::registry::CourseRegistry;
use studyguard_engine::reporter::HttpReporter;
use studyguard_engine::session::{Clock, SessionStore, SystemClock};
use studyguard_engine::source::{TabEvent, TabSource};
use studyguard_h::cdp::CdpClient;
use studyguard_h::source::{CdpTabSource, spawn_watcher};
use studyguard_r::bridge::{self, BadgeIndicator, TabTracker};
use studyguard_r::server::BridgeServer;
use tokio::sync::{Mutex, mpsc};
use tracing::{info, warn};

pub struct Monitor {
    config: StudyGuardConfig,
    client: CollectorClient,
    registry: Arc<CourseRegistry>,
    session: Arc<SessionStore>,
}

impl Monitor {
    pub fn new(config: StudyGuardConfig) -> anyhow::Result<Self> {
        let client = CollectorClient::from_config(&config.collector)
            .with_context(|| format!("Invalid collector URL {}", config.collector.base_url))?;
        let registry = Arc::new(CourseRegistry::new(
            Arc::new(client.clone()),
            CourseCache::new(config.cache.path.clone()),
        ));
        let session = Arc::new(SessionStore::new(config.monitor.heartbeat_secs));
        Ok(Self {
            config,
            client,
            registry,
            session,
        })
    }

    pub async fn run_headless(self) -> anyhow::Result<()> {
        self.load_courses().await;

        let headless = &self.config.headless;
        let client = match &headless.debug_url {
            Some(url) => CdpClient::connect(url).await,
            None => CdpClient::launch(headless.visible).await,
        }
        .context("Failed to start browser session")?;
        let client = Arc::new(Mutex::new(client));

        let source: Arc<dyn TabSource> = Arc::new(CdpTabSource::new(client.clone()));
        let (event_tx, event_rx) = mpsc::channel(32);
        let watcher = spawn_watcher(
            source.clone(),
            Duration::from_millis(headless.poll_interval_ms.max(1)),
            event_tx,
        );

        self.drive(self.observer(source), event_rx).await;

        watcher.abort();
        let _ = watcher.await;
        self.shutdown().await;

        match Arc::try_unwrap(client) {
            Ok(client) => client.into_inner().close().await?,
            Err(_) => warn!("Browser session still in use, skipping close"),
        }
        Ok(())
    }

    pub async fn run_remote(self) -> anyhow::Result<()> {
        self.load_courses().await;

        let handle = BridgeServer::new(self.config.remote.port)
            .start()
            .await
            .context("Failed to start bridge server")?;

        let tracker = Arc::new(TabTracker::new());
        let (event_tx, event_rx) = mpsc::channel(32);
        tokio::spawn(bridge::dispatch(
            handle.inbound_rx,
            tracker.clone(),
            event_tx,
            Controller::new(self.registry.clone(), self.session.clone()),
            handle.outbound_tx.clone(),
        ));

        let indicator: Arc<dyn Indicator> = Arc::new(BadgeIndicator::new(handle.outbound_tx));
        self.drive(self.observer(tracker).with_indicator(indicator), event_rx)
            .await;
        self.shutdown().await;
        Ok(())
    }

    async fn load_courses(&self) {
        let courses = self.registry.refresh().await;
        info!("Monitoring {} courses", courses.len());
    }

    fn observer(&self, source: Arc<dyn TabSource>) -> TabObserver {
        let monitor = &self.config.monitor;
        TabObserver::new(
            self.registry.clone(),
            self.session.clone(),
            source,
            Arc::new(HttpReporter::new(self.client.clone())),
        )
        .with_tick_interval(monitor.tick_interval())
        .with_wake_gap_factor(monitor.wake_gap_factor)
    }

    async fn drive(&self, observer: TabObserver, events: mpsc::Receiver<TabEvent>) {
        tokio::select! {
            _ = observer.run(events) => info!("Tab events ended"),
            _ = tokio::signal::ctrl_c() => info!("Interrupted, shutting down"),
        }
    }

    /// Close an open study session so the collector does not keep counting.
    async fn shutdown(&self) {
        let stop = self.session.observe(None, "", SystemClock.now());
        let Some(report) = stop.report else {
            return;
        };
        match self.client.send_status(&report).await {
            Ok(_) => info!("Reported end of session for {}", report.course_id),
            Err(e) => warn!("Final status report failed: {}", e),
        }
    }
}
