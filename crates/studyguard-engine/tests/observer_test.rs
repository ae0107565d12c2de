mod support;

use std::sync::Arc;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use studyguard_engine::Course;
use studyguard_engine::cache::CourseCache;
use studyguard_engine::collector::{CollectorError, CourseSource};
use studyguard_engine::indicator::IndicatorState;
use studyguard_engine::observer::TabObserver;
use studyguard_engine::registry::CourseRegistry;
use studyguard_engine::session::{SessionStore, TransitionKind};
use studyguard_engine::source::TabEvent;
use studyguard_engine::StatusEvent;
use support::{
    ManualClock, RecordingIndicator, RecordingSink, StubCourses, StubTab, course_c1, course_c2,
};
use tempfile::TempDir;
use tokio::sync::mpsc;

const T0: u64 = 1_700_000_000;
const LESSON_URL: &str = "https://example.com/course/1/lesson";

struct Harness {
    tabs: Arc<StubTab>,
    sink: Arc<RecordingSink>,
    indicator: Arc<RecordingIndicator>,
    clock: Arc<ManualClock>,
    courses: Arc<StubCourses>,
    session: Arc<SessionStore>,
    registry: Arc<CourseRegistry>,
    observer: TabObserver,
    _dir: TempDir,
}

async fn harness(courses: Option<Vec<Course>>) -> Harness {
    let dir = TempDir::new().unwrap();
    let source = Arc::new(match courses {
        Some(courses) => StubCourses::serving(courses),
        None => StubCourses::offline(),
    });
    let registry = Arc::new(CourseRegistry::new(
        source.clone(),
        CourseCache::new(dir.path().join("courses.json")),
    ));
    registry.refresh().await;

    let tabs = Arc::new(StubTab::default());
    let sink = Arc::new(RecordingSink::default());
    let indicator = Arc::new(RecordingIndicator::default());
    let clock = Arc::new(ManualClock::at(T0));
    let session = Arc::new(SessionStore::new(5));

    let observer = TabObserver::new(registry.clone(), session.clone(), tabs.clone(), sink.clone())
        .with_indicator(indicator.clone())
        .with_clock(clock.clone());

    Harness {
        tabs,
        sink,
        indicator,
        clock,
        courses: source,
        session,
        registry,
        observer,
        _dir: dir,
    }
}

#[tokio::test]
async fn test_first_match_reports_and_shows_course() {
    let h = harness(Some(vec![course_c1()])).await;
    h.tabs.show(LESSON_URL);

    let t = h.observer.observe().await.unwrap();
    assert_eq!(t.kind, TransitionKind::Started);
    assert_eq!(h.sink.events(), vec![StatusEvent::started("c1", LESSON_URL, T0)]);
    assert_eq!(
        h.indicator.last(),
        Some(IndicatorState::Studying {
            course_name: "Course One".into()
        })
    );
    assert_eq!(h.session.snapshot().current_course_id(), Some("c1"));
}

#[tokio::test]
async fn test_heartbeat_is_debounced_until_window_elapses() {
    let h = harness(Some(vec![course_c1()])).await;
    h.tabs.show(LESSON_URL);
    h.observer.observe().await;
    h.sink.take();

    h.clock.set(T0 + 2);
    h.observer.observe().await;
    assert!(h.sink.events().is_empty());
    // The indicator is refreshed even when nothing is reported.
    assert_eq!(h.indicator.count(), 2);

    h.clock.set(T0 + 6);
    h.observer.observe().await;
    assert_eq!(h.sink.take(), vec![StatusEvent::started("c1", LESSON_URL, T0 + 6)]);
}

#[tokio::test]
async fn test_leaving_course_reports_inactive_once() {
    let h = harness(Some(vec![course_c1()])).await;
    h.tabs.show(LESSON_URL);
    h.observer.observe().await;
    h.sink.take();

    h.clock.advance(1);
    h.tabs.show("https://news.example.org/");
    h.observer.observe().await;
    assert_eq!(h.sink.take(), vec![StatusEvent::stopped("c1", T0 + 1)]);
    assert_eq!(h.indicator.last(), Some(IndicatorState::Idle));

    for _ in 0..5 {
        h.clock.advance(6);
        h.observer.observe().await;
    }
    assert!(h.sink.events().is_empty());
    assert!(!h.session.snapshot().is_studying());

    // Matching again starts a new session right away.
    h.clock.advance(1);
    h.tabs.show(LESSON_URL);
    h.observer.observe().await;
    assert_eq!(h.sink.take().len(), 1);
}

#[tokio::test]
async fn test_no_active_tab_counts_as_no_match() {
    let h = harness(Some(vec![course_c1()])).await;
    h.tabs.show(LESSON_URL);
    h.observer.observe().await;
    h.sink.take();

    h.tabs.clear();
    let t = h.observer.observe().await.unwrap();
    assert_eq!(t.kind, TransitionKind::Stopped);
    assert_eq!(h.sink.take(), vec![StatusEvent::stopped("c1", T0)]);
}

#[tokio::test]
async fn test_blank_url_counts_as_no_match() {
    let h = harness(Some(vec![Course::new("all", "Everything", "*")])).await;
    h.tabs.show("   ");
    let t = h.observer.observe().await.unwrap();
    assert_eq!(t.kind, TransitionKind::Unchanged);
    assert!(h.sink.events().is_empty());
}

#[tokio::test]
async fn test_course_change_is_never_throttled() {
    let h = harness(Some(vec![course_c1(), course_c2()])).await;
    h.tabs.show(LESSON_URL);
    h.observer.observe().await;

    h.tabs.show("https://example.com/course/2/intro");
    let t = h.observer.observe().await.unwrap();
    assert_eq!(t.kind, TransitionKind::Switched { from: "c1".into() });

    let events = h.sink.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[1].course_id, "c2");
    assert!(events[1].active);
    assert_eq!(events[0].timestamp, events[1].timestamp);
}

#[tokio::test]
async fn test_reports_for_same_course_are_spaced_by_heartbeat() {
    let h = harness(Some(vec![course_c1()])).await;
    h.tabs.show(LESSON_URL);

    for _ in 0..40 {
        h.observer.observe().await;
        h.clock.advance(1);
    }

    let events = h.sink.events();
    assert_eq!(events.len(), 8);
    for pair in events.windows(2) {
        assert!(pair[1].timestamp - pair[0].timestamp >= 5);
    }
}

#[tokio::test]
async fn test_offline_without_cache_never_matches() {
    let h = harness(None).await;
    assert!(h.registry.is_empty());

    h.tabs.show(LESSON_URL);
    for _ in 0..3 {
        let t = h.observer.observe().await.unwrap();
        assert_eq!(t.kind, TransitionKind::Unchanged);
    }
    assert!(h.sink.events().is_empty());
    assert_eq!(h.indicator.last(), Some(IndicatorState::Idle));
}

#[tokio::test]
async fn test_tab_query_failure_leaves_state_alone() {
    let h = harness(Some(vec![course_c1()])).await;
    h.tabs.show(LESSON_URL);
    h.observer.observe().await;
    h.sink.take();

    h.tabs.fail(true);
    h.clock.advance(30);
    assert!(h.observer.observe().await.is_none());
    assert!(h.sink.events().is_empty());
    assert_eq!(h.session.snapshot().current_course_id(), Some("c1"));
}

#[tokio::test]
async fn test_concurrent_observations_start_once() {
    let h = harness(Some(vec![course_c1()])).await;
    h.tabs.show(LESSON_URL);

    let o = &h.observer;
    tokio::join!(o.observe(), o.observe(), o.observe(), o.observe());

    assert_eq!(h.sink.events(), vec![StatusEvent::started("c1", LESSON_URL, T0)]);
}

#[tokio::test]
async fn test_background_navigation_is_ignored() {
    let h = harness(Some(vec![course_c1()])).await;
    h.tabs.show(LESSON_URL);

    h.observer
        .handle_event(TabEvent::NavigationCompleted { active: false })
        .await;
    assert!(h.sink.events().is_empty());
    assert_eq!(h.indicator.count(), 0);

    h.observer
        .handle_event(TabEvent::NavigationCompleted { active: true })
        .await;
    assert_eq!(h.sink.events().len(), 1);
}

#[tokio::test]
async fn test_activation_triggers_observation() {
    let h = harness(Some(vec![course_c1()])).await;
    h.tabs.show(LESSON_URL);
    h.observer.handle_event(TabEvent::Activated).await;
    assert_eq!(h.sink.events().len(), 1);
}

/// Serves its list once, then never answers again.
struct HangsAfterFirst {
    courses: Vec<Course>,
    calls: AtomicU64,
}

#[async_trait]
impl CourseSource for HangsAfterFirst {
    async fn fetch_courses(&self) -> Result<Vec<Course>, CollectorError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            Ok(self.courses.clone())
        } else {
            std::future::pending().await
        }
    }
}

/// Run the observer on `events` for `window`, then hand back control.
async fn run_for(observer: &TabObserver, events: mpsc::Receiver<TabEvent>, window: Duration) {
    tokio::select! {
        _ = observer.run(events) => {}
        _ = tokio::time::sleep(window) => {}
    }
}

#[tokio::test]
async fn test_resume_observes_again_after_refresh() {
    let h = harness(Some(vec![course_c1()])).await;
    let calls = h.courses.calls.load(Ordering::SeqCst);

    h.courses.serve(vec![course_c2()]);
    h.tabs.show("https://example.com/course/2/intro");

    let (tx, rx) = mpsc::channel(8);
    tx.send(TabEvent::Resumed).await.unwrap();
    run_for(&h.observer, rx, Duration::from_millis(300)).await;

    assert_eq!(h.courses.calls.load(Ordering::SeqCst), calls + 1);
    let events = h.sink.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].course_id, "c2");
}

#[tokio::test]
async fn test_hung_refresh_does_not_block_observations() {
    let dir = TempDir::new().unwrap();
    let source = Arc::new(HangsAfterFirst {
        courses: vec![course_c1()],
        calls: AtomicU64::new(0),
    });
    let registry = Arc::new(CourseRegistry::new(
        source.clone(),
        CourseCache::new(dir.path().join("courses.json")),
    ));
    registry.refresh().await;

    let tabs = Arc::new(StubTab::default());
    let sink = Arc::new(RecordingSink::default());
    let clock = Arc::new(ManualClock::at(T0));
    let observer = TabObserver::new(
        registry,
        Arc::new(SessionStore::new(5)),
        tabs.clone(),
        sink.clone(),
    )
    .with_clock(clock)
    .with_tick_interval(Duration::from_secs(3600));

    let (tx, rx) = mpsc::channel(8);
    tx.send(TabEvent::Resumed).await.unwrap();
    tabs.show(LESSON_URL);
    tx.send(TabEvent::Activated).await.unwrap();
    run_for(&observer, rx, Duration::from_millis(300)).await;

    assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    assert_eq!(sink.events(), vec![StatusEvent::started("c1", LESSON_URL, T0)]);
}

#[tokio::test]
async fn test_run_processes_events_until_channel_closes() {
    let h = harness(Some(vec![course_c1()])).await;
    h.tabs.show(LESSON_URL);

    let (tx, rx) = mpsc::channel(8);
    tx.send(TabEvent::Activated).await.unwrap();
    tx.send(TabEvent::NavigationCompleted { active: true }).await.unwrap();
    drop(tx);

    tokio::time::timeout(Duration::from_secs(5), h.observer.run(rx))
        .await
        .expect("observer should stop when the channel closes");

    // Clock is frozen, so only the first observation reports.
    assert_eq!(h.sink.events(), vec![StatusEvent::started("c1", LESSON_URL, T0)]);
}

#[tokio::test]
async fn test_run_detects_wake_from_clock_gap() {
    let h = harness(Some(vec![course_c1()])).await;
    let observer = TabObserver::new(
        h.registry.clone(),
        h.session.clone(),
        h.tabs.clone(),
        h.sink.clone(),
    )
    .with_clock(h.clock.clone())
    .with_tick_interval(Duration::from_millis(50))
    .with_wake_gap_factor(3);
    let calls = h.courses.calls.load(Ordering::SeqCst);

    let (_tx, rx) = mpsc::channel(1);
    tokio::select! {
        _ = observer.run(rx) => panic!("observer stopped early"),
        _ = async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            h.clock.advance(600);
            tokio::time::sleep(Duration::from_millis(300)).await;
        } => {}
    }

    assert_eq!(h.courses.calls.load(Ordering::SeqCst), calls + 1);
}
