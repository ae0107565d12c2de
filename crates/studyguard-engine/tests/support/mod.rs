#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use studyguard_engine::cache::CourseCache;
use studyguard_engine::collector::{CollectorError, CourseSource};
use studyguard_engine::indicator::{Indicator, IndicatorState};
use studyguard_engine::registry::CourseRegistry;
use studyguard_engine::reporter::StatusSink;
use studyguard_engine::session::Clock;
use studyguard_engine::source::{SourceError, TabSource};
use studyguard_engine::{Course, StatusEvent, TabInfo};

/// Course source whose next answer can be swapped between calls.
#[derive(Default)]
pub struct StubCourses {
    response: Mutex<Option<Vec<Course>>>,
    pub calls: AtomicU64,
}

impl StubCourses {
    pub fn serving(courses: Vec<Course>) -> Self {
        Self {
            response: Mutex::new(Some(courses)),
            calls: AtomicU64::new(0),
        }
    }

    pub fn offline() -> Self {
        Self::default()
    }

    pub fn serve(&self, courses: Vec<Course>) {
        *self.response.lock().unwrap() = Some(courses);
    }

    pub fn go_offline(&self) {
        *self.response.lock().unwrap() = None;
    }
}

#[async_trait]
impl CourseSource for StubCourses {
    async fn fetch_courses(&self) -> Result<Vec<Course>, CollectorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.response
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| CollectorError::Rejected("collector offline".into()))
    }
}

#[derive(Default)]
pub struct StubTab {
    tab: Mutex<Option<TabInfo>>,
    failing: Mutex<bool>,
}

impl StubTab {
    pub fn show(&self, url: &str) {
        *self.tab.lock().unwrap() = Some(TabInfo {
            id: "1".into(),
            url: Some(url.into()),
            title: None,
            active: true,
        });
    }

    pub fn clear(&self) {
        *self.tab.lock().unwrap() = None;
    }

    pub fn fail(&self, failing: bool) {
        *self.failing.lock().unwrap() = failing;
    }
}

#[async_trait]
impl TabSource for StubTab {
    async fn active_tab(&self) -> Result<Option<TabInfo>, SourceError> {
        // Suspend once so concurrent observations really interleave.
        tokio::task::yield_now().await;
        if *self.failing.lock().unwrap() {
            return Err(SourceError::ConnectionLost);
        }
        Ok(self.tab.lock().unwrap().clone())
    }
}

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<StatusEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<StatusEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn take(&self) -> Vec<StatusEvent> {
        std::mem::take(&mut *self.events.lock().unwrap())
    }
}

impl StatusSink for RecordingSink {
    fn report(&self, event: StatusEvent) {
        self.events.lock().unwrap().push(event);
    }
}

#[derive(Default)]
pub struct RecordingIndicator {
    states: Mutex<Vec<IndicatorState>>,
}

impl RecordingIndicator {
    pub fn last(&self) -> Option<IndicatorState> {
        self.states.lock().unwrap().last().cloned()
    }

    pub fn count(&self) -> usize {
        self.states.lock().unwrap().len()
    }
}

impl Indicator for RecordingIndicator {
    fn update(&self, state: &IndicatorState) {
        self.states.lock().unwrap().push(state.clone());
    }
}

pub struct ManualClock(AtomicU64);

impl ManualClock {
    pub fn at(secs: u64) -> Self {
        Self(AtomicU64::new(secs))
    }

    pub fn set(&self, secs: u64) {
        self.0.store(secs, Ordering::SeqCst);
    }

    pub fn advance(&self, secs: u64) {
        self.0.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

pub fn course_c1() -> Course {
    Course::new("c1", "Course One", "*example.com/course/1*")
}

pub fn course_c2() -> Course {
    Course::new("c2", "Course Two", "*example.com/course/2*")
}

pub fn registry_with(source: Arc<StubCourses>, cache: CourseCache) -> Arc<CourseRegistry> {
    Arc::new(CourseRegistry::new(source, cache))
}
