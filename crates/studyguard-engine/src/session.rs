//! The studying/idle state machine.
//!
//! [`transition`] is pure. [`SessionStore`] applies it under a lock that is
//! never held across an `.await`, so overlapping observations cannot both
//! see `Idle` and both emit a start report.

use std::sync::{Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};
use studyguard_common::{Course, StatusEvent};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Activity {
    #[default]
    Idle,
    Studying {
        course_id: String,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub activity: Activity,
    /// Epoch seconds of the last emitted report, 0 before the first one.
    pub last_report_time: u64,
}

impl SessionState {
    pub fn is_studying(&self) -> bool {
        matches!(self.activity, Activity::Studying { .. })
    }

    pub fn current_course_id(&self) -> Option<&str> {
        match &self.activity {
            Activity::Idle => None,
            Activity::Studying { course_id } => Some(course_id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionKind {
    /// Idle -> Studying.
    Started,
    /// Studying one course -> Studying another.
    Switched { from: String },
    /// Same course, heartbeat window elapsed.
    Heartbeat,
    /// Same course, inside the heartbeat window.
    Debounced,
    /// Studying -> Idle.
    Stopped,
    /// Idle and nothing matched.
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub state: SessionState,
    pub report: Option<StatusEvent>,
    pub kind: TransitionKind,
}

/// Decide the next state for one observation.
///
/// `observation` is the matched course, if any; `url` is the tab URL that
/// produced it. Every emitted report stamps `last_report_time` with `now`.
pub fn transition(
    state: &SessionState,
    observation: Option<&Course>,
    url: &str,
    now: u64,
    heartbeat_secs: u64,
) -> Transition {
    match (observation, &state.activity) {
        (None, Activity::Idle) => Transition {
            state: state.clone(),
            report: None,
            kind: TransitionKind::Unchanged,
        },
        (None, Activity::Studying { course_id }) => Transition {
            state: SessionState {
                activity: Activity::Idle,
                last_report_time: now,
            },
            report: Some(StatusEvent::stopped(course_id.clone(), now)),
            kind: TransitionKind::Stopped,
        },
        (Some(course), Activity::Studying { course_id }) if *course_id == course.id => {
            if now.saturating_sub(state.last_report_time) >= heartbeat_secs {
                Transition {
                    state: SessionState {
                        activity: state.activity.clone(),
                        last_report_time: now,
                    },
                    report: Some(StatusEvent::started(course.id.clone(), url, now)),
                    kind: TransitionKind::Heartbeat,
                }
            } else {
                Transition {
                    state: state.clone(),
                    report: None,
                    kind: TransitionKind::Debounced,
                }
            }
        }
        (Some(course), activity) => {
            let kind = match activity {
                Activity::Studying { course_id } => TransitionKind::Switched {
                    from: course_id.clone(),
                },
                Activity::Idle => TransitionKind::Started,
            };
            Transition {
                state: SessionState {
                    activity: Activity::Studying {
                        course_id: course.id.clone(),
                    },
                    last_report_time: now,
                },
                report: Some(StatusEvent::started(course.id.clone(), url, now)),
                kind,
            }
        }
    }
}

/// Process-wide session state, in memory only.
pub struct SessionStore {
    state: Mutex<SessionState>,
    heartbeat_secs: u64,
}

impl SessionStore {
    pub fn new(heartbeat_secs: u64) -> Self {
        Self {
            state: Mutex::new(SessionState::default()),
            heartbeat_secs,
        }
    }

    pub fn snapshot(&self) -> SessionState {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Read, decide and write in one critical section.
    pub fn observe(&self, observation: Option<&Course>, url: &str, now: u64) -> Transition {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let next = transition(&state, observation, url, now, self.heartbeat_secs);
        *state = next.state.clone();
        next
    }
}

pub trait Clock: Send + Sync {
    /// Current time in epoch seconds.
    fn now(&self) -> u64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}
