//! Visible "studying" indicator, e.g. a toolbar badge.

use std::sync::{Mutex, PoisonError};
use studyguard_common::Course;
use studyguard_common::protocol::Badge;
use tracing::info;

pub const APP_TITLE: &str = "StudyGuard";
const STUDYING_BADGE_TEXT: &str = "ON";
const STUDYING_BADGE_COLOR: &str = "#4ade80";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndicatorState {
    Idle,
    Studying { course_name: String },
}

impl IndicatorState {
    pub fn from_match(course: Option<&Course>) -> Self {
        match course {
            Some(course) => IndicatorState::Studying {
                course_name: course.name.clone(),
            },
            None => IndicatorState::Idle,
        }
    }

    pub fn badge(&self) -> Badge {
        match self {
            IndicatorState::Idle => Badge {
                text: String::new(),
                title: APP_TITLE.to_string(),
                color: None,
            },
            IndicatorState::Studying { course_name } => Badge {
                text: STUDYING_BADGE_TEXT.to_string(),
                title: format!("Studying: {}", course_name),
                color: Some(STUDYING_BADGE_COLOR.to_string()),
            },
        }
    }
}

pub trait Indicator: Send + Sync {
    fn update(&self, state: &IndicatorState);
}

/// Writes indicator changes to the log. Repeated identical states are skipped.
#[derive(Debug, Default)]
pub struct LogIndicator {
    last: Mutex<Option<IndicatorState>>,
}

impl LogIndicator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Indicator for LogIndicator {
    fn update(&self, state: &IndicatorState) {
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        if last.as_ref() == Some(state) {
            return;
        }
        info!("Indicator: {}", state.badge().title);
        *last = Some(state.clone());
    }
}
