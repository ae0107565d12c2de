//! Answers status and refresh requests from the popup.

use crate::registry::CourseRegistry;
use crate::session::SessionStore;
use std::sync::Arc;
use studyguard_common::protocol::{ControlRequest, ControlResponse, RefreshOutcome, StatusSnapshot};

#[derive(Clone)]
pub struct Controller {
    registry: Arc<CourseRegistry>,
    session: Arc<SessionStore>,
}

impl Controller {
    pub fn new(registry: Arc<CourseRegistry>, session: Arc<SessionStore>) -> Self {
        Self { registry, session }
    }

    pub fn status(&self) -> StatusSnapshot {
        let state = self.session.snapshot();
        StatusSnapshot {
            is_studying: state.is_studying(),
            current_course_id: state.current_course_id().map(str::to_string),
            courses: self.registry.current(),
        }
    }

    /// Runs a registry refresh. `success` reports that the refresh ran; the
    /// course list is whatever the registry holds afterwards.
    pub async fn refresh(&self) -> RefreshOutcome {
        let courses = self.registry.refresh().await;
        RefreshOutcome {
            success: true,
            courses,
        }
    }

    pub async fn handle(&self, request: ControlRequest) -> ControlResponse {
        match request {
            ControlRequest::GetStatus => ControlResponse::Status(self.status()),
            ControlRequest::RefreshCourses => ControlResponse::Refreshed(self.refresh().await),
        }
    }
}
