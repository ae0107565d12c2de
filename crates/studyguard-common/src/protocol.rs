use crate::course::{Course, TabInfo};
use serde::{Deserialize, Serialize};

/// Envelope used by every collector endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }
}

// ============================================================================
// Control messages (popup <-> monitor)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ControlRequest {
    GetStatus,
    RefreshCourses,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub is_studying: bool,
    pub current_course_id: Option<String>,
    pub courses: Vec<Course>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshOutcome {
    pub success: bool,
    pub courses: Vec<Course>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ControlResponse {
    Status(StatusSnapshot),
    Refreshed(RefreshOutcome),
}

// ============================================================================
// Browser bridge (companion extension <-> monitor)
// ============================================================================

/// Messages the companion extension sends to the monitor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    /// The focused tab changed. `None` when no browser window has focus.
    TabActivated { tab: Option<TabInfo> },
    /// A tab finished loading.
    NavigationCompleted { tab: TabInfo },
    TabRemoved {
        #[serde(rename = "tabId")]
        tab_id: String,
    },
    /// A popup request relayed by the extension.
    Control { request: ControlRequest },
}

/// Messages the monitor pushes to the companion extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    Badge(Badge),
    Status(StatusSnapshot),
    Refreshed(RefreshOutcome),
}

impl From<ControlResponse> for ServerMessage {
    fn from(response: ControlResponse) -> Self {
        match response {
            ControlResponse::Status(snapshot) => ServerMessage::Status(snapshot),
            ControlResponse::Refreshed(outcome) => ServerMessage::Refreshed(outcome),
        }
    }
}

/// Toolbar badge contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Badge {
    pub text: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}
