use serde::{Deserialize, Serialize};

/// A user-defined mapping from a URL wildcard pattern to a subject of study.
///
/// Courses are owned by the collector. The monitor only ever receives whole
/// lists and never edits an individual entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub url_pattern: String,
}

impl Course {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        url_pattern: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            subject: None,
            url_pattern: url_pattern.into(),
        }
    }
}

/// Outbound status report posted to the collector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEvent {
    pub course_id: String,
    pub active: bool,
    /// Epoch seconds.
    pub timestamp: u64,
    pub url: String,
}

impl StatusEvent {
    pub fn started(course_id: impl Into<String>, url: impl Into<String>, timestamp: u64) -> Self {
        Self {
            course_id: course_id.into(),
            active: true,
            timestamp,
            url: url.into(),
        }
    }

    pub fn stopped(course_id: impl Into<String>, timestamp: u64) -> Self {
        Self {
            course_id: course_id.into(),
            active: false,
            timestamp,
            url: String::new(),
        }
    }
}

/// A browser tab as seen by a tab source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabInfo {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub active: bool,
}

impl TabInfo {
    /// The tab URL, or `None` when the tab has no usable URL.
    pub fn usable_url(&self) -> Option<&str> {
        self.url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }
}
