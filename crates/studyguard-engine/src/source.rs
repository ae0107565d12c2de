use async_trait::async_trait;
use studyguard_common::TabInfo;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Tab source not ready")]
    NotReady,
    #[error("Browser connection lost")]
    ConnectionLost,
    #[error("Browser protocol error: {0}")]
    Protocol(String),
}

/// Something that can tell which browser tab currently has focus.
#[async_trait]
pub trait TabSource: Send + Sync {
    /// The focused tab, or `None` when there is none.
    async fn active_tab(&self) -> Result<Option<TabInfo>, SourceError>;
}

/// Browser notifications that should trigger an observation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TabEvent {
    /// The focused tab changed.
    Activated,
    /// A tab finished loading. Only relevant when it is the active tab.
    NavigationCompleted { active: bool },
    /// The process resumed after a sleep; the course list may be stale.
    Resumed,
}
