//! Active-tab detection over the DevTools protocol.

use crate::cdp::CdpClient;
use async_trait::async_trait;
use chromiumoxide::Page;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use studyguard_common::TabInfo;
use studyguard_engine::source::{SourceError, TabEvent, TabSource};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval, timeout};
use tracing::{debug, warn};

const FOCUS_PROBE: &str = "JSON.stringify({visible: document.visibilityState === 'visible', focused: document.hasFocus()})";

/// What a page reports about itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct Focus {
    pub visible: bool,
    pub focused: bool,
}

/// The focused tab wins, otherwise the first visible one.
pub fn pick_active(candidates: Vec<(TabInfo, Focus)>) -> Option<TabInfo> {
    let mut visible = None;
    for (tab, focus) in candidates {
        if focus.focused {
            return Some(tab);
        }
        if focus.visible && visible.is_none() {
            visible = Some(tab);
        }
    }
    visible
}

/// Event implied by the active tab going from `prev` to `next`.
pub fn diff(prev: Option<&TabInfo>, next: Option<&TabInfo>) -> Option<TabEvent> {
    match (prev, next) {
        (None, None) => None,
        (Some(a), Some(b)) if a.id == b.id => {
            (a.url != b.url).then_some(TabEvent::NavigationCompleted { active: true })
        }
        _ => Some(TabEvent::Activated),
    }
}

const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

pub struct CdpTabSource {
    client: Arc<Mutex<CdpClient>>,
}

impl CdpTabSource {
    pub fn new(client: Arc<Mutex<CdpClient>>) -> Self {
        Self { client }
    }

    async fn describe(&self, page: &Page) -> Option<(TabInfo, Focus)> {
        let probe = async {
            let raw: String = page.evaluate(FOCUS_PROBE).await.ok()?.into_value().ok()?;
            serde_json::from_str::<Focus>(&raw).ok()
        };
        let focus = match timeout(PROBE_TIMEOUT, probe).await {
            Ok(Some(focus)) => focus,
            Ok(None) => {
                debug!("Focus probe failed on {}", page.target_id().inner());
                return None;
            }
            Err(_) => {
                debug!("Focus probe timed out on {}", page.target_id().inner());
                return None;
            }
        };
        if !focus.visible && !focus.focused {
            return None;
        }

        let url = page.url().await.ok().flatten();
        let title = page.get_title().await.ok().flatten();
        Some((
            TabInfo {
                id: page.target_id().inner().clone(),
                url,
                title,
                active: true,
            },
            focus,
        ))
    }
}

#[async_trait]
impl TabSource for CdpTabSource {
    async fn active_tab(&self) -> Result<Option<TabInfo>, SourceError> {
        let pages = {
            let client = self.client.lock().await;
            client.pages().await.map_err(|e| {
                warn!("Failed to list browser pages: {}", e);
                SourceError::ConnectionLost
            })?
        };

        let mut candidates = Vec::new();
        for page in &pages {
            if let Some(candidate) = self.describe(page).await {
                candidates.push(candidate);
            }
        }
        Ok(pick_active(candidates))
    }
}

/// Poll `source` and turn focus and URL changes into tab events. Stops when
/// the receiving side is dropped.
pub fn spawn_watcher(
    source: Arc<dyn TabSource>,
    poll_interval: Duration,
    events: mpsc::Sender<TabEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last: Option<TabInfo> = None;

        while !events.is_closed() {
            ticker.tick().await;
            let current = match source.active_tab().await {
                Ok(tab) => tab,
                Err(e) => {
                    debug!("Watcher skipped a poll: {}", e);
                    continue;
                }
            };

            if let Some(event) = diff(last.as_ref(), current.as_ref()) {
                debug!("Watcher saw {:?}", event);
                if events.send(event).await.is_err() {
                    break;
                }
            }
            last = current;
        }
    })
}
