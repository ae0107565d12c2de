//! Turns companion-extension messages into tab state, tab events and
//! control replies.

use crate::server::Inbound;
use async_trait::async_trait;
use std::sync::{Mutex, PoisonError};
use studyguard_common::TabInfo;
use studyguard_common::protocol::{ClientMessage, ServerMessage};
use studyguard_engine::control::Controller;
use studyguard_engine::indicator::{Indicator, IndicatorState};
use studyguard_engine::source::{SourceError, TabEvent, TabSource};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info};

/// Last active tab reported by the extension.
#[derive(Debug, Default)]
pub struct TabTracker {
    active: Mutex<Option<TabInfo>>,
}

impl TabTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, tab: Option<TabInfo>) {
        *self.active.lock().unwrap_or_else(PoisonError::into_inner) = tab;
    }

    pub fn get(&self) -> Option<TabInfo> {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Forget the active tab if it is `tab_id`. Returns whether it was.
    pub fn remove(&self, tab_id: &str) -> bool {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if active.as_ref().is_some_and(|tab| tab.id == tab_id) {
            *active = None;
            true
        } else {
            false
        }
    }
}

#[async_trait]
impl TabSource for TabTracker {
    async fn active_tab(&self) -> Result<Option<TabInfo>, SourceError> {
        Ok(self.get())
    }
}

/// Pushes the indicator to connected extensions as a toolbar badge.
pub struct BadgeIndicator {
    outbound: broadcast::Sender<ServerMessage>,
}

impl BadgeIndicator {
    pub fn new(outbound: broadcast::Sender<ServerMessage>) -> Self {
        Self { outbound }
    }
}

impl Indicator for BadgeIndicator {
    fn update(&self, state: &IndicatorState) {
        if self.outbound.send(ServerMessage::Badge(state.badge())).is_err() {
            debug!("No extension connected, badge not pushed");
        }
    }
}

/// Consume inbound bridge traffic until the server side goes away.
pub async fn dispatch(
    mut inbound: mpsc::Receiver<Inbound>,
    tracker: std::sync::Arc<TabTracker>,
    events: mpsc::Sender<TabEvent>,
    controller: Controller,
    outbound: broadcast::Sender<ServerMessage>,
) {
    while let Some(message) = inbound.recv().await {
        let event = match message {
            Inbound::Message(ClientMessage::TabActivated { tab }) => {
                tracker.set(tab);
                Some(TabEvent::Activated)
            }
            Inbound::Message(ClientMessage::NavigationCompleted { tab }) => {
                let active = tab.active;
                if active {
                    tracker.set(Some(tab));
                }
                Some(TabEvent::NavigationCompleted { active })
            }
            Inbound::Message(ClientMessage::TabRemoved { tab_id }) => {
                tracker.remove(&tab_id).then_some(TabEvent::Activated)
            }
            Inbound::Message(ClientMessage::Control { request }) => {
                let controller = controller.clone();
                let outbound = outbound.clone();
                tokio::spawn(async move {
                    let response = controller.handle(request).await;
                    if outbound.send(response.into()).is_err() {
                        debug!("Extension gone before control reply");
                    }
                });
                None
            }
            Inbound::Closed => {
                info!("Extension disconnected, clearing active tab");
                tracker.set(None);
                Some(TabEvent::Activated)
            }
        };

        if let Some(event) = event
            && events.send(event).await.is_err()
        {
            debug!("Observer stopped, bridge dispatch ending");
            break;
        }
    }
}
