// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Event Bus Implementation - Pub/Sub for Governance Events
//
// In-memory event streaming using tokio broadcast channels. The pipeline
// publishes progress while an evaluation runs; surfaces, the CLI, and tests
// subscribe. Lossy by design: a slow subscriber lags, the pipeline never
// blocks on it.

use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::warn;

use crate::domain::action::ActionId;
use crate::domain::events::GovernanceEvent;

/// Event bus for publishing and subscribing to governance events.
#[derive(Clone)]
pub struct EventBus {
    sender: Arc<broadcast::Sender<GovernanceEvent>>,
}

impl EventBus {
    /// Capacity bounds how many events are buffered per lagging subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn with_default_capacity() -> Self {
        Self::new(1000)
    }

    /// Publish an event to all subscribers. Fire-and-forget.
    pub fn publish(&self, event: GovernanceEvent) {
        let _ = self.sender.send(event);
    }

    /// Subscribe to all governance events.
    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver {
            receiver: self.sender.subscribe(),
        }
    }

    /// Subscribe to events for a single evaluation.
    pub fn subscribe_action(&self, action_id: ActionId) -> ActionEventReceiver {
        ActionEventReceiver {
            receiver: self.sender.subscribe(),
            action_id,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

/// Receiver for all governance events.
pub struct EventReceiver {
    receiver: broadcast::Receiver<GovernanceEvent>,
}

impl EventReceiver {
    pub async fn recv(&mut self) -> Result<GovernanceEvent, EventBusError> {
        self.receiver.recv().await.map_err(|e| match e {
            broadcast::error::RecvError::Closed => EventBusError::Closed,
            broadcast::error::RecvError::Lagged(n) => {
                warn!("event receiver lagged by {} events", n);
                EventBusError::Lagged(n)
            }
        })
    }
}

/// Receiver filtered to one evaluation's events.
pub struct ActionEventReceiver {
    receiver: broadcast::Receiver<GovernanceEvent>,
    action_id: ActionId,
}

impl ActionEventReceiver {
    pub async fn recv(&mut self) -> Result<GovernanceEvent, EventBusError> {
        loop {
            let event = self.receiver.recv().await.map_err(|e| match e {
                broadcast::error::RecvError::Closed => EventBusError::Closed,
                broadcast::error::RecvError::Lagged(n) => {
                    warn!("event receiver lagged by {} events", n);
                    EventBusError::Lagged(n)
                }
            })?;
            if event.action_id() == self.action_id {
                return Ok(event);
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EventBusError {
    #[error("event bus is closed")]
    Closed,

    #[error("receiver lagged by {0} events (events were dropped)")]
    Lagged(u64),
}
