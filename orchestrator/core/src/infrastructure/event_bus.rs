// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Event Bus Implementation - Pub/Sub for Domain Events
//
// In-memory event streaming over a tokio broadcast channel. Feeds the SSE
// endpoint and any in-process observers. Events are not persisted.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use synapse_cortex::application::EventBus as CortexEventSink;
use synapse_cortex::CortexEvent;

use crate::domain::events::{LifecycleEvent, RoutingEvent};

/// Unified domain event type for the event bus
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum DomainEvent {
    Lifecycle(LifecycleEvent),
    Cortex(CortexEvent),
    Routing(RoutingEvent),
}

impl DomainEvent {
    pub fn category(&self) -> &'static str {
        match self {
            DomainEvent::Lifecycle(_) => "lifecycle",
            DomainEvent::Cortex(_) => "cortex",
            DomainEvent::Routing(_) => "routing",
        }
    }
}

/// Event bus for publishing and subscribing to domain events
#[derive(Clone)]
pub struct EventBus {
    sender: Arc<broadcast::Sender<DomainEvent>>,
}

impl EventBus {
    /// Capacity is the number of events buffered before slow receivers lag
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn with_default_capacity() -> Self {
        Self::new(1000)
    }

    pub fn publish_lifecycle_event(&self, event: LifecycleEvent) {
        self.publish(DomainEvent::Lifecycle(event));
    }

    pub fn publish_routing_event(&self, event: RoutingEvent) {
        self.publish(DomainEvent::Routing(event));
    }

    pub fn publish_cortex_event(&self, event: CortexEvent) {
        self.publish(DomainEvent::Cortex(event));
    }

    fn publish(&self, event: DomainEvent) {
        debug!(category = event.category(), "Publishing event");

        // send() only fails when nobody is subscribed
        if self.sender.send(event).is_err() {
            debug!("No subscribers listening to event");
        }
    }

    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver {
            receiver: self.sender.subscribe(),
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

/// Lets the Cortex publish straight onto the orchestrator bus
#[async_trait]
impl CortexEventSink for EventBus {
    async fn publish(&self, event: CortexEvent) -> anyhow::Result<()> {
        self.publish_cortex_event(event);
        Ok(())
    }
}

/// Receiver for all domain events
pub struct EventReceiver {
    receiver: broadcast::Receiver<DomainEvent>,
}

impl EventReceiver {
    /// Receive the next event (waits until one is available)
    pub async fn recv(&mut self) -> Result<DomainEvent, EventBusError> {
        self.receiver.recv().await.map_err(|e| match e {
            broadcast::error::RecvError::Closed => EventBusError::Closed,
            broadcast::error::RecvError::Lagged(n) => {
                warn!("Event receiver lagged by {} events", n);
                EventBusError::Lagged(n)
            }
        })
    }

    pub fn try_recv(&mut self) -> Result<DomainEvent, EventBusError> {
        self.receiver.try_recv().map_err(|e| match e {
            broadcast::error::TryRecvError::Empty => EventBusError::Empty,
            broadcast::error::TryRecvError::Closed => EventBusError::Closed,
            broadcast::error::TryRecvError::Lagged(n) => {
                warn!("Event receiver lagged by {} events", n);
                EventBusError::Lagged(n)
            }
        })
    }
}

/// Errors that can occur when receiving events
#[derive(Debug, thiserror::Error)]
pub enum EventBusError {
    #[error("Event bus is closed")]
    Closed,

    #[error("No events available")]
    Empty,

    #[error("Receiver lagged by {0} events (events were dropped)")]
    Lagged(u64),
}
