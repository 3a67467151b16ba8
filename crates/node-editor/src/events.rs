//! Editor events
//!
//! Emitted while nodes are built and results are routed so a host can
//! refresh its views. A sink that fails to accept an event never aborts
//! the operation that produced it.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::types::{NodeId, SlotIndex};

/// Trait for receiving editor events
pub trait EventSink: Send + Sync {
    /// Send an event
    ///
    /// Returns an error if the event could not be sent (e.g., channel closed)
    fn send(&self, event: EditorEvent) -> Result<(), EventError>;
}

/// Error when sending events fails
#[derive(Debug, Clone, Error)]
#[error("Event error: {message}")]
pub struct EventError {
    pub message: String,
}

impl EventError {
    pub fn channel_closed() -> Self {
        Self {
            message: "Channel closed".to_string(),
        }
    }
}

/// Events emitted by the editor core
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EditorEvent {
    /// A node was built from its schema
    #[serde(rename_all = "camelCase")]
    NodeBuilt { node_id: NodeId, node_type: String },

    /// A node was added but its schema could not be fully applied
    #[serde(rename_all = "camelCase")]
    NodeBuildFailed {
        node_id: NodeId,
        node_type: String,
        error: String,
    },

    /// A node and its links were removed
    #[serde(rename_all = "camelCase")]
    NodeRemoved { node_id: NodeId },

    /// A result was stored on a result-bearing output
    #[serde(rename_all = "camelCase")]
    ResultStored { node_id: NodeId, slot: SlotIndex },

    /// A downstream receiver accepted a result
    #[serde(rename_all = "camelCase")]
    ResultDelivered { source_id: NodeId, target_id: NodeId },

    /// A downstream receiver failed; its siblings were still served
    #[serde(rename_all = "camelCase")]
    ReceiverFailed {
        source_id: NodeId,
        target_id: NodeId,
        error: String,
    },

    /// A result arrived for a node that is no longer in the graph
    #[serde(rename_all = "camelCase")]
    ResultDropped { node_id: NodeId },
}

/// Send an event, logging instead of failing
pub(crate) fn emit(sink: &dyn EventSink, event: EditorEvent) {
    if let Err(e) = sink.send(event) {
        log::warn!("Failed to send editor event: {}", e);
    }
}

/// A no-op event sink that discards all events
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn send(&self, _event: EditorEvent) -> Result<(), EventError> {
        Ok(())
    }
}

/// A vector-based event sink that collects events
///
/// Useful for testing to verify events were emitted correctly.
#[derive(Default)]
pub struct VecEventSink {
    events: std::sync::Mutex<Vec<EditorEvent>>,
}

impl VecEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all collected events
    pub fn events(&self) -> Vec<EditorEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Clear all collected events
    pub fn clear(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }
}

impl EventSink for VecEventSink {
    fn send(&self, event: EditorEvent) -> Result<(), EventError> {
        let mut events = self.events.lock().map_err(|e| EventError {
            message: e.to_string(),
        })?;
        events.push(event);
        Ok(())
    }
}

/// Forwards events over an unbounded tokio channel
pub struct ChannelEventSink {
    sender: mpsc::UnboundedSender<EditorEvent>,
}

impl ChannelEventSink {
    pub fn new(sender: mpsc::UnboundedSender<EditorEvent>) -> Self {
        Self { sender }
    }
}

impl EventSink for ChannelEventSink {
    fn send(&self, event: EditorEvent) -> Result<(), EventError> {
        self.sender
            .send(event)
            .map_err(|_| EventError::channel_closed())
    }
}
