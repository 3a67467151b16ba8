//! Routing execution results through the graph
//!
//! Results are computed out of process. The remote-call layer pushes each
//! completed payload into an [`ExecutionInbox`]; the UI thread drains the
//! inbox and hands every result to [`ResultRouter::deliver`], one at a time.
//! Delivery is synchronous and never fails as a whole: a result for a node
//! that no longer exists is dropped, and a failing receiver only affects
//! itself.

use std::panic::{self, AssertUnwindSafe};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::{EditorError, Result};
use crate::events::{emit, EditorEvent, EventSink, NullEventSink};
use crate::graph::Graph;
use crate::types::{NodeId, SlotIndex};

/// Message type the backend sends when a node finished with UI output
const EXECUTED_MESSAGE: &str = "executed";

/// One completed remote execution for one node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub node_id: NodeId,
    pub payload: Value,
}

impl ExecutionResult {
    pub fn new(node_id: NodeId, payload: Value) -> Self {
        Self { node_id, payload }
    }

    /// Interpret a backend status message.
    ///
    /// `{"type": "executed", "data": {"node": "9", "output": {...}}}` yields a
    /// result; any other message type yields `None`.
    pub fn from_executed_message(message: &Value) -> Result<Option<Self>> {
        if message.get("type").and_then(Value::as_str) != Some(EXECUTED_MESSAGE) {
            return Ok(None);
        }

        let data = message
            .get("data")
            .ok_or_else(|| EditorError::MalformedMessage("missing 'data'".into()))?;
        let node_id = match data.get("node") {
            Some(Value::String(id)) => id.parse::<NodeId>().ok(),
            Some(Value::Number(id)) => id.as_u64().and_then(|id| NodeId::try_from(id).ok()),
            _ => None,
        }
        .ok_or_else(|| EditorError::MalformedMessage(format!("bad node id in {}", data)))?;
        let payload = data
            .get("output")
            .cloned()
            .ok_or_else(|| EditorError::MalformedMessage("missing 'output'".into()))?;

        Ok(Some(Self::new(node_id, payload)))
    }
}

/// What happened to one delivered result
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Result-bearing outputs that stored the payload
    pub outputs_updated: usize,
    /// Receivers that accepted the payload
    pub delivered: usize,
    /// Downstream nodes without the receive capability
    pub skipped: usize,
    /// Receivers that returned an error or panicked
    pub failed: usize,
    /// The node was not in the graph
    pub dropped: bool,
}

static NULL_SINK: NullEventSink = NullEventSink;

/// Stores results on result-bearing outputs and fans them out downstream
#[derive(Clone, Copy)]
pub struct ResultRouter<'a> {
    events: &'a dyn EventSink,
}

impl Default for ResultRouter<'_> {
    fn default() -> Self {
        Self { events: &NULL_SINK }
    }
}

impl<'a> ResultRouter<'a> {
    pub fn new(events: &'a dyn EventSink) -> Self {
        Self { events }
    }

    /// Deliver one result.
    ///
    /// Every output whose type is the result type stores the payload,
    /// replacing any earlier value, and then pushes it to each linked node
    /// in link order. Nodes without the receive capability are skipped.
    pub fn deliver(&self, graph: &mut Graph, result: &ExecutionResult) -> DeliveryReport {
        let mut report = DeliveryReport::default();
        let node_id = result.node_id;

        let Some(node) = graph.node(node_id) else {
            log::debug!("Dropping result for missing node {}", node_id);
            emit(self.events, EditorEvent::ResultDropped { node_id });
            report.dropped = true;
            return report;
        };

        let slots: Vec<SlotIndex> = node
            .outputs
            .iter()
            .enumerate()
            .filter(|(_, output)| output.is_result_bearing())
            .map(|(slot, _)| slot)
            .collect();

        for slot in slots {
            if let Some(output) = graph.node_mut(node_id).and_then(|node| node.outputs.get_mut(slot)) {
                output.value = Some(result.payload.clone());
                report.outputs_updated += 1;
                emit(self.events, EditorEvent::ResultStored { node_id, slot });
            }

            for target_id in graph.output_nodes(node_id, slot) {
                self.push_to(graph, node_id, target_id, &result.payload, &mut report);
            }
        }

        log::debug!(
            "Result for node {}: {} outputs, {} delivered, {} skipped, {} failed",
            node_id,
            report.outputs_updated,
            report.delivered,
            report.skipped,
            report.failed
        );
        report
    }

    fn push_to(
        &self,
        graph: &mut Graph,
        source_id: NodeId,
        target_id: NodeId,
        payload: &Value,
        report: &mut DeliveryReport,
    ) {
        let Some(receiver) = graph.node_mut(target_id).and_then(|node| node.role.receiver_mut()) else {
            report.skipped += 1;
            return;
        };

        let error = match panic::catch_unwind(AssertUnwindSafe(|| receiver.receive(payload))) {
            Ok(Ok(())) => None,
            Ok(Err(e)) => {
                log::warn!("Receiver node {} rejected result from {}: {}", target_id, source_id, e);
                Some(e.to_string())
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                log::error!("Receiver node {} panicked on result from {}: {}", target_id, source_id, message);
                Some(message)
            }
        };

        match error {
            None => {
                report.delivered += 1;
                emit(self.events, EditorEvent::ResultDelivered { source_id, target_id });
            }
            Some(error) => {
                report.failed += 1;
                emit(
                    self.events,
                    EditorEvent::ReceiverFailed {
                        source_id,
                        target_id,
                        error,
                    },
                );
            }
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "receiver panicked".to_string()
    }
}

/// Queue between the remote-call layer and the UI thread
///
/// The remote side holds a [`sender`](Self::sender); the UI side drains
/// results with [`try_next`](Self::try_next) or [`drain`](Self::drain)
/// and routes them one at a time.
pub struct ExecutionInbox {
    sender: mpsc::UnboundedSender<ExecutionResult>,
    receiver: mpsc::UnboundedReceiver<ExecutionResult>,
}

impl ExecutionInbox {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self { sender, receiver }
    }

    /// A handle for the producing side
    pub fn sender(&self) -> mpsc::UnboundedSender<ExecutionResult> {
        self.sender.clone()
    }

    /// Take the next queued result without waiting
    pub fn try_next(&mut self) -> Option<ExecutionResult> {
        self.receiver.try_recv().ok()
    }

    /// Take every queued result without waiting
    pub fn drain(&mut self) -> Vec<ExecutionResult> {
        std::iter::from_fn(|| self.try_next()).collect()
    }

    /// Wait for the next result
    ///
    /// The inbox keeps a sender of its own, so this waits until a result
    /// arrives rather than ending when producers go away.
    pub async fn next(&mut self) -> Option<ExecutionResult> {
        self.receiver.recv().await
    }
}

impl Default for ExecutionInbox {
    fn default() -> Self {
        Self::new()
    }
}
