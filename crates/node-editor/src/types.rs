//! Core types for editor graphs
//!
//! Identifiers, sizes and links shared by the node model, the graph
//! and the persisted snapshot format.

use serde::{Deserialize, Serialize};

/// Unique identifier for a node
pub type NodeId = u32;

/// Unique identifier for a link
pub type LinkId = u32;

/// Positional index of an input or output socket on a node
pub type SlotIndex = usize;

/// Socket type that marks an output as carrying a UI-visible result
pub const RESULT_TYPE: &str = "IMAGE";

/// Name of the synthetic result output attached to sink nodes
pub const RESULT_OUTPUT_NAME: &str = "output";

/// Socket type accepted by, and connectable to, any other type
pub const WILDCARD_TYPE: &str = "*";

/// Backend node types that surface a result to the UI.
///
/// The backend schema has no field saying "this node type returns a UI
/// result", so every such type is listed here by hand and receives one
/// extra `RESULT_TYPE` output when built.
pub const RESULT_SINK_TYPES: &[&str] = &["PreviewImage", "SaveImage"];

/// Check whether a backend type is on the result sink allowlist
pub fn is_result_sink(node_type: &str) -> bool {
    RESULT_SINK_TYPES.contains(&node_type)
}

/// Check whether a value of `source` may flow into an input of `target`
pub fn types_compatible(source: &str, target: &str) -> bool {
    source == WILDCARD_TYPE || target == WILDCARD_TYPE || source == target
}

/// Width and height of a node, persisted as `[width, height]`
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f32; 2]", into = "[f32; 2]")]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Per-dimension maximum of two sizes
    pub fn max(self, other: Size) -> Size {
        Size::new(self.width.max(other.width), self.height.max(other.height))
    }
}

impl From<[f32; 2]> for Size {
    fn from([width, height]: [f32; 2]) -> Self {
        Self { width, height }
    }
}

impl From<Size> for [f32; 2] {
    fn from(size: Size) -> Self {
        [size.width, size.height]
    }
}

/// A directed edge from an output socket to an input socket
///
/// Links are owned by the graph. Nodes only record link ids on their
/// sockets so peers can be looked up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    pub id: LinkId,
    pub origin_id: NodeId,
    pub origin_slot: SlotIndex,
    pub target_id: NodeId,
    pub target_slot: SlotIndex,
    /// Type of the origin output at connection time
    pub type_name: String,
}
