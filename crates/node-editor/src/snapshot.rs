//! Persisted graph format
//!
//! Graphs are saved in a LiteGraph-style document: a list of node records
//! and a list of links written as `[id, origin, origin_slot, target,
//! target_slot, type]` arrays. Each node record is produced generically
//! first; the node's role then adds its own fields through
//! [`SnapshotHooks`]. Restoring runs in the same order.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::graph::Graph;
use crate::node::{BackendNode, GalleryMode, GalleryNode, GraphNode, InputSocket, NodeRole, OutputSocket, UnresolvedNode};
use crate::types::{Link, LinkId, NodeId, Size, SlotIndex};

/// Record field holding a backend node's tags
pub const TAGS_FIELD: &str = "tags";

/// Record field holding control values by input name, for nodes that opt
/// out of positional `widgets_values`
pub const CONTROLS_FIELD: &str = "controls";

/// Record field holding a gallery's mode
pub const GALLERY_MODE_FIELD: &str = "mode";

/// Document format version written on save
pub const SNAPSHOT_VERSION: f32 = 0.4;

fn default_version() -> f32 {
    SNAPSHOT_VERSION
}

/// A saved graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedGraph {
    #[serde(default)]
    pub last_node_id: NodeId,
    #[serde(default)]
    pub last_link_id: LinkId,
    #[serde(default)]
    pub nodes: Vec<NodeRecord>,
    #[serde(default)]
    pub links: Vec<SerializedLink>,
    #[serde(default)]
    pub groups: Vec<Value>,
    #[serde(default)]
    pub config: Map<String, Value>,
    #[serde(default)]
    pub extra: Map<String, Value>,
    #[serde(default = "default_version")]
    pub version: f32,
}

impl SerializedGraph {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn node(&self, id: NodeId) -> Option<&NodeRecord> {
        self.nodes.iter().find(|node| node.id == id)
    }
}

/// A link as persisted: `[id, origin_id, origin_slot, target_id, target_slot, type]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedLink(
    pub LinkId,
    pub NodeId,
    pub SlotIndex,
    pub NodeId,
    pub SlotIndex,
    pub String,
);

impl From<&Link> for SerializedLink {
    fn from(link: &Link) -> Self {
        Self(
            link.id,
            link.origin_id,
            link.origin_slot,
            link.target_id,
            link.target_slot,
            link.type_name.clone(),
        )
    }
}

impl From<SerializedLink> for Link {
    fn from(SerializedLink(id, origin_id, origin_slot, target_id, target_slot, type_name): SerializedLink) -> Self {
        Self {
            id,
            origin_id,
            origin_slot,
            target_id,
            target_slot,
            type_name,
        }
    }
}

/// An input slot as persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputRecord {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub link: Option<LinkId>,
    /// Backed by an inline control rather than a socket
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub control: bool,
}

/// An output slot as persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputRecord {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub links: Option<Vec<LinkId>>,
}

/// One node as persisted. Fields not listed here are kept in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub pos: [f32; 2],
    #[serde(default)]
    pub size: Size,
    #[serde(default)]
    pub flags: Map<String, Value>,
    #[serde(default)]
    pub inputs: Vec<InputRecord>,
    #[serde(default)]
    pub outputs: Vec<OutputRecord>,
    #[serde(default)]
    pub properties: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub widgets_values: Option<Vec<Value>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Role-specific additions to the generic node record
pub trait SnapshotHooks {
    /// Add this role's fields to a record the generic path already filled
    fn on_serialize(&self, record: &mut NodeRecord);

    /// Read this role's fields after the generic path restored the node
    fn on_configure(&mut self, record: &NodeRecord);
}

impl SnapshotHooks for BackendNode {
    fn on_serialize(&self, record: &mut NodeRecord) {
        record.extra.insert(TAGS_FIELD.to_string(), Value::from(self.tags.clone()));
    }

    fn on_configure(&mut self, record: &NodeRecord) {
        self.tags = match record.extra.get(TAGS_FIELD) {
            None | Some(Value::Null) => Vec::new(),
            Some(value) => serde_json::from_value(value.clone()).unwrap_or_else(|e| {
                log::warn!("Ignoring unreadable tags on node {}: {}", record.id, e);
                Vec::new()
            }),
        };
    }
}

impl SnapshotHooks for GalleryNode {
    fn on_serialize(&self, record: &mut NodeRecord) {
        if let Ok(mode) = serde_json::to_value(self.mode) {
            record.extra.insert(GALLERY_MODE_FIELD.to_string(), mode);
        }
    }

    fn on_configure(&mut self, record: &NodeRecord) {
        self.mode = record
            .extra
            .get(GALLERY_MODE_FIELD)
            .and_then(|mode| serde_json::from_value::<GalleryMode>(mode.clone()).ok())
            .unwrap_or_default();
    }
}

impl SnapshotHooks for UnresolvedNode {
    fn on_serialize(&self, record: &mut NodeRecord) {
        for (key, value) in &self.extra {
            record.extra.entry(key.clone()).or_insert_with(|| value.clone());
        }
    }

    fn on_configure(&mut self, record: &NodeRecord) {
        self.extra = record.extra.clone();
        // No controls to hold these, so carry them as an opaque field
        if let Some(values) = &record.widgets_values {
            self.extra
                .insert("widgets_values".to_string(), Value::Array(values.clone()));
        }
    }
}

impl NodeRole {
    /// The role's snapshot hooks, for roles that have any
    pub fn snapshot_hooks(&self) -> Option<&dyn SnapshotHooks> {
        match self {
            NodeRole::Backend(backend) => Some(backend),
            NodeRole::Gallery(gallery) => Some(gallery),
            NodeRole::Unresolved(unresolved) => Some(unresolved),
            NodeRole::Reroute | NodeRole::Receiver(_) => None,
        }
    }

    pub fn snapshot_hooks_mut(&mut self) -> Option<&mut dyn SnapshotHooks> {
        match self {
            NodeRole::Backend(backend) => Some(backend),
            NodeRole::Gallery(gallery) => Some(gallery),
            NodeRole::Unresolved(unresolved) => Some(unresolved),
            NodeRole::Reroute | NodeRole::Receiver(_) => None,
        }
    }
}

impl GraphNode {
    /// Produce this node's persisted record
    pub fn serialize(&self) -> NodeRecord {
        let mut record = NodeRecord {
            id: self.id,
            type_name: self.type_name.clone(),
            title: Some(self.title.clone()),
            pos: self.position,
            size: self.size,
            flags: Map::new(),
            inputs: self
                .inputs
                .iter()
                .map(|input| InputRecord {
                    name: input.name.clone(),
                    type_name: input.type_name.clone(),
                    link: input.link,
                    control: !input.is_connectable(),
                })
                .collect(),
            outputs: self
                .outputs
                .iter()
                .map(|output| OutputRecord {
                    name: output.name.clone(),
                    type_name: output.type_name.clone(),
                    links: (!output.links.is_empty()).then(|| output.links.clone()),
                })
                .collect(),
            properties: self.properties.clone(),
            widgets_values: None,
            extra: Map::new(),
        };

        let controls: Vec<_> = self.inputs.iter().filter_map(InputSocket::inline_control).collect();
        if !controls.is_empty() {
            if self.serialize_controls {
                record.widgets_values = Some(controls.iter().map(|c| c.value.clone()).collect());
            } else {
                let by_name: Map<String, Value> = controls
                    .iter()
                    .map(|c| (c.name.clone(), c.value.clone()))
                    .collect();
                record.extra.insert(CONTROLS_FIELD.to_string(), Value::Object(by_name));
            }
        }

        if let Some(hooks) = self.role.snapshot_hooks() {
            hooks.on_serialize(&mut record);
        }
        record
    }

    /// Apply a persisted record to this node.
    ///
    /// Sockets in the record are adopted only by a node that has none of its
    /// own; schema-built and client nodes keep the sockets they were built
    /// with. Links are restored separately by the graph.
    pub fn configure(&mut self, record: &NodeRecord) {
        if let Some(title) = &record.title {
            self.title = title.clone();
        }
        self.position = record.pos;
        self.size = record.size;
        self.properties = record.properties.clone();

        if self.inputs.is_empty() && self.outputs.is_empty() {
            self.inputs = record
                .inputs
                .iter()
                .map(|input| InputSocket::connectable(&input.name, &input.type_name))
                .collect();
            self.outputs = record
                .outputs
                .iter()
                .map(|output| OutputSocket::new(&output.name, &output.type_name))
                .collect();
        }

        self.restore_controls(record);

        if let Some(hooks) = self.role.snapshot_hooks_mut() {
            hooks.on_configure(record);
        }
    }

    fn restore_controls(&mut self, record: &NodeRecord) {
        let by_name = record.extra.get(CONTROLS_FIELD).and_then(Value::as_object);
        let mut positional = record.widgets_values.iter().flatten();

        for control in self.inputs.iter_mut().filter_map(InputSocket::inline_control_mut) {
            let value = match by_name {
                Some(values) => values.get(&control.name),
                None => positional.next(),
            };
            if let Some(value) = value {
                if let Err(e) = control.set_value(value.clone()) {
                    log::warn!("Node {}: keeping default for '{}': {}", record.id, control.name, e);
                }
            }
        }
    }
}

impl Graph {
    /// Produce the persisted document for the whole graph
    pub fn serialize(&self) -> SerializedGraph {
        SerializedGraph {
            last_node_id: self.last_node_id(),
            last_link_id: self.last_link_id(),
            nodes: self.nodes().map(GraphNode::serialize).collect(),
            links: self.links().map(SerializedLink::from).collect(),
            groups: Vec::new(),
            config: Map::new(),
            extra: Map::new(),
            version: SNAPSHOT_VERSION,
        }
    }
}
