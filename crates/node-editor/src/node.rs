//! Graph nodes and their roles
//!
//! A [`GraphNode`] carries the generic parts every node shares (sockets,
//! size, title, properties). What a node *is* lives in its [`NodeRole`]:
//! a backend-built node, a client-side gallery or reroute, a host-provided
//! result receiver, or a node whose type is not known to this editor.
//! Behaviour that differs between roles is reached through
//! [`NodeRole::capabilities`] and the small traits defined here rather than
//! through per-type overrides.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::config::LayoutMetrics;
use crate::error::{EditorError, Result};
use crate::types::{LinkId, NodeId, Size, SlotIndex, RESULT_TYPE, WILDCARD_TYPE};
use crate::widgets::InlineControl;

/// Client-side node type that displays received result images
pub const GALLERY_NODE_TYPE: &str = "ui/gallery";

/// Client-side pass-through node used to tidy up links
pub const REROUTE_NODE_TYPE: &str = "utils/reroute";

/// How an input is fed
#[derive(Debug, Clone, PartialEq)]
pub enum InputKind {
    /// Accepts a link from an output socket
    Connectable,
    /// Edited in place; never linked
    Control(InlineControl),
}

/// An input slot on a node
#[derive(Debug, Clone, PartialEq)]
pub struct InputSocket {
    pub name: String,
    pub type_name: String,
    pub kind: InputKind,
    /// Link currently feeding this input
    pub link: Option<LinkId>,
}

impl InputSocket {
    /// Create a connectable socket
    pub fn connectable(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            kind: InputKind::Connectable,
            link: None,
        }
    }

    /// Create an input backed by an inline control
    pub fn control(control: InlineControl) -> Self {
        Self {
            name: control.name.clone(),
            type_name: control.type_name.clone(),
            kind: InputKind::Control(control),
            link: None,
        }
    }

    pub fn is_connectable(&self) -> bool {
        matches!(self.kind, InputKind::Connectable)
    }

    pub fn inline_control(&self) -> Option<&InlineControl> {
        match &self.kind {
            InputKind::Control(control) => Some(control),
            InputKind::Connectable => None,
        }
    }

    pub fn inline_control_mut(&mut self) -> Option<&mut InlineControl> {
        match &mut self.kind {
            InputKind::Control(control) => Some(control),
            InputKind::Connectable => None,
        }
    }
}

/// An output slot on a node
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSocket {
    pub name: String,
    pub type_name: String,
    /// Outgoing links in connection order
    pub links: Vec<LinkId>,
    /// Last value computed for this output
    pub value: Option<Value>,
}

impl OutputSocket {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            links: Vec::new(),
            value: None,
        }
    }

    /// Whether this output carries a UI-visible result
    pub fn is_result_bearing(&self) -> bool {
        self.type_name == RESULT_TYPE
    }
}

/// What a node's role allows the editor to do with it
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// Has a snapshot hook of its own
    pub serializable: bool,
    /// Accepts execution results pushed by an upstream node
    pub result_receiver: bool,
    /// Sockets come from a backend schema
    pub backend_built: bool,
}

/// Error returned by a downstream receiver
#[derive(Debug, Error)]
pub enum ReceiveError {
    /// The payload lacks a field the receiver needs
    #[error("Payload has no '{0}' list")]
    MissingField(&'static str),

    /// The receiver could not take the payload
    #[error("Receiver failed: {0}")]
    Failed(String),
}

/// A node that consumes execution results from upstream outputs.
///
/// Called synchronously on the UI thread. Returning an error, or panicking,
/// only affects this receiver; siblings still get the payload.
pub trait ResultReceiver {
    fn receive(&mut self, payload: &Value) -> std::result::Result<(), ReceiveError>;
}

/// A node built from a backend schema
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendNode {
    /// Tags select subsections of the graph to run; duplicates are kept
    pub tags: Vec<String>,
}

/// How a gallery treats a newly received batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GalleryMode {
    #[default]
    Replace,
    Append,
}

/// Client-side node that collects result images
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GalleryNode {
    pub mode: GalleryMode,
    /// Image entries received so far (`{filename, subfolder, type}` objects)
    pub images: Vec<Value>,
}

impl ResultReceiver for GalleryNode {
    fn receive(&mut self, payload: &Value) -> std::result::Result<(), ReceiveError> {
        let images = payload
            .get("images")
            .and_then(Value::as_array)
            .ok_or(ReceiveError::MissingField("images"))?;

        if self.mode == GalleryMode::Replace {
            self.images.clear();
        }
        self.images.extend(images.iter().cloned());
        Ok(())
    }
}

/// A node whose type is neither in the catalog nor a known client type.
///
/// Fields of its record that the editor does not understand are kept so
/// that saving the graph again does not lose them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnresolvedNode {
    pub extra: Map<String, Value>,
}

/// The tagged role of a node
pub enum NodeRole {
    Backend(BackendNode),
    Gallery(GalleryNode),
    Reroute,
    /// A host-provided receiver, e.g. a preview panel
    Receiver(Box<dyn ResultReceiver>),
    Unresolved(UnresolvedNode),
}

impl NodeRole {
    pub fn capabilities(&self) -> Capabilities {
        match self {
            NodeRole::Backend(_) => Capabilities {
                serializable: true,
                result_receiver: false,
                backend_built: true,
            },
            NodeRole::Gallery(_) => Capabilities {
                serializable: true,
                result_receiver: true,
                backend_built: false,
            },
            NodeRole::Reroute => Capabilities::default(),
            NodeRole::Receiver(_) => Capabilities {
                serializable: false,
                result_receiver: true,
                backend_built: false,
            },
            NodeRole::Unresolved(_) => Capabilities {
                serializable: true,
                result_receiver: false,
                backend_built: false,
            },
        }
    }

    /// The receive-result capability, if this role has it
    pub fn receiver_mut(&mut self) -> Option<&mut dyn ResultReceiver> {
        match self {
            NodeRole::Gallery(gallery) => Some(gallery),
            NodeRole::Receiver(receiver) => Some(receiver.as_mut()),
            _ => None,
        }
    }
}

impl std::fmt::Debug for NodeRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeRole::Backend(backend) => f.debug_tuple("Backend").field(backend).finish(),
            NodeRole::Gallery(gallery) => f.debug_tuple("Gallery").field(gallery).finish(),
            NodeRole::Reroute => f.write_str("Reroute"),
            NodeRole::Receiver(_) => f.write_str("Receiver(..)"),
            NodeRole::Unresolved(unresolved) => f.debug_tuple("Unresolved").field(unresolved).finish(),
        }
    }
}

/// A node instance in the editor graph
#[derive(Debug)]
pub struct GraphNode {
    pub id: NodeId,
    pub type_name: String,
    pub title: String,
    pub position: [f32; 2],
    pub size: Size,
    pub inputs: Vec<InputSocket>,
    pub outputs: Vec<OutputSocket>,
    pub properties: Map<String, Value>,
    /// When false, control values are not written as positional `widgets_values`
    pub serialize_controls: bool,
    pub role: NodeRole,
    pub(crate) built: bool,
}

impl GraphNode {
    pub fn new(id: NodeId, type_name: impl Into<String>, role: NodeRole) -> Self {
        let type_name = type_name.into();
        Self {
            id,
            title: type_name.clone(),
            type_name,
            position: [0.0, 0.0],
            size: Size::default(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            properties: Map::new(),
            serialize_controls: true,
            role,
            built: false,
        }
    }

    /// An empty backend node; sockets are attached by the node builder
    pub fn backend(id: NodeId, type_name: impl Into<String>) -> Self {
        Self::new(id, type_name, NodeRole::Backend(BackendNode::default()))
    }

    /// A gallery with one result input
    pub fn gallery(id: NodeId) -> Self {
        let mut node = Self::new(id, GALLERY_NODE_TYPE, NodeRole::Gallery(GalleryNode::default()));
        node.title = "Gallery".to_string();
        node.inputs.push(InputSocket::connectable("images", RESULT_TYPE));
        node
    }

    /// A reroute with one wildcard input and output
    pub fn reroute(id: NodeId) -> Self {
        let mut node = Self::new(id, REROUTE_NODE_TYPE, NodeRole::Reroute);
        node.title = "Reroute".to_string();
        node.inputs.push(InputSocket::connectable("", WILDCARD_TYPE));
        node.outputs.push(OutputSocket::new("", WILDCARD_TYPE));
        node
    }

    /// A node of a host-defined type that consumes results
    pub fn receiver(id: NodeId, type_name: impl Into<String>, receiver: Box<dyn ResultReceiver>) -> Self {
        let mut node = Self::new(id, type_name, NodeRole::Receiver(receiver));
        node.inputs.push(InputSocket::connectable("result", RESULT_TYPE));
        node
    }

    pub fn capabilities(&self) -> Capabilities {
        self.role.capabilities()
    }

    /// Whether the node builder has already run on this node
    pub fn is_built(&self) -> bool {
        self.built
    }

    /// Append an input; names must be unique within the node
    pub fn add_input(&mut self, socket: InputSocket) -> Result<SlotIndex> {
        if self.find_input(&socket.name).is_some() {
            return Err(EditorError::DuplicateInput(socket.name));
        }
        self.inputs.push(socket);
        Ok(self.inputs.len() - 1)
    }

    /// Append an output
    pub fn add_output(&mut self, socket: OutputSocket) -> SlotIndex {
        self.outputs.push(socket);
        self.outputs.len() - 1
    }

    pub fn find_input(&self, name: &str) -> Option<SlotIndex> {
        self.inputs.iter().position(|input| input.name == name)
    }

    pub fn find_output(&self, name: &str) -> Option<SlotIndex> {
        self.outputs.iter().position(|output| output.name == name)
    }

    /// The inline control for a named input
    pub fn control(&self, name: &str) -> Option<&InlineControl> {
        self.inputs
            .iter()
            .find(|input| input.name == name)
            .and_then(InputSocket::inline_control)
    }

    /// Edit the value of a named inline control
    pub fn set_control_value(&mut self, name: &str, value: Value) -> Result<()> {
        let control = self
            .inputs
            .iter_mut()
            .find(|input| input.name == name)
            .and_then(InputSocket::inline_control_mut)
            .ok_or_else(|| EditorError::invalid_value(name, "no such control"))?;
        control.set_value(value)
    }

    /// Tags of a backend node; other roles have none
    pub fn tags(&self) -> &[String] {
        match &self.role {
            NodeRole::Backend(backend) => &backend.tags,
            _ => &[],
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags().iter().any(|t| t == tag)
    }

    /// Replace the tags of a backend node. Returns false for other roles.
    pub fn set_tags(&mut self, tags: Vec<String>) -> bool {
        match &mut self.role {
            NodeRole::Backend(backend) => {
                backend.tags = tags;
                true
            }
            _ => false,
        }
    }

    /// Natural size of the node from its title, sockets and controls
    pub fn compute_size(&self, layout: &LayoutMetrics) -> Size {
        let sockets: Vec<&InputSocket> = self.inputs.iter().filter(|i| i.is_connectable()).collect();
        let controls = self.inputs.len() - sockets.len();
        let rows = sockets.len().max(self.outputs.len()).max(1);

        let widest_input = sockets
            .iter()
            .map(|i| layout.text_width(&i.name))
            .fold(0.0_f32, f32::max);
        let widest_output = self
            .outputs
            .iter()
            .map(|o| layout.text_width(&o.name))
            .fold(0.0_f32, f32::max);

        let width = (layout.text_width(&self.title) + layout.title_padding)
            .max(widest_input + widest_output + layout.slot_padding * 2.0)
            .max(layout.min_node_width);
        let height = rows as f32 * layout.slot_height
            + controls as f32 * (layout.widget_height + layout.widget_spacing)
            + layout.bottom_padding;

        Size::new(width, height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::widgets::ControlKind;
    use serde_json::json;

    struct Counting(usize);

    impl ResultReceiver for Counting {
        fn receive(&mut self, _payload: &Value) -> std::result::Result<(), ReceiveError> {
            self.0 += 1;
            Ok(())
        }
    }

    fn toggle(name: &str) -> InlineControl {
        InlineControl::new(name, "BOOLEAN", ControlKind::Toggle, json!(false))
    }

    #[test]
    fn test_input_names_are_unique() {
        let mut node = GraphNode::backend(1, "KSampler");
        assert_eq!(node.add_input(InputSocket::connectable("model", "MODEL")).unwrap(), 0);
        assert_eq!(node.add_input(InputSocket::control(toggle("tile"))).unwrap(), 1);

        let err = node.add_input(InputSocket::connectable("model", "CLIP")).unwrap_err();
        assert!(matches!(err, EditorError::DuplicateInput(name) if name == "model"));
        assert_eq!(node.inputs.len(), 2);
    }

    #[test]
    fn test_capabilities_follow_role() {
        assert!(GraphNode::backend(1, "KSampler").capabilities().backend_built);
        assert!(GraphNode::gallery(2).capabilities().result_receiver);
        assert_eq!(GraphNode::reroute(3).capabilities(), Capabilities::default());

        let receiver = GraphNode::receiver(4, "host/preview", Box::new(Counting(0)));
        let caps = receiver.capabilities();
        assert!(caps.result_receiver);
        assert!(!caps.serializable);
    }

    #[test]
    fn test_receiver_lookup() {
        let mut backend = GraphNode::backend(1, "KSampler");
        assert!(backend.role.receiver_mut().is_none());

        let mut host = GraphNode::receiver(2, "host/preview", Box::new(Counting(0)));
        host.role.receiver_mut().unwrap().receive(&json!({})).unwrap();
    }

    #[test]
    fn test_gallery_modes() {
        let mut gallery = GalleryNode::default();
        let batch = json!({"images": [{"filename": "a.png"}, {"filename": "b.png"}]});

        gallery.receive(&batch).unwrap();
        gallery.receive(&batch).unwrap();
        assert_eq!(gallery.images.len(), 2);

        gallery.mode = GalleryMode::Append;
        gallery.receive(&batch).unwrap();
        assert_eq!(gallery.images.len(), 4);

        let err = gallery.receive(&json!({"text": "nope"})).unwrap_err();
        assert!(matches!(err, ReceiveError::MissingField("images")));
        assert_eq!(gallery.images.len(), 4);
    }

    #[test]
    fn test_tags_only_on_backend_nodes() {
        let mut node = GraphNode::backend(1, "SaveImage");
        assert!(node.tags().is_empty());
        assert!(node.set_tags(vec!["a".into(), "a".into()]));
        assert_eq!(node.tags(), &["a".to_string(), "a".to_string()]);
        assert!(node.has_tag("a"));

        let mut gallery = GraphNode::gallery(2);
        assert!(!gallery.set_tags(vec!["a".into()]));
        assert!(gallery.tags().is_empty());
    }

    #[test]
    fn test_set_control_value() {
        let mut node = GraphNode::backend(1, "VAEDecodeTiled");
        node.add_input(InputSocket::control(toggle("tile"))).unwrap();
        node.add_input(InputSocket::connectable("vae", "VAE")).unwrap();

        node.set_control_value("tile", json!(true)).unwrap();
        assert_eq!(node.control("tile").unwrap().value, json!(true));
        assert!(node.set_control_value("vae", json!(1)).is_err());
        assert!(node.set_control_value("missing", json!(1)).is_err());
    }

    #[test]
    fn test_compute_size_counts_rows_and_controls() {
        let layout = LayoutMetrics::default();
        let mut node = GraphNode::backend(1, "X");
        let empty = node.compute_size(&layout);
        assert_eq!(empty.width, layout.min_node_width);
        assert_eq!(empty.height, layout.slot_height + layout.bottom_padding);

        node.add_input(InputSocket::connectable("a", "A")).unwrap();
        node.add_input(InputSocket::connectable("b", "B")).unwrap();
        node.add_input(InputSocket::control(toggle("c"))).unwrap();
        node.add_output(OutputSocket::new("out", "A"));

        let size = node.compute_size(&layout);
        let expected = 2.0 * layout.slot_height
            + layout.widget_height
            + layout.widget_spacing
            + layout.bottom_padding;
        assert!((size.height - expected).abs() < 1e-4);
    }

    #[test]
    fn test_result_bearing_outputs() {
        assert!(OutputSocket::new("output", "IMAGE").is_result_bearing());
        assert!(!OutputSocket::new("LATENT", "LATENT").is_result_bearing());
    }
}
