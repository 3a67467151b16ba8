//! Node Editor - schema-driven graph nodes for a remote execution backend
//!
//! The backend describes its node types at runtime. This crate turns those
//! descriptions into editable graph nodes and routes the backend's results
//! back through the graph:
//!
//! - `WidgetRegistry`: decides per input between a socket and an inline control
//! - `NodeBuilder`: applies a backend schema to a node and sizes it
//! - `ResultRouter`: stores results on result-bearing outputs and fans them out
//! - `SnapshotHooks`: role-specific fields on top of the generic node record
//! - `GraphEditor`: the facade a host UI talks to
//!
//! # Example
//!
//! ```ignore
//! use node_editor::{EditorConfig, ExecutionResult, GraphEditor, NodeTypeCatalog};
//!
//! let catalog = NodeTypeCatalog::from_object_info(&object_info)?;
//! let mut editor = GraphEditor::new(catalog, EditorConfig::default());
//!
//! let save = editor.add_node("SaveImage")?;
//! let gallery = editor.add_node("ui/gallery")?;
//! editor.connect(save, 0, gallery, 0)?;
//!
//! editor.deliver(&ExecutionResult::new(save, payload));
//! ```

pub mod builder;
pub mod catalog;
pub mod config;
pub mod editor;
pub mod error;
pub mod events;
pub mod graph;
pub mod node;
pub mod plan;
pub mod router;
pub mod schema;
pub mod snapshot;
pub mod types;
pub mod widgets;

// Re-export key types
pub use builder::NodeBuilder;
pub use catalog::NodeTypeCatalog;
pub use config::{ConfigError, EditorConfig, LayoutMetrics, WidgetDefaults};
pub use editor::GraphEditor;
pub use error::{EditorError, Result};
pub use events::{ChannelEventSink, EditorEvent, EventError, EventSink, NullEventSink, VecEventSink};
pub use graph::Graph;
pub use node::{
    BackendNode, Capabilities, GalleryMode, GalleryNode, GraphNode, InputKind, InputSocket, NodeRole,
    OutputSocket, ReceiveError, ResultReceiver, UnresolvedNode, GALLERY_NODE_TYPE, REROUTE_NODE_TYPE,
};
pub use plan::{ExecutionPlan, PlanInput, PlanNode};
pub use router::{DeliveryReport, ExecutionInbox, ExecutionResult, ResultRouter};
pub use schema::{InputOptions, InputSpec, InputType, NodeTypeSchema, OutputSpec, SchemaInputs};
pub use snapshot::{InputRecord, NodeRecord, OutputRecord, SerializedGraph, SerializedLink, SnapshotHooks, CONTROLS_FIELD, TAGS_FIELD};
pub use types::{Link, LinkId, NodeId, Size, SlotIndex, RESULT_SINK_TYPES, RESULT_TYPE};
pub use widgets::{ControlKind, InlineControl, Resolution, Widget, WidgetFactory, WidgetFactoryFn, WidgetRegistry, WidgetRequest};
