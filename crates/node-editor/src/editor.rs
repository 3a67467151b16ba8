//! The editor facade
//!
//! [`GraphEditor`] ties the pieces together for a host: it owns the graph,
//! the node type catalog, the widget registry, the configuration and the
//! event sink, and exposes the operations a UI performs.

use std::sync::Arc;

use crate::builder::NodeBuilder;
use crate::catalog::NodeTypeCatalog;
use crate::config::EditorConfig;
use crate::error::{EditorError, Result};
use crate::events::{emit, EditorEvent, EventSink, NullEventSink};
use crate::graph::Graph;
use crate::node::{GraphNode, NodeRole, ResultReceiver, UnresolvedNode, GALLERY_NODE_TYPE, REROUTE_NODE_TYPE};
use crate::plan::ExecutionPlan;
use crate::router::{DeliveryReport, ExecutionInbox, ExecutionResult, ResultRouter};
use crate::snapshot::{NodeRecord, SerializedGraph};
use crate::types::{LinkId, NodeId, SlotIndex};
use crate::widgets::WidgetRegistry;

/// A node graph plus everything needed to build and run it
pub struct GraphEditor {
    graph: Graph,
    catalog: NodeTypeCatalog,
    widgets: WidgetRegistry,
    config: EditorConfig,
    events: Arc<dyn EventSink>,
}

impl GraphEditor {
    /// Create an editor with the built-in widgets and no event sink
    pub fn new(catalog: NodeTypeCatalog, config: EditorConfig) -> Self {
        Self {
            graph: Graph::new(),
            catalog,
            widgets: WidgetRegistry::with_builtins(),
            config,
            events: Arc::new(NullEventSink),
        }
    }

    /// Replace the widget registry
    pub fn with_widgets(mut self, widgets: WidgetRegistry) -> Self {
        self.widgets = widgets;
        self
    }

    /// Send editor events to `events`
    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut Graph {
        &mut self.graph
    }

    pub fn catalog(&self) -> &NodeTypeCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn widgets_mut(&mut self) -> &mut WidgetRegistry {
        &mut self.widgets
    }

    /// Add a node of the given type.
    ///
    /// Backend types are built from their catalog schema. A schema that
    /// fails to apply still leaves the partially built node in the graph;
    /// the error names its id.
    pub fn add_node(&mut self, node_type: &str) -> Result<NodeId> {
        // Claimed by add_node below, so unknown types do not burn an id
        let id = self.graph.last_node_id() + 1;

        if let Some(node) = client_node(id, node_type) {
            return Ok(self.graph.add_node(node));
        }

        let schema = self
            .catalog
            .get(node_type)
            .ok_or_else(|| EditorError::UnknownNodeType(node_type.to_string()))?;

        let mut node = GraphNode::backend(id, node_type);
        let built = NodeBuilder::new(&self.widgets, &self.config).build(&mut node, schema);
        self.graph.add_node(node);

        match built {
            Ok(()) => {
                emit(
                    self.events.as_ref(),
                    EditorEvent::NodeBuilt {
                        node_id: id,
                        node_type: node_type.to_string(),
                    },
                );
                Ok(id)
            }
            Err(e) => {
                emit(
                    self.events.as_ref(),
                    EditorEvent::NodeBuildFailed {
                        node_id: id,
                        node_type: node_type.to_string(),
                        error: e.to_string(),
                    },
                );
                Err(EditorError::NodeBuild {
                    node_id: id,
                    source: Box::new(e),
                })
            }
        }
    }

    /// Add a host-provided node that consumes results
    pub fn add_receiver(&mut self, node_type: &str, receiver: Box<dyn ResultReceiver>) -> NodeId {
        let id = self.graph.next_node_id();
        self.graph.add_node(GraphNode::receiver(id, node_type, receiver))
    }

    pub fn remove_node(&mut self, id: NodeId) -> Option<GraphNode> {
        let removed = self.graph.remove_node(id)?;
        emit(self.events.as_ref(), EditorEvent::NodeRemoved { node_id: id });
        Some(removed)
    }

    pub fn connect(
        &mut self,
        origin_id: NodeId,
        origin_slot: SlotIndex,
        target_id: NodeId,
        target_slot: SlotIndex,
    ) -> Result<LinkId> {
        self.graph.connect(origin_id, origin_slot, target_id, target_slot)
    }

    /// Route one execution result
    pub fn deliver(&mut self, result: &ExecutionResult) -> DeliveryReport {
        ResultRouter::new(self.events.as_ref()).deliver(&mut self.graph, result)
    }

    /// Route every result waiting in `inbox`, in arrival order
    pub fn drain(&mut self, inbox: &mut ExecutionInbox) -> Vec<DeliveryReport> {
        inbox
            .drain()
            .iter()
            .map(|result| self.deliver(result))
            .collect()
    }

    /// Snapshot the graph
    pub fn save(&self) -> SerializedGraph {
        self.graph.serialize()
    }

    /// Replace the graph with a saved one.
    ///
    /// Backend nodes are rebuilt from their current schema, client nodes
    /// are recreated, and nodes of unknown types keep their record as is.
    /// Links whose endpoints no longer exist are skipped.
    pub fn load(&mut self, snapshot: &SerializedGraph) {
        let mut graph = Graph::new();
        for record in &snapshot.nodes {
            graph.add_node(self.restore_node(record));
        }

        for link in &snapshot.links {
            let link_id = link.0;
            if let Err(e) = graph.restore_link(link.clone().into()) {
                log::warn!("Skipping link {} on load: {}", link_id, e);
            }
        }

        graph.set_last_ids(snapshot.last_node_id, snapshot.last_link_id);
        log::debug!(
            "Loaded graph with {} nodes and {} links",
            graph.node_count(),
            graph.link_count()
        );
        self.graph = graph;
    }

    /// Parse a saved document and load it
    pub fn load_json(&mut self, json: &str) -> Result<()> {
        let snapshot = SerializedGraph::from_json(json)?;
        self.load(&snapshot);
        Ok(())
    }

    /// Resolve the graph into an execution plan, optionally limited to a tag
    pub fn plan(&self, tag: Option<&str>) -> ExecutionPlan {
        self.graph.to_plan(tag)
    }

    fn restore_node(&self, record: &NodeRecord) -> GraphNode {
        let mut node = if let Some(node) = client_node(record.id, &record.type_name) {
            node
        } else if let Some(schema) = self.catalog.get(&record.type_name) {
            let mut node = GraphNode::backend(record.id, &record.type_name);
            if let Err(e) = NodeBuilder::new(&self.widgets, &self.config).build(&mut node, schema) {
                log::warn!("Restored node {} is degraded: {}", record.id, e);
            }
            node
        } else {
            log::warn!("Node {} has unknown type '{}'", record.id, record.type_name);
            GraphNode::new(record.id, &record.type_name, NodeRole::Unresolved(UnresolvedNode::default()))
        };
        node.configure(record);
        node
    }
}

/// Construct a client-side node type, if `node_type` is one
fn client_node(id: NodeId, node_type: &str) -> Option<GraphNode> {
    match node_type {
        GALLERY_NODE_TYPE => Some(GraphNode::gallery(id)),
        REROUTE_NODE_TYPE => Some(GraphNode::reroute(id)),
        _ => None,
    }
}
