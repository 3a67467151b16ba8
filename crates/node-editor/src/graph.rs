//! Node and link tables
//!
//! The graph owns every [`Link`]. Sockets only record link ids so that a
//! node can find its peers through the graph without holding references
//! to them.

use std::collections::BTreeMap;

use crate::error::{EditorError, Result};
use crate::node::{GraphNode, NodeRole};
use crate::types::{types_compatible, Link, LinkId, NodeId, SlotIndex};

/// The editor's node graph
#[derive(Debug, Default)]
pub struct Graph {
    nodes: BTreeMap<NodeId, GraphNode>,
    links: BTreeMap<LinkId, Link>,
    last_node_id: NodeId,
    last_link_id: LinkId,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve the next unused node id
    pub fn next_node_id(&mut self) -> NodeId {
        self.last_node_id += 1;
        self.last_node_id
    }

    pub fn last_node_id(&self) -> NodeId {
        self.last_node_id
    }

    pub fn last_link_id(&self) -> LinkId {
        self.last_link_id
    }

    /// Insert a node under its own id, replacing any node with that id
    pub fn add_node(&mut self, node: GraphNode) -> NodeId {
        let id = node.id;
        self.last_node_id = self.last_node_id.max(id);
        if self.nodes.insert(id, node).is_some() {
            log::warn!("Replaced existing node {}", id);
        }
        id
    }

    pub fn node(&self, id: NodeId) -> Option<&GraphNode> {
        self.nodes.get(&id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut GraphNode> {
        self.nodes.get_mut(&id)
    }

    /// Nodes in id order
    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes.values()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn link(&self, id: LinkId) -> Option<&Link> {
        self.links.get(&id)
    }

    /// Links in id order
    pub fn links(&self) -> impl Iterator<Item = &Link> {
        self.links.values()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// Remove a node and every link touching it
    pub fn remove_node(&mut self, id: NodeId) -> Option<GraphNode> {
        let node = self.nodes.get(&id)?;
        let link_ids: Vec<LinkId> = node
            .inputs
            .iter()
            .filter_map(|input| input.link)
            .chain(node.outputs.iter().flat_map(|output| output.links.iter().copied()))
            .collect();

        for link_id in link_ids {
            // A self-link shows up twice
            let _ = self.disconnect(link_id);
        }

        let removed = self.nodes.remove(&id);
        log::debug!("Removed node {}", id);
        removed
    }

    /// Link an output to an input.
    ///
    /// The target input must be a socket rather than an inline control, and
    /// the types must match unless either side is the wildcard. A link
    /// already feeding the target input is replaced.
    pub fn connect(
        &mut self,
        origin_id: NodeId,
        origin_slot: SlotIndex,
        target_id: NodeId,
        target_slot: SlotIndex,
    ) -> Result<LinkId> {
        let origin = self.nodes.get(&origin_id).ok_or(EditorError::NodeNotFound(origin_id))?;
        let output = origin.outputs.get(origin_slot).ok_or(EditorError::InvalidSlot {
            node_id: origin_id,
            slot: origin_slot,
            direction: "output",
        })?;
        let source_type = output.type_name.clone();

        let target = self.nodes.get(&target_id).ok_or(EditorError::NodeNotFound(target_id))?;
        let input = target.inputs.get(target_slot).ok_or(EditorError::InvalidSlot {
            node_id: target_id,
            slot: target_slot,
            direction: "input",
        })?;
        if !input.is_connectable() {
            return Err(EditorError::NotConnectable {
                node_id: target_id,
                input: input.name.clone(),
            });
        }
        if !types_compatible(&source_type, &input.type_name) {
            return Err(EditorError::IncompatibleTypes {
                source_type,
                target_type: input.type_name.clone(),
            });
        }

        if let Some(existing) = input.link {
            self.disconnect(existing)?;
        }

        self.last_link_id += 1;
        let link = Link {
            id: self.last_link_id,
            origin_id,
            origin_slot,
            target_id,
            target_slot,
            type_name: source_type,
        };
        self.attach(link)
    }

    /// Remove a link and clear it from both endpoint sockets
    pub fn disconnect(&mut self, link_id: LinkId) -> Result<Link> {
        let link = self.links.remove(&link_id).ok_or(EditorError::LinkNotFound(link_id))?;

        if let Some(output) = self
            .nodes
            .get_mut(&link.origin_id)
            .and_then(|node| node.outputs.get_mut(link.origin_slot))
        {
            output.links.retain(|id| *id != link_id);
        }
        if let Some(input) = self
            .nodes
            .get_mut(&link.target_id)
            .and_then(|node| node.inputs.get_mut(link.target_slot))
        {
            if input.link == Some(link_id) {
                input.link = None;
            }
        }
        Ok(link)
    }

    /// The link feeding an input, if any
    pub fn input_link(&self, node_id: NodeId, slot: SlotIndex) -> Option<&Link> {
        let link_id = self.nodes.get(&node_id)?.inputs.get(slot)?.link?;
        self.links.get(&link_id)
    }

    /// Nodes fed by an output, in the order their links were made
    pub fn output_nodes(&self, node_id: NodeId, slot: SlotIndex) -> Vec<NodeId> {
        let Some(output) = self.nodes.get(&node_id).and_then(|node| node.outputs.get(slot)) else {
            return Vec::new();
        };
        output
            .links
            .iter()
            .filter_map(|link_id| self.links.get(link_id))
            .map(|link| link.target_id)
            .collect()
    }

    /// Follow reroute nodes upstream from a link to the output that really feeds it
    pub fn resolve_origin(&self, link: &Link) -> Option<(NodeId, SlotIndex)> {
        let mut current = (link.origin_id, link.origin_slot);
        for _ in 0..=self.nodes.len() {
            let node = self.nodes.get(&current.0)?;
            if !matches!(node.role, NodeRole::Reroute) {
                return Some(current);
            }
            let upstream = self.input_link(current.0, 0)?;
            current = (upstream.origin_id, upstream.origin_slot);
        }
        log::warn!("Reroute cycle reached from link {}", link.id);
        None
    }

    /// Re-insert a persisted link.
    ///
    /// Runs the same structural checks as [`connect`](Self::connect) but not
    /// the type check, so a graph saved against older schemas still loads.
    /// A later link into an already linked input replaces the earlier one.
    pub(crate) fn restore_link(&mut self, link: Link) -> Result<LinkId> {
        if self.links.contains_key(&link.id) {
            return Err(EditorError::DuplicateLink(link.id));
        }
        let origin_ok = self
            .nodes
            .get(&link.origin_id)
            .is_some_and(|node| link.origin_slot < node.outputs.len());
        let input = self
            .nodes
            .get(&link.target_id)
            .and_then(|node| node.inputs.get(link.target_slot));
        let Some(input) = input.filter(|_| origin_ok) else {
            return Err(EditorError::LinkNotFound(link.id));
        };
        if !input.is_connectable() {
            return Err(EditorError::NotConnectable {
                node_id: link.target_id,
                input: input.name.clone(),
            });
        }
        if let Some(existing) = input.link {
            log::warn!("Link {} replaces link {} into node {}", link.id, existing, link.target_id);
            self.disconnect(existing)?;
        }

        self.last_link_id = self.last_link_id.max(link.id);
        self.attach(link)
    }

    pub(crate) fn set_last_ids(&mut self, last_node_id: NodeId, last_link_id: LinkId) {
        self.last_node_id = self.last_node_id.max(last_node_id);
        self.last_link_id = self.last_link_id.max(last_link_id);
    }

    fn attach(&mut self, link: Link) -> Result<LinkId> {
        let id = link.id;
        let output = self
            .nodes
            .get_mut(&link.origin_id)
            .and_then(|node| node.outputs.get_mut(link.origin_slot))
            .ok_or(EditorError::NodeNotFound(link.origin_id))?;
        output.links.push(id);

        let input = self
            .nodes
            .get_mut(&link.target_id)
            .and_then(|node| node.inputs.get_mut(link.target_slot))
            .ok_or(EditorError::NodeNotFound(link.target_id))?;
        input.link = Some(id);

        self.links.insert(id, link);
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{InputSocket, OutputSocket};
    use crate::widgets::{ControlKind, InlineControl};
    use serde_json::json;

    fn source(id: NodeId) -> GraphNode {
        let mut node = GraphNode::backend(id, "VAEDecode");
        node.add_output(OutputSocket::new("IMAGE", "IMAGE"));
        node
    }

    fn sink(id: NodeId) -> GraphNode {
        let mut node = GraphNode::backend(id, "SaveImage");
        node.add_input(InputSocket::connectable("images", "IMAGE")).unwrap();
        node.add_input(InputSocket::control(InlineControl::new(
            "filename_prefix",
            "STRING",
            ControlKind::Text { multiline: false },
            json!("ComfyUI"),
        )))
        .unwrap();
        node
    }

    #[test]
    fn test_connect_records_link_on_both_ends() {
        let mut graph = Graph::new();
        graph.add_node(source(1));
        graph.add_node(sink(2));

        let link_id = graph.connect(1, 0, 2, 0).unwrap();
        assert_eq!(graph.node(1).unwrap().outputs[0].links, vec![link_id]);
        assert_eq!(graph.node(2).unwrap().inputs[0].link, Some(link_id));
        assert_eq!(graph.link(link_id).unwrap().type_name, "IMAGE");
        assert_eq!(graph.output_nodes(1, 0), vec![2]);
    }

    #[test]
    fn test_connect_rejects_bad_targets() {
        let mut graph = Graph::new();
        graph.add_node(source(1));
        graph.add_node(sink(2));
        let mut latent = GraphNode::backend(3, "LatentUpscale");
        latent.add_input(InputSocket::connectable("samples", "LATENT")).unwrap();
        graph.add_node(latent);

        assert!(matches!(graph.connect(1, 0, 2, 1), Err(EditorError::NotConnectable { .. })));
        assert!(matches!(graph.connect(1, 0, 3, 0), Err(EditorError::IncompatibleTypes { .. })));
        assert!(matches!(graph.connect(1, 4, 2, 0), Err(EditorError::InvalidSlot { direction: "output", .. })));
        assert!(matches!(graph.connect(1, 0, 9, 0), Err(EditorError::NodeNotFound(9))));
        assert_eq!(graph.link_count(), 0);
    }

    #[test]
    fn test_new_link_replaces_existing_input_link() {
        let mut graph = Graph::new();
        graph.add_node(source(1));
        graph.add_node(source(2));
        graph.add_node(sink(3));

        let first = graph.connect(1, 0, 3, 0).unwrap();
        let second = graph.connect(2, 0, 3, 0).unwrap();
        assert!(graph.link(first).is_none());
        assert!(graph.node(1).unwrap().outputs[0].links.is_empty());
        assert_eq!(graph.node(3).unwrap().inputs[0].link, Some(second));
    }

    #[test]
    fn test_fan_out_order_and_removal() {
        let mut graph = Graph::new();
        graph.add_node(source(1));
        for id in [4, 2, 3] {
            graph.add_node(sink(id));
            graph.connect(1, 0, id, 0).unwrap();
        }
        assert_eq!(graph.output_nodes(1, 0), vec![4, 2, 3]);

        let removed = graph.remove_node(2).unwrap();
        assert_eq!(removed.id, 2);
        assert_eq!(graph.output_nodes(1, 0), vec![4, 3]);
        assert_eq!(graph.link_count(), 2);

        graph.remove_node(1).unwrap();
        assert_eq!(graph.link_count(), 0);
        assert!(graph.node(4).unwrap().inputs[0].link.is_none());
        assert!(graph.remove_node(1).is_none());
    }

    #[test]
    fn test_wildcard_and_reroute_resolution() {
        let mut graph = Graph::new();
        graph.add_node(source(1));
        graph.add_node(GraphNode::reroute(2));
        graph.add_node(GraphNode::reroute(3));
        graph.add_node(sink(4));

        graph.connect(1, 0, 2, 0).unwrap();
        graph.connect(2, 0, 3, 0).unwrap();
        let link_id = graph.connect(3, 0, 4, 0).unwrap();

        let link = graph.link(link_id).unwrap().clone();
        assert_eq!(graph.resolve_origin(&link), Some((1, 0)));

        graph.remove_node(1);
        assert_eq!(graph.resolve_origin(&link), None);
    }

    #[test]
    fn test_restore_link_keeps_link_invariants() {
        let mut graph = Graph::new();
        graph.add_node(source(1));
        graph.add_node(sink(2));
        let link = |id, target_slot| Link {
            id,
            origin_id: 1,
            origin_slot: 0,
            target_id: 2,
            target_slot,
            type_name: "IMAGE".into(),
        };

        assert!(matches!(graph.restore_link(link(1, 1)), Err(EditorError::NotConnectable { .. })));
        assert!(graph.node(2).unwrap().inputs[1].link.is_none());

        graph.restore_link(link(2, 0)).unwrap();
        assert!(matches!(graph.restore_link(link(2, 0)), Err(EditorError::DuplicateLink(2))));
        assert_eq!(graph.node(1).unwrap().outputs[0].links, vec![2]);

        graph.restore_link(link(3, 0)).unwrap();
        assert_eq!(graph.link_count(), 1);
        assert_eq!(graph.node(1).unwrap().outputs[0].links, vec![3]);
        assert_eq!(graph.node(2).unwrap().inputs[0].link, Some(3));
    }

    #[test]
    fn test_ids_are_monotonic() {
        let mut graph = Graph::new();
        graph.add_node(source(7));
        assert_eq!(graph.next_node_id(), 8);
        graph.set_last_ids(3, 12);
        assert_eq!(graph.last_node_id(), 8);
        assert_eq!(graph.last_link_id(), 12);
    }
}
