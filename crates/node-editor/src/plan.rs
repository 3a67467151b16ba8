//! Execution plans
//!
//! The backend runs a flat mapping from node id to `{class_type, inputs}`.
//! Each input value is either a literal or a link written as
//! `[source_node_id, output_slot]`, where the id is a string.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::graph::Graph;
use crate::node::{GraphNode, InputKind, NodeRole};
use crate::snapshot::SerializedGraph;
use crate::types::NodeId;

/// One backend node in a plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanNode {
    pub class_type: String,
    #[serde(default)]
    pub inputs: Map<String, Value>,
}

/// A resolved graph ready to be queued on the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionPlan {
    pub output: BTreeMap<NodeId, PlanNode>,
    /// The editor document the plan was made from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow: Option<SerializedGraph>,
}

/// One resolved input, read back from a plan
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlanInput<'a> {
    Link { node: &'a str, slot: u64 },
    Literal(&'a Value),
}

impl<'a> PlanInput<'a> {
    /// A two-element array of a string and a whole, non-negative number is a
    /// link (`1.0` counts as slot 1); anything else is a literal.
    pub fn classify(value: &'a Value) -> Self {
        if let Some([Value::String(node), slot]) = value.as_array().map(Vec::as_slice) {
            if let Some(slot) = slot_index(slot) {
                return PlanInput::Link { node, slot };
            }
        }
        PlanInput::Literal(value)
    }
}

fn slot_index(value: &Value) -> Option<u64> {
    if let Some(slot) = value.as_u64() {
        return Some(slot);
    }
    let slot = value.as_f64()?;
    (slot >= 0.0 && slot.fract() == 0.0 && slot <= u64::MAX as f64).then_some(slot as u64)
}

impl ExecutionPlan {
    /// Plan entries in id order
    pub fn nodes(&self) -> impl Iterator<Item = (&NodeId, &PlanNode)> {
        self.output.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.output.is_empty()
    }
}

impl Graph {
    /// Resolve the graph into an execution plan.
    ///
    /// Only backend nodes become plan entries. With a tag, a node is kept
    /// when it is untagged or carries that tag. Controls contribute their
    /// values; linked sockets contribute the upstream backend output after
    /// following reroutes; unlinked sockets are left out.
    pub fn to_plan(&self, tag: Option<&str>) -> ExecutionPlan {
        let output = self
            .nodes()
            .filter(|node| matches!(node.role, NodeRole::Backend(_)))
            .filter(|node| match tag {
                Some(tag) => node.tags().is_empty() || node.has_tag(tag),
                None => true,
            })
            .map(|node| (node.id, self.plan_node(node)))
            .collect();

        ExecutionPlan {
            output,
            workflow: Some(self.serialize()),
        }
    }

    fn plan_node(&self, node: &GraphNode) -> PlanNode {
        let mut inputs = Map::new();
        for (slot, input) in node.inputs.iter().enumerate() {
            match &input.kind {
                InputKind::Control(control) => {
                    inputs.insert(input.name.clone(), control.value.clone());
                }
                InputKind::Connectable => {
                    let origin = self
                        .input_link(node.id, slot)
                        .and_then(|link| self.resolve_origin(link))
                        .filter(|(origin_id, _)| {
                            self.node(*origin_id)
                                .is_some_and(|origin| matches!(origin.role, NodeRole::Backend(_)))
                        });
                    match origin {
                        Some((origin_id, origin_slot)) => {
                            inputs.insert(
                                input.name.clone(),
                                Value::Array(vec![Value::from(origin_id.to_string()), Value::from(origin_slot)]),
                            );
                        }
                        None if input.link.is_some() => {
                            log::debug!(
                                "Input '{}' of node {} is not fed by a backend node, leaving it out",
                                input.name,
                                node.id
                            );
                        }
                        None => {}
                    }
                }
            }
        }
        PlanNode {
            class_type: node.type_name.clone(),
            inputs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{InputSocket, OutputSocket};
    use crate::widgets::{ControlKind, InlineControl};
    use serde_json::json;

    fn loader(id: NodeId) -> GraphNode {
        let mut node = GraphNode::backend(id, "LoadImage");
        node.add_input(InputSocket::control(InlineControl::new(
            "image",
            "COMBO",
            ControlKind::Choice {
                values: vec!["cat.png".into()],
            },
            json!("cat.png"),
        )))
        .unwrap();
        node.add_output(OutputSocket::new("IMAGE", "IMAGE"));
        node
    }

    fn saver(id: NodeId) -> GraphNode {
        let mut node = GraphNode::backend(id, "SaveImage");
        node.add_input(InputSocket::connectable("images", "IMAGE")).unwrap();
        node
    }

    #[test]
    fn test_plan_resolves_links_through_reroutes() {
        let mut graph = Graph::new();
        graph.add_node(loader(1));
        graph.add_node(GraphNode::reroute(2));
        graph.add_node(saver(3));
        graph.add_node(GraphNode::gallery(4));
        graph.connect(1, 0, 2, 0).unwrap();
        graph.connect(2, 0, 3, 0).unwrap();
        graph.connect(1, 0, 4, 0).unwrap();

        let plan = graph.to_plan(None);
        assert_eq!(plan.output.len(), 2);
        assert_eq!(plan.output[&1].inputs["image"], json!("cat.png"));
        assert_eq!(plan.output[&3].class_type, "SaveImage");
        assert_eq!(plan.output[&3].inputs["images"], json!(["1", 0]));

        let json = serde_json::to_value(&plan).unwrap();
        assert_eq!(json["output"]["3"]["inputs"]["images"], json!(["1", 0]));
        assert!(json["workflow"]["nodes"].is_array());
    }

    #[test]
    fn test_unlinked_sockets_are_omitted() {
        let mut graph = Graph::new();
        graph.add_node(saver(1));
        let plan = graph.to_plan(None);
        assert!(plan.output[&1].inputs.is_empty());
    }

    #[test]
    fn test_tag_selects_subsection() {
        let mut graph = Graph::new();
        graph.add_node(loader(1));
        let mut upscale = saver(2);
        upscale.set_tags(vec!["upscale".into()]);
        graph.add_node(upscale);
        let mut preview = saver(3);
        preview.set_tags(vec!["preview".into()]);
        graph.add_node(preview);

        let ids: Vec<NodeId> = graph.to_plan(Some("upscale")).output.keys().copied().collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(graph.to_plan(None).output.len(), 3);
    }

    #[test]
    fn test_classify_inputs() {
        let link = json!(["5", 1]);
        assert_eq!(PlanInput::classify(&link), PlanInput::Link { node: "5", slot: 1 });

        let float_slot = json!(["5", 2.0]);
        assert_eq!(PlanInput::classify(&float_slot), PlanInput::Link { node: "5", slot: 2 });
        for literal in [
            json!(42),
            json!("euler"),
            json!([5, 1]),
            json!(["5", "x"]),
            json!(["a", 1, 2]),
            json!(["5", 1.5]),
            json!(["5", -1]),
        ] {
            assert_eq!(PlanInput::classify(&literal), PlanInput::Literal(&literal));
        }
    }
}
