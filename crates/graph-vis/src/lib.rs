//! Graph Visualizer - Graphviz text for editor graphs and execution plans
//!
//! Two entry points, both pure:
//!
//! - [`workflow_to_graphviz`]: one edge per link of a saved graph, between
//!   `"{id}_{title}"` labels
//! - [`plan_to_graphviz`]: one edge per resolved plan input, from the source
//!   node's title for links and from a `"{id}-{input}-{value}"` label for
//!   literal values
//!
//! Titles are looked up through an explicit [`TitleLookup`] passed in by
//! the caller. The output always opens with `digraph {` and ends with `}`,
//! even when there are no edges.

use node_editor::{ExecutionPlan, Graph, NodeId, PlanInput, SerializedGraph, SerializedLink};
use serde_json::Value;

const HEADER: &str = "digraph {\n";
const FOOTER: &str = "}";

/// Finds node titles by id
pub trait TitleLookup {
    /// The node's title, falling back to its type when the title is empty.
    /// `None` when there is no such node.
    fn node_title(&self, id: NodeId) -> Option<String>;
}

impl TitleLookup for SerializedGraph {
    fn node_title(&self, id: NodeId) -> Option<String> {
        let node = self.node(id)?;
        Some(
            node.title
                .clone()
                .filter(|title| !title.is_empty())
                .unwrap_or_else(|| node.type_name.clone()),
        )
    }
}

impl TitleLookup for Graph {
    fn node_title(&self, id: NodeId) -> Option<String> {
        let node = self.node(id)?;
        Some(if node.title.is_empty() {
            node.type_name.clone()
        } else {
            node.title.clone()
        })
    }
}

/// Lookup for a plan saved without its workflow
struct NoTitles;

impl TitleLookup for NoTitles {
    fn node_title(&self, _id: NodeId) -> Option<String> {
        None
    }
}

/// Types that render themselves as Graphviz text
pub trait ToGraphviz {
    fn to_graphviz(&self) -> String;
}

impl ToGraphviz for SerializedGraph {
    fn to_graphviz(&self) -> String {
        workflow_to_graphviz(self)
    }
}

impl ToGraphviz for ExecutionPlan {
    /// Titles come from the plan's embedded workflow, when present
    fn to_graphviz(&self) -> String {
        match &self.workflow {
            Some(workflow) => plan_to_graphviz(self, workflow),
            None => plan_to_graphviz(self, &NoTitles),
        }
    }
}

/// `"Title (id)"` for a node, or just the id when the node is unknown
pub fn node_info(lookup: &dyn TitleLookup, id: NodeId) -> String {
    match lookup.node_title(id) {
        Some(title) => format!("{} ({})", title, id),
        None => id.to_string(),
    }
}

/// Render every link of a saved graph as an edge
pub fn workflow_to_graphviz(workflow: &SerializedGraph) -> String {
    let mut out = String::from(HEADER);

    for SerializedLink(_, origin_id, _, target_id, _, _) in &workflow.links {
        out.push_str(&format!(
            "\"{}_{}\" -> \"{}_{}\"\n",
            origin_id,
            escape_dot(&title_or_id(workflow, *origin_id)),
            target_id,
            escape_dot(&title_or_id(workflow, *target_id)),
        ));
    }

    out.push_str(FOOTER);
    log::debug!("Rendered {} workflow links", workflow.links.len());
    out
}

/// Render every resolved input of a plan as an edge into its node
pub fn plan_to_graphviz(plan: &ExecutionPlan, lookup: &dyn TitleLookup) -> String {
    let mut out = String::from(HEADER);

    for (id, node) in &plan.output {
        let target = escape_dot(&title_or_id(lookup, *id));

        for (input_name, value) in &node.inputs {
            let source = match PlanInput::classify(value) {
                PlanInput::Link { node: source_id, .. } => match source_id.parse::<NodeId>() {
                    Ok(source_id) => title_or_id(lookup, source_id),
                    Err(_) => source_id.to_string(),
                },
                PlanInput::Literal(literal) => format!("{}-{}-{}", id, input_name, literal_text(literal)),
            };
            out.push_str(&format!("\"{}\" -> \"{}\"\n", escape_dot(&source), target));
        }
    }

    out.push_str(FOOTER);
    out
}

fn title_or_id(lookup: &dyn TitleLookup, id: NodeId) -> String {
    lookup.node_title(id).unwrap_or_else(|| id.to_string())
}

/// Label text for a literal input value.
///
/// Whole floats drop their fraction, arrays are joined with `,` and objects
/// collapse to a fixed marker, so labels match what the web client prints.
fn literal_text(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => number_text(number),
        Value::String(text) => text.clone(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => literal_text(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

fn number_text(number: &serde_json::Number) -> String {
    match number.as_f64() {
        Some(n) if number.is_f64() && n.fract() == 0.0 => {
            if n == 0.0 {
                "0".to_string()
            } else {
                format!("{:.0}", n)
            }
        }
        _ => number.to_string(),
    }
}

/// Escape a string for a quoted Graphviz label
fn escape_dot(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn workflow(value: Value) -> SerializedGraph {
        serde_json::from_value(value).unwrap()
    }

    fn two_nodes() -> SerializedGraph {
        workflow(json!({
            "last_node_id": 2,
            "last_link_id": 1,
            "nodes": [
                {"id": 1, "type": "LoadImage", "title": "A"},
                {"id": 2, "type": "SaveImage", "title": "B"}
            ],
            "links": [[1, 1, 0, 2, 0, "IMAGE"]]
        }))
    }

    fn plan(value: Value) -> ExecutionPlan {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_empty_inputs_render_empty_block() {
        let empty = workflow(json!({"nodes": [], "links": []}));
        assert_eq!(workflow_to_graphviz(&empty), "digraph {\n}");

        let empty_plan = plan(json!({"output": {}}));
        assert_eq!(plan_to_graphviz(&empty_plan, &empty), "digraph {\n}");
        assert_eq!(empty_plan.to_graphviz(), "digraph {\n}");
    }

    #[test]
    fn test_single_link_edge() {
        let graph = two_nodes();
        assert_eq!(workflow_to_graphviz(&graph), "digraph {\n\"1_A\" -> \"2_B\"\n}");
        assert_eq!(graph.to_graphviz(), workflow_to_graphviz(&graph));
    }

    #[test]
    fn test_literal_and_link_inputs() {
        let lookup = workflow(json!({
            "nodes": [
                {"id": 4, "type": "CheckpointLoaderSimple", "title": "Loader"},
                {"id": 5, "type": "KSampler", "title": "Sampler"}
            ],
            "links": []
        }));
        let plan = plan(json!({
            "output": {
                "5": {
                    "class_type": "KSampler",
                    "inputs": {"seed": 42, "model": ["4", 0], "sampler_name": "euler"}
                }
            }
        }));

        let text = plan_to_graphviz(&plan, &lookup);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "digraph {",
                "\"5-seed-42\" -> \"Sampler\"",
                "\"Loader\" -> \"Sampler\"",
                "\"5-sampler_name-euler\" -> \"Sampler\"",
                "}",
            ]
        );
    }

    #[test]
    fn test_missing_titles_fall_back() {
        let lookup = workflow(json!({
            "nodes": [{"id": 1, "type": "VAEDecode"}],
            "links": [[3, 1, 0, 9, 0, "IMAGE"]]
        }));
        assert_eq!(workflow_to_graphviz(&lookup), "digraph {\n\"1_VAEDecode\" -> \"9_9\"\n}");
        assert_eq!(node_info(&lookup, 1), "VAEDecode (1)");
        assert_eq!(node_info(&lookup, 9), "9");
    }

    #[test]
    fn test_labels_are_escaped() {
        let graph = workflow(json!({
            "nodes": [
                {"id": 1, "type": "A", "title": "say \"hi\""},
                {"id": 2, "type": "B", "title": "C:\\out"}
            ],
            "links": [[1, 1, 0, 2, 0, "*"]]
        }));
        assert_eq!(
            workflow_to_graphviz(&graph),
            "digraph {\n\"1_say \\\"hi\\\"\" -> \"2_C:\\\\out\"\n}"
        );
    }

    #[test]
    fn test_plan_uses_embedded_workflow() {
        let mut plan = plan(json!({
            "output": {"2": {"class_type": "SaveImage", "inputs": {"images": ["1", 0]}}}
        }));
        assert_eq!(plan.to_graphviz(), "digraph {\n\"1\" -> \"2\"\n}");

        plan.workflow = Some(two_nodes());
        assert_eq!(plan.to_graphviz(), "digraph {\n\"A\" -> \"B\"\n}");
    }

    #[test]
    fn test_live_graph_lookup() {
        let mut graph = Graph::new();
        graph.add_node(node_editor::GraphNode::backend(3, "KSampler"));
        assert_eq!(node_info(&graph, 3), "KSampler (3)");
    }

    #[test]
    fn test_literal_labels() {
        assert_eq!(literal_text(&json!(8.0)), "8");
        assert_eq!(literal_text(&json!(-0.0)), "0");
        assert_eq!(literal_text(&json!(0.75)), "0.75");
        assert_eq!(literal_text(&json!(42)), "42");
        assert_eq!(literal_text(&json!([1, 2.0, "a"])), "1,2,a");
        assert_eq!(literal_text(&json!([1, null, [2, 3]])), "1,,2,3");
        assert_eq!(literal_text(&json!({"k": 1})), "[object Object]");
        assert_eq!(literal_text(&json!(true)), "true");

        let plan = plan(json!({
            "output": {"5": {"class_type": "KSampler", "inputs": {"cfg": 8.0}}}
        }));
        assert_eq!(plan.to_graphviz(), "digraph {\n\"5-cfg-8\" -> \"5\"\n}");
    }
}
