//! Building nodes from backend schemas
//!
//! [`NodeBuilder::build`] turns a [`NodeTypeSchema`] into sockets and
//! inline controls on an existing [`GraphNode`], then sizes the node.
//! A schema that is missing a section fails that one node only; whatever
//! was attached before the failure stays on the node so it still renders.

use crate::config::EditorConfig;
use crate::error::Result;
use crate::node::{GraphNode, InputSocket, OutputSocket};
use crate::schema::NodeTypeSchema;
use crate::types::{is_result_sink, Size, RESULT_OUTPUT_NAME, RESULT_TYPE};
use crate::widgets::{Resolution, WidgetRegistry};

/// Horizontal scale applied to a schema-built node's natural width
pub const WIDTH_BIAS: f32 = 1.5;

/// Applies backend schemas to nodes
#[derive(Debug, Clone, Copy)]
pub struct NodeBuilder<'a> {
    registry: &'a WidgetRegistry,
    config: &'a EditorConfig,
}

impl<'a> NodeBuilder<'a> {
    pub fn new(registry: &'a WidgetRegistry, config: &'a EditorConfig) -> Self {
        Self { registry, config }
    }

    /// Attach sockets and controls for `schema` to `node` and size it.
    ///
    /// Runs at most once per node; later calls are no-ops.
    pub fn build(&self, node: &mut GraphNode, schema: &NodeTypeSchema) -> Result<()> {
        if node.built {
            log::debug!("Node {} ({}) is already built, skipping", node.id, node.type_name);
            return Ok(());
        }
        node.built = true;

        if let Some(display_name) = schema.display_name.as_deref().filter(|n| !n.is_empty()) {
            node.title = display_name.to_string();
        }

        let mut min_size = Size::new(1.0, 1.0);
        let attached = self.attach_sockets(node, schema, &mut min_size);

        if is_result_sink(&node.type_name) {
            node.add_output(OutputSocket::new(RESULT_OUTPUT_NAME, RESULT_TYPE));
        }

        let natural = node.compute_size(&self.config.layout);
        node.size = Size::new(
            min_size.width.max(natural.width * WIDTH_BIAS),
            min_size.height.max(natural.height),
        );
        node.serialize_controls = false;

        match &attached {
            Ok(()) => log::debug!(
                "Built node {} ({}) with {} inputs and {} outputs",
                node.id,
                node.type_name,
                node.inputs.len(),
                node.outputs.len()
            ),
            Err(e) => log::warn!("Node {} ({}) was only partially built: {}", node.id, node.type_name, e),
        }
        attached
    }

    fn attach_sockets(&self, node: &mut GraphNode, schema: &NodeTypeSchema, min_size: &mut Size) -> Result<()> {
        for (name, spec) in schema.inputs()? {
            match self.registry.resolve(&self.config.widgets, &name, &spec) {
                Resolution::Socket { type_name } => {
                    node.add_input(InputSocket::connectable(name, type_name))?;
                }
                Resolution::Control(widget) => {
                    if let Some(size) = widget.min_size {
                        *min_size = min_size.max(size);
                    }
                    node.add_input(InputSocket::control(widget.control))?;
                }
            }
        }

        for output in schema.outputs()? {
            node.add_output(OutputSocket::new(output.name, output.type_name));
        }
        Ok(())
    }
}
