//! Error types for the node editor core

use thiserror::Error;

use crate::types::{LinkId, NodeId, SlotIndex};

/// Result type alias using EditorError
pub type Result<T> = std::result::Result<T, EditorError>;

/// Errors that can occur while building, wiring or persisting editor nodes
#[derive(Debug, Error)]
pub enum EditorError {
    /// A schema is missing one of its mandatory sections
    #[error("Node schema is missing its '{0}' section")]
    MissingSchemaSection(&'static str),

    /// A schema could not be decoded at all
    #[error("Invalid node schema for '{node_type}': {message}")]
    InvalidSchema { node_type: String, message: String },

    /// No schema or client constructor is known for this type
    #[error("Unknown node type: {0}")]
    UnknownNodeType(String),

    /// Building a node failed; the node is still present in the graph
    #[error("Node {node_id} was only partially built: {source}")]
    NodeBuild {
        node_id: NodeId,
        #[source]
        source: Box<EditorError>,
    },

    /// Two inputs on one node share a name
    #[error("Node already has an input named '{0}'")]
    DuplicateInput(String),

    /// Node lookup failed
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// Link lookup failed
    #[error("Link not found: {0}")]
    LinkNotFound(LinkId),

    /// A link id is already in use
    #[error("Link id already in use: {0}")]
    DuplicateLink(LinkId),

    /// Slot index out of range
    #[error("Node {node_id} has no {direction} slot {slot}")]
    InvalidSlot {
        node_id: NodeId,
        slot: SlotIndex,
        direction: &'static str,
    },

    /// Target input is backed by an inline control and cannot take a link
    #[error("Input '{input}' on node {node_id} is an inline control, not a socket")]
    NotConnectable { node_id: NodeId, input: String },

    /// Link endpoints carry incompatible types
    #[error("Cannot connect {source_type} to {target_type}")]
    IncompatibleTypes {
        source_type: String,
        target_type: String,
    },

    /// A control rejected an edited value
    #[error("Invalid value for control '{control}': {message}")]
    InvalidControlValue { control: String, message: String },

    /// A backend status message could not be interpreted
    #[error("Malformed execution message: {0}")]
    MalformedMessage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EditorError {
    /// Create an invalid-schema error with a message
    pub fn invalid_schema(node_type: impl Into<String>, message: impl ToString) -> Self {
        Self::InvalidSchema {
            node_type: node_type.into(),
            message: message.to_string(),
        }
    }

    /// Create an invalid-control-value error with a message
    pub fn invalid_value(control: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidControlValue {
            control: control.into(),
            message: message.into(),
        }
    }
}
