//! Remote object materialization.
//!
//! Turns a [`RemoteObject`] into a local [`PrintableNode`] tree. Inline values
//! and previews are used as-is; bare object handles are expanded with
//! `Runtime.getProperties`, one hop per level of `max_depth`.
//!
//! Materialization never fails: fetch errors and timeouts become sentinel
//! text nodes.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::{join_all, BoxFuture};
use serde_json::{json, Value};
use tracing::debug;

use crate::correlator::Correlator;
use crate::error::CdpError;
use crate::protocol::{
    methods, GetPropertiesResult, ObjectPreview, PropertyDescriptor, PropertyPreview, RemoteObject,
};

/// Default number of property-fetch hops.
pub const DEFAULT_MAX_DEPTH: u32 = 2;

/// Key of the entry appended to overflowing previews.
pub const TRUNCATION_KEY: &str = "...";

/// Value printed for the truncation entry.
pub const TRUNCATION_VALUE: &str = "(truncated)";

const OBJECT_PLACEHOLDER: &str = "[Object]";
const TIMEOUT_SENTINEL: &str = "[Object: timeout]";

/// Printable tree built from a remote object.
#[derive(Debug, Clone, PartialEq)]
pub enum PrintableNode {
    /// JSON value supplied inline by the protocol.
    Inline(Value),
    /// Description, literal or sentinel text.
    Text(String),
    /// Ordered property mapping.
    Map {
        class_name: Option<String>,
        entries: Vec<(String, PrintableNode)>,
    },
    /// Marks a preview that listed only some properties.
    Truncated,
}

impl PrintableNode {
    pub fn text(text: impl Into<String>) -> Self {
        PrintableNode::Text(text.into())
    }

    /// JSON form, preserving entry order.
    pub fn to_json(&self) -> Value {
        match self {
            PrintableNode::Inline(value) => value.clone(),
            PrintableNode::Text(text) => Value::String(text.clone()),
            PrintableNode::Truncated => Value::String(TRUNCATION_VALUE.to_string()),
            PrintableNode::Map { entries, .. } => Value::Object(
                entries
                    .iter()
                    .map(|(name, node)| (name.clone(), node.to_json()))
                    .collect(),
            ),
        }
    }
}

/// Source of an object's own properties.
#[async_trait]
pub trait PropertySource: Send + Sync {
    async fn get_properties(&self, object_id: &str) -> Result<Vec<PropertyDescriptor>, CdpError>;
}

/// Fetches properties from the debug target through the correlator.
pub struct RemoteProperties {
    correlator: Correlator,
    timeout: Duration,
}

impl RemoteProperties {
    pub fn new(correlator: Correlator, timeout: Duration) -> Self {
        Self {
            correlator,
            timeout,
        }
    }
}

#[async_trait]
impl PropertySource for RemoteProperties {
    async fn get_properties(&self, object_id: &str) -> Result<Vec<PropertyDescriptor>, CdpError> {
        let reply = self
            .correlator
            .send(
                methods::GET_PROPERTIES,
                Some(json!({
                    "objectId": object_id,
                    "ownProperties": true,
                    "generatePreview": true,
                })),
                self.timeout,
            )
            .await?;

        let props: GetPropertiesResult = serde_json::from_value(reply)?;
        props
            .result
            .ok_or_else(|| CdpError::InvalidResponse("Missing property list".to_string()))
    }
}

/// Builds printable trees, fetching nested properties on demand.
pub struct Materializer {
    source: Arc<dyn PropertySource>,
}

impl Materializer {
    pub fn new(source: Arc<dyn PropertySource>) -> Self {
        Self { source }
    }

    /// Resolve `object` into a printable tree.
    ///
    /// Priority: inline value, then (for objects) preview, property fetch
    /// while `max_depth > 0`, description or `[Object]`; otherwise the
    /// description, the `undefined`/`null` literal, or the raw descriptor.
    pub fn materialize<'a>(
        &'a self,
        object: &'a RemoteObject,
        max_depth: u32,
    ) -> BoxFuture<'a, PrintableNode> {
        Box::pin(async move {
            if let Some(value) = &object.value {
                return PrintableNode::Inline(value.clone());
            }

            if object.is_object() {
                if let Some(preview) = &object.preview {
                    return preview_node(preview, object.class_name.clone());
                }
                if let (true, Some(object_id)) = (max_depth > 0, &object.object_id) {
                    return self
                        .fetch(object_id, object.class_name.clone(), max_depth)
                        .await;
                }
                return PrintableNode::text(
                    object.description.as_deref().unwrap_or(OBJECT_PLACEHOLDER),
                );
            }

            if let Some(description) = &object.description {
                return PrintableNode::text(description.as_str());
            }

            match object.object_type.as_deref() {
                Some("undefined") => PrintableNode::text("undefined"),
                Some("null") => PrintableNode::text("null"),
                _ => PrintableNode::text(serde_json::to_string(object).unwrap_or_default()),
            }
        })
    }

    async fn fetch(&self, object_id: &str, class_name: Option<String>, max_depth: u32) -> PrintableNode {
        let properties = match self.source.get_properties(object_id).await {
            Ok(properties) => properties,
            Err(e) if e.is_timeout() => {
                debug!("Property fetch for {} timed out", object_id);
                return PrintableNode::text(TIMEOUT_SENTINEL);
            }
            Err(e) => {
                debug!("Property fetch for {} failed: {}", object_id, e);
                return PrintableNode::Text(format!("[Object: {}]", e));
            }
        };

        let valued: Vec<(&str, &RemoteObject)> = properties
            .iter()
            .filter_map(|p| p.value.as_ref().map(|value| (p.name.as_str(), value)))
            .collect();

        let nodes = join_all(
            valued
                .iter()
                .map(|(_, value)| self.materialize(value, max_depth - 1)),
        )
        .await;

        PrintableNode::Map {
            class_name,
            entries: valued
                .iter()
                .map(|(name, _)| name.to_string())
                .zip(nodes)
                .collect(),
        }
    }
}

fn preview_node(preview: &ObjectPreview, class_name: Option<String>) -> PrintableNode {
    let mut entries: Vec<(String, PrintableNode)> = preview
        .properties
        .iter()
        .map(|p| (p.name.clone(), preview_value(p)))
        .collect();
    if preview.overflow {
        entries.push((TRUNCATION_KEY.to_string(), PrintableNode::Truncated));
    }
    PrintableNode::Map {
        class_name,
        entries,
    }
}

fn preview_value(property: &PropertyPreview) -> PrintableNode {
    match (&property.value, &property.value_preview) {
        (Some(value), _) => PrintableNode::text(value.as_str()),
        (None, Some(nested)) => preview_node(nested, None),
        (None, None) => PrintableNode::text(TRUNCATION_KEY),
    }
}

#[cfg(test)]
#[path = "materializer_tests.rs"]
mod tests;
