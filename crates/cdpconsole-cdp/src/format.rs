//! Console argument formatting.

use serde_json::Value;

use crate::materializer::{Materializer, PrintableNode, TRUNCATION_VALUE};
use crate::protocol::RemoteObject;

/// Class names that are not worth a `[ClassName]` header.
const GENERIC_CLASSES: [&str; 2] = ["Object", "Array"];

/// One formatted argument.
///
/// Complex arguments are multi-line blocks printed below the console line;
/// simple ones are joined into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedArg {
    pub text: String,
    pub complex: bool,
}

impl FormattedArg {
    fn simple(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            complex: false,
        }
    }

    fn complex(text: String) -> Self {
        Self {
            text,
            complex: true,
        }
    }
}

/// Formats event arguments through the materializer.
pub struct ArgFormatter {
    materializer: Materializer,
    max_depth: u32,
}

impl ArgFormatter {
    pub fn new(materializer: Materializer, max_depth: u32) -> Self {
        Self {
            materializer,
            max_depth,
        }
    }

    pub async fn format(&self, arg: &RemoteObject) -> FormattedArg {
        let node = self.materializer.materialize(arg, self.max_depth).await;
        render(&node)
    }
}

/// Render a materialized node as console text.
pub fn render(node: &PrintableNode) -> FormattedArg {
    match node {
        PrintableNode::Inline(value) if value.is_object() || value.is_array() => {
            FormattedArg::complex(pretty(value))
        }
        PrintableNode::Inline(value) => FormattedArg::simple(scalar_text(value)),
        PrintableNode::Text(text) => FormattedArg::simple(text.as_str()),
        PrintableNode::Truncated => FormattedArg::simple(TRUNCATION_VALUE),
        PrintableNode::Map { class_name, .. } => {
            let body = pretty(&node.to_json());
            match class_name.as_deref() {
                Some(class) if !class.is_empty() && !GENERIC_CLASSES.contains(&class) => {
                    FormattedArg::complex(format!("[{}]\n{}", class, body))
                }
                _ => FormattedArg::complex(body),
            }
        }
    }
}

/// Two-space indented JSON; non-ASCII is kept as-is.
fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
