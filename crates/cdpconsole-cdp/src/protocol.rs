//! CDP protocol types and message definitions.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Method names used by the console streamer.
pub mod methods {
    pub const RUNTIME_ENABLE: &str = "Runtime.enable";
    pub const CONSOLE_ENABLE: &str = "Console.enable";
    pub const LOG_ENABLE: &str = "Log.enable";
    pub const GET_PROPERTIES: &str = "Runtime.getProperties";

    pub const CONSOLE_API_CALLED: &str = "Runtime.consoleAPICalled";
    pub const EXCEPTION_THROWN: &str = "Runtime.exceptionThrown";
    pub const LOG_ENTRY_ADDED: &str = "Log.entryAdded";

    /// Domains activated at connect, in id order.
    pub const ACTIVATION: [&str; 3] = [RUNTIME_ENABLE, CONSOLE_ENABLE, LOG_ENABLE];
}

/// CDP request message.
#[derive(Debug, Serialize)]
pub struct CdpRequest<'a> {
    pub id: u64,
    pub method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// CDP error in response.
#[derive(Debug, Clone, Deserialize)]
pub struct CdpErrorResponse {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
    pub data: Option<Value>,
}

/// Keeps an explicit JSON `null` as `Some(Value::Null)`.
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

// ============================================================================
// Runtime Types
// ============================================================================

/// Remote object from Runtime domain.
///
/// `value` distinguishes an absent field from an explicit `null`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteObject {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub object_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<ObjectPreview>,
}

impl RemoteObject {
    pub fn is_object(&self) -> bool {
        self.object_type.as_deref() == Some("object")
    }
}

/// Possibly truncated summary of an object's properties.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectPreview {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub object_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub overflow: bool,
    #[serde(default)]
    pub properties: Vec<PropertyPreview>,
}

/// One property inside an [`ObjectPreview`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyPreview {
    #[serde(default = "unnamed")]
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub property_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_preview: Option<ObjectPreview>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,
}

/// Property descriptor returned by `Runtime.getProperties`.
///
/// Accessor properties carry no `value` and are skipped when materializing.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDescriptor {
    #[serde(default = "unnamed")]
    pub name: String,
    #[serde(default)]
    pub value: Option<RemoteObject>,
}

/// Result payload of `Runtime.getProperties`.
#[derive(Debug, Clone, Deserialize)]
pub struct GetPropertiesResult {
    pub result: Option<Vec<PropertyDescriptor>>,
}

fn unnamed() -> String {
    "?".to_string()
}

/// Exception details from Runtime.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionDetails {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub exception: Option<RemoteObject>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub line_number: Option<i64>,
    #[serde(default)]
    pub column_number: Option<i64>,
}

// ============================================================================
// Events
// ============================================================================

/// `Runtime.consoleAPICalled` parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct ConsoleApiCalled {
    #[serde(rename = "type", default = "default_console_type")]
    pub kind: String,
    #[serde(default)]
    pub args: Vec<RemoteObject>,
}

fn default_console_type() -> String {
    "log".to_string()
}

/// `Runtime.exceptionThrown` parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionThrown {
    #[serde(default)]
    pub exception_details: ExceptionDetails,
}

impl ExceptionThrown {
    /// Exception description, else the details text, else `Unknown error`.
    pub fn message(&self) -> &str {
        let details = &self.exception_details;
        details
            .exception
            .as_ref()
            .and_then(|e| e.description.as_deref())
            .or(details.text.as_deref())
            .unwrap_or("Unknown error")
    }
}

/// `Log.entryAdded` parameters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogEntryAdded {
    #[serde(default)]
    pub entry: LogEntry,
}

/// Entry of the Log domain.
#[derive(Debug, Clone, Deserialize)]
pub struct LogEntry {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub source: Option<String>,
}

impl Default for LogEntry {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            text: String::new(),
            source: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// A frame that did not resolve a pending request, classified for dispatch.
#[derive(Debug, Clone)]
pub enum Incoming {
    /// Reply whose id is not (or no longer) tracked, e.g. activation replies.
    OrphanReply { id: u64 },
    ConsoleCall(ConsoleApiCalled),
    Exception(ExceptionThrown),
    LogEntry(LogEntryAdded),
    Unknown { method: String },
}

impl Incoming {
    /// Classify a parsed frame by its method name.
    ///
    /// Fails only when a known event carries params of the wrong shape.
    pub fn classify(frame: Value) -> Result<Self, serde_json::Error> {
        let Value::Object(mut frame) = frame else {
            return Ok(Incoming::Unknown {
                method: String::new(),
            });
        };

        let method = match frame.remove("method") {
            Some(Value::String(method)) => method,
            _ => {
                return Ok(match frame.get("id").and_then(Value::as_u64) {
                    Some(id) => Incoming::OrphanReply { id },
                    None => Incoming::Unknown {
                        method: String::new(),
                    },
                });
            }
        };

        let params = frame
            .remove("params")
            .filter(|p| !p.is_null())
            .unwrap_or_else(|| Value::Object(Map::new()));

        Ok(match method.as_str() {
            methods::CONSOLE_API_CALLED => Incoming::ConsoleCall(serde_json::from_value(params)?),
            methods::EXCEPTION_THROWN => Incoming::Exception(serde_json::from_value(params)?),
            methods::LOG_ENTRY_ADDED => Incoming::LogEntry(serde_json::from_value(params)?),
            _ => Incoming::Unknown { method },
        })
    }
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
