//! Output (iopub) messages published by a kernel.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// MIME type of the plain text representation.
pub const TEXT_PLAIN: &str = "text/plain";

/// Mapping from a content type to its representation of a value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MimeBundle(BTreeMap<String, Value>);

impl MimeBundle {
    /// Create an empty bundle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a bundle holding only a `text/plain` representation.
    #[must_use]
    pub fn text_plain_only(text: impl Into<String>) -> Self {
        let mut bundle = Self::new();
        bundle.insert(TEXT_PLAIN, Value::String(text.into()));
        bundle
    }

    /// Set the representation for a MIME type.
    pub fn insert(&mut self, mime: impl Into<String>, value: Value) {
        self.0.insert(mime.into(), value);
    }

    /// Get the representation for a MIME type.
    #[must_use]
    pub fn get(&self, mime: &str) -> Option<&Value> {
        self.0.get(mime)
    }

    /// The `text/plain` representation, if present and a string.
    #[must_use]
    pub fn text_plain(&self) -> Option<&str> {
        self.get(TEXT_PLAIN).and_then(Value::as_str)
    }
}

/// Header identifying a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageHeader {
    /// Unique message identifier.
    pub msg_id: String,
}

impl MessageHeader {
    /// Header with a fresh random id.
    #[must_use]
    pub fn new() -> Self {
        Self {
            msg_id: Uuid::new_v4().to_string(),
        }
    }
}

impl Default for MessageHeader {
    fn default() -> Self {
        Self::new()
    }
}

/// Kernel execution state reported on iopub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionState {
    Busy,
    Idle,
    Starting,
}

/// Typed iopub message body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "msg_type", content = "content", rename_all = "snake_case")]
pub enum IopubContent {
    /// Kernel status change.
    Status { execution_state: ExecutionState },
    /// Code being executed, re-broadcast for other frontends.
    ExecuteInput { code: String, execution_count: u32 },
    /// Value produced by a successful execution.
    ExecuteResult {
        execution_count: u32,
        data: MimeBundle,
        #[serde(default)]
        metadata: Value,
    },
    /// Rich output produced during execution.
    DisplayData {
        data: MimeBundle,
        #[serde(default)]
        metadata: Value,
    },
    /// Text written to stdout or stderr.
    Stream { name: String, text: String },
    /// Exception raised during execution.
    Error {
        ename: String,
        evalue: String,
        #[serde(default)]
        traceback: Vec<String>,
    },
}

impl IopubContent {
    /// Wire name of the message kind.
    #[must_use]
    pub const fn msg_type(&self) -> &'static str {
        match self {
            Self::Status { .. } => "status",
            Self::ExecuteInput { .. } => "execute_input",
            Self::ExecuteResult { .. } => "execute_result",
            Self::DisplayData { .. } => "display_data",
            Self::Stream { .. } => "stream",
            Self::Error { .. } => "error",
        }
    }
}

/// A message published on a kernel's iopub channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IopubMessage {
    pub header: MessageHeader,
    /// Header of the request that caused this message, if any.
    #[serde(default)]
    pub parent_header: Option<MessageHeader>,
    #[serde(flatten)]
    pub content: IopubContent,
}

impl IopubMessage {
    /// Create a message in reply to the request `parent_msg_id`.
    #[must_use]
    pub fn reply_to(parent_msg_id: Option<&str>, content: IopubContent) -> Self {
        Self {
            header: MessageHeader::new(),
            parent_header: parent_msg_id.map(|id| MessageHeader {
                msg_id: id.to_string(),
            }),
            content,
        }
    }

    /// Id of the originating request.
    #[must_use]
    pub fn parent_msg_id(&self) -> Option<&str> {
        self.parent_header.as_ref().map(|h| h.msg_id.as_str())
    }

    /// MIME bundle of an `execute_result`, `None` for any other kind.
    #[must_use]
    pub const fn execute_result(&self) -> Option<&MimeBundle> {
        match &self.content {
            IopubContent::ExecuteResult { data, .. } => Some(data),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execute_result_from_wire_json() {
        let json = r#"{
            "header": {"msg_id": "abc"},
            "parent_header": {"msg_id": "req-1"},
            "msg_type": "execute_result",
            "content": {
                "execution_count": 3,
                "data": {"text/plain": "'/opt/conda'", "text/html": "<b>x</b>"},
                "metadata": {}
            }
        }"#;

        let msg: IopubMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg.content.msg_type(), "execute_result");
        assert_eq!(msg.parent_msg_id(), Some("req-1"));
        assert_eq!(
            msg.execute_result().and_then(MimeBundle::text_plain),
            Some("'/opt/conda'")
        );
    }

    #[test]
    fn test_non_result_has_no_bundle() {
        let msg = IopubMessage::reply_to(
            None,
            IopubContent::Stream {
                name: "stdout".into(),
                text: "hi".into(),
            },
        );
        assert!(msg.execute_result().is_none());
        assert!(msg.parent_msg_id().is_none());
    }

    #[test]
    fn test_text_plain_requires_string() {
        let mut bundle = MimeBundle::new();
        bundle.insert(TEXT_PLAIN, serde_json::json!(["not", "a", "string"]));
        assert!(bundle.text_plain().is_none());
    }
}
