//! Wire shapes of the Assistants API and their mapping onto service types.

use crate::errors::ServiceError;
use crate::service::{ContentPart, MessageRole, NewMessage, Run, RunStatus, ThreadMessage};

#[derive(Debug, serde::Deserialize)]
pub(crate) struct IdObject {
    pub id: String,
}

#[derive(Debug, serde::Deserialize)]
pub(crate) struct RunObject {
    pub id: String,
    pub status: String,
}

#[derive(Debug, serde::Deserialize)]
pub(crate) struct MessageObject {
    pub id: String,
    pub role: MessageRole,
    #[serde(default)]
    pub content: Vec<serde_json::Value>,
}

#[derive(Debug, serde::Deserialize)]
pub(crate) struct MessagePage {
    pub data: Vec<MessageObject>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub last_id: Option<String>,
}

pub(crate) fn map_run(run: RunObject) -> Result<Run, ServiceError> {
    let status = RunStatus::parse(&run.status).ok_or_else(|| {
        ServiceError::protocol(format!("run {} has unknown status {:?}", run.id, run.status))
    })?;
    Ok(Run { id: run.id, status })
}

pub(crate) fn map_message(message: MessageObject) -> ThreadMessage {
    ThreadMessage {
        id: message.id,
        role: message.role,
        content: message.content.iter().map(map_content_part).collect(),
    }
}

pub(crate) fn map_content_part(value: &serde_json::Value) -> ContentPart {
    let kind = value.get("type").and_then(|v| v.as_str()).unwrap_or("");
    match kind {
        "text" => {
            let text = value
                .get("text")
                .and_then(|t| t.get("value"))
                .and_then(|v| v.as_str())
                .unwrap_or_default();
            ContentPart::Text(text.to_string())
        }
        "image_file" => ContentPart::ImageFile {
            file_id: value
                .get("image_file")
                .and_then(|f| f.get("file_id"))
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
        },
        "image_url" => ContentPart::ImageUrl {
            url: value
                .get("image_url")
                .and_then(|f| f.get("url"))
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
        },
        other => ContentPart::Other {
            kind: other.to_string(),
        },
    }
}

pub(crate) fn build_message_body(message: &NewMessage) -> serde_json::Value {
    let mut body = serde_json::json!({
        "role": message.role.as_str(),
        "content": message.text,
    });
    if !message.file_ids.is_empty() {
        body["attachments"] = message
            .file_ids
            .iter()
            .map(|file_id| {
                serde_json::json!({
                    "file_id": file_id,
                    "tools": [{ "type": "file_search" }],
                })
            })
            .collect();
    }
    body
}

pub(crate) fn build_run_body(assistant_id: &str) -> serde_json::Value {
    serde_json::json!({ "assistant_id": assistant_id })
}

/// Pulls `error.message` out of an API error body, falling back to the raw text.
pub(crate) fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(ToOwned::to_owned)
        })
        .unwrap_or_else(|| body.trim().to_string())
}
