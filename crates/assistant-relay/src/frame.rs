use std::fmt;

/// Discriminator of a `Frame`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum FrameKind {
    AssistantMessage,
    ControlData,
    Error,
}

impl FrameKind {
    /// Single-character type code written before the payload.
    pub fn code(self) -> char {
        match self {
            FrameKind::Error => '3',
            FrameKind::AssistantMessage => '4',
            FrameKind::ControlData => '5',
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "3" => Some(FrameKind::Error),
            "4" => Some(FrameKind::AssistantMessage),
            "5" => Some(FrameKind::ControlData),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FrameKind::AssistantMessage => "assistant_message",
            FrameKind::ControlData => "control_data",
            FrameKind::Error => "error",
        }
    }
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One assistant reply. The role is always `assistant`, so it is not stored.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AssistantMessage {
    pub id: String,
    /// Textual content parts, in the order the service returned them.
    pub text_segments: Vec<String>,
}

impl AssistantMessage {
    pub fn new(id: impl Into<String>, text_segments: Vec<String>) -> Self {
        Self {
            id: id.into(),
            text_segments,
        }
    }
}

/// Out-of-band identifiers for the request that opened the stream.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ControlData {
    pub thread_id: String,
    /// Id of the user's triggering message, never an assistant message.
    pub message_id: String,
}

/// One self-delimited unit of the relay protocol.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Frame {
    AssistantMessage(AssistantMessage),
    ControlData(ControlData),
    Error { detail: String },
}

impl Frame {
    pub fn assistant_message(id: impl Into<String>, text_segments: Vec<String>) -> Self {
        Frame::AssistantMessage(AssistantMessage::new(id, text_segments))
    }

    pub fn control_data(thread_id: impl Into<String>, message_id: impl Into<String>) -> Self {
        Frame::ControlData(ControlData {
            thread_id: thread_id.into(),
            message_id: message_id.into(),
        })
    }

    pub fn error(detail: impl Into<String>) -> Self {
        Frame::Error {
            detail: detail.into(),
        }
    }

    pub fn kind(&self) -> FrameKind {
        match self {
            Frame::AssistantMessage(_) => FrameKind::AssistantMessage,
            Frame::ControlData(_) => FrameKind::ControlData,
            Frame::Error { .. } => FrameKind::Error,
        }
    }
}
