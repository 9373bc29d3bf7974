use std::fmt;

use bytes::Bytes;

use crate::errors::ServiceError;

/// Lifecycle state of a run as reported by the assistant service.
///
/// The relay never drives these transitions; it only observes them.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    Completed,
    Cancelling,
    Cancelled,
    Failed,
    Expired,
}

impl RunStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [RunStatus; 7] = [
        RunStatus::Queued,
        RunStatus::InProgress,
        RunStatus::Completed,
        RunStatus::Cancelling,
        RunStatus::Cancelled,
        RunStatus::Failed,
        RunStatus::Expired,
    ];

    /// `queued` and `in_progress` are the only non-terminal states.
    pub fn is_pending(self) -> bool {
        matches!(self, RunStatus::Queued | RunStatus::InProgress)
    }

    /// `completed` is the only success terminal.
    pub fn is_success(self) -> bool {
        self == RunStatus::Completed
    }

    pub fn is_failure(self) -> bool {
        !self.is_pending() && !self.is_success()
    }

    /// Wire name used by the service (`in_progress`, `failed`, ...).
    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Queued => "queued",
            RunStatus::InProgress => "in_progress",
            RunStatus::Completed => "completed",
            RunStatus::Cancelling => "cancelling",
            RunStatus::Cancelled => "cancelled",
            RunStatus::Failed => "failed",
            RunStatus::Expired => "expired",
        }
    }

    /// Parses a wire name. Returns `None` for statuses this crate does not know.
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == value)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A run handle: its id plus the status observed with it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Run {
    pub id: String,
    pub status: RunStatus,
}

/// Author of a thread message.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

/// One content part of a stored thread message.
#[derive(Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum ContentPart {
    /// Plain text.
    Text(String),
    /// Reference to an uploaded image file.
    ImageFile { file_id: String },
    /// External image URL.
    ImageUrl { url: String },
    /// A part kind the relay does not model; kept only by its type tag.
    Other { kind: String },
}

impl ContentPart {
    /// Returns the text when this is a text part.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentPart::Text(text) => Some(text),
            _ => None,
        }
    }
}

/// A message stored on a thread.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ThreadMessage {
    pub id: String,
    pub role: MessageRole,
    pub content: Vec<ContentPart>,
}

impl ThreadMessage {
    /// Text parts in order; every other part kind is dropped.
    pub fn text_segments(&self) -> Vec<String> {
        self.content
            .iter()
            .filter_map(ContentPart::as_text)
            .map(ToOwned::to_owned)
            .collect()
    }
}

/// Input for `AssistantService::create_message`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NewMessage {
    pub role: MessageRole,
    pub text: String,
    /// Uploaded files to attach to the message.
    pub file_ids: Vec<String>,
}

impl NewMessage {
    /// A user message with no attachments.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            text: text.into(),
            file_ids: Vec::new(),
        }
    }

    pub fn with_file(mut self, file_id: impl Into<String>) -> Self {
        self.file_ids.push(file_id.into());
        self
    }
}

/// A file to upload before it is attached to a message.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FileUpload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl FileUpload {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: None,
            bytes: bytes.into(),
        }
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Purpose tag sent with a file upload.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FilePurpose {
    Assistants,
}

impl FilePurpose {
    pub fn as_str(self) -> &'static str {
        match self {
            FilePurpose::Assistants => "assistants",
        }
    }
}

/// Sort order for message listings.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ListOrder {
    Asc,
    Desc,
}

impl ListOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            ListOrder::Asc => "asc",
            ListOrder::Desc => "desc",
        }
    }
}

/// Remote-procedure interface of the external assistant service.
///
/// Threads, messages, runs and files all live on the service side; the relay
/// holds nothing but the identifiers returned here.
#[async_trait::async_trait]
pub trait AssistantService: Send + Sync {
    /// Creates an empty thread and returns its id.
    async fn create_thread(&self) -> Result<String, ServiceError>;

    /// Appends a message to a thread and returns the new message id.
    async fn create_message(
        &self,
        thread_id: &str,
        message: NewMessage,
    ) -> Result<String, ServiceError>;

    /// Starts a run of `assistant_id` against the thread.
    async fn create_run(&self, thread_id: &str, assistant_id: &str) -> Result<Run, ServiceError>;

    /// Fetches the current state of a run.
    async fn get_run(&self, thread_id: &str, run_id: &str) -> Result<Run, ServiceError>;

    /// Lists every message created after `after`, in the requested order.
    async fn list_messages(
        &self,
        thread_id: &str,
        after: &str,
        order: ListOrder,
    ) -> Result<Vec<ThreadMessage>, ServiceError>;

    /// Uploads a file and returns its id.
    async fn upload_file(
        &self,
        file: FileUpload,
        purpose: FilePurpose,
    ) -> Result<String, ServiceError>;
}
