use std::time::Duration;

use tracing::debug;

use crate::chat_state::ClientChatState;
use crate::consumer::StreamConsumer;
use crate::errors::RelayError;
use crate::service::FileUpload;

/// HTTP client for a relay endpoint that keeps the chat state in sync with
/// the frames it receives.
pub struct ChatClient {
    http: reqwest::Client,
    endpoint: String,
    state: ClientChatState,
}

impl ChatClient {
    /// Creates a client posting to `endpoint` (for example
    /// `http://127.0.0.1:3000/api/assistant`).
    pub fn new(endpoint: impl Into<String>) -> Result<Self, RelayError> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| RelayError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
            state: ClientChatState::new(),
        })
    }

    /// Continues an existing thread instead of starting a new one.
    pub fn with_thread(mut self, thread_id: impl Into<String>) -> Self {
        self.state = ClientChatState::resuming(thread_id);
        self
    }

    pub fn state(&self) -> &ClientChatState {
        &self.state
    }

    /// Sends one message and applies the streamed response to the state.
    ///
    /// Request and stream failures are recorded in the state's error slot and
    /// also returned. An `error` frame is a complete response: it only shows up
    /// in the state.
    pub async fn send(
        &mut self,
        message: impl Into<String>,
        file: Option<FileUpload>,
    ) -> Result<(), RelayError> {
        let message = message.into();
        self.state.begin_submission(message.clone());

        let mut form = reqwest::multipart::Form::new().text("message", message);
        if let Some(thread_id) = self.state.thread_id() {
            form = form.text("threadId", thread_id.to_string());
        }
        if let Some(file) = file {
            let mut part =
                reqwest::multipart::Part::bytes(file.bytes.to_vec()).file_name(file.file_name);
            if let Some(content_type) = file.content_type {
                part = part.mime_str(&content_type).map_err(|e| {
                    let detail = format!("invalid file content type {content_type:?}: {e}");
                    self.record(RelayError::Validation(detail))
                })?;
            }
            form = form.part("file", part);
        }

        let sent = self.http.post(&self.endpoint).multipart(form).send().await;
        let response = match sent {
            Ok(response) => response,
            Err(e) => {
                let error = RelayError::Transport(format!("request failed: {e}"));
                return Err(self.record(error));
            }
        };
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            let error = RelayError::Transport(format!("relay answered {status}: {body}"));
            return Err(self.record(error));
        }
        debug!(endpoint = %self.endpoint, "reading frame stream");

        let mut consumer = StreamConsumer::new(Box::pin(response.bytes_stream()));
        self.state.consume(&mut consumer).await
    }

    fn record(&mut self, error: RelayError) -> RelayError {
        self.state.fail(&error);
        self.state.finish();
        error
    }
}
