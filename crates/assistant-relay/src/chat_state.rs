use std::fmt;

use tracing::{debug, warn};

use crate::consumer::StreamConsumer;
use crate::errors::RelayError;
use crate::frame::Frame;
use crate::service::MessageRole;

/// Whether the chat is waiting for input or for a response.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ChatStatus {
    #[default]
    AwaitingMessage,
    InProgress,
}

/// A message as shown to the user.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DisplayedMessage {
    /// Empty until the server assigns one.
    pub id: String,
    pub role: MessageRole,
    pub content: String,
}

/// Client-side view of one chat, mutated only by decoded frames.
#[derive(Clone, Debug, Default)]
pub struct ClientChatState {
    messages: Vec<DisplayedMessage>,
    status: ChatStatus,
    error: Option<String>,
    thread_id: Option<String>,
    halted: bool,
}

impl ClientChatState {
    pub fn new() -> Self {
        Self::default()
    }

    /// State for continuing a thread the user picked earlier.
    pub fn resuming(thread_id: impl Into<String>) -> Self {
        Self {
            thread_id: Some(thread_id.into()),
            ..Self::default()
        }
    }

    pub fn messages(&self) -> &[DisplayedMessage] {
        &self.messages
    }

    pub fn status(&self) -> ChatStatus {
        self.status
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Thread to continue on the next submission, once the server has named one.
    pub fn thread_id(&self) -> Option<&str> {
        self.thread_id.as_deref()
    }

    /// Shows the user's message immediately and marks the chat busy.
    pub fn begin_submission(&mut self, text: impl Into<String>) {
        self.messages.push(DisplayedMessage {
            id: String::new(),
            role: MessageRole::User,
            content: text.into(),
        });
        self.status = ChatStatus::InProgress;
        self.error = None;
        self.halted = false;
    }

    /// Applies one decoded frame. Ignored once an `error` frame was applied
    /// for the current response.
    pub fn apply(&mut self, frame: &Frame) {
        if self.halted {
            debug!(kind = %frame.kind(), "ignoring frame after error");
            return;
        }
        match frame {
            Frame::AssistantMessage(message) => {
                self.messages.push(DisplayedMessage {
                    id: message.id.clone(),
                    role: MessageRole::Assistant,
                    content: message.text_segments.join("\n\n"),
                });
            }
            Frame::ControlData(control) => {
                let pending_user_message = self
                    .messages
                    .iter_mut()
                    .rev()
                    .find(|message| message.role == MessageRole::User && message.id.is_empty());
                if let Some(message) = pending_user_message {
                    message.id = control.message_id.clone();
                } else {
                    let message_id = &control.message_id;
                    warn!(%message_id, "control data without a pending user message");
                }
                self.thread_id = Some(control.thread_id.clone());
            }
            Frame::Error { detail } => {
                self.error = Some(detail.clone());
                self.halted = true;
            }
        }
    }

    /// Records a failure that ended the response early. Rendered messages stay.
    pub fn fail(&mut self, error: impl fmt::Display) {
        self.error = Some(error.to_string());
        self.halted = true;
    }

    pub fn finish(&mut self) {
        self.status = ChatStatus::AwaitingMessage;
    }

    /// Drains `consumer`, applying frames in arrival order.
    ///
    /// A decode or transport failure lands in the error slot and is returned;
    /// the status is back to `AwaitingMessage` either way.
    pub async fn consume<S, B, E>(
        &mut self,
        consumer: &mut StreamConsumer<S>,
    ) -> Result<(), RelayError>
    where
        S: futures::Stream<Item = Result<B, E>> + Unpin,
        B: AsRef<[u8]>,
        E: fmt::Display,
    {
        let result = loop {
            match consumer.next_frame().await {
                Ok(Some(frame)) => self.apply(&frame),
                Ok(None) => break Ok(()),
                Err(err) => {
                    warn!(error = %err, "frame stream broke");
                    self.fail(&err);
                    break Err(err);
                }
            }
        };
        self.finish();
        result
    }
}
