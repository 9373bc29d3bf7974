use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::StreamExt as _;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{Instrument as _, debug, info, info_span};

use crate::codec;
use crate::errors::{FrameError, RelayError};
use crate::frame::Frame;
use crate::relay::{RelayTarget, relay_run};
use crate::service::{AssistantService, FilePurpose, FileUpload, NewMessage};
use crate::wait::WaitPolicy;

/// Default number of frames buffered between the producer task and the response body.
pub const DEFAULT_FRAME_BUFFER_CAPACITY: usize = 32;

/// One client submission against a thread.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Submission {
    /// Existing thread to continue. `None` or blank starts a new thread.
    pub thread_id: Option<String>,
    pub message: String,
    /// Optional attachment. An empty file is treated as absent.
    pub file: Option<FileUpload>,
}

impl Submission {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn thread_id(mut self, thread_id: impl Into<String>) -> Self {
        self.thread_id = Some(thread_id.into());
        self
    }

    pub fn file(mut self, file: FileUpload) -> Self {
        self.file = Some(file);
        self
    }
}

/// Entry point: turns submissions into relayed frame streams.
#[derive(Clone)]
pub struct AssistantRelay {
    service: Arc<dyn AssistantService>,
    assistant_id: Option<String>,
    wait_policy: WaitPolicy,
    buffer_capacity: usize,
}

impl AssistantRelay {
    pub fn builder() -> AssistantRelayBuilder {
        AssistantRelayBuilder::default()
    }

    /// Creates the user message, starts the run and returns the frame stream.
    ///
    /// Everything up to run creation happens before the first frame exists, so
    /// a failure here is returned as `Err` rather than as an `error` frame. A
    /// missing assistant id fails before any remote call is made.
    pub async fn submit(&self, submission: Submission) -> Result<FrameStream, RelayError> {
        let assistant_id = self
            .assistant_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| RelayError::Config("assistant id is not set".into()))?;

        if submission.message.trim().is_empty() {
            return Err(RelayError::Validation("message must not be empty".into()));
        }
        let existing_thread = submission
            .thread_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty());
        let file = submission.file.filter(|file| !file.is_empty());

        let thread_id = match existing_thread {
            Some(id) => id,
            None => {
                let id = self.service.create_thread().await?;
                info!(thread_id = %id, "created thread");
                id
            }
        };

        let mut message = NewMessage::user(submission.message);
        if let Some(file) = file {
            let file_name = file.file_name.clone();
            let file_id = self
                .service
                .upload_file(file, FilePurpose::Assistants)
                .await?;
            debug!(%thread_id, %file_id, %file_name, "uploaded attachment");
            message = message.with_file(file_id);
        }

        let user_message_id = self.service.create_message(&thread_id, message).await?;
        let run = self.service.create_run(&thread_id, assistant_id).await?;
        info!(
            %thread_id,
            message_id = %user_message_id,
            run_id = %run.id,
            status = %run.status,
            "started run"
        );

        let target = RelayTarget {
            thread_id,
            run_id: run.id,
            user_message_id,
        };
        Ok(self.spawn_relay(target))
    }

    fn spawn_relay(&self, target: RelayTarget) -> FrameStream {
        let (tx, rx) = mpsc::channel(self.buffer_capacity);
        let service = self.service.clone();
        let policy = self.wait_policy.clone();
        let span = info_span!(
            "relay",
            request_id = %uuid::Uuid::new_v4(),
            thread_id = %target.thread_id,
            run_id = %target.run_id,
        );
        let task_target = target.clone();

        let task = tokio::spawn(
            async move {
                tokio::select! {
                    _ = tx.closed() => {
                        debug!("frame receiver closed; relay stopped");
                    }
                    result = relay_run(service.as_ref(), &policy, &task_target, &tx) => {
                        match result {
                            Ok(()) => debug!("relay finished"),
                            Err(err) => debug!(error = %err, "relay stopped early"),
                        }
                    }
                }
            }
            .instrument(span),
        );

        FrameStream {
            target,
            rx,
            task,
        }
    }
}

/// Builder for `AssistantRelay`.
pub struct AssistantRelayBuilder {
    service: Option<Arc<dyn AssistantService>>,
    assistant_id: Option<String>,
    wait_policy: WaitPolicy,
    buffer_capacity: usize,
}

impl Default for AssistantRelayBuilder {
    fn default() -> Self {
        Self {
            service: None,
            assistant_id: None,
            wait_policy: WaitPolicy::default(),
            buffer_capacity: DEFAULT_FRAME_BUFFER_CAPACITY,
        }
    }
}

impl AssistantRelayBuilder {
    pub fn service(mut self, service: Arc<dyn AssistantService>) -> Self {
        self.service = Some(service);
        self
    }

    /// Assistant to run. Left unset, every submission fails with a config error.
    pub fn assistant_id(mut self, assistant_id: Option<String>) -> Self {
        self.assistant_id = assistant_id;
        self
    }

    pub fn wait_policy(mut self, policy: WaitPolicy) -> Self {
        self.wait_policy = policy;
        self
    }

    pub fn buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity;
        self
    }

    pub fn build(self) -> Result<AssistantRelay, RelayError> {
        let service = self
            .service
            .ok_or_else(|| RelayError::Config("no assistant service registered".into()))?;
        if self.buffer_capacity == 0 {
            return Err(RelayError::Config(
                "frame buffer capacity must be greater than 0".into(),
            ));
        }
        Ok(AssistantRelay {
            service,
            assistant_id: self.assistant_id,
            wait_policy: self.wait_policy,
            buffer_capacity: self.buffer_capacity,
        })
    }
}

/// Frames produced for one submission, in order.
///
/// Dropping the stream stops the producer task, including any pending poll
/// sleep or in-flight service request.
pub struct FrameStream {
    target: RelayTarget,
    rx: mpsc::Receiver<Frame>,
    task: JoinHandle<()>,
}

impl FrameStream {
    pub fn thread_id(&self) -> &str {
        &self.target.thread_id
    }

    /// Id of the user message that triggered the run.
    pub fn message_id(&self) -> &str {
        &self.target.user_message_id
    }

    pub fn run_id(&self) -> &str {
        &self.target.run_id
    }

    pub async fn next_frame(&mut self) -> Option<Frame> {
        self.rx.recv().await
    }

    /// Encodes every frame for an outgoing response body.
    pub fn into_byte_stream(
        self,
    ) -> impl futures::Stream<Item = Result<Bytes, FrameError>> + Send + 'static {
        self.map(|frame| codec::encode(&frame))
    }
}

impl futures::Stream for FrameStream {
    type Item = Frame;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Frame>> {
        self.rx.poll_recv(cx)
    }
}

impl Drop for FrameStream {
    fn drop(&mut self) {
        self.task.abort();
    }
}
