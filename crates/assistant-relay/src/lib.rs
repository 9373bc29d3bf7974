//! Relays assistant thread runs to clients as a framed byte stream.
//!
//! A submission posts the user's message to an assistant thread, starts a run
//! and returns immediately with a [`FrameStream`]. A background task waits for
//! the run and then writes `assistant_message` frames followed by one
//! `control_data` frame. When the run fails, the `control_data` frame is
//! followed by a single `error` frame instead.
//! Clients decode the stream incrementally with [`StreamConsumer`] and fold it
//! into a [`ClientChatState`].
//!
//! Vendor-specific services are namespaced under `vendors::*`.
//!
//! # Relaying a submission (OpenAI)
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use assistant_relay::prelude::*;
//! use assistant_relay::vendors::openai::OpenAiAssistantsClient;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), RelayError> {
//! let relay = AssistantRelay::builder()
//!     .service(Arc::new(OpenAiAssistantsClient::from_env()?))
//!     .assistant_id(std::env::var("OPENAI_ASSISTANT_ID").ok())
//!     .build()?;
//!
//! let mut frames = relay.submit(Submission::new("Summarize section 2")).await?;
//! while let Some(frame) = frames.next_frame().await {
//!     println!("{}", frame.kind());
//! }
//! # Ok(())
//! # }
//! ```

/// Producer entry point: submission, relay builder and frame stream.
pub mod assistant;
/// Client-side chat state driven by decoded frames.
pub mod chat_state;
/// HTTP client for a relay endpoint.
pub mod client;
/// Line-delimited wire codec for frames.
pub mod codec;
/// Incremental frame decoding over chunked byte streams.
pub mod consumer;
/// Public error types.
pub mod errors;
/// Frame model shared by producer and consumer.
pub mod frame;
/// Common imports for typical usage.
pub mod prelude;
/// Turning finished runs into frames.
pub mod relay;
/// Assistant service contract and thread/run types.
pub mod service;
/// Vendor-specific service implementations.
pub mod vendors;
/// Run status polling.
pub mod wait;

#[cfg(test)]
mod testing;

pub use assistant::{
    AssistantRelay, AssistantRelayBuilder, DEFAULT_FRAME_BUFFER_CAPACITY, FrameStream, Submission,
};
pub use chat_state::{ChatStatus, ClientChatState, DisplayedMessage};
pub use client::ChatClient;
pub use codec::{FrameDecoder, RECORD_DELIMITER};
pub use consumer::StreamConsumer;
pub use errors::{FrameError, RelayError, RunFailure, ServiceError};
pub use frame::{AssistantMessage, ControlData, Frame, FrameKind};
pub use relay::{MessageRelay, RelayTarget, relay_run};
pub use service::{
    AssistantService, ContentPart, FilePurpose, FileUpload, ListOrder, MessageRole, NewMessage,
    Run, RunStatus, ThreadMessage,
};
pub use wait::{DEFAULT_MAX_POLL_ATTEMPTS, RUN_POLL_INTERVAL, RunWaiter, WaitPolicy};
