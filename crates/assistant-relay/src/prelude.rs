//! Common imports for typical relay usage.
pub use crate::{
    AssistantRelay, AssistantRelayBuilder, AssistantService, ChatClient, ClientChatState, Frame,
    FrameKind, FrameStream, RelayError, RunStatus, StreamConsumer, Submission, WaitPolicy,
};
