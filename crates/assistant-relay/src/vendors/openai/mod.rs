//! OpenAI Assistants API integration.
//!
//! Vendor-specific wire details live here so the relay itself only sees the
//! `AssistantService` trait.
mod adapter;
mod config;
pub(crate) mod transport;

pub use adapter::OpenAiAssistantsClient;
pub use config::{ASSISTANTS_BETA_HEADER, OpenAiAssistantsConfig};
