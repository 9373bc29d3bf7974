//! Vendor-specific `AssistantService` implementations.

/// OpenAI Assistants API integration.
pub mod openai;
