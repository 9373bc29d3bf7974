//! HTTP endpoint and terminal chat client for `assistant-relay`.

/// Terminal chat command.
pub mod chat;
/// Command line and environment configuration.
pub mod config;
/// Tracing subscriber setup.
pub mod observability;
/// `POST /api/assistant` and its error mapping.
pub mod routes;
/// Relay construction and server bootstrap.
pub mod server;

pub use config::{ChatArgs, Cli, Command, ServeArgs};
pub use routes::{ASSISTANT_PATH, ApiError, router};
