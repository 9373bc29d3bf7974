use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use assistant_relay::vendors::openai::OpenAiAssistantsConfig;
use assistant_relay::{DEFAULT_MAX_POLL_ATTEMPTS, WaitPolicy};
use clap::{Args, Parser, Subcommand};

/// Default request body limit for `POST /api/assistant`.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

/// Loads `.env` from the crate directory, then from the working directory.
pub fn load_dotenv() {
    let _ = dotenvy::from_path(Path::new(env!("CARGO_MANIFEST_DIR")).join(".env"));
    dotenvy::dotenv().ok();
}

#[derive(Debug, Parser)]
#[command(name = "assistant-relay-server", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve `POST /api/assistant`.
    Serve(ServeArgs),
    /// Send one message to a running relay and print the conversation.
    Chat(ChatArgs),
}

#[derive(Clone, Debug, Args)]
pub struct ServeArgs {
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: String,

    /// Assistant to run. Requests fail with a config error while it is unset.
    #[arg(long, env = "OPENAI_ASSISTANT_ID")]
    pub assistant_id: Option<String>,

    #[arg(
        long,
        env = "OPENAI_BASE_URL",
        default_value = "https://api.openai.com"
    )]
    pub base_url: String,

    #[arg(long, env = "OPENAI_TIMEOUT_SECS", default_value_t = 60)]
    pub timeout_secs: u64,

    #[arg(long, env = "RELAY_BIND", default_value = "127.0.0.1:3000")]
    pub bind: SocketAddr,

    /// Run status checks before giving up. `0` polls until the run settles.
    #[arg(
        long,
        env = "RELAY_POLL_MAX_ATTEMPTS",
        default_value_t = DEFAULT_MAX_POLL_ATTEMPTS
    )]
    pub poll_max_attempts: u32,

    #[arg(
        long,
        env = "RELAY_MAX_UPLOAD_BYTES",
        default_value_t = DEFAULT_MAX_UPLOAD_BYTES
    )]
    pub max_upload_bytes: usize,
}

impl ServeArgs {
    pub fn openai_config(&self) -> OpenAiAssistantsConfig {
        OpenAiAssistantsConfig::new(self.api_key.clone())
            .base_url(self.base_url.clone())
            .timeout(Duration::from_secs(self.timeout_secs))
    }

    pub fn wait_policy(&self) -> WaitPolicy {
        match self.poll_max_attempts {
            0 => WaitPolicy::default().unbounded(),
            attempts => WaitPolicy::default().with_max_attempts(attempts),
        }
    }
}

#[derive(Clone, Debug, Args)]
pub struct ChatArgs {
    /// Message text to send.
    pub message: String,

    /// Continue an existing thread.
    #[arg(long)]
    pub thread_id: Option<String>,

    /// File to attach to the message.
    #[arg(long)]
    pub file: Option<PathBuf>,

    #[arg(
        long,
        env = "RELAY_ENDPOINT",
        default_value = "http://127.0.0.1:3000/api/assistant"
    )]
    pub endpoint: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn serve_args(extra: &[&str]) -> ServeArgs {
        let mut argv = vec!["assistant-relay-server", "serve", "--api-key", "sk-test"];
        argv.extend_from_slice(extra);
        match Cli::try_parse_from(argv).expect("parse").command {
            Command::Serve(args) => args,
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn zero_poll_attempts_means_unbounded() {
        let args = serve_args(&["--poll-max-attempts", "0"]);
        assert_eq!(args.wait_policy().max_attempts, None);

        let args = serve_args(&["--poll-max-attempts", "5"]);
        assert_eq!(args.wait_policy().max_attempts, Some(5));
    }

    #[test]
    fn openai_config_uses_flags() {
        let args = serve_args(&[
            "--base-url",
            "http://localhost:9999",
            "--timeout-secs",
            "7",
        ]);
        let config = args.openai_config();
        assert_eq!(config.base_url, "http://localhost:9999");
        assert_eq!(config.timeout, Duration::from_secs(7));
        assert_eq!(config.api_key, "sk-test");
    }

    #[test]
    fn chat_takes_message_and_optional_thread() {
        let cli = Cli::try_parse_from([
            "assistant-relay-server",
            "chat",
            "Summarize section 2",
            "--thread-id",
            "thread_1",
            "--endpoint",
            "http://localhost:3000/api/assistant",
        ])
        .expect("parse");
        let Command::Chat(args) = cli.command else {
            panic!("expected chat command");
        };
        assert_eq!(args.message, "Summarize section 2");
        assert_eq!(args.thread_id.as_deref(), Some("thread_1"));
        assert_eq!(args.file, None);
    }
}
