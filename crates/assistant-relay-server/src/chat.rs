use std::fmt::Write as _;
use std::path::Path;

use anyhow::Context as _;
use assistant_relay::{ChatClient, ClientChatState, FileUpload, MessageRole};

use crate::config::ChatArgs;

/// Sends one message through a relay endpoint and prints the conversation.
pub async fn run_chat(args: ChatArgs) -> anyhow::Result<()> {
    let mut client = ChatClient::new(args.endpoint.clone())?;
    if let Some(thread_id) = args.thread_id {
        client = client.with_thread(thread_id);
    }
    let file = match args.file.as_deref() {
        Some(path) => Some(read_upload(path).await?),
        None => None,
    };

    let result = client.send(args.message, file).await;
    print!("{}", render_transcript(client.state()));
    result.with_context(|| format!("chat request to {} failed", args.endpoint))
}

async fn read_upload(path: &Path) -> anyhow::Result<FileUpload> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("upload")
        .to_string();
    Ok(FileUpload::new(file_name, bytes))
}

/// Plain-text rendering of the chat state.
pub fn render_transcript(state: &ClientChatState) -> String {
    let mut out = String::new();
    for message in state.messages() {
        let speaker = match message.role {
            MessageRole::User => "you",
            MessageRole::Assistant => "assistant",
        };
        let _ = writeln!(out, "{speaker}> {}", message.content);
    }
    if let Some(error) = state.error() {
        let _ = writeln!(out, "error: {error}");
    }
    if let Some(thread_id) = state.thread_id() {
        let _ = writeln!(out, "(thread {thread_id})");
    }
    out
}
