use reqwest::header::{HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::errors::{RelayError, ServiceError};
use crate::service::{
    AssistantService, FilePurpose, FileUpload, ListOrder, NewMessage, Run, ThreadMessage,
};

use super::config::{ASSISTANTS_BETA_HEADER, OpenAiAssistantsConfig};
use super::transport::{
    IdObject, MessagePage, RunObject, build_message_body, build_run_body, error_message,
    map_message, map_run,
};

const MESSAGE_PAGE_LIMIT: &str = "100";

/// `AssistantService` backed by OpenAI's Assistants API (v2).
pub struct OpenAiAssistantsClient {
    client: reqwest::Client,
    config: OpenAiAssistantsConfig,
}

impl OpenAiAssistantsClient {
    /// Creates a client from explicit configuration.
    pub fn new(config: OpenAiAssistantsConfig) -> Result<Self, RelayError> {
        if config.api_key.trim().is_empty() {
            return Err(RelayError::Config(
                "OpenAI assistants config api_key must not be empty".into(),
            ));
        }
        let mut headers = HeaderMap::new();
        headers.insert("openai-beta", HeaderValue::from_static(ASSISTANTS_BETA_HEADER));
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| RelayError::Config(format!("failed to build OpenAI client: {e}")))?;
        Ok(Self { client, config })
    }

    /// Creates a client using `OPENAI_API_KEY`.
    pub fn from_env() -> Result<Self, RelayError> {
        Self::new(OpenAiAssistantsConfig::from_env()?)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        what: &str,
    ) -> Result<T, ServiceError> {
        let response = request
            .bearer_auth(&self.config.api_key)
            .send()
            .await
            .map_err(|e| ServiceError::transport(format!("OpenAI {what} request failed: {e}")))?;
        let status = response.status();
        let body = response.text().await.map_err(|e| {
            ServiceError::transport(format!("failed to read OpenAI {what} response: {e}"))
        })?;
        if !status.is_success() {
            return Err(ServiceError::api(
                format!("OpenAI {what} failed ({status}): {}", error_message(&body)),
                Some(status.as_u16()),
            ));
        }
        serde_json::from_str(&body).map_err(|e| {
            ServiceError::protocol(format!("unexpected OpenAI {what} response: {e}"))
        })
    }
}

#[async_trait::async_trait]
impl AssistantService for OpenAiAssistantsClient {
    async fn create_thread(&self) -> Result<String, ServiceError> {
        let request = self
            .client
            .post(self.config.url("threads"))
            .json(&serde_json::json!({}));
        let thread: IdObject = self.send(request, "create thread").await?;
        debug!(thread_id = %thread.id, "created thread");
        Ok(thread.id)
    }

    async fn create_message(
        &self,
        thread_id: &str,
        message: NewMessage,
    ) -> Result<String, ServiceError> {
        let request = self
            .client
            .post(self.config.url(&format!("threads/{thread_id}/messages")))
            .json(&build_message_body(&message));
        let created: IdObject = self.send(request, "create message").await?;
        Ok(created.id)
    }

    async fn create_run(&self, thread_id: &str, assistant_id: &str) -> Result<Run, ServiceError> {
        let request = self
            .client
            .post(self.config.url(&format!("threads/{thread_id}/runs")))
            .json(&build_run_body(assistant_id));
        map_run(self.send::<RunObject>(request, "create run").await?)
    }

    async fn get_run(&self, thread_id: &str, run_id: &str) -> Result<Run, ServiceError> {
        let request = self
            .client
            .get(self.config.url(&format!("threads/{thread_id}/runs/{run_id}")));
        map_run(self.send::<RunObject>(request, "retrieve run").await?)
    }

    async fn list_messages(
        &self,
        thread_id: &str,
        after: &str,
        order: ListOrder,
    ) -> Result<Vec<ThreadMessage>, ServiceError> {
        let url = self.config.url(&format!("threads/{thread_id}/messages"));
        let mut cursor = (!after.is_empty()).then(|| after.to_string());
        let mut messages = Vec::new();
        loop {
            let mut query = vec![("order", order.as_str()), ("limit", MESSAGE_PAGE_LIMIT)];
            if let Some(cursor) = cursor.as_deref() {
                query.push(("after", cursor));
            }
            let request = self.client.get(&url).query(&query);
            let page: MessagePage = self.send(request, "list messages").await?;
            messages.extend(page.data.into_iter().map(map_message));
            match page.last_id {
                Some(last_id) if page.has_more => cursor = Some(last_id),
                _ => break,
            }
        }
        debug!(thread_id, count = messages.len(), "listed thread messages");
        Ok(messages)
    }

    async fn upload_file(
        &self,
        file: FileUpload,
        purpose: FilePurpose,
    ) -> Result<String, ServiceError> {
        let size = file.bytes.len();
        let mut part =
            reqwest::multipart::Part::bytes(file.bytes.to_vec()).file_name(file.file_name.clone());
        if let Some(content_type) = file.content_type.as_deref() {
            part = part.mime_str(content_type).map_err(|e| {
                ServiceError::protocol(format!("invalid content type {content_type:?}: {e}"))
            })?;
        }
        let form = reqwest::multipart::Form::new()
            .text("purpose", purpose.as_str())
            .part("file", part);
        let request = self.client.post(self.config.url("files")).multipart(form);
        let uploaded: IdObject = self.send(request, "file upload").await?;
        debug!(file_id = %uploaded.id, file_name = %file.file_name, size, "uploaded file");
        Ok(uploaded.id)
    }
}
