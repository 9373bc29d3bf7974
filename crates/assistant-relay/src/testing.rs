//! In-memory `AssistantService` used by the crate's unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::errors::ServiceError;
use crate::service::{
    AssistantService, ContentPart, FilePurpose, FileUpload, ListOrder, MessageRole, NewMessage,
    Run, RunStatus, ThreadMessage,
};

pub(crate) const NEW_THREAD_ID: &str = "thread_new";
pub(crate) const USER_MESSAGE_ID: &str = "msg_user";
pub(crate) const RUN_ID: &str = "run_1";
pub(crate) const FILE_ID: &str = "file_1";

#[derive(Default)]
pub(crate) struct FakeService {
    statuses: Mutex<VecDeque<Result<RunStatus, ServiceError>>>,
    replies: Vec<ThreadMessage>,
    list_error: Option<ServiceError>,
    create_run_error: Option<ServiceError>,
    pub(crate) created_threads: AtomicUsize,
    pub(crate) status_queries: AtomicUsize,
    pub(crate) runs_created: AtomicUsize,
    pub(crate) messages: Mutex<Vec<(String, NewMessage)>>,
    pub(crate) uploads: Mutex<Vec<FileUpload>>,
    pub(crate) listings: Mutex<Vec<(String, String, ListOrder)>>,
}

impl FakeService {
    /// `get_run` answers from `statuses`; the last one repeats.
    pub(crate) fn with_statuses(statuses: Vec<RunStatus>) -> Self {
        Self {
            statuses: Mutex::new(statuses.into_iter().map(Ok).collect()),
            ..Self::default()
        }
    }

    pub(crate) fn status_error(mut self, error: ServiceError) -> Self {
        self.statuses
            .get_mut()
            .expect("statuses lock")
            .push_back(Err(error));
        self
    }

    pub(crate) fn reply(mut self, id: &str, content: Vec<ContentPart>) -> Self {
        self.replies.push(ThreadMessage {
            id: id.to_string(),
            role: MessageRole::Assistant,
            content,
        });
        self
    }

    pub(crate) fn text_reply(self, id: &str, text: &str) -> Self {
        self.reply(id, vec![ContentPart::Text(text.to_string())])
    }

    pub(crate) fn list_error(mut self, error: ServiceError) -> Self {
        self.list_error = Some(error);
        self
    }

    pub(crate) fn create_run_error(mut self, error: ServiceError) -> Self {
        self.create_run_error = Some(error);
        self
    }

    pub(crate) fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl AssistantService for FakeService {
    async fn create_thread(&self) -> Result<String, ServiceError> {
        self.created_threads.fetch_add(1, Ordering::SeqCst);
        Ok(NEW_THREAD_ID.to_string())
    }

    async fn create_message(
        &self,
        thread_id: &str,
        message: NewMessage,
    ) -> Result<String, ServiceError> {
        let entry = (thread_id.to_string(), message);
        self.messages.lock().expect("messages lock").push(entry);
        Ok(USER_MESSAGE_ID.to_string())
    }

    async fn create_run(&self, _thread_id: &str, _assistant_id: &str) -> Result<Run, ServiceError> {
        self.runs_created.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = &self.create_run_error {
            return Err(err.clone());
        }
        Ok(Run {
            id: RUN_ID.to_string(),
            status: RunStatus::Queued,
        })
    }

    async fn get_run(&self, _thread_id: &str, run_id: &str) -> Result<Run, ServiceError> {
        self.status_queries.fetch_add(1, Ordering::SeqCst);
        let mut statuses = self.statuses.lock().expect("statuses lock");
        let next = if statuses.len() > 1 {
            statuses.pop_front().expect("non-empty")
        } else {
            statuses
                .front()
                .cloned()
                .unwrap_or(Ok(RunStatus::Completed))
        };
        next.map(|status| Run {
            id: run_id.to_string(),
            status,
        })
    }

    async fn list_messages(
        &self,
        thread_id: &str,
        after: &str,
        order: ListOrder,
    ) -> Result<Vec<ThreadMessage>, ServiceError> {
        let listing = (thread_id.to_string(), after.to_string(), order);
        self.listings.lock().expect("listings lock").push(listing);
        match &self.list_error {
            Some(err) => Err(err.clone()),
            None => Ok(self.replies.clone()),
        }
    }

    async fn upload_file(
        &self,
        file: FileUpload,
        purpose: FilePurpose,
    ) -> Result<String, ServiceError> {
        assert_eq!(purpose, FilePurpose::Assistants);
        self.uploads.lock().expect("uploads lock").push(file);
        Ok(FILE_ID.to_string())
    }
}
