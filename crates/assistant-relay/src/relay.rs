use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::errors::RelayError;
use crate::frame::Frame;
use crate::service::{AssistantService, ListOrder};
use crate::wait::{RunWaiter, WaitPolicy};

/// Identifiers scoped to one relayed request.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RelayTarget {
    pub thread_id: String,
    pub run_id: String,
    /// The user's triggering message. Replies are fetched strictly after it.
    pub user_message_id: String,
}

/// Streams the messages a finished run produced.
pub struct MessageRelay<'a> {
    service: &'a dyn AssistantService,
}

impl<'a> MessageRelay<'a> {
    pub fn new(service: &'a dyn AssistantService) -> Self {
        Self { service }
    }

    /// Sends one `assistant_message` frame per message created after
    /// `after_message_id`, oldest first, and returns how many were sent.
    ///
    /// Only text parts are relayed; other content kinds are dropped here.
    pub async fn relay_new_messages(
        &self,
        thread_id: &str,
        after_message_id: &str,
        sink: &mpsc::Sender<Frame>,
    ) -> Result<usize, RelayError> {
        let messages = self
            .service
            .list_messages(thread_id, after_message_id, ListOrder::Asc)
            .await?;
        debug!(thread_id, after_message_id, count = messages.len(), "relaying new messages");

        let mut sent = 0;
        for message in messages {
            let segments = message.text_segments();
            if segments.len() < message.content.len() {
                let dropped = message.content.len() - segments.len();
                debug!(message_id = %message.id, dropped, "dropped non-text content parts");
            }
            send_frame(sink, Frame::assistant_message(message.id, segments)).await?;
            sent += 1;
        }
        Ok(sent)
    }
}

/// Producer body for one request: wait for the run, relay its messages, then
/// close with the request's control data.
///
/// Any failure after streaming has started becomes a single `error` frame,
/// sent right after the `control_data` frame so the client still learns the
/// thread. On success `control_data` is the last frame. When the receiver went
/// away `RelayError::Disconnected` is returned.
pub async fn relay_run(
    service: &dyn AssistantService,
    policy: &WaitPolicy,
    target: &RelayTarget,
    sink: &mpsc::Sender<Frame>,
) -> Result<(), RelayError> {
    let outcome = match RunWaiter::new(service, policy)
        .await_completion(&target.thread_id, &target.run_id)
        .await
    {
        Ok(()) => MessageRelay::new(service)
            .relay_new_messages(&target.thread_id, &target.user_message_id, sink)
            .await
            .map(|_| ()),
        Err(err) => Err(err),
    };
    let control = Frame::control_data(&target.thread_id, &target.user_message_id);

    match outcome {
        Ok(()) => send_frame(sink, control).await,
        Err(RelayError::Disconnected) => Err(RelayError::Disconnected),
        Err(err) => {
            warn!(
                thread_id = %target.thread_id,
                run_id = %target.run_id,
                error = %err,
                "relay ended with error frame"
            );
            send_frame(sink, control).await?;
            send_frame(sink, Frame::error(err.frame_detail())).await
        }
    }
}

async fn send_frame(sink: &mpsc::Sender<Frame>, frame: Frame) -> Result<(), RelayError> {
    sink.send(frame).await.map_err(|_| RelayError::Disconnected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ServiceError;
    use crate::frame::FrameKind;
    use crate::service::{ContentPart, RunStatus};
    use crate::testing::{FakeService, RUN_ID, USER_MESSAGE_ID};

    fn target() -> RelayTarget {
        RelayTarget {
            thread_id: "thread_1".into(),
            run_id: RUN_ID.into(),
            user_message_id: USER_MESSAGE_ID.into(),
        }
    }

    async fn run_to_frames(service: &FakeService) -> (Result<(), RelayError>, Vec<Frame>) {
        let (tx, mut rx) = mpsc::channel(16);
        let result = relay_run(service, &WaitPolicy::default(), &target(), &tx).await;
        drop(tx);
        let mut frames = Vec::new();
        while let Some(frame) = rx.recv().await {
            frames.push(frame);
        }
        (result, frames)
    }

    #[tokio::test(start_paused = true)]
    async fn completed_run_relays_replies_in_order_then_control_data() {
        let service = FakeService::with_statuses(vec![RunStatus::InProgress, RunStatus::Completed])
            .text_reply("msg_a", "first")
            .reply(
                "msg_b",
                vec![
                    ContentPart::Text("second".into()),
                    ContentPart::ImageFile {
                        file_id: "file_9".into(),
                    },
                    ContentPart::Text("third".into()),
                ],
            );

        let (result, frames) = run_to_frames(&service).await;

        result.expect("relay");
        assert_eq!(
            frames,
            vec![
                Frame::assistant_message("msg_a", vec!["first".into()]),
                Frame::assistant_message("msg_b", vec!["second".into(), "third".into()]),
                Frame::control_data("thread_1", USER_MESSAGE_ID),
            ]
        );
        assert_eq!(
            *service.listings.lock().expect("listings"),
            vec![(
                "thread_1".to_string(),
                USER_MESSAGE_ID.to_string(),
                ListOrder::Asc,
            )]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn failed_run_sends_one_error_frame_and_skips_the_fetch() {
        let service = FakeService::with_statuses(vec![RunStatus::Queued, RunStatus::Failed])
            .text_reply("msg_a", "never sent");

        let (result, frames) = run_to_frames(&service).await;

        result.expect("relay");
        assert_eq!(
            frames,
            vec![
                Frame::control_data("thread_1", USER_MESSAGE_ID),
                Frame::error("failed"),
            ]
        );
        assert!(service.listings.lock().expect("listings").is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn status_transport_error_becomes_error_frame() {
        let service = FakeService::with_statuses(vec![RunStatus::Queued])
            .status_error(ServiceError::transport("connection reset"));

        let (result, frames) = run_to_frames(&service).await;

        result.expect("relay");
        let kinds: Vec<_> = frames.iter().map(Frame::kind).collect();
        assert_eq!(kinds, vec![FrameKind::ControlData, FrameKind::Error]);
        assert_eq!(
            frames[1],
            Frame::error("assistant service transport error: connection reset")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn listing_failure_becomes_error_frame() {
        let service = FakeService::with_statuses(vec![RunStatus::Completed])
            .list_error(ServiceError::api("thread not found", Some(404)));

        let (_, frames) = run_to_frames(&service).await;

        assert_eq!(
            frames,
            vec![
                Frame::control_data("thread_1", USER_MESSAGE_ID),
                Frame::error("assistant service error: thread not found"),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn message_without_text_still_gets_a_frame() {
        let service = FakeService::with_statuses(vec![RunStatus::Completed]).reply(
            "msg_img",
            vec![ContentPart::ImageFile {
                file_id: "file_2".into(),
            }],
        );

        let (_, frames) = run_to_frames(&service).await;

        assert_eq!(frames[0], Frame::assistant_message("msg_img", Vec::new()));
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_receiver_reports_disconnect() {
        let service = FakeService::with_statuses(vec![RunStatus::Completed]).text_reply("m", "x");
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        let result = relay_run(&service, &WaitPolicy::default(), &target(), &tx).await;

        assert_eq!(result, Err(RelayError::Disconnected));
    }
}
