use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::stream::{self, BoxStream, Stream, StreamExt};

use crate::client::dispatcher::{CallOptions, Dispatcher};
use crate::error::{PixelsError, Result};
use crate::models::{JobId, PolledResponse};
use crate::transport::HttpMethod;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PollState {
    Polling,
    Finished,
}

struct PollLoop {
    dispatcher: Dispatcher,
    job_id: JobId,
    path: String,
    attempt_timeout: Duration,
    state: PollState,
    timeouts: u32,
}

impl PollLoop {
    fn finish(&mut self, item: Result<PolledResponse>) -> Option<Result<PolledResponse>> {
        self.state = PollState::Finished;
        Some(item)
    }

    /// Polls until there is something to emit. Attempts that hit their
    /// deadline are retried without emitting anything.
    async fn next_event(&mut self) -> Option<Result<PolledResponse>> {
        if self.state == PollState::Finished {
            return None;
        }

        loop {
            let attempt = self
                .dispatcher
                .dispatch(
                    &self.path,
                    HttpMethod::Get,
                    None,
                    CallOptions::new().with_timeout(self.attempt_timeout),
                )
                .await;

            let response = match attempt {
                Ok(response) => response,
                Err(e) if e.is_timeout() => {
                    self.timeouts += 1;
                    log::info!(
                        "Job {} timed out ({} so far); continuing to poll.",
                        self.job_id,
                        self.timeouts
                    );
                    continue;
                }
                Err(e) => {
                    log::error!("❌ Polling job {} failed: {}", self.job_id, e);
                    return self.finish(Err(e));
                }
            };

            if !response.is_success() {
                let err = PixelsError::from_response(&response);
                log::error!("❌ Polling job {} failed: {}", self.job_id, err);
                return self.finish(Err(err));
            }

            let event = match serde_json::from_slice::<PolledResponse>(&response.body) {
                Ok(event) => event,
                Err(e) => return self.finish(Err(e.into())),
            };

            if event.id() != &self.job_id {
                log::warn!(
                    "⚠️  Poll for job {} answered with id {}",
                    self.job_id,
                    event.id()
                );
            }
            log::debug!("Job {} status: {}", self.job_id, event.status());

            if event.is_terminal() {
                self.state = PollState::Finished;
            }
            return Some(Ok(event));
        }
    }
}

/// Stream of events for one job: any number of updates, then exactly one
/// result, then the end of the stream. A transport or HTTP failure is yielded
/// once as an `Err` and also ends the stream.
///
/// Dropping the subscription drops whatever request is in flight.
pub struct Subscription {
    job_id: JobId,
    inner: BoxStream<'static, Result<PolledResponse>>,
}

impl Subscription {
    pub(crate) fn new(dispatcher: Dispatcher, job_id: JobId, attempt_timeout: Duration) -> Self {
        let state = PollLoop {
            path: format!("/poll/{}", urlencoding::encode(job_id.as_str())),
            dispatcher,
            job_id: job_id.clone(),
            attempt_timeout,
            state: PollState::Polling,
            timeouts: 0,
        };

        let inner = stream::unfold(state, |mut state| async move {
            let item = state.next_event().await?;
            Some((item, state))
        })
        .fuse()
        .boxed();

        Self { job_id, inner }
    }

    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }
}

impl Stream for Subscription {
    type Item = Result<PolledResponse>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::session::Session;
    use crate::transport::testing::{Reply, ScriptedTransport};
    use serde_json::json;
    use std::sync::Arc;

    fn subscribe(transport: &ScriptedTransport, job_id: &str) -> Subscription {
        let dispatcher = Dispatcher::new(
            Arc::new(transport.clone()),
            Arc::new(Session::new("http://localhost:1729", "sk-test")),
        );
        Subscription::new(dispatcher, JobId::from(job_id), Duration::from_secs(30))
    }

    fn update(status: &str) -> Reply {
        Reply::ok(json!({ "id": "j1", "type": "update", "status": status }))
    }

    fn success() -> Reply {
        Reply::ok(json!({
            "id": "j1",
            "type": "result",
            "status": "success",
            "data": { "url": "https://cdn.openpixels.ai/out.png" }
        }))
    }

    #[tokio::test]
    async fn emits_updates_then_result_then_ends() {
        let transport = ScriptedTransport::new()
            .on_poll(update("queued"))
            .on_poll(update("processing"))
            .on_poll(success())
            .on_poll(update("never read"));
        let mut subscription = subscribe(&transport, "j1");

        let mut statuses = Vec::new();
        while let Some(event) = subscription.next().await {
            statuses.push(event.unwrap().status().to_string());
        }

        assert_eq!(statuses, vec!["queued", "processing", "success"]);
        assert!(subscription.next().await.is_none());
        assert_eq!(transport.poll_count(), 3);
    }

    #[tokio::test]
    async fn timeouts_are_retried_silently() {
        let transport = ScriptedTransport::new()
            .on_poll(Reply::Timeout)
            .on_poll(Reply::Timeout)
            .on_poll(Reply::Timeout)
            .on_poll(success());
        let subscription = subscribe(&transport, "j1");

        let events: Vec<_> = subscription.collect().await;

        assert_eq!(events.len(), 1);
        assert!(events[0].as_ref().unwrap().is_terminal());
        assert_eq!(transport.poll_count(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_attempts_hit_the_deadline_and_retry() {
        let transport = ScriptedTransport::new()
            .on_poll(Reply::Stall)
            .on_poll(update("processing"))
            .on_poll(Reply::Stall)
            .on_poll(success());
        let subscription = subscribe(&transport, "j1");

        let statuses: Vec<String> = subscription
            .map(|event| event.unwrap().status().to_string())
            .collect()
            .await;

        assert_eq!(statuses, vec!["processing", "success"]);
        assert_eq!(transport.poll_count(), 4);
    }

    #[tokio::test]
    async fn server_error_ends_the_stream() {
        let transport = ScriptedTransport::new()
            .on_poll(update("queued"))
            .on_poll(Reply::Text {
                status: 404,
                status_text: "Not Found",
                body: "unknown job",
            })
            .on_poll(success());
        let mut subscription = subscribe(&transport, "j1");

        assert!(subscription.next().await.unwrap().is_ok());
        match subscription.next().await {
            Some(Err(PixelsError::StatusError {
                status,
                status_text,
                body,
            })) => {
                assert_eq!(status, 404);
                assert_eq!(status_text, "Not Found");
                assert_eq!(body, "unknown job");
            }
            other => panic!("expected status error, got {:?}", other),
        }
        assert!(subscription.next().await.is_none());
        assert_eq!(transport.poll_count(), 2);
    }

    #[tokio::test]
    async fn transport_failure_ends_the_stream() {
        let transport = ScriptedTransport::new()
            .on_poll(Reply::Fail("connection reset"))
            .on_poll(success());
        let mut subscription = subscribe(&transport, "j1");

        assert!(matches!(
            subscription.next().await,
            Some(Err(PixelsError::RequestError(_)))
        ));
        assert!(subscription.next().await.is_none());
    }

    #[tokio::test]
    async fn malformed_body_ends_the_stream() {
        let transport = ScriptedTransport::new().on_poll(Reply::ok(json!({ "id": "j1" })));
        let mut subscription = subscribe(&transport, "j1");

        assert!(matches!(
            subscription.next().await,
            Some(Err(PixelsError::SerializationError(_)))
        ));
        assert!(subscription.next().await.is_none());
    }

    #[tokio::test]
    async fn polls_the_job_path() {
        let transport = ScriptedTransport::new().on_poll(success());
        let subscription = subscribe(&transport, "j1");
        assert_eq!(subscription.job_id().as_str(), "j1");

        let _: Vec<_> = subscription.collect().await;
        assert_eq!(transport.requests()[0].url, "http://localhost:1729/poll/j1");
    }

    #[tokio::test]
    async fn job_id_is_encoded_as_one_path_segment() {
        let transport = ScriptedTransport::new().on_poll(Reply::ok(json!({
            "id": "gen/42?x#y",
            "type": "result",
            "status": "success"
        })));
        let subscription = subscribe(&transport, "gen/42?x#y");

        let events: Vec<_> = subscription.collect().await;
        assert!(events[0].is_ok());
        assert_eq!(
            transport.requests()[0].url,
            "http://localhost:1729/poll/gen%2F42%3Fx%23y"
        );
    }
}
