use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::{HttpMethod, HttpRequest, HttpResponse, HttpTransport, TransportError};

/// Canned outcome for one request.
pub(crate) enum Reply {
    Json {
        status: u16,
        body: Value,
        headers: Vec<(&'static str, &'static str)>,
    },
    Text {
        status: u16,
        status_text: &'static str,
        body: &'static str,
    },
    Timeout,
    Fail(&'static str),
    /// Never answers; only the caller's deadline ends it.
    Stall,
}

impl Reply {
    pub(crate) fn ok(body: Value) -> Self {
        Reply::Json {
            status: 200,
            body,
            headers: Vec::new(),
        }
    }

    pub(crate) fn ok_with_header(body: Value, name: &'static str, value: &'static str) -> Self {
        Reply::Json {
            status: 200,
            body,
            headers: vec![(name, value)],
        }
    }
}

#[derive(Default)]
struct Script {
    submits: VecDeque<Reply>,
    polls: VecDeque<Reply>,
    requests: Vec<HttpRequest>,
}

/// In-memory transport replaying scripted replies: POSTs consume the submit
/// queue, GETs consume the poll queue. Every request is recorded.
#[derive(Clone, Default)]
pub(crate) struct ScriptedTransport {
    script: Arc<Mutex<Script>>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn on_submit(self, reply: Reply) -> Self {
        self.script.lock().unwrap().submits.push_back(reply);
        self
    }

    pub(crate) fn on_poll(self, reply: Reply) -> Self {
        self.script.lock().unwrap().polls.push_back(reply);
        self
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.script.lock().unwrap().requests.clone()
    }

    pub(crate) fn poll_count(&self) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.method == HttpMethod::Get)
            .count()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let reply = {
            let mut script = self.script.lock().unwrap();
            let method = request.method;
            script.requests.push(request);
            match method {
                HttpMethod::Post => script.submits.pop_front(),
                HttpMethod::Get => script.polls.pop_front(),
            }
        };

        match reply {
            Some(Reply::Json {
                status,
                body,
                headers,
            }) => Ok(HttpResponse {
                status,
                status_text: (if status == 200 { "OK" } else { "" }).to_string(),
                headers: headers
                    .into_iter()
                    .map(|(k, v)| (k.to_lowercase(), v.to_string()))
                    .collect(),
                body: serde_json::to_vec(&body).unwrap(),
            }),
            Some(Reply::Text {
                status,
                status_text,
                body,
            }) => Ok(HttpResponse {
                status,
                status_text: status_text.to_string(),
                headers: Vec::new(),
                body: body.as_bytes().to_vec(),
            }),
            Some(Reply::Timeout) => Err(TransportError::Timeout),
            Some(Reply::Fail(msg)) => Err(TransportError::Failed(msg.to_string())),
            Some(Reply::Stall) => {
                tokio::time::sleep(Duration::from_secs(24 * 60 * 60)).await;
                Err(TransportError::Failed("stalled request was not cancelled".into()))
            }
            None => Err(TransportError::Failed("script exhausted".into())),
        }
    }
}
