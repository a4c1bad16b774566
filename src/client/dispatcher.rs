use std::sync::Arc;
use std::time::Duration;

use futures::future::{AbortRegistration, Abortable};

use crate::client::session::Session;
use crate::error::{PixelsError, Result};
use crate::transport::{HttpMethod, HttpRequest, HttpResponse, HttpTransport};

/// Request header pinning a call to the worker that accepted the job.
pub const AFFINITY_REQUEST_HEADER: &str = "fly-force-instance-id";
/// Response header on `/submit` naming that worker.
pub const AFFINITY_RESPONSE_HEADER: &str = "machine-id";

/// Cancellation for a single dispatch. At most one source may be set.
#[derive(Debug, Default)]
pub struct CallOptions {
    pub timeout: Option<Duration>,
    pub abort: Option<AbortRegistration>,
}

impl CallOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_abort(mut self, registration: AbortRegistration) -> Self {
        self.abort = Some(registration);
        self
    }
}

/// Sends authenticated requests on behalf of a [`Session`].
///
/// Reads the affinity token but never writes it, so the same dispatcher
/// serves submits and any number of concurrent poll loops.
#[derive(Clone)]
pub struct Dispatcher {
    transport: Arc<dyn HttpTransport>,
    session: Arc<Session>,
}

impl Dispatcher {
    pub fn new(transport: Arc<dyn HttpTransport>, session: Arc<Session>) -> Self {
        Self { transport, session }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    fn build_request(&self, path: &str, method: HttpMethod, body: Option<Vec<u8>>) -> HttpRequest {
        let mut headers = vec![
            (
                "Authorization".to_string(),
                format!("Key {}", self.session.api_key()),
            ),
            ("Content-Type".to_string(), "application/json".to_string()),
        ];
        if let Some(affinity) = self.session.affinity() {
            headers.push((AFFINITY_REQUEST_HEADER.to_string(), affinity.to_string()));
        }

        HttpRequest {
            method,
            url: self.session.url(path),
            headers,
            body,
        }
    }

    pub async fn dispatch(
        &self,
        path: &str,
        method: HttpMethod,
        body: Option<Vec<u8>>,
        options: CallOptions,
    ) -> Result<HttpResponse> {
        let CallOptions { timeout, abort } = options;
        if timeout.is_some() && abort.is_some() {
            return Err(PixelsError::InvalidCall(format!(
                "{} {}: a timeout cannot be combined with an abort signal",
                method.as_str(),
                path
            )));
        }

        let request = self.build_request(path, method, body);
        log::debug!("{} {}", method.as_str(), request.url);

        let send = self.transport.send(request);
        let sent = match (timeout, abort) {
            (Some(after), _) => match tokio::time::timeout(after, send).await {
                Ok(sent) => sent,
                Err(_) => return Err(PixelsError::TimeoutError { after }),
            },
            (None, Some(registration)) => match Abortable::new(send, registration).await {
                Ok(sent) => sent,
                Err(_) => return Err(PixelsError::Aborted),
            },
            (None, None) => send.await,
        };

        sent.map_err(|e| PixelsError::from_transport(e, timeout))
    }
}
