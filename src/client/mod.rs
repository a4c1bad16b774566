pub mod dispatcher;
pub mod session;
pub mod subscription;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::{AbortRegistration, Abortable};
use futures::{Stream, StreamExt};

use crate::{
    config::ClientConfig,
    error::{PixelsError, Result},
    models::{JobId, JobResult, JobTiming, Outcome, PolledResponse, SubmissionRequest},
    transport::{HttpMethod, HttpTransport, ReqwestTransport},
};

pub use dispatcher::{CallOptions, Dispatcher, AFFINITY_REQUEST_HEADER, AFFINITY_RESPONSE_HEADER};
pub use session::Session;
pub use subscription::Subscription;

/// Once this many timing records are held, finished ones are dropped before a
/// new job is tracked. Unfinished records are always kept.
pub const MAX_TRACKED_JOBS: usize = 1024;

/// Async client for the OpenPixels job API.
///
/// Cheap to clone; clones share the session (and with it the worker
/// affinity) and the job timing records.
#[derive(Clone)]
pub struct PixelsClient {
    dispatcher: Dispatcher,
    submit_timeout: Duration,
    poll_timeout: Duration,
    jobs: Arc<Mutex<HashMap<JobId, JobTiming>>>,
}

impl PixelsClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        Self::with_transport(config, Arc::new(ReqwestTransport::new()))
    }

    pub fn with_transport(config: ClientConfig, transport: Arc<dyn HttpTransport>) -> Result<Self> {
        let (api_key, base_url) = config.validate()?;
        log::debug!("OpenPixels client targeting {}", base_url);

        let session = Arc::new(Session::new(base_url, api_key));
        Ok(Self {
            dispatcher: Dispatcher::new(transport, session),
            submit_timeout: config.submit_timeout,
            poll_timeout: config.poll_timeout,
            jobs: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    pub fn session(&self) -> &Session {
        self.dispatcher.session()
    }

    /// Sends one submission. Never retried, not even on timeout, since the
    /// server may already have accepted the job.
    ///
    /// The returned response can already be a result, in which case there is
    /// nothing to poll.
    pub async fn submit(&self, request: &SubmissionRequest) -> Result<PolledResponse> {
        let body = serde_json::to_vec(request)?;
        log::info!("Submitting {} job", request.model);

        let response = self
            .dispatcher
            .dispatch(
                "/submit",
                HttpMethod::Post,
                Some(body),
                CallOptions::new().with_timeout(self.submit_timeout),
            )
            .await
            .map_err(|e| {
                log::error!("❌ Failed to submit job: {}", e);
                e
            })?;

        if !response.is_success() {
            let err = PixelsError::from_response(&response);
            log::error!("❌ Failed to submit job: {}", err);
            return Err(err);
        }

        if let Some(machine_id) = response.header(AFFINITY_RESPONSE_HEADER) {
            if self.session().remember_affinity(machine_id) {
                log::debug!("Pinned session to worker {}", machine_id);
            }
        }

        let submitted: PolledResponse = serde_json::from_slice(&response.body)?;
        self.track(submitted.id());
        log::info!(
            "Job {} accepted with status {}",
            submitted.id(),
            submitted.status()
        );

        Ok(submitted)
    }

    /// Starts a fresh poll stream for `job_id`.
    pub fn subscribe(&self, job_id: &JobId) -> Subscription {
        Subscription::new(self.dispatcher.clone(), job_id.clone(), self.poll_timeout)
    }

    /// Submits `request` and waits for its single terminal result.
    ///
    /// A job that failed on the server still returns `Ok`; the failure is in
    /// [`Outcome::error`].
    pub async fn run(&self, request: &SubmissionRequest) -> Result<Outcome> {
        let result = match self.submit(request).await? {
            PolledResponse::Result(result) => {
                log::debug!("Job {} finished on submit", result.id);
                result
            }
            PolledResponse::Update(update) => self.wait_for_result(&update.id).await?,
        };

        self.finish(&result);
        Ok(Outcome::from(result))
    }

    /// Like [`PixelsClient::run`], but gives up with [`PixelsError::Aborted`]
    /// once the paired `AbortHandle` fires. The in-flight request is dropped;
    /// the job itself keeps running on the server.
    pub async fn run_with_abort(
        &self,
        request: &SubmissionRequest,
        registration: AbortRegistration,
    ) -> Result<Outcome> {
        match Abortable::new(self.run(request), registration).await {
            Ok(outcome) => outcome,
            Err(_) => {
                log::warn!("⚠️  Run aborted by caller");
                Err(PixelsError::Aborted)
            }
        }
    }

    async fn wait_for_result(&self, job_id: &JobId) -> Result<JobResult> {
        first_result(job_id, self.subscribe(job_id)).await
    }

    fn track(&self, job_id: &JobId) {
        if let Ok(mut jobs) = self.jobs.lock() {
            prune_finished(&mut jobs, MAX_TRACKED_JOBS);
            jobs.entry(job_id.clone()).or_insert_with(JobTiming::start);
        }
    }

    fn finish(&self, result: &JobResult) {
        let Ok(mut jobs) = self.jobs.lock() else {
            return;
        };
        if let Some(timing) = jobs.get_mut(&result.id) {
            timing.finish();
            log::info!(
                "Job {} finished with status {} in {}ms",
                result.id,
                result.status,
                timing.duration_ms().unwrap_or_default()
            );
        }
    }

    /// Timing for a job submitted through this client, until it is pruned
    /// (see [`MAX_TRACKED_JOBS`]) or [`PixelsClient::close`] is called.
    pub fn job_timing(&self, job_id: &JobId) -> Option<JobTiming> {
        self.jobs.lock().ok()?.get(job_id).cloned()
    }

    /// Drops all timing records. Safe to call more than once.
    pub async fn close(&self) {
        if let Ok(mut jobs) = self.jobs.lock() {
            let pending = jobs.values().filter(|t| !t.is_finished()).count();
            if pending > 0 {
                log::warn!("⚠️  Closing client with {} unfinished job(s)", pending);
            }
            jobs.clear();
        }
    }
}

/// Consumes `events` up to the first result. A stream that runs dry first is a
/// protocol violation.
async fn first_result<S>(job_id: &JobId, events: S) -> Result<JobResult>
where
    S: Stream<Item = Result<PolledResponse>>,
{
    futures::pin_mut!(events);
    while let Some(event) = events.next().await {
        match event? {
            PolledResponse::Result(result) => return Ok(result),
            PolledResponse::Update(update) => {
                log::debug!("Job {} is {}", update.id, update.status);
            }
        }
    }

    log::error!("❌ Job {} stopped reporting before its result", job_id);
    Err(PixelsError::SubscriptionEnded {
        job_id: job_id.clone(),
    })
}

fn prune_finished(jobs: &mut HashMap<JobId, JobTiming>, limit: usize) {
    if jobs.len() < limit {
        return;
    }
    let before = jobs.len();
    jobs.retain(|_, timing| !timing.is_finished());
    log::debug!("Pruned {} finished job record(s)", before - jobs.len());
}
