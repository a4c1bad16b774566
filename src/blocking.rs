//! Synchronous facade over [`PixelsClient`] for callers without an async runtime.
//!
//! Each client owns a current-thread tokio runtime. Do not use it from inside
//! another runtime; tokio refuses to block there.

use std::sync::Arc;

use futures::StreamExt;
use tokio::runtime::{Builder, Runtime};

use crate::{
    client::{PixelsClient, Subscription},
    config::ClientConfig,
    error::{PixelsError, Result},
    models::{JobId, JobTiming, Outcome, PolledResponse, SubmissionRequest},
    transport::HttpTransport,
};

pub struct Client {
    inner: PixelsClient,
    runtime: Arc<Runtime>,
}

impl Client {
    pub fn new(config: ClientConfig) -> Result<Self> {
        Self::from_async(PixelsClient::new(config)?)
    }

    pub fn with_transport(config: ClientConfig, transport: Arc<dyn HttpTransport>) -> Result<Self> {
        Self::from_async(PixelsClient::with_transport(config, transport)?)
    }

    fn from_async(inner: PixelsClient) -> Result<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| PixelsError::RuntimeError(e.to_string()))?;

        Ok(Self {
            inner,
            runtime: Arc::new(runtime),
        })
    }

    pub fn submit(&self, request: &SubmissionRequest) -> Result<PolledResponse> {
        self.runtime.block_on(self.inner.submit(request))
    }

    pub fn subscribe(&self, job_id: &JobId) -> BlockingSubscription {
        BlockingSubscription {
            inner: self.inner.subscribe(job_id),
            runtime: Arc::clone(&self.runtime),
        }
    }

    pub fn run(&self, request: &SubmissionRequest) -> Result<Outcome> {
        self.runtime.block_on(self.inner.run(request))
    }

    pub fn job_timing(&self, job_id: &JobId) -> Option<JobTiming> {
        self.inner.job_timing(job_id)
    }

    pub fn close(&self) {
        self.runtime.block_on(self.inner.close())
    }
}

/// Iterator over a job's poll events; each `next` blocks on one network round.
pub struct BlockingSubscription {
    inner: Subscription,
    runtime: Arc<Runtime>,
}

impl Iterator for BlockingSubscription {
    type Item = Result<PolledResponse>;

    fn next(&mut self) -> Option<Self::Item> {
        self.runtime.block_on(self.inner.next())
    }
}
