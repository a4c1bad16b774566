use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Opaque job identifier assigned by the server on submission.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for JobId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl AsRef<str> for JobId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Wall-clock bookkeeping for one job, kept for logging only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobTiming {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub duration: Option<Duration>,
}

impl JobTiming {
    pub fn start() -> Self {
        Self::started_at(Utc::now())
    }

    pub fn started_at(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            finished_at: None,
            duration: None,
        }
    }

    pub fn finish(&mut self) {
        self.finish_at(Utc::now());
    }

    /// First call wins; later calls leave the record untouched.
    pub fn finish_at(&mut self, finished_at: DateTime<Utc>) {
        if self.finished_at.is_some() {
            return;
        }
        self.finished_at = Some(finished_at);
        self.duration = Some(finished_at - self.started_at);
    }

    pub fn is_finished(&self) -> bool {
        self.finished_at.is_some()
    }

    pub fn duration_ms(&self) -> Option<i64> {
        self.duration.map(|d| d.num_milliseconds())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finish_records_duration_once() {
        let started = Utc::now();
        let mut timing = JobTiming::started_at(started);
        assert!(!timing.is_finished());
        assert_eq!(timing.duration_ms(), None);

        timing.finish_at(started + Duration::milliseconds(1500));
        assert_eq!(timing.duration_ms(), Some(1500));

        timing.finish_at(started + Duration::seconds(10));
        assert_eq!(timing.duration_ms(), Some(1500));
    }

    #[test]
    fn job_id_is_transparent_on_the_wire() {
        let id: JobId = serde_json::from_str("\"j1\"").unwrap();
        assert_eq!(id, JobId::from("j1"));
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"j1\"");
        assert_eq!(id.to_string(), "j1");
    }
}
