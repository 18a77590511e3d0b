use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::{FetchError, FetchResult, SourceError};

/// Bounded retry with a fixed delay between attempts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Values below 1 behave as 1.
    pub max_attempts: u32,
    /// Pause between consecutive attempts. Not applied after the last one.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// A single attempt, no waiting.
    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO)
    }

    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// One logical API call, however many attempts it took.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiCall {
    pub endpoint: String,
    pub success: bool,
    pub attempts: u32,
    #[serde(with = "duration_secs")]
    pub duration: Duration,
}

/// Sink for [`ApiCall`] records.
pub trait CallRecorder: Send + Sync {
    fn record(&self, call: ApiCall);
}

/// Discards every record.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullRecorder;

impl CallRecorder for NullRecorder {
    fn record(&self, _call: ApiCall) {}
}

/// Runs a fetch operation under a [`RetryPolicy`].
pub struct RetryingFetcher {
    policy: RetryPolicy,
    recorder: Arc<dyn CallRecorder>,
}

impl RetryingFetcher {
    pub fn new(policy: RetryPolicy) -> Self {
        Self::with_recorder(policy, Arc::new(NullRecorder))
    }

    pub fn with_recorder(policy: RetryPolicy, recorder: Arc<dyn CallRecorder>) -> Self {
        Self { policy, recorder }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Call `op` until it succeeds or the attempt budget runs out.
    ///
    /// `source_id` names the endpoint in logs and in the recorded
    /// [`ApiCall`]. Exactly one call record is emitted, success or not.
    pub async fn fetch<T, F, Fut>(&self, source_id: &str, mut op: F) -> FetchResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, SourceError>>,
    {
        let max_attempts = self.policy.attempts();
        let started = Instant::now();
        let mut attempt = 1;

        loop {
            debug!(endpoint = source_id, attempt, max_attempts, "fetch attempt");
            match op().await {
                Ok(value) => {
                    self.finish(source_id, true, attempt, started);
                    return Ok(value);
                }
                Err(err) if attempt < max_attempts => {
                    warn!(
                        endpoint = source_id,
                        attempt,
                        max_attempts,
                        error = %err,
                        "fetch attempt failed; retrying in {:?}",
                        self.policy.delay
                    );
                    if !self.policy.delay.is_zero() {
                        tokio::time::sleep(self.policy.delay).await;
                    }
                    attempt += 1;
                }
                Err(err) => {
                    warn!(
                        endpoint = source_id,
                        attempt,
                        max_attempts,
                        error = %err,
                        "fetch attempt failed; giving up"
                    );
                    self.finish(source_id, false, attempt, started);
                    return Err(FetchError::Exhausted {
                        source_id: source_id.to_string(),
                        attempts: attempt,
                        last: err,
                    });
                }
            }
        }
    }

    fn finish(&self, endpoint: &str, success: bool, attempts: u32, started: Instant) {
        let duration = started.elapsed();
        info!(
            endpoint,
            success,
            attempts,
            "API call to {endpoint}: {} (duration: {:.2}s)",
            if success { "success" } else { "failed" },
            duration.as_secs_f64()
        );
        self.recorder.record(ApiCall {
            endpoint: endpoint.to_string(),
            success,
            attempts,
            duration,
        });
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Ok(Duration::from_secs_f64(secs.max(0.0)))
    }
}
