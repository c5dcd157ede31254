// Time-bounded, optionally serialized wrapper around any backend adapter.
//
// The registry wraps every adapter it builds in a `TimedBackend`, so
// per-call timeouts and single-flight access are enforced in one place
// rather than in each daemon protocol.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::warn;

use crate::error::Error;
use crate::types::{Frame, MatrixDimensions, RawDeviceDescriptor, StateChange};
use crate::Backend;

/// Decorator that bounds every call with a timeout and, for daemons that
/// cannot handle overlapping requests, funnels calls through a mutex.
pub struct TimedBackend {
    inner: Arc<dyn Backend>,
    call_timeout: Duration,
    probe_timeout: Duration,
    serial: Option<Mutex<()>>,
}

impl TimedBackend {
    pub fn new(inner: Arc<dyn Backend>, call_timeout: Duration) -> Self {
        let serial = (!inner.supports_concurrent_requests()).then(|| Mutex::new(()));
        Self {
            inner,
            call_timeout,
            probe_timeout: call_timeout,
            serial,
        }
    }

    /// Use a shorter budget for liveness probes.
    pub fn with_probe_timeout(mut self, probe_timeout: Duration) -> Self {
        self.probe_timeout = probe_timeout;
        self
    }

    pub fn inner(&self) -> &Arc<dyn Backend> {
        &self.inner
    }

    async fn bounded<T, F>(&self, limit: Duration, operation: &str, fut: F) -> Result<T, Error>
    where
        F: Future<Output = Result<T, Error>> + Send,
    {
        let call = async {
            let _guard = match self.serial {
                Some(ref lock) => Some(lock.lock().await),
                None => None,
            };
            fut.await
        };

        if let Ok(result) = tokio::time::timeout(limit, call).await {
            result
        } else {
            let timeout_ms = u64::try_from(limit.as_millis()).unwrap_or(u64::MAX);
            warn!(backend = self.inner.id(), operation, timeout_ms, "backend call timed out");
            Err(Error::Timeout {
                backend: self.inner.id().to_owned(),
                timeout_ms,
            })
        }
    }
}

#[async_trait]
impl Backend for TimedBackend {
    fn id(&self) -> &str {
        self.inner.id()
    }

    async fn probe(&self) -> Result<(), Error> {
        self.bounded(self.probe_timeout, "probe", self.inner.probe())
            .await
    }

    async fn discover(&self) -> Result<Vec<RawDeviceDescriptor>, Error> {
        self.bounded(self.call_timeout, "discover", self.inner.discover())
            .await
    }

    async fn get_device(&self, uid: &str) -> Result<RawDeviceDescriptor, Error> {
        self.bounded(self.call_timeout, "get_device", self.inner.get_device(uid))
            .await
    }

    async fn set_state(&self, uid: &str, change: &StateChange) -> Result<(), Error> {
        self.bounded(
            self.call_timeout,
            "set_state",
            self.inner.set_state(uid, change),
        )
        .await
    }

    async fn get_matrix(&self, uid: &str) -> Result<MatrixDimensions, Error> {
        self.bounded(self.call_timeout, "get_matrix", self.inner.get_matrix(uid))
            .await
    }

    async fn draw_matrix(&self, uid: &str, frame: &Frame) -> Result<(), Error> {
        self.bounded(
            self.call_timeout,
            "draw_matrix",
            self.inner.draw_matrix(uid, frame),
        )
        .await
    }

    fn supports_concurrent_requests(&self) -> bool {
        self.inner.supports_concurrent_requests()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use tokio_test::{assert_err, assert_ok};

    use super::*;
    use crate::memory::MemoryBackend;

    #[tokio::test(start_paused = true)]
    async fn slow_call_becomes_timeout() {
        let inner = Arc::new(MemoryBackend::demo("slow").with_latency(Duration::from_secs(10)));
        let timed = TimedBackend::new(inner, Duration::from_secs(2));

        let err = assert_err!(timed.discover().await);
        assert!(matches!(err, Error::Timeout { timeout_ms: 2000, .. }));
        assert!(err.is_unavailable());
    }

    #[tokio::test(start_paused = true)]
    async fn probe_uses_its_own_budget() {
        let inner = Arc::new(MemoryBackend::demo("slow").with_latency(Duration::from_millis(500)));
        let timed = TimedBackend::new(inner, Duration::from_secs(5))
            .with_probe_timeout(Duration::from_millis(100));

        assert_err!(timed.probe().await);
        assert_ok!(timed.discover().await);
    }

    #[tokio::test(start_paused = true)]
    async fn non_concurrent_backend_is_serialized() {
        let inner = Arc::new(
            MemoryBackend::demo("serial")
                .with_latency(Duration::from_millis(50))
                .concurrent(false),
        );
        let timed = Arc::new(TimedBackend::new(inner.clone(), Duration::from_secs(5)));

        let a = tokio::spawn({
            let timed = Arc::clone(&timed);
            async move { timed.discover().await }
        });
        let b = tokio::spawn({
            let timed = Arc::clone(&timed);
            async move { timed.discover().await }
        });
        assert_ok!(a.await.unwrap());
        assert_ok!(b.await.unwrap());

        assert_eq!(inner.max_in_flight(), 1);
        assert_eq!(inner.discover_count(), 2);
    }
}
