//! Scripted command runner.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::collector::traits::{CommandRunner, RunError};

#[derive(Debug, Clone)]
enum Response {
    Stdout(Vec<u8>),
    Exit { status: String, stderr: String },
    Hang,
}

#[derive(Debug)]
struct Inner {
    response: Mutex<Response>,
    delay: Mutex<Duration>,
    calls: AtomicUsize,
    last_args: Mutex<Vec<String>>,
}

/// Runner that answers every invocation with a configured response.
///
/// Clones share state, so a test can keep a handle to inspect [`calls`](Self::calls)
/// or swap the response after handing the runner to a `Collector`.
#[derive(Debug, Clone)]
pub struct MockRunner {
    inner: Arc<Inner>,
}

impl MockRunner {
    fn with_response(response: Response) -> Self {
        Self {
            inner: Arc::new(Inner {
                response: Mutex::new(response),
                delay: Mutex::new(Duration::ZERO),
                calls: AtomicUsize::new(0),
                last_args: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Succeeds with `stdout`.
    pub fn with_output(stdout: impl Into<Vec<u8>>) -> Self {
        Self::with_response(Response::Stdout(stdout.into()))
    }

    /// Fails as if the tool exited with `status` and printed `stderr`.
    pub fn with_exit(status: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self::with_response(Response::Exit {
            status: status.into(),
            stderr: stderr.into(),
        })
    }

    /// Never finishes on its own; only the caller's timeout ends the run.
    pub fn hanging() -> Self {
        Self::with_response(Response::Hang)
    }

    /// Sleeps this long before answering.
    pub fn delayed(self, delay: Duration) -> Self {
        *self.inner.delay.lock().unwrap_or_else(PoisonError::into_inner) = delay;
        self
    }

    /// Replaces the response for subsequent invocations.
    pub fn set_output(&self, stdout: impl Into<Vec<u8>>) {
        *self.inner.response.lock().unwrap_or_else(PoisonError::into_inner) =
            Response::Stdout(stdout.into());
    }

    pub fn set_exit(&self, status: impl Into<String>, stderr: impl Into<String>) {
        *self.inner.response.lock().unwrap_or_else(PoisonError::into_inner) = Response::Exit {
            status: status.into(),
            stderr: stderr.into(),
        };
    }

    /// Number of times the tool was "spawned".
    pub fn calls(&self) -> usize {
        self.inner.calls.load(Ordering::SeqCst)
    }

    /// Arguments of the most recent invocation.
    pub fn last_args(&self) -> Vec<String> {
        self.inner
            .last_args
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl CommandRunner for MockRunner {
    async fn run(
        &self,
        _program: &str,
        args: &[String],
        timeout: Duration,
    ) -> Result<Vec<u8>, RunError> {
        self.inner.calls.fetch_add(1, Ordering::SeqCst);
        *self.inner.last_args.lock().unwrap_or_else(PoisonError::into_inner) = args.to_vec();

        let delay = *self.inner.delay.lock().unwrap_or_else(PoisonError::into_inner);
        let response = self
            .inner
            .response
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        let answer = async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            match response {
                Response::Stdout(out) => Ok(out),
                Response::Exit { status, stderr } => Err(RunError::Exit { status, stderr }),
                Response::Hang => std::future::pending().await,
            }
        };

        tokio::time::timeout(timeout, answer)
            .await
            .unwrap_or(Err(RunError::Timeout(timeout)))
    }
}
