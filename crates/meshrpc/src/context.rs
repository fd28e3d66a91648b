//! Per-call context: cancellation, deadline, session data and propagated metadata.

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Caller-supplied context for one invocation.
///
/// Cloning is cheap and clones share the same cancellation token, so a caller can
/// keep a handle and cancel an in-flight call from another task.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
    session: Option<Vec<u8>>,
    metadata: HashMap<String, String>,
}

impl CallContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ties the call to an existing cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Attaches opaque session data forwarded in the envelope.
    pub fn with_session(mut self, session: impl Into<Vec<u8>>) -> Self {
        self.session = Some(session.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Cancels the call (and every clone of this context).
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves once the context is cancelled.
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn session(&self) -> Option<&[u8]> {
        self.session.as_deref()
    }

    pub fn metadata(&self) -> &HashMap<String, String> {
        &self.metadata
    }

    /// Fills in a deadline if the caller did not set one.
    pub(crate) fn or_timeout(mut self, timeout: Option<Duration>) -> Self {
        if self.deadline.is_none() {
            self.deadline = timeout.map(|t| Instant::now() + t);
        }
        self
    }
}
