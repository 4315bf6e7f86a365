//! Background execution with completion callbacks.
//!
//! `Dispatcher` runs blocking calls (network I/O and, for photo endpoints,
//! image decoding and resizing) on tokio's blocking pool.
//!
//! Listener threading: a listener whose call fails a precondition runs
//! synchronously on the thread that called [`Dispatcher::submit`]. Every
//! other listener runs on a blocking-pool worker thread, never on the
//! caller's thread. Listeners that touch thread-bound state (UI objects,
//! JNI local references) must hop back themselves.

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::api::AuthenticatingApi;
use crate::error::ApiError;
use crate::operation::{Call, Completion};

#[derive(Debug, Clone)]
pub struct Dispatcher {
    api: AuthenticatingApi,
    handle: Handle,
}

impl Dispatcher {
    pub fn new(api: AuthenticatingApi, handle: Handle) -> Self {
        Self { api, handle }
    }

    /// Use the runtime the caller is running in, if any.
    pub fn from_current(api: AuthenticatingApi) -> Option<Self> {
        Handle::try_current().ok().map(|handle| Self::new(api, handle))
    }

    pub fn api(&self) -> &AuthenticatingApi {
        &self.api
    }

    /// Schedule `call` and hand its [`Completion`] to `listener`.
    ///
    /// Returns `None` when the call failed its preconditions; the listener
    /// has already run in that case and nothing was scheduled.
    pub fn submit<F>(&self, call: Call, listener: F) -> Option<JoinHandle<()>>
    where
        F: FnOnce(Completion) + Send + 'static,
    {
        let operation = call.operation();
        if let Err(err) = call.check_preconditions() {
            tracing::debug!(%operation, error = %err, "call rejected before scheduling");
            listener(Completion {
                operation,
                outcome: Err(err),
            });
            return None;
        }
        let api = self.api.clone();
        Some(self.handle.spawn_blocking(move || listener(api.execute(&call))))
    }

    /// Future-based equivalent of [`submit`](Self::submit).
    pub async fn run(&self, call: Call) -> Completion {
        let operation = call.operation();
        if let Err(err) = call.check_preconditions() {
            return Completion {
                operation,
                outcome: Err(err),
            };
        }
        let api = self.api.clone();
        match self.handle.spawn_blocking(move || api.execute(&call)).await {
            Ok(completion) => completion,
            Err(join) => Completion {
                operation,
                outcome: Err(ApiError::Transport(format!("background worker failed: {join}"))),
            },
        }
    }
}
