use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::error::{ClientError, Result};

/// The lifetime of one view (page, dialog, CLI command).
///
/// Requests awaited through a scope are abandoned once the scope is torn down
/// or dropped, and their results are reported as `Cancelled` so nothing late
/// reaches a store.
pub struct ViewScope {
    cancel: CancellationToken,
}

impl Default for ViewScope {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewScope {
    pub fn new() -> Self {
        Self {
            cancel: CancellationToken::new(),
        }
    }

    /// A nested scope: torn down with its parent, or on its own.
    pub fn child(&self) -> Self {
        Self {
            cancel: self.cancel.child_token(),
        }
    }

    pub fn teardown(&self) {
        self.cancel.cancel();
    }

    pub fn is_active(&self) -> bool {
        !self.cancel.is_cancelled()
    }

    /// A handle that can tear this scope down from elsewhere (signal handlers).
    pub fn cancel_handle(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Await `fut` unless the scope goes away first. A result that arrives
    /// after teardown, success or failure, is discarded.
    pub async fn run<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        if self.cancel.is_cancelled() {
            return Err(ClientError::Cancelled);
        }
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(ClientError::Cancelled),
            out = fut => {
                if self.cancel.is_cancelled() {
                    Err(ClientError::Cancelled)
                } else {
                    out
                }
            }
        }
    }
}

impl Drop for ViewScope {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
