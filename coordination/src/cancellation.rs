//! Thin wrapper around the single root cancellation handle shared by the
//! engine, every agent turn, and every tool invocation.

use tokio_util::sync::CancellationToken;

/// Cloning shares the same underlying token; cancelling any clone cancels
/// all of them. Idempotent — cancelling an already-cancelled handle is a
/// no-op.
#[derive(Debug, Clone)]
pub struct CancellationHandle {
    token: CancellationToken,
}

impl CancellationHandle {
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn child(&self) -> CancellationHandle {
        Self {
            token: self.token.child_token(),
        }
    }

    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }
}

impl Default for CancellationHandle {
    fn default() -> Self {
        Self::new()
    }
}
