//! Request-scoped context and cancellation
//!
//! Every RPC handled by the server gets its own [`Context`] derived from the
//! server's root context. `StopProvider` cancels the root, which every derived
//! context observes.

use std::sync::Arc;
use tokio::sync::watch;

/// Context carries the RPC name and a cancellation signal shared with the server
/// Pass this as first parameter to all async trait methods
#[derive(Clone)]
pub struct Context {
    operation: Arc<str>,
    done_tx: Arc<watch::Sender<bool>>,
    done: watch::Receiver<bool>,
}

impl Context {
    pub fn new() -> Self {
        let (done_tx, done) = watch::channel(false);

        Self {
            operation: Arc::from(""),
            done_tx: Arc::new(done_tx),
            done,
        }
    }

    /// Derive a context for a single RPC; shares cancellation with `self`
    pub fn for_operation(&self, operation: &str) -> Self {
        Self {
            operation: Arc::from(operation),
            done_tx: self.done_tx.clone(),
            done: self.done.clone(),
        }
    }

    /// Name of the RPC this context was created for, empty for the root
    pub fn operation(&self) -> &str {
        &self.operation
    }

    pub fn is_cancelled(&self) -> bool {
        *self.done.borrow()
    }

    /// Resolves once the context is cancelled
    pub async fn cancelled(&self) {
        let mut done = self.done.clone();
        // The sender lives as long as any context, so this only errors on teardown
        let _ = done.wait_for(|cancelled| *cancelled).await;
    }

    pub fn cancel(&self) {
        self.done_tx.send_replace(true);
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("operation", &self.operation)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
