// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Acknowledgment routing.
//
// The platform reports a send's result on its own event thread, addressed by
// correlation token. A waiting send registers an `AckSink` for its token
// before submitting; the first code delivered for that token resolves the
// sink and every later delivery is dropped.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use tokio::sync::oneshot;
use tracing::{debug, warn};

use sendwerk_core::error::{Result, SendwerkError};
use sendwerk_core::types::CorrelationToken;

/// Single-write slot for a platform result code.
#[derive(Debug)]
pub struct AckSink {
    tx: Option<oneshot::Sender<i32>>,
}

impl AckSink {
    /// Create a sink and the receiver the waiting task reads from.
    pub fn channel() -> (Self, oneshot::Receiver<i32>) {
        let (tx, rx) = oneshot::channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// Resolve with `code`. Returns `false` if the sink already fired or the
    /// waiter has gone away.
    pub fn fire(&mut self, code: i32) -> bool {
        match self.tx.take() {
            Some(tx) => tx.send(code).is_ok(),
            None => false,
        }
    }

    pub fn is_spent(&self) -> bool {
        self.tx.is_none()
    }
}

/// Where listeners for correlation tokens live.
pub trait AckRegistry: Send + Sync {
    /// Arm a listener for `token`. At most one listener per token.
    fn register(&self, token: CorrelationToken, sink: AckSink) -> Result<()>;

    /// Remove the listener for `token`. Returns `false` if none was armed;
    /// calling it twice is harmless.
    fn unregister(&self, token: &CorrelationToken) -> bool;
}

/// Process-local registry. Also the delivery target on Android, where the
/// broadcast receiver forwards into it.
#[derive(Debug, Default)]
pub struct InMemoryAckRegistry {
    listeners: Mutex<HashMap<CorrelationToken, AckSink>>,
    registrations: AtomicUsize,
    deregistrations: AtomicUsize,
}

impl InMemoryAckRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route a platform result code to the listener for `token`.
    ///
    /// Returns `true` if a waiting send was resolved. Codes for unknown,
    /// deregistered or already-resolved tokens are ignored.
    pub fn deliver(&self, token: &CorrelationToken, code: i32) -> bool {
        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        match listeners.get_mut(token) {
            Some(sink) if !sink.is_spent() => {
                let resolved = sink.fire(code);
                debug!(%token, code, resolved, "acknowledgment delivered");
                resolved
            }
            Some(_) => {
                warn!(%token, code, "duplicate acknowledgment ignored");
                false
            }
            None => {
                debug!(%token, code, "acknowledgment for unknown token ignored");
                false
            }
        }
    }

    pub fn is_registered(&self, token: &CorrelationToken) -> bool {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(token)
    }

    /// Number of listeners currently armed.
    pub fn active(&self) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Total successful registrations since creation.
    pub fn registrations(&self) -> usize {
        self.registrations.load(Ordering::SeqCst)
    }

    /// Total deregistrations that actually removed a listener.
    pub fn deregistrations(&self) -> usize {
        self.deregistrations.load(Ordering::SeqCst)
    }
}

impl AckRegistry for InMemoryAckRegistry {
    fn register(&self, token: CorrelationToken, sink: AckSink) -> Result<()> {
        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        if listeners.contains_key(&token) {
            return Err(SendwerkError::Registry(format!(
                "listener already armed for token {token}"
            )));
        }
        listeners.insert(token, sink);
        self.registrations.fetch_add(1, Ordering::SeqCst);
        debug!(%token, "acknowledgment listener armed");
        Ok(())
    }

    fn unregister(&self, token: &CorrelationToken) -> bool {
        let removed = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(token)
            .is_some();
        if removed {
            self.deregistrations.fetch_add(1, Ordering::SeqCst);
            debug!(%token, "acknowledgment listener removed");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_delivery_wins() {
        let registry = InMemoryAckRegistry::new();
        let token = CorrelationToken::new();
        let (sink, rx) = AckSink::channel();
        registry.register(token, sink).unwrap();

        assert!(registry.deliver(&token, -1));
        assert!(!registry.deliver(&token, 1));
        assert_eq!(rx.await.unwrap(), -1);
    }

    #[test]
    fn unknown_token_is_ignored() {
        let registry = InMemoryAckRegistry::new();
        assert!(!registry.deliver(&CorrelationToken::new(), -1));
    }

    #[test]
    fn duplicate_registration_rejected() {
        let registry = InMemoryAckRegistry::new();
        let token = CorrelationToken::new();
        let (first, _rx1) = AckSink::channel();
        let (second, _rx2) = AckSink::channel();

        registry.register(token, first).unwrap();
        assert!(matches!(
            registry.register(token, second),
            Err(SendwerkError::Registry(_))
        ));
        assert_eq!(registry.registrations(), 1);
    }

    #[test]
    fn unregister_is_idempotent() {
        let registry = InMemoryAckRegistry::new();
        let token = CorrelationToken::new();
        let (sink, _rx) = AckSink::channel();
        registry.register(token, sink).unwrap();

        assert!(registry.unregister(&token));
        assert!(!registry.unregister(&token));
        assert_eq!(registry.deregistrations(), 1);
        assert_eq!(registry.active(), 0);
    }

    #[test]
    fn delivery_after_unregister_is_dropped() {
        let registry = InMemoryAckRegistry::new();
        let token = CorrelationToken::new();
        let (sink, _rx) = AckSink::channel();
        registry.register(token, sink).unwrap();
        registry.unregister(&token);

        assert!(!registry.deliver(&token, -1));
    }
}
