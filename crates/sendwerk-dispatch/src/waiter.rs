// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Correlated send-and-await.
//
// Each send arms a one-shot listener under a fresh correlation token, submits
// through the bridge, then waits for the platform's "sent" acknowledgment
// with a bounded timeout. The listener is removed exactly once, whichever way
// the wait ends.
//
//   Idle ──arm──▶ Armed ──ack──────▶ Resolved(Success | Failure)
//                   │ ──submit err─▶ Resolved(Failure)
//                   │ ──timeout────▶ TimedOut
//                   └ ──cancel─────▶ TimedOut

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use sendwerk_bridge::ack::{AckRegistry, AckSink};
use sendwerk_bridge::traits::{PlatformBridge, Submission};
use sendwerk_core::types::{Channel, CorrelationToken, Outcome, SendRequest, utf16_len};
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

use crate::translator::translate;

/// Arms listeners and waits for acknowledgments.
#[derive(Clone)]
pub struct OutcomeWaiter {
    acks: Arc<dyn AckRegistry>,
    request_delivery_report: bool,
}

impl OutcomeWaiter {
    pub fn new(acks: Arc<dyn AckRegistry>) -> Self {
        Self {
            acks,
            request_delivery_report: false,
        }
    }

    /// Also attach a delivery-report token to each submission. The report
    /// is never awaited.
    pub fn with_delivery_report(mut self, enabled: bool) -> Self {
        self.request_delivery_report = enabled;
        self
    }

    /// Submit `request` on `channel` and wait up to `timeout` for the result.
    pub async fn send_and_await(
        &self,
        bridge: &dyn PlatformBridge,
        channel: &Channel,
        request: &SendRequest,
        timeout: Duration,
    ) -> Outcome {
        self.send_and_await_tracked(bridge, channel, request, timeout, std::future::pending())
            .await
            .1
    }

    /// Like [`send_and_await`](Self::send_and_await), but `cancel` ends the
    /// wait early. A cancelled wait reports `TimedOut`: the message may
    /// already be on its way.
    pub async fn send_and_await_cancellable<C>(
        &self,
        bridge: &dyn PlatformBridge,
        channel: &Channel,
        request: &SendRequest,
        timeout: Duration,
        cancel: C,
    ) -> Outcome
    where
        C: Future<Output = ()>,
    {
        self.send_and_await_tracked(bridge, channel, request, timeout, cancel)
            .await
            .1
    }

    /// Full form: also returns the correlation token used for the send.
    pub async fn send_and_await_tracked<C>(
        &self,
        bridge: &dyn PlatformBridge,
        channel: &Channel,
        request: &SendRequest,
        timeout: Duration,
        cancel: C,
    ) -> (CorrelationToken, Outcome)
    where
        C: Future<Output = ()>,
    {
        let token = CorrelationToken::new();
        let (listener, ack_rx) = match ArmedListener::arm(self.acks.as_ref(), token) {
            Ok(armed) => armed,
            Err(outcome) => return (token, outcome),
        };

        let submission = Submission {
            channel,
            recipient: request.recipient(),
            segments: request.segments(),
            sent_token: token,
            delivery_token: self.request_delivery_report.then(CorrelationToken::new),
        };

        info!(
            %token,
            channel = %channel.label,
            units = utf16_len(request.body()),
            parts = request.segments().len(),
            "submitting SMS"
        );

        if let Err(e) = bridge.submit(&submission) {
            error!(%token, error = %e, "submission failed");
            return (token, listener.resolve(Outcome::Failure(e.to_string())));
        }

        debug!(%token, timeout_secs = timeout.as_secs_f64(), "waiting for SMS result");

        let outcome = tokio::select! {
            waited = tokio::time::timeout(timeout, ack_rx) => match waited {
                Ok(Ok(code)) => translate(code),
                Ok(Err(_)) => {
                    warn!(%token, "acknowledgment listener dropped without a result");
                    Outcome::Failure("acknowledgment channel closed".into())
                }
                Err(_) => {
                    warn!(
                        %token,
                        timeout_secs = timeout.as_secs_f64(),
                        "SMS result timed out — message may have been sent but the callback was blocked"
                    );
                    Outcome::TimedOut
                }
            },
            () = cancel => {
                info!(%token, "wait cancelled");
                Outcome::TimedOut
            }
        };

        (token, listener.resolve(outcome))
    }
}

/// A registered listener. Deregisters on `resolve`, or on drop if the send
/// future is abandoned first.
struct ArmedListener<'a> {
    acks: &'a dyn AckRegistry,
    token: CorrelationToken,
    armed: bool,
}

impl<'a> ArmedListener<'a> {
    fn arm(
        acks: &'a dyn AckRegistry,
        token: CorrelationToken,
    ) -> Result<(Self, oneshot::Receiver<i32>), Outcome> {
        let (sink, rx) = AckSink::channel();
        match acks.register(token, sink) {
            Ok(()) => Ok((
                Self {
                    acks,
                    token,
                    armed: true,
                },
                rx,
            )),
            Err(e) => {
                error!(%token, error = %e, "could not arm acknowledgment listener");
                Err(Outcome::Failure(e.to_string()))
            }
        }
    }

    /// Enter the terminal state carrying `outcome`.
    fn resolve(mut self, outcome: Outcome) -> Outcome {
        self.disarm();
        outcome
    }

    fn disarm(&mut self) {
        if std::mem::replace(&mut self.armed, false) {
            self.acks.unregister(&self.token);
        }
    }
}

impl Drop for ArmedListener<'_> {
    fn drop(&mut self) {
        self.disarm();
    }
}
