// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Plugin call surface.
//
// Validates arguments, checks SEND_SMS, selects a channel, and runs the
// correlated send. Every call ends in exactly one `PluginReply`; nothing
// raised below this layer reaches the caller as an error value.

use std::sync::Arc;

use chrono::Utc;
use sendwerk_bridge::PlatformHandles;
use sendwerk_bridge::ack::AckRegistry;
use sendwerk_bridge::traits::PlatformBridge;
use sendwerk_core::error::{Result, SendwerkError};
use sendwerk_core::types::{ErrorCode, Outcome, Permission, PluginReply, SendReport, SendRequest};
use sendwerk_core::DispatchConfig;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::selector::select_channel;
use crate::waiter::OutcomeWaiter;

/// Plugin method name for sending one SMS.
pub const METHOD_SEND_SMS: &str = "sendSms";

/// Entry point used by the application's plugin channel.
#[derive(Clone)]
pub struct Dispatcher {
    bridge: Arc<dyn PlatformBridge>,
    waiter: OutcomeWaiter,
    config: DispatchConfig,
}

impl Dispatcher {
    pub fn new(
        bridge: Arc<dyn PlatformBridge>,
        acks: Arc<dyn AckRegistry>,
        config: DispatchConfig,
    ) -> Self {
        let waiter = OutcomeWaiter::new(acks).with_delivery_report(config.request_delivery_report);
        Self {
            bridge,
            waiter,
            config,
        }
    }

    /// Build on top of [`sendwerk_bridge::platform_bridge`].
    pub fn from_platform(handles: PlatformHandles, config: DispatchConfig) -> Self {
        Self::new(handles.bridge, handles.acks, config)
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Route a plugin method call. Unknown methods get `NotImplemented`.
    pub async fn handle_call(&self, method: &str, args: &Value) -> PluginReply {
        match method {
            METHOD_SEND_SMS => {
                let phone = args.get("phone").and_then(Value::as_str).unwrap_or_default();
                let message = args.get("message").and_then(Value::as_str).unwrap_or_default();
                self.send_message(phone, message).await
            }
            other => {
                warn!(method = other, "unknown plugin method");
                PluginReply::NotImplemented
            }
        }
    }

    /// Send one SMS and wait for its outcome.
    pub async fn send_message(&self, recipient: &str, body: &str) -> PluginReply {
        match self.send_with_report(recipient, body).await {
            Ok(report) => PluginReply::from_outcome(&report.outcome),
            Err(e) => {
                error!(code = e.code().as_str(), error = %e, "sendSms rejected");
                PluginReply::from_error(&e)
            }
        }
    }

    /// Send one SMS and return the full diagnostic record.
    ///
    /// Only precondition failures (`BadArguments`, `PermissionDenied`) come
    /// back as `Err`; everything after that is folded into the outcome.
    pub async fn send_with_report(&self, recipient: &str, body: &str) -> Result<SendReport> {
        let request = SendRequest::new(recipient, body, self.config.segment_limit)?;

        if !self.bridge.has_permission(Permission::SendSms) {
            return Err(SendwerkError::PermissionDenied(Permission::SendSms));
        }

        info!(recipient, platform = self.bridge.platform_name(), "sendSms called");

        let channel = select_channel(self.bridge.as_ref());
        let started_at = Utc::now();
        let (token, outcome) = self
            .waiter
            .send_and_await_tracked(
                self.bridge.as_ref(),
                &channel,
                &request,
                self.config.ack_timeout(),
                std::future::pending(),
            )
            .await;
        let finished_at = Utc::now();

        match &outcome {
            Outcome::Success => info!(%token, recipient, "SMS sent successfully"),
            Outcome::TimedOut => warn!(%token, recipient, "SMS outcome unknown (timed out)"),
            Outcome::Failure(reason) => error!(%token, recipient, reason = %reason, "SMS failed"),
        }

        Ok(SendReport {
            token,
            channel,
            segment_count: request.segments().len(),
            outcome,
            started_at,
            finished_at,
        })
    }

    /// Run a send on its own task and hand the reply to `on_reply` exactly
    /// once, even if the send task panics.
    pub fn spawn_send<F>(&self, recipient: String, body: String, on_reply: F) -> JoinHandle<()>
    where
        F: FnOnce(PluginReply) + Send + 'static,
    {
        let this = self.clone();
        tokio::spawn(async move {
            let worker = tokio::spawn(async move { this.send_message(&recipient, &body).await });
            let reply = match worker.await {
                Ok(reply) => reply,
                Err(e) => {
                    error!(error = %e, "send task failed");
                    PluginReply::Error {
                        code: ErrorCode::SendFail,
                        message: format!("send task failed: {e}"),
                    }
                }
            };
            on_reply(reply);
        })
    }
}
