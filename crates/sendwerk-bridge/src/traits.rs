// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-agnostic trait definitions for native telephony capabilities.
//
// The dispatcher only ever sees these traits. The carrier subsystem behind
// them is opaque: "submit a message, eventually receive an event".

use sendwerk_core::error::{Result, SendwerkError};
use sendwerk_core::types::{Channel, CorrelationToken, Permission};

/// Unified bridge that groups all native telephony capabilities.
pub trait PlatformBridge: NativePermissions + NativeSubscriptions + NativeSms + Send + Sync {
    /// Human-readable platform name (e.g. "Android 14").
    fn platform_name(&self) -> &str;
}

/// Runtime permission checks.
pub trait NativePermissions {
    /// Whether the process currently holds `permission`.
    fn has_permission(&self, permission: Permission) -> bool;
}

/// Carrier subscription (SIM) discovery.
pub trait NativeSubscriptions {
    /// Raw id of the platform's default SMS subscription. Negative ids mean
    /// "no valid default".
    fn default_sms_subscription_id(&self) -> Result<i32>;

    /// Active subscriptions in the order the platform reports them.
    /// Requires [`Permission::ReadPhoneState`] on most platforms.
    fn active_subscriptions(&self) -> Result<Vec<Channel>>;
}

/// Message submission.
pub trait NativeSms {
    /// Hand a message to the radio. Returning `Ok(())` only means the
    /// platform accepted it; the outcome arrives later on `sent_token`.
    fn submit(&self, submission: &Submission<'_>) -> Result<()>;
}

/// Everything the platform needs for one submission.
#[derive(Debug, Clone)]
pub struct Submission<'a> {
    pub channel: &'a Channel,
    pub recipient: &'a str,
    /// Ordered segments. More than one selects the multipart path.
    pub segments: &'a [String],
    /// One acknowledgment for the whole submission arrives on this token.
    pub sent_token: CorrelationToken,
    /// Best-effort delivery report. Nothing waits on it.
    pub delivery_token: Option<CorrelationToken>,
}

impl Submission<'_> {
    pub fn is_multipart(&self) -> bool {
        self.segments.len() > 1
    }

    /// Text of the single-part path. Fails on an empty segment list.
    pub fn first_segment(&self) -> Result<&str> {
        self.segments
            .first()
            .map(String::as_str)
            .ok_or_else(|| SendwerkError::Submission("no segments".into()))
    }

    /// The whole body, for platforms that divide it themselves.
    pub fn body(&self) -> String {
        self.segments.concat()
    }
}
