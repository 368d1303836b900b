// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Outbound channel (carrier subscription) selection.
//
// Priority: the platform's default SMS subscription, then the first active
// subscription (needs READ_PHONE_STATE), then the generic platform handle.
// A failing probe only skips its own step. Selection always yields a channel.

use sendwerk_bridge::traits::PlatformBridge;
use sendwerk_core::types::{Channel, Permission, is_valid_subscription_id};
use tracing::{debug, warn};

/// Pick the channel a message should go out on.
pub fn select_channel(bridge: &dyn PlatformBridge) -> Channel {
    match bridge.default_sms_subscription_id() {
        Ok(id) if is_valid_subscription_id(id) => {
            debug!(subscription = id, "using default SMS subscription");
            return Channel::subscription(id, "default SMS subscription", true);
        }
        Ok(id) => debug!(subscription = id, "no valid default SMS subscription"),
        Err(e) => warn!(error = %e, "default subscription probe failed"),
    }

    if bridge.has_permission(Permission::ReadPhoneState) {
        match bridge.active_subscriptions() {
            Ok(channels) => match channels.into_iter().next() {
                Some(first) => {
                    debug!(channel = %first.label, id = ?first.id, "using first active subscription");
                    return first;
                }
                None => warn!("no active subscriptions found; falling back"),
            },
            Err(e) => warn!(error = %e, "reading active subscriptions failed; falling back"),
        }
    } else {
        warn!("READ_PHONE_STATE not granted; using platform default");
    }

    Channel::platform_default()
}
