// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stub bridge for desktop/CI builds where no telephony stack exists.
//
// Permissions are never granted and every probe returns
// `PlatformUnavailable` — the real implementation lives in `android`.

use sendwerk_core::error::{Result, SendwerkError};
use sendwerk_core::types::{Channel, Permission};

use crate::traits::{NativePermissions, NativeSms, NativeSubscriptions, PlatformBridge, Submission};

/// No-op bridge returned on non-mobile platforms.
pub struct StubBridge;

impl PlatformBridge for StubBridge {
    fn platform_name(&self) -> &str {
        "Desktop (stub)"
    }
}

impl NativePermissions for StubBridge {
    fn has_permission(&self, permission: Permission) -> bool {
        tracing::warn!(
            permission = permission.manifest_name(),
            "NativePermissions::has_permission called on stub bridge"
        );
        false
    }
}

impl NativeSubscriptions for StubBridge {
    fn default_sms_subscription_id(&self) -> Result<i32> {
        Err(SendwerkError::PlatformUnavailable)
    }

    fn active_subscriptions(&self) -> Result<Vec<Channel>> {
        Err(SendwerkError::PlatformUnavailable)
    }
}

impl NativeSms for StubBridge {
    fn submit(&self, _submission: &Submission<'_>) -> Result<()> {
        tracing::warn!("NativeSms::submit called on stub bridge");
        Err(SendwerkError::PlatformUnavailable)
    }
}
