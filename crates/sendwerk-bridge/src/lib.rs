// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

//! Sendwerk — native telephony bridge abstractions.
//!
//! Defines the capability traits the dispatcher consumes, the acknowledgment
//! registry that routes platform callbacks back to waiting sends, and the
//! per-platform implementations behind them.

pub mod ack;
pub mod traits;

#[cfg(target_os = "android")]
pub mod android;

#[cfg(not(target_os = "android"))]
pub mod stub;

use std::sync::Arc;

/// A platform bridge paired with the registry its acknowledgments land in.
pub struct PlatformHandles {
    pub bridge: Arc<dyn traits::PlatformBridge>,
    pub acks: Arc<dyn ack::AckRegistry>,
}

/// Build the bridge for the target operating system. The environment
/// profile (SDK level and friends) is resolved once here.
pub fn platform_bridge() -> PlatformHandles {
    #[cfg(target_os = "android")]
    {
        let bridge = Arc::new(android::AndroidBridge::new());
        let acks = Arc::new(android::BroadcastAckRegistry::new(bridge.profile()));
        PlatformHandles { bridge, acks }
    }
    #[cfg(not(target_os = "android"))]
    {
        // DESKTOP/CI: no telephony; every submission reports PlatformUnavailable.
        PlatformHandles {
            bridge: Arc::new(stub::StubBridge),
            acks: Arc::new(ack::InMemoryAckRegistry::new()),
        }
    }
}
