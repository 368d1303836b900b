// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform result codes → structured outcome.
//
// The mapping is total: undocumented and vendor codes turn up in the field,
// so anything not listed becomes a failure that keeps the raw code.

use sendwerk_core::types::Outcome;
use tracing::{debug, error};

/// Result codes carried by the "sent" broadcast (`SmsManager.RESULT_*`).
pub mod codes {
    /// `Activity.RESULT_OK`.
    pub const RESULT_OK: i32 = -1;
    pub const GENERIC_FAILURE: i32 = 1;
    pub const RADIO_OFF: i32 = 2;
    pub const NULL_PDU: i32 = 3;
    pub const NO_SERVICE: i32 = 4;
    pub const LIMIT_EXCEEDED: i32 = 5;
    pub const FDN_CHECK_FAILURE: i32 = 6;
    pub const SHORT_CODE_NOT_ALLOWED: i32 = 7;
    pub const SHORT_CODE_NEVER_ALLOWED: i32 = 8;
    /// Returned by some OEM security layers (notably MIUI) that silently
    /// block SMS from apps without their extra "Send SMS" permission.
    pub const VENDOR_SECURITY_BLOCK: i32 = 16;
}

/// Remediation shown when a vendor security layer blocks the send.
pub const VENDOR_BLOCK_GUIDANCE: &str = "SMS blocked by the device's security layer. \
    Go to Settings > Apps > (this app) > Permissions > SMS > Allow. \
    On MIUI also check Settings > Privacy > Special permissions > Send SMS";

/// Map a platform result code to an [`Outcome`].
pub fn translate(code: i32) -> Outcome {
    let reason = match code {
        codes::RESULT_OK => {
            debug!(code, "SMS sent successfully");
            return Outcome::Success;
        }
        codes::GENERIC_FAILURE => "generic failure".to_string(),
        codes::RADIO_OFF => "radio off (turn airplane mode off)".to_string(),
        codes::NULL_PDU => "null payload".to_string(),
        codes::NO_SERVICE => "no service (check cellular signal)".to_string(),
        codes::LIMIT_EXCEEDED => "sending limit exceeded".to_string(),
        codes::FDN_CHECK_FAILURE => "blocked by fixed dialing numbers".to_string(),
        codes::SHORT_CODE_NOT_ALLOWED => "short code not allowed".to_string(),
        codes::SHORT_CODE_NEVER_ALLOWED => "short code never allowed".to_string(),
        codes::VENDOR_SECURITY_BLOCK => VENDOR_BLOCK_GUIDANCE.to_string(),
        other => format!("unknown error code: {other}"),
    };
    error!(code, reason = %reason, "SMS failed");
    Outcome::Failure(reason)
}
