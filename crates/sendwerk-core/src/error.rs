// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Sendwerk.

use thiserror::Error;

use crate::types::{ErrorCode, Permission};

/// Top-level error type for all Sendwerk operations.
#[derive(Debug, Error)]
pub enum SendwerkError {
    // -- Caller errors --
    #[error("bad arguments: {0}")]
    BadArguments(String),

    #[error("{} permission not granted", .0.manifest_name())]
    PermissionDenied(Permission),

    // -- Telephony errors --
    /// A channel probe failed. The selector swallows these and falls through.
    #[error("channel probe failed: {0}")]
    ChannelProbe(String),

    #[error("submission failed: {0}")]
    Submission(String),

    #[error("acknowledgment registry error: {0}")]
    Registry(String),

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // -- Platform bridge --
    #[error("platform bridge error: {0}")]
    Bridge(String),

    #[error("feature not available on this platform")]
    PlatformUnavailable,
}

impl SendwerkError {
    /// Machine-readable code reported to the application layer.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::BadArguments(_) => ErrorCode::BadArgs,
            Self::PermissionDenied(_) => ErrorCode::NoPermission,
            _ => ErrorCode::SendFail,
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, SendwerkError>;
