// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Sendwerk SMS bridge.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, SendwerkError};

/// Maximum UTF-16 code units carried by a single SMS segment.
pub const DEFAULT_SEGMENT_LIMIT: usize = 160;

/// Prefix of the broadcast action that carries the "sent" acknowledgment.
pub const SENT_ACTION_PREFIX: &str = "SENDWERK_SMS_SENT_";

/// Prefix of the broadcast action that carries the delivery report.
pub const DELIVERED_ACTION_PREFIX: &str = "SENDWERK_SMS_DELIVERED_";

/// Identifies an outbound subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelId {
    /// A concrete carrier subscription (SIM slot) id.
    Subscription(i32),
    /// Whatever the platform hands out when no subscription is named.
    PlatformDefault,
}

/// A selectable outbound transport identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: ChannelId,
    /// Human label, e.g. the carrier display name.
    pub label: String,
    /// Whether the platform marks this as the default SMS subscription.
    pub is_default: bool,
}

impl Channel {
    pub fn subscription(id: i32, label: impl Into<String>, is_default: bool) -> Self {
        Self {
            id: ChannelId::Subscription(id),
            label: label.into(),
            is_default,
        }
    }

    /// The generic platform handle used when no subscription can be chosen.
    pub fn platform_default() -> Self {
        Self {
            id: ChannelId::PlatformDefault,
            label: "platform default".into(),
            is_default: false,
        }
    }

    pub fn subscription_id(&self) -> Option<i32> {
        match self.id {
            ChannelId::Subscription(id) => Some(id),
            ChannelId::PlatformDefault => None,
        }
    }
}

/// Platform subscription ids are valid when non-negative
/// (`SubscriptionManager.INVALID_SUBSCRIPTION_ID` is -1).
pub fn is_valid_subscription_id(id: i32) -> bool {
    id >= 0
}

/// Runtime permissions the bridge checks before touching telephony.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Permission {
    /// Required to submit any message.
    SendSms,
    /// Required to enumerate active subscriptions.
    ReadPhoneState,
}

impl Permission {
    /// Name as declared in the platform manifest.
    pub fn manifest_name(&self) -> &'static str {
        match self {
            Self::SendSms => "SEND_SMS",
            Self::ReadPhoneState => "READ_PHONE_STATE",
        }
    }

    /// Fully qualified Android permission string.
    pub fn android_name(&self) -> &'static str {
        match self {
            Self::SendSms => "android.permission.SEND_SMS",
            Self::ReadPhoneState => "android.permission.READ_PHONE_STATE",
        }
    }
}

/// A validated outbound message. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendRequest {
    recipient: String,
    body: String,
    segments: Vec<String>,
}

impl SendRequest {
    /// Validate the arguments and split the body into segments of at most
    /// `segment_limit` UTF-16 code units.
    pub fn new(
        recipient: impl Into<String>,
        body: impl Into<String>,
        segment_limit: usize,
    ) -> Result<Self> {
        let recipient = recipient.into();
        let body = body.into();

        if recipient.trim().is_empty() || body.trim().is_empty() {
            return Err(SendwerkError::BadArguments(
                "phone or message missing".into(),
            ));
        }

        let segments = split_segments(&body, segment_limit);
        Ok(Self {
            recipient,
            body,
            segments,
        })
    }

    pub fn recipient(&self) -> &str {
        &self.recipient
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    /// Ordered segments. A body within the limit yields exactly one.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_multipart(&self) -> bool {
        self.segments.len() > 1
    }
}

/// Split into segments of at most `limit` UTF-16 code units, the unit the
/// platform measures SMS length in. A surrogate pair is never split, so a
/// segment may come up one unit short and the count can exceed
/// `ceil(units / limit)` by the pairs that straddle a boundary.
fn split_segments(body: &str, limit: usize) -> Vec<String> {
    let limit = limit.max(1);
    if utf16_len(body) <= limit {
        return vec![body.to_string()];
    }

    let mut segments = Vec::new();
    let mut current = String::new();
    let mut units = 0;
    for ch in body.chars() {
        let width = ch.len_utf16();
        if units + width > limit && !current.is_empty() {
            segments.push(std::mem::take(&mut current));
            units = 0;
        }
        current.push(ch);
        units += width;
    }
    if !current.is_empty() {
        segments.push(current);
    }
    segments
}

/// Length in UTF-16 code units.
pub fn utf16_len(text: &str) -> usize {
    text.encode_utf16().count()
}

/// Unique id scoping one send operation's acknowledgment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorrelationToken(pub Uuid);

impl CorrelationToken {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Broadcast action the platform fires once the message leaves the radio.
    pub fn sent_action(&self) -> String {
        format!("{SENT_ACTION_PREFIX}{}", self.0)
    }

    /// Broadcast action for the (best-effort) delivery report.
    pub fn delivered_action(&self) -> String {
        format!("{DELIVERED_ACTION_PREFIX}{}", self.0)
    }

    /// Recover the token from a broadcast action string.
    pub fn from_action(action: &str) -> Option<Self> {
        let raw = action
            .strip_prefix(SENT_ACTION_PREFIX)
            .or_else(|| action.strip_prefix(DELIVERED_ACTION_PREFIX))?;
        Uuid::parse_str(raw).ok().map(Self)
    }
}

impl Default for CorrelationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CorrelationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Terminal result of one send. Produced exactly once per request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum Outcome {
    Success,
    Failure(String),
    /// No acknowledgment within the wait window. The message may still have
    /// gone out; this is neither success nor failure.
    TimedOut,
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

/// Short machine-readable error code sent to the application layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    BadArgs,
    NoPermission,
    SendFail,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BadArgs => "BAD_ARGS",
            Self::NoPermission => "NO_PERMISSION",
            Self::SendFail => "SEND_FAIL",
        }
    }
}

/// The single terminal response delivered for each plugin call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PluginReply {
    /// `confirmed` is false when the acknowledgment never arrived.
    Success {
        confirmed: bool,
        note: Option<String>,
    },
    Error {
        code: ErrorCode,
        message: String,
    },
    NotImplemented,
}

impl PluginReply {
    pub fn from_outcome(outcome: &Outcome) -> Self {
        match outcome {
            Outcome::Success => Self::Success {
                confirmed: true,
                note: None,
            },
            Outcome::TimedOut => Self::Success {
                confirmed: false,
                note: Some("SMS submitted but no acknowledgment arrived; the system may have blocked the callback".into()),
            },
            Outcome::Failure(reason) => Self::Error {
                code: ErrorCode::SendFail,
                message: reason.clone(),
            },
        }
    }

    pub fn from_error(err: &SendwerkError) -> Self {
        Self::Error {
            code: err.code(),
            message: err.to_string(),
        }
    }
}

/// Diagnostic record of one completed send.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendReport {
    pub token: CorrelationToken,
    pub channel: Channel,
    pub segment_count: usize,
    pub outcome: Outcome,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_body_is_single_segment() {
        let req = SendRequest::new("+15550100", "hello", DEFAULT_SEGMENT_LIMIT).unwrap();
        assert_eq!(req.segments(), ["hello".to_string()]);
        assert!(!req.is_multipart());
    }

    #[test]
    fn body_at_limit_is_single_segment() {
        let body = "a".repeat(160);
        let req = SendRequest::new("+15550100", body.clone(), 160).unwrap();
        assert_eq!(req.segments().len(), 1);
        assert_eq!(req.segments()[0], body);
    }

    #[test]
    fn long_body_segments_ceil() {
        let body = "b".repeat(321);
        let req = SendRequest::new("+15550100", body.clone(), 160).unwrap();
        assert_eq!(req.segments().len(), 3);
        assert_eq!(req.segments()[2].len(), 1);
        assert_eq!(req.segments().concat(), body);
    }

    #[test]
    fn segments_split_on_characters_not_bytes() {
        let body = "é".repeat(170);
        let req = SendRequest::new("+15550100", body, 160).unwrap();
        assert_eq!(req.segments().len(), 2);
        assert_eq!(req.segments()[0].chars().count(), 160);
        assert_eq!(req.segments()[1].chars().count(), 10);
    }

    #[test]
    fn astral_text_is_measured_in_utf16_units() {
        // 100 emoji = 100 chars but 200 UTF-16 units.
        let body = "\u{1F600}".repeat(100);
        let req = SendRequest::new("+15550100", body.clone(), 160).unwrap();

        assert!(req.is_multipart());
        assert_eq!(req.segments().len(), 2);
        assert_eq!(utf16_len(&req.segments()[0]), 160);
        assert_eq!(utf16_len(&req.segments()[1]), 40);
        assert_eq!(req.segments().concat(), body);
    }

    #[test]
    fn surrogate_pairs_are_never_split() {
        // 1 + 80 * 2 = 161 units; the 80th emoji would straddle the limit.
        let body = format!("a{}", "\u{1F680}".repeat(80));
        let req = SendRequest::new("+15550100", body.clone(), 160).unwrap();

        assert_eq!(req.segments().len(), 2);
        assert_eq!(utf16_len(&req.segments()[0]), 159);
        assert_eq!(req.segments()[1], "\u{1F680}");
        assert_eq!(req.segments().concat(), body);
    }

    #[test]
    fn pair_wider_than_limit_gets_its_own_segment() {
        let req = SendRequest::new("+15550100", "x\u{1F600}y", 1).unwrap();
        assert_eq!(req.segments(), ["x", "\u{1F600}", "y"]);
    }

    #[test]
    fn blank_arguments_rejected() {
        assert!(matches!(
            SendRequest::new("  ", "hi", 160),
            Err(SendwerkError::BadArguments(_))
        ));
        assert!(matches!(
            SendRequest::new("+15550100", "\n\t", 160),
            Err(SendwerkError::BadArguments(_))
        ));
    }

    #[test]
    fn token_round_trips_through_action() {
        let token = CorrelationToken::new();
        assert_eq!(CorrelationToken::from_action(&token.sent_action()), Some(token));
        assert_eq!(
            CorrelationToken::from_action(&token.delivered_action()),
            Some(token)
        );
        assert_eq!(CorrelationToken::from_action("SMS_SENT_garbage"), None);
    }

    #[test]
    fn tokens_are_unique() {
        assert_ne!(CorrelationToken::new(), CorrelationToken::new());
    }

    #[test]
    fn subscription_validity() {
        assert!(is_valid_subscription_id(0));
        assert!(is_valid_subscription_id(3));
        assert!(!is_valid_subscription_id(-1));
    }

    #[test]
    fn timed_out_reply_is_unconfirmed_success() {
        match PluginReply::from_outcome(&Outcome::TimedOut) {
            PluginReply::Success { confirmed, note } => {
                assert!(!confirmed);
                assert!(note.is_some());
            }
            other => panic!("unexpected reply: {other:?}"),
        }
    }

    #[test]
    fn reply_serializes_with_screaming_code() {
        let reply = PluginReply::from_outcome(&Outcome::Failure("radio off".into()));
        let json = serde_json::to_value(&reply).unwrap();
        assert_eq!(json["kind"], "error");
        assert_eq!(json["code"], "SEND_FAIL");
        assert_eq!(json["message"], "radio off");
    }
}
