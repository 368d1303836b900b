// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable messages for send failures.
//
// Every technical error and every non-success outcome maps to plain English
// with a clear suggestion. Severity drives how the app presents it.

use crate::error::SendwerkError;
use crate::types::{Outcome, Permission};

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Signal loss, stalled callback — trying again may work.
    Transient,
    /// User must do something (grant a permission, leave airplane mode).
    ActionRequired,
    /// Retrying will not help — bad input, unsupported platform.
    Permanent,
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain English summary (shown as a heading).
    pub message: String,
    /// What the user should try (shown as body text).
    pub suggestion: String,
    /// Whether sending again is worth offering.
    pub retriable: bool,
    pub severity: Severity,
}

/// Convert a `SendwerkError` into a `HumanError`.
pub fn humanize_error(err: &SendwerkError) -> HumanError {
    match err {
        SendwerkError::BadArguments(_) => HumanError {
            message: "The message is missing something.".into(),
            suggestion: "Make sure both the phone number and the message text are filled in.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        SendwerkError::PermissionDenied(Permission::SendSms) => HumanError {
            message: "This app isn't allowed to send text messages.".into(),
            suggestion: "Open Settings > Apps > Permissions and allow SMS, then try again.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        SendwerkError::PermissionDenied(Permission::ReadPhoneState) => HumanError {
            message: "This app can't see which SIM card to use.".into(),
            suggestion: "Allow the Phone permission so the right SIM can be picked.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        SendwerkError::Submission(detail) | SendwerkError::ChannelProbe(detail) => HumanError {
            message: "The phone couldn't send the message.".into(),
            suggestion: format!("Check you have mobile signal, then try again. (Detail: {detail})"),
            retriable: true,
            severity: Severity::Transient,
        },

        SendwerkError::Registry(_) | SendwerkError::Bridge(_) => HumanError {
            message: "Something went wrong inside the app.".into(),
            suggestion: "Close the app completely and open it again.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        SendwerkError::Io(_) | SendwerkError::Serialization(_) => HumanError {
            message: "The app's settings couldn't be read or saved.".into(),
            suggestion: "Default settings are being used. Reinstalling the app resets them.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        SendwerkError::PlatformUnavailable => HumanError {
            message: "Text messages can't be sent from this device.".into(),
            suggestion: "Use a phone with a SIM card.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },
    }
}

/// Explain a non-success outcome. Returns `None` for `Outcome::Success`.
pub fn humanize_outcome(outcome: &Outcome) -> Option<HumanError> {
    match outcome {
        Outcome::Success => None,
        Outcome::TimedOut => Some(HumanError {
            message: "We're not sure the message was sent.".into(),
            suggestion: "The phone didn't confirm in time. Check your Messages app before sending again.".into(),
            retriable: false,
            severity: Severity::Transient,
        }),
        Outcome::Failure(reason) => Some(humanize_failure(reason)),
    }
}

fn humanize_failure(reason: &str) -> HumanError {
    let lower = reason.to_ascii_lowercase();

    if lower.contains("radio off") {
        HumanError {
            message: "The phone's radio is switched off.".into(),
            suggestion: "Turn airplane mode off, then try again.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        }
    } else if lower.contains("no service") {
        HumanError {
            message: "There's no mobile signal.".into(),
            suggestion: "Move somewhere with better reception, then try again.".into(),
            retriable: true,
            severity: Severity::Transient,
        }
    } else if lower.contains("blocked") || lower.contains("permissions") {
        HumanError {
            message: "The phone's security settings blocked the message.".into(),
            suggestion: reason.to_string(),
            retriable: false,
            severity: Severity::ActionRequired,
        }
    } else {
        HumanError {
            message: "The message couldn't be sent.".into(),
            suggestion: format!("Try again in a moment. (Detail: {reason})"),
            retriable: true,
            severity: Severity::Transient,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_permission_is_action_required() {
        let human = humanize_error(&SendwerkError::PermissionDenied(Permission::SendSms));
        assert_eq!(human.severity, Severity::ActionRequired);
        assert!(!human.retriable);
    }

    #[test]
    fn bad_arguments_is_permanent() {
        let human = humanize_error(&SendwerkError::BadArguments("phone missing".into()));
        assert_eq!(human.severity, Severity::Permanent);
    }

    #[test]
    fn success_has_no_explanation() {
        assert!(humanize_outcome(&Outcome::Success).is_none());
    }

    #[test]
    fn timeout_is_not_retriable() {
        let human = humanize_outcome(&Outcome::TimedOut).unwrap();
        assert!(!human.retriable);
        assert!(human.message.contains("not sure"));
    }

    #[test]
    fn radio_off_is_action_required() {
        let human = humanize_outcome(&Outcome::Failure("radio off (turn airplane mode off)".into()))
            .unwrap();
        assert_eq!(human.severity, Severity::ActionRequired);
    }

    #[test]
    fn unknown_failure_keeps_detail() {
        let human = humanize_outcome(&Outcome::Failure("unknown error code: 999".into())).unwrap();
        assert!(human.suggestion.contains("999"));
        assert_eq!(human.severity, Severity::Transient);
    }
}
