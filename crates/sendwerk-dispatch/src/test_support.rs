// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Recording telephony fake for unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use sendwerk_bridge::ack::InMemoryAckRegistry;
use sendwerk_bridge::traits::{
    NativePermissions, NativeSms, NativeSubscriptions, PlatformBridge, Submission,
};
use sendwerk_core::error::{Result, SendwerkError};
use sendwerk_core::types::{Channel, CorrelationToken, Permission};

/// What the fake "platform" does after accepting a submission.
#[derive(Debug, Clone)]
pub enum AckPlan {
    /// Never acknowledge.
    Never,
    /// Deliver these codes, in order, before `submit` returns.
    Immediate(Vec<i32>),
    /// Deliver one code from another thread after a delay.
    Delayed(Duration, i32),
}

/// One recorded call to `submit`.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub channel: Channel,
    pub recipient: String,
    pub segments: Vec<String>,
    pub sent_token: CorrelationToken,
    pub delivery_token: Option<CorrelationToken>,
    /// Whether a listener was already armed for `sent_token` when submitted.
    pub armed_at_submit: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counts {
    pub permission_calls: usize,
    pub default_calls: usize,
    pub active_calls: usize,
    pub submit_calls: usize,
}

pub struct FakeBridge {
    send_sms: bool,
    read_phone_state: bool,
    default_subscription: std::result::Result<i32, String>,
    active: std::result::Result<Vec<Channel>, String>,
    submit_error: Option<String>,
    ack_plan: AckPlan,
    acks: Arc<InMemoryAckRegistry>,

    permission_calls: AtomicUsize,
    default_calls: AtomicUsize,
    active_calls: AtomicUsize,
    submit_calls: AtomicUsize,
    recorded: Mutex<Vec<Recorded>>,
}

impl FakeBridge {
    pub fn builder() -> FakeBridgeBuilder {
        FakeBridgeBuilder::default()
    }

    pub fn counts(&self) -> Counts {
        Counts {
            permission_calls: self.permission_calls.load(Ordering::SeqCst),
            default_calls: self.default_calls.load(Ordering::SeqCst),
            active_calls: self.active_calls.load(Ordering::SeqCst),
            submit_calls: self.submit_calls.load(Ordering::SeqCst),
        }
    }

    pub fn recorded(&self) -> Vec<Recorded> {
        self.recorded.lock().unwrap().clone()
    }

    pub fn acks(&self) -> Arc<InMemoryAckRegistry> {
        Arc::clone(&self.acks)
    }
}

impl PlatformBridge for FakeBridge {
    fn platform_name(&self) -> &str {
        "Fake"
    }
}

impl NativePermissions for FakeBridge {
    fn has_permission(&self, permission: Permission) -> bool {
        self.permission_calls.fetch_add(1, Ordering::SeqCst);
        match permission {
            Permission::SendSms => self.send_sms,
            Permission::ReadPhoneState => self.read_phone_state,
        }
    }
}

impl NativeSubscriptions for FakeBridge {
    fn default_sms_subscription_id(&self) -> Result<i32> {
        self.default_calls.fetch_add(1, Ordering::SeqCst);
        self.default_subscription
            .clone()
            .map_err(SendwerkError::ChannelProbe)
    }

    fn active_subscriptions(&self) -> Result<Vec<Channel>> {
        self.active_calls.fetch_add(1, Ordering::SeqCst);
        self.active.clone().map_err(SendwerkError::ChannelProbe)
    }
}

impl NativeSms for FakeBridge {
    fn submit(&self, submission: &Submission<'_>) -> Result<()> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        let token = submission.sent_token;
        self.recorded.lock().unwrap().push(Recorded {
            channel: submission.channel.clone(),
            recipient: submission.recipient.to_string(),
            segments: submission.segments.to_vec(),
            sent_token: token,
            delivery_token: submission.delivery_token,
            armed_at_submit: self.acks.is_registered(&token),
        });

        if let Some(detail) = &self.submit_error {
            return Err(SendwerkError::Submission(detail.clone()));
        }

        match &self.ack_plan {
            AckPlan::Never => {}
            AckPlan::Immediate(codes) => {
                for code in codes {
                    self.acks.deliver(&token, *code);
                }
            }
            AckPlan::Delayed(delay, code) => {
                let acks = Arc::clone(&self.acks);
                let (delay, code) = (*delay, *code);
                std::thread::spawn(move || {
                    std::thread::sleep(delay);
                    acks.deliver(&token, code);
                });
            }
        }
        Ok(())
    }
}

pub struct FakeBridgeBuilder {
    send_sms: bool,
    read_phone_state: bool,
    default_subscription: std::result::Result<i32, String>,
    active: std::result::Result<Vec<Channel>, String>,
    submit_error: Option<String>,
    ack_plan: AckPlan,
}

impl Default for FakeBridgeBuilder {
    fn default() -> Self {
        Self {
            send_sms: true,
            read_phone_state: true,
            default_subscription: Ok(1),
            active: Ok(Vec::new()),
            submit_error: None,
            ack_plan: AckPlan::Never,
        }
    }
}

impl FakeBridgeBuilder {
    pub fn send_sms(mut self, granted: bool) -> Self {
        self.send_sms = granted;
        self
    }

    pub fn read_phone_state(mut self, granted: bool) -> Self {
        self.read_phone_state = granted;
        self
    }

    pub fn default_subscription(mut self, id: Result<i32>) -> Self {
        self.default_subscription = id.map_err(|e| e.to_string());
        self
    }

    pub fn active(mut self, channels: Vec<Channel>) -> Self {
        self.active = Ok(channels);
        self
    }

    pub fn active_error(mut self, detail: &str) -> Self {
        self.active = Err(detail.to_string());
        self
    }

    pub fn submit_error(mut self, detail: &str) -> Self {
        self.submit_error = Some(detail.to_string());
        self
    }

    pub fn ack(mut self, plan: AckPlan) -> Self {
        self.ack_plan = plan;
        self
    }

    pub fn build(self) -> FakeBridge {
        FakeBridge {
            send_sms: self.send_sms,
            read_phone_state: self.read_phone_state,
            default_subscription: self.default_subscription,
            active: self.active,
            submit_error: self.submit_error,
            ack_plan: self.ack_plan,
            acks: Arc::new(InMemoryAckRegistry::new()),
            permission_calls: AtomicUsize::new(0),
            default_calls: AtomicUsize::new(0),
            active_calls: AtomicUsize::new(0),
            submit_calls: AtomicUsize::new(0),
            recorded: Mutex::new(Vec::new()),
        }
    }
}
