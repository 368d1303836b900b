// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Sendwerk Dispatch — picks a carrier subscription, submits the message, and
// waits for the platform's correlated acknowledgment. This crate sits between
// the plugin call surface and the native telephony bridge.

pub mod dispatcher;
pub mod selector;
pub mod translator;
pub mod waiter;

#[cfg(test)]
pub(crate) mod test_support;

pub use dispatcher::Dispatcher;
pub use selector::select_channel;
pub use translator::translate;
pub use waiter::OutcomeWaiter;
