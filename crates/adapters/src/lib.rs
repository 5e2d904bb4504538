// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Collaborators consumed by the ingestion engine

pub mod notify;
pub mod traced;
pub mod transport;
pub mod trigger;

pub use notify::{NoOpNotifyAdapter, NotifyAdapter, NotifyError, TracingNotifyAdapter};
pub use traced::TracedTransport;
pub use transport::{
    ConfiguredTransport, FileTransport, NoOpTransport, StdoutTransport, TransportAdapter,
    TransportError,
};
pub use trigger::{AgentTrigger, NoOpAgentTrigger, TriggerError};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use notify::{FakeNotifyAdapter, Notice};
#[cfg(any(test, feature = "test-support"))]
pub use transport::{FakeTransport, TransportCall};
#[cfg(any(test, feature = "test-support"))]
pub use trigger::{FakeAgentTrigger, TriggerCall};
