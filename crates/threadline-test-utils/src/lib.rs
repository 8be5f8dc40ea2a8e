// SPDX-FileCopyrightText: 2026 Threadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Threadline integration tests.
//!
//! - [`MockEngine`] - in-memory orchestration engine that records every call
//! - [`TestHarness`] - temp SQLite store plus a full [`ConversationService`](threadline_conversation::ConversationService)

pub mod harness;
pub mod mock_engine;

pub use harness::{TestHarness, TestHarnessBuilder};
pub use mock_engine::{EngineCall, MockEngine};
