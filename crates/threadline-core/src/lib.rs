// SPDX-FileCopyrightText: 2026 Threadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Threadline conversation control plane.
//!
//! This crate provides the foundational trait definitions, error types, and
//! conversation domain types used throughout the Threadline workspace.
//! Storage and engine backends implement the traits defined here.

pub mod context;
pub mod error;
pub mod identity;
pub mod traits;
pub mod types;
pub mod workflow;

// Re-export key items at crate root for ergonomic imports.
pub use context::RequestContext;
pub use error::{ErrorKind, ThreadlineError};
pub use types::{AdapterType, HealthStatus};

pub use traits::{PluginAdapter, ThreadStore, WorkflowEngine};
