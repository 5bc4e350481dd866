// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core types for the Bugwatch error telemetry SDK.
//!
//! This crate holds everything about an error event that can be computed
//! without touching the network or any runtime:
//!
//! - [`Event`], [`Breadcrumb`], [`StackFrame`] and the context types attached to them
//! - [`parse_stack_trace`]: turns platform trace text into ordered frames
//! - [`fingerprint`]: derives the 8-character grouping key for an error
//! - [`Dsn`]: parses `scheme://publicKey@host/projectId` connection strings
//!
//! Every function here is pure and total over its input. The client crate
//! (`bugwatch`) composes these pieces and owns delivery.

pub mod breadcrumb;
pub mod context;
pub mod dsn;
pub mod error;
pub mod event;
pub mod fingerprint;
pub mod stacktrace;

pub use breadcrumb::Breadcrumb;
pub use context::{RuntimeInfo, RuntimeKind, UserContext};
pub use dsn::Dsn;
pub use error::{CoreError, Result};
pub use event::{Event, EventId, ExceptionInfo, Level, SdkInfo, FINGERPRINT_TAG};
pub use fingerprint::{fingerprint, normalize_message};
pub use stacktrace::{normalize_filename, parse_stack_trace, StackFrame};
