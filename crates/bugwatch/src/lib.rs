// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Bugwatch error telemetry SDK for Rust.
//!
//! Captures errors, panics and messages, groups them with a stable
//! fingerprint and delivers them to the Bugwatch ingest API without ever
//! blocking or failing the host application.
//!
//! # Example
//!
//! ```no_run
//! use bugwatch::{BatchConfig, Level};
//!
//! #[tokio::main]
//! async fn main() {
//!     let client = bugwatch::ClientBuilder::from_env()
//!         .release(env!("CARGO_PKG_VERSION"))
//!         .batching(BatchConfig::default())
//!         .build();
//!     bugwatch::install_panic_hook(client.clone());
//!
//!     client.capture_message("service started", Level::Info);
//!
//!     client.shutdown().await;
//! }
//! ```
//!
//! Without an async runtime, deliveries run on a thread the client starts
//! on first use:
//!
//! ```no_run
//! use std::time::Duration;
//!
//! let client = bugwatch::ClientBuilder::from_env().build();
//! client.capture_message("job finished", bugwatch::Level::Info);
//! client.shutdown_blocking(Duration::from_secs(5));
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod panic_hook;
pub mod registry;
pub mod sampling;
pub mod transport;
mod worker;

pub use client::{CaptureContext, Client, ClientBuilder, ErrorReport, MAX_BREADCRUMBS};
pub use config::{BeforeSend, IgnorePattern};
pub use error::{Result, SdkError, TransportError};
pub use panic_hook::install_panic_hook;
pub use sampling::{FastrandSampler, Sampler};
pub use transport::{
	BatchConfig, BatchTransport, ConsoleTransport, HttpTransport, NoopTransport, Transport,
};

pub use bugwatch_core::{
	fingerprint, normalize_filename, parse_stack_trace, Breadcrumb, Dsn, Event, EventId,
	ExceptionInfo, Level, RuntimeInfo, RuntimeKind, SdkInfo, StackFrame, UserContext,
};

/// SDK name reported with every event.
pub const SDK_NAME: &str = "bugwatch-rust";
/// SDK version reported with every event.
pub const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");
