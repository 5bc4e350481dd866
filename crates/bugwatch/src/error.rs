// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the SDK.
//!
//! None of these cross the public capture API: capture calls return
//! `Option<EventId>` and configuration problems degrade to a disabled client.

use bugwatch_core::CoreError;
use thiserror::Error;

/// Result type alias for SDK operations.
pub type Result<T> = std::result::Result<T, SdkError>;

/// Errors raised while configuring the SDK.
#[derive(Debug, Error)]
pub enum SdkError {
	/// No usable credential or endpoint.
	#[error("invalid configuration: {0}")]
	ConfigurationInvalid(String),

	/// The DSN could not be parsed.
	#[error("invalid DSN: {0}")]
	Dsn(#[from] CoreError),

	/// An ignore pattern is not a valid regular expression.
	#[error("invalid ignore pattern: {0}")]
	InvalidPattern(#[from] regex::Error),
}

/// Errors raised while delivering an event. Terminal for that event.
#[derive(Debug, Error)]
pub enum TransportError {
	/// HTTP request failed before a response arrived.
	#[error("HTTP request failed: {0}")]
	Request(#[from] reqwest::Error),

	/// Server answered with a non-2xx status.
	#[error("server error (status {status})")]
	Status {
		/// HTTP status code.
		status: u16,
	},

	/// Server answered 429.
	#[error("rate limited, retry after {retry_after_secs:?} seconds")]
	RateLimited {
		/// Value of the `Retry-After` header, when present and numeric.
		retry_after_secs: Option<u64>,
	},

	/// Event could not be serialized.
	#[error("serialization error: {0}")]
	Serialization(#[from] serde_json::Error),

	/// The transport has been closed.
	#[error("transport has been closed")]
	Closed,
}
