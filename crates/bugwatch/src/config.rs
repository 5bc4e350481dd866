// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Capture filters and environment configuration.

use std::fmt;
use std::sync::Arc;

use bugwatch_core::Event;
use regex::Regex;
use tracing::warn;

use crate::client::ClientBuilder;
use crate::error::Result;

/// Default ingest API base URL.
pub const DEFAULT_ENDPOINT: &str = "https://api.bugwatch.dev";
/// Default environment name.
pub const DEFAULT_ENVIRONMENT: &str = "production";

pub const ENV_DSN: &str = "BUGWATCH_DSN";
pub const ENV_API_KEY: &str = "BUGWATCH_API_KEY";
pub const ENV_ENDPOINT: &str = "BUGWATCH_ENDPOINT";
pub const ENV_ENVIRONMENT: &str = "BUGWATCH_ENVIRONMENT";
pub const ENV_RELEASE: &str = "BUGWATCH_RELEASE";
pub const ENV_SAMPLE_RATE: &str = "BUGWATCH_SAMPLE_RATE";
pub const ENV_DEBUG: &str = "BUGWATCH_DEBUG";

/// Hook run on every built event before it is handed to the transport.
///
/// Returning `None` drops the event. Returning `Some` sends the returned
/// event, which may have been modified.
pub type BeforeSend = Arc<dyn Fn(Event) -> Option<Event> + Send + Sync>;

/// Suppresses capture of errors whose message matches.
#[derive(Debug, Clone)]
pub enum IgnorePattern {
	/// Matches when the message contains the string.
	Literal(String),
	/// Matches when the regex matches anywhere in the message.
	Regex(Regex),
}

impl IgnorePattern {
	pub fn literal(text: impl Into<String>) -> Self {
		Self::Literal(text.into())
	}

	/// Compiles `pattern` into a regex matcher.
	pub fn regex(pattern: &str) -> Result<Self> {
		Ok(Self::Regex(Regex::new(pattern)?))
	}

	pub fn matches(&self, message: &str) -> bool {
		match self {
			Self::Literal(text) => message.contains(text.as_str()),
			Self::Regex(regex) => regex.is_match(message),
		}
	}
}

impl fmt::Display for IgnorePattern {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Literal(text) => write!(f, "{text}"),
			Self::Regex(regex) => write!(f, "/{}/", regex.as_str()),
		}
	}
}

impl From<&str> for IgnorePattern {
	fn from(text: &str) -> Self {
		Self::Literal(text.to_string())
	}
}

impl From<String> for IgnorePattern {
	fn from(text: String) -> Self {
		Self::Literal(text)
	}
}

impl From<Regex> for IgnorePattern {
	fn from(regex: Regex) -> Self {
		Self::Regex(regex)
	}
}

impl ClientBuilder {
	/// Creates a builder seeded from `BUGWATCH_*` environment variables.
	///
	/// Unset variables leave the builder defaults in place. Values that fail
	/// to parse are ignored with a warning.
	pub fn from_env() -> Self {
		Self::from_lookup(|name| std::env::var(name).ok())
	}

	pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
		let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
		let mut builder = Self::new();

		if let Some(dsn) = var(ENV_DSN) {
			builder = builder.dsn(dsn);
		}
		if let Some(api_key) = var(ENV_API_KEY) {
			builder = builder.api_key(api_key);
		}
		if let Some(endpoint) = var(ENV_ENDPOINT) {
			builder = builder.endpoint(endpoint);
		}
		if let Some(environment) = var(ENV_ENVIRONMENT) {
			builder = builder.environment(environment);
		}
		if let Some(release) = var(ENV_RELEASE) {
			builder = builder.release(release);
		}
		if let Some(raw) = var(ENV_SAMPLE_RATE) {
			match raw.trim().parse::<f64>() {
				Ok(rate) => builder = builder.sample_rate(rate),
				Err(_) => warn!(variable = ENV_SAMPLE_RATE, value = %raw, "Ignoring unparsable sample rate"),
			}
		}
		if let Some(raw) = var(ENV_DEBUG) {
			match parse_bool(&raw) {
				Some(debug) => builder = builder.debug(debug),
				None => warn!(variable = ENV_DEBUG, value = %raw, "Ignoring unparsable boolean"),
			}
		}

		builder
	}
}

fn parse_bool(raw: &str) -> Option<bool> {
	match raw.trim().to_ascii_lowercase().as_str() {
		"1" | "true" | "yes" | "on" => Some(true),
		"0" | "false" | "no" | "off" => Some(false),
		_ => None,
	}
}
