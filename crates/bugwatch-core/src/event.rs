// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The event type delivered to the Bugwatch ingest API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::breadcrumb::Breadcrumb;
use crate::context::{RuntimeInfo, UserContext};
use crate::error::CoreError;
use crate::fingerprint::fingerprint;
use crate::stacktrace::StackFrame;

/// Tag key under which the grouping fingerprint is attached to an event.
pub const FINGERPRINT_TAG: &str = "fingerprint";

/// Unique identifier of a single event.
///
/// Generated as a UUIDv7: a millisecond timestamp prefix followed by random
/// bits, so ids sort roughly by creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(pub Uuid);

impl EventId {
	pub fn new() -> Self {
		Self(Uuid::now_v7())
	}
}

impl Default for EventId {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Display for EventId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl FromStr for EventId {
	type Err = uuid::Error;

	fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
		Ok(Self(Uuid::parse_str(s)?))
	}
}

/// Severity of an event or breadcrumb.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
	Debug,
	Info,
	Warning,
	#[default]
	Error,
	Fatal,
}

impl fmt::Display for Level {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Debug => write!(f, "debug"),
			Self::Info => write!(f, "info"),
			Self::Warning => write!(f, "warning"),
			Self::Error => write!(f, "error"),
			Self::Fatal => write!(f, "fatal"),
		}
	}
}

impl FromStr for Level {
	type Err = CoreError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"debug" => Ok(Self::Debug),
			"info" => Ok(Self::Info),
			"warning" | "warn" => Ok(Self::Warning),
			"error" => Ok(Self::Error),
			"fatal" => Ok(Self::Fatal),
			_ => Err(CoreError::InvalidLevel(s.to_string())),
		}
	}
}

/// Name and version of the library that produced an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SdkInfo {
	pub name: String,
	pub version: String,
}

impl SdkInfo {
	pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			version: version.into(),
		}
	}
}

/// The exception part of an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExceptionInfo {
	#[serde(rename = "type")]
	pub error_type: String,
	pub value: String,
	#[serde(default)]
	pub stacktrace: Vec<StackFrame>,
}

impl ExceptionInfo {
	pub fn new(error_type: impl Into<String>, value: impl Into<String>) -> Self {
		Self {
			error_type: error_type.into(),
			value: value.into(),
			stacktrace: Vec::new(),
		}
	}

	pub fn with_stacktrace(mut self, stacktrace: Vec<StackFrame>) -> Self {
		self.stacktrace = stacktrace;
		self
	}

	/// Grouping key for this exception. An empty stacktrace counts as absent.
	pub fn fingerprint(&self) -> String {
		let frames = (!self.stacktrace.is_empty()).then_some(self.stacktrace.as_slice());
		fingerprint(&self.error_type, &self.value, frames)
	}
}

/// One reported occurrence of an error or message.
///
/// Breadcrumbs, tags, extra and user are snapshots taken when the event was
/// built; nothing holds a live reference back into client state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
	pub event_id: EventId,
	pub timestamp: DateTime<Utc>,
	pub level: Level,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub message: Option<String>,
	pub platform: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub environment: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub release: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub server_name: Option<String>,
	#[serde(default)]
	pub tags: HashMap<String, String>,
	#[serde(default)]
	pub extra: HashMap<String, serde_json::Value>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub user: Option<UserContext>,
	#[serde(default)]
	pub breadcrumbs: Vec<Breadcrumb>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub exception: Option<ExceptionInfo>,
	pub sdk: SdkInfo,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub runtime: Option<RuntimeInfo>,
}

impl Event {
	/// Creates an empty event with a fresh id and the current timestamp.
	pub fn new(level: Level, platform: impl Into<String>, sdk: SdkInfo) -> Self {
		Self {
			event_id: EventId::new(),
			timestamp: Utc::now(),
			level,
			message: None,
			platform: platform.into(),
			environment: None,
			release: None,
			server_name: None,
			tags: HashMap::new(),
			extra: HashMap::new(),
			user: None,
			breadcrumbs: Vec::new(),
			exception: None,
			sdk,
			runtime: None,
		}
	}

	/// The grouping fingerprint, if one was attached.
	pub fn fingerprint(&self) -> Option<&str> {
		self.tags.get(FINGERPRINT_TAG).map(String::as_str)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	fn sdk() -> SdkInfo {
		SdkInfo::new("bugwatch-rust", "0.1.0")
	}

	#[test]
	fn event_ids_are_distinct() {
		let a = EventId::new();
		let b = EventId::new();
		assert_ne!(a, b);
	}

	#[test]
	fn event_ids_sort_by_creation_time() {
		let a = EventId::new();
		std::thread::sleep(std::time::Duration::from_millis(2));
		let b = EventId::new();
		assert!(a.0 < b.0);
	}

	#[test]
	fn level_accepts_warn_alias() {
		assert_eq!("warn".parse::<Level>().unwrap(), Level::Warning);
		assert!("loud".parse::<Level>().is_err());
	}

	#[test]
	fn exception_serializes_type_field() {
		let exception = ExceptionInfo::new("TypeError", "x is undefined");
		let json = serde_json::to_value(&exception).unwrap();
		assert_eq!(json["type"], "TypeError");
		assert_eq!(json["value"], "x is undefined");
		assert!(json["stacktrace"].as_array().unwrap().is_empty());
	}

	#[test]
	fn event_omits_absent_optionals() {
		let event = Event::new(Level::Info, "rust", sdk());
		let json = serde_json::to_value(&event).unwrap();
		assert_eq!(json["level"], "info");
		assert_eq!(json["platform"], "rust");
		assert_eq!(json["sdk"]["name"], "bugwatch-rust");
		assert!(json.get("exception").is_none());
		assert!(json.get("user").is_none());
		assert!(json.get("message").is_none());
	}

	#[test]
	fn empty_stacktrace_fingerprints_like_no_stacktrace() {
		let exception = ExceptionInfo::new("Error", "boom");
		assert_eq!(exception.fingerprint(), fingerprint("Error", "boom", None));
	}

	#[test]
	fn fingerprint_accessor_reads_tag() {
		let mut event = Event::new(Level::Error, "rust", sdk());
		assert_eq!(event.fingerprint(), None);
		event
			.tags
			.insert(FINGERPRINT_TAG.to_string(), "deadbeef".to_string());
		assert_eq!(event.fingerprint(), Some("deadbeef"));
	}

	proptest! {
		#[test]
		fn level_roundtrip(level in prop_oneof![
			Just(Level::Debug),
			Just(Level::Info),
			Just(Level::Warning),
			Just(Level::Error),
			Just(Level::Fatal),
		]) {
			let parsed: Level = level.to_string().parse().unwrap();
			prop_assert_eq!(level, parsed);
		}

		#[test]
		fn event_id_roundtrip(uuid_bytes in any::<[u8; 16]>()) {
			let id = EventId(Uuid::from_bytes(uuid_bytes));
			let parsed: EventId = id.to_string().parse().unwrap();
			prop_assert_eq!(id, parsed);
		}
	}
}
