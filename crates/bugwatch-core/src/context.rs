// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Context types attached to events (user identity, runtime).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Identity of the user affected by an event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserContext {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub id: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub email: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub username: Option<String>,
	/// IP address (sensitive - not displayed by default)
	#[serde(skip_serializing_if = "Option::is_none")]
	pub ip_address: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub extra: Option<HashMap<String, serde_json::Value>>,
}

impl UserContext {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_id(mut self, id: impl Into<String>) -> Self {
		self.id = Some(id.into());
		self
	}

	pub fn with_email(mut self, email: impl Into<String>) -> Self {
		self.email = Some(email.into());
		self
	}

	pub fn with_username(mut self, username: impl Into<String>) -> Self {
		self.username = Some(username.into());
		self
	}
}

/// Where the instrumented code is running.
///
/// Supplied by the adapter layer; the SDK never inspects its surroundings to
/// work this out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeKind {
	Browser,
	#[default]
	Server,
	Edge,
}

impl fmt::Display for RuntimeKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Browser => write!(f, "browser"),
			Self::Server => write!(f, "server"),
			Self::Edge => write!(f, "edge"),
		}
	}
}

impl FromStr for RuntimeKind {
	type Err = CoreError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"browser" => Ok(Self::Browser),
			"server" => Ok(Self::Server),
			"edge" => Ok(Self::Edge),
			_ => Err(CoreError::InvalidRuntime(s.to_string())),
		}
	}
}

/// Runtime description recorded on every event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeInfo {
	pub kind: RuntimeKind,
	/// "node", "browser", "rust"
	pub name: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub version: Option<String>,
}

impl RuntimeInfo {
	pub fn new(kind: RuntimeKind, name: impl Into<String>) -> Self {
		Self {
			kind,
			name: name.into(),
			version: None,
		}
	}

	pub fn with_version(mut self, version: impl Into<String>) -> Self {
		self.version = Some(version.into());
		self
	}
}

impl Default for RuntimeInfo {
	fn default() -> Self {
		Self::new(RuntimeKind::Server, "rust")
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	#[test]
	fn user_context_skips_empty_fields() {
		let user = UserContext::new().with_id("u_1");
		let json = serde_json::to_value(&user).unwrap();
		assert_eq!(json, serde_json::json!({ "id": "u_1" }));
	}

	#[test]
	fn runtime_defaults_to_rust_server() {
		let runtime = RuntimeInfo::default();
		assert_eq!(runtime.kind, RuntimeKind::Server);
		assert_eq!(runtime.name, "rust");
	}

	proptest! {
		#[test]
		fn runtime_kind_roundtrip(kind in prop_oneof![
			Just(RuntimeKind::Browser),
			Just(RuntimeKind::Server),
			Just(RuntimeKind::Edge),
		]) {
			let parsed: RuntimeKind = kind.to_string().parse().unwrap();
			prop_assert_eq!(kind, parsed);
		}
	}
}
