// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Breadcrumbs: notes of application activity leading up to an event.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::event::Level;

/// A timestamped record of something the application did before an event.
///
/// The timestamp is overwritten by the client when the breadcrumb is
/// appended, so callers never control it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Breadcrumb {
	pub timestamp: DateTime<Utc>,
	/// "default", "http", "navigation", "query"
	#[serde(rename = "type", default = "default_type")]
	pub breadcrumb_type: String,
	pub category: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub message: Option<String>,
	pub level: Level,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub data: Option<HashMap<String, serde_json::Value>>,
}

fn default_type() -> String {
	"default".to_string()
}

impl Breadcrumb {
	pub fn new(category: impl Into<String>, message: impl Into<String>) -> Self {
		Self {
			message: Some(message.into()),
			..Self::category(category)
		}
	}

	/// A breadcrumb with a category and no message.
	pub fn category(category: impl Into<String>) -> Self {
		Self {
			category: category.into(),
			..Default::default()
		}
	}

	pub fn with_level(mut self, level: Level) -> Self {
		self.level = level;
		self
	}

	pub fn with_type(mut self, breadcrumb_type: impl Into<String>) -> Self {
		self.breadcrumb_type = breadcrumb_type.into();
		self
	}

	pub fn with_data(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
		self.data
			.get_or_insert_with(HashMap::new)
			.insert(key.into(), value);
		self
	}
}

impl Default for Breadcrumb {
	fn default() -> Self {
		Self {
			timestamp: Utc::now(),
			breadcrumb_type: default_type(),
			category: String::new(),
			message: None,
			level: Level::Info,
			data: None,
		}
	}
}
