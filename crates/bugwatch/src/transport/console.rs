// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use async_trait::async_trait;
use bugwatch_core::Event;
use tracing::{debug, info};

use super::Transport;
use crate::error::TransportError;

/// Transport that logs events locally instead of sending them.
#[derive(Debug, Default, Clone)]
pub struct ConsoleTransport {
	/// Also log the full JSON payload at debug level.
	verbose: bool,
}

impl ConsoleTransport {
	pub fn new(verbose: bool) -> Self {
		Self { verbose }
	}
}

#[async_trait]
impl Transport for ConsoleTransport {
	async fn send(&self, event: Event) -> Result<(), TransportError> {
		let exception = event
			.exception
			.as_ref()
			.map(|e| format!("{}: {}", e.error_type, e.value));

		info!(
			event_id = %event.event_id,
			level = %event.level,
			exception = exception.as_deref().unwrap_or("-"),
			message = event.message.as_deref().unwrap_or("-"),
			fingerprint = event.fingerprint().unwrap_or("-"),
			tags = ?event.tags,
			"[Bugwatch] event"
		);

		if self.verbose {
			debug!(payload = %serde_json::to_string(&event)?, "[Bugwatch] event payload");
		}

		Ok(())
	}

	fn name(&self) -> &'static str {
		"console"
	}
}
