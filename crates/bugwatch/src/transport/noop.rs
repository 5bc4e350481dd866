// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use async_trait::async_trait;
use bugwatch_core::Event;

use super::Transport;
use crate::error::TransportError;

/// Transport that drops every event. Used by disabled clients.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTransport;

#[async_trait]
impl Transport for NoopTransport {
	async fn send(&self, _event: Event) -> Result<(), TransportError> {
		Ok(())
	}

	fn name(&self) -> &'static str {
		"noop"
	}
}
