// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Optional process-wide client.
//!
//! Convenience for code that cannot thread a [`Client`] through. Nothing else
//! in the crate reads the registry; with no client registered every call here
//! is a no-op.

use bugwatch_core::{Breadcrumb, EventId, Level};
use parking_lot::RwLock;
use tracing::debug;

use crate::client::{Client, ClientBuilder, ErrorReport};

static CURRENT: RwLock<Option<Client>> = parking_lot::const_rwlock(None);

/// Builds a client and registers it as the process-wide client, replacing
/// any previous one. Returns the new client.
pub fn init(builder: ClientBuilder) -> Client {
	let client = builder.build();
	set(client.clone());
	client
}

/// Registers `client` as the process-wide client.
pub fn set(client: Client) {
	if CURRENT.write().replace(client).is_some() {
		debug!("Replaced registered Bugwatch client");
	}
}

/// Returns the registered client, if any.
pub fn current() -> Option<Client> {
	CURRENT.read().clone()
}

/// Unregisters the process-wide client and returns it.
pub fn clear() -> Option<Client> {
	CURRENT.write().take()
}

/// Captures an error through the registered client.
pub fn capture_exception(error: impl Into<ErrorReport>) -> Option<EventId> {
	current()?.capture_exception(error)
}

/// Captures a message through the registered client.
pub fn capture_message(message: impl Into<String>, level: Level) -> Option<EventId> {
	current()?.capture_message(message, level)
}

/// Adds a breadcrumb through the registered client.
pub fn add_breadcrumb(breadcrumb: Breadcrumb) {
	if let Some(client) = current() {
		client.add_breadcrumb(breadcrumb);
	}
}
