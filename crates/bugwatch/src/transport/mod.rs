// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Delivery transports.
//!
//! A [`Transport`] moves a built [`Event`] off the process. The client never
//! awaits a transport on the capture path and never sees its errors; a failed
//! delivery is terminal for that event.
//!
//! | Transport | Effect |
//! |-----------|--------|
//! | [`HttpTransport`] | `POST` the event as JSON to the ingest API |
//! | [`BatchTransport`] | queue events and flush them to a wrapped transport |
//! | [`NoopTransport`] | drop everything (disabled clients) |
//! | [`ConsoleTransport`] | log events locally through `tracing` |

mod batch;
mod console;
mod http;
mod noop;

pub use batch::{BatchConfig, BatchTransport};
pub use console::ConsoleTransport;
pub use http::{HttpTransport, API_KEY_HEADER, SDK_NAME_HEADER, SDK_VERSION_HEADER};
pub use noop::NoopTransport;

use async_trait::async_trait;
use bugwatch_core::Event;

use crate::error::TransportError;

/// Delivery mechanism for built events.
#[async_trait]
pub trait Transport: Send + Sync {
	/// Deliver one event.
	async fn send(&self, event: Event) -> Result<(), TransportError>;

	/// Deliver anything still queued. Transports without a queue do nothing.
	async fn flush(&self) {}

	/// Stop background work. Must be idempotent.
	fn close(&self) {}

	/// Short name used in log lines.
	fn name(&self) -> &'static str;
}

#[cfg(test)]
pub(crate) mod testing {
	use super::*;
	use parking_lot::Mutex;
	use std::sync::atomic::{AtomicUsize, Ordering};

	/// Records every event it receives. Can be told to fail every send.
	#[derive(Default)]
	pub(crate) struct RecordingTransport {
		events: Mutex<Vec<Event>>,
		fail: bool,
		closed: AtomicUsize,
	}

	impl RecordingTransport {
		pub(crate) fn failing() -> Self {
			Self {
				fail: true,
				..Default::default()
			}
		}

		pub(crate) fn events(&self) -> Vec<Event> {
			self.events.lock().clone()
		}

		pub(crate) fn len(&self) -> usize {
			self.events.lock().len()
		}

		pub(crate) fn close_calls(&self) -> usize {
			self.closed.load(Ordering::SeqCst)
		}
	}

	#[async_trait]
	impl Transport for RecordingTransport {
		async fn send(&self, event: Event) -> Result<(), TransportError> {
			self.events.lock().push(event);
			if self.fail {
				return Err(TransportError::Status { status: 500 });
			}
			Ok(())
		}

		fn close(&self) {
			self.closed.fetch_add(1, Ordering::SeqCst);
		}

		fn name(&self) -> &'static str {
			"recording"
		}
	}

	pub(crate) fn event(message: &str) -> Event {
		let mut event = Event::new(
			bugwatch_core::Level::Error,
			"rust",
			bugwatch_core::SdkInfo::new("bugwatch-rust", "test"),
		);
		event.message = Some(message.to_string());
		event
	}

	/// Let spawned delivery tasks run to completion on a current-thread runtime.
	pub(crate) async fn settle() {
		for _ in 0..16 {
			tokio::task::yield_now().await;
		}
	}
}
