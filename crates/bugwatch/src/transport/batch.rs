// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Event batching and background flush.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use bugwatch_core::Event;
use futures::future::join_all;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::Transport;
use crate::error::TransportError;

/// Configuration for the batching transport.
#[derive(Debug, Clone)]
pub struct BatchConfig {
	/// Queue length that triggers an immediate flush, and the most events a
	/// single flush dispatches.
	pub max_batch_size: usize,
	/// Interval between timer-driven flushes.
	pub flush_interval: Duration,
}

impl Default for BatchConfig {
	fn default() -> Self {
		Self {
			max_batch_size: 10,
			flush_interval: Duration::from_secs(5),
		}
	}
}

/// Wraps another transport, queueing events and dispatching them in batches.
///
/// A flush takes up to `max_batch_size` of the oldest queued events and sends
/// them to the wrapped transport concurrently; one failing event does not
/// hold back the rest. Flushes happen when the queue reaches
/// `max_batch_size` and on every `flush_interval` tick.
///
/// The timer runs as a task on the tokio runtime current at construction. It
/// is aborted by [`Transport::close`] or when the transport is dropped, and
/// never keeps the runtime busy while idle.
pub struct BatchTransport {
	shared: Arc<BatchShared>,
	timer: Mutex<Option<JoinHandle<()>>>,
}

struct BatchShared {
	max_batch_size: usize,
	inner: Arc<dyn Transport>,
	queue: Mutex<VecDeque<Event>>,
	closed: AtomicBool,
	debug: bool,
}

impl BatchTransport {
	/// Creates a batching transport around `inner` and starts its flush timer.
	///
	/// Outside a tokio runtime no timer is started; events then flush only on
	/// size or explicit [`Transport::flush`].
	pub fn new(inner: Arc<dyn Transport>, config: BatchConfig, debug: bool) -> Self {
		let shared = Arc::new(BatchShared {
			max_batch_size: config.max_batch_size.max(1),
			inner,
			queue: Mutex::new(VecDeque::new()),
			closed: AtomicBool::new(false),
			debug,
		});

		let timer = match Handle::try_current() {
			Ok(handle) => Some(handle.spawn(run_timer(
				Arc::downgrade(&shared),
				config.flush_interval,
			))),
			Err(_) => {
				warn!("No tokio runtime available, batch flush timer not started");
				None
			}
		};

		info!(
			flush_interval_secs = config.flush_interval.as_secs_f64(),
			max_batch_size = shared.max_batch_size,
			inner = shared.inner.name(),
			"Starting batch transport"
		);

		Self {
			shared,
			timer: Mutex::new(timer),
		}
	}

	/// Dispatches one batch. Returns the number of events taken from the
	/// queue; zero means the queue was empty and nothing was sent.
	pub async fn flush_batch(&self) -> usize {
		self.shared.flush_batch().await
	}

	/// Returns the number of events currently queued.
	pub fn queue_len(&self) -> usize {
		self.shared.queue.lock().len()
	}

	fn stop_timer(&self) {
		if let Some(timer) = self.timer.lock().take() {
			timer.abort();
		}
	}
}

impl BatchShared {
	async fn flush_batch(&self) -> usize {
		let batch: Vec<Event> = {
			let mut queue = self.queue.lock();
			let take = queue.len().min(self.max_batch_size);
			queue.drain(..take).collect()
		};

		if batch.is_empty() {
			return 0;
		}

		let count = batch.len();
		debug!(count, "Flushing event batch");

		let results = join_all(batch.into_iter().map(|event| self.inner.send(event))).await;
		let failed = results.iter().filter(|r| r.is_err()).count();
		if failed > 0 && self.debug {
			for err in results.iter().filter_map(|r| r.as_ref().err()) {
				warn!(error = %err, transport = self.inner.name(), "Batched event delivery failed");
			}
		}

		count
	}
}

async fn run_timer(shared: Weak<BatchShared>, period: Duration) {
	let mut ticker = interval_at(Instant::now() + period, period);
	ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

	loop {
		ticker.tick().await;

		let Some(shared) = shared.upgrade() else {
			break;
		};
		if shared.closed.load(Ordering::SeqCst) {
			break;
		}
		shared.flush_batch().await;
	}

	debug!("Batch flush timer stopped");
}

#[async_trait]
impl Transport for BatchTransport {
	async fn send(&self, event: Event) -> Result<(), TransportError> {
		if self.shared.closed.load(Ordering::SeqCst) {
			return Err(TransportError::Closed);
		}

		let should_flush = {
			let mut queue = self.shared.queue.lock();
			queue.push_back(event);
			queue.len() >= self.shared.max_batch_size
		};

		if should_flush {
			self.shared.flush_batch().await;
		}

		Ok(())
	}

	async fn flush(&self) {
		while self.shared.flush_batch().await > 0 {}
		self.shared.inner.flush().await;
	}

	fn close(&self) {
		if self.shared.closed.swap(true, Ordering::SeqCst) {
			return;
		}
		self.stop_timer();
		self.shared.inner.close();
		info!("Batch transport stopped");
	}

	fn name(&self) -> &'static str {
		"batch"
	}
}

impl Drop for BatchTransport {
	fn drop(&mut self) {
		self.stop_timer();
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::transport::testing::{event, settle, RecordingTransport};
	use std::collections::HashSet;

	fn batch(inner: &Arc<RecordingTransport>, max_batch_size: usize, secs: u64) -> BatchTransport {
		BatchTransport::new(
			inner.clone(),
			BatchConfig {
				max_batch_size,
				flush_interval: Duration::from_secs(secs),
			},
			true,
		)
	}

	#[tokio::test]
	async fn flushes_exactly_at_max_batch_size() {
		let inner = Arc::new(RecordingTransport::default());
		let transport = batch(&inner, 3, 60);

		transport.send(event("a")).await.unwrap();
		transport.send(event("b")).await.unwrap();
		assert_eq!(inner.len(), 0);
		assert_eq!(transport.queue_len(), 2);

		transport.send(event("c")).await.unwrap();
		assert_eq!(inner.len(), 3);
		assert_eq!(transport.queue_len(), 0);

		let messages: Vec<_> = inner
			.events()
			.into_iter()
			.filter_map(|e| e.message)
			.collect();
		assert_eq!(messages, ["a", "b", "c"]);
	}

	#[tokio::test(start_paused = true)]
	async fn timer_flushes_below_batch_size() {
		let inner = Arc::new(RecordingTransport::default());
		let transport = batch(&inner, 10, 5);

		transport.send(event("a")).await.unwrap();
		transport.send(event("b")).await.unwrap();
		assert_eq!(inner.len(), 0);

		tokio::time::sleep(Duration::from_millis(5_100)).await;
		settle().await;
		assert_eq!(inner.len(), 2);

		assert_eq!(transport.flush_batch().await, 0);
		tokio::time::sleep(Duration::from_secs(5)).await;
		settle().await;
		assert_eq!(inner.len(), 2);
	}

	#[tokio::test]
	async fn flush_takes_oldest_prefix() {
		let inner = Arc::new(RecordingTransport::default());
		let transport = batch(&inner, 2, 60);

		{
			let mut queue = transport.shared.queue.lock();
			for name in ["a", "b", "c"] {
				queue.push_back(event(name));
			}
		}

		assert_eq!(transport.flush_batch().await, 2);
		assert_eq!(transport.queue_len(), 1);
		let messages: Vec<_> = inner.events().into_iter().filter_map(|e| e.message).collect();
		assert_eq!(messages, ["a", "b"]);
	}

	#[tokio::test]
	async fn failures_do_not_block_the_batch() {
		let inner = Arc::new(RecordingTransport::failing());
		let transport = batch(&inner, 4, 60);

		for i in 0..4 {
			transport.send(event(&format!("e{i}"))).await.unwrap();
		}

		assert_eq!(inner.len(), 4);
		assert_eq!(transport.queue_len(), 0);
	}

	#[tokio::test]
	async fn flush_drains_whole_queue() {
		let inner = Arc::new(RecordingTransport::default());
		let transport = batch(&inner, 100, 60);

		for i in 0..7 {
			transport.send(event(&format!("e{i}"))).await.unwrap();
		}
		transport.flush().await;

		assert_eq!(inner.len(), 7);
		assert_eq!(transport.queue_len(), 0);
	}

	#[tokio::test]
	async fn close_is_idempotent_and_rejects_sends() {
		let inner = Arc::new(RecordingTransport::default());
		let transport = batch(&inner, 10, 60);

		transport.close();
		transport.close();
		assert_eq!(inner.close_calls(), 1);

		let result = transport.send(event("late")).await;
		assert!(matches!(result, Err(TransportError::Closed)));
	}

	#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
	async fn concurrent_sends_are_neither_lost_nor_duplicated() {
		let inner = Arc::new(RecordingTransport::default());
		let transport = Arc::new(batch(&inner, 7, 60));

		let tasks: Vec<_> = (0..8)
			.map(|t| {
				let transport = transport.clone();
				tokio::spawn(async move {
					for i in 0..25 {
						transport.send(event(&format!("{t}-{i}"))).await.unwrap();
					}
				})
			})
			.collect();
		for task in tasks {
			task.await.unwrap();
		}
		transport.flush().await;

		let events = inner.events();
		assert_eq!(events.len(), 200);
		let ids: HashSet<_> = events.iter().map(|e| e.event_id).collect();
		assert_eq!(ids.len(), 200);
	}

	#[test]
	fn builds_without_runtime() {
		let inner = Arc::new(RecordingTransport::default());
		let transport = batch(&inner, 10, 5);
		assert!(transport.timer.lock().is_none());
	}

	#[test]
	fn default_config() {
		let config = BatchConfig::default();
		assert_eq!(config.max_batch_size, 10);
		assert_eq!(config.flush_interval, Duration::from_secs(5));
	}
}
