// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Client-owned delivery runtime for hosts without a tokio runtime.

use std::io;
use std::sync::mpsc;
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;
use tokio::runtime::{Builder, Handle};
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// Name of the background delivery thread.
pub(crate) const THREAD_NAME: &str = "bugwatch-delivery";

/// A current-thread tokio runtime driven on a background thread.
///
/// Started on first use. Dropping the worker stops the runtime without
/// waiting for the thread.
#[derive(Default)]
pub(crate) struct DeliveryWorker {
	state: Mutex<Option<Running>>,
}

struct Running {
	handle: Handle,
	stop: oneshot::Sender<()>,
	thread: JoinHandle<()>,
}

impl DeliveryWorker {
	/// Handle to the worker's runtime, starting the thread if needed.
	pub(crate) fn handle(&self) -> Option<Handle> {
		let mut state = self.state.lock();
		if let Some(running) = state.as_ref() {
			return Some(running.handle.clone());
		}

		match start() {
			Ok(running) => {
				let handle = running.handle.clone();
				*state = Some(running);
				debug!("Bugwatch delivery thread started");
				Some(handle)
			}
			Err(e) => {
				warn!(error = %e, "Failed to start bugwatch delivery thread");
				None
			}
		}
	}

	#[cfg(test)]
	fn is_running(&self) -> bool {
		self.state.lock().is_some()
	}

	/// Stops the runtime. Deliveries still queued on it are cancelled, so
	/// callers flush first. With `wait`, blocks until the thread has exited.
	pub(crate) fn stop(&self, wait: bool) {
		let Some(running) = self.state.lock().take() else {
			return;
		};
		let _ = running.stop.send(());

		if wait
			&& running.thread.thread().id() != thread::current().id()
			&& running.thread.join().is_err()
		{
			warn!("Bugwatch delivery thread panicked");
		}
	}
}

/// Whether the calling thread is a delivery thread.
pub(crate) fn on_delivery_thread() -> bool {
	thread::current().name() == Some(THREAD_NAME)
}

fn start() -> io::Result<Running> {
	let (ready_tx, ready_rx) = mpsc::channel();
	let (stop, stopped) = oneshot::channel::<()>();

	let thread = thread::Builder::new()
		.name(THREAD_NAME.to_string())
		.spawn(move || {
			let runtime = match Builder::new_current_thread().enable_all().build() {
				Ok(runtime) => runtime,
				Err(e) => {
					let _ = ready_tx.send(Err(e));
					return;
				}
			};
			let _ = ready_tx.send(Ok(runtime.handle().clone()));

			// Resolves on `stop` or when the sender is dropped with the client.
			runtime.block_on(async {
				let _ = stopped.await;
			});
			debug!("Bugwatch delivery thread stopped");
		})?;

	let handle = ready_rx
		.recv()
		.map_err(|_| io::Error::other("delivery thread exited during startup"))??;

	Ok(Running {
		handle,
		stop,
		thread,
	})
}
