// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Panic hook for automatic crash reporting.

use std::backtrace::Backtrace;
use std::cell::Cell;
use std::panic;
use std::time::Duration;

use bugwatch_core::Level;
use tracing::debug;

use crate::client::{CaptureContext, Client, ErrorReport};
use crate::worker;

/// Exception type recorded for panics.
pub const PANIC_TYPE: &str = "panic";

/// How long the hook waits for the panic event to be delivered.
pub const PANIC_DELIVERY_TIMEOUT: Duration = Duration::from_secs(2);

/// Symbol prefix of the hook closure in a captured backtrace.
const HOOK_SYMBOL: &str = concat!(module_path!(), "::install_panic_hook");

thread_local! {
	static IN_HOOK: Cell<bool> = const { Cell::new(false) };
}

/// Installs a panic hook that captures panics through `client`.
///
/// Panics become `fatal` events of type `panic` with a forced backtrace,
/// starting at the panicking frame. The hook blocks for up to
/// [`PANIC_DELIVERY_TIMEOUT`] while the client's delivery thread sends the
/// event, so it survives the host runtime being dropped by the unwind. The
/// previously installed hook runs afterwards, so the default panic output is
/// kept.
pub fn install_panic_hook(client: Client) {
	let previous = panic::take_hook();

	panic::set_hook(Box::new(move |info| {
		// A panic raised while capturing (e.g. inside before_send) must not
		// recurse. Panics on the delivery thread would wait on themselves.
		if !worker::on_delivery_thread() && !IN_HOOK.with(|flag| flag.replace(true)) {
			let message = panic_message(info.payload());
			let mut context = CaptureContext::new().with_level(Level::Fatal);
			if let Some(location) = info.location() {
				context = context.with_extra(
					"panic.location",
					serde_json::Value::String(format!(
						"{}:{}:{}",
						location.file(),
						location.line(),
						location.column()
					)),
				);
			}

			let backtrace = Backtrace::force_capture().to_string();
			let report =
				ErrorReport::new(PANIC_TYPE, message).with_stack(strip_hook_frames(&backtrace));
			if let Some(event_id) =
				client.capture_exception_blocking(report, context, PANIC_DELIVERY_TIMEOUT)
			{
				debug!(event_id = %event_id, "Panic captured");
			}

			IN_HOOK.with(|flag| flag.set(false));
		}

		previous(info);
	}));
}

/// Drops the backtrace frames up to and including this hook, leaving the
/// panic runtime frames and the panicking code.
fn strip_hook_frames(backtrace: &str) -> &str {
	let mut offset = 0;
	let mut in_hook = false;

	for line in backtrace.split_inclusive('\n') {
		if is_symbol_line(line) {
			if in_hook {
				return &backtrace[offset..];
			}
			in_hook = line.contains(HOOK_SYMBOL);
		}
		offset += line.len();
	}

	if in_hook {
		""
	} else {
		backtrace
	}
}

/// `N: symbol` lines of a std backtrace.
fn is_symbol_line(line: &str) -> bool {
	line.trim_start()
		.split_once(':')
		.is_some_and(|(index, _)| !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit()))
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
	if let Some(s) = payload.downcast_ref::<&str>() {
		(*s).to_string()
	} else if let Some(s) = payload.downcast_ref::<String>() {
		s.clone()
	} else {
		"Box<dyn Any>".to_string()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use bugwatch_core::fingerprint::grouping_frame;
	use bugwatch_core::parse_stack_trace;

	const PANIC_BACKTRACE: &str = "   0: std::backtrace_rs::backtrace::libunwind::trace
             at /rustc/abc123/library/std/src/../../backtrace/src/backtrace/libunwind.rs:117:9
   1: std::backtrace::Backtrace::force_capture
             at /rustc/abc123/library/std/src/backtrace.rs:312:9
   2: bugwatch::panic_hook::install_panic_hook::{{closure}}
             at ./crates/bugwatch/src/panic_hook.rs:61:20
   3: std::panicking::rust_panic_with_hook
             at /rustc/abc123/library/std/src/panicking.rs:841:13
   4: __rustc::rust_begin_unwind
             at /rustc/abc123/library/std/src/panicking.rs:697:5
   5: core::panicking::panic_fmt
             at /rustc/abc123/library/core/src/panicking.rs:75:14
   6: my_app::orders::settle
             at ./src/orders.rs:18:5
   7: my_app::main
             at ./src/main.rs:4:5
";

	#[test]
	fn hook_symbol_names_this_function() {
		assert_eq!(HOOK_SYMBOL, "bugwatch::panic_hook::install_panic_hook");
	}

	#[test]
	fn panics_group_by_the_panicking_frame() {
		let unstripped = parse_stack_trace(PANIC_BACKTRACE);
		assert_eq!(
			grouping_frame(&unstripped).unwrap().function,
			"bugwatch::panic_hook::install_panic_hook::{{closure}}"
		);

		let frames = parse_stack_trace(strip_hook_frames(PANIC_BACKTRACE));
		assert_eq!(frames[0].function, "std::panicking::rust_panic_with_hook");
		let frame = grouping_frame(&frames).unwrap();
		assert_eq!(frame.function, "my_app::orders::settle");
		assert_eq!(frame.filename, "src/orders.rs");
	}

	#[test]
	fn backtrace_without_hook_frame_is_kept() {
		let trace = "   0: my_app::main\n             at ./src/main.rs:4:5\n";
		assert_eq!(strip_hook_frames(trace), trace);
	}

	#[test]
	fn hook_as_last_frame_leaves_nothing() {
		let trace = "   0: bugwatch::panic_hook::install_panic_hook::{{closure}}\n             at ./src/panic_hook.rs:1:1\n";
		assert_eq!(strip_hook_frames(trace), "");
	}

	#[test]
	fn symbol_lines() {
		assert!(is_symbol_line("  12: core::panicking::panic_fmt"));
		assert!(!is_symbol_line("             at ./src/main.rs:4:5"));
		assert!(!is_symbol_line("Error: boom"));
	}

	#[test]
	fn extracts_str_payload() {
		let payload: Box<dyn std::any::Any + Send> = Box::new("boom");
		assert_eq!(panic_message(payload.as_ref()), "boom");
	}

	#[test]
	fn extracts_string_payload() {
		let payload: Box<dyn std::any::Any + Send> = Box::new(String::from("formatted 42"));
		assert_eq!(panic_message(payload.as_ref()), "formatted 42");
	}

	#[test]
	fn unknown_payload() {
		let payload: Box<dyn std::any::Any + Send> = Box::new(7u8);
		assert_eq!(panic_message(payload.as_ref()), "Box<dyn Any>");
	}
}
