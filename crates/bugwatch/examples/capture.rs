// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Example: Capture events with the bugwatch SDK.
//!
//! Run with:
//!   BUGWATCH_API_KEY=bw_xxx cargo run --example capture -p bugwatch
//!
//! Without credentials the events are logged locally instead.

use bugwatch::{
	BatchConfig, Breadcrumb, CaptureContext, ClientBuilder, ErrorReport, Level, RuntimeInfo,
	RuntimeKind, UserContext,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
	tracing_subscriber::fmt()
		.with_env_filter(
			EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,bugwatch=debug")),
		)
		.init();

	let has_credentials =
		std::env::var_os("BUGWATCH_API_KEY").is_some() || std::env::var_os("BUGWATCH_DSN").is_some();

	let client = ClientBuilder::from_env()
		.release("0.1.0-example")
		.server_name("example-server")
		.runtime(RuntimeInfo::new(RuntimeKind::Server, "tokio"))
		.console(!has_credentials)
		.batching(BatchConfig::default())
		.ignore("ResizeObserver loop")
		.before_send(|mut event| {
			event.extra.remove("password");
			Some(event)
		})
		.build();
	bugwatch::install_panic_hook(client.clone());

	client.set_user(
		UserContext::new()
			.with_id("user_example_123")
			.with_username("example_user"),
	);
	client.set_tag("example", "true");

	client.add_breadcrumb(Breadcrumb::new("startup", "Application started"));
	client.add_breadcrumb(
		Breadcrumb::new("http", "GET /api/data failed")
			.with_level(Level::Warning)
			.with_type("http"),
	);

	let stack = "TypeError: Cannot read properties of undefined (reading 'id')
    at getUser (/app/src/api/users.ts:142:23)
    at async Router.handle (/app/node_modules/express/lib/router/index.js:284:7)";
	let id = client.capture_exception_with(
		ErrorReport::new("TypeError", "Cannot read properties of undefined (reading 'id')")
			.with_stack(stack),
		CaptureContext::new().with_tag("route", "/api/users/:id"),
	);
	tracing::info!(event_id = ?id, "Captured exception");

	if let Err(e) = "not a number".parse::<u32>() {
		client.capture_error(&e);
	}

	let ignored = client.capture_exception("ResizeObserver loop limit exceeded");
	tracing::info!(suppressed = ignored.is_none(), "Ignored error");

	client.capture_message("Example finished", Level::Info);

	client.shutdown().await;
}
