// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Capture client: turns errors and messages into events and dispatches them.

use std::backtrace::{Backtrace, BacktraceStatus};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::time::Duration;

use bugwatch_core::{
	parse_stack_trace, Breadcrumb, Dsn, Event, EventId, ExceptionInfo, Level, RuntimeInfo, SdkInfo,
	UserContext, FINGERPRINT_TAG,
};
use chrono::Utc;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

use crate::config::{BeforeSend, IgnorePattern, DEFAULT_ENDPOINT, DEFAULT_ENVIRONMENT};
use crate::error::{Result, SdkError};
use crate::sampling::{self, FastrandSampler, Sampler};
use crate::transport::{
	BatchConfig, BatchTransport, ConsoleTransport, HttpTransport, NoopTransport, Transport,
};
use crate::worker::{self, DeliveryWorker};
use crate::{SDK_NAME, SDK_VERSION};

/// Maximum number of breadcrumbs to keep.
pub const MAX_BREADCRUMBS: usize = 100;

/// Default timeout for ingest requests.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Platform recorded on events.
const PLATFORM: &str = "rust";

/// Tag recording the runtime kind.
const RUNTIME_TAG: &str = "runtime";

/// An error as seen by the capture pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorReport {
	/// Error type name, e.g. `TypeError` or `ParseIntError`.
	pub error_type: String,
	pub message: String,
	/// Raw stack trace text in any format the parser understands.
	pub stack: Option<String>,
}

impl ErrorReport {
	pub fn new(error_type: impl Into<String>, message: impl Into<String>) -> Self {
		Self {
			error_type: error_type.into(),
			message: message.into(),
			stack: None,
		}
	}

	pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
		self.stack = Some(stack.into());
		self
	}

	/// Builds a report from a Rust error.
	///
	/// The type is the last path segment of the error's type name. A backtrace
	/// is attached when `RUST_BACKTRACE`/`RUST_LIB_BACKTRACE` enable capture.
	pub fn from_error<E: std::error::Error + ?Sized>(error: &E) -> Self {
		let report = Self::new(short_type_name(std::any::type_name::<E>()), error.to_string());

		let backtrace = Backtrace::capture();
		match backtrace.status() {
			BacktraceStatus::Captured => report.with_stack(backtrace.to_string()),
			_ => report,
		}
	}
}

impl From<&str> for ErrorReport {
	fn from(message: &str) -> Self {
		Self::new("Error", message)
	}
}

impl From<String> for ErrorReport {
	fn from(message: String) -> Self {
		Self::new("Error", message)
	}
}

fn short_type_name(full: &str) -> &str {
	let base = full.split('<').next().unwrap_or(full);
	base.rsplit("::").next().unwrap_or(base)
}

/// Per-call context merged over the client's ambient state.
///
/// On key collision the per-call value wins.
#[derive(Debug, Clone, Default)]
pub struct CaptureContext {
	pub tags: HashMap<String, String>,
	pub extra: HashMap<String, serde_json::Value>,
	pub user: Option<UserContext>,
	/// Overrides the level the capture call would otherwise use.
	pub level: Option<Level>,
}

impl CaptureContext {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.tags.insert(key.into(), value.into());
		self
	}

	pub fn with_extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
		self.extra.insert(key.into(), value);
		self
	}

	pub fn with_user(mut self, user: UserContext) -> Self {
		self.user = Some(user);
		self
	}

	pub fn with_level(mut self, level: Level) -> Self {
		self.level = Some(level);
		self
	}
}

/// Builder for constructing a [`Client`].
pub struct ClientBuilder {
	pub(crate) api_key: Option<String>,
	pub(crate) endpoint: Option<String>,
	pub(crate) dsn: Option<String>,
	pub(crate) environment: Option<String>,
	pub(crate) release: Option<String>,
	pub(crate) server_name: Option<String>,
	pub(crate) debug: bool,
	pub(crate) sample_rate: f64,
	pub(crate) max_breadcrumbs: usize,
	pub(crate) ignore: Vec<IgnorePattern>,
	pub(crate) before_send: Option<BeforeSend>,
	pub(crate) tags: HashMap<String, String>,
	pub(crate) extra: HashMap<String, serde_json::Value>,
	pub(crate) user: Option<UserContext>,
	pub(crate) runtime: RuntimeInfo,
	pub(crate) platform: String,
	pub(crate) sampler: Arc<dyn Sampler>,
	pub(crate) transport: Option<Arc<dyn Transport>>,
	pub(crate) batching: Option<BatchConfig>,
	pub(crate) console: bool,
	pub(crate) request_timeout: Duration,
	pub(crate) runtime_handle: Option<Handle>,
}

impl ClientBuilder {
	/// Creates a new builder with default settings.
	pub fn new() -> Self {
		Self {
			api_key: None,
			endpoint: None,
			dsn: None,
			environment: None,
			release: None,
			server_name: None,
			debug: false,
			sample_rate: 1.0,
			max_breadcrumbs: MAX_BREADCRUMBS,
			ignore: Vec::new(),
			before_send: None,
			tags: HashMap::new(),
			extra: HashMap::new(),
			user: None,
			runtime: RuntimeInfo::default(),
			platform: PLATFORM.to_string(),
			sampler: Arc::new(FastrandSampler),
			transport: None,
			batching: None,
			console: false,
			request_timeout: REQUEST_TIMEOUT,
			runtime_handle: None,
		}
	}

	/// Sets the API key sent with every event.
	pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
		self.api_key = Some(api_key.into());
		self
	}

	/// Sets the ingest API base URL. Events go to `{endpoint}/api/v1/events`.
	///
	/// Example: `https://api.bugwatch.dev`
	pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
		self.endpoint = Some(endpoint.into());
		self
	}

	/// Sets a DSN. Takes precedence over `api_key` and `endpoint`.
	///
	/// Example: `https://abc123@api.bugwatch.dev/42`
	pub fn dsn(mut self, dsn: impl Into<String>) -> Self {
		self.dsn = Some(dsn.into());
		self
	}

	/// Sets the environment name.
	///
	/// Example: `production`, `staging`, `development`
	pub fn environment(mut self, environment: impl Into<String>) -> Self {
		self.environment = Some(environment.into());
		self
	}

	/// Sets the release version.
	pub fn release(mut self, release: impl Into<String>) -> Self {
		self.release = Some(release.into());
		self
	}

	/// Sets the server name for identification.
	pub fn server_name(mut self, name: impl Into<String>) -> Self {
		self.server_name = Some(name.into());
		self
	}

	/// Enables logging of delivery failures and dropped events.
	pub fn debug(mut self, debug: bool) -> Self {
		self.debug = debug;
		self
	}

	/// Sets the fraction of captures that are kept (0.0-1.0).
	pub fn sample_rate(mut self, rate: f64) -> Self {
		self.sample_rate = sampling::clamp_rate(rate);
		self
	}

	/// Sets the maximum number of breadcrumbs to keep.
	pub fn max_breadcrumbs(mut self, max: usize) -> Self {
		self.max_breadcrumbs = max;
		self
	}

	/// Adds a pattern; errors whose message matches it are not captured.
	pub fn ignore(mut self, pattern: impl Into<IgnorePattern>) -> Self {
		self.ignore.push(pattern.into());
		self
	}

	/// Sets the hook run on every event before it is sent.
	pub fn before_send<F>(mut self, hook: F) -> Self
	where
		F: Fn(Event) -> Option<Event> + Send + Sync + 'static,
	{
		self.before_send = Some(Arc::new(hook));
		self
	}

	/// Sets an initial tag.
	pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.tags.insert(key.into(), value.into());
		self
	}

	/// Sets an initial extra value.
	pub fn extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
		self.extra.insert(key.into(), value);
		self
	}

	/// Sets the initial user.
	pub fn user(mut self, user: UserContext) -> Self {
		self.user = Some(user);
		self
	}

	/// Describes the runtime the client is embedded in.
	pub fn runtime(mut self, runtime: RuntimeInfo) -> Self {
		self.runtime = runtime;
		self
	}

	/// Sets the platform recorded on events. Defaults to `rust`.
	pub fn platform(mut self, platform: impl Into<String>) -> Self {
		self.platform = platform.into();
		self
	}

	/// Replaces the random source used for sampling.
	pub fn sampler(mut self, sampler: impl Sampler + 'static) -> Self {
		self.sampler = Arc::new(sampler);
		self
	}

	/// Sends events through `transport` instead of the ingest API.
	pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
		self.transport = Some(transport);
		self
	}

	/// Queues events and sends them in batches.
	pub fn batching(mut self, config: BatchConfig) -> Self {
		self.batching = Some(config);
		self
	}

	/// Logs events locally instead of sending them.
	pub fn console(mut self, console: bool) -> Self {
		self.console = console;
		self
	}

	/// Sets the HTTP request timeout.
	pub fn request_timeout(mut self, timeout: Duration) -> Self {
		self.request_timeout = timeout;
		self
	}

	/// Sets the tokio runtime used for delivery. Defaults to the runtime
	/// current at each capture, or the client's own delivery thread outside
	/// any runtime.
	pub fn runtime_handle(mut self, handle: Handle) -> Self {
		self.runtime_handle = Some(handle);
		self
	}

	/// Builds the client.
	///
	/// Never fails: without a usable credential the client is disabled and
	/// every capture returns `None`.
	pub fn build(mut self) -> Client {
		let worker = DeliveryWorker::default();

		// The batch timer is spawned on the runtime entered here. Without one,
		// it runs on the client's own delivery thread.
		let timer_handle = match &self.runtime_handle {
			Some(handle) => Some(handle.clone()),
			None if self.batching.is_some() && Handle::try_current().is_err() => worker.handle(),
			None => None,
		};
		let _guard = timer_handle.as_ref().map(Handle::enter);

		let (transport, enabled) = match self.resolve_transport() {
			Ok(transport) => (transport, true),
			Err(e) => {
				warn!(error = %e, "Bugwatch client disabled");
				(Arc::new(NoopTransport) as Arc<dyn Transport>, false)
			}
		};

		let mut tags = HashMap::new();
		tags.insert(RUNTIME_TAG.to_string(), self.runtime.kind.to_string());
		tags.extend(self.tags);

		let inner = Arc::new(ClientInner {
			environment: self
				.environment
				.unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string()),
			release: self.release,
			server_name: self.server_name,
			platform: self.platform,
			runtime: self.runtime,
			debug: self.debug,
			sample_rate: self.sample_rate,
			max_breadcrumbs: self.max_breadcrumbs,
			ignore: self.ignore,
			before_send: self.before_send,
			sampler: self.sampler,
			transport,
			handle: self.runtime_handle,
			worker,
			scope: Mutex::new(Scope {
				tags,
				extra: self.extra,
				user: self.user,
				breadcrumbs: VecDeque::new(),
			}),
			in_flight: Arc::new(InFlight::default()),
			enabled,
			closed: AtomicBool::new(false),
		});

		if enabled {
			info!(
				transport = inner.transport.name(),
				environment = %inner.environment,
				sample_rate = inner.sample_rate,
				"Bugwatch client initialized"
			);
		}

		Client { inner }
	}

	fn resolve_transport(&mut self) -> Result<Arc<dyn Transport>> {
		let base: Arc<dyn Transport> = if let Some(transport) = self.transport.take() {
			transport
		} else if self.console {
			Arc::new(ConsoleTransport::new(self.debug))
		} else {
			let (url, api_key) = self.resolve_credentials()?;
			let transport = HttpTransport::new(url, api_key, self.request_timeout)
				.map_err(|e| SdkError::ConfigurationInvalid(e.to_string()))?;
			Arc::new(transport)
		};

		Ok(match self.batching.take() {
			Some(config) => Arc::new(BatchTransport::new(base, config, self.debug)),
			None => base,
		})
	}

	/// Returns the events URL and API key.
	fn resolve_credentials(&self) -> Result<(String, String)> {
		if let Some(dsn) = self.dsn.as_deref() {
			let dsn = Dsn::parse(dsn)?;
			return Ok((dsn.endpoint, dsn.public_key));
		}

		let api_key = self
			.api_key
			.as_deref()
			.filter(|key| !key.trim().is_empty())
			.ok_or_else(|| SdkError::ConfigurationInvalid("no API key or DSN configured".into()))?;
		let endpoint = self.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT);

		Ok((
			format!("{}/api/v1/events", endpoint.trim_end_matches('/')),
			api_key.to_string(),
		))
	}
}

impl Default for ClientBuilder {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Debug for ClientBuilder {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ClientBuilder")
			.field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
			.field("endpoint", &self.endpoint)
			.field("dsn", &self.dsn.as_ref().map(|_| "[REDACTED]"))
			.field("environment", &self.environment)
			.field("release", &self.release)
			.field("debug", &self.debug)
			.field("sample_rate", &self.sample_rate)
			.field("max_breadcrumbs", &self.max_breadcrumbs)
			.field("ignore", &self.ignore)
			.field("runtime", &self.runtime)
			.finish_non_exhaustive()
	}
}

/// Mutable ambient context shared by all captures.
struct Scope {
	tags: HashMap<String, String>,
	extra: HashMap<String, serde_json::Value>,
	user: Option<UserContext>,
	breadcrumbs: VecDeque<Breadcrumb>,
}

/// Counts deliveries that have been spawned but not finished.
#[derive(Default)]
struct InFlight {
	count: AtomicUsize,
	idle: Notify,
}

struct InFlightGuard(Arc<InFlight>);

impl InFlight {
	fn enter(self: &Arc<Self>) -> InFlightGuard {
		self.count.fetch_add(1, Ordering::SeqCst);
		InFlightGuard(Arc::clone(self))
	}

	async fn wait_idle(&self) {
		loop {
			let mut notified = std::pin::pin!(self.idle.notified());
			notified.as_mut().enable();
			if self.count.load(Ordering::SeqCst) == 0 {
				return;
			}
			notified.await;
		}
	}
}

impl Drop for InFlightGuard {
	fn drop(&mut self) {
		if self.0.count.fetch_sub(1, Ordering::SeqCst) == 1 {
			self.0.idle.notify_waiters();
		}
	}
}

struct ClientInner {
	environment: String,
	release: Option<String>,
	server_name: Option<String>,
	platform: String,
	runtime: RuntimeInfo,
	debug: bool,
	sample_rate: f64,
	max_breadcrumbs: usize,
	ignore: Vec<IgnorePattern>,
	before_send: Option<BeforeSend>,
	sampler: Arc<dyn Sampler>,
	transport: Arc<dyn Transport>,
	handle: Option<Handle>,
	worker: DeliveryWorker,
	scope: Mutex<Scope>,
	in_flight: Arc<InFlight>,
	enabled: bool,
	closed: AtomicBool,
}

/// Client for capturing errors and messages.
///
/// Capture calls never fail and never wait on the network: they build the
/// event synchronously, hand it to the transport on a background task and
/// return its id. `None` means the event was not produced (disabled client,
/// sampling, an ignore pattern or the `before_send` hook).
///
/// Deliveries run on the builder's `runtime_handle`, else the current tokio
/// runtime, else a delivery thread the client starts on first use. Hosts
/// without an async runtime use [`flush_blocking`](Self::flush_blocking) and
/// [`shutdown_blocking`](Self::shutdown_blocking).
///
/// # Example
///
/// ```no_run
/// use bugwatch::{Breadcrumb, Client, Level, UserContext};
///
/// # async fn run() {
/// let client = Client::builder()
///     .api_key("bw_live_xxx")
///     .environment("production")
///     .release(env!("CARGO_PKG_VERSION"))
///     .build();
///
/// client.set_user(UserContext::new().with_id("user_123"));
/// client.add_breadcrumb(Breadcrumb::new("http", "GET /api/users"));
///
/// if let Err(e) = "x".parse::<u32>() {
///     client.capture_error(&e);
/// }
/// client.capture_message("cache warmed", Level::Info);
///
/// client.shutdown().await;
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
	inner: Arc<ClientInner>,
}

impl Client {
	/// Creates a new builder for constructing a Client.
	pub fn builder() -> ClientBuilder {
		ClientBuilder::new()
	}

	/// Returns false for clients built without a usable credential and for
	/// clients that have been shut down.
	pub fn is_enabled(&self) -> bool {
		self.inner.enabled && !self.inner.closed.load(Ordering::SeqCst)
	}

	/// Captures an error.
	pub fn capture_exception(&self, error: impl Into<ErrorReport>) -> Option<EventId> {
		self.capture_exception_with(error, CaptureContext::default())
	}

	/// Captures an error with per-call context.
	pub fn capture_exception_with(
		&self,
		error: impl Into<ErrorReport>,
		context: CaptureContext,
	) -> Option<EventId> {
		let event = self.exception_event(error.into(), context)?;
		self.dispatch(event)
	}

	/// Captures an error and waits up to `timeout` for the transport to
	/// accept and flush it.
	///
	/// Delivery runs on the client's delivery thread, so it progresses even
	/// when the caller is the thread driving the host's runtime. Used by the
	/// panic hook.
	pub fn capture_exception_blocking(
		&self,
		error: impl Into<ErrorReport>,
		context: CaptureContext,
		timeout: Duration,
	) -> Option<EventId> {
		let event = self.exception_event(error.into(), context)?;
		if worker::on_delivery_thread() {
			return self.dispatch(event);
		}

		let event = self.prepare(event)?;
		let event_id = event.event_id;
		let Some(handle) = self.inner.worker.handle() else {
			debug!(event_id = %event_id, "No delivery runtime available, event dropped");
			return Some(event_id);
		};

		let (done, delivered) = mpsc::channel();
		self.spawn_delivery(&handle, event, Some(done));
		if delivered.recv_timeout(timeout).is_err() {
			debug!(event_id = %event_id, "Timed out waiting for event delivery");
		}

		Some(event_id)
	}

	/// Captures a Rust error, with a backtrace when enabled.
	pub fn capture_error<E: std::error::Error + ?Sized>(&self, error: &E) -> Option<EventId> {
		self.capture_exception(ErrorReport::from_error(error))
	}

	/// Captures a message.
	pub fn capture_message(&self, message: impl Into<String>, level: Level) -> Option<EventId> {
		self.capture_message_with(message, level, CaptureContext::default())
	}

	/// Captures a message with per-call context.
	pub fn capture_message_with(
		&self,
		message: impl Into<String>,
		level: Level,
		context: CaptureContext,
	) -> Option<EventId> {
		let message = message.into();
		if !self.should_capture(&message) {
			return None;
		}

		let level = context.level.unwrap_or(level);
		let mut event = self.build_event(level, context);
		event.message = Some(message);

		self.dispatch(event)
	}

	/// Appends a breadcrumb, stamping it with the current time.
	///
	/// Only the most recent `max_breadcrumbs` are kept.
	pub fn add_breadcrumb(&self, mut breadcrumb: Breadcrumb) {
		breadcrumb.timestamp = Utc::now();

		let mut scope = self.inner.scope.lock();
		scope.breadcrumbs.push_back(breadcrumb);
		while scope.breadcrumbs.len() > self.inner.max_breadcrumbs {
			scope.breadcrumbs.pop_front();
		}
	}

	/// Clears all breadcrumbs.
	pub fn clear_breadcrumbs(&self) {
		self.inner.scope.lock().breadcrumbs.clear();
	}

	/// Sets the user attached to subsequent events.
	pub fn set_user(&self, user: UserContext) {
		self.inner.scope.lock().user = Some(user);
	}

	/// Clears the user context.
	pub fn clear_user(&self) {
		self.inner.scope.lock().user = None;
	}

	/// Sets a tag attached to subsequent events.
	pub fn set_tag(&self, key: impl Into<String>, value: impl Into<String>) {
		self.inner.scope.lock().tags.insert(key.into(), value.into());
	}

	/// Removes a tag.
	pub fn remove_tag(&self, key: &str) {
		self.inner.scope.lock().tags.remove(key);
	}

	/// Sets extra data attached to subsequent events.
	pub fn set_extra(&self, key: impl Into<String>, value: serde_json::Value) {
		self.inner.scope.lock().extra.insert(key.into(), value);
	}

	/// Waits for spawned deliveries, then flushes the transport.
	pub async fn flush(&self) {
		self.inner.in_flight.wait_idle().await;
		self.inner.transport.flush().await;
	}

	/// Flushes pending events and stops the transport. Later captures return
	/// `None`. Calling it again does nothing.
	pub async fn shutdown(&self) {
		if self.inner.closed.swap(true, Ordering::SeqCst) {
			return;
		}

		self.flush().await;
		self.inner.transport.close();
		self.inner.worker.stop(false);

		info!("Bugwatch client shutdown");
	}

	/// Blocking form of [`flush`](Self::flush) for code outside an async
	/// runtime. Returns false when `timeout` elapsed first.
	///
	/// The flush runs on the client's delivery thread; calling this from a
	/// task on a current-thread runtime stalls that runtime until the flush
	/// completes or times out.
	pub fn flush_blocking(&self, timeout: Duration) -> bool {
		if worker::on_delivery_thread() {
			return false;
		}
		let Some(handle) = self.inner.worker.handle() else {
			return false;
		};

		let (done, flushed) = mpsc::channel();
		let client = self.clone();
		handle.spawn(async move {
			client.flush().await;
			let _ = done.send(());
		});

		flushed.recv_timeout(timeout).is_ok()
	}

	/// Blocking form of [`shutdown`](Self::shutdown). Waits up to `timeout`
	/// for pending events, then stops the delivery thread.
	pub fn shutdown_blocking(&self, timeout: Duration) {
		if self.inner.closed.swap(true, Ordering::SeqCst) {
			return;
		}

		if !self.flush_blocking(timeout) {
			debug!("Timed out flushing events during shutdown");
		}
		self.inner.transport.close();
		self.inner.worker.stop(true);

		info!("Bugwatch client shutdown");
	}

	fn should_capture(&self, message: &str) -> bool {
		if !self.is_enabled() {
			return false;
		}

		if !sampling::keep(self.inner.sample_rate, self.inner.sampler.as_ref()) {
			debug!("Event dropped by sampling");
			return false;
		}

		if let Some(pattern) = self.inner.ignore.iter().find(|p| p.matches(message)) {
			debug!(pattern = %pattern, "Event dropped by ignore pattern");
			return false;
		}

		true
	}

	fn exception_event(&self, report: ErrorReport, context: CaptureContext) -> Option<Event> {
		if !self.should_capture(&report.message) {
			return None;
		}

		let frames = report
			.stack
			.as_deref()
			.map(parse_stack_trace)
			.unwrap_or_default();
		let exception =
			ExceptionInfo::new(report.error_type, report.message).with_stacktrace(frames);

		let level = context.level.unwrap_or(Level::Error);
		let mut event = self.build_event(level, context);
		event.message = Some(format!("{}: {}", exception.error_type, exception.value));
		event.exception = Some(exception);

		Some(event)
	}

	fn build_event(&self, level: Level, context: CaptureContext) -> Event {
		let mut event = Event::new(
			level,
			self.inner.platform.clone(),
			SdkInfo::new(SDK_NAME, SDK_VERSION),
		);
		event.environment = Some(self.inner.environment.clone());
		event.release = self.inner.release.clone();
		event.server_name = self.inner.server_name.clone();
		event.runtime = Some(self.inner.runtime.clone());

		{
			let scope = self.inner.scope.lock();
			event.tags = scope.tags.clone();
			event.extra = scope.extra.clone();
			event.user = scope.user.clone();
			event.breadcrumbs = scope.breadcrumbs.iter().cloned().collect();
		}

		event.tags.extend(context.tags);
		event.extra.extend(context.extra);
		if let Some(user) = context.user {
			event.user = Some(user);
		}

		event
	}

	fn dispatch(&self, event: Event) -> Option<EventId> {
		let event = self.prepare(event)?;
		let event_id = event.event_id;

		match self.delivery_handle() {
			Some(handle) => self.spawn_delivery(&handle, event, None),
			None => debug!(event_id = %event_id, "No delivery runtime available, event dropped"),
		}

		Some(event_id)
	}

	/// Attaches the fingerprint and runs `before_send`.
	fn prepare(&self, mut event: Event) -> Option<Event> {
		if let Some(exception) = &event.exception {
			event
				.tags
				.insert(FINGERPRINT_TAG.to_string(), exception.fingerprint());
		}

		let Some(hook) = &self.inner.before_send else {
			return Some(event);
		};

		match catch_unwind(AssertUnwindSafe(|| hook(event))) {
			Ok(Some(event)) => Some(event),
			Ok(None) => {
				debug!("Event dropped by before_send");
				None
			}
			Err(_) => {
				if self.inner.debug {
					warn!("before_send panicked, event dropped");
				}
				None
			}
		}
	}

	fn delivery_handle(&self) -> Option<Handle> {
		self.inner
			.handle
			.clone()
			.or_else(|| Handle::try_current().ok())
			.or_else(|| self.inner.worker.handle())
	}

	/// Sends `event` on `handle`. With `done`, the transport is also flushed
	/// and `done` is signalled once both finish.
	fn spawn_delivery(&self, handle: &Handle, event: Event, done: Option<mpsc::Sender<()>>) {
		let event_id = event.event_id;
		let transport = Arc::clone(&self.inner.transport);
		let guard = self.inner.in_flight.enter();
		let debug = self.inner.debug;

		handle.spawn(async move {
			let _guard = guard;
			if let Err(e) = transport.send(event).await {
				if debug {
					warn!(
						event_id = %event_id,
						transport = transport.name(),
						error = %e,
						"Failed to deliver event"
					);
				}
			}

			if let Some(done) = done {
				transport.flush().await;
				let _ = done.send(());
			}
		});
	}
}

impl fmt::Debug for Client {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Client")
			.field("enabled", &self.is_enabled())
			.field("transport", &self.inner.transport.name())
			.field("environment", &self.inner.environment)
			.field("sample_rate", &self.inner.sample_rate)
			.finish_non_exhaustive()
	}
}
