// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Stack trace parsing.
//!
//! [`parse_stack_trace`] turns the text of a platform stack trace into an
//! ordered list of [`StackFrame`]s, top of stack first. Each line is tried
//! against the known layouts in a fixed order:
//!
//! 1. `at fn (file:line:col)` / `at file:line:col` (V8, Node, Rust `at` lines)
//! 2. `fn@file:line:col` (SpiderMonkey, JavaScriptCore)
//!
//! Lines matching neither are skipped. A Rust backtrace symbol line
//! (`  3: my_app::main`) produces no frame by itself but names the function
//! of the bare `at` line that follows it.

use regex::Regex;
use rustc_demangle::demangle;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Function name used when a trace line carries none.
pub const ANONYMOUS_FUNCTION: &str = "<anonymous>";

static KEYWORD_FRAME: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"^\s*at\s+(?:(?:async\s+)?(?P<func>.+?)\s+\((?P<loc>.+)\)|(?P<bare>.+?))\s*$")
		.expect("keyword frame regex")
});

static NAME_AT_FRAME: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"^\s*(?P<func>[^@]*)@(?P<loc>.+?)\s*$").expect("name@location frame regex")
});

static RUST_SYMBOL: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"^\s*\d+:\s+(?P<sym>\S.*?)\s*$").expect("rust symbol regex"));

static LOCATION: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"^(?P<file>.+?):(?P<line>\d+)(?::(?P<col>\d+))?$").expect("location regex")
});

static VIRTUAL_SCHEME: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(
		r"^(?:webpack-internal:///(?:\([^)]*\)/)?|webpack:///?(?:[^/]*/)?|turbopack://(?:\[project\]/)?|rsc://React/Server/|app:///|file://)",
	)
	.expect("virtual scheme regex")
});

/// Filename fragments that mark dependency, runtime or framework code.
const NOT_IN_APP_CONTAINS: &[&str] = &[
	"node_modules",
	"/next/dist/",
	"webpack/bootstrap",
	"react-dom",
	"/rustc/",
	"/library/std/",
	"/library/core/",
	"/library/alloc/",
	".cargo/registry",
	".cargo/git",
];

const NOT_IN_APP_PREFIXES: &[&str] = &["node:", "internal/", "<", "native"];

/// Function prefixes that mark runtime or library code.
const NOT_IN_APP_FUNCTIONS: &[&str] = &[
	"std::",
	"core::",
	"alloc::",
	"<std::",
	"<core::",
	"<alloc::",
	"tokio::",
	"<tokio::",
	"futures::",
	"<futures::",
	"__rust_",
	"__rustc::",
	"rust_begin_unwind",
	"rust_panic",
];

/// A single parsed frame of a stack trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackFrame {
	pub filename: String,
	pub function: String,
	pub lineno: u32,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub colno: Option<u32>,
	/// Location as it appeared in the trace, when normalization changed it.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub abs_path: Option<String>,
	pub in_app: bool,
}

impl StackFrame {
	/// Builds a frame from raw trace components, normalizing the filename and
	/// classifying it.
	pub fn from_raw(raw_file: &str, function: Option<&str>, lineno: u32, colno: Option<u32>) -> Self {
		let filename = normalize_filename(raw_file);
		let function = function
			.map(str::trim)
			.filter(|f| !f.is_empty())
			.unwrap_or(ANONYMOUS_FUNCTION)
			.to_string();
		let in_app = is_in_app(&filename, &function);
		let abs_path = (filename != raw_file).then(|| raw_file.to_string());

		Self {
			filename,
			function,
			lineno,
			colno,
			abs_path,
			in_app,
		}
	}
}

/// Parse a stack trace string into frames, preserving line order.
///
/// Each line is tried against the `at ...` layout, then `name@location`. A
/// line that yields no frame from either may carry a Rust symbol for the
/// `at` line that follows it.
///
/// Never fails: lines that match no known layout are dropped.
pub fn parse_stack_trace(trace: &str) -> Vec<StackFrame> {
	let mut frames = Vec::new();
	let mut pending_symbol: Option<String> = None;

	for line in trace.lines() {
		if let Some(frame) =
			keyword_frame(line, pending_symbol.as_deref()).or_else(|| name_at_frame(line))
		{
			pending_symbol = None;
			frames.push(frame);
			continue;
		}

		pending_symbol = RUST_SYMBOL
			.captures(line)
			.and_then(|caps| caps.name("sym"))
			.map(|sym| format!("{:#}", demangle(sym.as_str())));
	}

	frames
}

fn keyword_frame(line: &str, pending_symbol: Option<&str>) -> Option<StackFrame> {
	let caps = KEYWORD_FRAME.captures(line)?;
	if let (Some(func), Some(loc)) = (caps.name("func"), caps.name("loc")) {
		return frame_from_location(loc.as_str(), Some(func.as_str()));
	}
	frame_from_location(caps.name("bare")?.as_str(), pending_symbol)
}

fn name_at_frame(line: &str) -> Option<StackFrame> {
	let caps = NAME_AT_FRAME.captures(line)?;
	frame_from_location(caps.name("loc")?.as_str(), caps.name("func").map(|m| m.as_str()))
}

fn frame_from_location(location: &str, function: Option<&str>) -> Option<StackFrame> {
	let caps = LOCATION.captures(location.trim())?;
	let file = caps.name("file")?.as_str();
	let lineno = caps.name("line")?.as_str().parse().ok()?;
	let colno = caps.name("col").and_then(|c| c.as_str().parse().ok());
	Some(StackFrame::from_raw(file, function, lineno, colno))
}

/// Normalize a trace filename.
///
/// Drops any query string or fragment, strips bundler and virtual-scheme
/// prefixes (`webpack://`, `webpack-internal:///`, `file://`, ...) and removes
/// leading `./` and `../` segments.
pub fn normalize_filename(raw: &str) -> String {
	let mut name = raw.trim();
	if let Some(idx) = name.find(['?', '#']) {
		name = &name[..idx];
	}

	let stripped = VIRTUAL_SCHEME.replace(name, "");
	let mut name: &str = &stripped;
	loop {
		if let Some(rest) = name.strip_prefix("./") {
			name = rest;
		} else if let Some(rest) = name.strip_prefix("../") {
			name = rest;
		} else {
			break;
		}
	}

	name.to_string()
}

/// Whether a frame belongs to application code rather than a dependency,
/// runtime built-in or framework internal.
pub fn is_in_app(filename: &str, function: &str) -> bool {
	if filename.is_empty() {
		return false;
	}
	if NOT_IN_APP_CONTAINS.iter().any(|s| filename.contains(s)) {
		return false;
	}
	if NOT_IN_APP_PREFIXES.iter().any(|p| filename.starts_with(p)) {
		return false;
	}
	if NOT_IN_APP_FUNCTIONS.iter().any(|p| function.starts_with(p)) {
		return false;
	}
	true
}
