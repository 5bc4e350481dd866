// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Fingerprinting algorithm for grouping recurring errors into one issue.

use regex::Regex;
use std::sync::LazyLock;

use crate::stacktrace::StackFrame;

const COMPONENT_DELIMITER: &str = "|";

const FNV_OFFSET_BASIS: u32 = 2_166_136_261;
const FNV_PRIME: u32 = 16_777_619;

/// Message substitutions, applied in this order. Placeholders contain no
/// digits, quotes, slashes or `://`, so later patterns never re-match them.
static SUBSTITUTIONS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
	[
		(
			r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}",
			"<uuid>",
		),
		(r"\b0[xX][0-9a-fA-F]+\b", "<hex>"),
		(r"\d+", "<num>"),
		(r"'[^']*'", "<str>"),
		(r#""[^"]*""#, "<str>"),
		(r"[a-zA-Z][a-zA-Z0-9+.\-]*://\S+", "<url>"),
		(r"(?:/[^\s/]+)+\.[A-Za-z0-9]+", "<path>"),
		(r"\s+", " "),
	]
	.into_iter()
	.map(|(pattern, replacement)| (Regex::new(pattern).expect("fingerprint regex"), replacement))
	.collect()
});

/// Compute the grouping fingerprint for an error.
///
/// The key is derived from:
/// 1. The error type, verbatim
/// 2. The message with variable parts replaced by placeholders
/// 3. `filename:function` of the first in-app frame (or the first frame if
///    none is in-app), only when frames are supplied
///
/// The components are joined with `|` and hashed with 32-bit FNV-1a, rendered
/// as 8 lowercase hex digits.
pub fn fingerprint(error_type: &str, message: &str, frames: Option<&[StackFrame]>) -> String {
	let mut components = vec![error_type.to_string(), normalize_message(message)];

	if let Some(frame) = frames.and_then(grouping_frame) {
		components.push(format!("{}:{}", frame.filename, frame.function));
	}

	format!("{:08x}", fnv1a_32(components.join(COMPONENT_DELIMITER).as_bytes()))
}

/// The frame that identifies where an error happened: the first in-app
/// frame, falling back to the top frame.
pub fn grouping_frame(frames: &[StackFrame]) -> Option<&StackFrame> {
	frames.iter().find(|f| f.in_app).or_else(|| frames.first())
}

/// Replace the variable parts of an error message with stable placeholders.
pub fn normalize_message(message: &str) -> String {
	let mut normalized = message.to_string();
	for (pattern, replacement) in SUBSTITUTIONS.iter() {
		normalized = pattern.replace_all(&normalized, *replacement).into_owned();
	}
	normalized.trim().to_string()
}

fn fnv1a_32(bytes: &[u8]) -> u32 {
	bytes.iter().fold(FNV_OFFSET_BASIS, |hash, byte| {
		(hash ^ u32::from(*byte)).wrapping_mul(FNV_PRIME)
	})
}
