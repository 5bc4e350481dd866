// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the core crate.

use thiserror::Error;

/// Errors produced while parsing configuration-shaped input.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
	#[error("invalid DSN: {0}")]
	InvalidDsn(String),

	#[error("DSN is missing a public key")]
	MissingPublicKey,

	#[error("DSN is missing a project ID")]
	MissingProjectId,

	#[error("invalid level: {0}")]
	InvalidLevel(String),

	#[error("invalid runtime kind: {0}")]
	InvalidRuntime(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
