// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! DSN parsing.
//!
//! A DSN packs the credential, ingest host and project into one string:
//! `https://publicKey@api.bugwatch.dev/42`.

use std::fmt;
use std::str::FromStr;
use url::Url;

use crate::error::{CoreError, Result};

/// A parsed DSN.
#[derive(Clone, PartialEq, Eq)]
pub struct Dsn {
	pub scheme: String,
	pub public_key: String,
	/// Host, including the port when one is given.
	pub host: String,
	pub project_id: String,
	/// `{scheme}://{host}/api/v1/projects/{project_id}/events`
	pub endpoint: String,
}

impl Dsn {
	/// Parse a DSN of the form `scheme://publicKey@host/projectId`.
	pub fn parse(dsn: &str) -> Result<Self> {
		let url = Url::parse(dsn.trim()).map_err(|e| CoreError::InvalidDsn(e.to_string()))?;

		let public_key = url.username();
		if public_key.is_empty() {
			return Err(CoreError::MissingPublicKey);
		}

		let host = match (url.host_str(), url.port()) {
			(Some(host), Some(port)) => format!("{host}:{port}"),
			(Some(host), None) => host.to_string(),
			(None, _) => return Err(CoreError::InvalidDsn(format!("no host in {dsn}"))),
		};

		let project_id = url
			.path_segments()
			.and_then(|segments| segments.filter(|s| !s.is_empty()).last())
			.ok_or(CoreError::MissingProjectId)?
			.to_string();

		let scheme = url.scheme().to_string();
		let endpoint = format!("{scheme}://{host}/api/v1/projects/{project_id}/events");

		Ok(Self {
			scheme,
			public_key: public_key.to_string(),
			host,
			project_id,
			endpoint,
		})
	}
}

impl FromStr for Dsn {
	type Err = CoreError;

	fn from_str(s: &str) -> Result<Self> {
		Self::parse(s)
	}
}

impl fmt::Display for Dsn {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"{}://{}@{}/{}",
			self.scheme, self.public_key, self.host, self.project_id
		)
	}
}

impl fmt::Debug for Dsn {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Dsn")
			.field("scheme", &self.scheme)
			.field("public_key", &"[REDACTED]")
			.field("host", &self.host)
			.field("project_id", &self.project_id)
			.field("endpoint", &self.endpoint)
			.finish()
	}
}
