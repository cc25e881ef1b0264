// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Identity directory configuration.
//!
//! The service key authorizes admin calls against the hosted identity
//! provider. It must never be logged; keep it out of Debug output at call
//! sites.

use serde::Deserialize;

/// Identity directory configuration (runtime, fully resolved).
#[derive(Debug, Clone)]
pub struct IdentityConfig {
	/// Provider auth base URL, e.g. `https://xyz.example.co/auth/v1`.
	pub base_url: String,
	/// Service-role key for admin calls.
	pub service_key: String,
}

impl Default for IdentityConfig {
	fn default() -> Self {
		Self {
			base_url: "http://127.0.0.1:9999/auth/v1".to_string(),
			service_key: String::new(),
		}
	}
}

impl IdentityConfig {
	/// True when a service key has been configured.
	pub fn is_configured(&self) -> bool {
		!self.service_key.is_empty()
	}
}

/// Identity configuration layer (partial, for merging).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IdentityConfigLayer {
	#[serde(default)]
	pub base_url: Option<String>,
	#[serde(default)]
	pub service_key: Option<String>,
}

impl IdentityConfigLayer {
	pub fn merge(&mut self, other: IdentityConfigLayer) {
		if other.base_url.is_some() {
			self.base_url = other.base_url;
		}
		if other.service_key.is_some() {
			self.service_key = other.service_key;
		}
	}

	pub fn finalize(self) -> IdentityConfig {
		let defaults = IdentityConfig::default();
		IdentityConfig {
			base_url: self.base_url.unwrap_or(defaults.base_url),
			service_key: self.service_key.unwrap_or(defaults.service_key),
		}
	}
}
