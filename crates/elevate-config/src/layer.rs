// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Partial configuration layer, merged across sources.

use serde::Deserialize;

use crate::sections::{
	DatabaseConfigLayer, HttpConfigLayer, IdentityConfigLayer, LoggingConfigLayer,
};

/// One source's contribution to the configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerConfigLayer {
	#[serde(default)]
	pub http: Option<HttpConfigLayer>,
	#[serde(default)]
	pub database: Option<DatabaseConfigLayer>,
	#[serde(default)]
	pub identity: Option<IdentityConfigLayer>,
	#[serde(default)]
	pub logging: Option<LoggingConfigLayer>,
}

impl ServerConfigLayer {
	/// Merge a higher-precedence layer into this one.
	pub fn merge(&mut self, other: ServerConfigLayer) {
		merge_section(&mut self.http, other.http, HttpConfigLayer::merge);
		merge_section(&mut self.database, other.database, DatabaseConfigLayer::merge);
		merge_section(&mut self.identity, other.identity, IdentityConfigLayer::merge);
		merge_section(&mut self.logging, other.logging, LoggingConfigLayer::merge);
	}
}

fn merge_section<T>(base: &mut Option<T>, other: Option<T>, merge: impl Fn(&mut T, T)) {
	match (base.as_mut(), other) {
		(Some(base), Some(other)) => merge(base, other),
		(None, Some(other)) => *base = Some(other),
		_ => {}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_merge_fills_missing_sections() {
		let mut base = ServerConfigLayer::default();
		base.merge(ServerConfigLayer {
			http: Some(HttpConfigLayer {
				host: Some("0.0.0.0".to_string()),
				port: None,
			}),
			..Default::default()
		});
		assert_eq!(base.http.unwrap().host.as_deref(), Some("0.0.0.0"));
	}

	#[test]
	fn test_merge_prefers_newer_values() {
		let mut base = ServerConfigLayer {
			database: Some(DatabaseConfigLayer {
				url: Some("sqlite:./a.db".to_string()),
			}),
			..Default::default()
		};
		base.merge(ServerConfigLayer {
			database: Some(DatabaseConfigLayer {
				url: Some("sqlite:./b.db".to_string()),
			}),
			..Default::default()
		});
		assert_eq!(base.database.unwrap().url.as_deref(), Some("sqlite:./b.db"));
	}
}
