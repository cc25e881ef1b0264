// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Application-level profile record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{CefrLevel, SchoolId, UserId, UserRole};

/// A person's application profile.
///
/// Shares its `id` with the identity record at the external identity
/// provider; created or upserted by the provisioning workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
	pub id: UserId,
	pub full_name: String,
	pub default_role: UserRole,
	pub active_school_id: Option<SchoolId>,
	pub cefr_level: Option<CefrLevel>,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

impl Profile {
	/// True if this profile belongs to a teacher account.
	pub fn is_teacher(&self) -> bool {
		self.default_role == UserRole::Teacher
	}
}
