// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The externally-owned identity directory interface.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use elevate_auth::{UserId, UserRole};

use crate::error::DirectoryError;

/// Free-form metadata attached to an identity (display name, role hint).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityMetadata {
	pub full_name: String,
	pub role: UserRole,
}

/// Fields for creating an identity.
#[derive(Debug, Clone)]
pub struct NewIdentity {
	pub email: String,
	pub password: String,
	/// Mark the email confirmed on creation (teacher-provisioned accounts
	/// skip the confirmation mail).
	pub email_confirm: bool,
	pub metadata: IdentityMetadata,
}

/// Fields for updating an existing identity.
#[derive(Debug, Clone)]
pub struct IdentityUpdate {
	pub password: String,
	pub email_confirm: bool,
	pub metadata: IdentityMetadata,
}

/// An identity as reported by the directory.
#[derive(Debug, Clone, PartialEq)]
pub struct IdentityRecord {
	pub id: UserId,
	pub email: String,
	pub email_confirmed: bool,
	pub created_at: Option<DateTime<Utc>>,
}

/// Admin interface of the hosted identity provider.
///
/// The provider offers no server-side lookup by email for admin callers;
/// `list_users` pagination is all there is, which is why
/// [`crate::IdentityService::find_identity_by_email`] scans.
#[async_trait]
pub trait IdentityDirectory: Send + Sync {
	async fn create_user(&self, new: &NewIdentity) -> Result<IdentityRecord, DirectoryError>;
	async fn update_user_by_id(
		&self,
		id: &UserId,
		update: &IdentityUpdate,
	) -> Result<(), DirectoryError>;
	async fn delete_user(&self, id: &UserId) -> Result<(), DirectoryError>;
	async fn list_users(
		&self,
		page: u32,
		per_page: u32,
	) -> Result<Vec<IdentityRecord>, DirectoryError>;
}
