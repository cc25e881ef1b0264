// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! School membership repository.
//!
//! A membership is the (school, user) pair; the unique constraint on that
//! pair makes provisioning idempotent at this step.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{sqlite::SqlitePool, Row};
use uuid::Uuid;

use elevate_auth::{MembershipRole, MembershipStatus, SchoolId, UserId};

use crate::error::DbError;

/// A school membership record.
#[derive(Debug, Clone, PartialEq)]
pub struct SchoolMembership {
	pub school_id: SchoolId,
	pub user_id: UserId,
	pub role: MembershipRole,
	pub status: MembershipStatus,
	pub invited_by: Option<UserId>,
	pub invited_at: Option<chrono::DateTime<Utc>>,
	pub joined_at: Option<chrono::DateTime<Utc>>,
}

/// Fields written when the provisioning workflow upserts a membership.
#[derive(Debug, Clone)]
pub struct MembershipUpsert {
	pub school_id: SchoolId,
	pub user_id: UserId,
	pub role: MembershipRole,
	pub invited_by: UserId,
}

#[async_trait]
pub trait MembershipStore: Send + Sync {
	async fn upsert_membership(&self, upsert: &MembershipUpsert) -> Result<(), DbError>;
	async fn get_membership(
		&self,
		school_id: &SchoolId,
		user_id: &UserId,
	) -> Result<Option<SchoolMembership>, DbError>;
}

/// Repository for school membership operations.
#[derive(Clone)]
pub struct MembershipRepository {
	pool: SqlitePool,
}

impl MembershipRepository {
	/// Create a new repository with the given pool.
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	/// Upsert a membership with status `active`.
	///
	/// Conflict key: (`school_id`, `user_id`). On conflict the role, status,
	/// inviter and join timestamp are refreshed, converging repeat
	/// provisioning calls onto a single row.
	#[tracing::instrument(skip(self, upsert), fields(school_id = %upsert.school_id, user_id = %upsert.user_id, role = %upsert.role))]
	pub async fn upsert_membership(&self, upsert: &MembershipUpsert) -> Result<(), DbError> {
		let id = Uuid::new_v4().to_string();
		let now = Utc::now().to_rfc3339();
		sqlx::query(
			r#"
			INSERT INTO school_memberships (id, school_id, user_id, role, status, invited_by, invited_at, joined_at)
			VALUES (?, ?, ?, ?, 'active', ?, ?, ?)
			ON CONFLICT(school_id, user_id) DO UPDATE SET
				role = excluded.role,
				status = excluded.status,
				invited_by = excluded.invited_by,
				joined_at = excluded.joined_at
			"#,
		)
		.bind(&id)
		.bind(upsert.school_id.to_string())
		.bind(upsert.user_id.to_string())
		.bind(upsert.role.to_string())
		.bind(upsert.invited_by.to_string())
		.bind(&now)
		.bind(&now)
		.execute(&self.pool)
		.await?;

		tracing::debug!(school_id = %upsert.school_id, user_id = %upsert.user_id, "membership upserted");
		Ok(())
	}

	/// Get a membership for a user in a school.
	///
	/// # Returns
	/// `None` if the user is not a member.
	#[tracing::instrument(skip(self), fields(school_id = %school_id, user_id = %user_id))]
	pub async fn get_membership(
		&self,
		school_id: &SchoolId,
		user_id: &UserId,
	) -> Result<Option<SchoolMembership>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT school_id, user_id, role, status, invited_by, invited_at, joined_at
			FROM school_memberships
			WHERE school_id = ? AND user_id = ?
			"#,
		)
		.bind(school_id.to_string())
		.bind(user_id.to_string())
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| self.row_to_membership(&r)).transpose()
	}

	fn row_to_membership(&self, row: &sqlx::sqlite::SqliteRow) -> Result<SchoolMembership, DbError> {
		let school_str: String = row.get("school_id");
		let user_str: String = row.get("user_id");
		let role_str: String = row.get("role");
		let status_str: String = row.get("status");
		let invited_by: Option<String> = row.get("invited_by");
		let invited_at: Option<String> = row.get("invited_at");
		let joined_at: Option<String> = row.get("joined_at");

		let school_id = Uuid::parse_str(&school_str)
			.map_err(|e| DbError::Internal(format!("Invalid school_id: {e}")))?;
		let user_id = Uuid::parse_str(&user_str)
			.map_err(|e| DbError::Internal(format!("Invalid user_id: {e}")))?;
		let role = match role_str.as_str() {
			"teacher" => MembershipRole::Teacher,
			"admin" => MembershipRole::Admin,
			_ => MembershipRole::Student,
		};
		let status = match status_str.as_str() {
			"invited" => MembershipStatus::Invited,
			"left" => MembershipStatus::Left,
			_ => MembershipStatus::Active,
		};

		Ok(SchoolMembership {
			school_id: SchoolId::new(school_id),
			user_id: UserId::new(user_id),
			role,
			status,
			invited_by: invited_by.and_then(|v| Uuid::parse_str(&v).map(UserId::new).ok()),
			invited_at: invited_at.and_then(|d| {
				chrono::DateTime::parse_from_rfc3339(&d)
					.map(|dt| dt.with_timezone(&Utc))
					.ok()
			}),
			joined_at: joined_at.and_then(|d| {
				chrono::DateTime::parse_from_rfc3339(&d)
					.map(|dt| dt.with_timezone(&Utc))
					.ok()
			}),
		})
	}
}

#[async_trait]
impl MembershipStore for MembershipRepository {
	async fn upsert_membership(&self, upsert: &MembershipUpsert) -> Result<(), DbError> {
		self.upsert_membership(upsert).await
	}

	async fn get_membership(
		&self,
		school_id: &SchoolId,
		user_id: &UserId,
	) -> Result<Option<SchoolMembership>, DbError> {
		self.get_membership(school_id, user_id).await
	}
}
