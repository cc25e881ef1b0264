// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Profile repository for database operations.
//!
//! Profiles share their primary key with the identity record held by the
//! external identity provider; the provisioning workflow upserts them and
//! the level-update workflow mutates `cefr_level`.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{sqlite::SqlitePool, Row};
use uuid::Uuid;

use elevate_auth::{CefrLevel, Profile, SchoolId, UserId, UserRole};

use crate::error::DbError;

/// Fields written when the provisioning workflow upserts a student profile.
#[derive(Debug, Clone)]
pub struct StudentProfileUpsert {
	pub id: UserId,
	pub full_name: String,
	pub school_id: SchoolId,
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
	async fn get_profile(&self, id: &UserId) -> Result<Option<Profile>, DbError>;
	async fn upsert_student_profile(&self, upsert: &StudentProfileUpsert) -> Result<(), DbError>;
	async fn update_cefr_level(&self, id: &UserId, level: CefrLevel) -> Result<(), DbError>;
}

/// Repository for profile database operations.
#[derive(Clone)]
pub struct ProfileRepository {
	pool: SqlitePool,
}

impl ProfileRepository {
	/// Create a new repository with the given pool.
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	/// Get a profile by user ID.
	///
	/// # Returns
	/// `None` if no profile exists for this ID.
	#[tracing::instrument(skip(self), fields(user_id = %id))]
	pub async fn get_profile(&self, id: &UserId) -> Result<Option<Profile>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT id, full_name, default_role, active_school_id, cefr_level, created_at, updated_at
			FROM profiles
			WHERE id = ?
			"#,
		)
		.bind(id.to_string())
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| self.row_to_profile(&r)).transpose()
	}

	/// Upsert a student profile on behalf of the provisioning workflow.
	///
	/// Conflict key is the profile ID. On conflict the full name and role are
	/// refreshed, but an existing `active_school_id` is preserved so a repeat
	/// provisioning call never silently moves a student to another school.
	/// `cefr_level` is untouched on conflict.
	///
	/// # Database Constraints
	/// - `id` must be unique
	#[tracing::instrument(skip(self, upsert), fields(user_id = %upsert.id, school_id = %upsert.school_id))]
	pub async fn upsert_student_profile(
		&self,
		upsert: &StudentProfileUpsert,
	) -> Result<(), DbError> {
		let now = Utc::now().to_rfc3339();
		sqlx::query(
			r#"
			INSERT INTO profiles (id, full_name, default_role, active_school_id, cefr_level, created_at, updated_at)
			VALUES (?, ?, 'student', ?, NULL, ?, ?)
			ON CONFLICT(id) DO UPDATE SET
				full_name = excluded.full_name,
				default_role = excluded.default_role,
				active_school_id = COALESCE(profiles.active_school_id, excluded.active_school_id),
				updated_at = excluded.updated_at
			"#,
		)
		.bind(upsert.id.to_string())
		.bind(&upsert.full_name)
		.bind(upsert.school_id.to_string())
		.bind(&now)
		.bind(&now)
		.execute(&self.pool)
		.await?;

		tracing::debug!(user_id = %upsert.id, "student profile upserted");
		Ok(())
	}

	/// Update a profile's CEFR level.
	///
	/// # Errors
	/// Returns `DbError::NotFound` if no profile exists for this ID.
	#[tracing::instrument(skip(self), fields(user_id = %id, level = %level))]
	pub async fn update_cefr_level(&self, id: &UserId, level: CefrLevel) -> Result<(), DbError> {
		let now = Utc::now().to_rfc3339();
		let result = sqlx::query(
			r#"
			UPDATE profiles
			SET cefr_level = ?, updated_at = ?
			WHERE id = ?
			"#,
		)
		.bind(level.as_str())
		.bind(&now)
		.bind(id.to_string())
		.execute(&self.pool)
		.await?;

		if result.rows_affected() == 0 {
			return Err(DbError::NotFound(format!("profile {id}")));
		}

		tracing::debug!(user_id = %id, level = %level, "profile level updated");
		Ok(())
	}

	fn row_to_profile(&self, row: &sqlx::sqlite::SqliteRow) -> Result<Profile, DbError> {
		let id_str: String = row.get("id");
		let role_str: String = row.get("default_role");
		let school_str: Option<String> = row.get("active_school_id");
		let level_str: Option<String> = row.get("cefr_level");
		let created_at: String = row.get("created_at");
		let updated_at: String = row.get("updated_at");

		let id = Uuid::parse_str(&id_str)
			.map_err(|e| DbError::Internal(format!("Invalid profile ID: {e}")))?;
		let default_role = role_str
			.parse::<UserRole>()
			.map_err(|e| DbError::Internal(format!("Invalid default_role: {e}")))?;
		let active_school_id = school_str
			.map(|s| {
				Uuid::parse_str(&s)
					.map(SchoolId::new)
					.map_err(|e| DbError::Internal(format!("Invalid active_school_id: {e}")))
			})
			.transpose()?;
		let cefr_level = level_str
			.map(|l| {
				l.parse::<CefrLevel>()
					.map_err(|e| DbError::Internal(format!("Invalid cefr_level: {e}")))
			})
			.transpose()?;

		Ok(Profile {
			id: UserId::new(id),
			full_name: row.get("full_name"),
			default_role,
			active_school_id,
			cefr_level,
			created_at: chrono::DateTime::parse_from_rfc3339(&created_at)
				.map_err(|e| DbError::Internal(format!("Invalid created_at: {e}")))?
				.with_timezone(&Utc),
			updated_at: chrono::DateTime::parse_from_rfc3339(&updated_at)
				.map_err(|e| DbError::Internal(format!("Invalid updated_at: {e}")))?
				.with_timezone(&Utc),
		})
	}
}

#[async_trait]
impl ProfileStore for ProfileRepository {
	async fn get_profile(&self, id: &UserId) -> Result<Option<Profile>, DbError> {
		self.get_profile(id).await
	}

	async fn upsert_student_profile(&self, upsert: &StudentProfileUpsert) -> Result<(), DbError> {
		self.upsert_student_profile(upsert).await
	}

	async fn update_cefr_level(&self, id: &UserId, level: CefrLevel) -> Result<(), DbError> {
		self.update_cefr_level(id, level).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::{create_migrated_test_pool, insert_test_profile, insert_test_school};

	#[tokio::test]
	async fn test_upsert_creates_profile() {
		let pool = create_migrated_test_pool().await;
		let repo = ProfileRepository::new(pool.clone());
		let school_id = insert_test_school(&pool, "Lycée Jean Moulin").await;

		let upsert = StudentProfileUpsert {
			id: UserId::generate(),
			full_name: "Amélie Durand".to_string(),
			school_id,
		};
		repo.upsert_student_profile(&upsert).await.unwrap();

		let profile = repo.get_profile(&upsert.id).await.unwrap().unwrap();
		assert_eq!(profile.full_name, "Amélie Durand");
		assert_eq!(profile.default_role, UserRole::Student);
		assert_eq!(profile.active_school_id, Some(school_id));
		assert_eq!(profile.cefr_level, None);
	}

	#[tokio::test]
	async fn test_upsert_preserves_existing_school() {
		let pool = create_migrated_test_pool().await;
		let repo = ProfileRepository::new(pool.clone());
		let first_school = insert_test_school(&pool, "École A").await;
		let second_school = insert_test_school(&pool, "École B").await;

		let id = UserId::generate();
		repo
			.upsert_student_profile(&StudentProfileUpsert {
				id,
				full_name: "Louis Petit".to_string(),
				school_id: first_school,
			})
			.await
			.unwrap();

		// Re-provisioning against another school refreshes the name but must
		// not move the student.
		repo
			.upsert_student_profile(&StudentProfileUpsert {
				id,
				full_name: "Louis G. Petit".to_string(),
				school_id: second_school,
			})
			.await
			.unwrap();

		let profile = repo.get_profile(&id).await.unwrap().unwrap();
		assert_eq!(profile.full_name, "Louis G. Petit");
		assert_eq!(profile.active_school_id, Some(first_school));
	}

	#[tokio::test]
	async fn test_upsert_keeps_cefr_level() {
		let pool = create_migrated_test_pool().await;
		let repo = ProfileRepository::new(pool.clone());
		let school_id = insert_test_school(&pool, "École").await;

		let id = UserId::generate();
		repo
			.upsert_student_profile(&StudentProfileUpsert {
				id,
				full_name: "Nina Caron".to_string(),
				school_id,
			})
			.await
			.unwrap();
		repo.update_cefr_level(&id, CefrLevel::B2).await.unwrap();

		repo
			.upsert_student_profile(&StudentProfileUpsert {
				id,
				full_name: "Nina Caron".to_string(),
				school_id,
			})
			.await
			.unwrap();

		let profile = repo.get_profile(&id).await.unwrap().unwrap();
		assert_eq!(profile.cefr_level, Some(CefrLevel::B2));
	}

	#[tokio::test]
	async fn test_update_level_missing_profile() {
		let pool = create_migrated_test_pool().await;
		let repo = ProfileRepository::new(pool);

		let result = repo
			.update_cefr_level(&UserId::generate(), CefrLevel::A2)
			.await;
		assert!(matches!(result, Err(DbError::NotFound(_))));
	}

	#[tokio::test]
	async fn test_get_profile_reads_teacher_role() {
		let pool = create_migrated_test_pool().await;
		let repo = ProfileRepository::new(pool.clone());

		let id = insert_test_profile(&pool, "M. Bernard", "teacher", None).await;
		let profile = repo.get_profile(&id).await.unwrap().unwrap();
		assert!(profile.is_teacher());
	}
}
