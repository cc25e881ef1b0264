// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Class enrollment repository.
//!
//! Enrollment is the (class, student) pair with an active/left status;
//! re-enrollment reactivates the row and clears `left_at`.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{sqlite::SqlitePool, Row};
use uuid::Uuid;

use elevate_auth::{ClassId, EnrollmentStatus, UserId};

use crate::error::DbError;

/// A class enrollment record.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassEnrollment {
	pub class_id: ClassId,
	pub student_id: UserId,
	pub status: EnrollmentStatus,
	pub left_at: Option<chrono::DateTime<Utc>>,
	pub created_at: chrono::DateTime<Utc>,
	pub updated_at: chrono::DateTime<Utc>,
}

#[async_trait]
pub trait EnrollmentStore: Send + Sync {
	async fn upsert_active_enrollment(
		&self,
		class_id: &ClassId,
		student_id: &UserId,
	) -> Result<(), DbError>;
	async fn get_enrollment(
		&self,
		class_id: &ClassId,
		student_id: &UserId,
	) -> Result<Option<ClassEnrollment>, DbError>;
	async fn get_active_enrollment(
		&self,
		class_id: &ClassId,
		student_id: &UserId,
	) -> Result<Option<ClassEnrollment>, DbError>;
	async fn leave_class(&self, class_id: &ClassId, student_id: &UserId) -> Result<bool, DbError>;
	async fn list_active_enrollments(
		&self,
		class_id: &ClassId,
	) -> Result<Vec<ClassEnrollment>, DbError>;
}

/// Repository for class enrollment operations.
#[derive(Clone)]
pub struct EnrollmentRepository {
	pool: SqlitePool,
}

impl EnrollmentRepository {
	/// Create a new repository with the given pool.
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	/// Upsert an active enrollment.
	///
	/// Conflict key: (`class_id`, `student_id`). On conflict the row is
	/// reactivated and `left_at` cleared, so a student who previously left
	/// the class is re-enrolled rather than duplicated.
	#[tracing::instrument(skip(self), fields(class_id = %class_id, student_id = %student_id))]
	pub async fn upsert_active_enrollment(
		&self,
		class_id: &ClassId,
		student_id: &UserId,
	) -> Result<(), DbError> {
		let id = Uuid::new_v4().to_string();
		let now = Utc::now().to_rfc3339();
		sqlx::query(
			r#"
			INSERT INTO class_enrollments (id, class_id, student_id, status, left_at, created_at, updated_at)
			VALUES (?, ?, ?, 'active', NULL, ?, ?)
			ON CONFLICT(class_id, student_id) DO UPDATE SET
				status = 'active',
				left_at = NULL,
				updated_at = excluded.updated_at
			"#,
		)
		.bind(&id)
		.bind(class_id.to_string())
		.bind(student_id.to_string())
		.bind(&now)
		.bind(&now)
		.execute(&self.pool)
		.await?;

		tracing::debug!(class_id = %class_id, student_id = %student_id, "enrollment upserted");
		Ok(())
	}

	/// Get an enrollment regardless of status.
	#[tracing::instrument(skip(self), fields(class_id = %class_id, student_id = %student_id))]
	pub async fn get_enrollment(
		&self,
		class_id: &ClassId,
		student_id: &UserId,
	) -> Result<Option<ClassEnrollment>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT class_id, student_id, status, left_at, created_at, updated_at
			FROM class_enrollments
			WHERE class_id = ? AND student_id = ?
			"#,
		)
		.bind(class_id.to_string())
		.bind(student_id.to_string())
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| self.row_to_enrollment(&r)).transpose()
	}

	/// Get an enrollment only if it is active.
	///
	/// Used by the level-update and grading authorization checks.
	#[tracing::instrument(skip(self), fields(class_id = %class_id, student_id = %student_id))]
	pub async fn get_active_enrollment(
		&self,
		class_id: &ClassId,
		student_id: &UserId,
	) -> Result<Option<ClassEnrollment>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT class_id, student_id, status, left_at, created_at, updated_at
			FROM class_enrollments
			WHERE class_id = ? AND student_id = ? AND status = 'active'
			"#,
		)
		.bind(class_id.to_string())
		.bind(student_id.to_string())
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| self.row_to_enrollment(&r)).transpose()
	}

	/// Mark a student as having left a class.
	///
	/// # Returns
	/// `true` if an active enrollment was updated.
	#[tracing::instrument(skip(self), fields(class_id = %class_id, student_id = %student_id))]
	pub async fn leave_class(
		&self,
		class_id: &ClassId,
		student_id: &UserId,
	) -> Result<bool, DbError> {
		let now = Utc::now().to_rfc3339();
		let result = sqlx::query(
			r#"
			UPDATE class_enrollments
			SET status = 'left', left_at = ?, updated_at = ?
			WHERE class_id = ? AND student_id = ? AND status = 'active'
			"#,
		)
		.bind(&now)
		.bind(&now)
		.bind(class_id.to_string())
		.bind(student_id.to_string())
		.execute(&self.pool)
		.await?;

		let left = result.rows_affected() > 0;
		if left {
			tracing::debug!(class_id = %class_id, student_id = %student_id, "student left class");
		}
		Ok(left)
	}

	/// List active enrollments for a class, oldest first.
	#[tracing::instrument(skip(self), fields(class_id = %class_id))]
	pub async fn list_active_enrollments(
		&self,
		class_id: &ClassId,
	) -> Result<Vec<ClassEnrollment>, DbError> {
		let rows = sqlx::query(
			r#"
			SELECT class_id, student_id, status, left_at, created_at, updated_at
			FROM class_enrollments
			WHERE class_id = ? AND status = 'active'
			ORDER BY created_at ASC
			"#,
		)
		.bind(class_id.to_string())
		.fetch_all(&self.pool)
		.await?;

		let enrollments: Result<Vec<_>, _> =
			rows.iter().map(|r| self.row_to_enrollment(r)).collect();
		let enrollments = enrollments?;
		tracing::debug!(class_id = %class_id, count = enrollments.len(), "listed active enrollments");
		Ok(enrollments)
	}

	fn row_to_enrollment(&self, row: &sqlx::sqlite::SqliteRow) -> Result<ClassEnrollment, DbError> {
		let class_str: String = row.get("class_id");
		let student_str: String = row.get("student_id");
		let status_str: String = row.get("status");
		let left_at: Option<String> = row.get("left_at");
		let created_at: String = row.get("created_at");
		let updated_at: String = row.get("updated_at");

		let class_id = Uuid::parse_str(&class_str)
			.map_err(|e| DbError::Internal(format!("Invalid class_id: {e}")))?;
		let student_id = Uuid::parse_str(&student_str)
			.map_err(|e| DbError::Internal(format!("Invalid student_id: {e}")))?;
		let status = match status_str.as_str() {
			"left" => EnrollmentStatus::Left,
			_ => EnrollmentStatus::Active,
		};

		Ok(ClassEnrollment {
			class_id: ClassId::new(class_id),
			student_id: UserId::new(student_id),
			status,
			left_at: left_at.and_then(|d| {
				chrono::DateTime::parse_from_rfc3339(&d)
					.map(|dt| dt.with_timezone(&Utc))
					.ok()
			}),
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
impl EnrollmentStore for EnrollmentRepository {
	async fn upsert_active_enrollment(
		&self,
		class_id: &ClassId,
		student_id: &UserId,
	) -> Result<(), DbError> {
		self.upsert_active_enrollment(class_id, student_id).await
	}

	async fn get_enrollment(
		&self,
		class_id: &ClassId,
		student_id: &UserId,
	) -> Result<Option<ClassEnrollment>, DbError> {
		self.get_enrollment(class_id, student_id).await
	}

	async fn get_active_enrollment(
		&self,
		class_id: &ClassId,
		student_id: &UserId,
	) -> Result<Option<ClassEnrollment>, DbError> {
		self.get_active_enrollment(class_id, student_id).await
	}

	async fn leave_class(&self, class_id: &ClassId, student_id: &UserId) -> Result<bool, DbError> {
		self.leave_class(class_id, student_id).await
	}

	async fn list_active_enrollments(
		&self,
		class_id: &ClassId,
	) -> Result<Vec<ClassEnrollment>, DbError> {
		self.list_active_enrollments(class_id).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::{create_migrated_test_pool, insert_test_class, insert_test_school};

	async fn setup() -> (SqlitePool, EnrollmentRepository, ClassId) {
		let pool = create_migrated_test_pool().await;
		let school_id = insert_test_school(&pool, "École").await;
		let teacher_id = UserId::generate();
		let class_id = insert_test_class(&pool, Some(&school_id), &teacher_id, "B1").await;
		let repo = EnrollmentRepository::new(pool.clone());
		(pool, repo, class_id)
	}

	#[tokio::test]
	async fn test_upsert_and_get_active() {
		let (_pool, repo, class_id) = setup().await;
		let student_id = UserId::generate();

		repo
			.upsert_active_enrollment(&class_id, &student_id)
			.await
			.unwrap();

		let enrollment = repo
			.get_active_enrollment(&class_id, &student_id)
			.await
			.unwrap()
			.unwrap();
		assert_eq!(enrollment.status, EnrollmentStatus::Active);
		assert!(enrollment.left_at.is_none());
	}

	#[tokio::test]
	async fn test_reenrollment_clears_left_at() {
		let (_pool, repo, class_id) = setup().await;
		let student_id = UserId::generate();

		repo
			.upsert_active_enrollment(&class_id, &student_id)
			.await
			.unwrap();
		assert!(repo.leave_class(&class_id, &student_id).await.unwrap());

		let gone = repo
			.get_active_enrollment(&class_id, &student_id)
			.await
			.unwrap();
		assert!(gone.is_none());

		repo
			.upsert_active_enrollment(&class_id, &student_id)
			.await
			.unwrap();

		let back = repo
			.get_enrollment(&class_id, &student_id)
			.await
			.unwrap()
			.unwrap();
		assert_eq!(back.status, EnrollmentStatus::Active);
		assert!(back.left_at.is_none());
	}

	#[tokio::test]
	async fn test_upsert_does_not_duplicate() {
		let (pool, repo, class_id) = setup().await;
		let student_id = UserId::generate();

		repo
			.upsert_active_enrollment(&class_id, &student_id)
			.await
			.unwrap();
		repo
			.upsert_active_enrollment(&class_id, &student_id)
			.await
			.unwrap();

		let row: (i64,) = sqlx::query_as(
			"SELECT COUNT(*) FROM class_enrollments WHERE class_id = ? AND student_id = ?",
		)
		.bind(class_id.to_string())
		.bind(student_id.to_string())
		.fetch_one(&pool)
		.await
		.unwrap();
		assert_eq!(row.0, 1);
	}

	#[tokio::test]
	async fn test_list_active_enrollments() {
		let (_pool, repo, class_id) = setup().await;
		let active = UserId::generate();
		let gone = UserId::generate();

		repo
			.upsert_active_enrollment(&class_id, &active)
			.await
			.unwrap();
		repo.upsert_active_enrollment(&class_id, &gone).await.unwrap();
		repo.leave_class(&class_id, &gone).await.unwrap();

		let list = repo.list_active_enrollments(&class_id).await.unwrap();
		assert_eq!(list.len(), 1);
		assert_eq!(list[0].student_id, active);
	}
}
