// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Assignment and submission repository.
//!
//! Grading mutates exactly one submission row per call; authorization joins
//! through the assignment to find the owning class.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{sqlite::SqlitePool, Row};
use uuid::Uuid;

use elevate_auth::{AssignmentId, ClassId, SubmissionId, UserId};

use crate::error::DbError;

/// A submission record.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
	pub id: SubmissionId,
	pub assignment_id: AssignmentId,
	pub student_id: UserId,
	pub status: String,
	pub score: Option<i64>,
	pub feedback: Option<String>,
	pub submitted_at: Option<chrono::DateTime<Utc>>,
	pub graded_at: Option<chrono::DateTime<Utc>>,
}

/// Fields written when a teacher grades a submission.
#[derive(Debug, Clone)]
pub struct GradeUpdate {
	pub score: i64,
	pub feedback: Option<String>,
}

#[async_trait]
pub trait SubmissionStore: Send + Sync {
	async fn get_submission_with_class(
		&self,
		submission_id: &SubmissionId,
	) -> Result<Option<(Submission, ClassId)>, DbError>;
	async fn apply_grade(
		&self,
		submission_id: &SubmissionId,
		grade: &GradeUpdate,
	) -> Result<(), DbError>;
}

/// Repository for assignment and submission operations.
#[derive(Clone)]
pub struct SubmissionRepository {
	pool: SqlitePool,
}

impl SubmissionRepository {
	/// Create a new repository with the given pool.
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	/// Get a submission together with the class that owns its assignment.
	///
	/// # Returns
	/// `None` if no submission exists with this ID.
	#[tracing::instrument(skip(self), fields(submission_id = %submission_id))]
	pub async fn get_submission_with_class(
		&self,
		submission_id: &SubmissionId,
	) -> Result<Option<(Submission, ClassId)>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT
				s.id, s.assignment_id, s.student_id, s.status, s.score, s.feedback,
				s.submitted_at, s.graded_at,
				a.class_id
			FROM submissions s
			INNER JOIN assignments a ON s.assignment_id = a.id
			WHERE s.id = ?
			"#,
		)
		.bind(submission_id.to_string())
		.fetch_optional(&self.pool)
		.await?;

		row
			.map(|r| {
				let submission = self.row_to_submission(&r)?;
				let class_str: String = r.get("class_id");
				let class_id = Uuid::parse_str(&class_str)
					.map_err(|e| DbError::Internal(format!("Invalid class_id: {e}")))?;
				Ok((submission, ClassId::new(class_id)))
			})
			.transpose()
	}

	/// Apply a grade: sets score and feedback, marks the submission graded.
	///
	/// # Errors
	/// Returns `DbError::NotFound` if no submission exists with this ID.
	#[tracing::instrument(skip(self, grade), fields(submission_id = %submission_id, score = grade.score))]
	pub async fn apply_grade(
		&self,
		submission_id: &SubmissionId,
		grade: &GradeUpdate,
	) -> Result<(), DbError> {
		let now = Utc::now().to_rfc3339();
		let result = sqlx::query(
			r#"
			UPDATE submissions
			SET score = ?, feedback = ?, status = 'graded', graded_at = ?
			WHERE id = ?
			"#,
		)
		.bind(grade.score)
		.bind(&grade.feedback)
		.bind(&now)
		.bind(submission_id.to_string())
		.execute(&self.pool)
		.await?;

		if result.rows_affected() == 0 {
			return Err(DbError::NotFound(format!("submission {submission_id}")));
		}

		tracing::debug!(submission_id = %submission_id, score = grade.score, "submission graded");
		Ok(())
	}

	fn row_to_submission(&self, row: &sqlx::sqlite::SqliteRow) -> Result<Submission, DbError> {
		let id_str: String = row.get("id");
		let assignment_str: String = row.get("assignment_id");
		let student_str: String = row.get("student_id");
		let submitted_at: Option<String> = row.get("submitted_at");
		let graded_at: Option<String> = row.get("graded_at");

		let id = Uuid::parse_str(&id_str)
			.map_err(|e| DbError::Internal(format!("Invalid submission ID: {e}")))?;
		let assignment_id = Uuid::parse_str(&assignment_str)
			.map_err(|e| DbError::Internal(format!("Invalid assignment_id: {e}")))?;
		let student_id = Uuid::parse_str(&student_str)
			.map_err(|e| DbError::Internal(format!("Invalid student_id: {e}")))?;

		Ok(Submission {
			id: SubmissionId::new(id),
			assignment_id: AssignmentId::new(assignment_id),
			student_id: UserId::new(student_id),
			status: row.get("status"),
			score: row.get("score"),
			feedback: row.get("feedback"),
			submitted_at: submitted_at.and_then(|d| {
				chrono::DateTime::parse_from_rfc3339(&d)
					.map(|dt| dt.with_timezone(&Utc))
					.ok()
			}),
			graded_at: graded_at.and_then(|d| {
				chrono::DateTime::parse_from_rfc3339(&d)
					.map(|dt| dt.with_timezone(&Utc))
					.ok()
			}),
		})
	}
}

#[async_trait]
impl SubmissionStore for SubmissionRepository {
	async fn get_submission_with_class(
		&self,
		submission_id: &SubmissionId,
	) -> Result<Option<(Submission, ClassId)>, DbError> {
		self.get_submission_with_class(submission_id).await
	}

	async fn apply_grade(
		&self,
		submission_id: &SubmissionId,
		grade: &GradeUpdate,
	) -> Result<(), DbError> {
		self.apply_grade(submission_id, grade).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::{
		create_migrated_test_pool, insert_test_assignment, insert_test_class, insert_test_school,
		insert_test_submission,
	};

	#[tokio::test]
	async fn test_get_submission_with_class() {
		let pool = create_migrated_test_pool().await;
		let school_id = insert_test_school(&pool, "École").await;
		let teacher_id = UserId::generate();
		let class_id = insert_test_class(&pool, Some(&school_id), &teacher_id, "B1").await;
		let assignment_id = insert_test_assignment(&pool, &class_id, "Essai").await;
		let student_id = UserId::generate();
		let submission_id = insert_test_submission(&pool, &assignment_id, &student_id).await;

		let repo = SubmissionRepository::new(pool);
		let (submission, owning_class) = repo
			.get_submission_with_class(&SubmissionId::new(
				Uuid::parse_str(&submission_id).unwrap(),
			))
			.await
			.unwrap()
			.unwrap();

		assert_eq!(owning_class, class_id);
		assert_eq!(submission.student_id, student_id);
		assert_eq!(submission.status, "submitted");
		assert!(submission.graded_at.is_none());
	}

	#[tokio::test]
	async fn test_apply_grade_marks_graded() {
		let pool = create_migrated_test_pool().await;
		let school_id = insert_test_school(&pool, "École").await;
		let class_id = insert_test_class(&pool, Some(&school_id), &UserId::generate(), "B1").await;
		let assignment_id = insert_test_assignment(&pool, &class_id, "Dictée").await;
		let student_id = UserId::generate();
		let submission_id = insert_test_submission(&pool, &assignment_id, &student_id).await;
		let submission_id = SubmissionId::new(Uuid::parse_str(&submission_id).unwrap());

		let repo = SubmissionRepository::new(pool);
		repo
			.apply_grade(
				&submission_id,
				&GradeUpdate {
					score: 85,
					feedback: Some("Très bon travail.".to_string()),
				},
			)
			.await
			.unwrap();

		let (graded, _) = repo
			.get_submission_with_class(&submission_id)
			.await
			.unwrap()
			.unwrap();
		assert_eq!(graded.score, Some(85));
		assert_eq!(graded.status, "graded");
		assert_eq!(graded.feedback.as_deref(), Some("Très bon travail."));
		assert!(graded.graded_at.is_some());
	}

	#[tokio::test]
	async fn test_apply_grade_missing_submission() {
		let pool = create_migrated_test_pool().await;
		let repo = SubmissionRepository::new(pool);

		let result = repo
			.apply_grade(
				&SubmissionId::generate(),
				&GradeUpdate {
					score: 50,
					feedback: None,
				},
			)
			.await;
		assert!(matches!(result, Err(DbError::NotFound(_))));
	}
}
