// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Class repository for database operations.
//!
//! This module provides database access for class management including:
//! - Class CRUD and archive/unarchive
//! - Ownership-scoped lookup used by the authorization check (a teacher can
//!   only act on classes they own)

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{sqlite::SqlitePool, Row};
use uuid::Uuid;

use elevate_auth::{CefrLevel, ClassId, SchoolId, UserId};

use crate::error::DbError;

/// A class record.
#[derive(Debug, Clone, PartialEq)]
pub struct Class {
	pub id: ClassId,
	pub school_id: Option<SchoolId>,
	pub teacher_id: UserId,
	pub name: String,
	pub cefr_level: Option<CefrLevel>,
	pub class_code: Option<String>,
	pub academic_year: Option<String>,
	pub archived_at: Option<chrono::DateTime<Utc>>,
	pub created_at: chrono::DateTime<Utc>,
	pub updated_at: chrono::DateTime<Utc>,
}

impl Class {
	/// True if the class has been archived. Archived classes reject new
	/// enrollments.
	pub fn is_archived(&self) -> bool {
		self.archived_at.is_some()
	}
}

/// Fields for creating a class.
#[derive(Debug, Clone)]
pub struct NewClass {
	pub school_id: Option<SchoolId>,
	pub teacher_id: UserId,
	pub name: String,
	pub cefr_level: CefrLevel,
	pub class_code: Option<String>,
	pub academic_year: Option<String>,
}

/// Fields for updating a class.
#[derive(Debug, Clone)]
pub struct ClassUpdate {
	pub name: String,
	pub cefr_level: CefrLevel,
	pub class_code: Option<String>,
	pub academic_year: Option<String>,
}

#[async_trait]
pub trait ClassStore: Send + Sync {
	async fn create_class(&self, new: &NewClass) -> Result<Class, DbError>;
	async fn get_class_for_teacher(
		&self,
		class_id: &ClassId,
		teacher_id: &UserId,
	) -> Result<Option<Class>, DbError>;
	async fn update_class(&self, class_id: &ClassId, update: &ClassUpdate) -> Result<(), DbError>;
	async fn archive_class(&self, class_id: &ClassId) -> Result<(), DbError>;
	async fn unarchive_class(&self, class_id: &ClassId) -> Result<(), DbError>;
	async fn list_classes_for_teacher(
		&self,
		teacher_id: &UserId,
		include_archived: bool,
	) -> Result<Vec<Class>, DbError>;
}

/// Repository for class database operations.
#[derive(Clone)]
pub struct ClassRepository {
	pool: SqlitePool,
}

impl ClassRepository {
	/// Create a new repository with the given pool.
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	/// Create a new class.
	///
	/// # Errors
	/// Returns `DbError::Sqlx` if insert fails.
	#[tracing::instrument(skip(self, new), fields(teacher_id = %new.teacher_id))]
	pub async fn create_class(&self, new: &NewClass) -> Result<Class, DbError> {
		let now = Utc::now();
		let class = Class {
			id: ClassId::generate(),
			school_id: new.school_id,
			teacher_id: new.teacher_id,
			name: new.name.clone(),
			cefr_level: Some(new.cefr_level),
			class_code: new.class_code.clone(),
			academic_year: new.academic_year.clone(),
			archived_at: None,
			created_at: now,
			updated_at: now,
		};

		sqlx::query(
			r#"
			INSERT INTO classes (id, school_id, teacher_id, name, cefr_level, class_code, academic_year, archived_at, created_at, updated_at)
			VALUES (?, ?, ?, ?, ?, ?, ?, NULL, ?, ?)
			"#,
		)
		.bind(class.id.to_string())
		.bind(class.school_id.map(|s| s.to_string()))
		.bind(class.teacher_id.to_string())
		.bind(&class.name)
		.bind(new.cefr_level.as_str())
		.bind(&class.class_code)
		.bind(&class.academic_year)
		.bind(now.to_rfc3339())
		.bind(now.to_rfc3339())
		.execute(&self.pool)
		.await?;

		tracing::debug!(class_id = %class.id, "class created");
		Ok(class)
	}

	/// Resolve a class by (class, teacher).
	///
	/// The single lookup used by the authorization check: it intentionally
	/// does not distinguish "no such class" from "class owned by someone
	/// else".
	///
	/// # Returns
	/// `None` if the class does not exist or is not owned by this teacher.
	/// Archived classes are returned; callers inspect `archived_at`.
	#[tracing::instrument(skip(self), fields(class_id = %class_id, teacher_id = %teacher_id))]
	pub async fn get_class_for_teacher(
		&self,
		class_id: &ClassId,
		teacher_id: &UserId,
	) -> Result<Option<Class>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT id, school_id, teacher_id, name, cefr_level, class_code, academic_year, archived_at, created_at, updated_at
			FROM classes
			WHERE id = ? AND teacher_id = ?
			"#,
		)
		.bind(class_id.to_string())
		.bind(teacher_id.to_string())
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| self.row_to_class(&r)).transpose()
	}

	/// Update a class's editable fields.
	#[tracing::instrument(skip(self, update), fields(class_id = %class_id))]
	pub async fn update_class(
		&self,
		class_id: &ClassId,
		update: &ClassUpdate,
	) -> Result<(), DbError> {
		let now = Utc::now().to_rfc3339();
		sqlx::query(
			r#"
			UPDATE classes
			SET name = ?, cefr_level = ?, class_code = ?, academic_year = ?, updated_at = ?
			WHERE id = ?
			"#,
		)
		.bind(&update.name)
		.bind(update.cefr_level.as_str())
		.bind(&update.class_code)
		.bind(&update.academic_year)
		.bind(&now)
		.bind(class_id.to_string())
		.execute(&self.pool)
		.await?;

		tracing::debug!(class_id = %class_id, "class updated");
		Ok(())
	}

	/// Archive a class.
	#[tracing::instrument(skip(self), fields(class_id = %class_id))]
	pub async fn archive_class(&self, class_id: &ClassId) -> Result<(), DbError> {
		let now = Utc::now().to_rfc3339();
		sqlx::query(
			r#"
			UPDATE classes
			SET archived_at = ?, updated_at = ?
			WHERE id = ? AND archived_at IS NULL
			"#,
		)
		.bind(&now)
		.bind(&now)
		.bind(class_id.to_string())
		.execute(&self.pool)
		.await?;

		tracing::debug!(class_id = %class_id, "class archived");
		Ok(())
	}

	/// Restore an archived class.
	#[tracing::instrument(skip(self), fields(class_id = %class_id))]
	pub async fn unarchive_class(&self, class_id: &ClassId) -> Result<(), DbError> {
		let now = Utc::now().to_rfc3339();
		sqlx::query(
			r#"
			UPDATE classes
			SET archived_at = NULL, updated_at = ?
			WHERE id = ?
			"#,
		)
		.bind(&now)
		.bind(class_id.to_string())
		.execute(&self.pool)
		.await?;

		tracing::debug!(class_id = %class_id, "class unarchived");
		Ok(())
	}

	/// List classes owned by a teacher, newest first.
	#[tracing::instrument(skip(self), fields(teacher_id = %teacher_id, include_archived))]
	pub async fn list_classes_for_teacher(
		&self,
		teacher_id: &UserId,
		include_archived: bool,
	) -> Result<Vec<Class>, DbError> {
		let query = if include_archived {
			r#"
			SELECT id, school_id, teacher_id, name, cefr_level, class_code, academic_year, archived_at, created_at, updated_at
			FROM classes
			WHERE teacher_id = ?
			ORDER BY created_at DESC
			"#
		} else {
			r#"
			SELECT id, school_id, teacher_id, name, cefr_level, class_code, academic_year, archived_at, created_at, updated_at
			FROM classes
			WHERE teacher_id = ? AND archived_at IS NULL
			ORDER BY created_at DESC
			"#
		};

		let rows = sqlx::query(query)
			.bind(teacher_id.to_string())
			.fetch_all(&self.pool)
			.await?;

		let classes: Result<Vec<_>, _> = rows.iter().map(|r| self.row_to_class(r)).collect();
		let classes = classes?;
		tracing::debug!(teacher_id = %teacher_id, count = classes.len(), "listed classes for teacher");
		Ok(classes)
	}

	fn row_to_class(&self, row: &sqlx::sqlite::SqliteRow) -> Result<Class, DbError> {
		let id_str: String = row.get("id");
		let school_str: Option<String> = row.get("school_id");
		let teacher_str: String = row.get("teacher_id");
		let level_str: Option<String> = row.get("cefr_level");
		let archived_at: Option<String> = row.get("archived_at");
		let created_at: String = row.get("created_at");
		let updated_at: String = row.get("updated_at");

		let id = Uuid::parse_str(&id_str)
			.map_err(|e| DbError::Internal(format!("Invalid class ID: {e}")))?;
		let school_id = school_str
			.map(|s| {
				Uuid::parse_str(&s)
					.map(SchoolId::new)
					.map_err(|e| DbError::Internal(format!("Invalid school_id: {e}")))
			})
			.transpose()?;
		let teacher_id = Uuid::parse_str(&teacher_str)
			.map_err(|e| DbError::Internal(format!("Invalid teacher_id: {e}")))?;
		let cefr_level = level_str.and_then(|l| l.parse::<CefrLevel>().ok());

		Ok(Class {
			id: ClassId::new(id),
			school_id,
			teacher_id: UserId::new(teacher_id),
			name: row.get("name"),
			cefr_level,
			class_code: row.get("class_code"),
			academic_year: row.get("academic_year"),
			archived_at: archived_at.and_then(|d| {
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
impl ClassStore for ClassRepository {
	async fn create_class(&self, new: &NewClass) -> Result<Class, DbError> {
		self.create_class(new).await
	}

	async fn get_class_for_teacher(
		&self,
		class_id: &ClassId,
		teacher_id: &UserId,
	) -> Result<Option<Class>, DbError> {
		self.get_class_for_teacher(class_id, teacher_id).await
	}

	async fn update_class(&self, class_id: &ClassId, update: &ClassUpdate) -> Result<(), DbError> {
		self.update_class(class_id, update).await
	}

	async fn archive_class(&self, class_id: &ClassId) -> Result<(), DbError> {
		self.archive_class(class_id).await
	}

	async fn unarchive_class(&self, class_id: &ClassId) -> Result<(), DbError> {
		self.unarchive_class(class_id).await
	}

	async fn list_classes_for_teacher(
		&self,
		teacher_id: &UserId,
		include_archived: bool,
	) -> Result<Vec<Class>, DbError> {
		self.list_classes_for_teacher(teacher_id, include_archived)
			.await
	}
}
