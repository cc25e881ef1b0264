// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Offline class roster repository.
//!
//! Roster rows are name-only student records without a login; teachers
//! manage them by hand or import them in bulk from pre-parsed rows.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{sqlite::SqlitePool, Row};
use uuid::Uuid;

use elevate_auth::{ClassId, RosterId};

use crate::error::DbError;

/// A roster entry.
#[derive(Debug, Clone, PartialEq)]
pub struct RosterStudent {
	pub id: RosterId,
	pub class_id: ClassId,
	pub first_name: String,
	pub last_name: String,
	pub company: Option<String>,
	pub city: Option<String>,
	pub sort_order: i64,
	pub created_at: chrono::DateTime<Utc>,
}

/// Input for creating or importing a roster entry. Names are expected
/// trimmed and non-empty by the caller.
#[derive(Debug, Clone)]
pub struct NewRosterStudent {
	pub first_name: String,
	pub last_name: String,
	pub company: Option<String>,
	pub city: Option<String>,
}

#[async_trait]
pub trait RosterStore: Send + Sync {
	async fn add_roster_student(
		&self,
		class_id: &ClassId,
		new: &NewRosterStudent,
	) -> Result<RosterStudent, DbError>;
	async fn get_roster_student(
		&self,
		roster_id: &RosterId,
	) -> Result<Option<RosterStudent>, DbError>;
	async fn update_roster_student(
		&self,
		roster_id: &RosterId,
		new: &NewRosterStudent,
	) -> Result<(), DbError>;
	async fn remove_roster_student(&self, roster_id: &RosterId) -> Result<bool, DbError>;
	async fn import_roster_rows(
		&self,
		class_id: &ClassId,
		rows: &[NewRosterStudent],
	) -> Result<usize, DbError>;
	async fn list_roster(&self, class_id: &ClassId) -> Result<Vec<RosterStudent>, DbError>;
}

/// Repository for roster operations.
#[derive(Clone)]
pub struct RosterRepository {
	pool: SqlitePool,
}

impl RosterRepository {
	/// Create a new repository with the given pool.
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	/// Add one roster entry at the end of the class ordering.
	#[tracing::instrument(skip(self, new), fields(class_id = %class_id))]
	pub async fn add_roster_student(
		&self,
		class_id: &ClassId,
		new: &NewRosterStudent,
	) -> Result<RosterStudent, DbError> {
		let next_sort = self.next_sort_order(class_id).await?;
		let student = RosterStudent {
			id: RosterId::generate(),
			class_id: *class_id,
			first_name: new.first_name.clone(),
			last_name: new.last_name.clone(),
			company: new.company.clone(),
			city: new.city.clone(),
			sort_order: next_sort,
			created_at: Utc::now(),
		};

		sqlx::query(
			r#"
			INSERT INTO class_students (id, class_id, first_name, last_name, company, city, sort_order, created_at)
			VALUES (?, ?, ?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(student.id.to_string())
		.bind(class_id.to_string())
		.bind(&student.first_name)
		.bind(&student.last_name)
		.bind(&student.company)
		.bind(&student.city)
		.bind(student.sort_order)
		.bind(student.created_at.to_rfc3339())
		.execute(&self.pool)
		.await?;

		tracing::debug!(roster_id = %student.id, class_id = %class_id, "roster student added");
		Ok(student)
	}

	/// Get one roster entry by ID.
	#[tracing::instrument(skip(self), fields(roster_id = %roster_id))]
	pub async fn get_roster_student(
		&self,
		roster_id: &RosterId,
	) -> Result<Option<RosterStudent>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT id, class_id, first_name, last_name, company, city, sort_order, created_at
			FROM class_students
			WHERE id = ?
			"#,
		)
		.bind(roster_id.to_string())
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| self.row_to_roster_student(&r)).transpose()
	}

	/// Update a roster entry's fields.
	#[tracing::instrument(skip(self, new), fields(roster_id = %roster_id))]
	pub async fn update_roster_student(
		&self,
		roster_id: &RosterId,
		new: &NewRosterStudent,
	) -> Result<(), DbError> {
		let result = sqlx::query(
			r#"
			UPDATE class_students
			SET first_name = ?, last_name = ?, company = ?, city = ?
			WHERE id = ?
			"#,
		)
		.bind(&new.first_name)
		.bind(&new.last_name)
		.bind(&new.company)
		.bind(&new.city)
		.bind(roster_id.to_string())
		.execute(&self.pool)
		.await?;

		if result.rows_affected() == 0 {
			return Err(DbError::NotFound(format!("roster entry {roster_id}")));
		}

		tracing::debug!(roster_id = %roster_id, "roster student updated");
		Ok(())
	}

	/// Remove a roster entry.
	///
	/// # Returns
	/// `true` if an entry was removed.
	#[tracing::instrument(skip(self), fields(roster_id = %roster_id))]
	pub async fn remove_roster_student(&self, roster_id: &RosterId) -> Result<bool, DbError> {
		let result = sqlx::query("DELETE FROM class_students WHERE id = ?")
			.bind(roster_id.to_string())
			.execute(&self.pool)
			.await?;

		let removed = result.rows_affected() > 0;
		if removed {
			tracing::debug!(roster_id = %roster_id, "roster student removed");
		}
		Ok(removed)
	}

	/// Bulk-import pre-parsed roster rows.
	///
	/// Rows are assigned sequential sort orders after the current maximum.
	/// Conflict key: (`class_id`, `first_name`, `last_name`) — re-importing
	/// the same sheet refreshes company/city instead of duplicating.
	///
	/// # Returns
	/// The number of rows written.
	#[tracing::instrument(skip(self, rows), fields(class_id = %class_id, rows = rows.len()))]
	pub async fn import_roster_rows(
		&self,
		class_id: &ClassId,
		rows: &[NewRosterStudent],
	) -> Result<usize, DbError> {
		if rows.is_empty() {
			return Ok(0);
		}

		let mut next_sort = self.next_sort_order(class_id).await?;
		let now = Utc::now().to_rfc3339();

		for row in rows {
			sqlx::query(
				r#"
				INSERT INTO class_students (id, class_id, first_name, last_name, company, city, sort_order, created_at)
				VALUES (?, ?, ?, ?, ?, ?, ?, ?)
				ON CONFLICT(class_id, first_name, last_name) DO UPDATE SET
					company = excluded.company,
					city = excluded.city
				"#,
			)
			.bind(Uuid::new_v4().to_string())
			.bind(class_id.to_string())
			.bind(&row.first_name)
			.bind(&row.last_name)
			.bind(&row.company)
			.bind(&row.city)
			.bind(next_sort)
			.bind(&now)
			.execute(&self.pool)
			.await?;
			next_sort += 1;
		}

		tracing::debug!(class_id = %class_id, count = rows.len(), "roster rows imported");
		Ok(rows.len())
	}

	/// List the roster ordered by sort order, then name.
	#[tracing::instrument(skip(self), fields(class_id = %class_id))]
	pub async fn list_roster(&self, class_id: &ClassId) -> Result<Vec<RosterStudent>, DbError> {
		let rows = sqlx::query(
			r#"
			SELECT id, class_id, first_name, last_name, company, city, sort_order, created_at
			FROM class_students
			WHERE class_id = ?
			ORDER BY sort_order ASC, last_name ASC, first_name ASC
			"#,
		)
		.bind(class_id.to_string())
		.fetch_all(&self.pool)
		.await?;

		rows.iter().map(|r| self.row_to_roster_student(r)).collect()
	}

	async fn next_sort_order(&self, class_id: &ClassId) -> Result<i64, DbError> {
		let row: (Option<i64>,) =
			sqlx::query_as("SELECT MAX(sort_order) FROM class_students WHERE class_id = ?")
				.bind(class_id.to_string())
				.fetch_one(&self.pool)
				.await?;
		Ok(row.0.unwrap_or(0) + 1)
	}

	fn row_to_roster_student(&self, row: &sqlx::sqlite::SqliteRow) -> Result<RosterStudent, DbError> {
		let id_str: String = row.get("id");
		let class_str: String = row.get("class_id");
		let created_at: String = row.get("created_at");

		let id = Uuid::parse_str(&id_str)
			.map_err(|e| DbError::Internal(format!("Invalid roster ID: {e}")))?;
		let class_id = Uuid::parse_str(&class_str)
			.map_err(|e| DbError::Internal(format!("Invalid class_id: {e}")))?;

		Ok(RosterStudent {
			id: RosterId::new(id),
			class_id: ClassId::new(class_id),
			first_name: row.get("first_name"),
			last_name: row.get("last_name"),
			company: row.get("company"),
			city: row.get("city"),
			sort_order: row.get("sort_order"),
			created_at: chrono::DateTime::parse_from_rfc3339(&created_at)
				.map_err(|e| DbError::Internal(format!("Invalid created_at: {e}")))?
				.with_timezone(&Utc),
		})
	}
}

#[async_trait]
impl RosterStore for RosterRepository {
	async fn add_roster_student(
		&self,
		class_id: &ClassId,
		new: &NewRosterStudent,
	) -> Result<RosterStudent, DbError> {
		self.add_roster_student(class_id, new).await
	}

	async fn get_roster_student(
		&self,
		roster_id: &RosterId,
	) -> Result<Option<RosterStudent>, DbError> {
		self.get_roster_student(roster_id).await
	}

	async fn update_roster_student(
		&self,
		roster_id: &RosterId,
		new: &NewRosterStudent,
	) -> Result<(), DbError> {
		self.update_roster_student(roster_id, new).await
	}

	async fn remove_roster_student(&self, roster_id: &RosterId) -> Result<bool, DbError> {
		self.remove_roster_student(roster_id).await
	}

	async fn import_roster_rows(
		&self,
		class_id: &ClassId,
		rows: &[NewRosterStudent],
	) -> Result<usize, DbError> {
		self.import_roster_rows(class_id, rows).await
	}

	async fn list_roster(&self, class_id: &ClassId) -> Result<Vec<RosterStudent>, DbError> {
		self.list_roster(class_id).await
	}
}
