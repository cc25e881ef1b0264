// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! School repository.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{sqlite::SqlitePool, Row};
use uuid::Uuid;

use elevate_auth::SchoolId;

use crate::error::DbError;

/// A school (organization) record.
#[derive(Debug, Clone, PartialEq)]
pub struct School {
	pub id: SchoolId,
	pub name: String,
	pub created_at: chrono::DateTime<Utc>,
}

#[async_trait]
pub trait SchoolStore: Send + Sync {
	async fn create_school(&self, name: &str) -> Result<School, DbError>;
	async fn get_school(&self, id: &SchoolId) -> Result<Option<School>, DbError>;
}

#[derive(Clone)]
pub struct SchoolRepository {
	pool: SqlitePool,
}

impl SchoolRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	/// Create a school and return it.
	#[tracing::instrument(skip(self, name))]
	pub async fn create_school(&self, name: &str) -> Result<School, DbError> {
		let school = School {
			id: SchoolId::generate(),
			name: name.to_string(),
			created_at: Utc::now(),
		};

		sqlx::query("INSERT INTO schools (id, name, created_at) VALUES (?, ?, ?)")
			.bind(school.id.to_string())
			.bind(&school.name)
			.bind(school.created_at.to_rfc3339())
			.execute(&self.pool)
			.await?;

		tracing::debug!(school_id = %school.id, "school created");
		Ok(school)
	}

	/// Get a school by ID.
	#[tracing::instrument(skip(self), fields(school_id = %id))]
	pub async fn get_school(&self, id: &SchoolId) -> Result<Option<School>, DbError> {
		let row = sqlx::query("SELECT id, name, created_at FROM schools WHERE id = ?")
			.bind(id.to_string())
			.fetch_optional(&self.pool)
			.await?;

		row
			.map(|r| {
				let id_str: String = r.get("id");
				let created_at: String = r.get("created_at");
				let id = Uuid::parse_str(&id_str)
					.map_err(|e| DbError::Internal(format!("Invalid school ID: {e}")))?;
				Ok(School {
					id: SchoolId::new(id),
					name: r.get("name"),
					created_at: chrono::DateTime::parse_from_rfc3339(&created_at)
						.map_err(|e| DbError::Internal(format!("Invalid created_at: {e}")))?
						.with_timezone(&Utc),
				})
			})
			.transpose()
	}
}

#[async_trait]
impl SchoolStore for SchoolRepository {
	async fn create_school(&self, name: &str) -> Result<School, DbError> {
		self.create_school(name).await
	}

	async fn get_school(&self, id: &SchoolId) -> Result<Option<School>, DbError> {
		self.get_school(id).await
	}
}
