// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Activity event repository.
//!
//! Events are append-only; the core workflows never read them back. The
//! feed endpoint reads the most recent events for a school or an actor.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{sqlite::SqlitePool, Row};
use uuid::Uuid;

use elevate_auth::{ClassId, EventId, SchoolId, UserId};

use crate::error::DbError;

/// Fields for appending an activity event.
#[derive(Debug, Clone)]
pub struct NewActivityEvent {
	pub school_id: Option<SchoolId>,
	pub class_id: Option<ClassId>,
	pub actor_id: UserId,
	pub target_user_id: Option<UserId>,
	pub event_type: String,
	pub payload: serde_json::Value,
}

/// A stored activity event.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityEventRecord {
	pub id: EventId,
	pub school_id: Option<SchoolId>,
	pub class_id: Option<ClassId>,
	pub actor_id: UserId,
	pub target_user_id: Option<UserId>,
	pub event_type: String,
	pub payload: serde_json::Value,
	pub created_at: chrono::DateTime<Utc>,
}

#[async_trait]
pub trait ActivityEventStore: Send + Sync {
	async fn insert_event(&self, event: &NewActivityEvent) -> Result<(), DbError>;
	async fn list_recent_for_school(
		&self,
		school_id: &SchoolId,
		limit: i64,
	) -> Result<Vec<ActivityEventRecord>, DbError>;
	async fn list_recent_for_actor(
		&self,
		actor_id: &UserId,
		limit: i64,
	) -> Result<Vec<ActivityEventRecord>, DbError>;
}

/// Repository for activity event operations.
#[derive(Clone)]
pub struct ActivityEventRepository {
	pool: SqlitePool,
}

impl ActivityEventRepository {
	/// Create a new repository with the given pool.
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	/// Append one event.
	#[tracing::instrument(skip(self, event), fields(event_type = %event.event_type, actor_id = %event.actor_id))]
	pub async fn insert_event(&self, event: &NewActivityEvent) -> Result<(), DbError> {
		let id = EventId::generate();
		let payload = serde_json::to_string(&event.payload)?;
		sqlx::query(
			r#"
			INSERT INTO activity_events (id, school_id, class_id, actor_id, target_user_id, event_type, payload, created_at)
			VALUES (?, ?, ?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(id.to_string())
		.bind(event.school_id.map(|s| s.to_string()))
		.bind(event.class_id.map(|c| c.to_string()))
		.bind(event.actor_id.to_string())
		.bind(event.target_user_id.map(|u| u.to_string()))
		.bind(&event.event_type)
		.bind(&payload)
		.bind(Utc::now().to_rfc3339())
		.execute(&self.pool)
		.await?;

		tracing::debug!(event_id = %id, event_type = %event.event_type, "activity event appended");
		Ok(())
	}

	/// Most recent events for a school, newest first.
	#[tracing::instrument(skip(self), fields(school_id = %school_id, limit))]
	pub async fn list_recent_for_school(
		&self,
		school_id: &SchoolId,
		limit: i64,
	) -> Result<Vec<ActivityEventRecord>, DbError> {
		let rows = sqlx::query(
			r#"
			SELECT id, school_id, class_id, actor_id, target_user_id, event_type, payload, created_at
			FROM activity_events
			WHERE school_id = ?
			ORDER BY created_at DESC
			LIMIT ?
			"#,
		)
		.bind(school_id.to_string())
		.bind(limit)
		.fetch_all(&self.pool)
		.await?;

		rows.iter().map(|r| self.row_to_event(r)).collect()
	}

	/// Most recent school-less events produced by an actor, newest first.
	#[tracing::instrument(skip(self), fields(actor_id = %actor_id, limit))]
	pub async fn list_recent_for_actor(
		&self,
		actor_id: &UserId,
		limit: i64,
	) -> Result<Vec<ActivityEventRecord>, DbError> {
		let rows = sqlx::query(
			r#"
			SELECT id, school_id, class_id, actor_id, target_user_id, event_type, payload, created_at
			FROM activity_events
			WHERE actor_id = ? AND school_id IS NULL
			ORDER BY created_at DESC
			LIMIT ?
			"#,
		)
		.bind(actor_id.to_string())
		.bind(limit)
		.fetch_all(&self.pool)
		.await?;

		rows.iter().map(|r| self.row_to_event(r)).collect()
	}

	fn row_to_event(&self, row: &sqlx::sqlite::SqliteRow) -> Result<ActivityEventRecord, DbError> {
		let id_str: String = row.get("id");
		let school_str: Option<String> = row.get("school_id");
		let class_str: Option<String> = row.get("class_id");
		let actor_str: String = row.get("actor_id");
		let target_str: Option<String> = row.get("target_user_id");
		let payload_str: String = row.get("payload");
		let created_at: String = row.get("created_at");

		let id = Uuid::parse_str(&id_str)
			.map_err(|e| DbError::Internal(format!("Invalid event ID: {e}")))?;
		let actor_id = Uuid::parse_str(&actor_str)
			.map_err(|e| DbError::Internal(format!("Invalid actor_id: {e}")))?;

		Ok(ActivityEventRecord {
			id: EventId::new(id),
			school_id: school_str.and_then(|s| Uuid::parse_str(&s).map(SchoolId::new).ok()),
			class_id: class_str.and_then(|c| Uuid::parse_str(&c).map(ClassId::new).ok()),
			actor_id: UserId::new(actor_id),
			target_user_id: target_str.and_then(|t| Uuid::parse_str(&t).map(UserId::new).ok()),
			event_type: row.get("event_type"),
			payload: serde_json::from_str(&payload_str)?,
			created_at: chrono::DateTime::parse_from_rfc3339(&created_at)
				.map_err(|e| DbError::Internal(format!("Invalid created_at: {e}")))?
				.with_timezone(&Utc),
		})
	}
}

#[async_trait]
impl ActivityEventStore for ActivityEventRepository {
	async fn insert_event(&self, event: &NewActivityEvent) -> Result<(), DbError> {
		self.insert_event(event).await
	}

	async fn list_recent_for_school(
		&self,
		school_id: &SchoolId,
		limit: i64,
	) -> Result<Vec<ActivityEventRecord>, DbError> {
		self.list_recent_for_school(school_id, limit).await
	}

	async fn list_recent_for_actor(
		&self,
		actor_id: &UserId,
		limit: i64,
	) -> Result<Vec<ActivityEventRecord>, DbError> {
		self.list_recent_for_actor(actor_id, limit).await
	}
}
