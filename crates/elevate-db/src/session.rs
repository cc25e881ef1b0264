// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Session repository.
//!
//! Sessions are written by the login layer (out of scope here) and consumed
//! by the auth middleware. Tokens are stored as SHA-256 hashes only.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{sqlite::SqlitePool, Row};
use uuid::Uuid;

use elevate_auth::{SessionId, UserId};

use crate::error::DbError;

/// A session record.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
	pub id: SessionId,
	pub user_id: UserId,
	pub created_at: chrono::DateTime<Utc>,
	pub expires_at: chrono::DateTime<Utc>,
}

impl Session {
	/// True if the session has expired.
	pub fn is_expired(&self) -> bool {
		self.expires_at <= Utc::now()
	}
}

#[async_trait]
pub trait SessionStore: Send + Sync {
	async fn get_session_by_token_hash(
		&self,
		token_hash: &str,
	) -> Result<Option<Session>, DbError>;
	async fn insert_session(
		&self,
		user_id: &UserId,
		token_hash: &str,
		expires_at: chrono::DateTime<Utc>,
	) -> Result<Session, DbError>;
	async fn delete_expired_sessions(&self) -> Result<u64, DbError>;
}

/// Repository for session operations.
#[derive(Clone)]
pub struct SessionRepository {
	pool: SqlitePool,
}

impl SessionRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	/// Look up a session by its token hash.
	///
	/// Expired sessions are returned; callers check [`Session::is_expired`].
	#[tracing::instrument(skip(self, token_hash))]
	pub async fn get_session_by_token_hash(
		&self,
		token_hash: &str,
	) -> Result<Option<Session>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT id, user_id, created_at, expires_at
			FROM sessions
			WHERE token_hash = ?
			"#,
		)
		.bind(token_hash)
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| self.row_to_session(&r)).transpose()
	}

	/// Insert a session row.
	#[tracing::instrument(skip(self, token_hash), fields(user_id = %user_id))]
	pub async fn insert_session(
		&self,
		user_id: &UserId,
		token_hash: &str,
		expires_at: chrono::DateTime<Utc>,
	) -> Result<Session, DbError> {
		let session = Session {
			id: SessionId::generate(),
			user_id: *user_id,
			created_at: Utc::now(),
			expires_at,
		};

		sqlx::query(
			r#"
			INSERT INTO sessions (id, user_id, token_hash, created_at, expires_at)
			VALUES (?, ?, ?, ?, ?)
			"#,
		)
		.bind(session.id.to_string())
		.bind(user_id.to_string())
		// Note: token_hash is intentionally not logged
		.bind(token_hash)
		.bind(session.created_at.to_rfc3339())
		.bind(session.expires_at.to_rfc3339())
		.execute(&self.pool)
		.await?;

		tracing::debug!(session_id = %session.id, user_id = %user_id, "session inserted");
		Ok(session)
	}

	/// Delete expired sessions.
	///
	/// # Returns
	/// The number of rows deleted.
	#[tracing::instrument(skip(self))]
	pub async fn delete_expired_sessions(&self) -> Result<u64, DbError> {
		let now = Utc::now().to_rfc3339();
		let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
			.bind(&now)
			.execute(&self.pool)
			.await?;

		let deleted = result.rows_affected();
		if deleted > 0 {
			tracing::debug!(deleted, "expired sessions removed");
		}
		Ok(deleted)
	}

	fn row_to_session(&self, row: &sqlx::sqlite::SqliteRow) -> Result<Session, DbError> {
		let id_str: String = row.get("id");
		let user_str: String = row.get("user_id");
		let created_at: String = row.get("created_at");
		let expires_at: String = row.get("expires_at");

		let id = Uuid::parse_str(&id_str)
			.map_err(|e| DbError::Internal(format!("Invalid session ID: {e}")))?;
		let user_id = Uuid::parse_str(&user_str)
			.map_err(|e| DbError::Internal(format!("Invalid user_id: {e}")))?;

		Ok(Session {
			id: SessionId::new(id),
			user_id: UserId::new(user_id),
			created_at: chrono::DateTime::parse_from_rfc3339(&created_at)
				.map_err(|e| DbError::Internal(format!("Invalid created_at: {e}")))?
				.with_timezone(&Utc),
			expires_at: chrono::DateTime::parse_from_rfc3339(&expires_at)
				.map_err(|e| DbError::Internal(format!("Invalid expires_at: {e}")))?
				.with_timezone(&Utc),
		})
	}
}

#[async_trait]
impl SessionStore for SessionRepository {
	async fn get_session_by_token_hash(
		&self,
		token_hash: &str,
	) -> Result<Option<Session>, DbError> {
		self.get_session_by_token_hash(token_hash).await
	}

	async fn insert_session(
		&self,
		user_id: &UserId,
		token_hash: &str,
		expires_at: chrono::DateTime<Utc>,
	) -> Result<Session, DbError> {
		self.insert_session(user_id, token_hash, expires_at).await
	}

	async fn delete_expired_sessions(&self) -> Result<u64, DbError> {
		self.delete_expired_sessions().await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::create_migrated_test_pool;
	use chrono::Duration;

	#[tokio::test]
	async fn test_insert_and_lookup_by_hash() {
		let pool = create_migrated_test_pool().await;
		let repo = SessionRepository::new(pool);
		let user_id = UserId::generate();

		let session = repo
			.insert_session(&user_id, "deadbeef", Utc::now() + Duration::hours(8))
			.await
			.unwrap();

		let found = repo
			.get_session_by_token_hash("deadbeef")
			.await
			.unwrap()
			.unwrap();
		assert_eq!(found.id, session.id);
		assert_eq!(found.user_id, user_id);
		assert!(!found.is_expired());
	}

	#[tokio::test]
	async fn test_unknown_hash_returns_none() {
		let pool = create_migrated_test_pool().await;
		let repo = SessionRepository::new(pool);

		let found = repo.get_session_by_token_hash("cafe").await.unwrap();
		assert!(found.is_none());
	}

	#[tokio::test]
	async fn test_delete_expired_sessions() {
		let pool = create_migrated_test_pool().await;
		let repo = SessionRepository::new(pool);
		let user_id = UserId::generate();

		repo
			.insert_session(&user_id, "old", Utc::now() - Duration::hours(1))
			.await
			.unwrap();
		repo
			.insert_session(&user_id, "fresh", Utc::now() + Duration::hours(1))
			.await
			.unwrap();

		let deleted = repo.delete_expired_sessions().await.unwrap();
		assert_eq!(deleted, 1);
		assert!(repo
			.get_session_by_token_hash("old")
			.await
			.unwrap()
			.is_none());
		assert!(repo
			.get_session_by_token_hash("fresh")
			.await
			.unwrap()
			.is_some());
	}
}
