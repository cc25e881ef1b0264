// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Shared helpers for repository and workflow tests.

use chrono::Utc;
use sqlx::sqlite::SqlitePool;
use uuid::Uuid;

use elevate_auth::{ClassId, SchoolId, UserId};

use crate::schema::run_migrations;

pub async fn create_test_pool() -> SqlitePool {
	SqlitePool::connect(":memory:").await.unwrap()
}

/// In-memory pool with the full schema applied.
pub async fn create_migrated_test_pool() -> SqlitePool {
	let pool = create_test_pool().await;
	run_migrations(&pool).await.unwrap();
	pool
}

pub async fn insert_test_school(pool: &SqlitePool, name: &str) -> SchoolId {
	let id = SchoolId::generate();
	sqlx::query("INSERT INTO schools (id, name, created_at) VALUES (?, ?, ?)")
		.bind(id.to_string())
		.bind(name)
		.bind(Utc::now().to_rfc3339())
		.execute(pool)
		.await
		.unwrap();
	id
}

pub async fn insert_test_profile(
	pool: &SqlitePool,
	full_name: &str,
	default_role: &str,
	active_school_id: Option<&SchoolId>,
) -> UserId {
	let id = UserId::generate();
	let now = Utc::now().to_rfc3339();
	sqlx::query(
		r#"
		INSERT INTO profiles (id, full_name, default_role, active_school_id, created_at, updated_at)
		VALUES (?, ?, ?, ?, ?, ?)
		"#,
	)
	.bind(id.to_string())
	.bind(full_name)
	.bind(default_role)
	.bind(active_school_id.map(|s| s.to_string()))
	.bind(&now)
	.bind(&now)
	.execute(pool)
	.await
	.unwrap();
	id
}

pub async fn insert_test_class(
	pool: &SqlitePool,
	school_id: Option<&SchoolId>,
	teacher_id: &UserId,
	name: &str,
) -> ClassId {
	let id = ClassId::generate();
	let now = Utc::now().to_rfc3339();
	sqlx::query(
		r#"
		INSERT INTO classes (id, school_id, teacher_id, name, cefr_level, created_at, updated_at)
		VALUES (?, ?, ?, ?, 'b1', ?, ?)
		"#,
	)
	.bind(id.to_string())
	.bind(school_id.map(|s| s.to_string()))
	.bind(teacher_id.to_string())
	.bind(name)
	.bind(&now)
	.bind(&now)
	.execute(pool)
	.await
	.unwrap();
	id
}

pub async fn archive_test_class(pool: &SqlitePool, class_id: &ClassId) {
	sqlx::query("UPDATE classes SET archived_at = ? WHERE id = ?")
		.bind(Utc::now().to_rfc3339())
		.bind(class_id.to_string())
		.execute(pool)
		.await
		.unwrap();
}

pub async fn insert_test_assignment(pool: &SqlitePool, class_id: &ClassId, title: &str) -> String {
	let id = Uuid::new_v4().to_string();
	sqlx::query(
		r#"
		INSERT INTO assignments (id, class_id, title, kind, max_score, created_at)
		VALUES (?, ?, ?, 'exercise', 100, ?)
		"#,
	)
	.bind(&id)
	.bind(class_id.to_string())
	.bind(title)
	.bind(Utc::now().to_rfc3339())
	.execute(pool)
	.await
	.unwrap();
	id
}

pub async fn insert_test_submission(
	pool: &SqlitePool,
	assignment_id: &str,
	student_id: &UserId,
) -> String {
	let id = Uuid::new_v4().to_string();
	sqlx::query(
		r#"
		INSERT INTO submissions (id, assignment_id, student_id, status, submitted_at)
		VALUES (?, ?, ?, 'submitted', ?)
		"#,
	)
	.bind(&id)
	.bind(assignment_id)
	.bind(student_id.to_string())
	.bind(Utc::now().to_rfc3339())
	.execute(pool)
	.await
	.unwrap();
	id
}
