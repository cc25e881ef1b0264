// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Schema migrations.
//!
//! Every statement is idempotent (`CREATE TABLE IF NOT EXISTS`), so running
//! migrations on an already-initialized database is a no-op.

use sqlx::sqlite::SqlitePool;

use crate::error::DbError;

const STATEMENTS: &[&str] = &[
	r#"
	CREATE TABLE IF NOT EXISTS schools (
		id TEXT PRIMARY KEY,
		name TEXT NOT NULL,
		created_at TEXT NOT NULL
	)
	"#,
	r#"
	CREATE TABLE IF NOT EXISTS profiles (
		id TEXT PRIMARY KEY,
		full_name TEXT NOT NULL,
		default_role TEXT NOT NULL DEFAULT 'student',
		active_school_id TEXT REFERENCES schools(id),
		cefr_level TEXT,
		created_at TEXT NOT NULL,
		updated_at TEXT NOT NULL
	)
	"#,
	r#"
	CREATE TABLE IF NOT EXISTS classes (
		id TEXT PRIMARY KEY,
		school_id TEXT REFERENCES schools(id),
		teacher_id TEXT NOT NULL,
		name TEXT NOT NULL,
		cefr_level TEXT,
		class_code TEXT,
		academic_year TEXT,
		archived_at TEXT,
		created_at TEXT NOT NULL,
		updated_at TEXT NOT NULL
	)
	"#,
	r#"
	CREATE TABLE IF NOT EXISTS school_memberships (
		id TEXT PRIMARY KEY,
		school_id TEXT NOT NULL REFERENCES schools(id),
		user_id TEXT NOT NULL,
		role TEXT NOT NULL,
		status TEXT NOT NULL DEFAULT 'active',
		invited_by TEXT,
		invited_at TEXT,
		joined_at TEXT,
		UNIQUE(school_id, user_id)
	)
	"#,
	r#"
	CREATE TABLE IF NOT EXISTS class_enrollments (
		id TEXT PRIMARY KEY,
		class_id TEXT NOT NULL REFERENCES classes(id),
		student_id TEXT NOT NULL,
		status TEXT NOT NULL DEFAULT 'active',
		left_at TEXT,
		created_at TEXT NOT NULL,
		updated_at TEXT NOT NULL,
		UNIQUE(class_id, student_id)
	)
	"#,
	r#"
	CREATE TABLE IF NOT EXISTS class_students (
		id TEXT PRIMARY KEY,
		class_id TEXT NOT NULL REFERENCES classes(id),
		first_name TEXT NOT NULL,
		last_name TEXT NOT NULL,
		company TEXT,
		city TEXT,
		sort_order INTEGER NOT NULL DEFAULT 0,
		created_at TEXT NOT NULL,
		UNIQUE(class_id, first_name, last_name)
	)
	"#,
	r#"
	CREATE TABLE IF NOT EXISTS assignments (
		id TEXT PRIMARY KEY,
		class_id TEXT NOT NULL REFERENCES classes(id),
		title TEXT NOT NULL,
		kind TEXT NOT NULL DEFAULT 'exercise',
		cefr_level TEXT,
		max_score INTEGER NOT NULL DEFAULT 100,
		due_at TEXT,
		created_at TEXT NOT NULL
	)
	"#,
	r#"
	CREATE TABLE IF NOT EXISTS submissions (
		id TEXT PRIMARY KEY,
		assignment_id TEXT NOT NULL REFERENCES assignments(id),
		student_id TEXT NOT NULL,
		status TEXT NOT NULL DEFAULT 'submitted',
		score INTEGER,
		feedback TEXT,
		submitted_at TEXT,
		graded_at TEXT,
		UNIQUE(assignment_id, student_id)
	)
	"#,
	r#"
	CREATE TABLE IF NOT EXISTS activity_events (
		id TEXT PRIMARY KEY,
		school_id TEXT,
		class_id TEXT,
		actor_id TEXT NOT NULL,
		target_user_id TEXT,
		event_type TEXT NOT NULL,
		payload TEXT NOT NULL DEFAULT '{}',
		created_at TEXT NOT NULL
	)
	"#,
	r#"
	CREATE TABLE IF NOT EXISTS sessions (
		id TEXT PRIMARY KEY,
		user_id TEXT NOT NULL,
		token_hash TEXT NOT NULL UNIQUE,
		created_at TEXT NOT NULL,
		expires_at TEXT NOT NULL
	)
	"#,
];

/// Create all tables if they do not exist.
///
/// # Errors
/// Returns `DbError::Sqlx` if any DDL statement fails.
#[tracing::instrument(skip(pool))]
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), DbError> {
	for statement in STATEMENTS {
		sqlx::query(statement).execute(pool).await?;
	}

	tracing::debug!(statements = STATEMENTS.len(), "database migrations applied");
	Ok(())
}
