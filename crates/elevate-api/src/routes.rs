// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use axum::{
	middleware,
	routing::{get, post, put},
	Router,
};

use crate::auth::session_auth_middleware;
use crate::handlers::{activity, classes, enroll, grading, health, level, roster};
use crate::state::ApiState;

/// Build the full API router.
///
/// Everything under `/api` sits behind the session auth middleware; only
/// the health probe is public.
pub fn api_routes(state: ApiState) -> Router {
	let protected = Router::new()
		.route("/api/teacher/enroll-student", post(enroll::enroll_student))
		.route(
			"/api/teacher/update-student-level",
			post(level::update_student_level),
		)
		.route(
			"/api/teacher/grade-submission",
			post(grading::grade_submission),
		)
		.route(
			"/api/teacher/classes",
			post(classes::create_class).get(classes::list_classes),
		)
		.route(
			"/api/teacher/classes/{id}",
			put(classes::update_class).get(classes::class_detail),
		)
		.route(
			"/api/teacher/classes/{id}/archive",
			post(classes::archive_class),
		)
		.route(
			"/api/teacher/classes/{id}/unarchive",
			post(classes::unarchive_class),
		)
		.route(
			"/api/teacher/classes/{id}/roster",
			post(roster::add_roster_student),
		)
		.route(
			"/api/teacher/classes/{id}/roster/import",
			post(roster::import_roster),
		)
		.route(
			"/api/teacher/roster/{id}",
			put(roster::update_roster_student).delete(roster::remove_roster_student),
		)
		.route("/api/teacher/activity", get(activity::activity_feed))
		.layer(middleware::from_fn_with_state(
			state.clone(),
			session_auth_middleware,
		))
		.with_state(state);

	Router::new()
		.route("/health", get(health::health))
		.merge(protected)
}
