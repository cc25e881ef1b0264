// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Submission grading endpoint.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::Serialize;

use elevate_provisioning::GradeSubmissionRequest;

use crate::auth::RequireAuth;
use crate::error::ApiError;
use crate::state::ApiState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeSubmissionResponse {
	pub submission_id: String,
	pub student_id: String,
	pub score: i64,
}

/// `POST /api/teacher/grade-submission`
pub async fn grade_submission(
	RequireAuth(ctx): RequireAuth,
	State(state): State<ApiState>,
	payload: Result<Json<GradeSubmissionRequest>, JsonRejection>,
) -> Result<Json<GradeSubmissionResponse>, ApiError> {
	let Json(request) = payload.map_err(|_| ApiError::invalid_payload())?;

	let outcome = state.grading.grade_submission(&ctx, &request).await?;

	Ok(Json(GradeSubmissionResponse {
		submission_id: outcome.submission_id.to_string(),
		student_id: outcome.student_id.to_string(),
		score: outcome.score,
	}))
}
