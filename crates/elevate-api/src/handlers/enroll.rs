// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Student enrollment endpoint.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::Serialize;
use tracing::info;

use elevate_provisioning::{AccountMode, EnrollStudentRequest};

use crate::auth::RequireAuth;
use crate::error::ApiError;
use crate::state::ApiState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollStudentResponse {
	pub student_id: String,
	pub email: String,
	pub class_name: String,
	pub account_mode: AccountMode,
}

/// `POST /api/teacher/enroll-student`
pub async fn enroll_student(
	RequireAuth(ctx): RequireAuth,
	State(state): State<ApiState>,
	payload: Result<Json<EnrollStudentRequest>, JsonRejection>,
) -> Result<Json<EnrollStudentResponse>, ApiError> {
	let Json(request) = payload.map_err(|_| ApiError::invalid_payload())?;

	let outcome = state.enrollment.provision_student(&ctx, &request).await?;

	info!(
		student_id = %outcome.student_id,
		mode = %outcome.account_mode,
		"student enrolled via direct account access"
	);

	Ok(Json(EnrollStudentResponse {
		student_id: outcome.student_id.to_string(),
		email: outcome.email,
		class_name: outcome.class_name,
		account_mode: outcome.account_mode,
	}))
}
