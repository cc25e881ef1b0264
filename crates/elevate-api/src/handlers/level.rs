// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! CEFR level update endpoint.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::Serialize;

use elevate_provisioning::UpdateLevelRequest;

use crate::auth::RequireAuth;
use crate::error::ApiError;
use crate::state::ApiState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLevelResponse {
	pub student_id: String,
	pub class_id: String,
	/// Uppercase user-facing form, e.g. `"B2"`.
	pub cefr_level: String,
}

/// `POST /api/teacher/update-student-level`
pub async fn update_student_level(
	RequireAuth(ctx): RequireAuth,
	State(state): State<ApiState>,
	payload: Result<Json<UpdateLevelRequest>, JsonRejection>,
) -> Result<Json<UpdateLevelResponse>, ApiError> {
	let Json(request) = payload.map_err(|_| ApiError::invalid_payload())?;

	let outcome = state.levels.update_student_level(&ctx, &request).await?;

	Ok(Json(UpdateLevelResponse {
		student_id: outcome.student_id.to_string(),
		class_id: outcome.class_id.to_string(),
		cefr_level: outcome.cefr_level.display_upper(),
	}))
}
