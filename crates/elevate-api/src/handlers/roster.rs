// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Offline roster endpoints.
//!
//! Roster rows arrive pre-parsed; CSV parsing happens client-side.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use elevate_activity::{ActivityEvent, ActivityEventType};
use elevate_auth::{AuthContext, ClassId, RosterId};
use elevate_db::{NewRosterStudent, RosterStudent};

use crate::auth::RequireAuth;
use crate::error::ApiError;
use crate::state::ApiState;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntryRequest {
	#[serde(default)]
	pub first_name: String,
	#[serde(default)]
	pub last_name: String,
	#[serde(default)]
	pub company: Option<String>,
	#[serde(default)]
	pub city: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ImportRosterRequest {
	#[serde(default)]
	pub rows: Vec<RosterEntryRequest>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntryResponse {
	pub id: String,
	pub first_name: String,
	pub last_name: String,
	pub company: Option<String>,
	pub city: Option<String>,
	pub sort_order: i64,
}

#[derive(Debug, Serialize)]
pub struct ImportRosterResponse {
	pub imported: usize,
}

impl RosterEntryResponse {
	pub(crate) fn from_student(student: RosterStudent) -> Self {
		Self {
			id: student.id.to_string(),
			first_name: student.first_name,
			last_name: student.last_name,
			company: student.company,
			city: student.city,
			sort_order: student.sort_order,
		}
	}
}

fn normalize_entry(entry: &RosterEntryRequest) -> Option<NewRosterStudent> {
	let first_name = entry.first_name.trim().to_string();
	let last_name = entry.last_name.trim().to_string();
	if first_name.is_empty() || last_name.is_empty() {
		return None;
	}

	Some(NewRosterStudent {
		first_name,
		last_name,
		company: entry
			.company
			.as_deref()
			.map(str::trim)
			.filter(|c| !c.is_empty())
			.map(str::to_string),
		city: entry
			.city
			.as_deref()
			.map(str::trim)
			.filter(|c| !c.is_empty())
			.map(str::to_string),
	})
}

fn require_entry(entry: &RosterEntryRequest) -> Result<NewRosterStudent, ApiError> {
	normalize_entry(entry).ok_or_else(|| {
		ApiError::BadRequest("Le prénom et le nom sont obligatoires.".to_string())
	})
}

fn parse_class_path(id: &str) -> Result<ClassId, ApiError> {
	Uuid::parse_str(id)
		.map(ClassId::new)
		.map_err(|_| ApiError::class_access_denied())
}

async fn authorize_class(
	state: &ApiState,
	ctx: &AuthContext,
	class_id: &ClassId,
) -> Result<elevate_db::Class, ApiError> {
	match state.classes.get_class_for_teacher(class_id, &ctx.user_id).await {
		Ok(Some(class)) => Ok(class),
		Ok(None) => Err(ApiError::class_access_denied()),
		Err(e) => {
			warn!(class_id = %class_id, error = %e, "class lookup failed");
			Err(ApiError::class_access_denied())
		}
	}
}

/// Resolve a roster entry and require that its class belongs to the caller.
async fn authorize_roster_entry(
	state: &ApiState,
	ctx: &AuthContext,
	roster_id: &RosterId,
) -> Result<RosterStudent, ApiError> {
	let entry = match state.roster.get_roster_student(roster_id).await {
		Ok(Some(entry)) => entry,
		Ok(None) => {
			return Err(ApiError::NotFound(
				"Élève introuvable dans la liste.".to_string(),
			))
		}
		Err(e) => {
			warn!(roster_id = %roster_id, error = %e, "roster lookup failed");
			return Err(ApiError::NotFound(
				"Élève introuvable dans la liste.".to_string(),
			));
		}
	};

	authorize_class(state, ctx, &entry.class_id).await?;
	Ok(entry)
}

/// `POST /api/teacher/classes/{id}/roster`
pub async fn add_roster_student(
	RequireAuth(ctx): RequireAuth,
	State(state): State<ApiState>,
	Path(id): Path<String>,
	payload: Result<Json<RosterEntryRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RosterEntryResponse>), ApiError> {
	let Json(request) = payload.map_err(|_| ApiError::invalid_payload())?;
	let entry = require_entry(&request)?;

	let class_id = parse_class_path(&id)?;
	authorize_class(&state, &ctx, &class_id).await?;

	let student = state
		.roster
		.add_roster_student(&class_id, &entry)
		.await
		.map_err(|e| {
			warn!(class_id = %class_id, error = %e, "roster insert failed");
			ApiError::Internal("L'ajout de l'élève à la liste a échoué.".to_string())
		})?;

	Ok((
		StatusCode::CREATED,
		Json(RosterEntryResponse::from_student(student)),
	))
}

/// `PUT /api/teacher/roster/{id}`
pub async fn update_roster_student(
	RequireAuth(ctx): RequireAuth,
	State(state): State<ApiState>,
	Path(id): Path<String>,
	payload: Result<Json<RosterEntryRequest>, JsonRejection>,
) -> Result<Json<RosterEntryResponse>, ApiError> {
	let Json(request) = payload.map_err(|_| ApiError::invalid_payload())?;
	let entry = require_entry(&request)?;

	let roster_id = Uuid::parse_str(&id)
		.map(RosterId::new)
		.map_err(|_| ApiError::NotFound("Élève introuvable dans la liste.".to_string()))?;
	let existing = authorize_roster_entry(&state, &ctx, &roster_id).await?;

	state
		.roster
		.update_roster_student(&roster_id, &entry)
		.await
		.map_err(|e| {
			warn!(roster_id = %roster_id, error = %e, "roster update failed");
			ApiError::Internal("La mise à jour de l'élève a échoué.".to_string())
		})?;

	Ok(Json(RosterEntryResponse::from_student(RosterStudent {
		first_name: entry.first_name,
		last_name: entry.last_name,
		company: entry.company,
		city: entry.city,
		..existing
	})))
}

/// `DELETE /api/teacher/roster/{id}`
pub async fn remove_roster_student(
	RequireAuth(ctx): RequireAuth,
	State(state): State<ApiState>,
	Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
	let roster_id = Uuid::parse_str(&id)
		.map(RosterId::new)
		.map_err(|_| ApiError::NotFound("Élève introuvable dans la liste.".to_string()))?;
	authorize_roster_entry(&state, &ctx, &roster_id).await?;

	state
		.roster
		.remove_roster_student(&roster_id)
		.await
		.map_err(|e| {
			warn!(roster_id = %roster_id, error = %e, "roster delete failed");
			ApiError::Internal("La suppression de l'élève a échoué.".to_string())
		})?;

	Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/teacher/classes/{id}/roster/import`
pub async fn import_roster(
	RequireAuth(ctx): RequireAuth,
	State(state): State<ApiState>,
	Path(id): Path<String>,
	payload: Result<Json<ImportRosterRequest>, JsonRejection>,
) -> Result<Json<ImportRosterResponse>, ApiError> {
	let Json(request) = payload.map_err(|_| ApiError::invalid_payload())?;

	let class_id = parse_class_path(&id)?;
	let class = authorize_class(&state, &ctx, &class_id).await?;

	// Incomplete rows are dropped, matching the original importer.
	let rows: Vec<NewRosterStudent> = request.rows.iter().filter_map(normalize_entry).collect();

	if rows.is_empty() {
		return Ok(Json(ImportRosterResponse { imported: 0 }));
	}

	let imported = state
		.roster
		.import_roster_rows(&class_id, &rows)
		.await
		.map_err(|e| {
			warn!(class_id = %class_id, error = %e, "roster import failed");
			ApiError::Internal("L'import de la liste a échoué.".to_string())
		})?;

	if let Some(school_id) = class.school_id {
		state.activity.record(
			ActivityEvent::builder(ActivityEventType::RosterImported, ctx.user_id)
				.school(school_id)
				.class(class_id)
				.text(format!("{imported} élèves ont été importés dans la liste."))
				.build(),
		);
	}

	Ok(Json(ImportRosterResponse { imported }))
}
