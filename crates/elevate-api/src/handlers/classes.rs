// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Class management endpoints.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use elevate_activity::{ActivityEvent, ActivityEventType};
use elevate_auth::{AuthContext, CefrLevel, ClassId, SchoolId};
use elevate_db::{Class, ClassUpdate, NewClass};

use crate::auth::RequireAuth;
use crate::error::ApiError;
use crate::state::ApiState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateClassRequest {
	#[serde(default)]
	pub name: String,
	#[serde(default)]
	pub level: String,
	#[serde(default)]
	pub academic_year: Option<String>,
	#[serde(default)]
	pub class_code: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassResponse {
	pub id: String,
	pub name: String,
	/// Uppercase user-facing form, e.g. `"B1"`.
	pub level: String,
	pub class_code: Option<String>,
	pub academic_year: Option<String>,
	pub archived_at: Option<String>,
	pub school_id: Option<String>,
}

impl ClassResponse {
	fn from_class(class: Class) -> Self {
		Self {
			id: class.id.to_string(),
			name: class.name,
			level: class
				.cefr_level
				.map(|l| l.display_upper())
				.unwrap_or_else(|| "B1".to_string()),
			class_code: class.class_code,
			academic_year: class.academic_year,
			archived_at: class.archived_at.map(|d| d.to_rfc3339()),
			school_id: class.school_id.map(|s| s.to_string()),
		}
	}
}

/// Derive a class code from the class name plus a short random suffix.
fn generate_class_code(name: &str) -> String {
	let initials: String = name
		.split_whitespace()
		.filter_map(|word| word.chars().next())
		.take(3)
		.collect::<String>()
		.to_uppercase();
	let prefix = if initials.is_empty() {
		"CLS".to_string()
	} else {
		initials
	};
	let suffix = Uuid::new_v4().simple().to_string()[..4].to_uppercase();
	format!("{prefix}-{suffix}")
}

struct ValidatedClassFields {
	name: String,
	level: CefrLevel,
	class_code: Option<String>,
	academic_year: Option<String>,
}

fn validate_class_fields(
	name: &str,
	level: &str,
	class_code: Option<&str>,
	academic_year: Option<&str>,
) -> Result<ValidatedClassFields, ApiError> {
	let name = name.trim().to_string();
	if name.is_empty() {
		return Err(ApiError::BadRequest(
			"Le nom de la classe est obligatoire.".to_string(),
		));
	}

	let level = level
		.trim()
		.parse::<CefrLevel>()
		.map_err(|_| ApiError::BadRequest("Niveau CECRL invalide.".to_string()))?;

	let class_code = class_code
		.map(str::trim)
		.filter(|c| !c.is_empty())
		.map(|c| c.to_uppercase());
	let academic_year = academic_year
		.map(str::trim)
		.filter(|y| !y.is_empty())
		.map(str::to_string);

	Ok(ValidatedClassFields {
		name,
		level,
		class_code,
		academic_year,
	})
}

/// The caller's active school, best-effort.
async fn caller_school(state: &ApiState, ctx: &AuthContext) -> Option<SchoolId> {
	match state.profiles.get_profile(&ctx.user_id).await {
		Ok(Some(profile)) => profile.active_school_id,
		Ok(None) => None,
		Err(e) => {
			warn!(user_id = %ctx.user_id, error = %e, "caller profile lookup failed");
			None
		}
	}
}

fn parse_class_path(id: &str) -> Result<ClassId, ApiError> {
	Uuid::parse_str(id)
		.map(ClassId::new)
		.map_err(|_| ApiError::class_access_denied())
}

/// Resolve the class and require ownership by the caller.
async fn authorize_class(
	state: &ApiState,
	ctx: &AuthContext,
	class_id: &ClassId,
) -> Result<Class, ApiError> {
	match state.classes.get_class_for_teacher(class_id, &ctx.user_id).await {
		Ok(Some(class)) => Ok(class),
		Ok(None) => Err(ApiError::class_access_denied()),
		Err(e) => {
			warn!(class_id = %class_id, error = %e, "class lookup failed");
			Err(ApiError::class_access_denied())
		}
	}
}

/// `POST /api/teacher/classes`
pub async fn create_class(
	RequireAuth(ctx): RequireAuth,
	State(state): State<ApiState>,
	payload: Result<Json<CreateClassRequest>, JsonRejection>,
) -> Result<Json<ClassResponse>, ApiError> {
	let Json(request) = payload.map_err(|_| ApiError::invalid_payload())?;
	let fields = validate_class_fields(
		&request.name,
		&request.level,
		request.class_code.as_deref(),
		request.academic_year.as_deref(),
	)?;

	let school_id = caller_school(&state, &ctx).await;
	let class_code = fields
		.class_code
		.unwrap_or_else(|| generate_class_code(&fields.name));

	let class = state
		.classes
		.create_class(&NewClass {
			school_id,
			teacher_id: ctx.user_id,
			name: fields.name.clone(),
			cefr_level: fields.level,
			class_code: Some(class_code),
			academic_year: fields.academic_year,
		})
		.await
		.map_err(|e| {
			warn!(error = %e, "class creation failed");
			ApiError::Internal("La création de la classe a échoué.".to_string())
		})?;

	if let Some(school_id) = school_id {
		state.activity.record(
			ActivityEvent::builder(ActivityEventType::ClassCreated, ctx.user_id)
				.school(school_id)
				.class(class.id)
				.text(format!("La classe {} a été créée.", fields.name))
				.build(),
		);
	}

	Ok(Json(ClassResponse::from_class(class)))
}

/// `PUT /api/teacher/classes/{id}`
pub async fn update_class(
	RequireAuth(ctx): RequireAuth,
	State(state): State<ApiState>,
	Path(id): Path<String>,
	payload: Result<Json<CreateClassRequest>, JsonRejection>,
) -> Result<Json<ClassResponse>, ApiError> {
	let Json(request) = payload.map_err(|_| ApiError::invalid_payload())?;
	let fields = validate_class_fields(
		&request.name,
		&request.level,
		request.class_code.as_deref(),
		request.academic_year.as_deref(),
	)?;

	let class_id = parse_class_path(&id)?;
	let class = authorize_class(&state, &ctx, &class_id).await?;

	let update = ClassUpdate {
		name: fields.name,
		cefr_level: fields.level,
		class_code: fields.class_code,
		academic_year: fields.academic_year,
	};
	state.classes.update_class(&class_id, &update).await.map_err(|e| {
		warn!(class_id = %class_id, error = %e, "class update failed");
		ApiError::Internal("La mise à jour de la classe a échoué.".to_string())
	})?;

	Ok(Json(ClassResponse::from_class(Class {
		name: update.name,
		cefr_level: Some(update.cefr_level),
		class_code: update.class_code,
		academic_year: update.academic_year,
		..class
	})))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListClassesQuery {
	#[serde(default)]
	pub include_archived: bool,
}

#[derive(Debug, Serialize)]
pub struct ListClassesResponse {
	pub classes: Vec<ClassResponse>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassDetailResponse {
	pub class: ClassResponse,
	pub roster: Vec<crate::handlers::roster::RosterEntryResponse>,
	pub active_students: usize,
}

/// `GET /api/teacher/classes`
pub async fn list_classes(
	RequireAuth(ctx): RequireAuth,
	State(state): State<ApiState>,
	Query(query): Query<ListClassesQuery>,
) -> Result<Json<ListClassesResponse>, ApiError> {
	let classes = state
		.classes
		.list_classes_for_teacher(&ctx.user_id, query.include_archived)
		.await
		.map_err(|e| {
			warn!(user_id = %ctx.user_id, error = %e, "class list failed");
			ApiError::Internal("Le chargement des classes a échoué.".to_string())
		})?;

	Ok(Json(ListClassesResponse {
		classes: classes.into_iter().map(ClassResponse::from_class).collect(),
	}))
}

/// `GET /api/teacher/classes/{id}`
pub async fn class_detail(
	RequireAuth(ctx): RequireAuth,
	State(state): State<ApiState>,
	Path(id): Path<String>,
) -> Result<Json<ClassDetailResponse>, ApiError> {
	let class_id = parse_class_path(&id)?;
	let class = authorize_class(&state, &ctx, &class_id).await?;

	let roster = state.roster.list_roster(&class_id).await.map_err(|e| {
		warn!(class_id = %class_id, error = %e, "roster list failed");
		ApiError::Internal("Le chargement de la liste a échoué.".to_string())
	})?;

	let enrollments = state
		.enrollments
		.list_active_enrollments(&class_id)
		.await
		.map_err(|e| {
			warn!(class_id = %class_id, error = %e, "enrollment list failed");
			ApiError::Internal("Le chargement des inscriptions a échoué.".to_string())
		})?;

	Ok(Json(ClassDetailResponse {
		class: ClassResponse::from_class(class),
		roster: roster
			.into_iter()
			.map(crate::handlers::roster::RosterEntryResponse::from_student)
			.collect(),
		active_students: enrollments.len(),
	}))
}

/// `POST /api/teacher/classes/{id}/archive`
pub async fn archive_class(
	RequireAuth(ctx): RequireAuth,
	State(state): State<ApiState>,
	Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
	let class_id = parse_class_path(&id)?;
	let class = authorize_class(&state, &ctx, &class_id).await?;

	state.classes.archive_class(&class_id).await.map_err(|e| {
		warn!(class_id = %class_id, error = %e, "class archive failed");
		ApiError::Internal("L'archivage de la classe a échoué.".to_string())
	})?;

	if let Some(school_id) = class.school_id {
		state.activity.record(
			ActivityEvent::builder(ActivityEventType::ClassArchived, ctx.user_id)
				.school(school_id)
				.class(class_id)
				.text(format!("La classe {} a été archivée.", class.name))
				.build(),
		);
	}

	Ok(Json(serde_json::json!({ "archived": true })))
}

/// `POST /api/teacher/classes/{id}/unarchive`
pub async fn unarchive_class(
	RequireAuth(ctx): RequireAuth,
	State(state): State<ApiState>,
	Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
	let class_id = parse_class_path(&id)?;
	let class = authorize_class(&state, &ctx, &class_id).await?;

	state.classes.unarchive_class(&class_id).await.map_err(|e| {
		warn!(class_id = %class_id, error = %e, "class unarchive failed");
		ApiError::Internal("La restauration de la classe a échoué.".to_string())
	})?;

	if let Some(school_id) = class.school_id {
		state.activity.record(
			ActivityEvent::builder(ActivityEventType::ClassUnarchived, ctx.user_id)
				.school(school_id)
				.class(class_id)
				.text(format!("La classe {} a été restaurée.", class.name))
				.build(),
		);
	}

	Ok(Json(serde_json::json!({ "archived": false })))
}
