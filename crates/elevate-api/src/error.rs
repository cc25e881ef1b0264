// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! API error type and its HTTP mapping.
//!
//! All user-facing messages are single French sentences; raw provider or
//! database errors never reach a 500 body. The only pass-through text is
//! the identity provider's refusal message on a 400, matching the original
//! behavior of the enroll endpoint.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use elevate_provisioning::{EnrollError, GradeError, LevelError, ValidationError};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
	#[error("unauthorized")]
	Unauthorized,
	#[error("forbidden: {0}")]
	Forbidden(String),
	#[error("bad request: {0}")]
	BadRequest(String),
	#[error("not found: {0}")]
	NotFound(String),
	#[error("internal error: {0}")]
	Internal(String),
}

impl ApiError {
	/// 400 with the fixed malformed-payload sentence.
	pub fn invalid_payload() -> Self {
		ApiError::BadRequest("Charge utile de requête invalide.".to_string())
	}

	/// 403 with the fixed class-access sentence (deliberately identical for
	/// "missing" and "foreign" classes).
	pub fn class_access_denied() -> Self {
		ApiError::Forbidden("Classe introuvable ou accès refusé.".to_string())
	}
}

/// JSON body `{ "error": "..." }` for all failures.
#[derive(Debug, Serialize)]
struct ErrorBody {
	error: String,
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let (status, message) = match self {
			ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "Non autorisé.".to_string()),
			ApiError::Forbidden(message) => (StatusCode::FORBIDDEN, message),
			ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
			ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message),
			ApiError::Internal(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
		};

		(status, Json(ErrorBody { error: message })).into_response()
	}
}

impl From<EnrollError> for ApiError {
	fn from(e: EnrollError) -> Self {
		match e {
			EnrollError::InvalidRequest(ValidationError::MissingFields) => ApiError::BadRequest(
				"Le nom complet, l'e-mail, le mot de passe et la classe sont obligatoires."
					.to_string(),
			),
			EnrollError::InvalidRequest(ValidationError::InvalidEmail) => {
				ApiError::BadRequest("Veuillez saisir une adresse e-mail valide.".to_string())
			}
			EnrollError::InvalidRequest(ValidationError::PasswordTooShort) => ApiError::BadRequest(
				"Le mot de passe doit contenir au moins 8 caractères.".to_string(),
			),
			EnrollError::InvalidRequest(_) => ApiError::invalid_payload(),
			EnrollError::ClassAccessDenied => ApiError::class_access_denied(),
			EnrollError::ClassArchived => ApiError::BadRequest(
				"Impossible d'inscrire des élèves dans une classe archivée.".to_string(),
			),
			EnrollError::ClassUnaffiliated => ApiError::BadRequest(
				"La classe doit appartenir à un établissement actif.".to_string(),
			),
			EnrollError::AccountRejected(message) => {
				if message.is_empty() {
					ApiError::BadRequest("Impossible de créer le compte élève.".to_string())
				} else {
					ApiError::BadRequest(message)
				}
			}
			EnrollError::AccountUnreconciled => ApiError::BadRequest(
				"Un compte avec cet e-mail existe déjà, mais nous n'avons pas pu le mettre à jour."
					.to_string(),
			),
			EnrollError::AccountUpdateFailed => ApiError::BadRequest(
				"Compte existant détecté, mais la mise à jour du mot de passe a échoué."
					.to_string(),
			),
			EnrollError::EmailOwnedByTeacher => ApiError::BadRequest(
				"Cet e-mail est déjà utilisé par un compte enseignant.".to_string(),
			),
			EnrollError::ProfileSetupFailed => ApiError::Internal(
				"La configuration du profil élève a échoué.".to_string(),
			),
			EnrollError::MembershipSetupFailed => ApiError::Internal(
				"La configuration de l'adhésion élève a échoué.".to_string(),
			),
			EnrollError::EnrollmentFailed => {
				ApiError::Internal("L'inscription de l'élève a échoué.".to_string())
			}
		}
	}
}

impl From<LevelError> for ApiError {
	fn from(e: LevelError) -> Self {
		match e {
			LevelError::InvalidRequest(ValidationError::MissingFields) => ApiError::BadRequest(
				"La classe, l'élève et le niveau sont obligatoires.".to_string(),
			),
			LevelError::InvalidRequest(ValidationError::InvalidLevel) => {
				ApiError::BadRequest("Niveau CECRL invalide.".to_string())
			}
			LevelError::InvalidRequest(_) => ApiError::invalid_payload(),
			LevelError::ClassAccessDenied => ApiError::class_access_denied(),
			LevelError::NotActivelyEnrolled => ApiError::BadRequest(
				"Cet élève n'est pas inscrit activement dans cette classe.".to_string(),
			),
			LevelError::UpdateFailed => ApiError::Internal(
				"La mise à jour du niveau élève a échoué.".to_string(),
			),
		}
	}
}

impl From<GradeError> for ApiError {
	fn from(e: GradeError) -> Self {
		match e {
			GradeError::InvalidRequest(ValidationError::MissingFields) => ApiError::BadRequest(
				"La classe et la soumission sont obligatoires.".to_string(),
			),
			GradeError::InvalidRequest(ValidationError::ScoreOutOfRange) => ApiError::BadRequest(
				"La note doit être comprise entre 0 et 100.".to_string(),
			),
			GradeError::InvalidRequest(_) => ApiError::invalid_payload(),
			GradeError::ClassAccessDenied => ApiError::class_access_denied(),
			GradeError::SubmissionNotFound => {
				ApiError::BadRequest("Soumission introuvable.".to_string())
			}
			GradeError::NotActivelyEnrolled => ApiError::BadRequest(
				"Cet élève n'est pas inscrit activement dans cette classe.".to_string(),
			),
			GradeError::UpdateFailed => {
				ApiError::Internal("La mise à jour de la note a échoué.".to_string())
			}
		}
	}
}
