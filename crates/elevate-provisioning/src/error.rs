// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Workflow error taxonomy.
//!
//! Variants are structural; the HTTP layer maps them to status codes and
//! user-facing sentences. Only [`EnrollError::AccountRejected`] carries
//! provider text through to the caller.

/// Input validation failures, detected before any external call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
	#[error("required fields missing")]
	MissingFields,
	#[error("invalid email address")]
	InvalidEmail,
	#[error("password too short")]
	PasswordTooShort,
	#[error("invalid CEFR level")]
	InvalidLevel,
	#[error("score out of range")]
	ScoreOutOfRange,
}

/// Failures of the enrollment orchestrator.
#[derive(Debug, thiserror::Error)]
pub enum EnrollError {
	/// Input rejected before any side effect.
	#[error("invalid request: {0}")]
	InvalidRequest(ValidationError),

	/// Class not found or not owned by the caller (deliberately
	/// indistinguishable).
	#[error("class not found or access denied")]
	ClassAccessDenied,

	/// The class is archived and rejects new enrollments.
	#[error("class is archived")]
	ClassArchived,

	/// The class has no school and cannot admit students.
	#[error("class has no school")]
	ClassUnaffiliated,

	/// The provider refused to create the account; message surfaced verbatim.
	#[error("account creation rejected: {0}")]
	AccountRejected(String),

	/// The email is registered but the existing identity could not be found
	/// or the lookup failed.
	#[error("existing account could not be reconciled")]
	AccountUnreconciled,

	/// The existing identity was found but its credential reset failed.
	#[error("existing account update failed")]
	AccountUpdateFailed,

	/// The email belongs to a teacher account.
	#[error("email already used by a teacher account")]
	EmailOwnedByTeacher,

	/// Profile upsert failed after identity provisioning.
	#[error("profile setup failed")]
	ProfileSetupFailed,

	/// Membership upsert failed after identity provisioning.
	#[error("membership setup failed")]
	MembershipSetupFailed,

	/// Enrollment upsert failed after identity provisioning.
	#[error("enrollment failed")]
	EnrollmentFailed,
}

/// Failures of the level-update workflow.
#[derive(Debug, thiserror::Error)]
pub enum LevelError {
	#[error("invalid request: {0}")]
	InvalidRequest(ValidationError),

	#[error("class not found or access denied")]
	ClassAccessDenied,

	/// The student has no active enrollment in this class.
	#[error("student not actively enrolled")]
	NotActivelyEnrolled,

	/// The single profile write failed.
	#[error("level update failed")]
	UpdateFailed,
}

/// Failures of the grading workflow.
#[derive(Debug, thiserror::Error)]
pub enum GradeError {
	#[error("invalid request: {0}")]
	InvalidRequest(ValidationError),

	#[error("class not found or access denied")]
	ClassAccessDenied,

	/// No submission with this ID under the authorized class.
	#[error("submission not found")]
	SubmissionNotFound,

	/// The submitting student has no active enrollment in this class.
	#[error("student not actively enrolled")]
	NotActivelyEnrolled,

	/// The single submission write failed.
	#[error("grade update failed")]
	UpdateFailed,
}
