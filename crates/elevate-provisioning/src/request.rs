// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Typed workflow requests and their validation.
//!
//! Validation runs before any external call: fields are trimmed, required
//! fields checked, the email must contain `@`, the password must be at
//! least eight characters. IDs stay strings here; resolving them against
//! the database is the authorization step's job.

use serde::Deserialize;

use elevate_auth::CefrLevel;

use crate::error::ValidationError;

const MIN_PASSWORD_LEN: usize = 8;

/// Raw enroll-student request as received from the HTTP layer.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollStudentRequest {
	#[serde(default)]
	pub full_name: String,
	#[serde(default)]
	pub email: String,
	#[serde(default)]
	pub password: String,
	#[serde(default)]
	pub class_id: String,
}

/// Enrollment input after validation: trimmed, email lowercased.
#[derive(Debug, Clone)]
pub struct ValidatedEnrollment {
	pub full_name: String,
	pub email: String,
	pub password: String,
	pub class_id: String,
}

impl EnrollStudentRequest {
	/// Validate and normalize the request.
	pub fn validate(&self) -> Result<ValidatedEnrollment, ValidationError> {
		let full_name = self.full_name.trim().to_string();
		let email = self.email.trim().to_lowercase();
		let password = self.password.trim().to_string();
		let class_id = self.class_id.trim().to_string();

		if full_name.is_empty() || email.is_empty() || password.is_empty() || class_id.is_empty() {
			return Err(ValidationError::MissingFields);
		}

		if !email.contains('@') {
			return Err(ValidationError::InvalidEmail);
		}

		if password.len() < MIN_PASSWORD_LEN {
			return Err(ValidationError::PasswordTooShort);
		}

		Ok(ValidatedEnrollment {
			full_name,
			email,
			password,
			class_id,
		})
	}
}

/// Raw update-student-level request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLevelRequest {
	#[serde(default)]
	pub class_id: String,
	#[serde(default)]
	pub student_id: String,
	#[serde(default)]
	pub cefr_level: String,
}

/// Level-update input after validation.
#[derive(Debug, Clone)]
pub struct ValidatedLevelUpdate {
	pub class_id: String,
	pub student_id: String,
	pub cefr_level: CefrLevel,
}

impl UpdateLevelRequest {
	/// Validate and normalize the request.
	pub fn validate(&self) -> Result<ValidatedLevelUpdate, ValidationError> {
		let class_id = self.class_id.trim().to_string();
		let student_id = self.student_id.trim().to_string();
		let level_raw = self.cefr_level.trim().to_lowercase();

		if class_id.is_empty() || student_id.is_empty() || level_raw.is_empty() {
			return Err(ValidationError::MissingFields);
		}

		let cefr_level = level_raw
			.parse::<CefrLevel>()
			.map_err(|_| ValidationError::InvalidLevel)?;

		Ok(ValidatedLevelUpdate {
			class_id,
			student_id,
			cefr_level,
		})
	}
}

/// Raw grade-submission request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeSubmissionRequest {
	#[serde(default)]
	pub class_id: String,
	#[serde(default)]
	pub submission_id: String,
	pub score: i64,
	#[serde(default)]
	pub feedback: Option<String>,
}

/// Grading input after validation.
#[derive(Debug, Clone)]
pub struct ValidatedGrade {
	pub class_id: String,
	pub submission_id: String,
	pub score: i64,
	pub feedback: Option<String>,
}

impl GradeSubmissionRequest {
	/// Validate and normalize the request. Scores live in `[0, 100]`.
	pub fn validate(&self) -> Result<ValidatedGrade, ValidationError> {
		let class_id = self.class_id.trim().to_string();
		let submission_id = self.submission_id.trim().to_string();

		if class_id.is_empty() || submission_id.is_empty() {
			return Err(ValidationError::MissingFields);
		}

		if !(0..=100).contains(&self.score) {
			return Err(ValidationError::ScoreOutOfRange);
		}

		let feedback = self
			.feedback
			.as_deref()
			.map(str::trim)
			.filter(|f| !f.is_empty())
			.map(str::to_string);

		Ok(ValidatedGrade {
			class_id,
			submission_id,
			score: self.score,
			feedback,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	fn enroll_request(full_name: &str, email: &str, password: &str, class_id: &str) -> EnrollStudentRequest {
		EnrollStudentRequest {
			full_name: full_name.to_string(),
			email: email.to_string(),
			password: password.to_string(),
			class_id: class_id.to_string(),
		}
	}

	#[test]
	fn accepts_and_normalizes_valid_input() {
		let request = enroll_request("  Amélie Durand ", " Amelie@Example.COM ", "motdepasse", "abc");
		let validated = request.validate().unwrap();
		assert_eq!(validated.full_name, "Amélie Durand");
		assert_eq!(validated.email, "amelie@example.com");
	}

	#[test]
	fn rejects_missing_fields() {
		for request in [
			enroll_request("", "a@b.c", "motdepasse", "abc"),
			enroll_request("Nom", "", "motdepasse", "abc"),
			enroll_request("Nom", "a@b.c", "", "abc"),
			enroll_request("Nom", "a@b.c", "motdepasse", ""),
			enroll_request("   ", "a@b.c", "motdepasse", "abc"),
		] {
			assert_eq!(request.validate().unwrap_err(), ValidationError::MissingFields);
		}
	}

	#[test]
	fn rejects_email_without_at() {
		let request = enroll_request("Nom", "pas-un-email", "motdepasse", "abc");
		assert_eq!(request.validate().unwrap_err(), ValidationError::InvalidEmail);
	}

	#[test]
	fn password_boundary_is_eight() {
		let seven = enroll_request("Nom", "a@b.c", "1234567", "abc");
		assert_eq!(seven.validate().unwrap_err(), ValidationError::PasswordTooShort);

		let eight = enroll_request("Nom", "a@b.c", "12345678", "abc");
		assert!(eight.validate().is_ok());
	}

	#[test]
	fn level_request_parses_case_insensitive() {
		let request = UpdateLevelRequest {
			class_id: "c".to_string(),
			student_id: "s".to_string(),
			cefr_level: " B2 ".to_string(),
		};
		assert_eq!(request.validate().unwrap().cefr_level, CefrLevel::B2);
	}

	#[test]
	fn level_request_rejects_unknown_level() {
		let request = UpdateLevelRequest {
			class_id: "c".to_string(),
			student_id: "s".to_string(),
			cefr_level: "d1".to_string(),
		};
		assert_eq!(request.validate().unwrap_err(), ValidationError::InvalidLevel);
	}

	#[test]
	fn grade_request_bounds_score() {
		let base = GradeSubmissionRequest {
			class_id: "c".to_string(),
			submission_id: "s".to_string(),
			score: 0,
			feedback: None,
		};

		assert!(base.validate().is_ok());
		assert!(GradeSubmissionRequest { score: 100, ..base.clone() }.validate().is_ok());
		assert_eq!(
			GradeSubmissionRequest { score: 101, ..base.clone() }.validate().unwrap_err(),
			ValidationError::ScoreOutOfRange
		);
		assert_eq!(
			GradeSubmissionRequest { score: -1, ..base }.validate().unwrap_err(),
			ValidationError::ScoreOutOfRange
		);
	}

	#[test]
	fn grade_request_drops_blank_feedback() {
		let request = GradeSubmissionRequest {
			class_id: "c".to_string(),
			submission_id: "s".to_string(),
			score: 50,
			feedback: Some("   ".to_string()),
		};
		assert_eq!(request.validate().unwrap().feedback, None);
	}

	proptest! {
		#[test]
		fn passwords_shorter_than_eight_never_pass(len in 0usize..8) {
			let password = "x".repeat(len);
			let request = enroll_request("Nom", "a@b.c", &password, "abc");
			prop_assert!(request.validate().is_err());
		}

		#[test]
		fn passwords_of_eight_or_more_pass(len in 8usize..64) {
			let password = "x".repeat(len);
			let request = enroll_request("Nom", "a@b.c", &password, "abc");
			prop_assert!(request.validate().is_ok());
		}
	}
}
