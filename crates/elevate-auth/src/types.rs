// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core type definitions for the Elevate server.
//!
//! This module defines the foundational types used throughout the system:
//!
//! - **ID newtypes**: Type-safe wrappers around UUIDs for different entity
//!   types ([`UserId`], [`ClassId`], [`SchoolId`], etc.) preventing accidental
//!   mixing
//! - **Role enums**: The default role carried on a profile ([`UserRole`]) and
//!   the role/status pair on a school membership ([`MembershipRole`],
//!   [`MembershipStatus`])
//! - **Enrollment status**: Whether a student is active in a class or has
//!   left it ([`EnrollmentStatus`])
//! - **Proficiency levels**: CEFR language levels ([`CefrLevel`])
//!
//! All ID types implement transparent serde serialization (as UUID strings)
//! and provide conversion to/from [`uuid::Uuid`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// =============================================================================
// ID Newtypes
// =============================================================================

macro_rules! define_id_type {
	($name:ident, $doc:expr) => {
		#[doc = $doc]
		#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
		#[serde(transparent)]
		pub struct $name(Uuid);

		impl $name {
			/// Create a new ID from a UUID.
			pub fn new(id: Uuid) -> Self {
				Self(id)
			}

			/// Generate a new random ID.
			pub fn generate() -> Self {
				Self(Uuid::new_v4())
			}

			/// Get the inner UUID value.
			pub fn into_inner(self) -> Uuid {
				self.0
			}

			/// Get a reference to the inner UUID.
			pub fn as_uuid(&self) -> &Uuid {
				&self.0
			}
		}

		impl fmt::Display for $name {
			fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				write!(f, "{}", self.0)
			}
		}

		impl From<Uuid> for $name {
			fn from(id: Uuid) -> Self {
				Self(id)
			}
		}

		impl From<$name> for Uuid {
			fn from(id: $name) -> Self {
				id.0
			}
		}
	};
}

define_id_type!(UserId, "Unique identifier for a user (identity and profile share it).");
define_id_type!(SchoolId, "Unique identifier for a school.");
define_id_type!(ClassId, "Unique identifier for a class.");
define_id_type!(AssignmentId, "Unique identifier for an assignment.");
define_id_type!(SubmissionId, "Unique identifier for a submission.");
define_id_type!(RosterId, "Unique identifier for an offline roster entry.");
define_id_type!(EventId, "Unique identifier for an activity event.");
define_id_type!(SessionId, "Unique identifier for a session.");

// =============================================================================
// User Roles
// =============================================================================

/// The default role carried on a profile.
///
/// A profile's role must never be silently downgraded from `Teacher` to
/// `Student`; the provisioning workflow detects and rejects that case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
	/// A learner enrolled in classes.
	Student,
	/// An instructor owning classes.
	Teacher,
}

impl UserRole {
	/// Returns all available user roles.
	pub fn all() -> &'static [UserRole] {
		&[UserRole::Student, UserRole::Teacher]
	}
}

impl fmt::Display for UserRole {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			UserRole::Student => write!(f, "student"),
			UserRole::Teacher => write!(f, "teacher"),
		}
	}
}

impl FromStr for UserRole {
	type Err = ParseRoleError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"student" => Ok(UserRole::Student),
			"teacher" => Ok(UserRole::Teacher),
			other => Err(ParseRoleError(other.to_string())),
		}
	}
}

/// Error returned when a role string is not recognized.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct ParseRoleError(pub String);

// =============================================================================
// School Memberships
// =============================================================================

/// A member's role within a school.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipRole {
	/// Enrolled learner.
	Student,
	/// Instructor.
	Teacher,
	/// School administrator.
	Admin,
}

impl fmt::Display for MembershipRole {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			MembershipRole::Student => write!(f, "student"),
			MembershipRole::Teacher => write!(f, "teacher"),
			MembershipRole::Admin => write!(f, "admin"),
		}
	}
}

/// Lifecycle status of a school membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipStatus {
	/// The member is active in the school.
	Active,
	/// The member was invited but has not joined.
	Invited,
	/// The member has left the school.
	Left,
}

impl fmt::Display for MembershipStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			MembershipStatus::Active => write!(f, "active"),
			MembershipStatus::Invited => write!(f, "invited"),
			MembershipStatus::Left => write!(f, "left"),
		}
	}
}

// =============================================================================
// Class Enrollments
// =============================================================================

/// Status of a student's enrollment in a class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentStatus {
	/// The student is currently enrolled.
	Active,
	/// The student has left the class (`left_at` records when).
	Left,
}

impl fmt::Display for EnrollmentStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			EnrollmentStatus::Active => write!(f, "active"),
			EnrollmentStatus::Left => write!(f, "left"),
		}
	}
}

// =============================================================================
// CEFR Levels
// =============================================================================

/// CEFR language proficiency levels, a1 through c2.
///
/// Stored and serialized lowercase; parsing is case-insensitive so user
/// input like `"B1"` is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CefrLevel {
	A1,
	A2,
	B1,
	B2,
	C1,
	C2,
}

impl CefrLevel {
	/// Returns all levels in ascending order.
	pub fn all() -> &'static [CefrLevel] {
		&[
			CefrLevel::A1,
			CefrLevel::A2,
			CefrLevel::B1,
			CefrLevel::B2,
			CefrLevel::C1,
			CefrLevel::C2,
		]
	}

	/// The lowercase storage form, e.g. `"b1"`.
	pub fn as_str(&self) -> &'static str {
		match self {
			CefrLevel::A1 => "a1",
			CefrLevel::A2 => "a2",
			CefrLevel::B1 => "b1",
			CefrLevel::B2 => "b2",
			CefrLevel::C1 => "c1",
			CefrLevel::C2 => "c2",
		}
	}

	/// The uppercase display form, e.g. `"B1"`.
	pub fn display_upper(&self) -> String {
		self.as_str().to_uppercase()
	}
}

impl fmt::Display for CefrLevel {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.as_str())
	}
}

impl FromStr for CefrLevel {
	type Err = ParseLevelError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_lowercase().as_str() {
			"a1" => Ok(CefrLevel::A1),
			"a2" => Ok(CefrLevel::A2),
			"b1" => Ok(CefrLevel::B1),
			"b2" => Ok(CefrLevel::B2),
			"c1" => Ok(CefrLevel::C1),
			"c2" => Ok(CefrLevel::C2),
			other => Err(ParseLevelError(other.to_string())),
		}
	}
}

/// Error returned when a CEFR level string is not recognized.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown CEFR level: {0}")]
pub struct ParseLevelError(pub String);

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	mod id_types {
		use super::*;

		#[test]
		fn user_id_roundtrips() {
			let uuid = Uuid::new_v4();
			let user_id = UserId::new(uuid);
			assert_eq!(user_id.into_inner(), uuid);
		}

		#[test]
		fn user_id_generates_unique() {
			let id1 = UserId::generate();
			let id2 = UserId::generate();
			assert_ne!(id1, id2);
		}

		#[test]
		fn user_id_serializes_as_uuid() {
			let uuid = Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").unwrap();
			let user_id = UserId::new(uuid);
			let json = serde_json::to_string(&user_id).unwrap();
			assert_eq!(json, "\"550e8400-e29b-41d4-a716-446655440000\"");
		}

		#[test]
		fn class_id_deserializes_from_uuid() {
			let json = "\"550e8400-e29b-41d4-a716-446655440000\"";
			let class_id: ClassId = serde_json::from_str(json).unwrap();
			assert_eq!(
				class_id.into_inner(),
				Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").unwrap()
			);
		}

		proptest! {
				#[test]
				fn user_id_roundtrip_any_uuid(
						a: u128
				) {
						let uuid = Uuid::from_u128(a);
						let user_id = UserId::new(uuid);
						prop_assert_eq!(user_id.into_inner(), uuid);
						prop_assert_eq!(Uuid::from(user_id), uuid);
				}

				#[test]
				fn school_id_roundtrip_any_uuid(
						a: u128
				) {
						let uuid = Uuid::from_u128(a);
						let school_id = SchoolId::new(uuid);
						prop_assert_eq!(school_id.into_inner(), uuid);
				}

				#[test]
				fn class_id_serde_roundtrip(
						a: u128
				) {
						let uuid = Uuid::from_u128(a);
						let class_id = ClassId::new(uuid);
						let json = serde_json::to_string(&class_id).unwrap();
						let deserialized: ClassId = serde_json::from_str(&json).unwrap();
						prop_assert_eq!(class_id, deserialized);
				}

				#[test]
				fn user_id_display_matches_uuid(
						a: u128
				) {
						let uuid = Uuid::from_u128(a);
						let user_id = UserId::new(uuid);
						prop_assert_eq!(user_id.to_string(), uuid.to_string());
				}
		}
	}

	mod roles {
		use super::*;

		#[test]
		fn user_role_parses_storage_form() {
			assert_eq!("student".parse::<UserRole>().unwrap(), UserRole::Student);
			assert_eq!("teacher".parse::<UserRole>().unwrap(), UserRole::Teacher);
			assert!("admin".parse::<UserRole>().is_err());
		}

		#[test]
		fn user_role_serializes_snake_case() {
			let json = serde_json::to_string(&UserRole::Teacher).unwrap();
			assert_eq!(json, "\"teacher\"");
		}

		#[test]
		fn membership_status_display() {
			assert_eq!(MembershipStatus::Active.to_string(), "active");
			assert_eq!(MembershipStatus::Left.to_string(), "left");
		}

		#[test]
		fn enrollment_status_display() {
			assert_eq!(EnrollmentStatus::Active.to_string(), "active");
			assert_eq!(EnrollmentStatus::Left.to_string(), "left");
		}
	}

	mod cefr {
		use super::*;

		#[test]
		fn parses_case_insensitive() {
			assert_eq!("b1".parse::<CefrLevel>().unwrap(), CefrLevel::B1);
			assert_eq!("B1".parse::<CefrLevel>().unwrap(), CefrLevel::B1);
			assert_eq!("c2".parse::<CefrLevel>().unwrap(), CefrLevel::C2);
		}

		#[test]
		fn rejects_unknown_levels() {
			assert!("d1".parse::<CefrLevel>().is_err());
			assert!("".parse::<CefrLevel>().is_err());
			assert!("b3".parse::<CefrLevel>().is_err());
		}

		#[test]
		fn display_is_lowercase_storage_form() {
			assert_eq!(CefrLevel::A1.to_string(), "a1");
			assert_eq!(CefrLevel::C2.to_string(), "c2");
		}

		#[test]
		fn display_upper_matches_user_facing_form() {
			assert_eq!(CefrLevel::B2.display_upper(), "B2");
		}

		#[test]
		fn levels_are_ordered() {
			assert!(CefrLevel::A1 < CefrLevel::A2);
			assert!(CefrLevel::B2 < CefrLevel::C1);
		}

		proptest! {
			#[test]
			fn all_levels_roundtrip_through_parse(idx in 0usize..6) {
				let level = CefrLevel::all()[idx];
				let parsed: CefrLevel = level.as_str().parse().unwrap();
				prop_assert_eq!(level, parsed);
				let parsed_upper: CefrLevel = level.display_upper().parse().unwrap();
				prop_assert_eq!(level, parsed_upper);
			}
		}
	}
}
