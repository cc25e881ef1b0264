// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Activity event types.
//!
//! Events feed the school activity timeline. They are advisory: the core
//! workflows append them after the fact and never read them back.

use serde::{Deserialize, Serialize};
use std::fmt;

use elevate_auth::{ClassId, SchoolId, UserId};

/// Types of events shown on the activity timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityEventType {
	/// Student milestones: enrollment, level changes.
	Milestone,
	/// A class was created.
	ClassCreated,
	/// A class was archived.
	ClassArchived,
	/// An archived class was restored.
	ClassUnarchived,
	/// A submission was graded.
	SubmissionGraded,
	/// Roster rows were imported.
	RosterImported,
}

impl ActivityEventType {
	/// The storage form, e.g. `"milestone"`.
	pub fn as_str(&self) -> &'static str {
		match self {
			ActivityEventType::Milestone => "milestone",
			ActivityEventType::ClassCreated => "class_created",
			ActivityEventType::ClassArchived => "class_archived",
			ActivityEventType::ClassUnarchived => "class_unarchived",
			ActivityEventType::SubmissionGraded => "submission_graded",
			ActivityEventType::RosterImported => "roster_imported",
		}
	}
}

impl fmt::Display for ActivityEventType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.as_str())
	}
}

/// A complete activity event ready to record.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityEvent {
	pub event_type: ActivityEventType,
	pub school_id: Option<SchoolId>,
	pub class_id: Option<ClassId>,
	pub actor_id: UserId,
	pub target_user_id: Option<UserId>,
	/// Human-readable timeline sentence carried in the payload.
	pub text: String,
}

impl ActivityEvent {
	/// Start building an event of the given type for the given actor.
	pub fn builder(event_type: ActivityEventType, actor_id: UserId) -> ActivityEventBuilder {
		ActivityEventBuilder {
			event: ActivityEvent {
				event_type,
				school_id: None,
				class_id: None,
				actor_id,
				target_user_id: None,
				text: String::new(),
			},
		}
	}
}

/// Fluent builder for [`ActivityEvent`].
#[derive(Debug)]
pub struct ActivityEventBuilder {
	event: ActivityEvent,
}

impl ActivityEventBuilder {
	pub fn school(mut self, school_id: SchoolId) -> Self {
		self.event.school_id = Some(school_id);
		self
	}

	pub fn maybe_school(mut self, school_id: Option<SchoolId>) -> Self {
		self.event.school_id = school_id;
		self
	}

	pub fn class(mut self, class_id: ClassId) -> Self {
		self.event.class_id = Some(class_id);
		self
	}

	pub fn target(mut self, target_user_id: UserId) -> Self {
		self.event.target_user_id = Some(target_user_id);
		self
	}

	pub fn text(mut self, text: impl Into<String>) -> Self {
		self.event.text = text.into();
		self
	}

	pub fn build(self) -> ActivityEvent {
		self.event
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn builder_fills_fields() {
		let actor = UserId::generate();
		let school = SchoolId::generate();
		let class = ClassId::generate();
		let target = UserId::generate();

		let event = ActivityEvent::builder(ActivityEventType::Milestone, actor)
			.school(school)
			.class(class)
			.target(target)
			.text("Un élève a été inscrit.")
			.build();

		assert_eq!(event.event_type, ActivityEventType::Milestone);
		assert_eq!(event.school_id, Some(school));
		assert_eq!(event.class_id, Some(class));
		assert_eq!(event.target_user_id, Some(target));
		assert_eq!(event.text, "Un élève a été inscrit.");
	}

	#[test]
	fn event_type_storage_form_is_snake_case() {
		assert_eq!(ActivityEventType::Milestone.as_str(), "milestone");
		assert_eq!(
			ActivityEventType::SubmissionGraded.as_str(),
			"submission_graded"
		);
	}
}
