// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! CEFR level updates.
//!
//! Single durable write per call, so no rollback machinery: authorize the
//! class, require an active enrollment, update the profile, append a
//! best-effort activity event.

use std::sync::Arc;

use uuid::Uuid;

use elevate_activity::{ActivityEvent, ActivityEventType, ActivityRecorder};
use elevate_auth::{AuthContext, CefrLevel, ClassId, UserId};
use elevate_db::{ClassStore, EnrollmentStore, ProfileStore};

use crate::error::LevelError;
use crate::request::UpdateLevelRequest;

/// Successful level update.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelOutcome {
	pub student_id: UserId,
	pub class_id: ClassId,
	pub cefr_level: CefrLevel,
}

/// The level-update workflow.
#[derive(Clone)]
pub struct LevelService {
	classes: Arc<dyn ClassStore>,
	enrollments: Arc<dyn EnrollmentStore>,
	profiles: Arc<dyn ProfileStore>,
	activity: Arc<ActivityRecorder>,
}

impl LevelService {
	pub fn new(
		classes: Arc<dyn ClassStore>,
		enrollments: Arc<dyn EnrollmentStore>,
		profiles: Arc<dyn ProfileStore>,
		activity: Arc<ActivityRecorder>,
	) -> Self {
		Self {
			classes,
			enrollments,
			profiles,
			activity,
		}
	}

	/// Update a student's CEFR level.
	#[tracing::instrument(skip(self, ctx, request), fields(teacher_id = %ctx.user_id))]
	pub async fn update_student_level(
		&self,
		ctx: &AuthContext,
		request: &UpdateLevelRequest,
	) -> Result<LevelOutcome, LevelError> {
		let input = request.validate().map_err(LevelError::InvalidRequest)?;

		let Ok(class_id) = Uuid::parse_str(&input.class_id).map(ClassId::new) else {
			return Err(LevelError::ClassAccessDenied);
		};
		let Ok(student_id) = Uuid::parse_str(&input.student_id).map(UserId::new) else {
			return Err(LevelError::NotActivelyEnrolled);
		};

		let class = match self.classes.get_class_for_teacher(&class_id, &ctx.user_id).await {
			Ok(Some(class)) => class,
			Ok(None) => return Err(LevelError::ClassAccessDenied),
			Err(e) => {
				tracing::error!(class_id = %class_id, error = %e, "class lookup failed");
				return Err(LevelError::ClassAccessDenied);
			}
		};

		match self
			.enrollments
			.get_active_enrollment(&class_id, &student_id)
			.await
		{
			Ok(Some(_)) => {}
			Ok(None) => return Err(LevelError::NotActivelyEnrolled),
			Err(e) => {
				tracing::error!(class_id = %class_id, student_id = %student_id, error = %e, "enrollment lookup failed");
				return Err(LevelError::NotActivelyEnrolled);
			}
		}

		if let Err(e) = self
			.profiles
			.update_cefr_level(&student_id, input.cefr_level)
			.await
		{
			tracing::error!(student_id = %student_id, error = %e, "level update failed");
			return Err(LevelError::UpdateFailed);
		}

		// The original only timelines level changes for school-affiliated
		// classes.
		if let Some(school_id) = class.school_id {
			self.activity.record(
				ActivityEvent::builder(ActivityEventType::Milestone, ctx.user_id)
					.school(school_id)
					.class(class_id)
					.target(student_id)
					.text(format!(
						"Niveau CECRL mis à jour vers {}.",
						input.cefr_level.display_upper()
					))
					.build(),
			);
		}

		tracing::info!(student_id = %student_id, level = %input.cefr_level, "student level updated");

		Ok(LevelOutcome {
			student_id,
			class_id,
			cefr_level: input.cefr_level,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use sqlx::sqlite::SqlitePool;

	use elevate_auth::{SchoolId, SessionId};
	use elevate_db::testing::{create_migrated_test_pool, insert_test_class, insert_test_school};
	use elevate_db::{
		ActivityEventRepository, ClassRepository, EnrollmentRepository, ProfileRepository,
		StudentProfileUpsert,
	};

	struct Harness {
		pool: SqlitePool,
		school_id: SchoolId,
		teacher_id: UserId,
		class_id: ClassId,
		student_id: UserId,
	}

	impl Harness {
		async fn new() -> Self {
			let pool = create_migrated_test_pool().await;
			let school_id = insert_test_school(&pool, "École").await;
			let teacher_id = UserId::generate();
			let class_id = insert_test_class(&pool, Some(&school_id), &teacher_id, "B1").await;
			let student_id = UserId::generate();

			ProfileRepository::new(pool.clone())
				.upsert_student_profile(&StudentProfileUpsert {
					id: student_id,
					full_name: "Lina Dubois".to_string(),
					school_id,
				})
				.await
				.unwrap();
			EnrollmentRepository::new(pool.clone())
				.upsert_active_enrollment(&class_id, &student_id)
				.await
				.unwrap();

			Self {
				pool,
				school_id,
				teacher_id,
				class_id,
				student_id,
			}
		}

		fn service(&self) -> LevelService {
			LevelService::new(
				Arc::new(ClassRepository::new(self.pool.clone())),
				Arc::new(EnrollmentRepository::new(self.pool.clone())),
				Arc::new(ProfileRepository::new(self.pool.clone())),
				Arc::new(ActivityRecorder::new(Arc::new(ActivityEventRepository::new(
					self.pool.clone(),
				)))),
			)
		}

		fn ctx(&self) -> AuthContext {
			AuthContext::new(self.teacher_id, SessionId::generate())
		}

		fn request(&self, level: &str) -> UpdateLevelRequest {
			UpdateLevelRequest {
				class_id: self.class_id.to_string(),
				student_id: self.student_id.to_string(),
				cefr_level: level.to_string(),
			}
		}
	}

	#[tokio::test]
	async fn updates_level_for_enrolled_student() {
		let harness = Harness::new().await;
		let service = harness.service();

		let outcome = service
			.update_student_level(&harness.ctx(), &harness.request("B2"))
			.await
			.unwrap();

		assert_eq!(outcome.cefr_level, CefrLevel::B2);
		let profile = ProfileRepository::new(harness.pool.clone())
			.get_profile(&harness.student_id)
			.await
			.unwrap()
			.unwrap();
		assert_eq!(profile.cefr_level, Some(CefrLevel::B2));
	}

	#[tokio::test]
	async fn rejects_invalid_level() {
		let harness = Harness::new().await;
		let service = harness.service();

		let err = service
			.update_student_level(&harness.ctx(), &harness.request("d1"))
			.await
			.unwrap_err();
		assert!(matches!(err, LevelError::InvalidRequest(_)));
	}

	#[tokio::test]
	async fn rejects_foreign_class() {
		let harness = Harness::new().await;
		let service = harness.service();

		let foreign_ctx = AuthContext::new(UserId::generate(), SessionId::generate());
		let err = service
			.update_student_level(&foreign_ctx, &harness.request("b2"))
			.await
			.unwrap_err();
		assert!(matches!(err, LevelError::ClassAccessDenied));
	}

	#[tokio::test]
	async fn rejects_student_who_left() {
		let harness = Harness::new().await;
		EnrollmentRepository::new(harness.pool.clone())
			.leave_class(&harness.class_id, &harness.student_id)
			.await
			.unwrap();
		let service = harness.service();

		let err = service
			.update_student_level(&harness.ctx(), &harness.request("b2"))
			.await
			.unwrap_err();
		assert!(matches!(err, LevelError::NotActivelyEnrolled));
	}

	#[tokio::test]
	async fn missing_profile_is_update_failure() {
		let harness = Harness::new().await;
		// Enrolled but no profile row.
		let ghost = UserId::generate();
		EnrollmentRepository::new(harness.pool.clone())
			.upsert_active_enrollment(&harness.class_id, &ghost)
			.await
			.unwrap();
		let service = harness.service();

		let mut request = harness.request("b2");
		request.student_id = ghost.to_string();
		let err = service
			.update_student_level(&harness.ctx(), &request)
			.await
			.unwrap_err();
		assert!(matches!(err, LevelError::UpdateFailed));
	}

	#[tokio::test]
	async fn school_less_class_still_updates_level() {
		let harness = Harness::new().await;
		let orphan_class =
			insert_test_class(&harness.pool, None, &harness.teacher_id, "Indé").await;
		EnrollmentRepository::new(harness.pool.clone())
			.upsert_active_enrollment(&orphan_class, &harness.student_id)
			.await
			.unwrap();
		let service = harness.service();

		let mut request = harness.request("c1");
		request.class_id = orphan_class.to_string();
		let outcome = service
			.update_student_level(&harness.ctx(), &request)
			.await
			.unwrap();
		assert_eq!(outcome.cefr_level, CefrLevel::C1);
	}
}
