// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Student enrollment orchestrator.
//!
//! The one multi-step workflow in the system. Step order matters:
//!
//! 1. Validate input (no side effects).
//! 2. Authorize the class against the calling teacher (no side effects).
//! 3. Create the identity, or reconcile an existing one (lookup + password
//!    reset) when the directory reports the email as registered.
//! 4. Reject if the email's profile belongs to a teacher.
//! 5-7. Upsert profile, membership, enrollment — each keyed so repeat calls
//!    converge instead of duplicating.
//! 8. Append an activity event, best-effort.
//!
//! Rollback invariant: only an identity created in step 3 of *this* call is
//! ever deleted. A pre-existing identity survives every failure path.

use std::sync::Arc;

use serde::Serialize;
use std::fmt;
use uuid::Uuid;

use elevate_activity::{ActivityEvent, ActivityEventType, ActivityRecorder};
use elevate_auth::{AuthContext, ClassId, MembershipRole, UserId, UserRole};
use elevate_db::{
	Class, ClassStore, EnrollmentStore, MembershipStore, MembershipUpsert, ProfileStore,
	StudentProfileUpsert,
};
use elevate_identity::{IdentityError, IdentityMetadata, IdentityService};

use crate::error::EnrollError;
use crate::request::{EnrollStudentRequest, ValidatedEnrollment};

/// How the identity was provisioned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountMode {
	/// A new identity was created for this email.
	Created,
	/// An existing identity was reused and its credential reset.
	Updated,
}

impl fmt::Display for AccountMode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			AccountMode::Created => write!(f, "created"),
			AccountMode::Updated => write!(f, "updated"),
		}
	}
}

/// Successful provisioning result.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrollmentOutcome {
	pub student_id: UserId,
	pub email: String,
	pub class_name: String,
	pub account_mode: AccountMode,
}

/// The enrollment orchestrator.
#[derive(Clone)]
pub struct EnrollmentService {
	identity: IdentityService,
	classes: Arc<dyn ClassStore>,
	profiles: Arc<dyn ProfileStore>,
	memberships: Arc<dyn MembershipStore>,
	enrollments: Arc<dyn EnrollmentStore>,
	activity: Arc<ActivityRecorder>,
}

impl EnrollmentService {
	pub fn new(
		identity: IdentityService,
		classes: Arc<dyn ClassStore>,
		profiles: Arc<dyn ProfileStore>,
		memberships: Arc<dyn MembershipStore>,
		enrollments: Arc<dyn EnrollmentStore>,
		activity: Arc<ActivityRecorder>,
	) -> Self {
		Self {
			identity,
			classes,
			profiles,
			memberships,
			enrollments,
			activity,
		}
	}

	/// Provision a student account and enroll it into the caller's class.
	///
	/// # Errors
	/// See [`EnrollError`]; every failure after identity creation rolls the
	/// fresh identity back before returning.
	#[tracing::instrument(skip(self, ctx, request), fields(teacher_id = %ctx.user_id))]
	pub async fn provision_student(
		&self,
		ctx: &AuthContext,
		request: &EnrollStudentRequest,
	) -> Result<EnrollmentOutcome, EnrollError> {
		let input = request.validate().map_err(EnrollError::InvalidRequest)?;

		let class = self.authorize_class(ctx, &input.class_id).await?;
		let Some(school_id) = class.school_id else {
			return Err(EnrollError::ClassUnaffiliated);
		};

		let metadata = IdentityMetadata {
			full_name: input.full_name.clone(),
			role: UserRole::Student,
		};

		let (student_id, account_mode) = self.provision_identity(&input, metadata.clone()).await?;

		// Best-effort profile read: absence (or a failed read) is not an
		// error, but an existing teacher profile stops the call.
		match self.profiles.get_profile(&student_id).await {
			Ok(Some(profile)) if profile.is_teacher() => {
				self.rollback_created_identity(&student_id, account_mode).await;
				return Err(EnrollError::EmailOwnedByTeacher);
			}
			Ok(_) => {}
			Err(e) => {
				tracing::warn!(student_id = %student_id, error = %e, "profile conflict check failed, proceeding");
			}
		}

		if let Err(e) = self
			.profiles
			.upsert_student_profile(&StudentProfileUpsert {
				id: student_id,
				full_name: input.full_name.clone(),
				school_id,
			})
			.await
		{
			tracing::error!(student_id = %student_id, error = %e, "profile upsert failed");
			self.rollback_created_identity(&student_id, account_mode).await;
			return Err(EnrollError::ProfileSetupFailed);
		}

		if let Err(e) = self
			.memberships
			.upsert_membership(&MembershipUpsert {
				school_id,
				user_id: student_id,
				role: MembershipRole::Student,
				invited_by: ctx.user_id,
			})
			.await
		{
			tracing::error!(student_id = %student_id, error = %e, "membership upsert failed");
			self.rollback_created_identity(&student_id, account_mode).await;
			return Err(EnrollError::MembershipSetupFailed);
		}

		if let Err(e) = self
			.enrollments
			.upsert_active_enrollment(&class.id, &student_id)
			.await
		{
			tracing::error!(student_id = %student_id, error = %e, "enrollment upsert failed");
			self.rollback_created_identity(&student_id, account_mode).await;
			return Err(EnrollError::EnrollmentFailed);
		}

		self.activity.record(
			ActivityEvent::builder(ActivityEventType::Milestone, ctx.user_id)
				.school(school_id)
				.class(class.id)
				.target(student_id)
				.text(format!(
					"{} a été inscrit avec un accès direct au compte.",
					input.full_name
				))
				.build(),
		);

		tracing::info!(
			student_id = %student_id,
			class_id = %class.id,
			mode = %account_mode,
			"student provisioned"
		);

		Ok(EnrollmentOutcome {
			student_id,
			email: input.email,
			class_name: class.name,
			account_mode,
		})
	}

	/// Resolve the class by (class, caller) and apply the business rules.
	async fn authorize_class(
		&self,
		ctx: &AuthContext,
		class_id_raw: &str,
	) -> Result<Class, EnrollError> {
		let Ok(class_id) = Uuid::parse_str(class_id_raw).map(ClassId::new) else {
			return Err(EnrollError::ClassAccessDenied);
		};

		let class = match self.classes.get_class_for_teacher(&class_id, &ctx.user_id).await {
			Ok(Some(class)) => class,
			Ok(None) => return Err(EnrollError::ClassAccessDenied),
			Err(e) => {
				tracing::error!(class_id = %class_id, error = %e, "class lookup failed");
				return Err(EnrollError::ClassAccessDenied);
			}
		};

		if class.is_archived() {
			return Err(EnrollError::ClassArchived);
		}

		Ok(class)
	}

	/// Create the identity, or reconcile an existing one.
	async fn provision_identity(
		&self,
		input: &ValidatedEnrollment,
		metadata: IdentityMetadata,
	) -> Result<(UserId, AccountMode), EnrollError> {
		match self
			.identity
			.create_identity(&input.email, &input.password, metadata.clone())
			.await
		{
			Ok(id) => Ok((id, AccountMode::Created)),
			Err(IdentityError::AlreadyExists) => {
				let existing = match self.identity.find_identity_by_email(&input.email).await {
					Ok(Some(existing)) => existing,
					Ok(None) | Err(_) => return Err(EnrollError::AccountUnreconciled),
				};

				if self
					.identity
					.update_identity_password(&existing.id, &input.password, metadata)
					.await
					.is_err()
				{
					return Err(EnrollError::AccountUpdateFailed);
				}

				Ok((existing.id, AccountMode::Updated))
			}
			Err(IdentityError::Rejected(message)) | Err(IdentityError::Unavailable(message)) => {
				Err(EnrollError::AccountRejected(message))
			}
		}
	}

	/// Delete the identity, but only if this call created it.
	async fn rollback_created_identity(&self, student_id: &UserId, mode: AccountMode) {
		if mode == AccountMode::Created {
			self.identity.delete_identity(student_id).await;
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use async_trait::async_trait;
	use chrono::Utc;
	use sqlx::sqlite::SqlitePool;

	use elevate_auth::{Profile, SchoolId, SessionId};
	use elevate_db::testing::{
		archive_test_class, create_migrated_test_pool, insert_test_class, insert_test_school,
	};
	use elevate_db::{
		ActivityEventRepository, ClassRepository, DbError, EnrollmentRepository,
		MembershipRepository, ProfileRepository, SchoolMembership,
	};
	use elevate_identity::testing::InMemoryDirectory;
	use elevate_identity::IdentityDirectory;

	struct Harness {
		pool: SqlitePool,
		directory: Arc<InMemoryDirectory>,
		school_id: SchoolId,
		teacher_id: UserId,
		class_id: ClassId,
	}

	impl Harness {
		async fn new() -> Self {
			let pool = create_migrated_test_pool().await;
			let school_id = insert_test_school(&pool, "École Montaigne").await;
			let teacher_id = UserId::generate();
			let class_id = insert_test_class(&pool, Some(&school_id), &teacher_id, "B1 Conversation").await;

			Self {
				pool,
				directory: Arc::new(InMemoryDirectory::new()),
				school_id,
				teacher_id,
				class_id,
			}
		}

		fn service(&self) -> EnrollmentService {
			self.service_with(
				Arc::new(ProfileRepository::new(self.pool.clone())),
				Arc::new(MembershipRepository::new(self.pool.clone())),
			)
		}

		fn service_with(
			&self,
			profiles: Arc<dyn ProfileStore>,
			memberships: Arc<dyn MembershipStore>,
		) -> EnrollmentService {
			let identity = IdentityService::new(
				Arc::clone(&self.directory) as Arc<dyn IdentityDirectory>
			);
			let activity = Arc::new(ActivityRecorder::new(Arc::new(ActivityEventRepository::new(
				self.pool.clone(),
			))));
			EnrollmentService::new(
				identity,
				Arc::new(ClassRepository::new(self.pool.clone())),
				profiles,
				memberships,
				Arc::new(EnrollmentRepository::new(self.pool.clone())),
				activity,
			)
		}

		fn ctx(&self) -> AuthContext {
			AuthContext::new(self.teacher_id, SessionId::generate())
		}

		fn request(&self) -> EnrollStudentRequest {
			EnrollStudentRequest {
				full_name: "Lina Dubois".to_string(),
				email: "lina@example.com".to_string(),
				password: "motdepasse".to_string(),
				class_id: self.class_id.to_string(),
			}
		}

		async fn enrollment_count(&self) -> i64 {
			let row: (i64,) = sqlx::query_as(
				"SELECT COUNT(*) FROM class_enrollments WHERE class_id = ?",
			)
			.bind(self.class_id.to_string())
			.fetch_one(&self.pool)
			.await
			.unwrap();
			row.0
		}

		async fn membership_count(&self) -> i64 {
			let row: (i64,) = sqlx::query_as(
				"SELECT COUNT(*) FROM school_memberships WHERE school_id = ?",
			)
			.bind(self.school_id.to_string())
			.fetch_one(&self.pool)
			.await
			.unwrap();
			row.0
		}

		async fn insert_teacher_profile(&self, id: &UserId) {
			let now = Utc::now().to_rfc3339();
			sqlx::query(
				r#"
				INSERT INTO profiles (id, full_name, default_role, created_at, updated_at)
				VALUES (?, 'Mme Bernard', 'teacher', ?, ?)
				"#,
			)
			.bind(id.to_string())
			.bind(&now)
			.bind(&now)
			.execute(&self.pool)
			.await
			.unwrap();
		}
	}

	struct FailingMembershipStore;

	#[async_trait]
	impl MembershipStore for FailingMembershipStore {
		async fn upsert_membership(&self, _upsert: &MembershipUpsert) -> Result<(), DbError> {
			Err(DbError::Internal("injected membership failure".to_string()))
		}

		async fn get_membership(
			&self,
			_school_id: &SchoolId,
			_user_id: &UserId,
		) -> Result<Option<SchoolMembership>, DbError> {
			Ok(None)
		}
	}

	/// Reports every looked-up profile as a teacher; models the race where
	/// the directory let a teacher email through identity creation.
	struct AlwaysTeacherProfileStore;

	#[async_trait]
	impl ProfileStore for AlwaysTeacherProfileStore {
		async fn get_profile(&self, id: &UserId) -> Result<Option<Profile>, DbError> {
			let now = Utc::now();
			Ok(Some(Profile {
				id: *id,
				full_name: "Mme Bernard".to_string(),
				default_role: UserRole::Teacher,
				active_school_id: None,
				cefr_level: None,
				created_at: now,
				updated_at: now,
			}))
		}

		async fn upsert_student_profile(&self, _upsert: &StudentProfileUpsert) -> Result<(), DbError> {
			Ok(())
		}

		async fn update_cefr_level(
			&self,
			_id: &UserId,
			_level: elevate_auth::CefrLevel,
		) -> Result<(), DbError> {
			Ok(())
		}
	}

	#[tokio::test]
	async fn fresh_email_creates_everything() {
		let harness = Harness::new().await;
		let service = harness.service();

		let outcome = service
			.provision_student(&harness.ctx(), &harness.request())
			.await
			.unwrap();

		assert_eq!(outcome.account_mode, AccountMode::Created);
		assert_eq!(outcome.email, "lina@example.com");
		assert_eq!(outcome.class_name, "B1 Conversation");
		assert_eq!(harness.directory.created_count(), 1);
		assert_eq!(harness.enrollment_count().await, 1);
		assert_eq!(harness.membership_count().await, 1);

		let profile = ProfileRepository::new(harness.pool.clone())
			.get_profile(&outcome.student_id)
			.await
			.unwrap()
			.unwrap();
		assert_eq!(profile.full_name, "Lina Dubois");
		assert_eq!(profile.default_role, UserRole::Student);
		assert_eq!(profile.active_school_id, Some(harness.school_id));
	}

	#[tokio::test]
	async fn existing_email_is_reconciled_not_recreated() {
		let harness = Harness::new().await;
		let existing = harness.directory.seed_identity("lina@example.com");
		let service = harness.service();

		let outcome = service
			.provision_student(&harness.ctx(), &harness.request())
			.await
			.unwrap();

		assert_eq!(outcome.account_mode, AccountMode::Updated);
		assert_eq!(outcome.student_id, existing);
		assert_eq!(harness.directory.created_count(), 0);
		assert_eq!(harness.directory.updated_count(), 1);
		assert_eq!(
			harness.directory.password_of("lina@example.com").as_deref(),
			Some("motdepasse")
		);
	}

	#[tokio::test]
	async fn idempotent_repeat_converges() {
		let harness = Harness::new().await;
		let service = harness.service();

		let first = service
			.provision_student(&harness.ctx(), &harness.request())
			.await
			.unwrap();
		let second = service
			.provision_student(&harness.ctx(), &harness.request())
			.await
			.unwrap();

		assert_eq!(first.account_mode, AccountMode::Created);
		assert_eq!(second.account_mode, AccountMode::Updated);
		assert_eq!(first.student_id, second.student_id);
		assert_eq!(harness.directory.created_count(), 1);
		assert_eq!(harness.enrollment_count().await, 1);
		assert_eq!(harness.membership_count().await, 1);
	}

	#[tokio::test]
	async fn teacher_email_is_rejected_and_preserved() {
		let harness = Harness::new().await;
		let teacher_identity = harness.directory.seed_identity("lina@example.com");
		harness.insert_teacher_profile(&teacher_identity).await;
		let service = harness.service();

		let err = service
			.provision_student(&harness.ctx(), &harness.request())
			.await
			.unwrap_err();

		assert!(matches!(err, EnrollError::EmailOwnedByTeacher));
		// The pre-existing teacher identity must never be deleted.
		assert!(harness.directory.contains_id(&teacher_identity));
		assert_eq!(harness.directory.deleted_count(), 0);
		assert_eq!(harness.enrollment_count().await, 0);
	}

	#[tokio::test]
	async fn teacher_conflict_deletes_only_fresh_identity() {
		let harness = Harness::new().await;
		let service = harness.service_with(
			Arc::new(AlwaysTeacherProfileStore),
			Arc::new(MembershipRepository::new(harness.pool.clone())),
		);

		let err = service
			.provision_student(&harness.ctx(), &harness.request())
			.await
			.unwrap_err();

		assert!(matches!(err, EnrollError::EmailOwnedByTeacher));
		assert_eq!(harness.directory.created_count(), 1);
		assert_eq!(harness.directory.deleted_count(), 1);
		assert!(harness.directory.password_of("lina@example.com").is_none());
	}

	#[tokio::test]
	async fn membership_failure_rolls_back_fresh_identity() {
		let harness = Harness::new().await;
		let service = harness.service_with(
			Arc::new(ProfileRepository::new(harness.pool.clone())),
			Arc::new(FailingMembershipStore),
		);

		let err = service
			.provision_student(&harness.ctx(), &harness.request())
			.await
			.unwrap_err();

		assert!(matches!(err, EnrollError::MembershipSetupFailed));
		assert_eq!(harness.directory.created_count(), 1);
		assert_eq!(harness.directory.deleted_count(), 1);
		// Verify via lookup: the identity is gone.
		assert!(harness.directory.password_of("lina@example.com").is_none());
		assert_eq!(harness.enrollment_count().await, 0);
	}

	#[tokio::test]
	async fn membership_failure_preserves_preexisting_identity() {
		let harness = Harness::new().await;
		let existing = harness.directory.seed_identity("lina@example.com");
		let service = harness.service_with(
			Arc::new(ProfileRepository::new(harness.pool.clone())),
			Arc::new(FailingMembershipStore),
		);

		let err = service
			.provision_student(&harness.ctx(), &harness.request())
			.await
			.unwrap_err();

		assert!(matches!(err, EnrollError::MembershipSetupFailed));
		assert!(harness.directory.contains_id(&existing));
		assert_eq!(harness.directory.deleted_count(), 0);
	}

	#[tokio::test]
	async fn archived_class_rejects_without_side_effects() {
		let harness = Harness::new().await;
		archive_test_class(&harness.pool, &harness.class_id).await;
		let service = harness.service();

		let err = service
			.provision_student(&harness.ctx(), &harness.request())
			.await
			.unwrap_err();

		assert!(matches!(err, EnrollError::ClassArchived));
		assert_eq!(harness.directory.created_count(), 0);
	}

	#[tokio::test]
	async fn unaffiliated_class_rejects() {
		let harness = Harness::new().await;
		let orphan_class =
			insert_test_class(&harness.pool, None, &harness.teacher_id, "Sans école").await;
		let service = harness.service();

		let mut request = harness.request();
		request.class_id = orphan_class.to_string();
		let err = service
			.provision_student(&harness.ctx(), &request)
			.await
			.unwrap_err();

		assert!(matches!(err, EnrollError::ClassUnaffiliated));
		assert_eq!(harness.directory.created_count(), 0);
	}

	#[tokio::test]
	async fn foreign_class_denied_before_any_directory_call() {
		let harness = Harness::new().await;
		let service = harness.service();

		let foreign_ctx = AuthContext::new(UserId::generate(), SessionId::generate());
		let err = service
			.provision_student(&foreign_ctx, &harness.request())
			.await
			.unwrap_err();

		assert!(matches!(err, EnrollError::ClassAccessDenied));
		assert_eq!(harness.directory.created_count(), 0);
		assert_eq!(harness.directory.list_calls(), 0);
	}

	#[tokio::test]
	async fn short_password_rejected_before_side_effects() {
		let harness = Harness::new().await;
		let service = harness.service();

		let mut request = harness.request();
		request.password = "1234567".to_string();
		let err = service
			.provision_student(&harness.ctx(), &request)
			.await
			.unwrap_err();

		assert!(matches!(
			err,
			EnrollError::InvalidRequest(crate::error::ValidationError::PasswordTooShort)
		));
		assert_eq!(harness.directory.created_count(), 0);
	}

	#[tokio::test]
	async fn exact_eight_character_password_accepted() {
		let harness = Harness::new().await;
		let service = harness.service();

		let mut request = harness.request();
		request.password = "12345678".to_string();
		let outcome = service
			.provision_student(&harness.ctx(), &request)
			.await
			.unwrap();
		assert_eq!(outcome.account_mode, AccountMode::Created);
	}

	#[tokio::test]
	async fn duplicate_without_match_is_unreconciled() {
		let harness = Harness::new().await;
		// The directory claims the email exists but the scan finds nothing.
		harness.directory.duplicate_next_create();
		let service = harness.service();

		let err = service
			.provision_student(&harness.ctx(), &harness.request())
			.await
			.unwrap_err();

		assert!(matches!(err, EnrollError::AccountUnreconciled));
		assert_eq!(harness.enrollment_count().await, 0);
	}

	#[tokio::test]
	async fn failed_password_reset_is_terminal() {
		let harness = Harness::new().await;
		harness.directory.seed_identity("lina@example.com");
		harness.directory.fail_next_update("directory offline");
		let service = harness.service();

		let err = service
			.provision_student(&harness.ctx(), &harness.request())
			.await
			.unwrap_err();

		assert!(matches!(err, EnrollError::AccountUpdateFailed));
		assert_eq!(harness.enrollment_count().await, 0);
	}

	#[tokio::test]
	async fn provider_rejection_surfaces_message() {
		let harness = Harness::new().await;
		harness
			.directory
			.reject_next_create("Password should be at least 6 characters");
		let service = harness.service();

		let err = service
			.provision_student(&harness.ctx(), &harness.request())
			.await
			.unwrap_err();

		match err {
			EnrollError::AccountRejected(message) => {
				assert_eq!(message, "Password should be at least 6 characters")
			}
			other => panic!("unexpected error: {other:?}"),
		}
	}
}
