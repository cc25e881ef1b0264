// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Submission grading.
//!
//! Same shape as the level update: authorize, require an active enrollment,
//! one durable write, best-effort activity event.

use std::sync::Arc;

use uuid::Uuid;

use elevate_activity::{ActivityEvent, ActivityEventType, ActivityRecorder};
use elevate_auth::{AuthContext, ClassId, SubmissionId, UserId};
use elevate_db::{ClassStore, EnrollmentStore, GradeUpdate, SubmissionStore};

use crate::error::GradeError;
use crate::request::GradeSubmissionRequest;

/// Successful grading result.
#[derive(Debug, Clone, PartialEq)]
pub struct GradeOutcome {
	pub submission_id: SubmissionId,
	pub student_id: UserId,
	pub score: i64,
}

/// The grading workflow.
#[derive(Clone)]
pub struct GradingService {
	classes: Arc<dyn ClassStore>,
	enrollments: Arc<dyn EnrollmentStore>,
	submissions: Arc<dyn SubmissionStore>,
	activity: Arc<ActivityRecorder>,
}

impl GradingService {
	pub fn new(
		classes: Arc<dyn ClassStore>,
		enrollments: Arc<dyn EnrollmentStore>,
		submissions: Arc<dyn SubmissionStore>,
		activity: Arc<ActivityRecorder>,
	) -> Self {
		Self {
			classes,
			enrollments,
			submissions,
			activity,
		}
	}

	/// Grade a submission in the caller's class.
	#[tracing::instrument(skip(self, ctx, request), fields(teacher_id = %ctx.user_id))]
	pub async fn grade_submission(
		&self,
		ctx: &AuthContext,
		request: &GradeSubmissionRequest,
	) -> Result<GradeOutcome, GradeError> {
		let input = request.validate().map_err(GradeError::InvalidRequest)?;

		let Ok(class_id) = Uuid::parse_str(&input.class_id).map(ClassId::new) else {
			return Err(GradeError::ClassAccessDenied);
		};
		let Ok(submission_id) = Uuid::parse_str(&input.submission_id).map(SubmissionId::new) else {
			return Err(GradeError::SubmissionNotFound);
		};

		let class = match self.classes.get_class_for_teacher(&class_id, &ctx.user_id).await {
			Ok(Some(class)) => class,
			Ok(None) => return Err(GradeError::ClassAccessDenied),
			Err(e) => {
				tracing::error!(class_id = %class_id, error = %e, "class lookup failed");
				return Err(GradeError::ClassAccessDenied);
			}
		};

		let (submission, owning_class) = match self
			.submissions
			.get_submission_with_class(&submission_id)
			.await
		{
			Ok(Some(found)) => found,
			Ok(None) => return Err(GradeError::SubmissionNotFound),
			Err(e) => {
				tracing::error!(submission_id = %submission_id, error = %e, "submission lookup failed");
				return Err(GradeError::SubmissionNotFound);
			}
		};

		// A submission under someone else's class is reported exactly like a
		// missing one.
		if owning_class != class_id {
			return Err(GradeError::SubmissionNotFound);
		}

		match self
			.enrollments
			.get_active_enrollment(&class_id, &submission.student_id)
			.await
		{
			Ok(Some(_)) => {}
			Ok(None) => return Err(GradeError::NotActivelyEnrolled),
			Err(e) => {
				tracing::error!(class_id = %class_id, student_id = %submission.student_id, error = %e, "enrollment lookup failed");
				return Err(GradeError::NotActivelyEnrolled);
			}
		}

		if let Err(e) = self
			.submissions
			.apply_grade(
				&submission_id,
				&GradeUpdate {
					score: input.score,
					feedback: input.feedback.clone(),
				},
			)
			.await
		{
			tracing::error!(submission_id = %submission_id, error = %e, "grade write failed");
			return Err(GradeError::UpdateFailed);
		}

		if let Some(school_id) = class.school_id {
			self.activity.record(
				ActivityEvent::builder(ActivityEventType::SubmissionGraded, ctx.user_id)
					.school(school_id)
					.class(class_id)
					.target(submission.student_id)
					.text(format!("Une soumission a été notée {} / 100.", input.score))
					.build(),
			);
		}

		tracing::info!(submission_id = %submission_id, score = input.score, "submission graded");

		Ok(GradeOutcome {
			submission_id,
			student_id: submission.student_id,
			score: input.score,
		})
	}
}
