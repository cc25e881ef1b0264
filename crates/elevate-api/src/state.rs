// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Shared handler state.

use std::sync::Arc;

use elevate_activity::ActivityRecorder;
use elevate_db::{
	ActivityEventStore, ClassStore, EnrollmentStore, ProfileStore, RosterStore, SessionStore,
};
use elevate_provisioning::{EnrollmentService, GradingService, LevelService};

/// Everything the HTTP handlers need, cheaply cloneable.
#[derive(Clone)]
pub struct ApiState {
	pub sessions: Arc<dyn SessionStore>,
	pub enrollment: Arc<EnrollmentService>,
	pub levels: Arc<LevelService>,
	pub grading: Arc<GradingService>,
	pub classes: Arc<dyn ClassStore>,
	pub enrollments: Arc<dyn EnrollmentStore>,
	pub roster: Arc<dyn RosterStore>,
	pub profiles: Arc<dyn ProfileStore>,
	pub activity_events: Arc<dyn ActivityEventStore>,
	pub activity: Arc<ActivityRecorder>,
}
