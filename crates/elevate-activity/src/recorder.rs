// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Fire-and-forget activity recording.
//!
//! Events go onto a bounded queue drained by a background task that writes
//! through the activity store. A full queue or a failed write drops the
//! event with a warning; the timeline is advisory and never worth failing a
//! request over.

use std::sync::Arc;

use serde_json::json;
use tokio::sync::mpsc::{self, error::SendError};
use tracing::{instrument, warn};

use elevate_db::{ActivityEventStore, NewActivityEvent};

use crate::event::ActivityEvent;

const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Queue-backed recorder for activity events.
pub struct ActivityRecorder {
	tx: mpsc::Sender<ActivityEvent>,
}

impl ActivityRecorder {
	/// Create a recorder with the default queue capacity.
	pub fn new(store: Arc<dyn ActivityEventStore>) -> Self {
		Self::with_capacity(store, DEFAULT_QUEUE_CAPACITY)
	}

	/// Create a recorder with an explicit queue capacity.
	pub fn with_capacity(store: Arc<dyn ActivityEventStore>, capacity: usize) -> Self {
		let (tx, rx) = mpsc::channel(capacity);

		tokio::spawn(Self::background_task(rx, store));

		Self { tx }
	}

	async fn background_task(
		mut rx: mpsc::Receiver<ActivityEvent>,
		store: Arc<dyn ActivityEventStore>,
	) {
		while let Some(event) = rx.recv().await {
			let record = NewActivityEvent {
				school_id: event.school_id,
				class_id: event.class_id,
				actor_id: event.actor_id,
				target_user_id: event.target_user_id,
				event_type: event.event_type.as_str().to_string(),
				payload: json!({ "text": event.text }),
			};

			if let Err(e) = store.insert_event(&record).await {
				warn!(event_type = %event.event_type, error = %e, "activity event write failed");
			}
		}
	}

	/// Record an event without waiting.
	///
	/// # Returns
	/// `true` if the event was queued, `false` if the queue was full and the
	/// event dropped.
	#[instrument(skip(self, event), fields(event_type = %event.event_type))]
	pub fn record(&self, event: ActivityEvent) -> bool {
		let queued = self.tx.try_send(event).is_ok();
		if !queued {
			warn!("activity queue full, event dropped");
		}
		queued
	}

	/// Record an event, waiting for queue space.
	pub async fn record_blocking(&self, event: ActivityEvent) -> Result<(), SendError<ActivityEvent>> {
		self.tx.send(event).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::event::{ActivityEvent, ActivityEventType};
	use elevate_db::testing::{create_migrated_test_pool, insert_test_school};
	use elevate_db::ActivityEventRepository;
	use elevate_auth::UserId;
	use std::time::Duration;

	async fn wait_for_event_count(repo: &ActivityEventRepository, school: &elevate_auth::SchoolId, expected: usize) {
		for _ in 0..100 {
			let events = repo.list_recent_for_school(school, 50).await.unwrap();
			if events.len() == expected {
				return;
			}
			tokio::time::sleep(Duration::from_millis(10)).await;
		}
		panic!("expected {expected} events, queue never drained");
	}

	#[tokio::test]
	async fn recorded_events_reach_the_store() {
		let pool = create_migrated_test_pool().await;
		let school_id = insert_test_school(&pool, "École").await;
		let repo = ActivityEventRepository::new(pool.clone());
		let recorder = ActivityRecorder::new(Arc::new(repo.clone()));
		let actor = UserId::generate();

		let event = ActivityEvent::builder(ActivityEventType::Milestone, actor)
			.school(school_id)
			.text("Niveau CECRL mis à jour vers B2.")
			.build();
		assert!(recorder.record(event));

		wait_for_event_count(&repo, &school_id, 1).await;
		let events = repo.list_recent_for_school(&school_id, 50).await.unwrap();
		assert_eq!(events[0].event_type, "milestone");
		assert_eq!(events[0].payload["text"], "Niveau CECRL mis à jour vers B2.");
	}

	#[tokio::test]
	async fn record_blocking_delivers() {
		let pool = create_migrated_test_pool().await;
		let school_id = insert_test_school(&pool, "École").await;
		let repo = ActivityEventRepository::new(pool.clone());
		let recorder = ActivityRecorder::with_capacity(Arc::new(repo.clone()), 1);
		let actor = UserId::generate();

		for i in 0..3 {
			let event = ActivityEvent::builder(ActivityEventType::Milestone, actor)
				.school(school_id)
				.text(format!("événement {i}"))
				.build();
			recorder.record_blocking(event).await.unwrap();
		}

		wait_for_event_count(&repo, &school_id, 3).await;
	}
}
