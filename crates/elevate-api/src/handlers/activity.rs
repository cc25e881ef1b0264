// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Activity feed endpoint.

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use tracing::warn;

use elevate_db::ActivityEventRecord;

use crate::auth::RequireAuth;
use crate::error::ApiError;
use crate::state::ApiState;

const FEED_LIMIT: i64 = 20;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityFeedItem {
	pub text: String,
	pub event_type: String,
	pub created_at: String,
}

#[derive(Debug, Serialize)]
pub struct ActivityFeedResponse {
	pub events: Vec<ActivityFeedItem>,
}

fn feed_item(record: ActivityEventRecord) -> ActivityFeedItem {
	let text = record
		.payload
		.get("text")
		.and_then(|t| t.as_str())
		.map(str::to_string)
		.unwrap_or_else(|| record.event_type.replace('_', " "));

	ActivityFeedItem {
		text,
		event_type: record.event_type,
		created_at: record.created_at.to_rfc3339(),
	}
}

/// `GET /api/teacher/activity`
///
/// School-affiliated callers see their school's feed; unaffiliated callers
/// see their own school-less events.
pub async fn activity_feed(
	RequireAuth(ctx): RequireAuth,
	State(state): State<ApiState>,
) -> Result<Json<ActivityFeedResponse>, ApiError> {
	let school_id = match state.profiles.get_profile(&ctx.user_id).await {
		Ok(Some(profile)) => profile.active_school_id,
		Ok(None) => None,
		Err(e) => {
			warn!(user_id = %ctx.user_id, error = %e, "caller profile lookup failed");
			None
		}
	};

	let records = match school_id {
		Some(school_id) => state
			.activity_events
			.list_recent_for_school(&school_id, FEED_LIMIT)
			.await,
		None => state
			.activity_events
			.list_recent_for_actor(&ctx.user_id, FEED_LIMIT)
			.await,
	}
	.map_err(|e| {
		warn!(user_id = %ctx.user_id, error = %e, "activity feed query failed");
		ApiError::Internal("Le chargement de l'activité a échoué.".to_string())
	})?;

	Ok(Json(ActivityFeedResponse {
		events: records.into_iter().map(feed_item).collect(),
	}))
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::Utc;
	use elevate_auth::{EventId, UserId};
	use serde_json::json;

	fn record(payload: serde_json::Value) -> ActivityEventRecord {
		ActivityEventRecord {
			id: EventId::generate(),
			school_id: None,
			class_id: None,
			actor_id: UserId::generate(),
			target_user_id: None,
			event_type: "class_created".to_string(),
			payload,
			created_at: Utc::now(),
		}
	}

	#[test]
	fn feed_item_prefers_payload_text() {
		let item = feed_item(record(json!({ "text": "La classe B1 a été créée." })));
		assert_eq!(item.text, "La classe B1 a été créée.");
	}

	#[test]
	fn feed_item_falls_back_to_event_type() {
		let item = feed_item(record(json!({})));
		assert_eq!(item.text, "class created");
	}
}
