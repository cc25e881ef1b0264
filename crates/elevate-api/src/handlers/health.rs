// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use axum::Json;
use serde_json::{json, Value};

pub async fn health() -> Json<Value> {
	Json(json!({ "status": "ok" }))
}
