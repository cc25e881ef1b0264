// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Session-token authentication.
//!
//! The middleware resolves `Authorization: Bearer <token>` against the
//! sessions table (tokens are stored as SHA-256 hashes) and threads the
//! caller into the request as an [`AuthContext`] extension. Session
//! issuance lives in the login layer, not here.

use axum::{
	extract::{FromRequestParts, Request, State},
	http::request::Parts,
	middleware::Next,
	response::Response,
};
use sha2::{Digest, Sha256};
use tracing::warn;

use elevate_auth::AuthContext;

use crate::error::ApiError;
use crate::state::ApiState;

/// Hex SHA-256 of a raw session token; the only form ever persisted.
pub fn hash_token(token: &str) -> String {
	let mut hasher = Sha256::new();
	hasher.update(token.as_bytes());
	hex::encode(hasher.finalize())
}

pub async fn session_auth_middleware(
	State(state): State<ApiState>,
	mut request: Request,
	next: Next,
) -> Result<Response, ApiError> {
	let auth_header = request
		.headers()
		.get("Authorization")
		.and_then(|h| h.to_str().ok());

	let Some(auth_value) = auth_header else {
		warn!("auth failed: missing Authorization header");
		return Err(ApiError::Unauthorized);
	};

	let Some(token) = auth_value.strip_prefix("Bearer ").map(str::trim) else {
		warn!("auth failed: invalid Authorization format");
		return Err(ApiError::Unauthorized);
	};

	let session = match state.sessions.get_session_by_token_hash(&hash_token(token)).await {
		Ok(Some(session)) => session,
		Ok(None) => {
			warn!("auth failed: unknown session token");
			return Err(ApiError::Unauthorized);
		}
		Err(e) => {
			warn!(error = %e, "auth failed: session lookup error");
			return Err(ApiError::Unauthorized);
		}
	};

	if session.is_expired() {
		warn!(session_id = %session.id, "auth failed: session expired");
		return Err(ApiError::Unauthorized);
	}

	request
		.extensions_mut()
		.insert(AuthContext::new(session.user_id, session.id));

	Ok(next.run(request).await)
}

/// Extractor for the authenticated caller set by the middleware.
pub struct RequireAuth(pub AuthContext);

impl<S> FromRequestParts<S> for RequireAuth
where
	S: Send + Sync,
{
	type Rejection = ApiError;

	async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
		parts
			.extensions
			.get::<AuthContext>()
			.cloned()
			.map(RequireAuth)
			.ok_or(ApiError::Unauthorized)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn hash_token_is_stable_hex() {
		let hash = hash_token("secret-token");
		assert_eq!(hash.len(), 64);
		assert_eq!(hash, hash_token("secret-token"));
		assert_ne!(hash, hash_token("other-token"));
	}
}
