// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! HTTP implementation of [`IdentityDirectory`] against the hosted
//! provider's admin REST API.
//!
//! All classification of the provider's free-text error messages happens
//! here and nowhere else. The substring match on "already"/"exists"/
//! "registered" is a stop-gap for providers that do not return a structured
//! duplicate-email code; swap this implementation to drop it.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use elevate_auth::UserId;

use crate::directory::{IdentityDirectory, IdentityRecord, IdentityUpdate, NewIdentity};
use crate::error::DirectoryError;

/// Directory backed by the provider's `/admin/users` endpoints.
#[derive(Clone)]
pub struct HttpIdentityDirectory {
	client: reqwest::Client,
	base_url: String,
	service_key: String,
}

#[derive(Debug, Deserialize)]
struct AdminUser {
	id: Uuid,
	email: Option<String>,
	email_confirmed_at: Option<String>,
	created_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AdminUserList {
	users: Vec<AdminUser>,
}

#[derive(Debug, Deserialize)]
struct AdminErrorBody {
	msg: Option<String>,
	message: Option<String>,
	error_description: Option<String>,
}

impl HttpIdentityDirectory {
	/// Create a directory client.
	///
	/// # Arguments
	/// * `base_url` - Provider auth base URL, e.g. `https://xyz.example.co/auth/v1`
	/// * `service_key` - Service-role key authorizing admin calls
	pub fn new(base_url: impl Into<String>, service_key: impl Into<String>) -> Self {
		Self {
			client: reqwest::Client::new(),
			base_url: base_url.into().trim_end_matches('/').to_string(),
			service_key: service_key.into(),
		}
	}

	fn admin_users_url(&self) -> String {
		format!("{}/admin/users", self.base_url)
	}

	fn request(&self, method: reqwest::Method, url: String) -> reqwest::RequestBuilder {
		self
			.client
			.request(method, url)
			.bearer_auth(&self.service_key)
			.header("apikey", &self.service_key)
	}

	async fn error_message(response: reqwest::Response) -> String {
		let status = response.status();
		match response.json::<AdminErrorBody>().await {
			Ok(body) => body
				.msg
				.or(body.message)
				.or(body.error_description)
				.unwrap_or_else(|| format!("provider returned status {status}")),
			Err(_) => format!("provider returned status {status}"),
		}
	}

	fn record_from(user: AdminUser) -> IdentityRecord {
		IdentityRecord {
			id: UserId::new(user.id),
			email: user.email.unwrap_or_default(),
			email_confirmed: user.email_confirmed_at.is_some(),
			created_at: user.created_at.and_then(|d| {
				chrono::DateTime::parse_from_rfc3339(&d)
					.map(|dt| dt.with_timezone(&chrono::Utc))
					.ok()
			}),
		}
	}
}

/// Classify a failed create-user response.
///
/// Stop-gap: the provider reports duplicate emails only in prose, so a
/// handful of wordings are matched here. A wording change breaks this
/// branch, which is why it lives behind the trait and not in the workflow.
fn classify_create_failure(status: StatusCode, message: &str) -> DirectoryError {
	if status.is_server_error() {
		return DirectoryError::unavailable(message);
	}

	let lowered = message.to_lowercase();
	if lowered.contains("already") || lowered.contains("exists") || lowered.contains("registered") {
		DirectoryError::already_exists(message)
	} else {
		DirectoryError::rejected(message)
	}
}

#[async_trait]
impl IdentityDirectory for HttpIdentityDirectory {
	#[tracing::instrument(skip(self, new), fields(email = %new.email))]
	async fn create_user(&self, new: &NewIdentity) -> Result<IdentityRecord, DirectoryError> {
		let body = json!({
			"email": new.email,
			"password": new.password,
			"email_confirm": new.email_confirm,
			"user_metadata": new.metadata,
		});

		let response = self
			.request(reqwest::Method::POST, self.admin_users_url())
			.json(&body)
			.send()
			.await
			.map_err(|e| DirectoryError::unavailable(e.to_string()))?;

		if response.status().is_success() {
			let user: AdminUser = response
				.json()
				.await
				.map_err(|e| DirectoryError::unavailable(e.to_string()))?;
			return Ok(Self::record_from(user));
		}

		let status = response.status();
		let message = Self::error_message(response).await;
		Err(classify_create_failure(status, &message))
	}

	#[tracing::instrument(skip(self, update), fields(user_id = %id))]
	async fn update_user_by_id(
		&self,
		id: &UserId,
		update: &IdentityUpdate,
	) -> Result<(), DirectoryError> {
		let body = json!({
			"password": update.password,
			"email_confirm": update.email_confirm,
			"user_metadata": update.metadata,
		});

		let response = self
			.request(
				reqwest::Method::PUT,
				format!("{}/{id}", self.admin_users_url()),
			)
			.json(&body)
			.send()
			.await
			.map_err(|e| DirectoryError::unavailable(e.to_string()))?;

		match response.status() {
			status if status.is_success() => Ok(()),
			StatusCode::NOT_FOUND => {
				let message = Self::error_message(response).await;
				Err(DirectoryError::not_found(message))
			}
			status if status.is_server_error() => {
				let message = Self::error_message(response).await;
				Err(DirectoryError::unavailable(message))
			}
			_ => {
				let message = Self::error_message(response).await;
				Err(DirectoryError::rejected(message))
			}
		}
	}

	#[tracing::instrument(skip(self), fields(user_id = %id))]
	async fn delete_user(&self, id: &UserId) -> Result<(), DirectoryError> {
		let response = self
			.request(
				reqwest::Method::DELETE,
				format!("{}/{id}", self.admin_users_url()),
			)
			.send()
			.await
			.map_err(|e| DirectoryError::unavailable(e.to_string()))?;

		match response.status() {
			status if status.is_success() => Ok(()),
			StatusCode::NOT_FOUND => {
				let message = Self::error_message(response).await;
				Err(DirectoryError::not_found(message))
			}
			_ => {
				let message = Self::error_message(response).await;
				Err(DirectoryError::unavailable(message))
			}
		}
	}

	#[tracing::instrument(skip(self), fields(page, per_page))]
	async fn list_users(
		&self,
		page: u32,
		per_page: u32,
	) -> Result<Vec<IdentityRecord>, DirectoryError> {
		let response = self
			.request(reqwest::Method::GET, self.admin_users_url())
			.query(&[("page", page), ("per_page", per_page)])
			.send()
			.await
			.map_err(|e| DirectoryError::unavailable(e.to_string()))?;

		if !response.status().is_success() {
			let message = Self::error_message(response).await;
			return Err(DirectoryError::unavailable(message));
		}

		let list: AdminUserList = response
			.json()
			.await
			.map_err(|e| DirectoryError::unavailable(e.to_string()))?;

		Ok(list.users.into_iter().map(Self::record_from).collect())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::DirectoryErrorKind;

	#[test]
	fn classify_detects_duplicate_wordings() {
		for message in [
			"A user with this email address has already been registered",
			"User already exists",
			"email exists",
			"Already registered",
		] {
			let err = classify_create_failure(StatusCode::UNPROCESSABLE_ENTITY, message);
			assert_eq!(err.kind, DirectoryErrorKind::AlreadyExists, "{message}");
		}
	}

	#[test]
	fn classify_surfaces_other_rejections() {
		let err = classify_create_failure(
			StatusCode::UNPROCESSABLE_ENTITY,
			"Password should be at least 6 characters",
		);
		assert_eq!(err.kind, DirectoryErrorKind::Rejected);
		assert_eq!(err.message, "Password should be at least 6 characters");
	}

	#[test]
	fn classify_treats_server_errors_as_unavailable() {
		let err = classify_create_failure(StatusCode::BAD_GATEWAY, "upstream exists timeout");
		assert_eq!(err.kind, DirectoryErrorKind::Unavailable);
	}

	#[test]
	fn base_url_trailing_slash_is_normalized() {
		let dir = HttpIdentityDirectory::new("https://auth.example.test/auth/v1/", "key");
		assert_eq!(
			dir.admin_users_url(),
			"https://auth.example.test/auth/v1/admin/users"
		);
	}
}
