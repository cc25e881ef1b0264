// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Find-or-create semantics over an [`IdentityDirectory`].

use std::sync::Arc;

use elevate_auth::UserId;

use crate::directory::{
	IdentityDirectory, IdentityMetadata, IdentityRecord, IdentityUpdate, NewIdentity,
};
use crate::error::{DirectoryErrorKind, IdentityError};

/// Page size for the email scan.
const FIND_PAGE_SIZE: u32 = 200;
/// Upper bound on scanned pages (5000 identities).
const FIND_MAX_PAGES: u32 = 25;

/// Adapter exposing the identity operations the provisioning workflow needs.
#[derive(Clone)]
pub struct IdentityService {
	directory: Arc<dyn IdentityDirectory>,
}

impl IdentityService {
	pub fn new(directory: Arc<dyn IdentityDirectory>) -> Self {
		Self { directory }
	}

	/// Create an identity with a confirmed email.
	///
	/// # Errors
	/// - [`IdentityError::AlreadyExists`] when an identity with this email is
	///   registered; callers reconcile via [`Self::find_identity_by_email`].
	/// - [`IdentityError::Rejected`] with the provider's message verbatim for
	///   any other refusal (e.g. weak password).
	#[tracing::instrument(skip(self, password, metadata), fields(email = %email))]
	pub async fn create_identity(
		&self,
		email: &str,
		password: &str,
		metadata: IdentityMetadata,
	) -> Result<UserId, IdentityError> {
		let new = NewIdentity {
			email: email.to_string(),
			password: password.to_string(),
			email_confirm: true,
			metadata,
		};

		match self.directory.create_user(&new).await {
			Ok(record) => {
				tracing::debug!(user_id = %record.id, "identity created");
				Ok(record.id)
			}
			Err(e) if e.kind == DirectoryErrorKind::AlreadyExists => {
				tracing::debug!(email = %email, "identity already exists");
				Err(IdentityError::AlreadyExists)
			}
			Err(e) if e.kind == DirectoryErrorKind::Unavailable => {
				Err(IdentityError::Unavailable(e.message))
			}
			Err(e) => Err(IdentityError::Rejected(e.message)),
		}
	}

	/// Find an identity by email via a paginated scan.
	///
	/// The directory offers no admin lookup by email, so this walks
	/// `list_users` pages (size 200, at most 25 pages) doing a
	/// case-insensitive exact match. O(n) in directory size; the worst
	/// scaling operation in the system.
	///
	/// # Returns
	/// The first match, or `None` after the scan is exhausted.
	#[tracing::instrument(skip(self), fields(email = %email))]
	pub async fn find_identity_by_email(
		&self,
		email: &str,
	) -> Result<Option<IdentityRecord>, IdentityError> {
		let target = email.to_lowercase();

		for page in 1..=FIND_MAX_PAGES {
			let users = self
				.directory
				.list_users(page, FIND_PAGE_SIZE)
				.await
				.map_err(|e| IdentityError::Unavailable(e.message))?;

			if let Some(found) = users
				.iter()
				.find(|u| u.email.to_lowercase() == target)
			{
				tracing::debug!(user_id = %found.id, page, "identity found by email");
				return Ok(Some(found.clone()));
			}

			if users.len() < FIND_PAGE_SIZE as usize {
				break;
			}
		}

		Ok(None)
	}

	/// Reset an identity's password and metadata.
	///
	/// Used only when a collision was detected during creation.
	#[tracing::instrument(skip(self, password, metadata), fields(user_id = %id))]
	pub async fn update_identity_password(
		&self,
		id: &UserId,
		password: &str,
		metadata: IdentityMetadata,
	) -> Result<(), IdentityError> {
		let update = IdentityUpdate {
			password: password.to_string(),
			email_confirm: true,
			metadata,
		};

		match self.directory.update_user_by_id(id, &update).await {
			Ok(()) => {
				tracing::debug!(user_id = %id, "identity password reset");
				Ok(())
			}
			Err(e) if e.kind == DirectoryErrorKind::Unavailable => {
				Err(IdentityError::Unavailable(e.message))
			}
			Err(e) => Err(IdentityError::Rejected(e.message)),
		}
	}

	/// Best-effort identity deletion for rollback.
	///
	/// The caller is already on an error path; failures are logged and
	/// swallowed, never surfaced.
	#[tracing::instrument(skip(self), fields(user_id = %id))]
	pub async fn delete_identity(&self, id: &UserId) {
		if let Err(e) = self.directory.delete_user(id).await {
			tracing::warn!(user_id = %id, error = %e, "rollback identity deletion failed");
		} else {
			tracing::debug!(user_id = %id, "identity deleted during rollback");
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::InMemoryDirectory;
	use elevate_auth::UserRole;

	fn metadata(name: &str) -> IdentityMetadata {
		IdentityMetadata {
			full_name: name.to_string(),
			role: UserRole::Student,
		}
	}

	fn service(directory: &Arc<InMemoryDirectory>) -> IdentityService {
		IdentityService::new(Arc::clone(directory) as Arc<dyn IdentityDirectory>)
	}

	#[tokio::test]
	async fn create_then_duplicate_is_already_exists() {
		let directory = Arc::new(InMemoryDirectory::new());
		let service = service(&directory);

		let id = service
			.create_identity("eleve@example.com", "motdepasse", metadata("Élève"))
			.await
			.unwrap();
		assert_eq!(directory.created_count(), 1);

		let err = service
			.create_identity("Eleve@Example.com", "autrepasse", metadata("Élève"))
			.await
			.unwrap_err();
		assert!(matches!(err, IdentityError::AlreadyExists));

		let found = service
			.find_identity_by_email("ELEVE@example.com")
			.await
			.unwrap()
			.unwrap();
		assert_eq!(found.id, id);
	}

	#[tokio::test]
	async fn find_scans_past_first_page() {
		let directory = Arc::new(InMemoryDirectory::new());
		for i in 0..250 {
			directory.seed_identity(&format!("user{i}@example.com"));
		}
		let wanted = directory.seed_identity("target@example.com");
		let service = service(&directory);

		let found = service
			.find_identity_by_email("target@example.com")
			.await
			.unwrap()
			.unwrap();
		assert_eq!(found.id, wanted);
		// 251 identities means the match sits on page 2.
		assert!(directory.list_calls() >= 2);
	}

	#[tokio::test]
	async fn find_returns_none_when_absent() {
		let directory = Arc::new(InMemoryDirectory::new());
		directory.seed_identity("someone@example.com");
		let service = service(&directory);

		let found = service
			.find_identity_by_email("nobody@example.com")
			.await
			.unwrap();
		assert!(found.is_none());
		// A short directory ends the scan after one page.
		assert_eq!(directory.list_calls(), 1);
	}

	#[tokio::test]
	async fn weak_password_surfaces_provider_message() {
		let directory = Arc::new(InMemoryDirectory::new());
		directory.reject_next_create("Password should be at least 6 characters");
		let service = service(&directory);

		let err = service
			.create_identity("eleve@example.com", "x", metadata("Élève"))
			.await
			.unwrap_err();
		match err {
			IdentityError::Rejected(message) => {
				assert_eq!(message, "Password should be at least 6 characters")
			}
			other => panic!("unexpected error: {other:?}"),
		}
	}

	#[tokio::test]
	async fn delete_identity_swallows_failures() {
		let directory = Arc::new(InMemoryDirectory::new());
		let service = service(&directory);

		// Deleting an unknown identity must not panic or error.
		service.delete_identity(&UserId::generate()).await;
	}

	#[tokio::test]
	async fn update_resets_password() {
		let directory = Arc::new(InMemoryDirectory::new());
		let id = directory.seed_identity("eleve@example.com");
		let service = service(&directory);

		service
			.update_identity_password(&id, "nouveaumotdepasse", metadata("Élève"))
			.await
			.unwrap();
		assert_eq!(
			directory.password_of("eleve@example.com").as_deref(),
			Some("nouveaumotdepasse")
		);
	}
}
