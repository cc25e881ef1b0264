// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! In-memory [`IdentityDirectory`] for workflow tests.
//!
//! Records call counts and supports scripted failures so tests can assert
//! rollback behavior and the never-invoked-lookup property.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use elevate_auth::{UserId, UserRole};

use crate::directory::{IdentityDirectory, IdentityRecord, IdentityUpdate, NewIdentity};
use crate::error::DirectoryError;

#[derive(Debug, Clone)]
struct StoredIdentity {
	id: UserId,
	email: String,
	password: String,
	full_name: String,
	role: UserRole,
	created_at: chrono::DateTime<Utc>,
}

#[derive(Default)]
struct State {
	identities: Vec<StoredIdentity>,
	scripted_create_failures: VecDeque<DirectoryError>,
	scripted_update_failures: VecDeque<DirectoryError>,
	created: usize,
	updated: usize,
	deleted: usize,
	list_calls: usize,
}

/// Deterministic in-memory directory.
#[derive(Default)]
pub struct InMemoryDirectory {
	state: Mutex<State>,
}

impl InMemoryDirectory {
	pub fn new() -> Self {
		Self::default()
	}

	/// Insert an identity directly, bypassing counters.
	pub fn seed_identity(&self, email: &str) -> UserId {
		let id = UserId::generate();
		let mut state = self.state.lock().unwrap();
		state.identities.push(StoredIdentity {
			id,
			email: email.to_string(),
			password: "seeded-password".to_string(),
			full_name: String::new(),
			role: UserRole::Student,
			created_at: Utc::now(),
		});
		id
	}

	/// Make the next `create_user` call fail with a provider rejection.
	pub fn reject_next_create(&self, message: &str) {
		self
			.state
			.lock()
			.unwrap()
			.scripted_create_failures
			.push_back(DirectoryError::rejected(message));
	}

	/// Make the next `create_user` call fail as a duplicate even if no
	/// matching identity is stored ("exists but could not reconcile").
	pub fn duplicate_next_create(&self) {
		self
			.state
			.lock()
			.unwrap()
			.scripted_create_failures
			.push_back(DirectoryError::already_exists(
				"A user with this email address has already been registered",
			));
	}

	/// Make the next `update_user_by_id` call fail.
	pub fn fail_next_update(&self, message: &str) {
		self
			.state
			.lock()
			.unwrap()
			.scripted_update_failures
			.push_back(DirectoryError::unavailable(message));
	}

	pub fn created_count(&self) -> usize {
		self.state.lock().unwrap().created
	}

	pub fn updated_count(&self) -> usize {
		self.state.lock().unwrap().updated
	}

	pub fn deleted_count(&self) -> usize {
		self.state.lock().unwrap().deleted
	}

	pub fn list_calls(&self) -> usize {
		self.state.lock().unwrap().list_calls
	}

	/// True if an identity with this ID is currently stored.
	pub fn contains_id(&self, id: &UserId) -> bool {
		self
			.state
			.lock()
			.unwrap()
			.identities
			.iter()
			.any(|i| i.id == *id)
	}

	pub fn password_of(&self, email: &str) -> Option<String> {
		let target = email.to_lowercase();
		self
			.state
			.lock()
			.unwrap()
			.identities
			.iter()
			.find(|i| i.email.to_lowercase() == target)
			.map(|i| i.password.clone())
	}

	fn record_from(identity: &StoredIdentity) -> IdentityRecord {
		IdentityRecord {
			id: identity.id,
			email: identity.email.clone(),
			email_confirmed: true,
			created_at: Some(identity.created_at),
		}
	}
}

#[async_trait]
impl IdentityDirectory for InMemoryDirectory {
	async fn create_user(&self, new: &NewIdentity) -> Result<IdentityRecord, DirectoryError> {
		let mut state = self.state.lock().unwrap();

		if let Some(failure) = state.scripted_create_failures.pop_front() {
			return Err(failure);
		}

		let target = new.email.to_lowercase();
		if state
			.identities
			.iter()
			.any(|i| i.email.to_lowercase() == target)
		{
			return Err(DirectoryError::already_exists(
				"A user with this email address has already been registered",
			));
		}

		let identity = StoredIdentity {
			id: UserId::generate(),
			email: new.email.clone(),
			password: new.password.clone(),
			full_name: new.metadata.full_name.clone(),
			role: new.metadata.role,
			created_at: Utc::now(),
		};
		let record = Self::record_from(&identity);
		state.identities.push(identity);
		state.created += 1;
		Ok(record)
	}

	async fn update_user_by_id(
		&self,
		id: &UserId,
		update: &IdentityUpdate,
	) -> Result<(), DirectoryError> {
		let mut state = self.state.lock().unwrap();

		if let Some(failure) = state.scripted_update_failures.pop_front() {
			return Err(failure);
		}

		let Some(identity) = state.identities.iter_mut().find(|i| i.id == *id) else {
			return Err(DirectoryError::not_found(format!("user {id} not found")));
		};

		identity.password = update.password.clone();
		identity.full_name = update.metadata.full_name.clone();
		identity.role = update.metadata.role;
		state.updated += 1;
		Ok(())
	}

	async fn delete_user(&self, id: &UserId) -> Result<(), DirectoryError> {
		let mut state = self.state.lock().unwrap();
		let before = state.identities.len();
		state.identities.retain(|i| i.id != *id);

		if state.identities.len() == before {
			return Err(DirectoryError::not_found(format!("user {id} not found")));
		}

		state.deleted += 1;
		Ok(())
	}

	async fn list_users(
		&self,
		page: u32,
		per_page: u32,
	) -> Result<Vec<IdentityRecord>, DirectoryError> {
		let mut state = self.state.lock().unwrap();
		state.list_calls += 1;

		let offset = (page.saturating_sub(1) as usize) * per_page as usize;
		Ok(state
			.identities
			.iter()
			.skip(offset)
			.take(per_page as usize)
			.map(Self::record_from)
			.collect())
	}
}
