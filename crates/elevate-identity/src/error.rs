// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::fmt;

/// Structural classification of a directory failure.
///
/// The orchestrator branches on this kind only; how a concrete directory
/// implementation derives it (status codes, message text) stays behind the
/// trait boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectoryErrorKind {
	/// An identity with this email is already registered.
	AlreadyExists,
	/// No identity exists with this ID.
	NotFound,
	/// The provider rejected the request (e.g. weak password); the message
	/// is safe to surface to the caller.
	Rejected,
	/// Transport failure or unexpected provider response.
	Unavailable,
}

impl fmt::Display for DirectoryErrorKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			DirectoryErrorKind::AlreadyExists => write!(f, "already_exists"),
			DirectoryErrorKind::NotFound => write!(f, "not_found"),
			DirectoryErrorKind::Rejected => write!(f, "rejected"),
			DirectoryErrorKind::Unavailable => write!(f, "unavailable"),
		}
	}
}

/// A failure returned by an [`crate::IdentityDirectory`] implementation.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct DirectoryError {
	pub kind: DirectoryErrorKind,
	pub message: String,
}

impl DirectoryError {
	pub fn new(kind: DirectoryErrorKind, message: impl Into<String>) -> Self {
		Self {
			kind,
			message: message.into(),
		}
	}

	pub fn already_exists(message: impl Into<String>) -> Self {
		Self::new(DirectoryErrorKind::AlreadyExists, message)
	}

	pub fn not_found(message: impl Into<String>) -> Self {
		Self::new(DirectoryErrorKind::NotFound, message)
	}

	pub fn rejected(message: impl Into<String>) -> Self {
		Self::new(DirectoryErrorKind::Rejected, message)
	}

	pub fn unavailable(message: impl Into<String>) -> Self {
		Self::new(DirectoryErrorKind::Unavailable, message)
	}
}

/// Errors surfaced by [`crate::IdentityService`].
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
	/// An identity with this email already exists; callers are expected to
	/// fall into the reconciliation branch.
	#[error("identity already exists")]
	AlreadyExists,

	/// The provider rejected the operation; the message is surfaced verbatim.
	#[error("{0}")]
	Rejected(String),

	/// The directory could not be reached or answered unexpectedly.
	#[error("identity directory unavailable: {0}")]
	Unavailable(String),
}
