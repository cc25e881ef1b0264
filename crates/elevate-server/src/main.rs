// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Elevate HTTP server binary.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tower_http::{
	cors::{Any, CorsLayer},
	trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use elevate_activity::ActivityRecorder;
use elevate_api::ApiState;
use elevate_db::{
	ActivityEventRepository, ClassRepository, EnrollmentRepository, MembershipRepository,
	ProfileRepository, RosterRepository, SessionRepository, SubmissionRepository,
};
use elevate_identity::{HttpIdentityDirectory, IdentityDirectory, IdentityService};
use elevate_provisioning::{EnrollmentService, GradingService, LevelService};

/// Elevate server - HTTP backend for the Elevate language-learning app.
#[derive(Parser, Debug)]
#[command(name = "elevate-server", about = "Elevate HTTP server", version)]
struct Args {
	/// Path to a TOML config file (defaults to /etc/elevate/server.toml)
	#[arg(long)]
	config: Option<PathBuf>,

	/// Subcommands for elevate-server (e.g., `version`)
	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Show version information
	Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	// Parse CLI arguments
	let args = Args::parse();

	if let Some(Command::Version) = args.command {
		println!("elevate-server {}", env!("CARGO_PKG_VERSION"));
		return Ok(());
	}

	// Load .env file if present
	dotenvy::dotenv().ok();

	// Load configuration
	let config = match args.config {
		Some(path) => elevate_config::load_config_with_file(path)?,
		None => elevate_config::load_config()?,
	};

	// Setup tracing
	tracing_subscriber::registry()
		.with(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| config.logging.level.clone().into()),
		)
		.with(tracing_subscriber::fmt::layer())
		.init();

	tracing::info!(
			host = %config.http.host,
			port = config.http.port,
			database = %config.database.url,
			"starting elevate-server"
	);

	// Create database pool and run migrations
	let pool = elevate_db::create_pool(&config.database.url).await?;
	elevate_db::run_migrations(&pool).await?;

	// Identity directory client
	if !config.identity.is_configured() {
		tracing::warn!("identity service key not configured, provisioning calls will fail");
	}
	let directory = Arc::new(HttpIdentityDirectory::new(
		config.identity.base_url.clone(),
		config.identity.service_key.clone(),
	)) as Arc<dyn IdentityDirectory>;
	let identity = IdentityService::new(directory);

	// Repositories and services
	let classes = Arc::new(ClassRepository::new(pool.clone()));
	let profiles = Arc::new(ProfileRepository::new(pool.clone()));
	let memberships = Arc::new(MembershipRepository::new(pool.clone()));
	let enrollments = Arc::new(EnrollmentRepository::new(pool.clone()));
	let submissions = Arc::new(SubmissionRepository::new(pool.clone()));
	let roster = Arc::new(RosterRepository::new(pool.clone()));
	let activity_events = Arc::new(ActivityEventRepository::new(pool.clone()));
	let activity = Arc::new(ActivityRecorder::new(activity_events.clone()));

	let state = ApiState {
		sessions: Arc::new(SessionRepository::new(pool.clone())),
		enrollment: Arc::new(EnrollmentService::new(
			identity,
			classes.clone(),
			profiles.clone(),
			memberships,
			enrollments.clone(),
			activity.clone(),
		)),
		levels: Arc::new(LevelService::new(
			classes.clone(),
			enrollments.clone(),
			profiles.clone(),
			activity.clone(),
		)),
		grading: Arc::new(GradingService::new(
			classes.clone(),
			enrollments.clone(),
			submissions,
			activity.clone(),
		)),
		classes,
		enrollments,
		roster,
		profiles,
		activity_events,
		activity,
	};

	let app = elevate_api::api_routes(state)
		.layer(TraceLayer::new_for_http())
		.layer(
			CorsLayer::new()
				.allow_origin(Any)
				.allow_methods(Any)
				.allow_headers(Any),
		);

	// Start server
	let addr = config.socket_addr();
	tracing::info!("listening on {}", addr);

	let listener = tokio::net::TcpListener::bind(&addr).await?;

	// Run server with graceful shutdown
	tokio::select! {
		result = axum::serve(listener, app) => {
			if let Err(e) = result {
				tracing::error!(error = %e, "server error");
			}
		}
		_ = tokio::signal::ctrl_c() => {
			tracing::info!("received shutdown signal");
		}
	}

	tracing::info!("server shutdown complete");
	Ok(())
}
