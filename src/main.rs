//! Cathedra - topic assignment service for academic course streams
//!
//! "Ex cathedra" - from the chair

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cathedra::auth::Role;
use cathedra::config::Args;
use cathedra::registry::{MemberRole, Registry};
use cathedra::server::{self, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    // Parse command line arguments
    let args = Args::parse();

    // Initialize tracing/logging
    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("cathedra={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Validate configuration
    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    // Print startup banner
    info!("======================================");
    info!("  Cathedra - Topic Assignment Service");
    info!("  \"Ex cathedra\"");
    info!("======================================");
    info!("Node ID: {}", args.node_id);
    info!("Listen: {}", args.listen);
    info!(
        "Mode: {}",
        if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" }
    );
    match &args.data_path {
        Some(path) => info!("Snapshot: {}", path.display()),
        None => info!("Snapshot: disabled (memory only)"),
    }
    info!("======================================");

    // Open the registry, restoring the snapshot if one is configured
    let registry = match &args.data_path {
        Some(path) => match Registry::with_snapshot(path) {
            Ok(registry) => Arc::new(registry),
            Err(e) => {
                error!("Failed to open registry snapshot: {}", e);
                std::process::exit(1);
            }
        },
        None => Arc::new(Registry::new()),
    };

    // Seed demo records in development mode
    if args.dev_mode {
        if let Err(e) = seed_dev_records(&registry).await {
            error!("Failed to seed development records: {}", e);
            std::process::exit(1);
        }
    }

    let state = Arc::new(AppState::new(args, registry));
    server::run(state).await?;

    Ok(())
}

/// Seed a demo specialty, stream, teacher, and student so a fresh dev node
/// is immediately usable. Skipped when the snapshot already holds streams.
async fn seed_dev_records(registry: &Registry) -> cathedra::Result<()> {
    if registry.stats().await.streams > 0 {
        info!("Dev seed skipped: registry already has streams");
        return Ok(());
    }

    let specialty = registry
        .create_specialty("121", "Software Engineering")
        .await?;
    let stream = registry
        .create_stream("SE-2025", &specialty.code, "2025-2026", 1, 4)
        .await?;

    let teacher = uuid::Uuid::new_v4();
    let student = uuid::Uuid::new_v4();
    registry.enroll(stream.id, teacher, MemberRole::Teacher).await?;
    registry.enroll(stream.id, student, MemberRole::Student).await?;

    info!("Dev seed: stream {} ({})", stream.id, stream.name);
    info!(
        "Dev seed: teacher {} (send '{}: {}' / '{}: {}')",
        teacher,
        cathedra::auth::identity::IDENTITY_ID_HEADER,
        teacher,
        cathedra::auth::identity::IDENTITY_ROLE_HEADER,
        Role::Teacher
    );
    info!("Dev seed: student {}", student);

    Ok(())
}
