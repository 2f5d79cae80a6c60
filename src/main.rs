//! Kinship - relationship reconciliation for on-chain social attestations

use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kinship::{
    cache::MemoryCache,
    config::Args,
    db::MongoClient,
    directory::HttpDirectory,
    identity::AddressIdentityResolver,
    store::MongoRecordStore,
    FriendshipQueryService,
};

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
                .unwrap_or_else(|_| format!("kinship={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Validate configuration
    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  Kinship - relationship reconciler");
    info!("======================================");
    info!("Started: {}", chrono::Utc::now().to_rfc3339());
    info!("Subject: {}", args.subject);
    info!("MongoDB: {} (db '{}')", args.mongodb_uri, args.mongodb_db);
    info!("Directory: {}", args.directory_url);
    info!("Resolve concurrency: {}", args.resolve_concurrency);
    info!("======================================");

    // Connect to MongoDB
    let mongo = match MongoClient::new(&args.mongodb_uri, &args.mongodb_db).await {
        Ok(client) => client,
        Err(e) => {
            error!("MongoDB connection failed: {}", e);
            std::process::exit(1);
        }
    };

    // Wire services
    let directory = Arc::new(HttpDirectory::new(
        &args.directory_url,
        Duration::from_millis(args.directory_timeout_ms),
    ));
    let cache = Arc::new(MemoryCache::new(args.cache_max_entries));
    let resolver = Arc::new(AddressIdentityResolver::new(
        directory.clone(),
        cache,
    ));
    let store = Arc::new(MongoRecordStore::new(&mongo).await?);

    let service = FriendshipQueryService::new(
        directory,
        Arc::clone(&resolver),
        store,
        args.resolve_concurrency,
    );

    // Run one reconciliation and print the classified result
    match service.relationships(&args.subject).await {
        Ok(result) => {
            println!("{}", serde_json::to_string_pretty(&result)?);
            let stats = resolver.stats();
            info!(
                hits = stats.hits,
                misses = stats.misses,
                negatives = stats.negatives,
                failures = stats.failures,
                "resolution cache stats"
            );
            Ok(())
        }
        Err(kinship::KinshipError::IdentityNotFound(subject)) => {
            error!("Subject identity not found: {}", subject);
            std::process::exit(4);
        }
        Err(e) => {
            error!("Reconciliation failed: {}", e);
            std::process::exit(1);
        }
    }
}
