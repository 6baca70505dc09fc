//! Hotel room inventory server
//!
//! Serves booking and availability queries over HTTP, backed by PostgreSQL
//! and a sharded Redis cache.

use actix_web::{middleware, web, App, HttpResponse, HttpServer};
use anyhow::Context;
use hotelres_api::{configure_inventory, health_check, ReservationService};
use hotelres_cache::{CacheConnector, MemoryConnector, RedisConnector, ResetLimiter, ResilientCache};
use hotelres_core::config::LoggingConfig;
use hotelres_core::AppConfig;
use hotelres_db::{create_pool_from_config, run_migrations, PgRecordStore};
use hotelres_services::AvailabilityEngine;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Configure API routes
fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            // Health check
            .route("/health", web::get().to(health_check))
            // Booking and availability endpoints
            .configure(configure_inventory),
    );
}

/// Initialize tracing/logging
fn init_tracing(logging: &LoggingConfig) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "hotelres={lvl},hotelres_api={lvl},hotelres_services={lvl},hotelres_cache={lvl},hotelres_db={lvl},actix_web=info,sqlx=warn",
            lvl = logging.level
        ))
    });

    let registry = tracing_subscriber::registry().with(env_filter);
    if logging.json {
        registry.with(fmt::layer().json().with_current_span(true)).init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .init();
    }
}

/// Connect the shared cache client
async fn connect_cache(config: &AppConfig) -> anyhow::Result<ResilientCache> {
    let connector: Arc<dyn CacheConnector> = if config.cache.is_memory() {
        warn!("Using in-process cache; counts are not shared between instances");
        Arc::new(MemoryConnector::new())
    } else {
        Arc::new(RedisConnector::new())
    };

    let limiter = ResetLimiter::from_config(&config.retry);
    ResilientCache::connect(connector, &config.cache, &config.retry, limiter)
        .await
        .context("Failed to connect to cache")
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;

    // Initialize logging
    init_tracing(&config.logging);

    info!("Starting hotelres v{}", env!("CARGO_PKG_VERSION"));

    info!("Connecting to database...");
    let pool = create_pool_from_config(&config.database)
        .await
        .context("Failed to create database pool")?;
    if config.database.run_migrations {
        run_migrations(&pool)
            .await
            .context("Failed to run migrations")?;
    }

    info!(servers = ?config.cache.servers, "Connecting to cache...");
    let cache = connect_cache(&config).await?;

    let engine = AvailabilityEngine::new(Arc::new(PgRecordStore::new(pool.clone())), cache.clone());
    let service: Arc<dyn ReservationService> = Arc::new(engine);

    let bind_addr = config.server_addr();
    info!(
        "Starting HTTP server on {} with {} workers",
        bind_addr, config.server.workers
    );

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::from(Arc::clone(&service)))
            // Middleware
            .wrap(TracingLogger::default())
            .wrap(middleware::NormalizePath::trim())
            // Configure routes
            .configure(configure_routes)
            // Root redirect to health
            .route(
                "/",
                web::get().to(|| async {
                    HttpResponse::Found()
                        .append_header(("Location", "/api/v1/health"))
                        .finish()
                }),
            )
    })
    .workers(config.server.workers)
    .bind(&bind_addr)
    .with_context(|| format!("Failed to bind {}", bind_addr))?
    .run()
    .await?;

    info!("Server stopped, closing connections");
    if let Err(e) = cache.close().await {
        warn!(error = %e, "Failed to close cache connection");
    }
    pool.close().await;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hotelres_core::config::{CacheConfig, DatabaseConfig, RetryConfig, ServerConfig};

    fn memory_config() -> AppConfig {
        AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8087,
                workers: 1,
            },
            database: DatabaseConfig {
                url: "postgresql://localhost/hotelres".to_string(),
                max_connections: 1,
                acquire_timeout_secs: 1,
                run_migrations: false,
            },
            cache: CacheConfig {
                servers: vec!["memory".to_string()],
                op_timeout_ms: 500,
            },
            retry: RetryConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    #[test]
    fn test_connect_memory_cache() {
        let config = memory_config();
        let cache = tokio_test::block_on(connect_cache(&config)).unwrap();

        assert_eq!(cache.reset_count(), 0);
        assert_eq!(config.server_addr(), "127.0.0.1:8087");
    }
}
