use std::net::SocketAddr;
use std::sync::Arc;

use dronevault_api::{ApiDependencies, ApiServer};
use dronevault_config::AppConfig;
use dronevault_data::CatalogStore;
use dronevault_fsops::{ConversionPipeline, ConversionWorker, ProcessToolRunner, ToolPrograms};
use dronevault_telemetry::{GlobalContextGuard, LogFormat, LoggingConfig, Metrics, init_logging};
use tracing::{error, info};

use crate::error::{AppError, AppResult};

const BUILD_SHA: &str = match option_env!("DRONEVAULT_BUILD_SHA") {
    Some(sha) => sha,
    None => "dev",
};

/// Dependencies required to bootstrap the Dronevault server.
pub(crate) struct BootstrapDependencies {
    config: AppConfig,
}

impl BootstrapDependencies {
    /// Load configuration from the process environment.
    pub(crate) fn from_env() -> AppResult<Self> {
        let config = AppConfig::from_env().map_err(|err| AppError::config("config.from_env", err))?;
        Ok(Self { config })
    }
}

/// Services assembled from configuration, ready to be served.
pub(crate) struct AppServices {
    pub(crate) addr: SocketAddr,
    pub(crate) server: ApiServer,
}

/// Entry point for the Dronevault boot sequence.
///
/// # Errors
///
/// Returns an error if configuration, logging, the record store, or the HTTP
/// listener cannot be initialised, or if the server stops unexpectedly.
pub async fn run_app() -> AppResult<()> {
    let dependencies = BootstrapDependencies::from_env()?;
    run_app_with(dependencies).await
}

/// Boot sequence that relies entirely on injected dependencies.
pub(crate) async fn run_app_with(dependencies: BootstrapDependencies) -> AppResult<()> {
    let BootstrapDependencies { config } = dependencies;
    let format = LogFormat::resolve(config.telemetry.log_format.as_deref())
        .map_err(|err| AppError::telemetry("telemetry.log_format", err))?;
    init_logging(&LoggingConfig {
        level: &config.telemetry.log_level,
        format,
        build_sha: BUILD_SHA,
    })
    .map_err(|err| AppError::telemetry("telemetry.init", err))?;
    let _context = GlobalContextGuard::new("server");

    info!(
        download_root = %config.storage.download_root.display(),
        viewer_root = %config.storage.viewer_root.display(),
        layout = config.viewer.layout.as_str(),
        status_policy = config.status_policy.as_str(),
        workers = config.conversion.workers,
        "Dronevault bootstrap starting"
    );

    let services = build_services(&config).await?;
    let result = services
        .server
        .serve_with_shutdown(services.addr, shutdown_signal())
        .await
        .map_err(|err| AppError::api_server("api.serve", err));
    match &result {
        Ok(()) => info!("Dronevault stopped"),
        Err(err) => error!(error = %err, "server stopped with an error"),
    }
    result
}

/// Open the record store and wire the conversion worker and HTTP server.
pub(crate) async fn build_services(config: &AppConfig) -> AppResult<AppServices> {
    tokio::fs::create_dir_all(&config.storage.viewer_root)
        .await
        .map_err(|source| AppError::Io {
            operation: "viewer_root.create",
            path: Some(config.storage.viewer_root.clone()),
            source,
        })?;

    let catalog = if config.migrate_database {
        CatalogStore::connect_migrated(&config.database_url).await
    } else {
        CatalogStore::connect(&config.database_url).await
    }
    .map_err(|err| AppError::data("catalog.connect", err))?;
    let telemetry =
        Metrics::new().map_err(|err| AppError::telemetry("telemetry.metrics", err))?;

    let pipeline = ConversionPipeline::new(
        Arc::new(ProcessToolRunner::new(config.conversion.tool_timeout)),
        ToolPrograms {
            repair: config.conversion.repair_program.clone(),
            convert: config.conversion.convert_program.clone(),
        },
        telemetry.clone(),
    );
    let worker = ConversionWorker::new(pipeline, config.conversion.workers, telemetry.clone());

    let server = ApiServer::new(
        config,
        ApiDependencies {
            catalog: Arc::new(catalog),
            worker,
            telemetry,
        },
    )
    .map_err(|err| AppError::api_server("api.new", err))?;

    Ok(AppServices {
        addr: SocketAddr::new(config.http.bind_addr, config.http.port),
        server,
    })
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use dronevault_test_support::SurveyTree;
    use std::collections::HashMap;

    fn lookup(tree: &SurveyTree) -> HashMap<&'static str, String> {
        HashMap::from([
            ("DATABASE_URL", "sqlite::memory:".to_string()),
            ("DRONEVAULT_DOWNLOAD_ROOT", tree.download_root().display().to_string()),
            (
                "DRONEVAULT_VIEWER_ROOT",
                tree.outside().join("viewer-out").display().to_string(),
            ),
            ("DRONEVAULT_HTTP_PORT", "8088".to_string()),
            ("DRONEVAULT_BIND_ADDR", "127.0.0.1".to_string()),
            ("DRONEVAULT_DB_MIGRATE", "true".to_string()),
        ])
    }

    #[tokio::test]
    async fn services_are_wired_from_configuration() -> Result<(), Box<dyn std::error::Error>> {
        let tree = SurveyTree::new()?;
        let env = lookup(&tree);
        let config = AppConfig::load_with(|name| env.get(name).cloned(), &tree.outside())?;

        let services = build_services(&config).await?;
        assert_eq!(services.addr.to_string(), "127.0.0.1:8088");
        assert!(tree.outside().join("viewer-out").is_dir());
        drop(services.server.into_router());
        Ok(())
    }

    #[tokio::test]
    async fn missing_record_store_is_not_created_without_migration()
    -> Result<(), Box<dyn std::error::Error>> {
        let tree = SurveyTree::new()?;
        let db = tree.outside().join("dronedb.db");
        let mut env = lookup(&tree);
        env.insert("DATABASE_URL", format!("sqlite://{}", db.display()));
        env.remove("DRONEVAULT_DB_MIGRATE");
        let config = AppConfig::load_with(|name| env.get(name).cloned(), &tree.outside())?;

        let result = build_services(&config).await;
        assert!(matches!(
            result,
            Err(AppError::Data {
                operation: "catalog.connect",
                ..
            })
        ));
        assert!(!db.exists());
        Ok(())
    }

    #[tokio::test]
    async fn unknown_log_formats_fail_before_serving() -> Result<(), Box<dyn std::error::Error>> {
        let tree = SurveyTree::new()?;
        let mut env = lookup(&tree);
        env.insert("DRONEVAULT_LOG_FORMAT", "xml".to_string());
        let config = AppConfig::load_with(|name| env.get(name).cloned(), &tree.outside())?;

        let result = run_app_with(BootstrapDependencies { config }).await;
        assert!(matches!(
            result,
            Err(AppError::Telemetry {
                operation: "telemetry.log_format",
                ..
            })
        ));
        Ok(())
    }
}
