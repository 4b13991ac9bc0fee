//! HTTP server setup.
//!
//! # Responsibilities
//! - Build the dispatcher from config and route declarations
//! - Create the Axum router: every method and path goes to the dispatcher
//! - Wire up HTTP-level layers (tracing, body limit)
//! - Apply config updates by swapping the dispatcher
//! - Serve until shutdown

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};
use url::Url;

use crate::config::{validate_config, AppConfig, ConfigError, ValidationError};
use crate::http::legacy::LegacyProxy;
use crate::http::middleware::MiddlewareDefaults;
use crate::http::request::{RequestIdAllocator, StorageHandle};
use crate::observability::metrics;
use crate::plugin::{PluginError, Plugins};
use crate::routing::{BuildOptions, DispatchService, Dispatcher, RouteError, RouteSet, RouteTable};
use crate::security::SignedTokenAuth;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Route(#[from] RouteError),

    #[error(transparent)]
    Plugin(#[from] PluginError),

    #[error("invalid legacy url: {0}")]
    LegacyUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Build a dispatcher for `config`. Nothing is shared with earlier
/// dispatchers except the request id allocator.
pub fn build_dispatcher(
    config: AppConfig,
    routes: &RouteSet,
    storage: Option<StorageHandle>,
    request_ids: Arc<RequestIdAllocator>,
) -> Result<Dispatcher, ServerError> {
    validate_config(&config).map_err(ConfigError::Validation)?;

    let primary_secret: Arc<str> = config
        .primary_secret()
        .map(Arc::from)
        .ok_or_else(|| ConfigError::Validation(vec![ValidationError::NoSecrets]))?;
    let legacy_handler = config
        .legacy
        .url
        .as_deref()
        .map(Url::parse)
        .transpose()?
        .map(|base| {
            LegacyProxy::new(base, Duration::from_secs(config.legacy.timeout_secs))
                .handler(Arc::clone(&primary_secret))
        });

    let options = BuildOptions {
        legacy_route_ids: config.routing.legacy_routes.iter().copied().collect(),
        disabled_route_ids: config.routing.disabled_routes.iter().copied().collect(),
        legacy_handler: legacy_handler.clone(),
        middleware: MiddlewareDefaults {
            primary_secret: Arc::clone(&primary_secret),
            request_timeout: config.request_timeout(),
            authenticator: Arc::new(SignedTokenAuth::new(config.secrets.clone())),
        },
    };
    let (table, versions) = RouteTable::build(routes, &options)?;
    let plugins = Plugins::from_names(&config.plugins.enabled)?;
    metrics::set_route_table_size(table.len());

    let mut dispatcher =
        Dispatcher::new(table, versions, primary_secret, Arc::new(config), request_ids)
            .with_plugins(plugins)
            .with_storage(storage);
    // Unclaimed requests belong to the legacy system when there is one.
    if let Some(legacy) = legacy_handler {
        dispatcher = dispatcher.with_catchall(legacy);
    }
    Ok(dispatcher)
}

/// The API server: a dispatcher behind an Axum router.
#[derive(Clone, Debug)]
pub struct ApiServer {
    routes: Arc<RouteSet>,
    storage: Option<StorageHandle>,
    request_ids: Arc<RequestIdAllocator>,
    max_body_size: usize,
    service: DispatchService,
}

impl ApiServer {
    pub fn new(config: AppConfig, routes: RouteSet) -> Result<Self, ServerError> {
        Self::with_storage(config, routes, None)
    }

    pub fn with_storage(
        config: AppConfig,
        routes: RouteSet,
        storage: Option<StorageHandle>,
    ) -> Result<Self, ServerError> {
        let request_ids = Arc::new(RequestIdAllocator::new());
        let max_body_size = config.listener.max_body_size;
        let dispatcher =
            build_dispatcher(config, &routes, storage.clone(), Arc::clone(&request_ids))?;
        tracing::info!(dispatcher = ?dispatcher, "Dispatcher ready");

        Ok(Self {
            routes: Arc::new(routes),
            storage,
            request_ids,
            max_body_size,
            service: DispatchService::new(dispatcher),
        })
    }

    /// The live dispatch service, for driving requests in-process.
    pub fn service(&self) -> DispatchService {
        self.service.clone()
    }

    /// Build the Axum router with all middleware layers.
    pub fn router(&self) -> Router {
        Router::new()
            .fallback_service(self.service.clone())
            .layer(RequestBodyLimitLayer::new(self.max_body_size))
            .layer(TraceLayer::new_for_http())
    }

    /// Rebuild the dispatcher for `config` and swap it in. On error the
    /// current dispatcher stays in place.
    pub fn reload(&self, config: AppConfig) -> Result<(), ServerError> {
        if config.listener.max_body_size != self.max_body_size {
            tracing::warn!("listener.max_body_size changes apply on restart only");
        }
        let dispatcher = build_dispatcher(
            config,
            &self.routes,
            self.storage.clone(),
            Arc::clone(&self.request_ids),
        )?;
        tracing::info!(dispatcher = ?dispatcher, "Configuration reloaded");
        self.service.swap(dispatcher);
        Ok(())
    }

    /// Run the server until `shutdown` fires, applying config updates as
    /// they arrive.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<AppConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let reloader = self.clone();
        let reload_task = tokio::spawn(async move {
            while let Some(config) = config_updates.recv().await {
                match reloader.reload(config) {
                    Ok(()) => metrics::record_reload(true),
                    Err(e) => {
                        metrics::record_reload(false);
                        tracing::error!(error = %e, "Rejected config update, keeping current routes");
                    }
                }
            }
        });

        let app = self.router();
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await;

        reload_task.abort();
        result?;
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
