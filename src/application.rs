//! Application assembly: container wiring, admin bootstrap, route mounting, serving.

use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::sync::Arc;

use axum::middleware::from_fn_with_state;
use axum::{Extension, Router};
use serde_json::Value;
use thiserror::Error;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use crate::auth::{
    authenticate, generate_random_password, AuthController, AuthError, AuthService, AuthState, ModelRegistry,
    TokenService, UserModel,
};
use crate::cache::{CacheClient, CacheError, CacheHandle};
use crate::config::{ConfigError, Settings};
use crate::constructor::Injectable;
use crate::container::Container;
use crate::controller::Controller;
use crate::error::{DiError, DiResult};
use crate::events::{EventBus, EventSubscriber};
use crate::key::Key;
use crate::lifetime::ServiceOptions;
use crate::web::{
    rate_limit, with_security_headers, ApiDoc, RateLimit, RouteError, RouteTable, API_TITLE, API_VERSION,
};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Di(#[from] DiError),
    #[error(transparent)]
    Route(#[from] RouteError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error("JWT_SECRET must be set when authentication is enabled")]
    MissingJwtSecret,
    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

type Module = Box<dyn FnOnce(&Container) -> DiResult<()> + Send>;
type Mount = fn(&mut RouteTable) -> Result<usize, RouteError>;
type Subscribe = fn(&Container, &EventBus) -> DiResult<()>;

/// Collects services, controllers and infrastructure before startup.
pub struct ApplicationBuilder {
    settings: Settings,
    container: Container,
    modules: Vec<(String, Module)>,
    controllers: Vec<Mount>,
    cache: Option<CacheHandle>,
    models: Vec<(String, Arc<dyn UserModel>)>,
    routers: Vec<Router>,
    subscribers: Vec<Subscribe>,
    schemas: Vec<(String, Value)>,
}

impl ApplicationBuilder {
    /// Uses `container` instead of a fresh one.
    pub fn container(mut self, container: Container) -> Self {
        self.container = container;
        self
    }

    /// Registers `T` under its constructor name.
    pub fn service<T: Injectable>(self, options: ServiceOptions) -> Self {
        let name = T::constructor().name().to_string();
        self.module(name, move |container| {
            container.add_service::<T>(options);
            Ok(())
        })
    }

    /// Runs a registration block at startup. A failing block is logged and skipped.
    pub fn module<F>(mut self, name: impl Into<String>, register: F) -> Self
    where
        F: FnOnce(&Container) -> DiResult<()> + Send + 'static,
    {
        self.modules.push((name.into(), Box::new(register)));
        self
    }

    pub fn controller<C: Controller>(mut self) -> Self {
        self.controllers.push(|table| table.mount::<C>());
        self
    }

    pub fn cache(mut self, client: Arc<dyn CacheClient>) -> Self {
        self.cache = Some(CacheHandle::new(client));
        self
    }

    /// Makes `model` available to the authentication service under `name`.
    pub fn user_model(mut self, name: impl Into<String>, model: Arc<dyn UserModel>) -> Self {
        self.models.push((name.into(), model));
        self
    }

    /// Resolves `T` at startup and lets it bind its event handlers.
    ///
    /// `T` must be registered, for example with [`service`](Self::service).
    pub fn subscriber<T: EventSubscriber>(mut self) -> Self {
        self.subscribers.push(|container, events| {
            let subscriber = container.resolve_type::<T>()?;
            subscriber.subscribe(events);
            Ok(())
        });
        self
    }

    /// Publishes a JSON schema under `components.schemas` of the API docs.
    pub fn schema(mut self, name: impl Into<String>, schema: Value) -> Self {
        self.schemas.push((name.into(), schema));
        self
    }

    /// Merges plain axum routes next to the controller routes.
    pub fn routes(mut self, router: Router) -> Self {
        self.routers.push(router);
        self
    }

    fn resolve_cache(&mut self) -> Result<CacheHandle, StartupError> {
        if let Some(cache) = self.cache.take() {
            return Ok(cache);
        }
        #[cfg(feature = "redis")]
        if let Some(host) = &self.settings.redis_host {
            let client = crate::cache::RedisCache::open(host, self.settings.redis_port)?;
            return Ok(CacheHandle::new(Arc::new(client)));
        }
        if self.settings.redis_host.is_some() && !cfg!(feature = "redis") {
            warn!("REDIS_HOST is set but redis support is not compiled in, caching disabled");
        }
        Ok(CacheHandle::none())
    }

    /// Wires the container, bootstraps the admin user, binds event subscribers
    /// and mounts every controller behind the server-wide layers.
    pub async fn build(mut self) -> Result<Application, StartupError> {
        let secret = match &self.settings.jwt_secret {
            Some(secret) => secret.clone(),
            None if self.settings.auth_enabled => return Err(StartupError::MissingJwtSecret),
            None => {
                warn!("JWT_SECRET not set, signing tokens with a per-process random secret");
                generate_random_password(32)
            }
        };
        let cache = self.resolve_cache()?;
        let settings = Arc::new(self.settings);
        let container = self.container;

        container.register_shared(Key::of::<Settings>(), settings.clone());
        container.register_instance(Key::of::<CacheHandle>(), cache.clone());
        let registry = ModelRegistry::new();
        for (name, model) in self.models {
            registry.register(name, model);
        }
        container.register_instance(Key::of::<ModelRegistry>(), registry);
        let tokens = Arc::new(TokenService::new(&secret));
        container.register_shared(Key::of::<TokenService>(), tokens.clone());
        let events = EventBus::default();
        container.register_instance(Key::of::<EventBus>(), events.clone());

        for (name, register) in self.modules {
            match register(&container) {
                Ok(()) => debug!(module = %name, "module loaded"),
                Err(err) => error!(module = %name, error = %err, "failed to load module, skipping"),
            }
        }

        container.add_service::<AuthService>(ServiceOptions::singleton());
        let auth = container.resolve_type::<AuthService>()?;
        auth.bootstrap_admin_user().await?;

        for subscribe in self.subscribers {
            subscribe(&container, &events)?;
        }
        debug!(handlers = events.handler_count(), "event handlers bound");

        let mut routes = RouteTable::new(container.clone());
        routes.mount::<AuthController>()?;
        for mount in self.controllers {
            mount(&mut routes)?;
        }
        info!(routes = routes.len(), "routes registered");

        let mut docs = ApiDoc::new(API_TITLE, API_VERSION);
        for (name, schema) in self.schemas {
            docs.schema(name, schema);
        }
        routes.describe(&mut docs);

        let mut router = routes.into_router().merge(docs.into_router());
        for extra in self.routers {
            router = router.merge(extra);
        }
        router = router.fallback_service(ServeDir::new(&settings.public_dir));
        if settings.auth_enabled {
            let state = AuthState::new(tokens, cache, settings.public_routes.iter().cloned());
            router = router.layer(from_fn_with_state(state, authenticate));
        }
        router = router.layer(Extension(container.clone()));
        match NonZeroU32::new(settings.rate_limit_per_minute) {
            Some(max) => router = router.layer(from_fn_with_state(RateLimit::per_minute(max), rate_limit)),
            None => debug!("rate limiting disabled"),
        }
        let router = with_security_headers(router).layer(TraceLayer::new_for_http());

        Ok(Application {
            settings,
            container,
            events,
            router,
        })
    }
}

/// A fully wired application.
///
/// # Examples
///
/// ```no_run
/// use lightspring::{config::Settings, Application};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let settings = Settings::from_env()?;
///     lightspring::logging::init(&settings.log_level);
///     Application::builder(settings).build().await?.run().await?;
///     Ok(())
/// }
/// ```
pub struct Application {
    settings: Arc<Settings>,
    container: Container,
    events: EventBus,
    router: Router,
}

impl Application {
    pub fn builder(settings: Settings) -> ApplicationBuilder {
        ApplicationBuilder {
            settings,
            container: Container::new(),
            modules: Vec::new(),
            controllers: Vec::new(),
            cache: None,
            models: Vec::new(),
            routers: Vec::new(),
            subscribers: Vec::new(),
            schemas: Vec::new(),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serves on `0.0.0.0:<port>` until the process stops.
    ///
    /// Peer addresses are recorded for the rate limiter.
    pub async fn run(self) -> Result<(), StartupError> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.settings.port));
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!(%addr, "server listening");
        axum::serve(listener, self.router.into_make_service_with_connect_info::<SocketAddr>()).await?;
        Ok(())
    }
}
