//! Server runtime
//!
//! [`ServerHandle`] wires the storage backend, the availability manager,
//! pricing, the booking orchestrator, the event bus, the expiry sweep and
//! the REST API together, and tears them down again on shutdown.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use sea_orm::DatabaseConnection;
use sea_orm_migration::MigratorTrait;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::application::availability::AvailabilityManager;
use crate::application::booking::{start_booking_expiry_task, BookingService};
use crate::application::events::{create_event_bus, SharedEventBus};
use crate::application::locking::InProcessLockProvider;
use crate::application::pricing::PricingEngine;
use crate::config::{AppConfig, StorageBackend};
use crate::domain::{EventSink, NoopEventSink, RepositoryProvider};
use crate::infrastructure::{
    init_database, InMemoryRepositoryProvider, Migrator, SeaOrmRepositoryProvider,
};
use crate::interfaces::http::modules::metrics::prometheus_handle;
use crate::interfaces::http::{create_api_router, ApiState};
use crate::shared::{SharedClock, ShutdownCoordinator, ShutdownSignal, SystemClock};

// ── Options ────────────────────────────────────────────────────────

pub struct ServerOptions {
    pub config: AppConfig,
    /// Run database migrations on startup (default: true).
    pub auto_migrate: bool,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            config: AppConfig::default(),
            auto_migrate: true,
        }
    }
}

// ── ServerHandle ───────────────────────────────────────────────────

/// Handle to a running booking server.
///
/// ```rust,no_run
/// use hotel_booking::server::{ServerHandle, ServerOptions};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let handle = ServerHandle::start(ServerOptions::default()).await?;
///     handle.install_signal_handler();
///     handle.wait().await;
///     Ok(())
/// }
/// ```
pub struct ServerHandle {
    pub bookings: Arc<BookingService>,
    pub availability: Arc<AvailabilityManager>,
    /// `None` when messaging is disabled
    pub event_bus: Option<SharedEventBus>,
    pub config: AppConfig,
    /// Address the API actually bound (port 0 resolves here)
    pub local_addr: SocketAddr,

    db: Option<DatabaseConnection>,
    shutdown: ShutdownCoordinator,
    api_task: JoinHandle<()>,
    sweep_task: JoinHandle<()>,
}

impl ServerHandle {
    /// Start the server:
    /// 1. Install the Prometheus recorder
    /// 2. Open the storage backend and run migrations
    /// 3. Seed the room type catalog from config
    /// 4. Build services and start the expiry sweep
    /// 5. Serve the REST API with Swagger UI
    pub async fn start(opts: ServerOptions) -> Result<Self, Box<dyn std::error::Error>> {
        let cfg = opts.config;
        cfg.validate()?;
        info!("Starting hotel booking service...");

        let metrics = match prometheus_handle() {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!(error = %e, "Prometheus recorder unavailable, /metrics disabled");
                None
            }
        };

        // ── Storage ────────────────────────────────────────────
        let (repos, db) = match cfg.database.backend {
            StorageBackend::Sqlite => {
                let db = init_database(&cfg.database_config()).await?;
                if opts.auto_migrate {
                    info!("Running database migrations...");
                    Migrator::up(&db, None).await?;
                    info!("Migrations completed");
                }
                let repos: Arc<dyn RepositoryProvider> =
                    Arc::new(SeaOrmRepositoryProvider::new(db.clone()));
                (repos, Some(db))
            }
            StorageBackend::Memory => {
                warn!("Using in-memory storage; bookings are lost on restart");
                let repos: Arc<dyn RepositoryProvider> = Arc::new(InMemoryRepositoryProvider::new());
                (repos, None)
            }
        };

        let room_types = repos.room_types();
        for rt in cfg.seed_room_types() {
            info!(room_type_id = rt.id, property_id = rt.property_id, name = %rt.name, "Seeding room type");
            room_types.upsert(rt).await?;
        }

        // ── Events ─────────────────────────────────────────────
        let event_bus = cfg
            .messaging
            .enabled
            .then(|| create_event_bus(cfg.messaging.channel_capacity));
        let sink: Arc<dyn EventSink> = match &event_bus {
            Some(bus) => bus.clone() as Arc<dyn EventSink>,
            None => {
                info!("Messaging disabled, booking events are dropped");
                Arc::new(NoopEventSink)
            }
        };

        // ── Services ───────────────────────────────────────────
        let clock: SharedClock = Arc::new(SystemClock);
        let availability = Arc::new(AvailabilityManager::new(
            repos.ledger(),
            room_types.clone(),
            Arc::new(InProcessLockProvider::new()),
            cfg.availability_config(),
        ));
        let pricing = Arc::new(PricingEngine::new(availability.clone(), clock.clone()));
        let bookings = Arc::new(BookingService::new(
            repos.bookings(),
            room_types,
            availability.clone(),
            pricing.clone(),
            sink,
            clock,
            cfg.booking_config(),
        ));

        let shutdown = ShutdownCoordinator::new(cfg.server.shutdown_timeout);
        let shutdown_signal = shutdown.signal();

        if let Some(bus) = &event_bus {
            start_event_log(bus.clone(), shutdown_signal.clone());
        }
        let sweep_task = start_booking_expiry_task(
            bookings.clone(),
            shutdown_signal.clone(),
            cfg.sweep_interval(),
        );

        // ── REST API ───────────────────────────────────────────
        let router = create_api_router(
            ApiState {
                bookings: bookings.clone(),
                availability: availability.clone(),
                pricing,
                currency: cfg.booking.currency.clone(),
                db: db.clone(),
                started_at: Arc::new(Instant::now()),
            },
            metrics,
        );

        let addr = format!("{}:{}", cfg.server.host, cfg.server.port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        let local_addr = listener.local_addr()?;
        info!("REST API listening on http://{}", local_addr);
        info!("Swagger UI available at http://{}/docs/", local_addr);

        let api_shutdown = shutdown_signal.clone();
        let api_task = tokio::spawn(async move {
            let served = axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    api_shutdown.wait().await;
                    info!("REST API received shutdown signal");
                })
                .await;
            if let Err(e) = served {
                error!(error = %e, "REST API server error");
            }
        });

        Ok(Self {
            bookings,
            availability,
            event_bus,
            config: cfg,
            local_addr,
            db,
            shutdown,
            api_task,
            sweep_task,
        })
    }

    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.signal()
    }

    /// Trigger shutdown on SIGTERM / SIGINT.
    pub fn install_signal_handler(&self) {
        self.shutdown.start_signal_listener();
    }

    pub fn trigger_shutdown(&self) {
        self.shutdown.signal().trigger();
    }

    /// Block until shutdown has been triggered and every task has stopped,
    /// bounded by the configured shutdown timeout once triggered.
    pub async fn wait(self) {
        let Self {
            db,
            shutdown,
            api_task,
            sweep_task,
            ..
        } = self;

        shutdown.signal().wait().await;
        info!("Waiting for server tasks to complete...");

        shutdown
            .run_cleanup(|| async move {
                if let Err(e) = api_task.await {
                    error!(error = %e, "REST API task panicked");
                }
                if let Err(e) = sweep_task.await {
                    error!(error = %e, "Expiry sweep task panicked");
                }
            })
            .await;

        if let Some(db) = db {
            match db.close().await {
                Ok(()) => info!("Database connection closed"),
                Err(e) => warn!(error = %e, "Error closing database connection"),
            }
        }
        info!("Hotel booking service stopped");
    }

    pub async fn shutdown(self) {
        self.trigger_shutdown();
        self.wait().await;
    }

    pub fn is_running(&self) -> bool {
        !self.api_task.is_finished()
    }
}

// ── Helpers ────────────────────────────────────────────────────────

/// Log every published booking event until shutdown.
fn start_event_log(bus: SharedEventBus, shutdown: ShutdownSignal) {
    let mut subscriber = bus.subscribe();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                msg = subscriber.recv() => match msg {
                    Some(msg) => info!(
                        topic = %msg.topic,
                        key = %msg.key,
                        event_type = msg.event_type,
                        "Booking event"
                    ),
                    None => break,
                },
                _ = shutdown.wait() => break,
            }
        }
    });
}

/// Initialize tracing from the logging section.
///
/// Call once at process startup, before [`ServerHandle::start`].
pub fn init_tracing(config: &AppConfig) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    if config.logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}
