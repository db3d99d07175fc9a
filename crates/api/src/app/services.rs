//! Service wiring: which store backs the stock service, and under which
//! concurrency discipline.
//!
//! Collaborators are constructed here and passed explicitly — no ambient
//! singletons. The store is chosen at bootstrap: Postgres when
//! `DATABASE_URL` is set and reachable, in-memory otherwise. The write
//! discipline comes from `STOCKROOM_CONCURRENCY` (`optimistic` default,
//! `pessimistic` for lock-serialized hot records).

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;

use stockroom_events::{EventEnvelope, InMemoryEventBus};
use stockroom_infra::store::{InMemoryStockStore, PostgresStockStore, StockStore};
use stockroom_infra::{ConcurrencyMode, StockService};
use stockroom_stock::StockEvent;

/// The stock service as wired for this process: any store behind a trait
/// object, events fanned out on the in-memory bus.
pub type AppStockService =
    StockService<Arc<dyn StockStore>, Arc<InMemoryEventBus<EventEnvelope<StockEvent>>>>;

pub struct AppServices {
    service: AppStockService,
    backend: &'static str,
}

impl AppServices {
    pub fn in_memory(mode: ConcurrencyMode) -> Self {
        let store: Arc<dyn StockStore> = Arc::new(InMemoryStockStore::new());
        let bus = Arc::new(InMemoryEventBus::new());
        Self {
            service: StockService::new(store, bus, mode),
            backend: "in-memory",
        }
    }

    pub fn postgres(pool: sqlx::PgPool, mode: ConcurrencyMode) -> Self {
        let store: Arc<dyn StockStore> = Arc::new(PostgresStockStore::new(pool));
        let bus = Arc::new(InMemoryEventBus::new());
        Self {
            service: StockService::new(store, bus, mode),
            backend: "postgres",
        }
    }

    pub fn stock(&self) -> &AppStockService {
        &self.service
    }

    pub fn backend(&self) -> &'static str {
        self.backend
    }
}

/// Wire services from the environment.
pub async fn build_services() -> AppServices {
    let mode = concurrency_mode_from_env();

    let services = match std::env::var("DATABASE_URL") {
        Ok(url) => match PgPoolOptions::new().max_connections(8).connect(&url).await {
            Ok(pool) => AppServices::postgres(pool, mode),
            Err(e) => {
                tracing::warn!(
                    "DATABASE_URL set but connection failed ({e}); falling back to in-memory store"
                );
                AppServices::in_memory(mode)
            }
        },
        Err(_) => AppServices::in_memory(mode),
    };

    tracing::info!(
        backend = services.backend(),
        mode = ?services.stock().mode(),
        "stock service wired"
    );
    services
}

fn concurrency_mode_from_env() -> ConcurrencyMode {
    match std::env::var("STOCKROOM_CONCURRENCY").as_deref() {
        Ok("pessimistic") => ConcurrencyMode::Pessimistic,
        Ok("optimistic") | Err(_) => ConcurrencyMode::default(),
        Ok(other) => {
            tracing::warn!("unknown STOCKROOM_CONCURRENCY '{other}'; using optimistic");
            ConcurrencyMode::default()
        }
    }
}
