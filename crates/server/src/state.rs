//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::ServerConfig;
use crate::db::{DeviceStore, PassportStore, Stores, UserStore};
use crate::services::auth::TokenAuthority;
use crate::services::{AccountService, DeviceService, PassportService};

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`. Services are built per request from the
/// stores held here.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    stores: Stores,
    tokens: TokenAuthority,
    pool: Option<PgPool>,
}

impl AppState {
    /// Create state backed by `PostgreSQL`.
    #[must_use]
    pub fn with_pool(config: ServerConfig, pool: PgPool) -> Self {
        let stores = Stores::postgres(&pool);
        Self::build(config, stores, Some(pool))
    }

    /// Create state backed by arbitrary stores (in-memory for tests and dev runs).
    #[must_use]
    pub fn with_stores(config: ServerConfig, stores: Stores) -> Self {
        Self::build(config, stores, None)
    }

    fn build(config: ServerConfig, stores: Stores, pool: Option<PgPool>) -> Self {
        let tokens = TokenAuthority::from_config(&config.jwt);
        Self {
            inner: Arc::new(AppStateInner {
                config,
                stores,
                tokens,
                pool,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// The database pool, when running against `PostgreSQL`.
    #[must_use]
    pub fn pool(&self) -> Option<&PgPool> {
        self.inner.pool.as_ref()
    }

    #[must_use]
    pub fn tokens(&self) -> &TokenAuthority {
        &self.inner.tokens
    }

    #[must_use]
    pub fn users(&self) -> &dyn UserStore {
        self.inner.stores.users.as_ref()
    }

    #[must_use]
    pub fn devices(&self) -> &dyn DeviceStore {
        self.inner.stores.devices.as_ref()
    }

    #[must_use]
    pub fn passports(&self) -> &dyn PassportStore {
        self.inner.stores.passports.as_ref()
    }

    #[must_use]
    pub fn accounts(&self) -> AccountService<'_> {
        AccountService::new(self.users(), self.device_service(), self.tokens())
    }

    #[must_use]
    pub fn device_service(&self) -> DeviceService<'_> {
        DeviceService::new(self.devices(), self.passports())
    }

    #[must_use]
    pub fn passport_service(&self) -> PassportService<'_> {
        PassportService::new(self.passports(), self.devices())
    }
}
