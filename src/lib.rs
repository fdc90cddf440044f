#![deny(clippy::unwrap_used)]

use actix::prelude::*;
use actix_web::web::{Data, ServiceConfig};
use anyhow::Context as AnyhowContext;
use std::path::Path;
use std::sync::Arc;
use storefront_types::access::service::AccessService;
use storefront_types::cart::service::CartService;
use storefront_types::catalog::service::CatalogService;
use storefront_types::order::service::OrderService;
use tokio_rusqlite::Connection;

pub mod access;
pub mod cart;
pub mod catalog;
pub mod config;
pub mod control;
pub mod order;
pub mod seed;

use config::Settings;

/// Opens the database file, creating its directory when needed.
pub async fn open_storage<P: AsRef<Path>>(path: P) -> Result<Connection, anyhow::Error> {
    let path = path.as_ref();
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Unable to create storage directory {}", dir.display()))?;
    }
    let conn = Connection::open(path).await?;
    configure_connection(&conn).await?;
    Ok(conn)
}

pub async fn open_in_memory() -> Result<Connection, anyhow::Error> {
    let conn = Connection::open_in_memory().await?;
    configure_connection(&conn).await?;
    Ok(conn)
}

async fn configure_connection(conn: &Connection) -> Result<(), tokio_rusqlite::Error> {
    conn.call(|conn| {
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        log::debug!("SQLite journal mode: {mode}");
        conn.pragma_update(None, "foreign_keys", true)?;
        Ok(())
    })
    .await
}

/// Addresses of the running services, shared with request handlers.
#[derive(Clone)]
pub struct Services {
    pub catalog: Addr<CatalogService>,
    pub cart: Addr<CartService>,
    pub order: Addr<OrderService>,
    pub access: Addr<AccessService>,
}

impl Services {
    /// Creates missing tables, seeds an empty catalog when asked to and
    /// starts the services. Must run inside an actix system.
    pub async fn start(conn: Connection, settings: &Settings) -> Result<Self, anyhow::Error> {
        let catalog_repository = Arc::new(catalog::SqliteCatalogRepository::init(conn.clone()).await?);
        if settings.seed_on_startup {
            seed::seed_if_empty(&conn).await?;
        }
        let access_repository = Arc::new(access::SqliteAccessRepository::init(conn.clone()).await?);
        let cart_repository = Arc::new(cart::SqliteCartRepository::init(conn.clone()).await?);
        let order_repository = Arc::new(order::SqliteOrderRepository::init(conn).await?);

        let catalog = CatalogService::new(
            catalog_repository.clone(),
            catalog_repository.clone(),
            catalog_repository,
        )
        .start();
        let cart = CartService::new(cart_repository).start();
        let order = OrderService::new(order_repository).start();
        let access = AccessService::new(
            access_repository.clone(),
            access_repository,
            settings.session_ttl,
        )
        .start();
        Ok(Self {
            catalog,
            cart,
            order,
            access,
        })
    }

    /// Shares the service addresses with handlers and middleware.
    pub fn register(&self, cfg: &mut ServiceConfig) {
        cfg.app_data(Data::new(self.catalog.clone()))
            .app_data(Data::new(self.cart.clone()))
            .app_data(Data::new(self.order.clone()))
            .app_data(Data::new(self.access.clone()));
    }
}
