use crate::access::Shopper;
use crate::catalog::{Item, Shop};
use crate::{ServiceError, ServiceResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use typesafe_repository::IdentityOf;

pub mod service;

pub type LineId = i64;

/// One cart entry: an item from one shop at the price seen when the line
/// was first added.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CartLine {
    pub id: LineId,
    pub shopper_id: IdentityOf<Shopper>,
    pub item_id: IdentityOf<Item>,
    pub shop_id: IdentityOf<Shop>,
    pub quantity: i64,
    pub price: f64,
}

/// Cart line joined with its item and shop for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLineView {
    pub id: LineId,
    pub quantity: i64,
    pub price: f64,
    pub item_id: IdentityOf<Item>,
    pub shop_id: IdentityOf<Shop>,
    pub name: String,
    pub image: String,
    pub shop_name: String,
}

impl CartLineView {
    pub fn line_total(&self) -> f64 {
        self.price * self.quantity as f64
    }
}

#[derive(Debug, Clone)]
pub struct NewCartLine {
    pub item_id: IdentityOf<Item>,
    pub shop_id: IdentityOf<Shop>,
    pub price: f64,
    pub quantity: i64,
}

impl NewCartLine {
    pub fn validate(&self) -> ServiceResult<()> {
        if !self.price.is_finite() || self.price <= 0.0 {
            return Err(ServiceError::invalid("price", "must be a positive number"));
        }
        if self.quantity < 1 {
            return Err(ServiceError::invalid("quantity", "must be at least 1"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added {
        item_id: IdentityOf<Item>,
        quantity: i64,
    },
    Updated {
        item_id: IdentityOf<Item>,
        quantity: i64,
    },
}

impl AddOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Added { .. } => "added",
            Self::Updated { .. } => "updated",
        }
    }
    pub fn item_id(&self) -> IdentityOf<Item> {
        match self {
            Self::Added { item_id, .. } | Self::Updated { item_id, .. } => *item_id,
        }
    }
    pub fn quantity(&self) -> i64 {
        match self {
            Self::Added { quantity, .. } | Self::Updated { quantity, .. } => *quantity,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityOutcome {
    Deleted { id: LineId },
    Updated { id: LineId, quantity: i64 },
}

impl QuantityOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Deleted { .. } => "deleted",
            Self::Updated { .. } => "updated",
        }
    }
}

/// Cart storage. Every operation is scoped to one shopper.
#[async_trait]
pub trait CartRepository: Send + Sync {
    /// Inserts the line or merges its quantity into the existing line for
    /// the same item and shop. The stored price is kept on merge.
    async fn add(
        &self,
        owner: IdentityOf<Shopper>,
        line: NewCartLine,
    ) -> anyhow::Result<AddOutcome>;
    /// Sets the quantity. Returns `None` when the line does not exist.
    async fn set_quantity(
        &self,
        owner: IdentityOf<Shopper>,
        id: LineId,
        quantity: i64,
    ) -> anyhow::Result<Option<CartLine>>;
    /// Returns `false` when nothing was removed.
    async fn remove(&self, owner: IdentityOf<Shopper>, id: LineId) -> anyhow::Result<bool>;
    async fn clear(&self, owner: IdentityOf<Shopper>) -> anyhow::Result<usize>;
    async fn list(&self, owner: IdentityOf<Shopper>) -> anyhow::Result<Vec<CartLineView>>;
}
