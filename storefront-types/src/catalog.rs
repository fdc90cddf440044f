use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use typesafe_repository::async_ops::{Get, List, Select};
use typesafe_repository::macros::Id;
use typesafe_repository::prelude::*;
use typesafe_repository::{IdentityOf, SelectBy, Selector};

pub mod service;

pub const SEARCH_LIMIT: usize = 10;
pub const RELATED_LIMIT: usize = 5;

#[derive(Id, Serialize, Deserialize, Clone, Debug, PartialEq)]
#[Id(ref_id, get_id)]
pub struct Category {
    #[id]
    pub id: i64,
    pub name: String,
}

#[derive(Id, Serialize, Deserialize, Clone, Debug, PartialEq)]
#[Id(ref_id, get_id)]
pub struct Item {
    #[id]
    pub id: i64,
    pub name: String,
    pub category_id: IdentityOf<Category>,
    pub image: String,
}

#[derive(Id, Serialize, Deserialize, Clone, Debug, PartialEq)]
#[Id(ref_id, get_id)]
pub struct Shop {
    #[id]
    pub id: i64,
    pub name: String,
    /// Kilometers from the delivery reference point.
    pub distance: f64,
}

/// A shop's offer of a single item. Serializes as the shop row extended
/// with `price` and `stock`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Offer {
    #[serde(flatten)]
    pub shop: Shop,
    pub price: f64,
    pub stock: i64,
}

impl Offer {
    pub fn is_available(&self) -> bool {
        self.stock > 0
    }
}

/// Substring match on item name.
pub struct Search(pub String);

/// Items of a category, except one.
pub struct InCategory {
    pub category_id: IdentityOf<Category>,
    pub except: IdentityOf<Item>,
}

impl Selector for Search {}
impl SelectBy<Search> for Item {}

impl Selector for InCategory {}
impl SelectBy<InCategory> for Item {}

pub trait CategoryRepository:
    Repository<Category, Error = anyhow::Error> + List<Category> + Send + Sync
{
}

pub trait ItemRepository:
    Repository<Item, Error = anyhow::Error>
    + Get<Item>
    + List<Item>
    + Select<Item, Search>
    + Select<Item, InCategory>
    + Send
    + Sync
{
}

#[async_trait]
pub trait OfferRepository: Send + Sync {
    /// Offers for an item, nearest shop first. Out of stock offers are kept.
    async fn offers_for(&self, item_id: IdentityOf<Item>) -> anyhow::Result<Vec<Offer>>;
}
