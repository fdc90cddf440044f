use crate::catalog::{
    Category, CategoryRepository, InCategory, Item, ItemRepository, Offer, OfferRepository,
    Search, RELATED_LIMIT, SEARCH_LIMIT,
};
use crate::{ServiceError, ServiceResult};
use actix::prelude::*;
use actix::ResponseActFuture;
use std::sync::Arc;
use typesafe_repository::IdentityOf;

/// Read-only queries over the catalog.
pub struct CatalogService {
    categories: Arc<dyn CategoryRepository>,
    items: Arc<dyn ItemRepository>,
    offers: Arc<dyn OfferRepository>,
}

impl CatalogService {
    pub fn new(
        categories: Arc<dyn CategoryRepository>,
        items: Arc<dyn ItemRepository>,
        offers: Arc<dyn OfferRepository>,
    ) -> Self {
        Self {
            categories,
            items,
            offers,
        }
    }
}

impl Actor for CatalogService {
    type Context = Context<Self>;
}

#[derive(Message)]
#[rtype(result = "ServiceResult<Vec<Category>>")]
pub struct ListCategories;

#[derive(Message)]
#[rtype(result = "ServiceResult<Vec<Item>>")]
pub struct ListItems;

#[derive(Message)]
#[rtype(result = "ServiceResult<Item>")]
pub struct GetItem(pub IdentityOf<Item>);

#[derive(Message)]
#[rtype(result = "ServiceResult<Vec<Item>>")]
pub struct SearchItems(pub Option<String>);

#[derive(Message)]
#[rtype(result = "ServiceResult<Vec<Offer>>")]
pub struct ListingsForItem(pub IdentityOf<Item>);

#[derive(Message)]
#[rtype(result = "ServiceResult<Vec<Item>>")]
pub struct RelatedItems(pub IdentityOf<Item>);

impl Handler<ListCategories> for CatalogService {
    type Result = ResponseActFuture<Self, ServiceResult<Vec<Category>>>;

    fn handle(&mut self, _: ListCategories, _: &mut Self::Context) -> Self::Result {
        let repo = self.categories.clone();
        Box::pin(async move { Ok(repo.list().await?) }.into_actor(self))
    }
}

impl Handler<ListItems> for CatalogService {
    type Result = ResponseActFuture<Self, ServiceResult<Vec<Item>>>;

    fn handle(&mut self, _: ListItems, _: &mut Self::Context) -> Self::Result {
        let repo = self.items.clone();
        Box::pin(async move { Ok(repo.list().await?) }.into_actor(self))
    }
}

impl Handler<GetItem> for CatalogService {
    type Result = ResponseActFuture<Self, ServiceResult<Item>>;

    fn handle(&mut self, GetItem(id): GetItem, _: &mut Self::Context) -> Self::Result {
        let repo = self.items.clone();
        Box::pin(
            async move {
                repo.get_one(&id)
                    .await?
                    .ok_or(ServiceError::NotFound { entity: "Item" })
            }
            .into_actor(self),
        )
    }
}

impl Handler<SearchItems> for CatalogService {
    type Result = ResponseActFuture<Self, ServiceResult<Vec<Item>>>;

    fn handle(&mut self, SearchItems(q): SearchItems, _: &mut Self::Context) -> Self::Result {
        let repo = self.items.clone();
        let q = q.map(|q| q.trim().to_string()).unwrap_or_default();
        Box::pin(
            async move {
                if q.is_empty() {
                    return Ok(vec![]);
                }
                let mut items = repo.select(&Search(q)).await?;
                items.truncate(SEARCH_LIMIT);
                Ok(items)
            }
            .into_actor(self),
        )
    }
}

impl Handler<ListingsForItem> for CatalogService {
    type Result = ResponseActFuture<Self, ServiceResult<Vec<Offer>>>;

    fn handle(
        &mut self,
        ListingsForItem(id): ListingsForItem,
        _: &mut Self::Context,
    ) -> Self::Result {
        let repo = self.offers.clone();
        Box::pin(async move { Ok(repo.offers_for(id).await?) }.into_actor(self))
    }
}

impl Handler<RelatedItems> for CatalogService {
    type Result = ResponseActFuture<Self, ServiceResult<Vec<Item>>>;

    fn handle(&mut self, RelatedItems(id): RelatedItems, _: &mut Self::Context) -> Self::Result {
        let repo = self.items.clone();
        Box::pin(
            async move {
                let item = repo
                    .get_one(&id)
                    .await?
                    .ok_or(ServiceError::NotFound { entity: "Item" })?;
                let mut related = repo
                    .select(&InCategory {
                        category_id: item.category_id,
                        except: item.id,
                    })
                    .await?;
                related.retain(|i| i.id != id);
                related.truncate(RELATED_LIMIT);
                Ok(related)
            }
            .into_actor(self),
        )
    }
}
