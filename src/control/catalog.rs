use crate::control::{success, Identity, Response};
use actix::Addr;
use actix_web::get;
use actix_web::web::{Data, Path, Query};
use serde::Deserialize;
use storefront_types::catalog::service::{
    CatalogService, GetItem, ListCategories, ListItems, ListingsForItem, RelatedItems,
    SearchItems,
};

#[derive(Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

#[get("/api/categories")]
pub async fn categories(_: Identity, catalog: Data<Addr<CatalogService>>) -> Response {
    success(catalog.send(ListCategories).await??)
}

#[get("/api/search")]
pub async fn search(
    _: Identity,
    catalog: Data<Addr<CatalogService>>,
    query: Query<SearchQuery>,
) -> Response {
    let SearchQuery { q } = query.into_inner();
    success(catalog.send(SearchItems(q)).await??)
}

#[get("/api/items")]
pub async fn items(_: Identity, catalog: Data<Addr<CatalogService>>) -> Response {
    success(catalog.send(ListItems).await??)
}

#[get("/api/items/{id}")]
pub async fn item(
    _: Identity,
    catalog: Data<Addr<CatalogService>>,
    id: Path<i64>,
) -> Response {
    success(catalog.send(GetItem(id.into_inner())).await??)
}

/// Shops listing the item, nearest first, out of stock offers included.
#[get("/api/items/{id}/shops")]
pub async fn item_shops(
    _: Identity,
    catalog: Data<Addr<CatalogService>>,
    id: Path<i64>,
) -> Response {
    success(catalog.send(ListingsForItem(id.into_inner())).await??)
}

#[get("/api/items/{id}/related")]
pub async fn related_items(
    _: Identity,
    catalog: Data<Addr<CatalogService>>,
    id: Path<i64>,
) -> Response {
    success(catalog.send(RelatedItems(id.into_inner())).await??)
}
