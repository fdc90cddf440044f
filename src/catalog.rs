use async_trait::async_trait;
use rusqlite::params;
use storefront_types::catalog::{
    Category, CategoryRepository, InCategory, Item, ItemRepository, Offer, OfferRepository,
    Search, Shop, RELATED_LIMIT, SEARCH_LIMIT,
};
use tokio_rusqlite::Connection;
use typesafe_repository::async_ops::{Get, List, Select};
use typesafe_repository::prelude::*;
use typesafe_repository::IdentityOf;

const ITEM_COLUMNS: &str = "id, name, category_id, image";

/// Categories, items, shops and their listings. Read only; rows are
/// written by [`crate::seed`].
pub struct SqliteCatalogRepository {
    conn: Connection,
}

impl SqliteCatalogRepository {
    pub async fn init(conn: Connection) -> Result<Self, tokio_rusqlite::Error> {
        conn.call(|conn| {
            conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS categories (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL UNIQUE
                );
                CREATE TABLE IF NOT EXISTS items (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL,
                    category_id INTEGER NOT NULL REFERENCES categories(id),
                    image TEXT NOT NULL DEFAULT ''
                );
                CREATE INDEX IF NOT EXISTS items_category_id ON items (category_id);
                CREATE TABLE IF NOT EXISTS shops (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL,
                    distance REAL NOT NULL CHECK (distance >= 0)
                );
                CREATE TABLE IF NOT EXISTS shop_items (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    shop_id INTEGER NOT NULL REFERENCES shops(id),
                    item_id INTEGER NOT NULL REFERENCES items(id),
                    price REAL NOT NULL CHECK (price > 0),
                    stock INTEGER NOT NULL DEFAULT 0 CHECK (stock >= 0)
                );
                CREATE INDEX IF NOT EXISTS shop_items_item_id ON shop_items (item_id);",
            )?;
            Ok(())
        })
        .await?;
        Ok(Self { conn })
    }
}

fn item_from_row(row: &rusqlite::Row<'_>) -> Result<Item, rusqlite::Error> {
    Ok(Item {
        id: row.get(0)?,
        name: row.get(1)?,
        category_id: row.get(2)?,
        image: row.get(3)?,
    })
}

/// `LIKE` pattern matching `q` anywhere, with wildcards in `q` escaped.
pub(crate) fn contains_pattern(q: &str) -> String {
    let mut pattern = String::with_capacity(q.len() + 2);
    pattern.push('%');
    for c in q.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

impl Repository<Category> for SqliteCatalogRepository {
    type Error = anyhow::Error;
}

impl Repository<Item> for SqliteCatalogRepository {
    type Error = anyhow::Error;
}

impl CategoryRepository for SqliteCatalogRepository {}
impl ItemRepository for SqliteCatalogRepository {}

#[async_trait]
impl List<Category> for SqliteCatalogRepository {
    async fn list(&self) -> Result<Vec<Category>, Self::Error> {
        Ok(self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare("SELECT id, name FROM categories ORDER BY id")?;
                let categories = stmt
                    .query_map([], |row| {
                        Ok(Category {
                            id: row.get(0)?,
                            name: row.get(1)?,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(categories)
            })
            .await?)
    }
}

#[async_trait]
impl List<Item> for SqliteCatalogRepository {
    async fn list(&self) -> Result<Vec<Item>, Self::Error> {
        Ok(self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare(&format!("SELECT {ITEM_COLUMNS} FROM items ORDER BY id"))?;
                let items = stmt
                    .query_map([], item_from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(items)
            })
            .await?)
    }
}

#[async_trait]
impl Get<Item> for SqliteCatalogRepository {
    async fn get_one(&self, id: &IdentityOf<Item>) -> Result<Option<Item>, Self::Error> {
        let id = *id;
        Ok(self
            .conn
            .call(move |conn| {
                let mut stmt =
                    conn.prepare(&format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = ?1"))?;
                let item = stmt.query_map([id], item_from_row)?.next().transpose()?;
                Ok(item)
            })
            .await?)
    }
}

#[async_trait]
impl Select<Item, Search> for SqliteCatalogRepository {
    async fn select(&self, Search(q): &Search) -> Result<Vec<Item>, Self::Error> {
        let pattern = contains_pattern(q);
        Ok(self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {ITEM_COLUMNS} FROM items WHERE name LIKE ?1 ESCAPE '\\' ORDER BY id LIMIT ?2"
                ))?;
                let items = stmt
                    .query_map(params![pattern, SEARCH_LIMIT as i64], item_from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(items)
            })
            .await?)
    }
}

#[async_trait]
impl Select<Item, InCategory> for SqliteCatalogRepository {
    async fn select(
        &self,
        InCategory {
            category_id,
            except,
        }: &InCategory,
    ) -> Result<Vec<Item>, Self::Error> {
        let (category_id, except) = (*category_id, *except);
        Ok(self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {ITEM_COLUMNS} FROM items WHERE category_id = ?1 AND id != ?2 ORDER BY id LIMIT ?3"
                ))?;
                let items = stmt
                    .query_map(
                        params![category_id, except, RELATED_LIMIT as i64],
                        item_from_row,
                    )?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(items)
            })
            .await?)
    }
}

#[async_trait]
impl OfferRepository for SqliteCatalogRepository {
    async fn offers_for(&self, item_id: IdentityOf<Item>) -> anyhow::Result<Vec<Offer>> {
        Ok(self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT s.id, s.name, s.distance, si.price, si.stock
                     FROM shops s
                     JOIN shop_items si ON s.id = si.shop_id
                     WHERE si.item_id = ?1
                     ORDER BY s.distance ASC, si.id ASC",
                )?;
                let offers = stmt
                    .query_map([item_id], |row| {
                        Ok(Offer {
                            shop: Shop {
                                id: row.get(0)?,
                                name: row.get(1)?,
                                distance: row.get(2)?,
                            },
                            price: row.get(3)?,
                            stock: row.get(4)?,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(offers)
            })
            .await?)
    }
}
