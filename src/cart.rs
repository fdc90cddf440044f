use async_trait::async_trait;
use rusqlite::{params, OptionalExtension, TransactionBehavior};
use storefront_types::access::Shopper;
use storefront_types::cart::{
    AddOutcome, CartLine, CartLineView, CartRepository, LineId, NewCartLine,
};
use tokio_rusqlite::Connection;
use typesafe_repository::IdentityOf;

pub struct SqliteCartRepository {
    conn: Connection,
}

impl SqliteCartRepository {
    pub async fn init(conn: Connection) -> Result<Self, tokio_rusqlite::Error> {
        conn.call(|conn| {
            conn.execute(
                "CREATE TABLE IF NOT EXISTS cart_items (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    shopper_id INTEGER NOT NULL REFERENCES shoppers(id) ON DELETE CASCADE,
                    item_id INTEGER NOT NULL REFERENCES items(id),
                    shop_id INTEGER NOT NULL REFERENCES shops(id),
                    quantity INTEGER NOT NULL CHECK (quantity > 0),
                    price REAL NOT NULL CHECK (price > 0),
                    UNIQUE (shopper_id, item_id, shop_id)
                )",
                [],
            )?;
            Ok(())
        })
        .await?;
        Ok(Self { conn })
    }
}

/// Cart lines of a shopper joined for display, in insertion order.
pub(crate) fn select_lines(
    conn: &rusqlite::Connection,
    owner: IdentityOf<Shopper>,
) -> Result<Vec<CartLineView>, rusqlite::Error> {
    let mut stmt = conn.prepare(
        "SELECT ci.id, ci.quantity, ci.price, ci.item_id, ci.shop_id, i.name, i.image, s.name
         FROM cart_items ci
         JOIN items i ON ci.item_id = i.id
         JOIN shops s ON ci.shop_id = s.id
         WHERE ci.shopper_id = ?1
         ORDER BY ci.id",
    )?;
    let lines = stmt
        .query_map([owner], |row| {
            Ok(CartLineView {
                id: row.get(0)?,
                quantity: row.get(1)?,
                price: row.get(2)?,
                item_id: row.get(3)?,
                shop_id: row.get(4)?,
                name: row.get(5)?,
                image: row.get(6)?,
                shop_name: row.get(7)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(lines)
}

#[async_trait]
impl CartRepository for SqliteCartRepository {
    async fn add(
        &self,
        owner: IdentityOf<Shopper>,
        line: NewCartLine,
    ) -> anyhow::Result<AddOutcome> {
        let outcome = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
                let existed = tx
                    .query_row(
                        "SELECT id FROM cart_items
                         WHERE shopper_id = ?1 AND item_id = ?2 AND shop_id = ?3",
                        params![owner, line.item_id, line.shop_id],
                        |row| row.get::<_, i64>(0),
                    )
                    .optional()?
                    .is_some();
                let quantity: i64 = tx.query_row(
                    "INSERT INTO cart_items (shopper_id, item_id, shop_id, quantity, price)
                     VALUES (?1, ?2, ?3, ?4, ?5)
                     ON CONFLICT (shopper_id, item_id, shop_id)
                     DO UPDATE SET quantity = quantity + excluded.quantity
                     RETURNING quantity",
                    params![owner, line.item_id, line.shop_id, line.quantity, line.price],
                    |row| row.get(0),
                )?;
                tx.commit()?;
                let item_id = line.item_id;
                Ok(if existed {
                    AddOutcome::Updated { item_id, quantity }
                } else {
                    AddOutcome::Added { item_id, quantity }
                })
            })
            .await?;
        Ok(outcome)
    }

    async fn set_quantity(
        &self,
        owner: IdentityOf<Shopper>,
        id: LineId,
        quantity: i64,
    ) -> anyhow::Result<Option<CartLine>> {
        let line = self
            .conn
            .call(move |conn| {
                let line = conn
                    .query_row(
                        "UPDATE cart_items SET quantity = ?3
                         WHERE id = ?1 AND shopper_id = ?2
                         RETURNING id, shopper_id, item_id, shop_id, quantity, price",
                        params![id, owner, quantity],
                        |row| {
                            Ok(CartLine {
                                id: row.get(0)?,
                                shopper_id: row.get(1)?,
                                item_id: row.get(2)?,
                                shop_id: row.get(3)?,
                                quantity: row.get(4)?,
                                price: row.get(5)?,
                            })
                        },
                    )
                    .optional()?;
                Ok(line)
            })
            .await?;
        Ok(line)
    }

    async fn remove(&self, owner: IdentityOf<Shopper>, id: LineId) -> anyhow::Result<bool> {
        let removed = self
            .conn
            .call(move |conn| {
                Ok(conn.execute(
                    "DELETE FROM cart_items WHERE id = ?1 AND shopper_id = ?2",
                    params![id, owner],
                )?)
            })
            .await?;
        Ok(removed > 0)
    }

    async fn clear(&self, owner: IdentityOf<Shopper>) -> anyhow::Result<usize> {
        Ok(self
            .conn
            .call(move |conn| {
                Ok(conn.execute("DELETE FROM cart_items WHERE shopper_id = ?1", [owner])?)
            })
            .await?)
    }

    async fn list(&self, owner: IdentityOf<Shopper>) -> anyhow::Result<Vec<CartLineView>> {
        Ok(self
            .conn
            .call(move |conn| Ok(select_lines(conn, owner)?))
            .await?)
    }
}
