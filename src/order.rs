use crate::cart::select_lines;
use async_trait::async_trait;
use rusqlite::{params, TransactionBehavior};
use std::collections::HashMap;
use storefront_types::access::Shopper;
use storefront_types::order::{Checkout, Order, OrderLine, OrderRepository, Payment};
use tokio_rusqlite::Connection;
use typesafe_repository::IdentityOf;

pub struct SqliteOrderRepository {
    conn: Connection,
}

impl SqliteOrderRepository {
    pub async fn init(conn: Connection) -> Result<Self, tokio_rusqlite::Error> {
        conn.call(|conn| {
            conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS orders (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    shopper_id INTEGER NOT NULL REFERENCES shoppers(id) ON DELETE CASCADE,
                    subtotal REAL NOT NULL,
                    handling_fee REAL NOT NULL,
                    delivery_charge REAL NOT NULL,
                    total REAL NOT NULL,
                    payment TEXT NOT NULL,
                    delivery_minutes INTEGER NOT NULL,
                    created_at INTEGER NOT NULL
                );
                CREATE INDEX IF NOT EXISTS orders_shopper_id ON orders (shopper_id);
                CREATE TABLE IF NOT EXISTS order_items (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    order_id INTEGER NOT NULL REFERENCES orders(id) ON DELETE CASCADE,
                    item_id INTEGER NOT NULL REFERENCES items(id),
                    shop_id INTEGER NOT NULL REFERENCES shops(id),
                    name TEXT NOT NULL,
                    shop_name TEXT NOT NULL,
                    price REAL NOT NULL,
                    quantity INTEGER NOT NULL CHECK (quantity > 0)
                );
                CREATE INDEX IF NOT EXISTS order_items_order_id ON order_items (order_id);",
            )?;
            Ok(())
        })
        .await?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl OrderRepository for SqliteOrderRepository {
    async fn place(
        &self,
        owner: IdentityOf<Shopper>,
        checkout: Checkout,
    ) -> anyhow::Result<Option<Order>> {
        Ok(self
            .conn
            .call(move |conn| {
                let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
                let cart = select_lines(&tx, owner)?;
                if cart.is_empty() {
                    return Ok(None);
                }
                let subtotal = Checkout::subtotal(&cart);
                let total = checkout.total(subtotal);
                tx.execute(
                    "INSERT INTO orders (shopper_id, subtotal, handling_fee, delivery_charge,
                        total, payment, delivery_minutes, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    params![
                        owner,
                        subtotal,
                        checkout.handling_fee,
                        checkout.delivery_charge,
                        total,
                        checkout.payment.as_str(),
                        checkout.delivery_minutes,
                        checkout.created_at
                    ],
                )?;
                let order_id = tx.last_insert_rowid();
                let lines = cart
                    .into_iter()
                    .map(|l| OrderLine {
                        item_id: l.item_id,
                        shop_id: l.shop_id,
                        name: l.name,
                        shop_name: l.shop_name,
                        price: l.price,
                        quantity: l.quantity,
                    })
                    .collect::<Vec<_>>();
                {
                    let mut stmt = tx.prepare(
                        "INSERT INTO order_items (order_id, item_id, shop_id, name, shop_name, price, quantity)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    )?;
                    for l in &lines {
                        stmt.execute(params![
                            order_id,
                            l.item_id,
                            l.shop_id,
                            l.name,
                            l.shop_name,
                            l.price,
                            l.quantity
                        ])?;
                    }
                }
                tx.execute("DELETE FROM cart_items WHERE shopper_id = ?1", [owner])?;
                tx.commit()?;
                Ok(Some(Order {
                    id: order_id,
                    shopper_id: owner,
                    subtotal,
                    handling_fee: checkout.handling_fee,
                    delivery_charge: checkout.delivery_charge,
                    total,
                    payment: checkout.payment,
                    delivery_minutes: checkout.delivery_minutes,
                    delayed: checkout.is_delayed(),
                    created_at: checkout.created_at,
                    lines,
                }))
            })
            .await?)
    }

    async fn list(&self, owner: IdentityOf<Shopper>) -> anyhow::Result<Vec<Order>> {
        Ok(self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, subtotal, handling_fee, delivery_charge, total, payment,
                        delivery_minutes, created_at, shopper_id
                     FROM orders WHERE shopper_id = ?1
                     ORDER BY created_at DESC, id DESC",
                )?;
                let mut orders = stmt
                    .query_map([owner], |row| {
                        let payment: String = row.get(5)?;
                        let delivery_minutes: i64 = row.get(6)?;
                        Ok(Order {
                            id: row.get(0)?,
                            shopper_id: row.get(8)?,
                            subtotal: row.get(1)?,
                            handling_fee: row.get(2)?,
                            delivery_charge: row.get(3)?,
                            total: row.get(4)?,
                            payment: Payment::parse(&payment).ok_or_else(|| {
                                rusqlite::Error::InvalidColumnType(
                                    5,
                                    "payment".to_string(),
                                    rusqlite::types::Type::Text,
                                )
                            })?,
                            delivery_minutes,
                            delayed: storefront_types::order::is_delayed(delivery_minutes),
                            created_at: row.get(7)?,
                            lines: vec![],
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;

                let mut stmt = conn.prepare(
                    "SELECT oi.order_id, oi.item_id, oi.shop_id, oi.name, oi.shop_name,
                        oi.price, oi.quantity
                     FROM order_items oi
                     JOIN orders o ON oi.order_id = o.id
                     WHERE o.shopper_id = ?1
                     ORDER BY oi.id",
                )?;
                let mut lines: HashMap<i64, Vec<OrderLine>> = HashMap::new();
                let rows = stmt.query_map([owner], |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        OrderLine {
                            item_id: row.get(1)?,
                            shop_id: row.get(2)?,
                            name: row.get(3)?,
                            shop_name: row.get(4)?,
                            price: row.get(5)?,
                            quantity: row.get(6)?,
                        },
                    ))
                })?;
                for row in rows {
                    let (order_id, line) = row?;
                    lines.entry(order_id).or_default().push(line);
                }
                for order in orders.iter_mut() {
                    order.lines = lines.remove(&order.id).unwrap_or_default();
                }
                Ok(orders)
            })
            .await?)
    }
}
