//! Synthetic catalog for an empty store.

use rand::Rng;
use rusqlite::params;
use tokio_rusqlite::Connection;

const CATEGORIES: [&str; 10] = [
    "Vegetables",
    "Dairy",
    "Electronics",
    "Essentials",
    "Cosmetics",
    "Medicine",
    "Toys",
    "Clothing",
    "Fruits",
    "Sweets",
];

const ITEMS: [(&str, &str); 52] = [
    ("Tomato", "Vegetables"),
    ("Potato", "Vegetables"),
    ("Onion", "Vegetables"),
    ("Carrot", "Vegetables"),
    ("Spinach", "Vegetables"),
    ("Capsicum", "Vegetables"),
    ("Milk", "Dairy"),
    ("Curd", "Dairy"),
    ("Cheese", "Dairy"),
    ("Butter", "Dairy"),
    ("Paneer", "Dairy"),
    ("Yogurt", "Dairy"),
    ("Headphones", "Electronics"),
    ("Charger", "Electronics"),
    ("Power Bank", "Electronics"),
    ("USB Cable", "Electronics"),
    ("Mouse", "Electronics"),
    ("Rice (5kg)", "Essentials"),
    ("Washing Powder", "Essentials"),
    ("Salt", "Essentials"),
    ("Sugar", "Essentials"),
    ("Oil (1L)", "Essentials"),
    ("Lipstick", "Cosmetics"),
    ("Face Wash", "Cosmetics"),
    ("Perfume", "Cosmetics"),
    ("Moisturizer", "Cosmetics"),
    ("Shampoo", "Cosmetics"),
    ("Paracetamol", "Medicine"),
    ("Bandage", "Medicine"),
    ("Cough Syrup", "Medicine"),
    ("Antiseptic", "Medicine"),
    ("Vitamins", "Medicine"),
    ("Action Figure", "Toys"),
    ("Lego Set", "Toys"),
    ("Doll", "Toys"),
    ("Puzzle", "Toys"),
    ("Toy Car", "Toys"),
    ("T-Shirt", "Clothing"),
    ("Jeans", "Clothing"),
    ("Socks", "Clothing"),
    ("Cap", "Clothing"),
    ("Shirt", "Clothing"),
    ("Apple", "Fruits"),
    ("Banana", "Fruits"),
    ("Mango", "Fruits"),
    ("Grapes", "Fruits"),
    ("Orange", "Fruits"),
    ("Gulab Jamun", "Sweets"),
    ("Rasgulla", "Sweets"),
    ("Chocolate", "Sweets"),
    ("Ladoo", "Sweets"),
    ("Cake", "Sweets"),
];

const SHOPS: [&str; 50] = [
    "Sharma General Store",
    "Apna Bazaar",
    "Daily Fresh",
    "City Supermart",
    "Green Grocers",
    "Modi Care Shop",
    "Reliance Fresh Copy",
    "Quick Mart",
    "Corner Store",
    "Value Mart",
    "Best Price Shop",
    "Urban Needs",
    "Metro Mart",
    "Village Store",
    "Town Bazaar",
    "Sunrise Stores",
    "Moonlight Mart",
    "Star Groceries",
    "Galaxy Supermarket",
    "Universe Needs",
    "Planet Fresh",
    "Nature's Basket Copy",
    "Organic World",
    "Healthy Life",
    "Fit Food",
    "Tasty Treats",
    "Yummy Mart",
    "Delicious Deals",
    "Spicy Store",
    "Sweet Tooth Shop",
    "Gupta Provisions",
    "Singh Super Store",
    "Khan Market",
    "Reddy's Mart",
    "Patel Brothers",
    "Kumar Stores",
    "Rao's Daily Needs",
    "Mehta Market",
    "Jain General Store",
    "Agarwal Sweets & More",
    "Laxmi Stores",
    "Ganesh Mart",
    "Sai Baba Provisions",
    "Om Shanti Store",
    "Krishna Mart",
    "Radha Krishna Store",
    "Jai Hind Mart",
    "Bharat Bazaar",
    "Indian Roots",
    "Western Ways",
];

/// Share of shop and item pairs that get a listing.
const LISTING_CHANCE: f64 = 0.6;
/// Share of listings that are in stock.
const IN_STOCK_CHANCE: f64 = 0.8;

#[derive(Debug, Clone)]
pub struct ItemSeed {
    pub name: String,
    pub category: usize,
    pub image: String,
}

#[derive(Debug, Clone)]
pub struct ShopSeed {
    pub name: String,
    pub distance: f64,
}

#[derive(Debug, Clone)]
pub struct ListingSeed {
    pub shop: usize,
    pub item: usize,
    pub price: f64,
    pub stock: i64,
}

/// Catalog rows to insert. Items, shops and listings refer to earlier rows
/// by index.
#[derive(Debug, Clone, Default)]
pub struct CatalogSeed {
    pub categories: Vec<String>,
    pub items: Vec<ItemSeed>,
    pub shops: Vec<ShopSeed>,
    pub listings: Vec<ListingSeed>,
}

/// Ids assigned to seeded rows, in seed order.
#[derive(Debug, Clone, Default)]
pub struct SeededCatalog {
    pub categories: Vec<i64>,
    pub items: Vec<i64>,
    pub shops: Vec<i64>,
}

impl CatalogSeed {
    pub fn synthetic<R: Rng>(rng: &mut R) -> Self {
        let categories = CATEGORIES.iter().map(|c| c.to_string()).collect();
        let items = ITEMS
            .iter()
            .filter_map(|(name, category)| {
                let idx = CATEGORIES.iter().position(|c| c == category)?;
                Some(ItemSeed {
                    name: name.to_string(),
                    category: idx,
                    image: image_url(rng, category, name),
                })
            })
            .collect::<Vec<_>>();
        let shops = SHOPS
            .iter()
            .map(|name| ShopSeed {
                name: name.to_string(),
                distance: (rng.gen_range(0.1..=8.0_f64) * 10.0).round() / 10.0,
            })
            .collect::<Vec<_>>();
        let mut listings = vec![];
        for shop in 0..shops.len() {
            for item in 0..items.len() {
                if !rng.gen_bool(LISTING_CHANCE) {
                    continue;
                }
                let price = rng.gen_range(20..=220) as f64;
                let stock = if rng.gen_bool(IN_STOCK_CHANCE) {
                    rng.gen_range(1..=50)
                } else {
                    0
                };
                listings.push(ListingSeed {
                    shop,
                    item,
                    price,
                    stock,
                });
            }
        }
        Self {
            categories,
            items,
            shops,
            listings,
        }
    }
}

fn image_url<R: Rng>(rng: &mut R, category: &str, name: &str) -> String {
    let keyword = name.split(' ').next().unwrap_or(name);
    format!(
        "https://loremflickr.com/320/240/{},{}?random={}",
        category.to_lowercase().replacen(' ', ",", 1),
        keyword,
        rng.gen::<u32>()
    )
}

/// Inserts the seed in a single transaction.
pub async fn insert(conn: &Connection, seed: CatalogSeed) -> Result<SeededCatalog, anyhow::Error> {
    let seeded = conn
        .call(move |conn| {
            let tx = conn.transaction()?;
            let mut ids = SeededCatalog::default();
            {
                let mut stmt = tx.prepare("INSERT INTO categories (name) VALUES (?1)")?;
                for name in &seed.categories {
                    stmt.execute(params![name])?;
                    ids.categories.push(tx.last_insert_rowid());
                }
                let mut stmt =
                    tx.prepare("INSERT INTO items (name, category_id, image) VALUES (?1, ?2, ?3)")?;
                for item in &seed.items {
                    let category_id = lookup(&ids.categories, item.category)?;
                    stmt.execute(params![item.name, category_id, item.image])?;
                    ids.items.push(tx.last_insert_rowid());
                }
                let mut stmt = tx.prepare("INSERT INTO shops (name, distance) VALUES (?1, ?2)")?;
                for shop in &seed.shops {
                    stmt.execute(params![shop.name, shop.distance])?;
                    ids.shops.push(tx.last_insert_rowid());
                }
                let mut stmt = tx.prepare(
                    "INSERT INTO shop_items (shop_id, item_id, price, stock) VALUES (?1, ?2, ?3, ?4)",
                )?;
                for listing in &seed.listings {
                    stmt.execute(params![
                        lookup(&ids.shops, listing.shop)?,
                        lookup(&ids.items, listing.item)?,
                        listing.price,
                        listing.stock
                    ])?;
                }
            }
            tx.commit()?;
            Ok(ids)
        })
        .await?;
    Ok(seeded)
}

fn lookup(ids: &[i64], idx: usize) -> Result<i64, rusqlite::Error> {
    ids.get(idx)
        .copied()
        .ok_or(rusqlite::Error::InvalidParameterName(format!(
            "seed refers to missing row {idx}"
        )))
}

pub async fn seed_if_empty(conn: &Connection) -> Result<(), anyhow::Error> {
    let count: i64 = conn
        .call(|conn| Ok(conn.query_row("SELECT count(*) FROM categories", [], |row| row.get(0))?))
        .await?;
    if count > 0 {
        log::info!("Catalog has {count} categories, skipping seeding");
        return Ok(());
    }
    log::info!("Seeding catalog...");
    let seed = CatalogSeed::synthetic(&mut rand::thread_rng());
    let listings = seed.listings.len();
    let seeded = insert(conn, seed).await?;
    log::info!(
        "Seeding complete: {} categories, {} items, {} shops, {listings} listings",
        seeded.categories.len(),
        seeded.items.len(),
        seeded.shops.len()
    );
    Ok(())
}
