use crate::access::Shopper;
use crate::cart::CartLineView;
use crate::catalog::{Item, Shop};
use async_trait::async_trait;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use typesafe_repository::IdentityOf;

pub mod service;

pub const HANDLING_FEE: f64 = 20.0;
pub const DELIVERY_CHARGE: f64 = 45.0;
pub const DELIVERY_MINUTES: RangeInclusive<i64> = 14..=45;
/// Estimates above this many minutes are reported as delayed.
pub const DELAY_THRESHOLD_MINUTES: i64 = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Payment {
    CashOnDelivery,
}

impl Payment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Payment::CashOnDelivery => "cash_on_delivery",
        }
    }
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "cash_on_delivery" => Some(Payment::CashOnDelivery),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub item_id: IdentityOf<Item>,
    pub shop_id: IdentityOf<Shop>,
    pub name: String,
    pub shop_name: String,
    pub price: f64,
    pub quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub shopper_id: IdentityOf<Shopper>,
    pub subtotal: f64,
    pub handling_fee: f64,
    pub delivery_charge: f64,
    pub total: f64,
    pub payment: Payment,
    pub delivery_minutes: i64,
    pub delayed: bool,
    pub created_at: i64,
    pub lines: Vec<OrderLine>,
}

/// Checkout terms fixed before the cart is converted.
#[derive(Debug, Clone)]
pub struct Checkout {
    pub handling_fee: f64,
    pub delivery_charge: f64,
    pub delivery_minutes: i64,
    pub payment: Payment,
    pub created_at: i64,
}

impl Checkout {
    pub fn new<R: Rng>(rng: &mut R, created_at: i64) -> Self {
        Self {
            handling_fee: HANDLING_FEE,
            delivery_charge: DELIVERY_CHARGE,
            delivery_minutes: rng.gen_range(DELIVERY_MINUTES),
            payment: Payment::CashOnDelivery,
            created_at,
        }
    }

    pub fn subtotal<'a, L: IntoIterator<Item = &'a CartLineView>>(lines: L) -> f64 {
        round_cents(lines.into_iter().map(CartLineView::line_total).sum())
    }

    pub fn total(&self, subtotal: f64) -> f64 {
        round_cents(subtotal + self.handling_fee + self.delivery_charge)
    }

    pub fn is_delayed(&self) -> bool {
        is_delayed(self.delivery_minutes)
    }
}

pub fn is_delayed(delivery_minutes: i64) -> bool {
    delivery_minutes > DELAY_THRESHOLD_MINUTES
}

fn round_cents(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Moves the shopper's cart into a new order. Returns `None` when the
    /// cart is empty.
    async fn place(
        &self,
        owner: IdentityOf<Shopper>,
        checkout: Checkout,
    ) -> anyhow::Result<Option<Order>>;
    /// Orders of the shopper, newest first.
    async fn list(&self, owner: IdentityOf<Shopper>) -> anyhow::Result<Vec<Order>>;
}
