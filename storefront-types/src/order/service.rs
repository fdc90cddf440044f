use crate::access::Shopper;
use crate::order::{Checkout, Order, OrderRepository};
use crate::{now, ServiceError, ServiceResult};
use actix::prelude::*;
use actix::ResponseActFuture;
use std::sync::Arc;
use typesafe_repository::IdentityOf;

pub struct OrderService {
    repo: Arc<dyn OrderRepository>,
}

impl OrderService {
    pub fn new(repo: Arc<dyn OrderRepository>) -> Self {
        Self { repo }
    }
}

impl Actor for OrderService {
    type Context = Context<Self>;
}

#[derive(Message)]
#[rtype(result = "ServiceResult<Order>")]
pub struct PlaceOrder(pub IdentityOf<Shopper>);

#[derive(Message)]
#[rtype(result = "ServiceResult<Vec<Order>>")]
pub struct ListOrders(pub IdentityOf<Shopper>);

impl Handler<PlaceOrder> for OrderService {
    type Result = ResponseActFuture<Self, ServiceResult<Order>>;

    fn handle(&mut self, PlaceOrder(owner): PlaceOrder, _: &mut Self::Context) -> Self::Result {
        let repo = self.repo.clone();
        let checkout = Checkout::new(&mut rand::thread_rng(), now());
        Box::pin(
            async move {
                let order = repo
                    .place(owner, checkout)
                    .await?
                    .ok_or_else(|| ServiceError::invalid("cart", "is empty"))?;
                log::info!(
                    "Shopper {owner} placed order {} of {} lines, total {}",
                    order.id,
                    order.lines.len(),
                    order.total
                );
                Ok(order)
            }
            .into_actor(self),
        )
    }
}

impl Handler<ListOrders> for OrderService {
    type Result = ResponseActFuture<Self, ServiceResult<Vec<Order>>>;

    fn handle(&mut self, ListOrders(owner): ListOrders, _: &mut Self::Context) -> Self::Result {
        let repo = self.repo.clone();
        Box::pin(async move { Ok(repo.list(owner).await?) }.into_actor(self))
    }
}
