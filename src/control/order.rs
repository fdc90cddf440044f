use crate::control::{reply, success, Identity, Response};
use actix::Addr;
use actix_web::web::Data;
use actix_web::{get, post};
use storefront_types::order::service::{ListOrders, OrderService, PlaceOrder};

/// Turns the cart into a cash on delivery order.
#[post("/api/orders")]
pub async fn place_order(
    Identity { shopper, .. }: Identity,
    orders: Data<Addr<OrderService>>,
) -> Response {
    let order = orders.send(PlaceOrder(shopper.id)).await??;
    Ok(reply("placed", order))
}

#[get("/api/orders")]
pub async fn list_orders(
    Identity { shopper, .. }: Identity,
    orders: Data<Addr<OrderService>>,
) -> Response {
    success(orders.send(ListOrders(shopper.id)).await??)
}
