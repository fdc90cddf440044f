use crate::control::{acknowledge, reply, success, Identity, Response};
use actix::Addr;
use actix_web::post;
use actix_web::{get, web::Data, web::Json};
use serde::{Deserialize, Serialize};
use storefront_types::cart::service::{AddToCart, CartService, ClearCart, GetCart, UpdateQuantity};
use storefront_types::cart::{LineId, NewCartLine, QuantityOutcome};

fn default_quantity() -> i64 {
    1
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartDto {
    pub item_id: i64,
    pub shop_id: i64,
    pub price: f64,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
}

#[derive(Deserialize, Debug)]
pub struct UpdateQuantityDto {
    pub id: LineId,
    pub quantity: i64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AddedLine {
    item_id: i64,
    quantity: i64,
}

#[derive(Serialize)]
struct ChangedLine {
    id: LineId,
    #[serde(skip_serializing_if = "Option::is_none")]
    quantity: Option<i64>,
}

#[get("/api/cart")]
pub async fn get_cart(Identity { shopper, .. }: Identity, cart: Data<Addr<CartService>>) -> Response {
    success(cart.send(GetCart(shopper.id)).await??)
}

#[post("/api/cart")]
pub async fn add_to_cart(
    Identity { shopper, .. }: Identity,
    cart: Data<Addr<CartService>>,
    dto: Json<AddToCartDto>,
) -> Response {
    let AddToCartDto {
        item_id,
        shop_id,
        price,
        quantity,
    } = dto.into_inner();
    let line = NewCartLine {
        item_id,
        shop_id,
        price,
        quantity,
    };
    let outcome = cart.send(AddToCart(shopper.id, line)).await??;
    Ok(reply(
        outcome.label(),
        AddedLine {
            item_id: outcome.item_id(),
            quantity: outcome.quantity(),
        },
    ))
}

/// Sets an absolute quantity; zero or less removes the line.
#[post("/api/cart/update")]
pub async fn update_quantity(
    Identity { shopper, .. }: Identity,
    cart: Data<Addr<CartService>>,
    dto: Json<UpdateQuantityDto>,
) -> Response {
    let UpdateQuantityDto { id, quantity } = dto.into_inner();
    let outcome = cart
        .send(UpdateQuantity {
            owner: shopper.id,
            id,
            quantity,
        })
        .await??;
    let line = match outcome {
        QuantityOutcome::Deleted { id } => ChangedLine { id, quantity: None },
        QuantityOutcome::Updated { id, quantity } => ChangedLine {
            id,
            quantity: Some(quantity),
        },
    };
    Ok(reply(outcome.label(), line))
}

#[post("/api/cart/clear")]
pub async fn clear_cart(Identity { shopper, .. }: Identity, cart: Data<Addr<CartService>>) -> Response {
    cart.send(ClearCart(shopper.id)).await??;
    Ok(acknowledge("cleared"))
}
