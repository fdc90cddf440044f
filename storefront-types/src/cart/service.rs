use crate::access::Shopper;
use crate::cart::{
    AddOutcome, CartLineView, CartRepository, LineId, NewCartLine, QuantityOutcome,
};
use crate::{ServiceError, ServiceResult};
use actix::prelude::*;
use actix::ResponseActFuture;
use std::sync::Arc;
use typesafe_repository::IdentityOf;

pub struct CartService {
    repo: Arc<dyn CartRepository>,
}

impl CartService {
    pub fn new(repo: Arc<dyn CartRepository>) -> Self {
        Self { repo }
    }
}

impl Actor for CartService {
    type Context = Context<Self>;
}

#[derive(Message)]
#[rtype(result = "ServiceResult<AddOutcome>")]
pub struct AddToCart(pub IdentityOf<Shopper>, pub NewCartLine);

#[derive(Message)]
#[rtype(result = "ServiceResult<QuantityOutcome>")]
pub struct UpdateQuantity {
    pub owner: IdentityOf<Shopper>,
    pub id: LineId,
    pub quantity: i64,
}

#[derive(Message)]
#[rtype(result = "ServiceResult<()>")]
pub struct ClearCart(pub IdentityOf<Shopper>);

#[derive(Message)]
#[rtype(result = "ServiceResult<Vec<CartLineView>>")]
pub struct GetCart(pub IdentityOf<Shopper>);

impl Handler<AddToCart> for CartService {
    type Result = ResponseActFuture<Self, ServiceResult<AddOutcome>>;

    fn handle(&mut self, AddToCart(owner, line): AddToCart, _: &mut Self::Context) -> Self::Result {
        let repo = self.repo.clone();
        Box::pin(
            async move {
                line.validate()?;
                let outcome = repo.add(owner, line).await?;
                log::debug!(
                    "Cart of shopper {owner}: item {} {} to quantity {}",
                    outcome.item_id(),
                    outcome.label(),
                    outcome.quantity()
                );
                Ok(outcome)
            }
            .into_actor(self),
        )
    }
}

impl Handler<UpdateQuantity> for CartService {
    type Result = ResponseActFuture<Self, ServiceResult<QuantityOutcome>>;

    fn handle(
        &mut self,
        UpdateQuantity {
            owner,
            id,
            quantity,
        }: UpdateQuantity,
        _: &mut Self::Context,
    ) -> Self::Result {
        let repo = self.repo.clone();
        Box::pin(
            async move {
                if quantity <= 0 {
                    return match repo.remove(owner, id).await? {
                        true => Ok(QuantityOutcome::Deleted { id }),
                        false => Err(ServiceError::NotFound {
                            entity: "Cart line",
                        }),
                    };
                }
                let line = repo
                    .set_quantity(owner, id, quantity)
                    .await?
                    .ok_or(ServiceError::NotFound {
                        entity: "Cart line",
                    })?;
                Ok(QuantityOutcome::Updated {
                    id: line.id,
                    quantity: line.quantity,
                })
            }
            .into_actor(self),
        )
    }
}

impl Handler<ClearCart> for CartService {
    type Result = ResponseActFuture<Self, ServiceResult<()>>;

    fn handle(&mut self, ClearCart(owner): ClearCart, _: &mut Self::Context) -> Self::Result {
        let repo = self.repo.clone();
        Box::pin(
            async move {
                let removed = repo.clear(owner).await?;
                log::debug!("Cleared {removed} cart lines of shopper {owner}");
                Ok(())
            }
            .into_actor(self),
        )
    }
}

impl Handler<GetCart> for CartService {
    type Result = ResponseActFuture<Self, ServiceResult<Vec<CartLineView>>>;

    fn handle(&mut self, GetCart(owner): GetCart, _: &mut Self::Context) -> Self::Result {
        let repo = self.repo.clone();
        Box::pin(async move { Ok(repo.list(owner).await?) }.into_actor(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::CartLine;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryCart {
        lines: Mutex<Vec<CartLine>>,
    }

    #[async_trait]
    impl CartRepository for MemoryCart {
        async fn add(&self, owner: i64, line: NewCartLine) -> anyhow::Result<AddOutcome> {
            let mut lines = self.lines.lock().map_err(|e| anyhow::anyhow!("{e}"))?;
            let existing = lines.iter_mut().find(|l| {
                l.shopper_id == owner && l.item_id == line.item_id && l.shop_id == line.shop_id
            });
            if let Some(l) = existing {
                l.quantity += line.quantity;
                return Ok(AddOutcome::Updated {
                    item_id: l.item_id,
                    quantity: l.quantity,
                });
            }
            let id = lines.len() as i64 + 1;
            lines.push(CartLine {
                id,
                shopper_id: owner,
                item_id: line.item_id,
                shop_id: line.shop_id,
                quantity: line.quantity,
                price: line.price,
            });
            Ok(AddOutcome::Added {
                item_id: line.item_id,
                quantity: line.quantity,
            })
        }

        async fn set_quantity(
            &self,
            owner: i64,
            id: LineId,
            quantity: i64,
        ) -> anyhow::Result<Option<CartLine>> {
            let mut lines = self.lines.lock().map_err(|e| anyhow::anyhow!("{e}"))?;
            Ok(lines
                .iter_mut()
                .find(|l| l.id == id && l.shopper_id == owner)
                .map(|l| {
                    l.quantity = quantity;
                    l.clone()
                }))
        }

        async fn remove(&self, owner: i64, id: LineId) -> anyhow::Result<bool> {
            let mut lines = self.lines.lock().map_err(|e| anyhow::anyhow!("{e}"))?;
            let before = lines.len();
            lines.retain(|l| !(l.id == id && l.shopper_id == owner));
            Ok(lines.len() != before)
        }

        async fn clear(&self, owner: i64) -> anyhow::Result<usize> {
            let mut lines = self.lines.lock().map_err(|e| anyhow::anyhow!("{e}"))?;
            let before = lines.len();
            lines.retain(|l| l.shopper_id != owner);
            Ok(before - lines.len())
        }

        async fn list(&self, owner: i64) -> anyhow::Result<Vec<CartLineView>> {
            let lines = self.lines.lock().map_err(|e| anyhow::anyhow!("{e}"))?;
            Ok(lines
                .iter()
                .filter(|l| l.shopper_id == owner)
                .map(|l| CartLineView {
                    id: l.id,
                    quantity: l.quantity,
                    price: l.price,
                    item_id: l.item_id,
                    shop_id: l.shop_id,
                    name: format!("item {}", l.item_id),
                    image: String::new(),
                    shop_name: format!("shop {}", l.shop_id),
                })
                .collect())
        }
    }

    fn start() -> Addr<CartService> {
        CartService::new(Arc::new(MemoryCart::default())).start()
    }

    fn new_line(price: f64, quantity: i64) -> NewCartLine {
        NewCartLine {
            item_id: 1,
            shop_id: 5,
            price,
            quantity,
        }
    }

    #[actix_rt::test]
    async fn add_rejects_invalid_line_before_touching_store() {
        let cart = start();
        let res = cart.send(AddToCart(1, new_line(50.0, 0))).await.unwrap();
        assert!(matches!(res, Err(ServiceError::InvalidInput { .. })));
        assert!(cart.send(GetCart(1)).await.unwrap().unwrap().is_empty());
    }

    #[actix_rt::test]
    async fn update_to_zero_or_negative_deletes() {
        let cart = start();
        cart.send(AddToCart(1, new_line(50.0, 3))).await.unwrap().unwrap();
        let res = cart
            .send(UpdateQuantity {
                owner: 1,
                id: 1,
                quantity: -1,
            })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(res, QuantityOutcome::Deleted { id: 1 });
        assert!(cart.send(GetCart(1)).await.unwrap().unwrap().is_empty());
    }

    #[actix_rt::test]
    async fn update_sets_absolute_quantity() {
        let cart = start();
        cart.send(AddToCart(1, new_line(50.0, 3))).await.unwrap().unwrap();
        let res = cart
            .send(UpdateQuantity {
                owner: 1,
                id: 1,
                quantity: 7,
            })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(res, QuantityOutcome::Updated { id: 1, quantity: 7 });
    }

    #[actix_rt::test]
    async fn update_of_unknown_line_is_not_found() {
        let cart = start();
        for quantity in [0, 2] {
            let res = cart
                .send(UpdateQuantity {
                    owner: 1,
                    id: 42,
                    quantity,
                })
                .await
                .unwrap();
            assert!(matches!(res, Err(ServiceError::NotFound { .. })));
        }
    }
}
