use crate::access::{
    generate_salt, validate_password, PasswordHash, Profile, Session, SessionRepository,
    SessionToken, Shopper, ShopperRepository,
};
use crate::{now, ServiceError, ServiceResult};
use actix::prelude::*;
use actix::ResponseActFuture;
use log_error::*;
use std::sync::Arc;
use std::time::Duration;

/// Issues and verifies shopper sessions.
pub struct AccessService {
    shoppers: Arc<dyn ShopperRepository>,
    sessions: Arc<dyn SessionRepository>,
    ttl: Duration,
}

impl AccessService {
    pub fn new(
        shoppers: Arc<dyn ShopperRepository>,
        sessions: Arc<dyn SessionRepository>,
        ttl: Duration,
    ) -> Self {
        Self {
            shoppers,
            sessions,
            ttl,
        }
    }
}

impl Actor for AccessService {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        let sessions = self.sessions.clone();
        ctx.spawn(
            async move {
                if let Some(n) = sessions
                    .purge_expired(now())
                    .await
                    .log_error("Unable to purge expired sessions")
                {
                    log::info!("Purged {n} expired sessions");
                }
            }
            .into_actor(self),
        );
    }
}

/// Signs a shopper in, registering the email on its first use.
#[derive(Message)]
#[rtype(result = "ServiceResult<(Shopper, SessionToken)>")]
pub struct LogIn {
    pub profile: Profile,
    pub password: String,
}

#[derive(Message)]
#[rtype(result = "ServiceResult<Option<Shopper>>")]
pub struct Authenticate(pub SessionToken);

#[derive(Message)]
#[rtype(result = "ServiceResult<()>")]
pub struct LogOut(pub SessionToken);

impl Handler<LogIn> for AccessService {
    type Result = ResponseActFuture<Self, ServiceResult<(Shopper, SessionToken)>>;

    fn handle(&mut self, LogIn { profile, password }: LogIn, _: &mut Self::Context) -> Self::Result {
        let shoppers = self.shoppers.clone();
        let sessions = self.sessions.clone();
        let ttl = self.ttl;
        Box::pin(
            async move {
                let profile = profile.normalize()?;
                validate_password(&password)?;
                let created_at = now();
                let expires_at = expires_at(created_at, ttl)?;
                let existing = shoppers.credentials(&profile.email).await?;
                let shopper = match existing {
                    Some((shopper, hash)) => {
                        verify(&hash, &password)?;
                        shoppers.refresh(shopper.id, profile).await?
                    }
                    None => {
                        let hash = PasswordHash::generate(&password, generate_salt())?;
                        let shopper = shoppers
                            .register(profile, hash)
                            .await?
                            .ok_or_else(|| ServiceError::invalid("email", "is already registered"))?;
                        log::info!("Registered shopper {}", shopper.id);
                        shopper
                    }
                };
                let token = SessionToken::generate();
                sessions
                    .add(Session {
                        token: token.clone(),
                        shopper_id: shopper.id,
                        created_at,
                        expires_at,
                    })
                    .await?;
                log::info!("Shopper {} logged in", shopper.id);
                Ok((shopper, token))
            }
            .into_actor(self),
        )
    }
}

fn verify(hash: &PasswordHash, password: &str) -> ServiceResult<()> {
    if hash.check(password)? {
        Ok(())
    } else {
        Err(ServiceError::invalid("password", "does not match"))
    }
}

pub fn expires_at(created_at: i64, ttl: Duration) -> Result<i64, anyhow::Error> {
    i64::try_from(ttl.as_secs())
        .ok()
        .and_then(|ttl| created_at.checked_add(ttl))
        .ok_or_else(|| anyhow::anyhow!("Session TTL {ttl:?} is out of range"))
}

impl Handler<Authenticate> for AccessService {
    type Result = ResponseActFuture<Self, ServiceResult<Option<Shopper>>>;

    fn handle(&mut self, Authenticate(token): Authenticate, _: &mut Self::Context) -> Self::Result {
        let sessions = self.sessions.clone();
        Box::pin(async move { Ok(sessions.shopper_for(&token, now()).await?) }.into_actor(self))
    }
}

impl Handler<LogOut> for AccessService {
    type Result = ResponseActFuture<Self, ServiceResult<()>>;

    fn handle(&mut self, LogOut(token): LogOut, _: &mut Self::Context) -> Self::Result {
        let sessions = self.sessions.clone();
        Box::pin(async move { Ok(sessions.remove(&token).await?) }.into_actor(self))
    }
}
