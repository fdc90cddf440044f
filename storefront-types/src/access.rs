use crate::{ServiceError, ServiceResult};
use argon2::{Variant, Version};
use async_trait::async_trait;
use derive_more::{Deref, Display};
use rand::rngs::StdRng;
use rand::{distributions, Rng, RngCore, SeedableRng};
use serde::{Deserialize, Serialize};
use typesafe_repository::macros::Id;
use typesafe_repository::prelude::*;
use typesafe_repository::IdentityOf;

pub mod service;

pub const TOKEN_LENGTH: usize = 48;
pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const ARGON_CONFIG: argon2::Config = argon2::Config {
    variant: Variant::Argon2id,
    version: Version::Version13,
    mem_cost: 19456,
    time_cost: 2,
    lanes: 1,
    secret: &[],
    ad: &[],
    hash_length: 32,
};

pub type Salt = [u8; 16];

pub fn generate_salt() -> Salt {
    let mut salt = [0; 16];
    StdRng::from_entropy().fill_bytes(&mut salt);
    salt
}

#[derive(Id, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[Id(ref_id, get_id)]
pub struct Shopper {
    #[id]
    pub id: i64,
    pub name: String,
    pub email: String,
    pub picture: Option<String>,
}

/// Profile presented on login.
#[derive(Deserialize, Debug, Clone)]
pub struct Profile {
    pub name: String,
    pub email: String,
    pub picture: Option<String>,
}

impl Profile {
    /// Trims fields and checks they are usable.
    pub fn normalize(self) -> ServiceResult<Self> {
        let name = self.name.trim().to_string();
        let email = self.email.trim().to_lowercase();
        if name.is_empty() {
            return Err(ServiceError::invalid("name", "must not be empty"));
        }
        if !email.contains('@') || email.starts_with('@') || email.ends_with('@') {
            return Err(ServiceError::invalid("email", "is not an email address"));
        }
        let picture = self
            .picture
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());
        Ok(Self {
            name,
            email,
            picture,
        })
    }
}

pub fn validate_password(password: &str) -> ServiceResult<()> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ServiceError::invalid(
            "password",
            format!("must be at least {MIN_PASSWORD_LENGTH} characters"),
        ));
    }
    Ok(())
}

/// Argon2 encoded hash of a shopper's password, salt included.
#[derive(Clone, PartialEq)]
pub struct PasswordHash(String);

impl PasswordHash {
    pub fn generate(input: &str, salt: Salt) -> Result<Self, anyhow::Error> {
        Ok(Self(argon2::hash_encoded(
            input.as_bytes(),
            &salt,
            &ARGON_CONFIG,
        )?))
    }
    pub fn from_encoded(encoded: String) -> Self {
        Self(encoded)
    }
    pub fn check(&self, input: &str) -> Result<bool, anyhow::Error> {
        Ok(argon2::verify_encoded(&self.0, input.as_bytes())?)
    }
    pub fn encoded(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PasswordHash(..)")
    }
}

#[derive(Deref, Display, Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(pub String);

impl SessionToken {
    pub fn generate() -> Self {
        let token = rand::thread_rng()
            .sample_iter(distributions::Alphanumeric)
            .take(TOKEN_LENGTH)
            .map(char::from)
            .collect::<String>();
        Self(token)
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    pub token: SessionToken,
    pub shopper_id: IdentityOf<Shopper>,
    pub created_at: i64,
    pub expires_at: i64,
}

#[async_trait]
pub trait ShopperRepository: Send + Sync {
    /// Shopper registered under `email` together with its password hash.
    async fn credentials(&self, email: &str) -> anyhow::Result<Option<(Shopper, PasswordHash)>>;
    /// Inserts a new shopper. Returns `None` when the email is taken.
    async fn register(
        &self,
        profile: Profile,
        password: PasswordHash,
    ) -> anyhow::Result<Option<Shopper>>;
    /// Replaces name and picture of an existing shopper.
    async fn refresh(&self, id: IdentityOf<Shopper>, profile: Profile) -> anyhow::Result<Shopper>;
}

#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn add(&self, session: Session) -> anyhow::Result<()>;
    /// Shopper owning an unexpired session at `now`.
    async fn shopper_for(&self, token: &SessionToken, now: i64)
        -> anyhow::Result<Option<Shopper>>;
    async fn remove(&self, token: &SessionToken) -> anyhow::Result<()>;
    async fn purge_expired(&self, now: i64) -> anyhow::Result<usize>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(name: &str, email: &str) -> Profile {
        Profile {
            name: name.to_string(),
            email: email.to_string(),
            picture: Some("  ".to_string()),
        }
    }

    #[test]
    fn normalize_trims_and_lowercases_email() {
        let p = profile(" Guest User ", " Guest@Example.com ").normalize().unwrap();
        assert_eq!(p.name, "Guest User");
        assert_eq!(p.email, "guest@example.com");
        assert_eq!(p.picture, None);
    }

    #[test]
    fn normalize_rejects_bad_input() {
        assert!(profile("", "guest@example.com").normalize().is_err());
        assert!(profile("Guest", "guest").normalize().is_err());
        assert!(profile("Guest", "@example.com").normalize().is_err());
    }

    #[test]
    fn short_passwords_are_rejected() {
        assert!(validate_password("1234567").is_err());
        assert!(validate_password("12345678").is_ok());
    }

    #[test]
    fn password_hash_checks_input() {
        let hash = PasswordHash::generate("correct horse", generate_salt()).unwrap();
        assert!(hash.encoded().starts_with("$argon2id$"));
        assert!(hash.check("correct horse").unwrap());
        assert!(!hash.check("correct horsE").unwrap());
        assert_eq!(format!("{hash:?}"), "PasswordHash(..)");
    }

    #[test]
    fn salts_differ() {
        assert_ne!(generate_salt(), generate_salt());
    }

    #[test]
    fn generated_tokens_are_alphanumeric_and_distinct() {
        let a = SessionToken::generate();
        let b = SessionToken::generate();
        assert_eq!(a.len(), TOKEN_LENGTH);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }
}
