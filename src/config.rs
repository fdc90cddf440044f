use anyhow::Context;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_DATABASE_PATH: &str = "storage/storefront.db";
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_SESSION_TTL: &str = "7d";
pub const MAX_SESSION_TTL: Duration = Duration::from_secs(10 * 365 * 24 * 60 * 60);

#[derive(Debug, Clone)]
pub struct Settings {
    pub database_path: PathBuf,
    pub bind_address: String,
    pub port: u16,
    pub seed_on_startup: bool,
    pub session_ttl: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            port: DEFAULT_PORT,
            seed_on_startup: true,
            session_ttl: Duration::from_secs(7 * 24 * 60 * 60),
        }
    }
}

impl Settings {
    /// Reads settings from the environment, `.env` included once loaded.
    pub fn from_env() -> Result<Self, anyhow::Error> {
        let ttl = envmnt::get_or("SESSION_TTL", DEFAULT_SESSION_TTL);
        Ok(Self {
            database_path: envmnt::get_or("DATABASE_PATH", DEFAULT_DATABASE_PATH).into(),
            bind_address: envmnt::get_or("BIND_ADDRESS", DEFAULT_BIND_ADDRESS),
            port: parse_or("PORT", DEFAULT_PORT)?,
            seed_on_startup: parse_flag(envmnt::get_or("SEED_ON_STARTUP", "").as_str(), true),
            session_ttl: parse_session_ttl(&ttl).context("SESSION_TTL")?,
        })
    }
}

fn parse_or<T: FromStr>(key: &str, default: T) -> Result<T, anyhow::Error>
where
    T::Err: std::fmt::Display,
{
    match envmnt::get_parse(key) {
        Ok(v) => Ok(v),
        Err(envmnt::errors::EnvmntError::Missing(_)) => Ok(default),
        Err(err) => Err(anyhow::anyhow!("Unable to read {key}: {err}")),
    }
}

pub fn parse_flag(raw: &str, default_value: bool) -> bool {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default_value,
    }
}

pub fn parse_duration(duration: &str) -> Result<Duration, anyhow::Error> {
    duration_str::parse(duration.trim().to_lowercase())
        .map_err(|dur| anyhow::anyhow!("Unable to parse duration {dur}"))
}

pub fn parse_session_ttl(raw: &str) -> Result<Duration, anyhow::Error> {
    let ttl = parse_duration(raw)?;
    if ttl.is_zero() || ttl > MAX_SESSION_TTL {
        return Err(anyhow::anyhow!(
            "Session TTL must be positive and at most {}s, got {}s",
            MAX_SESSION_TTL.as_secs(),
            ttl.as_secs()
        ));
    }
    Ok(ttl)
}
