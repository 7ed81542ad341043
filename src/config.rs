use std::{net::SocketAddr, str::FromStr};

use anyhow::Context;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub db_max_connections: u32,

    pub jwt_secret: String,
    pub jwt_refresh_secret: String,
    pub access_ttl: time::Duration,
    pub refresh_ttl: time::Duration,

    /// Bound on each connection's outbound event queue.
    pub outbound_queue: usize,
}

impl Config {
    /// Reads `.env` (if any) and then the process environment.
    pub fn from_env() -> anyhow::Result<Config> {
        dotenv::dotenv().ok();

        Ok(Config {
            database_url: var_or("DATABASE_URL", "sqlite://closeknit.db?mode=rwc"),
            bind_addr: parse_or("BIND_ADDR", "0.0.0.0:5000".parse()?)?,
            db_max_connections: parse_or("DB_MAX_CONNECTIONS", 16)?,

            jwt_secret: required("JWT_SECRET")?,
            jwt_refresh_secret: required("JWT_REFRESH_SECRET")?,
            access_ttl: time::Duration::seconds(parse_or("JWT_EXPIRE_SECS", 15 * 60)?),
            refresh_ttl: time::Duration::seconds(parse_or("JWT_REFRESH_EXPIRE_SECS", 7 * 24 * 60 * 60)?),

            outbound_queue: parse_or("OUTBOUND_QUEUE", 256)?,
        })
    }
}

fn var_or(key: &str, default: &str) -> String {
    dotenv::var(key).unwrap_or_else(|_| default.to_owned())
}

fn required(key: &str) -> anyhow::Result<String> {
    let value = dotenv::var(key).with_context(|| format!("{key} must be set"))?;
    anyhow::ensure!(!value.is_empty(), "{key} must not be empty");
    Ok(value)
}

fn parse_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match dotenv::var(key) {
        Ok(raw) => raw.parse().with_context(|| format!("invalid {key}: {raw:?}")),
        Err(_) => Ok(default),
    }
}
