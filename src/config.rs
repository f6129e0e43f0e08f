use crate::error::Error;
use std::time::Duration;

const DEFAULT_BASEROW_URL: &str = "https://api.baserow.io";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    Baserow,
    Memory,
}

#[derive(Debug, Clone)]
pub struct BaserowConfig {
    pub url: String,
    pub api_token: String,
    pub votes_table_id: u64,
    pub options_table_id: u64,
    pub responses_table_id: u64,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub port: u16,
    pub public_base_url: String,
    pub static_dir: String,
    pub backend: Backend,
    pub baserow: Option<BaserowConfig>,
}

/// Schema creation settings, only needed by `anonvote setup`.
#[derive(Debug, Clone)]
pub struct SetupConfig {
    pub url: String,
    pub database_id: u64,
    pub jwt: String,
}

fn var_or(key: &str, default: &str) -> String {
    dotenv::var(key).unwrap_or_else(|_| default.to_owned())
}

fn required(key: &str) -> Result<String, Error> {
    dotenv::var(key).map_err(|_| Error::Config(format!("environment variable {} not been set", key)))
}

impl Config {
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| dotenv::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup, `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_owned());
        let need = |key: &str| lookup(key).ok_or_else(|| Error::Config(format!("environment variable {} not been set", key)));

        let port: u16 = get("PORT", "8000").parse()?;
        let backend = match get("STORE_BACKEND", "baserow").to_lowercase().as_str() {
            "baserow" => Backend::Baserow,
            "memory" => Backend::Memory,
            other => return Err(Error::Config(format!("unknown STORE_BACKEND {}", other))),
        };
        let baserow = if backend == Backend::Baserow {
            Some(BaserowConfig {
                url: get("BASEROW_URL", DEFAULT_BASEROW_URL).trim_end_matches('/').to_owned(),
                api_token: need("BASEROW_API_TOKEN")?,
                votes_table_id: need("VOTES_TABLE_ID")?.parse()?,
                options_table_id: need("OPTIONS_TABLE_ID")?.parse()?,
                responses_table_id: need("RESPONSES_TABLE_ID")?.parse()?,
                timeout: Duration::from_secs(get("STORE_TIMEOUT_SECS", "10").parse()?),
            })
        } else {
            None
        };
        Ok(Self {
            bind_addr: get("BIND_ADDR", "0.0.0.0"),
            port,
            public_base_url: get("PUBLIC_BASE_URL", &format!("http://localhost:{}", port)).trim_end_matches('/').to_owned(),
            static_dir: get("STATIC_DIR", "static"),
            backend,
            baserow,
        })
    }
}

impl SetupConfig {
    pub fn from_env() -> Result<Self, Error> {
        Ok(Self {
            url: var_or("BASEROW_URL", DEFAULT_BASEROW_URL).trim_end_matches('/').to_owned(),
            database_id: required("BASEROW_DATABASE_ID")?.parse()?,
            jwt: required("BASEROW_JWT")?,
        })
    }
}
